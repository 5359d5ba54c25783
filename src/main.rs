use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use treeprocess::build::BuildContext;
use treeprocess::settings::{
	ResolvedSettings, SETTINGS_FILE_NAME, generate_init_template, load_settings,
	user_settings_path,
};

#[derive(Parser)]
#[command(name = "treeprocess")]
#[command(
	author,
	version,
	about = "Build per-environment output trees from templated sources"
)]
#[command(arg_required_else_help = true)]
struct Cli {
	#[command(subcommand)]
	command: Option<Commands>,

	/// Create a template .treeprocess.toml in the current directory
	#[arg(long)]
	init: bool,

	/// Overwrite existing .treeprocess.toml when using --init
	#[arg(long, requires = "init")]
	force: bool,

	/// More log output (-v debug, -vv trace)
	#[arg(short, long, action = clap::ArgAction::Count, global = true)]
	verbose: u8,

	/// Only log warnings and errors
	#[arg(short, long, global = true, conflicts_with = "verbose")]
	quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
	/// Build every environment
	Build {
		#[command(flatten)]
		paths: PathArgs,

		/// Build only this environment (repeatable)
		#[arg(long = "env", value_name = "NAME")]
		environments: Vec<String>,

		/// Parallel jobs per environment
		#[arg(short, long)]
		jobs: Option<usize>,
	},
	/// Build configuration commands
	Config {
		#[command(subcommand)]
		action: ConfigAction,
	},
	/// Display the settings cascade and effective values
	Settings,
}

#[derive(Subcommand)]
enum ConfigAction {
	/// Print each environment's resolved items
	Show {
		#[command(flatten)]
		paths: PathArgs,

		/// Print JSON including merged config and params
		#[arg(long)]
		json: bool,
	},
	/// Load and expand every environment without building
	Validate {
		#[command(flatten)]
		paths: PathArgs,
	},
}

#[derive(Args)]
struct PathArgs {
	/// Source directory
	#[arg(short, long, value_name = "DIR")]
	source: Option<PathBuf>,

	/// Output directory
	#[arg(short, long, value_name = "DIR")]
	output: Option<PathBuf>,

	/// Build config directory
	#[arg(short, long, value_name = "DIR")]
	config: Option<PathBuf>,

	/// Build config file name prefix
	#[arg(long, value_name = "PREFIX")]
	config_prefix: Option<String>,

	/// Build config file extension
	#[arg(long, value_name = "EXT")]
	config_extension: Option<String>,
}

fn main() -> ExitCode {
	let cli = Cli::parse();
	init_logging(cli.verbose, cli.quiet);

	match run(cli) {
		Ok(code) => code,
		Err(e) => {
			eprintln!("error: {e:?}");
			ExitCode::FAILURE
		}
	}
}

fn init_logging(verbose: u8, quiet: bool) {
	let level = match (quiet, verbose) {
		(true, _) => "warn",
		(false, 0) => "info",
		(false, 1) => "debug",
		(false, _) => "trace",
	};
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.with_target(false)
		.init();
}

fn run(cli: Cli) -> Result<ExitCode> {
	if cli.init {
		return handle_init(cli.force);
	}

	match cli.command {
		Some(Commands::Build {
			paths,
			environments,
			jobs,
		}) => handle_build(&paths, environments, jobs),
		Some(Commands::Config { action }) => match action {
			ConfigAction::Show { paths, json } => handle_config_show(&paths, json),
			ConfigAction::Validate { paths } => handle_config_validate(&paths),
		},
		Some(Commands::Settings) => handle_settings(),
		// No command specified - this shouldn't happen due to arg_required_else_help
		None => Ok(ExitCode::SUCCESS),
	}
}

fn handle_init(force: bool) -> Result<ExitCode> {
	let settings_path = PathBuf::from(SETTINGS_FILE_NAME);

	if settings_path.exists() && !force {
		anyhow::bail!("{SETTINGS_FILE_NAME} already exists. Use --force to overwrite.");
	}

	std::fs::write(&settings_path, generate_init_template())
		.with_context(|| format!("Failed to write {}", settings_path.display()))?;

	println!("Created {SETTINGS_FILE_NAME}");
	Ok(ExitCode::SUCCESS)
}

fn current_settings() -> Result<(PathBuf, ResolvedSettings)> {
	let cwd = std::env::current_dir().context("Failed to get current directory")?;
	let settings = load_settings(&cwd).context("Failed to load settings")?;
	Ok((cwd, settings))
}

/// Pick the CLI value, else the settings value, else fail naming the flag.
fn require_dir(
	cli: Option<&PathBuf>,
	setting: Option<&PathBuf>,
	cwd: &Path,
	flag: &str,
) -> Result<PathBuf> {
	match (cli, setting) {
		(Some(path), _) => Ok(cwd.join(path)),
		(None, Some(path)) => Ok(path.clone()),
		(None, None) => anyhow::bail!(
			"No {flag} directory given. Pass --{flag} or set `{flag}` in {SETTINGS_FILE_NAME}."
		),
	}
}

/// Resolve directories and naming from CLI flags over settings.
///
/// Only builds need an output directory; config inspection falls back to `./output`.
fn build_context(paths: &PathArgs, need_output: bool) -> Result<(BuildContext, ResolvedSettings)> {
	let (cwd, settings) = current_settings()?;

	let source = require_dir(paths.source.as_ref(), settings.source.as_ref(), &cwd, "source")?;
	let output = match require_dir(paths.output.as_ref(), settings.output.as_ref(), &cwd, "output") {
		Ok(dir) => dir,
		Err(_) if !need_output => cwd.join("output"),
		Err(e) => return Err(e),
	};
	let config = require_dir(paths.config.as_ref(), settings.config.as_ref(), &cwd, "config")?;

	let prefix = paths
		.config_prefix
		.as_deref()
		.unwrap_or(&settings.config_prefix);
	let extension = paths
		.config_extension
		.as_deref()
		.unwrap_or(&settings.config_extension);

	let ctx = BuildContext::new(source, output, config)
		.with_config_naming(prefix, extension)
		.with_jobs(settings.jobs);
	Ok((ctx, settings))
}

fn handle_build(
	paths: &PathArgs,
	environments: Vec<String>,
	jobs: Option<usize>,
) -> Result<ExitCode> {
	let (ctx, settings) = build_context(paths, true)?;
	let ctx = ctx
		.with_environments(environments)
		.with_jobs(jobs.or(settings.jobs));

	tracing::info!(
		source = %ctx.source_root().display(),
		output = %ctx.output_root().display(),
		config = %ctx.layout().root.display(),
		"Start executing"
	);

	let report = ctx.run().context("Failed to load build configuration")?;
	print!("{}", report.render());

	if report.has_failures() {
		Ok(ExitCode::FAILURE)
	} else {
		Ok(ExitCode::SUCCESS)
	}
}

fn handle_config_show(paths: &PathArgs, json: bool) -> Result<ExitCode> {
	let (ctx, _) = build_context(paths, false)?;
	let environments = ctx
		.resolve_environments()
		.context("Failed to load build configuration")?;

	if json {
		let rendered =
			serde_json::to_string_pretty(&environments).context("Failed to render environments")?;
		println!("{rendered}");
		return Ok(ExitCode::SUCCESS);
	}

	if environments.is_empty() {
		println!("No environments found.");
		return Ok(ExitCode::SUCCESS);
	}

	for env in &environments {
		println!("# Environment: {} ({} items)", env.key, env.value.len());
		for (key, item) in &env.value {
			println!("  {key} <- {}", item.value);
		}
		println!();
	}

	Ok(ExitCode::SUCCESS)
}

fn handle_config_validate(paths: &PathArgs) -> Result<ExitCode> {
	let (ctx, _) = build_context(paths, false)?;

	match ctx.resolve_environments() {
		Ok(environments) => {
			if environments.is_empty() {
				println!("No environments found.");
			} else {
				println!("All build configs are valid:");
				for env in &environments {
					println!("  {} ({} items)", env.key, env.value.len());
				}
			}
			Ok(ExitCode::SUCCESS)
		}
		Err(e) => {
			eprintln!("Configuration error: {}", e);
			Ok(ExitCode::FAILURE)
		}
	}
}

fn handle_settings() -> Result<ExitCode> {
	let (_, settings) = current_settings()?;

	if settings.sources.is_empty() {
		println!("No settings files found.");
	} else {
		println!("Settings files (in cascade order):");
		for path in &settings.sources {
			println!("  {}", path.display());
		}
	}
	println!();

	let show = |dir: &Option<PathBuf>| {
		dir.as_ref()
			.map_or_else(|| "(unset)".to_string(), |p| p.display().to_string())
	};
	println!("source: {}", show(&settings.source));
	println!("output: {}", show(&settings.output));
	println!("config: {}", show(&settings.config));
	println!("config-prefix: {}", settings.config_prefix);
	println!("config-extension: {}", settings.config_extension);
	match settings.jobs {
		Some(jobs) => println!("jobs: {jobs}"),
		None => println!("jobs: (available cores)"),
	}

	if let Ok(user_path) = user_settings_path() {
		println!();
		println!("User settings path: {}", user_path.display());
		if user_path.exists() {
			println!("  (exists)");
		} else {
			println!("  (not found)");
		}
	}

	Ok(ExitCode::SUCCESS)
}
