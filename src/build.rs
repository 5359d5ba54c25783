//! Build context and the multi-environment build entry point.

use crate::adapters::Adapters;
use crate::context::{ConfigLayout, EnvironmentContext, load_environments};
use crate::error::{Result, TreeprocessError};
use crate::expand::expand_environment;
use crate::pipeline::{RunReport, run_environment};
use crate::settings::types::{DEFAULT_CONFIG_EXTENSION, DEFAULT_CONFIG_PREFIX};
use std::path::{Path, PathBuf};

/// Everything a build run needs, constructed once per invocation.
#[derive(Debug)]
pub struct BuildContext {
	source_root: PathBuf,
	output_root: PathBuf,
	layout: ConfigLayout,
	jobs: Option<usize>,
	environments: Vec<String>,
	adapters: Adapters,
}

impl BuildContext {
	/// Create a context with the default config naming and built-in adapters.
	pub fn new(
		source_root: impl Into<PathBuf>,
		output_root: impl Into<PathBuf>,
		config_root: impl Into<PathBuf>,
	) -> Self {
		Self {
			source_root: source_root.into(),
			output_root: output_root.into(),
			layout: ConfigLayout::new(
				config_root,
				DEFAULT_CONFIG_PREFIX,
				DEFAULT_CONFIG_EXTENSION,
			),
			jobs: None,
			environments: Vec::new(),
			adapters: Adapters::builtin(),
		}
	}

	/// Override how build config files are named.
	pub fn with_config_naming(mut self, prefix: &str, extension: &str) -> Self {
		self.layout.prefix = prefix.to_string();
		self.layout.extension = extension.to_string();
		self
	}

	/// Set the number of parallel jobs per environment.
	pub fn with_jobs(mut self, jobs: Option<usize>) -> Self {
		self.jobs = jobs.map(|n| n.max(1));
		self
	}

	/// Build only the named environments. Empty means all.
	pub fn with_environments(mut self, environments: Vec<String>) -> Self {
		self.environments = environments;
		self
	}

	/// Replace the preprocessor and minifiers.
	pub fn with_adapters(mut self, adapters: Adapters) -> Self {
		self.adapters = adapters;
		self
	}

	pub fn source_root(&self) -> &Path {
		&self.source_root
	}

	pub fn output_root(&self) -> &Path {
		&self.output_root
	}

	pub fn layout(&self) -> &ConfigLayout {
		&self.layout
	}

	pub fn adapters(&self) -> &Adapters {
		&self.adapters
	}

	fn wants(&self, environment: &str) -> bool {
		self.environments.is_empty() || self.environments.iter().any(|e| e == environment)
	}

	/// Load, filter and glob-expand every environment.
	///
	/// Any load or expansion error fails before a single job starts.
	pub fn resolve_environments(&self) -> Result<Vec<EnvironmentContext>> {
		let environments = load_environments(&self.layout)?;
		tracing::info!(
			environments = ?environments.iter().map(|env| env.key.as_str()).collect::<Vec<_>>(),
			"loaded build config"
		);

		if let Some(name) = self
			.environments
			.iter()
			.find(|name| !environments.iter().any(|env| &env.key == *name))
		{
			return Err(TreeprocessError::UnknownEnvironment { name: name.clone() });
		}

		environments
			.iter()
			.filter(|env| self.wants(&env.key))
			.map(|env| expand_environment(env, &self.source_root))
			.collect()
	}

	/// Run the whole build.
	///
	/// Environments are built one after another; jobs inside one environment
	/// run in parallel. Job failures are recorded in the report and never stop
	/// the run.
	pub fn run(&self) -> Result<RunReport> {
		let environments = self.resolve_environments()?;

		let mut pool = rayon::ThreadPoolBuilder::new();
		if let Some(jobs) = self.jobs {
			pool = pool.num_threads(jobs);
		}
		let pool = pool.build()?;

		let mut report = RunReport::new();
		for env in &environments {
			let env_report = pool.install(|| {
				run_environment(env, &self.source_root, &self.output_root, &self.adapters)
			});
			tracing::info!(
				environment = %env.key,
				succeeded = env_report.success_count(),
				failed = env_report.failure_count(),
				"environment finished"
			);
			report.add(env_report);
		}

		Ok(report)
	}
}

/// Build every environment found in `config_root` with the built-in adapters.
pub fn build(source_root: &Path, output_root: &Path, config_root: &Path) -> Result<RunReport> {
	BuildContext::new(source_root, output_root, config_root).run()
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::fs;

	fn project() -> tempfile::TempDir {
		let temp = tempfile::tempdir().unwrap();
		let root = temp.path();
		fs::create_dir_all(root.join("config")).unwrap();
		fs::create_dir_all(root.join("src/templates")).unwrap();
		fs::write(
			root.join("config/build-config.json"),
			r#"{"_config": {}, "_params": {"name": "base"}, "index.html": "index.html"}"#,
		)
		.unwrap();
		fs::write(
			root.join("config/build-config.staging.json"),
			r#"{"_params": {"name": "staging"}, "index.html": "templates/index.html"}"#,
		)
		.unwrap();
		fs::write(
			root.join("config/build-config.production.json"),
			r#"{"index.html": "templates/index.html"}"#,
		)
		.unwrap();
		fs::write(
			root.join("src/templates/index.html"),
			"<h1><!-- @echo name --></h1>",
		)
		.unwrap();
		temp
	}

	#[test]
	fn test_build_all_environments() {
		let temp = project();
		let root = temp.path();
		let output = root.join("output");

		let report = build(&root.join("src"), &output, &root.join("config")).unwrap();

		assert!(!report.has_failures());
		assert_eq!(report.environments.len(), 2);
		assert_eq!(
			fs::read_to_string(output.join("staging/index.html")).unwrap(),
			"<h1>staging</h1>"
		);
		assert_eq!(
			fs::read_to_string(output.join("production/index.html")).unwrap(),
			"<h1>base</h1>"
		);
	}

	#[test]
	fn test_environment_filter() {
		let temp = project();
		let root = temp.path();
		let output = root.join("output");

		let report = BuildContext::new(root.join("src"), &output, root.join("config"))
			.with_environments(vec!["staging".to_string()])
			.with_jobs(Some(1))
			.run()
			.unwrap();

		assert_eq!(report.environments.len(), 1);
		assert!(output.join("staging/index.html").exists());
		assert!(!output.join("production").exists());
	}

	#[test]
	fn test_recursive_glob_templates_every_file() {
		let temp = project();
		let root = temp.path();
		for i in 0..20 {
			let dir = root.join(format!("src/pages/d{i}"));
			fs::create_dir_all(&dir).unwrap();
			fs::write(dir.join("a.html"), "<!-- @echo name -->").unwrap();
		}
		fs::write(
			root.join("config/build-config.staging.json"),
			r#"{"_params": {"name": "staging"}, "site": "pages/**/*"}"#,
		)
		.unwrap();
		let output = root.join("output");

		let report = BuildContext::new(root.join("src"), &output, root.join("config"))
			.with_environments(vec!["staging".to_string()])
			.with_jobs(Some(8))
			.run()
			.unwrap();

		assert!(!report.has_failures());
		assert_eq!(report.success_count(), 20);
		for i in 0..20 {
			let page = output.join(format!("staging/site/d{i}/a.html"));
			assert_eq!(fs::read_to_string(page).unwrap(), "staging");
		}
	}

	#[test]
	fn test_unknown_environment_is_rejected() {
		let temp = project();
		let root = temp.path();
		let output = root.join("output");

		let result = BuildContext::new(root.join("src"), &output, root.join("config"))
			.with_environments(vec!["staging".to_string(), "qa".to_string()])
			.run();

		assert!(matches!(
			result,
			Err(TreeprocessError::UnknownEnvironment { ref name }) if name == "qa"
		));
		assert!(!output.exists());
	}

	#[test]
	fn test_load_error_aborts_before_jobs() {
		let temp = project();
		let root = temp.path();
		fs::write(root.join("config/build-config.broken.json"), "{").unwrap();

		let result = build(&root.join("src"), &root.join("output"), &root.join("config"));

		assert!(result.is_err());
		assert!(!root.join("output").exists());
	}
}
