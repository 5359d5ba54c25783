use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::TreeprocessError;

/// Default file name prefix of build config documents.
pub const DEFAULT_CONFIG_PREFIX: &str = "build-config";

/// Default file extension of build config documents.
pub const DEFAULT_CONFIG_EXTENSION: &str = "json";

/// Top-level settings from a `.treeprocess.toml` file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Settings {
	/// If true, stop directory cascade and jump directly to ~/.treeprocess.toml.
	#[serde(default)]
	pub root: bool,

	/// Environment variable name that, if truthy, skips ~/.treeprocess.toml lookup.
	#[serde(default)]
	pub user_settings_disable_env_var: Option<String>,

	/// Directory holding the templated sources.
	pub source: Option<PathBuf>,

	/// Directory receiving one subdirectory per environment.
	pub output: Option<PathBuf>,

	/// Directory holding the base and overlay build configs.
	pub config: Option<PathBuf>,

	/// File name prefix of build configs, e.g. `build-config`.
	pub config_prefix: Option<String>,

	/// File extension of build configs, without the dot.
	pub config_extension: Option<String>,

	/// Number of parallel jobs within one environment.
	pub jobs: Option<usize>,
}

/// Loaded settings with their source path for debugging/display.
#[derive(Debug, Clone)]
pub struct LoadedSettings {
	/// The parsed settings.
	pub settings: Settings,

	/// The path these settings were loaded from.
	pub path: PathBuf,
}

/// Effective settings after merging the cascade.
///
/// Directory fields are already resolved against the file that set them.
#[derive(Debug, Clone)]
pub struct ResolvedSettings {
	pub source: Option<PathBuf>,
	pub output: Option<PathBuf>,
	pub config: Option<PathBuf>,
	pub config_prefix: String,
	pub config_extension: String,
	pub jobs: Option<usize>,

	/// Files that contributed, most specific first.
	pub sources: Vec<PathBuf>,
}

impl Default for ResolvedSettings {
	fn default() -> Self {
		Self {
			source: None,
			output: None,
			config: None,
			config_prefix: DEFAULT_CONFIG_PREFIX.to_string(),
			config_extension: DEFAULT_CONFIG_EXTENSION.to_string(),
			jobs: None,
			sources: Vec::new(),
		}
	}
}

impl Settings {
	/// Validate field values that would break config discovery.
	pub fn validate(&self, path: &Path) -> Result<(), TreeprocessError> {
		let invalid = |key, reason: &str| TreeprocessError::InvalidSetting {
			key,
			path: path.to_path_buf(),
			reason: reason.to_string(),
		};

		if let Some(ref prefix) = self.config_prefix {
			if prefix.is_empty() {
				return Err(invalid("config-prefix", "must not be empty"));
			}
			if prefix.contains('/') || prefix.contains('\\') {
				return Err(invalid("config-prefix", "must be a file name, not a path"));
			}
		}

		if let Some(ref ext) = self.config_extension
			&& (ext.is_empty() || ext.contains('.'))
		{
			return Err(invalid(
				"config-extension",
				"must be a non-empty extension without dots",
			));
		}

		if self.jobs == Some(0) {
			return Err(invalid("jobs", "must be at least 1"));
		}

		Ok(())
	}
}
