use crate::error::{Result, TreeprocessError};
use crate::settings::types::Settings;
use std::path::Path;

/// Parse a settings file from the given path.
pub fn parse_settings_file(path: &Path) -> Result<Settings> {
	let content =
		std::fs::read_to_string(path).map_err(|source| TreeprocessError::SettingsReadError {
			path: path.to_path_buf(),
			source,
		})?;

	parse_settings_str(&content, path)
}

/// Parse settings from a string (useful for testing).
pub fn parse_settings_str(content: &str, path: &Path) -> Result<Settings> {
	let settings: Settings =
		toml::from_str(content).map_err(|source| TreeprocessError::SettingsParseError {
			path: path.to_path_buf(),
			source,
		})?;

	settings.validate(path)?;

	Ok(settings)
}

/// Template written by `treeprocess --init`.
pub fn generate_init_template() -> String {
	r#"# treeprocess settings
# Stop looking for settings in parent directories.
root = true

# Directories are relative to this file.
source = "src/templates"
output = "output"
config = "config"

# Build configs are <prefix>.json (base) and <prefix>.<env>.json (overlays).
config-prefix = "build-config"
config-extension = "json"

# Parallel jobs per environment (defaults to available cores).
# jobs = 4

# Skip ~/.treeprocess.toml when this variable is truthy.
# user-settings-disable-env-var = "CI"
"#
	.to_string()
}
