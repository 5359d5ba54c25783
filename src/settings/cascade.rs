use crate::error::{Result, TreeprocessError};
use crate::settings::parser::parse_settings_file;
use crate::settings::types::{LoadedSettings, ResolvedSettings};
use std::path::{Path, PathBuf};

/// Settings file name looked up in each directory.
pub const SETTINGS_FILE_NAME: &str = ".treeprocess.toml";

/// Discover and load all settings files in the cascade.
///
/// The cascade order is:
/// 1. Start from `start_dir` and look for `.treeprocess.toml`
/// 2. If found and `root = true`, skip to user settings only
/// 3. Otherwise, continue up the directory tree
/// 4. Finally, check ~/.treeprocess.toml (unless disabled)
///
/// Returns settings in cascade order (most specific first).
pub fn discover_settings(start_dir: &Path) -> Result<Vec<LoadedSettings>> {
	let mut found = Vec::new();
	let mut current_dir = start_dir.to_path_buf();

	loop {
		let path = current_dir.join(SETTINGS_FILE_NAME);

		if path.is_file() {
			let settings = parse_settings_file(&path)?;
			let stop = settings.root;
			found.push(LoadedSettings { settings, path });

			if stop {
				break;
			}
		}

		match current_dir.parent() {
			Some(parent) => current_dir = parent.to_path_buf(),
			None => break,
		}
	}

	if let Some(user) = load_user_settings(&found)? {
		// A cascade that walked all the way up may already contain it.
		if !found.iter().any(|loaded| loaded.path == user.path) {
			found.push(user);
		}
	}

	Ok(found)
}

/// Load the user's ~/.treeprocess.toml if it exists and isn't disabled.
fn load_user_settings(existing: &[LoadedSettings]) -> Result<Option<LoadedSettings>> {
	for loaded in existing {
		if let Some(ref env_var) = loaded.settings.user_settings_disable_env_var
			&& is_env_truthy(env_var)
		{
			return Ok(None);
		}
	}

	let Some(home_dir) = dirs::home_dir() else {
		return Ok(None);
	};
	let path = home_dir.join(SETTINGS_FILE_NAME);

	if path.is_file() {
		let settings = parse_settings_file(&path)?;
		Ok(Some(LoadedSettings { settings, path }))
	} else {
		Ok(None)
	}
}

/// Check if an environment variable is set to a truthy value.
fn is_env_truthy(var_name: &str) -> bool {
	match std::env::var(var_name) {
		Ok(value) => {
			let lower = value.to_lowercase();
			!value.is_empty() && lower != "0" && lower != "false" && lower != "no"
		}
		Err(_) => false,
	}
}

/// Merge the cascade into effective settings. The most specific file wins per field.
pub fn merge_settings(loaded: &[LoadedSettings]) -> ResolvedSettings {
	let mut resolved = ResolvedSettings::default();
	let mut prefix = None;
	let mut extension = None;

	// Walk from least to most specific so later assignments win.
	for entry in loaded.iter().rev() {
		let base = entry.path.parent().unwrap_or(Path::new("."));
		let settings = &entry.settings;

		if let Some(ref dir) = settings.source {
			resolved.source = Some(base.join(dir));
		}
		if let Some(ref dir) = settings.output {
			resolved.output = Some(base.join(dir));
		}
		if let Some(ref dir) = settings.config {
			resolved.config = Some(base.join(dir));
		}
		if settings.config_prefix.is_some() {
			prefix = settings.config_prefix.clone();
		}
		if settings.config_extension.is_some() {
			extension = settings.config_extension.clone();
		}
		if settings.jobs.is_some() {
			resolved.jobs = settings.jobs;
		}
	}

	if let Some(prefix) = prefix {
		resolved.config_prefix = prefix;
	}
	if let Some(extension) = extension {
		resolved.config_extension = extension;
	}
	resolved.sources = loaded.iter().map(|entry| entry.path.clone()).collect();

	resolved
}

/// Convenience function to discover, load, and merge settings from a directory.
pub fn load_settings(start_dir: &Path) -> Result<ResolvedSettings> {
	let loaded = discover_settings(start_dir)?;
	Ok(merge_settings(&loaded))
}

/// Get the path to the user's settings file.
pub fn user_settings_path() -> Result<PathBuf> {
	let home_dir = dirs::home_dir().ok_or(TreeprocessError::HomeDirectoryNotFound)?;
	Ok(home_dir.join(SETTINGS_FILE_NAME))
}
