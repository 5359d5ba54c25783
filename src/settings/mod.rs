//! Settings of the tool itself.
//!
//! This module handles:
//! - `.treeprocess.toml` parsing
//! - Directory cascade discovery
//! - Settings merging

pub mod cascade;
pub mod parser;
pub mod types;

pub use cascade::{
	SETTINGS_FILE_NAME, discover_settings, load_settings, merge_settings, user_settings_path,
};
pub use parser::{generate_init_template, parse_settings_file, parse_settings_str};
pub use types::{LoadedSettings, ResolvedSettings, Settings};
