//! Context resolution for builds.
//!
//! This module handles:
//! - Deep merging of `_config` and `_params` scopes
//! - Flattening a context tree into output key to item mappings
//! - Discovering and loading base and environment overlay documents

pub mod flatten;
pub mod loader;
pub mod merge;
pub mod types;

pub use flatten::{flatten_context, join_key};
pub use loader::{ConfigLayout, OverlayFile, load_environments, read_document};
pub use merge::{deep_merge, merge_scope};
pub use types::{
	BaseScope, CONFIG_KEY, EnvironmentContext, FlatItem, FlatMap, PARAMS_KEY, POST_PROCESS_KEY,
	VERBATIM_MARKER,
};
