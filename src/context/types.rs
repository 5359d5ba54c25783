use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Reserved key carrying a node's configuration scope.
pub const CONFIG_KEY: &str = "_config";

/// Reserved key carrying a node's template parameter scope.
pub const PARAMS_KEY: &str = "_params";

/// Prefix on a source expression meaning "copy verbatim".
pub const VERBATIM_MARKER: char = '!';

/// Key of the post-process rule table inside a configuration scope.
pub const POST_PROCESS_KEY: &str = "post-process";

/// One output path mapped to its source expression and merged scopes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlatItem {
	/// Source expression relative to the source root, possibly `!`-prefixed.
	pub value: String,

	/// Configuration merged from the root down to this leaf.
	pub config: Map<String, Value>,

	/// Template parameters merged from the root down to this leaf.
	pub params: Map<String, Value>,
}

impl FlatItem {
	/// Whether the value carries the verbatim marker.
	pub fn is_verbatim(&self) -> bool {
		self.value.starts_with(VERBATIM_MARKER)
	}

	/// The source path with any verbatim marker removed.
	pub fn source_path(&self) -> &str {
		self.value
			.strip_prefix(VERBATIM_MARKER)
			.unwrap_or(&self.value)
	}
}

/// Output-relative key to item. Keys are `/`-joined.
pub type FlatMap = BTreeMap<String, FlatItem>;

/// One named build variant and its flattened items.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnvironmentContext {
	/// Environment name taken from the overlay file name.
	pub key: String,

	/// Flattened items of the overlay.
	pub value: FlatMap,
}

/// Root configuration and parameters every environment inherits.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BaseScope {
	pub config: Map<String, Value>,
	pub params: Map<String, Value>,
}
