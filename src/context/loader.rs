use crate::context::flatten::flatten_context;
use crate::context::types::{BaseScope, CONFIG_KEY, EnvironmentContext, PARAMS_KEY};
use crate::error::{Result, TreeprocessError};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// Where build configs live and how their files are named.
#[derive(Debug, Clone)]
pub struct ConfigLayout {
	/// Directory holding the base and overlay documents.
	pub root: PathBuf,

	/// File name prefix, e.g. `build-config`.
	pub prefix: String,

	/// File extension without the dot, e.g. `json`.
	pub extension: String,
}

/// An environment overlay document found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayFile {
	pub name: String,
	pub path: PathBuf,
}

impl ConfigLayout {
	pub fn new(root: impl Into<PathBuf>, prefix: &str, extension: &str) -> Self {
		Self {
			root: root.into(),
			prefix: prefix.to_string(),
			extension: extension.to_string(),
		}
	}

	/// Path of the base document, `<root>/<prefix>.<ext>`.
	pub fn base_path(&self) -> PathBuf {
		self.root
			.join(format!("{}.{}", self.prefix, self.extension))
	}

	/// Extract the environment name from an overlay file name.
	///
	/// `build-config.staging.json` yields `staging`. The base file and names
	/// with further dots in the environment segment yield `None`.
	pub fn environment_name(&self, file_name: &str) -> Option<String> {
		let rest = file_name.strip_prefix(&self.prefix)?.strip_prefix('.')?;
		let name = rest
			.strip_suffix(&self.extension)?
			.strip_suffix('.')?;

		if name.is_empty() || name.contains('.') {
			None
		} else {
			Some(name.to_string())
		}
	}

	/// Scan the config root for overlay documents, sorted by environment name.
	pub fn discover_overlays(&self) -> Result<Vec<OverlayFile>> {
		let entries = std::fs::read_dir(&self.root).map_err(|source| TreeprocessError::ScanError {
			path: self.root.clone(),
			source,
		})?;

		let mut overlays = Vec::new();
		for entry in entries {
			let entry = entry.map_err(|source| TreeprocessError::ScanError {
				path: self.root.clone(),
				source,
			})?;
			let path = entry.path();
			if !path.is_file() {
				continue;
			}

			let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
				continue;
			};
			if let Some(name) = self.environment_name(file_name) {
				overlays.push(OverlayFile { name, path });
			}
		}

		overlays.sort_by(|a, b| a.name.cmp(&b.name));
		Ok(overlays)
	}
}

/// Read and parse one JSON build config document.
pub fn read_document(path: &Path) -> Result<Value> {
	let content =
		std::fs::read_to_string(path).map_err(|source| TreeprocessError::ConfigReadError {
			path: path.to_path_buf(),
			source,
		})?;

	serde_json::from_str(&content).map_err(|source| TreeprocessError::ConfigParseError {
		path: path.to_path_buf(),
		source,
	})
}

/// Extract the root `_config`/`_params` of the base document.
pub fn base_scope(document: &Value) -> Result<BaseScope> {
	let Value::Object(root) = document else {
		return Err(TreeprocessError::InvalidContextNode {
			key: String::new(),
			found: "a non-object document",
		});
	};

	Ok(BaseScope {
		config: scope_object(root, CONFIG_KEY)?,
		params: scope_object(root, PARAMS_KEY)?,
	})
}

fn scope_object(root: &Map<String, Value>, key: &str) -> Result<Map<String, Value>> {
	match root.get(key) {
		None | Some(Value::Null) => Ok(Map::new()),
		Some(Value::Object(map)) => Ok(map.clone()),
		Some(_) => Err(TreeprocessError::InvalidContextNode {
			key: key.to_string(),
			found: "a non-object scope",
		}),
	}
}

/// Load the base document and every environment overlay.
///
/// Each overlay is flattened with the base root scopes as ancestors. Any
/// unreadable or malformed document fails the whole load.
pub fn load_environments(layout: &ConfigLayout) -> Result<Vec<EnvironmentContext>> {
	let base_path = layout.base_path();
	if !base_path.is_file() {
		return Err(TreeprocessError::BaseConfigNotFound { path: base_path });
	}

	let base = base_scope(&read_document(&base_path)?)?;
	tracing::debug!(path = %base_path.display(), "loaded base config");

	layout
		.discover_overlays()?
		.into_iter()
		.map(|overlay| {
			let document = read_document(&overlay.path)?;
			let value = flatten_context(&document, &base.config, &base.params)?;
			tracing::debug!(
				environment = %overlay.name,
				items = value.len(),
				"loaded environment overlay"
			);
			Ok(EnvironmentContext {
				key: overlay.name,
				value,
			})
		})
		.collect()
}
