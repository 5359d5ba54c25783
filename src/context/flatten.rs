use crate::context::merge::merge_scope;
use crate::context::types::{CONFIG_KEY, FlatItem, FlatMap, PARAMS_KEY};
use crate::error::{Result, TreeprocessError};
use serde_json::{Map, Value};

/// Flatten a context tree into a map of output key to item.
///
/// Each node's own `_config`/`_params` are merged onto the inherited scopes.
/// String leaves become items at `prefix/key`; objects are walked with the
/// merged scopes. Object nodes never produce an item of their own.
pub fn flatten_context(
	node: &Value,
	config: &Map<String, Value>,
	params: &Map<String, Value>,
) -> Result<FlatMap> {
	let mut items = FlatMap::new();
	flatten_into(node, config, params, "", &mut items)?;
	Ok(items)
}

fn flatten_into(
	node: &Value,
	config: &Map<String, Value>,
	params: &Map<String, Value>,
	prefix: &str,
	items: &mut FlatMap,
) -> Result<()> {
	let Value::Object(children) = node else {
		return Err(TreeprocessError::InvalidContextNode {
			key: prefix.to_string(),
			found: type_name(node),
		});
	};

	for reserved in [CONFIG_KEY, PARAMS_KEY] {
		if let Some(scope) = children.get(reserved)
			&& !matches!(scope, Value::Object(_) | Value::Null)
		{
			return Err(TreeprocessError::InvalidContextNode {
				key: join_key(prefix, reserved),
				found: type_name(scope),
			});
		}
	}

	let config = merge_scope(config, children.get(CONFIG_KEY));
	let params = merge_scope(params, children.get(PARAMS_KEY));

	for (key, child) in children {
		if key == CONFIG_KEY || key == PARAMS_KEY {
			continue;
		}

		let path = join_key(prefix, key);
		match child {
			Value::String(value) => {
				items.insert(
					path,
					FlatItem {
						value: value.clone(),
						config: config.clone(),
						params: params.clone(),
					},
				);
			}
			Value::Object(_) => flatten_into(child, &config, &params, &path, items)?,
			other => {
				return Err(TreeprocessError::InvalidContextNode {
					key: path,
					found: type_name(other),
				});
			}
		}
	}

	Ok(())
}

/// Join an output key onto a prefix with `/`.
pub fn join_key(prefix: &str, key: &str) -> String {
	let key = key.trim_matches('/');
	if prefix.is_empty() {
		key.to_string()
	} else if key.is_empty() {
		prefix.to_string()
	} else {
		format!("{prefix}/{key}")
	}
}

fn type_name(value: &Value) -> &'static str {
	match value {
		Value::Null => "null",
		Value::Bool(_) => "a boolean",
		Value::Number(_) => "a number",
		Value::String(_) => "a string",
		Value::Array(_) => "an array",
		Value::Object(_) => "an object",
	}
}
