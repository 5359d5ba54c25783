//! Deep merge of configuration and parameter scopes.
//!
//! Objects merge key by key. Arrays and scalars from the more specific side
//! replace the inherited value entirely.

use serde_json::{Map, Value};

/// Deep merge two JSON values, with `overlay` taking precedence over `base`.
///
/// - Objects are merged recursively: keys in overlay override keys in base
/// - Arrays, strings, numbers, booleans are replaced entirely
/// - If overlay is null, the base value is preserved (null means "not specified")
pub fn deep_merge(base: Value, overlay: Value) -> Value {
	match (base, overlay) {
		(Value::Object(mut base_map), Value::Object(overlay_map)) => {
			for (key, overlay_value) in overlay_map {
				let merged_value = match base_map.remove(&key) {
					Some(base_value) => deep_merge(base_value, overlay_value),
					None => overlay_value,
				};
				base_map.insert(key, merged_value);
			}
			Value::Object(base_map)
		}
		(base, Value::Null) => base,
		(_, overlay) => overlay,
	}
}

/// Merge a node's own scope onto an inherited scope, producing a new object.
///
/// Non-object scopes are ignored so the inherited one passes through unchanged.
pub fn merge_scope(inherited: &Map<String, Value>, own: Option<&Value>) -> Map<String, Value> {
	match own {
		Some(own @ Value::Object(_)) => {
			match deep_merge(Value::Object(inherited.clone()), own.clone()) {
				Value::Object(map) => map,
				_ => inherited.clone(),
			}
		}
		_ => inherited.clone(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	fn object(value: Value) -> Map<String, Value> {
		match value {
			Value::Object(map) => map,
			_ => panic!("expected an object"),
		}
	}

	#[test]
	fn test_merge_nested_objects() {
		let base = json!({
			"post-process": {"js": {"compress": true}, "css": {}},
			"debug": true
		});
		let overlay = json!({
			"post-process": {"js": {"mangle": false}}
		});
		let result = deep_merge(base, overlay);
		assert_eq!(
			result,
			json!({
				"post-process": {"js": {"compress": true, "mangle": false}, "css": {}},
				"debug": true
			})
		);
	}

	#[test]
	fn test_arrays_replaced_not_merged() {
		let result = deep_merge(json!({"items": [1, 2, 3]}), json!({"items": [4]}));
		assert_eq!(result, json!({"items": [4]}));
	}

	#[test]
	fn test_null_preserves_base() {
		let result = deep_merge(json!({"a": 1}), json!({"a": null}));
		assert_eq!(result, json!({"a": 1}));
	}

	#[test]
	fn test_scalar_replaces_object() {
		let result = deep_merge(json!({"value": {"nested": true}}), json!({"value": 42}));
		assert_eq!(result, json!({"value": 42}));
	}

	#[test]
	fn test_merge_scope_without_own_inherits() {
		let inherited = object(json!({"title": "Home"}));
		assert_eq!(merge_scope(&inherited, None), inherited);
		assert_eq!(merge_scope(&inherited, Some(&Value::Null)), inherited);
	}

	#[test]
	fn test_merge_scope_does_not_touch_inherited() {
		let inherited = object(json!({"title": "Home", "lang": "en"}));
		let own = json!({"title": "About"});
		let merged = merge_scope(&inherited, Some(&own));

		assert_eq!(merged, object(json!({"title": "About", "lang": "en"})));
		assert_eq!(inherited["title"], "Home");
	}
}
