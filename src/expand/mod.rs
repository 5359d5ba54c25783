//! Glob expansion of flattened items.
//!
//! Items whose source expression is a glob pattern are replaced by one item
//! per filesystem match. Keys are rebuilt from the match's path below the
//! pattern's static root; config and params are inherited unchanged.

use crate::context::{EnvironmentContext, FlatItem, FlatMap, VERBATIM_MARKER, join_key};
use crate::error::{Result, TreeprocessError};
use glob::MatchOptions;
use std::path::{Component, Path};

/// Characters that make a path segment a pattern.
const GLOB_META: &[char] = &['*', '?', '['];

/// Whether a source expression contains glob metacharacters.
pub fn has_magic(pattern: &str) -> bool {
	pattern.contains(GLOB_META)
}

/// The longest leading run of path segments without metacharacters.
///
/// `assets/**/*.png` has static root `assets`; `*.css` has an empty one.
pub fn static_root(pattern: &str) -> String {
	pattern
		.split('/')
		.take_while(|segment| !has_magic(segment))
		.collect::<Vec<_>>()
		.join("/")
}

/// Drop leading `./` and `/` segments so the static root lines up with matches.
fn normalize_pattern(pattern: &str) -> &str {
	let mut pattern = pattern;
	loop {
		if let Some(rest) = pattern.strip_prefix("./") {
			pattern = rest;
		} else if let Some(rest) = pattern.strip_prefix('/') {
			pattern = rest;
		} else {
			return pattern;
		}
	}
}

/// Remove matches that contain other matches.
///
/// `pages/**/*` matches `pages/d` as well as `pages/d/a.html`; only the file
/// survives, so folder copies never overlap file jobs.
fn leaf_matches(matches: Vec<String>) -> Vec<String> {
	let parents: Vec<String> = matches
		.iter()
		.filter(|candidate| {
			let prefix = format!("{candidate}/");
			matches.iter().any(|other| other.starts_with(&prefix))
		})
		.cloned()
		.collect();

	matches
		.into_iter()
		.filter(|candidate| !parents.contains(candidate))
		.collect()
}

fn match_options() -> MatchOptions {
	MatchOptions {
		case_sensitive: true,
		require_literal_separator: true,
		require_literal_leading_dot: true,
	}
}

/// Resolve a pattern below `source_root`, returning matches relative to it.
///
/// Results are `/`-joined and sorted.
pub fn resolve_pattern(source_root: &Path, pattern: &str) -> Result<Vec<String>> {
	let root = source_root.to_string_lossy();
	let full = format!(
		"{}/{}",
		glob::Pattern::escape(root.trim_end_matches('/')),
		pattern.trim_start_matches('/')
	);

	let paths = glob::glob_with(&full, match_options()).map_err(|source| {
		TreeprocessError::InvalidGlob {
			pattern: pattern.to_string(),
			source,
		}
	})?;

	let mut matches = Vec::new();
	for entry in paths {
		match entry {
			Ok(path) => {
				if let Ok(relative) = path.strip_prefix(source_root) {
					matches.push(to_slash(relative));
				}
			}
			Err(e) => {
				tracing::warn!(pattern, error = %e, "skipping unreadable glob match");
			}
		}
	}

	matches.sort();
	Ok(matches)
}

/// Expand one item. Concrete items come back unchanged as a single entry.
pub fn expand_item(
	key: &str,
	item: &FlatItem,
	source_root: &Path,
) -> Result<Vec<(String, FlatItem)>> {
	let verbatim = item.is_verbatim();
	let pattern = normalize_pattern(item.source_path());

	if !has_magic(pattern) {
		return Ok(vec![(key.to_string(), item.clone())]);
	}

	let root = static_root(pattern);
	let matches = leaf_matches(resolve_pattern(source_root, pattern)?);
	if matches.is_empty() {
		tracing::warn!(key, pattern, "glob matched no files");
	}

	Ok(matches
		.into_iter()
		.map(|rel_match| {
			let rel_from_root = relative_to(&rel_match, &root);
			let value = if verbatim {
				format!("{VERBATIM_MARKER}{rel_match}")
			} else {
				rel_match
			};
			(
				join_key(key, &rel_from_root),
				FlatItem {
					value,
					config: item.config.clone(),
					params: item.params.clone(),
				},
			)
		})
		.collect())
}

/// Expand every glob item of a flat map into a new map.
///
/// Replacements are collected first and applied as one batch, so the input
/// is never mutated while being walked.
pub fn expand_globs(items: &FlatMap, source_root: &Path) -> Result<FlatMap> {
	let mut expanded = FlatMap::new();
	for (key, item) in items {
		for (new_key, new_item) in expand_item(key, item, source_root)? {
			expanded.insert(new_key, new_item);
		}
	}
	Ok(expanded)
}

/// Expand an environment, keeping its name.
pub fn expand_environment(
	env: &EnvironmentContext,
	source_root: &Path,
) -> Result<EnvironmentContext> {
	Ok(EnvironmentContext {
		key: env.key.clone(),
		value: expand_globs(&env.value, source_root)?,
	})
}

fn relative_to(path: &str, root: &str) -> String {
	if root.is_empty() {
		return path.to_string();
	}
	Path::new(path)
		.strip_prefix(root)
		.map(to_slash)
		.unwrap_or_else(|_| path.to_string())
}

fn to_slash(path: &Path) -> String {
	path.components()
		.filter_map(|component| match component {
			Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
			_ => None,
		})
		.collect::<Vec<_>>()
		.join("/")
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::{Map, Value, json};
	use std::fs;

	fn item(value: &str, params: Value) -> FlatItem {
		let Value::Object(params) = params else {
			panic!("params must be an object");
		};
		FlatItem {
			value: value.to_string(),
			config: Map::new(),
			params,
		}
	}

	fn source_tree() -> tempfile::TempDir {
		let temp = tempfile::tempdir().unwrap();
		let root = temp.path();
		fs::create_dir_all(root.join("assets/icons")).unwrap();
		fs::write(root.join("assets/top.png"), "top").unwrap();
		fs::write(root.join("assets/icons/a.png"), "a").unwrap();
		fs::write(root.join("assets/icons/b.png"), "b").unwrap();
		fs::write(root.join("assets/icons/readme.txt"), "txt").unwrap();
		fs::write(root.join("assets/.hidden.png"), "hidden").unwrap();
		temp
	}

	#[test]
	fn test_has_magic() {
		assert!(has_magic("assets/*.png"));
		assert!(has_magic("a/file?.txt"));
		assert!(has_magic("a/[ab].txt"));
		assert!(!has_magic("templates/index.html"));
	}

	#[test]
	fn test_static_root() {
		assert_eq!(static_root("assets/**/*.png"), "assets");
		assert_eq!(static_root("a/b/*.css"), "a/b");
		assert_eq!(static_root("*.css"), "");
		assert_eq!(static_root("a/*/c/*.txt"), "a");
	}

	#[test]
	fn test_concrete_items_unchanged() {
		let temp = source_tree();
		let mut items = FlatMap::new();
		items.insert(
			"index.html".to_string(),
			item("!templates/index.html", json!({"x": 1})),
		);

		let expanded = expand_globs(&items, temp.path()).unwrap();
		assert_eq!(expanded, items);
	}

	#[test]
	fn test_double_star_expands_relative_to_static_root() {
		let temp = source_tree();
		let mut items = FlatMap::new();
		items.insert(
			"img".to_string(),
			item("assets/**/*.png", json!({"title": "x"})),
		);

		let expanded = expand_globs(&items, temp.path()).unwrap();
		let keys: Vec<_> = expanded.keys().cloned().collect();

		assert_eq!(keys, vec!["img/icons/a.png", "img/icons/b.png", "img/top.png"]);
		assert_eq!(expanded["img/icons/a.png"].value, "assets/icons/a.png");
		assert_eq!(expanded["img/icons/a.png"].params["title"], "x");
		assert!(!expanded.contains_key("img"));
	}

	#[test]
	fn test_verbatim_marker_preserved() {
		let temp = source_tree();
		let mut items = FlatMap::new();
		items.insert("icons".to_string(), item("!assets/icons/*.png", json!({})));

		let expanded = expand_globs(&items, temp.path()).unwrap();

		assert_eq!(expanded.len(), 2);
		for (key, expanded_item) in &expanded {
			assert!(key.starts_with("icons/"));
			assert!(expanded_item.value.starts_with("!assets/icons/"));
		}
	}

	#[test]
	fn test_dot_slash_pattern_uses_same_static_root() {
		let temp = source_tree();
		let mut items = FlatMap::new();
		items.insert("img".to_string(), item("./assets/icons/*.png", json!({})));
		items.insert("all".to_string(), item("/assets/**/*.png", json!({})));

		let expanded = expand_globs(&items, temp.path()).unwrap();
		let keys: Vec<_> = expanded.keys().cloned().collect();

		assert_eq!(
			keys,
			vec![
				"all/icons/a.png",
				"all/icons/b.png",
				"all/top.png",
				"img/a.png",
				"img/b.png",
			]
		);
		assert_eq!(expanded["img/a.png"].value, "assets/icons/a.png");
	}

	#[test]
	fn test_directory_matches_with_children_are_dropped() {
		let temp = source_tree();
		fs::create_dir_all(temp.path().join("assets/empty")).unwrap();
		let mut items = FlatMap::new();
		items.insert("site".to_string(), item("assets/**/*", json!({})));

		let expanded = expand_globs(&items, temp.path()).unwrap();
		let keys: Vec<_> = expanded.keys().cloned().collect();

		assert_eq!(
			keys,
			vec![
				"site/empty",
				"site/icons/a.png",
				"site/icons/b.png",
				"site/icons/readme.txt",
				"site/top.png",
			]
		);
	}

	#[test]
	fn test_normalize_pattern() {
		assert_eq!(normalize_pattern("./assets/*.png"), "assets/*.png");
		assert_eq!(normalize_pattern("/./assets/*.png"), "assets/*.png");
		assert_eq!(normalize_pattern("assets/*.png"), "assets/*.png");
	}

	#[test]
	fn test_single_star_does_not_cross_directories() {
		let temp = source_tree();
		let mut items = FlatMap::new();
		items.insert("out".to_string(), item("assets/*.png", json!({})));

		let expanded = expand_globs(&items, temp.path()).unwrap();
		assert_eq!(expanded.keys().collect::<Vec<_>>(), vec!["out/top.png"]);
	}

	#[test]
	fn test_no_matches_removes_item() {
		let temp = source_tree();
		let mut items = FlatMap::new();
		items.insert("none".to_string(), item("missing/*.js", json!({})));
		items.insert("keep.html".to_string(), item("keep.html", json!({})));

		let expanded = expand_globs(&items, temp.path()).unwrap();
		assert_eq!(expanded.keys().collect::<Vec<_>>(), vec!["keep.html"]);
	}

	#[test]
	fn test_invalid_pattern_is_an_error() {
		let temp = source_tree();
		let mut items = FlatMap::new();
		items.insert("bad".to_string(), item("assets/[.png", json!({})));

		let err = expand_globs(&items, temp.path()).unwrap_err();
		assert!(matches!(err, TreeprocessError::InvalidGlob { .. }));
	}
}
