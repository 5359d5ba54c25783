use crate::adapters::{Adapters, Format};
use crate::context::POST_PROCESS_KEY;
use crate::error::{Result, TreeprocessError};
use crate::pipeline::job::{FileJob, Stage};
use serde_json::Value;
use std::path::Path;

/// Run one stage against a job.
pub fn run_stage(stage: Stage, job: &mut FileJob, adapters: &Adapters) -> Result<()> {
	match stage {
		Stage::Preprocess => preprocess(job, adapters),
		Stage::Postprocess => postprocess(job, adapters),
		Stage::Persist => persist(job),
	}
}

/// Read the source and expand it with the job's params into `code`.
pub fn preprocess(job: &mut FileJob, adapters: &Adapters) -> Result<()> {
	let target = job.target();
	tracing::info!(source = %job.source.display(), target = %target.display(), "Reading");

	let text = std::fs::read_to_string(&job.source).map_err(|source| TreeprocessError::ReadError {
		path: job.source.clone(),
		source,
	})?;

	let params = Value::Object(job.params.clone());
	tracing::info!(
		source = %job.source.display(),
		target = %target.display(),
		params = %params,
		"Compiling"
	);
	job.code = Some(adapters.preprocessor().preprocess(&text, &job.params));
	Ok(())
}

/// Minify `code` with the rule configured for the target extension.
///
/// No `post-process` table, or no truthy rule for the extension, is a no-op.
pub fn postprocess(job: &mut FileJob, adapters: &Adapters) -> Result<()> {
	let Some(rules) = job.config.get(POST_PROCESS_KEY) else {
		return Ok(());
	};
	let Some(extension) = job.extension.as_deref() else {
		return Ok(());
	};
	let Some(rule) = rules.get(extension).filter(|rule| is_enabled(rule)) else {
		return Ok(());
	};

	let minifier = Format::from_extension(extension)
		.and_then(|format| adapters.minifier(format).map(|minifier| (format, minifier)));
	let Some((format, minifier)) = minifier else {
		return Err(TreeprocessError::UnknownAdapter {
			extension: extension.to_string(),
			file: job.target(),
		});
	};

	let Some(code) = job.code.as_deref() else {
		return Ok(());
	};

	tracing::info!(target = %job.target().display(), format = %format, "Postprocessing");
	let minified = minifier
		.minify(code, rule)
		.map_err(|message| TreeprocessError::MinifyError {
			format: format.to_string(),
			file: job.target(),
			message,
		})?;
	job.code = Some(minified);
	Ok(())
}

/// A rule is enabled unless it is `null` or `false`.
fn is_enabled(rule: &Value) -> bool {
	!matches!(rule, Value::Null | Value::Bool(false))
}

/// Write `code` to the target, or copy the source when there is no code.
pub fn persist(job: &mut FileJob) -> Result<()> {
	std::fs::create_dir_all(&job.target_dir).map_err(|source| {
		TreeprocessError::CreateDirError {
			path: job.target_dir.clone(),
			source,
		}
	})?;

	let target = job.target();
	match job.code {
		Some(ref code) => {
			tracing::info!(source = %job.source.display(), target = %target.display(), "Persisting");
			std::fs::write(&target, code).map_err(|source| TreeprocessError::WriteError {
				path: target.clone(),
				source,
			})
		}
		None => {
			tracing::info!(source = %job.source.display(), target = %target.display(), "Copying");
			if job.is_folder {
				copy_dir_recursive(&job.source, &target)
			} else {
				copy_file(&job.source, &target)
			}
		}
	}
}

fn copy_file(from: &Path, to: &Path) -> Result<()> {
	std::fs::copy(from, to)
		.map(|_| ())
		.map_err(|source| TreeprocessError::CopyError {
			from: from.to_path_buf(),
			to: to.to_path_buf(),
			source,
		})
}

/// Copy a directory tree, overwriting existing files.
pub fn copy_dir_recursive(from: &Path, to: &Path) -> Result<()> {
	std::fs::create_dir_all(to).map_err(|source| TreeprocessError::CreateDirError {
		path: to.to_path_buf(),
		source,
	})?;

	let scan_error = |source| TreeprocessError::ScanError {
		path: from.to_path_buf(),
		source,
	};
	for entry in std::fs::read_dir(from).map_err(scan_error)? {
		let entry = entry.map_err(scan_error)?;
		let path = entry.path();
		let dest = to.join(entry.file_name());

		if path.is_dir() {
			copy_dir_recursive(&path, &dest)?;
		} else {
			copy_file(&path, &dest)?;
		}
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::adapters::Minifier;
	use serde_json::{Map, json};
	use std::collections::VecDeque;
	use std::fs;
	use std::path::PathBuf;

	fn job(dir: &Path, name: &str, config: Value) -> FileJob {
		let Value::Object(config) = config else {
			panic!("config must be an object");
		};
		FileJob {
			key: name.to_string(),
			source: dir.join("src").join(name),
			target_dir: dir.join("out"),
			target_name: name.to_string(),
			extension: Path::new(name)
				.extension()
				.map(|e| e.to_string_lossy().into_owned()),
			is_folder: false,
			stages: VecDeque::new(),
			config,
			params: Map::new(),
			code: None,
		}
	}

	struct Upper;

	impl Minifier for Upper {
		fn minify(&self, code: &str, _options: &Value) -> std::result::Result<String, String> {
			Ok(code.to_uppercase())
		}
	}

	struct Broken;

	impl Minifier for Broken {
		fn minify(&self, _code: &str, _options: &Value) -> std::result::Result<String, String> {
			Err("unexpected token".to_string())
		}
	}

	#[test]
	fn test_preprocess_expands_params() {
		let temp = tempfile::tempdir().unwrap();
		fs::create_dir_all(temp.path().join("src")).unwrap();
		fs::write(temp.path().join("src/a.html"), "<p><!-- @echo name --></p>").unwrap();

		let mut job = job(temp.path(), "a.html", json!({}));
		job.params.insert("name".to_string(), json!("World"));

		preprocess(&mut job, &Adapters::builtin()).unwrap();
		assert_eq!(job.code.as_deref(), Some("<p>World</p>"));
	}

	#[test]
	fn test_preprocess_missing_file_is_read_error() {
		let temp = tempfile::tempdir().unwrap();
		let mut job = job(temp.path(), "a.html", json!({}));
		let err = preprocess(&mut job, &Adapters::builtin()).unwrap_err();
		assert!(matches!(err, TreeprocessError::ReadError { .. }));
	}

	#[test]
	fn test_postprocess_without_rule_is_noop() {
		let temp = tempfile::tempdir().unwrap();
		let adapters = Adapters::builtin().with_minifier(Format::Js, Upper);

		let mut no_table = job(temp.path(), "a.js", json!({}));
		no_table.code = Some("var a;".to_string());
		postprocess(&mut no_table, &adapters).unwrap();
		assert_eq!(no_table.code.as_deref(), Some("var a;"));

		let mut other_ext = job(temp.path(), "a.js", json!({"post-process": {"css": {}}}));
		other_ext.code = Some("var a;".to_string());
		postprocess(&mut other_ext, &adapters).unwrap();
		assert_eq!(other_ext.code.as_deref(), Some("var a;"));

		let mut disabled = job(temp.path(), "a.js", json!({"post-process": {"js": false}}));
		disabled.code = Some("var a;".to_string());
		postprocess(&mut disabled, &adapters).unwrap();
		assert_eq!(disabled.code.as_deref(), Some("var a;"));
	}

	#[test]
	fn test_postprocess_applies_adapter() {
		let temp = tempfile::tempdir().unwrap();
		let adapters = Adapters::builtin().with_minifier(Format::Js, Upper);

		let mut job = job(temp.path(), "a.js", json!({"post-process": {"js": {}}}));
		job.code = Some("var a;".to_string());
		postprocess(&mut job, &adapters).unwrap();
		assert_eq!(job.code.as_deref(), Some("VAR A;"));
	}

	#[test]
	fn test_postprocess_unknown_adapter() {
		let temp = tempfile::tempdir().unwrap();
		let mut job = job(temp.path(), "logo.svg", json!({"post-process": {"svg": {}}}));
		job.code = Some("<svg/>".to_string());

		let err = postprocess(&mut job, &Adapters::builtin()).unwrap_err();
		match err {
			TreeprocessError::UnknownAdapter { extension, file } => {
				assert_eq!(extension, "svg");
				assert!(file.ends_with("logo.svg"));
			}
			other => panic!("Expected UnknownAdapter, got {other:?}"),
		}
		assert_eq!(job.code.as_deref(), Some("<svg/>"));
	}

	#[test]
	fn test_postprocess_minifier_error() {
		let temp = tempfile::tempdir().unwrap();
		let adapters = Adapters::builtin().with_minifier(Format::Css, Broken);
		let mut job = job(temp.path(), "a.css", json!({"post-process": {"css": {}}}));
		job.code = Some("a{}".to_string());

		let err = postprocess(&mut job, &adapters).unwrap_err();
		assert!(matches!(err, TreeprocessError::MinifyError { ref message, .. } if message == "unexpected token"));
	}

	#[test]
	fn test_persist_writes_code_and_creates_dirs() {
		let temp = tempfile::tempdir().unwrap();
		let mut job = job(temp.path(), "a.html", json!({}));
		job.target_dir = temp.path().join("out/prod/nested");
		job.code = Some("done".to_string());

		persist(&mut job).unwrap();
		assert_eq!(
			fs::read_to_string(temp.path().join("out/prod/nested/a.html")).unwrap(),
			"done"
		);
	}

	#[test]
	fn test_persist_copies_file_without_code() {
		let temp = tempfile::tempdir().unwrap();
		fs::create_dir_all(temp.path().join("src")).unwrap();
		fs::write(temp.path().join("src/logo.png"), [0u8, 159, 146, 150]).unwrap();

		let mut job = job(temp.path(), "logo.png", json!({}));
		persist(&mut job).unwrap();
		assert_eq!(
			fs::read(temp.path().join("out/logo.png")).unwrap(),
			vec![0u8, 159, 146, 150]
		);
	}

	#[test]
	fn test_persist_copies_folder_overwriting() {
		let temp = tempfile::tempdir().unwrap();
		let src: PathBuf = temp.path().join("src/fonts");
		fs::create_dir_all(src.join("woff")).unwrap();
		fs::write(src.join("a.ttf"), "new").unwrap();
		fs::write(src.join("woff/b.woff"), "b").unwrap();
		fs::create_dir_all(temp.path().join("out/fonts")).unwrap();
		fs::write(temp.path().join("out/fonts/a.ttf"), "old").unwrap();

		let mut job = job(temp.path(), "fonts", json!({}));
		job.is_folder = true;
		persist(&mut job).unwrap();

		assert_eq!(fs::read_to_string(temp.path().join("out/fonts/a.ttf")).unwrap(), "new");
		assert_eq!(
			fs::read_to_string(temp.path().join("out/fonts/woff/b.woff")).unwrap(),
			"b"
		);
	}
}
