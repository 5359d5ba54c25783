use crate::context::FlatItem;
use crate::error::{Result, TreeprocessError};
use serde_json::{Map, Value};
use std::collections::VecDeque;
use std::fmt;
use std::path::{Path, PathBuf};

/// One step of a file job's pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
	/// Read the source and expand template directives.
	Preprocess,
	/// Minify according to the post-process rule for the target extension.
	Postprocess,
	/// Write the code, or copy the source when there is none.
	Persist,
}

impl Stage {
	pub fn as_str(&self) -> &'static str {
		match self {
			Stage::Preprocess => "PREPROCESS",
			Stage::Postprocess => "POSTPROCESS",
			Stage::Persist => "PERSIST",
		}
	}

	/// Stages for a job. Verbatim items and folders are only persisted.
	pub fn sequence(copy_only: bool) -> VecDeque<Stage> {
		if copy_only {
			VecDeque::from([Stage::Persist])
		} else {
			VecDeque::from([Stage::Preprocess, Stage::Postprocess, Stage::Persist])
		}
	}
}

impl fmt::Display for Stage {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// A concrete file (or folder) travelling through the pipeline.
#[derive(Debug, Clone)]
pub struct FileJob {
	/// Output-relative key the job was derived from.
	pub key: String,

	/// Absolute source path.
	pub source: PathBuf,

	/// Directory the target is written into.
	pub target_dir: PathBuf,

	/// File name of the target.
	pub target_name: String,

	/// Target extension without the dot.
	pub extension: Option<String>,

	/// Whether the source is a directory copied as a whole.
	pub is_folder: bool,

	/// Stages still to run, front first.
	pub stages: VecDeque<Stage>,

	pub config: Map<String, Value>,
	pub params: Map<String, Value>,

	/// Code produced by earlier stages; `None` means copy the source.
	pub code: Option<String>,
}

impl FileJob {
	/// Derive a job from a flattened item.
	///
	/// `target_root` is the environment's output directory. A missing source
	/// fails only this job.
	pub fn from_item(
		key: &str,
		item: &FlatItem,
		source_root: &Path,
		target_root: &Path,
	) -> Result<Self> {
		let source = source_root.join(item.source_path());
		let metadata = std::fs::metadata(&source).map_err(|e| match e.kind() {
			std::io::ErrorKind::NotFound => TreeprocessError::SourceNotFound {
				path: source.clone(),
			},
			_ => TreeprocessError::ReadError {
				path: source.clone(),
				source: e,
			},
		})?;
		let is_folder = metadata.is_dir();

		let key_path = Path::new(key);
		let target_name = key_path
			.file_name()
			.map(|name| name.to_string_lossy().into_owned())
			.unwrap_or_default();
		let target_dir = match key_path.parent() {
			Some(parent) => target_root.join(parent),
			None => target_root.to_path_buf(),
		};
		let extension = Path::new(&target_name)
			.extension()
			.map(|ext| ext.to_string_lossy().into_owned());

		Ok(FileJob {
			key: key.to_string(),
			source,
			target_dir,
			target_name,
			extension,
			is_folder,
			stages: Stage::sequence(item.is_verbatim() || is_folder),
			config: item.config.clone(),
			params: item.params.clone(),
			code: None,
		})
	}

	/// Full path of the target.
	pub fn target(&self) -> PathBuf {
		self.target_dir.join(&self.target_name)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::fs;

	fn item(value: &str) -> FlatItem {
		FlatItem {
			value: value.to_string(),
			config: Map::new(),
			params: Map::new(),
		}
	}

	#[test]
	fn test_stage_sequence() {
		assert_eq!(
			Stage::sequence(false),
			VecDeque::from([Stage::Preprocess, Stage::Postprocess, Stage::Persist])
		);
		assert_eq!(Stage::sequence(true), VecDeque::from([Stage::Persist]));
	}

	#[test]
	fn test_job_paths_from_item() {
		let temp = tempfile::tempdir().unwrap();
		let src = temp.path().join("src");
		fs::create_dir_all(src.join("js")).unwrap();
		fs::write(src.join("js/app.js"), "var a;").unwrap();

		let out = temp.path().join("out/prod");
		let job = FileJob::from_item("scripts/main.min.js", &item("js/app.js"), &src, &out).unwrap();

		assert_eq!(job.source, src.join("js/app.js"));
		assert_eq!(job.target_dir, out.join("scripts"));
		assert_eq!(job.target_name, "main.min.js");
		assert_eq!(job.extension.as_deref(), Some("js"));
		assert_eq!(job.target(), out.join("scripts/main.min.js"));
		assert!(!job.is_folder);
		assert!(job.code.is_none());
		assert_eq!(job.stages.len(), 3);
	}

	#[test]
	fn test_verbatim_item_only_persists() {
		let temp = tempfile::tempdir().unwrap();
		fs::create_dir_all(temp.path().join("static")).unwrap();
		fs::write(temp.path().join("static/logo.svg"), "<svg/>").unwrap();

		let job = FileJob::from_item(
			"logo.svg",
			&item("!static/logo.svg"),
			temp.path(),
			Path::new("/out/dev"),
		)
		.unwrap();

		assert_eq!(job.source, temp.path().join("static/logo.svg"));
		assert_eq!(job.target_dir, Path::new("/out/dev"));
		assert_eq!(job.stages, VecDeque::from([Stage::Persist]));
	}

	#[test]
	fn test_folder_only_persists() {
		let temp = tempfile::tempdir().unwrap();
		fs::create_dir_all(temp.path().join("fonts")).unwrap();

		let job = FileJob::from_item("fonts", &item("fonts"), temp.path(), Path::new("/out")).unwrap();
		assert!(job.is_folder);
		assert_eq!(job.stages, VecDeque::from([Stage::Persist]));
	}

	#[test]
	fn test_missing_source_is_path_error() {
		let temp = tempfile::tempdir().unwrap();
		let err = FileJob::from_item("a.html", &item("nope.html"), temp.path(), Path::new("/out"))
			.unwrap_err();
		assert!(matches!(err, TreeprocessError::SourceNotFound { .. }));
	}

	#[test]
	fn test_unreadable_source_is_io_error() {
		let temp = tempfile::tempdir().unwrap();
		fs::write(temp.path().join("plain.txt"), "x").unwrap();

		let err = FileJob::from_item(
			"a.html",
			&item("plain.txt/inner.html"),
			temp.path(),
			Path::new("/out"),
		)
		.unwrap_err();
		assert!(matches!(err, TreeprocessError::ReadError { .. }));
		assert_eq!(err.kind(), crate::error::FailureKind::Io);
	}
}
