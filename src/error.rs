use std::path::PathBuf;

/// Library-level structured errors for treeprocess.
///
/// Use `thiserror` for structured errors that library consumers can match on.
/// The CLI binary wraps these with `anyhow` for rich context chains.
#[derive(Debug, thiserror::Error)]
pub enum TreeprocessError {
	#[error("Failed to read settings file: {path}")]
	SettingsReadError {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("Failed to parse settings file: {path}")]
	SettingsParseError {
		path: PathBuf,
		#[source]
		source: toml::de::Error,
	},

	#[error("Invalid setting '{key}' in {path}: {reason}")]
	InvalidSetting {
		key: &'static str,
		path: PathBuf,
		reason: String,
	},

	#[error("Base build config not found: {path}")]
	BaseConfigNotFound { path: PathBuf },

	#[error("Failed to read build config: {path}")]
	ConfigReadError {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("Failed to parse build config: {path}")]
	ConfigParseError {
		path: PathBuf,
		#[source]
		source: serde_json::Error,
	},

	#[error("Unknown environment '{name}': no overlay file matches")]
	UnknownEnvironment { name: String },

	#[error("Invalid context node '{key}': expected a string or an object, found {found}")]
	InvalidContextNode { key: String, found: &'static str },

	#[error("Invalid glob pattern: {pattern}")]
	InvalidGlob {
		pattern: String,
		#[source]
		source: glob::PatternError,
	},

	#[error("Failed to scan directory: {path}")]
	ScanError {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("Source not found: {path}")]
	SourceNotFound { path: PathBuf },

	#[error("Failed to read source file: {path}")]
	ReadError {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("Failed to write file: {path}")]
	WriteError {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("Failed to copy {from} to {to}")]
	CopyError {
		from: PathBuf,
		to: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("Failed to create directory: {path}")]
	CreateDirError {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("Configuration key '{extension}' not found for post-process commands ({file})")]
	UnknownAdapter { extension: String, file: PathBuf },

	#[error("Failed to minify {file} as {format}: {message}")]
	MinifyError {
		format: String,
		file: PathBuf,
		message: String,
	},

	#[error("Failed to build worker pool")]
	WorkerPool(#[from] rayon::ThreadPoolBuildError),

	#[error("Failed to resolve home directory")]
	HomeDirectoryNotFound,
}

/// Coarse classification of a failure, used by the run report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
	/// Settings or build configuration could not be loaded.
	Load,
	/// A source file or directory is missing.
	Path,
	/// A post-process rule has no adapter, or the adapter rejected the code.
	Adapter,
	/// Reading, writing or copying failed.
	Io,
}

impl FailureKind {
	pub fn as_str(&self) -> &'static str {
		match self {
			FailureKind::Load => "load",
			FailureKind::Path => "path",
			FailureKind::Adapter => "adapter",
			FailureKind::Io => "io",
		}
	}
}

impl TreeprocessError {
	/// Classify this error for reporting.
	pub fn kind(&self) -> FailureKind {
		match self {
			TreeprocessError::SettingsReadError { .. }
			| TreeprocessError::SettingsParseError { .. }
			| TreeprocessError::InvalidSetting { .. }
			| TreeprocessError::BaseConfigNotFound { .. }
			| TreeprocessError::ConfigReadError { .. }
			| TreeprocessError::ConfigParseError { .. }
			| TreeprocessError::InvalidContextNode { .. }
			| TreeprocessError::UnknownEnvironment { .. }
			| TreeprocessError::InvalidGlob { .. }
			| TreeprocessError::HomeDirectoryNotFound => FailureKind::Load,
			TreeprocessError::SourceNotFound { .. } => FailureKind::Path,
			TreeprocessError::UnknownAdapter { .. } | TreeprocessError::MinifyError { .. } => {
				FailureKind::Adapter
			}
			TreeprocessError::ScanError { .. }
			| TreeprocessError::ReadError { .. }
			| TreeprocessError::WriteError { .. }
			| TreeprocessError::CopyError { .. }
			| TreeprocessError::CreateDirError { .. }
			| TreeprocessError::WorkerPool(_) => FailureKind::Io,
		}
	}
}

/// Result type alias using TreeprocessError.
pub type Result<T> = std::result::Result<T, TreeprocessError>;
