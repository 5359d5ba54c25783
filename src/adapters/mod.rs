//! Collaborators invoked by the pipeline stages.
//!
//! This module handles:
//! - Template expansion of source text with a parameter mapping
//! - Format-specific minification selected by target extension

pub mod minify;
pub mod preprocess;

use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;

pub use minify::{CssMinifier, HtmlMinifier, JsMinifier};
pub use preprocess::DirectivePreprocessor;

/// Expands template directives in source text.
pub trait Preprocessor: Send + Sync {
	fn preprocess(&self, source: &str, params: &Map<String, Value>) -> String;
}

/// Minifies code of one format. Options are passed through untouched.
pub trait Minifier: Send + Sync {
	fn minify(&self, code: &str, options: &Value) -> Result<String, String>;
}

/// Formats with a post-process adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
	Js,
	Css,
	Html,
}

impl Format {
	/// Map a file extension (without the dot) to a format.
	pub fn from_extension(extension: &str) -> Option<Self> {
		match extension {
			"js" => Some(Format::Js),
			"css" => Some(Format::Css),
			"html" => Some(Format::Html),
			_ => None,
		}
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			Format::Js => "js",
			Format::Css => "css",
			Format::Html => "html",
		}
	}
}

impl fmt::Display for Format {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// The preprocessor and minifier table used by a build.
pub struct Adapters {
	preprocessor: Box<dyn Preprocessor>,
	minifiers: HashMap<Format, Box<dyn Minifier>>,
}

impl Adapters {
	/// Built-in directive preprocessor and js/css/html minifiers.
	pub fn builtin() -> Self {
		let mut minifiers: HashMap<Format, Box<dyn Minifier>> = HashMap::new();
		minifiers.insert(Format::Js, Box::new(JsMinifier));
		minifiers.insert(Format::Css, Box::new(CssMinifier));
		minifiers.insert(Format::Html, Box::new(HtmlMinifier));

		Self {
			preprocessor: Box::new(DirectivePreprocessor::new()),
			minifiers,
		}
	}

	/// Replace the preprocessor.
	pub fn with_preprocessor(mut self, preprocessor: impl Preprocessor + 'static) -> Self {
		self.preprocessor = Box::new(preprocessor);
		self
	}

	/// Replace the minifier for one format.
	pub fn with_minifier(mut self, format: Format, minifier: impl Minifier + 'static) -> Self {
		self.minifiers.insert(format, Box::new(minifier));
		self
	}

	/// Remove the minifier for one format.
	pub fn without_minifier(mut self, format: Format) -> Self {
		self.minifiers.remove(&format);
		self
	}

	pub fn preprocessor(&self) -> &dyn Preprocessor {
		self.preprocessor.as_ref()
	}

	pub fn minifier(&self, format: Format) -> Option<&dyn Minifier> {
		self.minifiers.get(&format).map(|m| m.as_ref())
	}
}

impl Default for Adapters {
	fn default() -> Self {
		Self::builtin()
	}
}

impl fmt::Debug for Adapters {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let mut formats: Vec<_> = self.minifiers.keys().map(Format::as_str).collect();
		formats.sort();
		f.debug_struct("Adapters")
			.field("minifiers", &formats)
			.finish_non_exhaustive()
	}
}
