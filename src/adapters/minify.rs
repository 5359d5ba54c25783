use crate::adapters::Minifier;
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

/// Read a boolean option, falling back to `default` when absent or not a bool.
fn flag(options: &Value, path: &[&str], default: bool) -> bool {
	let mut current = options;
	for key in path {
		match current.get(key) {
			Some(next) => current = next,
			None => return default,
		}
	}
	current.as_bool().unwrap_or(default)
}

/// CSS minifier backed by lightningcss.
#[derive(Debug, Default, Clone, Copy)]
pub struct CssMinifier;

impl Minifier for CssMinifier {
	fn minify(&self, code: &str, _options: &Value) -> Result<String, String> {
		let mut sheet =
			StyleSheet::parse(code, ParserOptions::default()).map_err(|e| e.to_string())?;
		sheet
			.minify(MinifyOptions::default())
			.map_err(|e| e.to_string())?;
		let printed = sheet
			.to_css(PrinterOptions {
				minify: true,
				..PrinterOptions::default()
			})
			.map_err(|e| e.to_string())?;
		Ok(printed.code)
	}
}

static HTML_RAW_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(
		r"(?is)<pre\b.*?</pre\s*>|<textarea\b.*?</textarea\s*>|<script\b.*?</script\s*>|<style\b.*?</style\s*>",
	)
	.expect("valid raw block pattern")
});

static HTML_COMMENT: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("valid comment pattern"));

static HTML_BREAK_BETWEEN_TAGS: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r">\s*\n\s*<").expect("valid tag gap pattern"));

static WHITESPACE_RUN: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace pattern"));

/// HTML minifier.
///
/// Options follow html-minifier naming: `removeComments` and
/// `collapseWhitespace`, both on by default. Conditional comments
/// (`<!--[if ...]>`) survive. Contents of `pre`, `textarea`, `script` and
/// `style` are copied untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct HtmlMinifier;

impl HtmlMinifier {
	fn minify_text(&self, text: &str, remove_comments: bool, collapse: bool) -> String {
		let mut text = text.to_string();
		if remove_comments {
			text = HTML_COMMENT
				.replace_all(&text, |caps: &regex::Captures| {
					let comment = &caps[0];
					if comment.starts_with("<!--[if") || comment.starts_with("<!--<![endif") {
						comment.to_string()
					} else {
						String::new()
					}
				})
				.into_owned();
		}
		if collapse {
			text = HTML_BREAK_BETWEEN_TAGS.replace_all(&text, "><").into_owned();
			text = WHITESPACE_RUN.replace_all(&text, " ").into_owned();
		}
		text
	}
}

impl Minifier for HtmlMinifier {
	fn minify(&self, code: &str, options: &Value) -> Result<String, String> {
		let remove_comments = flag(options, &["removeComments"], true);
		let collapse = flag(options, &["collapseWhitespace"], true);

		let mut output = String::with_capacity(code.len());
		let mut last = 0;
		for raw in HTML_RAW_BLOCK.find_iter(code) {
			output.push_str(&self.minify_text(&code[last..raw.start()], remove_comments, collapse));
			output.push_str(raw.as_str());
			last = raw.end();
		}
		output.push_str(&self.minify_text(&code[last..], remove_comments, collapse));

		Ok(if collapse {
			output.trim().to_string()
		} else {
			output
		})
	}
}

/// Conservative JavaScript minifier.
///
/// Strips comments (except `/*! ... */` banners), indentation, trailing
/// whitespace and blank lines. Line breaks are kept so automatic semicolon
/// insertion is unaffected. Set `output.comments` to `true` to keep comments.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsMinifier;

/// Keywords after which a `/` starts a regex literal.
const REGEX_PRECEDING_KEYWORDS: &[&str] = &[
	"return", "typeof", "case", "do", "else", "in", "of", "void", "delete", "throw", "new",
	"yield", "await", "instanceof",
];

fn regex_allowed(code: &str) -> bool {
	let trimmed = code.trim_end();
	let Some(last) = trimmed.chars().last() else {
		return true;
	};
	if "(,=:[!&|?{};+-*%<>~^".contains(last) {
		return true;
	}
	let word: String = trimmed
		.chars()
		.rev()
		.take_while(|c| c.is_alphanumeric() || *c == '_' || *c == '$')
		.collect::<Vec<_>>()
		.into_iter()
		.rev()
		.collect();
	REGEX_PRECEDING_KEYWORDS.contains(&word.as_str())
}

/// Scanner state of [`JsMinifier`].
struct JsScanner<'a> {
	chars: std::iter::Peekable<std::str::Chars<'a>>,
	line: String,
	lines: Vec<String>,
	keep_comments: bool,
}

impl<'a> JsScanner<'a> {
	fn new(code: &'a str, keep_comments: bool) -> Self {
		Self {
			chars: code.chars().peekable(),
			line: String::new(),
			lines: Vec::new(),
			keep_comments,
		}
	}

	fn end_line(&mut self) {
		let trimmed = self.line.trim();
		if !trimmed.is_empty() {
			self.lines.push(trimmed.to_string());
		}
		self.line.clear();
	}

	fn push_space(&mut self) {
		if !self.line.is_empty() && !self.line.ends_with(' ') {
			self.line.push(' ');
		}
	}

	/// Copy a quoted literal through its closing delimiter.
	fn copy_literal(&mut self, quote: char, what: &str) -> Result<(), String> {
		self.line.push(quote);
		while let Some(c) = self.chars.next() {
			self.line.push(c);
			if c == '\\' {
				match self.chars.next() {
					Some(escaped) => self.line.push(escaped),
					None => break,
				}
			} else if c == quote {
				return Ok(());
			} else if c == '\n' && quote != '`' {
				return Err(format!("unterminated {what}"));
			}
		}
		Err(format!("unterminated {what}"))
	}

	fn copy_regex(&mut self) -> Result<(), String> {
		self.line.push('/');
		let mut in_class = false;
		while let Some(c) = self.chars.next() {
			self.line.push(c);
			match c {
				'\\' => {
					if let Some(escaped) = self.chars.next() {
						self.line.push(escaped);
					}
				}
				'[' => in_class = true,
				']' => in_class = false,
				'/' if !in_class => return Ok(()),
				'\n' => break,
				_ => {}
			}
		}
		Err("unterminated regular expression".to_string())
	}

	fn block_comment(&mut self) -> Result<(), String> {
		let mut body = String::from("/*");
		let mut closed = false;
		while let Some(c) = self.chars.next() {
			body.push(c);
			if c == '*' && self.chars.peek() == Some(&'/') {
				self.chars.next();
				body.push('/');
				closed = true;
				break;
			}
		}
		if !closed {
			return Err("unterminated comment".to_string());
		}

		if self.keep_comments || body.starts_with("/*!") {
			self.line.push_str(&body);
		} else if body.contains('\n') {
			self.end_line();
		} else {
			self.push_space();
		}
		Ok(())
	}

	fn line_comment(&mut self) {
		let mut body = String::from("//");
		while let Some(&c) = self.chars.peek() {
			if c == '\n' {
				break;
			}
			body.push(c);
			self.chars.next();
		}
		if self.keep_comments {
			self.line.push_str(&body);
		}
	}

	fn run(mut self) -> Result<String, String> {
		while let Some(c) = self.chars.next() {
			match c {
				'\n' => self.end_line(),
				'\r' => {}
				' ' | '\t' => self.push_space(),
				'"' => self.copy_literal('"', "string")?,
				'\'' => self.copy_literal('\'', "string")?,
				'`' => self.copy_literal('`', "template literal")?,
				'/' => match self.chars.peek() {
					Some('/') => {
						self.chars.next();
						self.line_comment();
					}
					Some('*') => {
						self.chars.next();
						self.block_comment()?;
					}
					_ => {
						let before = self.lines.last().map_or("", String::as_str);
						let context = if self.line.trim().is_empty() {
							before
						} else {
							self.line.as_str()
						};
						if regex_allowed(context) {
							self.copy_regex()?;
						} else {
							self.line.push('/');
						}
					}
				},
				other => self.line.push(other),
			}
		}
		self.end_line();
		Ok(self.lines.join("\n"))
	}
}

impl Minifier for JsMinifier {
	fn minify(&self, code: &str, options: &Value) -> Result<String, String> {
		let keep_comments = flag(options, &["output", "comments"], false);
		JsScanner::new(code, keep_comments).run()
	}
}
