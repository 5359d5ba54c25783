use crate::adapters::Preprocessor;
use regex::{Captures, Regex};
use serde_json::{Map, Value};

/// Comment-directive preprocessor.
///
/// Directives live in `<!-- -->`, `/* */` or `//` comments:
/// - `@echo NAME` is replaced by the parameter's value
/// - `@if NAME`, `@if NAME == 'v'`, `@if NAME != 'v'`, `@ifdef NAME`,
///   `@ifndef NAME`, `@else` and `@endif` keep or drop the lines between them
///
/// Names may be dotted to reach into nested parameters.
#[derive(Debug)]
pub struct DirectivePreprocessor {
	echo: Regex,
	block: Regex,
	condition: Regex,
}

impl DirectivePreprocessor {
	pub fn new() -> Self {
		Self {
			echo: Regex::new(
				r"<!--\s*@echo\s+([\w.-]+)\s*-->|/\*\s*@echo\s+([\w.-]+)\s*\*/|//\s*@echo\s+([\w.-]+)",
			)
			.expect("valid echo pattern"),
			block: Regex::new(
				r"^\s*(?:<!--|/\*|//)\s*@(ifdef|ifndef|if|else|endif)\b\s*(.*?)\s*(?:-->|\*/)?\s*$",
			)
			.expect("valid block pattern"),
			condition: Regex::new(r#"^([\w.-]+)\s*(?:(==|!=)\s*['"]?(.*?)['"]?)?$"#)
				.expect("valid condition pattern"),
		}
	}

	fn evaluate(&self, directive: &str, argument: &str, params: &Map<String, Value>) -> bool {
		let Some(caps) = self.condition.captures(argument) else {
			return false;
		};
		let value = lookup(params, &caps[1]);

		match directive {
			"ifdef" => value.is_some(),
			"ifndef" => value.is_none(),
			_ => match caps.get(2).map(|m| m.as_str()) {
				Some("==") => value.map(display_value).as_deref() == Some(&caps[3]),
				Some("!=") => value.map(display_value).as_deref() != Some(&caps[3]),
				_ => value.is_some_and(is_truthy),
			},
		}
	}
}

impl Default for DirectivePreprocessor {
	fn default() -> Self {
		Self::new()
	}
}

/// One open conditional block.
struct Frame {
	/// Whether the enclosing block emits lines.
	parent_active: bool,
	/// Whether the `@if` branch was taken.
	taken: bool,
	in_else: bool,
}

impl Frame {
	fn active(&self) -> bool {
		self.parent_active && (self.taken != self.in_else)
	}
}

impl Preprocessor for DirectivePreprocessor {
	fn preprocess(&self, source: &str, params: &Map<String, Value>) -> String {
		let mut output = Vec::new();
		let mut stack: Vec<Frame> = Vec::new();

		for line in source.split_inclusive('\n') {
			let active = stack.last().is_none_or(Frame::active);

			if let Some(caps) = self.block.captures(line.trim_end_matches(['\n', '\r'])) {
				match &caps[1] {
					"endif" => {
						stack.pop();
					}
					"else" => {
						if let Some(frame) = stack.last_mut() {
							frame.in_else = true;
						}
					}
					directive => {
						let taken = active && self.evaluate(directive, &caps[2], params);
						stack.push(Frame {
							parent_active: active,
							taken,
							in_else: false,
						});
					}
				}
				continue;
			}

			if active {
				let expanded = self.echo.replace_all(line, |caps: &Captures| {
					let name = caps
						.get(1)
						.or_else(|| caps.get(2))
						.or_else(|| caps.get(3))
						.map_or("", |m| m.as_str());
					lookup(params, name).map(display_value).unwrap_or_default()
				});
				output.push(expanded.into_owned());
			}
		}

		output.concat()
	}
}

/// Resolve a dotted name against the parameters.
fn lookup<'a>(params: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
	let mut parts = name.split('.');
	let mut current = params.get(parts.next()?)?;
	for part in parts {
		current = current.as_object()?.get(part)?;
	}
	Some(current)
}

fn display_value(value: &Value) -> String {
	match value {
		Value::Null => String::new(),
		Value::String(s) => s.clone(),
		other => other.to_string(),
	}
}

fn is_truthy(value: &Value) -> bool {
	match value {
		Value::Null => false,
		Value::Bool(b) => *b,
		Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
		Value::String(s) => !s.is_empty(),
		Value::Array(_) | Value::Object(_) => true,
	}
}
