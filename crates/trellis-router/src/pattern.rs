//! Path pattern compilation and matching.
//!
//! Patterns are plain paths with named parameters:
//!
//! - `/users`: literal match
//! - `/users/:id`: `:id` captures one path segment
//! - `/users/:id/:tab?`: a trailing `?` makes the parameter optional
//!
//! Matching is case-insensitive and trailing-slash-insensitive: the pattern
//! `/a/b/c/` matches the path `/a/b/c` and vice versa. Captured values are
//! percent-encoded on the wire; [`decode_capture`] turns a raw capture into
//! its decoded form.

use percent_encoding::percent_decode_str;
use regex::RegexBuilder;

use trellis_http::{Error, Result};

/// Maximum allowed length for a pattern string in bytes.
const MAX_PATTERN_LENGTH: usize = 1024;

/// Maximum allowed number of path segments in a pattern.
const MAX_PATH_SEGMENTS: usize = 32;

/// Maximum allowed size for a compiled pattern regex (in bytes).
const MAX_REGEX_SIZE: usize = 1 << 20; // 1 MiB

/// A compiled path pattern: a matcher plus the declared parameter names in
/// declaration order.
#[derive(Debug, Clone)]
pub struct PathPattern {
	/// The normalized source pattern (always begins with `/`).
	pattern: String,
	/// Compiled matcher.
	regex: regex::Regex,
	/// Parameter names in declaration order.
	param_names: Vec<String>,
}

impl PathPattern {
	/// Compiles a pattern string.
	///
	/// The pattern is normalized to begin with `/` first. Compilation fails
	/// with [`Error::Pattern`] if the pattern is oversized or a parameter
	/// name is malformed; this is a registration-time error, never deferred
	/// to matching.
	///
	/// # Examples
	///
	/// ```
	/// use trellis_router::PathPattern;
	///
	/// let pattern = PathPattern::compile("/a/:id/:subid").unwrap();
	/// assert_eq!(pattern.param_names(), &["id", "subid"]);
	/// assert!(pattern.is_match("/a/100/300"));
	/// assert!(!pattern.is_match("/a/100"));
	/// ```
	pub fn compile(pattern: &str) -> Result<Self> {
		let normalized = normalize_path(pattern);

		if normalized.len() > MAX_PATTERN_LENGTH {
			return Err(Error::Pattern(format!(
				"pattern length {} exceeds maximum of {} bytes",
				normalized.len(),
				MAX_PATTERN_LENGTH
			)));
		}
		let segment_count = normalized.split('/').count();
		if segment_count > MAX_PATH_SEGMENTS {
			return Err(Error::Pattern(format!(
				"pattern has {} path segments, exceeding maximum of {}",
				segment_count, MAX_PATH_SEGMENTS
			)));
		}

		let (regex_str, param_names) = compile_segments(&normalized)?;
		let regex = RegexBuilder::new(&regex_str)
			.case_insensitive(true)
			.size_limit(MAX_REGEX_SIZE)
			.build()
			.map_err(|e| Error::Pattern(format!("failed to compile {normalized:?}: {e}")))?;

		Ok(Self {
			pattern: normalized,
			regex,
			param_names,
		})
	}

	/// Returns the normalized source pattern.
	pub fn pattern(&self) -> &str {
		&self.pattern
	}

	/// Returns the declared parameter names in order.
	pub fn param_names(&self) -> &[String] {
		&self.param_names
	}

	/// Tests a path against this pattern.
	pub fn is_match(&self, path: &str) -> bool {
		self.regex.is_match(path)
	}

	/// Matches a path and returns raw captures in declaration order.
	///
	/// An optional parameter that did not participate in the match yields
	/// `None` in its slot.
	pub fn matches(&self, path: &str) -> Option<Vec<Option<String>>> {
		self.regex.captures(path).map(|caps| {
			(1..=self.param_names.len())
				.map(|i| caps.get(i).map(|m| m.as_str().to_string()))
				.collect()
		})
	}
}

impl std::fmt::Display for PathPattern {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.pattern)
	}
}

/// Prepends `/` if the path does not already begin with one.
pub(crate) fn normalize_path(path: &str) -> String {
	if path.starts_with('/') {
		path.to_string()
	} else {
		format!("/{path}")
	}
}

/// Decodes one raw capture. An absent or empty capture decodes to the empty
/// string; decoding is total over its input.
pub fn decode_capture(raw: Option<&str>) -> String {
	match raw {
		Some(value) if !value.is_empty() => {
			percent_decode_str(value).decode_utf8_lossy().into_owned()
		}
		_ => String::new(),
	}
}

/// Compiles a normalized pattern segment by segment.
///
/// A required parameter segment becomes `/([^/]+?)`; an optional one folds
/// its leading slash into the group, `(?:/([^/]+?))?`, so `/a/:id?` matches
/// both `/a` and `/a/7`. The final `/?` gives trailing-slash insensitivity.
fn compile_segments(pattern: &str) -> Result<(String, Vec<String>)> {
	let trimmed = pattern.strip_suffix('/').unwrap_or(pattern);
	let mut regex_str = String::from("^");
	let mut param_names = Vec::new();

	for segment in trimmed.split('/').skip(1) {
		if let Some(param) = segment.strip_prefix(':') {
			let (name, optional) = match param.strip_suffix('?') {
				Some(name) => (name, true),
				None => (param, false),
			};
			if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
				return Err(Error::Pattern(format!(
					"invalid parameter name {name:?} in pattern {pattern:?}"
				)));
			}
			param_names.push(name.to_string());
			if optional {
				regex_str.push_str("(?:/([^/]+?))?");
			} else {
				regex_str.push_str("/([^/]+?)");
			}
		} else {
			regex_str.push('/');
			for c in segment.chars() {
				if matches!(
					c,
					'.' | '+' | '*' | '?' | '(' | ')' | '[' | ']' | '{' | '}' | '^' | '$' | '|'
						| '\\'
				) {
					regex_str.push('\\');
				}
				regex_str.push(c);
			}
		}
	}

	regex_str.push_str("/?$");
	Ok((regex_str, param_names))
}
