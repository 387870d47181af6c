//! Secret wrapper that keeps token material out of logs.

// self
use crate::_prelude::*;

/// Redacted token secret wrapper keeping sensitive material out of logs.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenSecret(String);
impl TokenSecret {
	/// Wraps a new secret string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the inner token value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// Returns `true` when the secret holds no characters.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Compares `candidate` against the secret without short-circuiting on content.
	pub fn matches(&self, candidate: &str) -> bool {
		constant_time_eq(self.0.as_bytes(), candidate.as_bytes())
	}
}
impl AsRef<str> for TokenSecret {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
impl Debug for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("TokenSecret").field(&"<redacted>").finish()
	}
}
impl Display for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

/// Byte comparison whose running time depends only on the input lengths.
pub(crate) fn constant_time_eq(expected: &[u8], candidate: &[u8]) -> bool {
	expected.len() == candidate.len()
		&& expected.iter().zip(candidate).fold(0_u8, |acc, (a, b)| acc | (a ^ b)) == 0
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn secret_formatters_redact() {
		let secret = TokenSecret::new("u-refresh-secret");

		assert_eq!(format!("{secret:?}"), "TokenSecret(\"<redacted>\")");
		assert_eq!(format!("{secret}"), "<redacted>");
		assert_eq!(secret.expose(), "u-refresh-secret");
		assert!(TokenSecret::new("").is_empty());
		assert!(secret.matches("u-refresh-secret"));
		assert!(!secret.matches("u-refresh-secreT"));
		assert!(!secret.matches("u-refresh"));
	}
}
