//! Minimal HTML pages for the browser-facing authorization routes.
//!
//! Pages never render token material; only expiry instants and status flags.

// crates.io
use time::format_description::well_known::Rfc3339;
// self
use crate::{_prelude::*, flows::CredentialStatus};

/// Start page linking to the upstream consent screen.
pub fn start(authorize_url: &Url, status: &CredentialStatus) -> String {
	let body = format!(
		"<h1>Lark Token Broker</h1>\
		<p>Current status: <strong>{}</strong></p>\
		{}\
		<p><a href=\"{}\">Authorize with Lark</a></p>",
		if status.authorized { "authorized" } else { "not authorized" },
		expiry_list(status),
		escape(authorize_url.as_str()),
	);

	layout("Lark Token Broker", &body)
}

/// Page shown after a successful code exchange.
pub fn success(status: &CredentialStatus) -> String {
	let body = format!(
		"<h1>Authorization Successful</h1>\
		<p>The broker now holds a refresh token.</p>\
		{}\
		<p>You can close this window.</p>",
		expiry_list(status),
	);

	layout("Authorization Successful", &body)
}

/// Page shown when beginning or completing authorization failed.
pub fn failure(error: &Error) -> String {
	let body = format!(
		"<h1>Authorization Failed</h1>\
		<p>{}</p>\
		<p><code>{}</code></p>\
		<p><a href=\"/\">Start over</a></p>",
		escape(&error.to_string()),
		error.code(),
	);

	layout("Authorization Failed", &body)
}

fn expiry_list(status: &CredentialStatus) -> String {
	let mut items = String::new();

	if let Some(expires_at) = status.access_token_expires_at {
		items.push_str(&format!(
			"<li>Access token expires at {} (in {}s)</li>",
			rfc3339(expires_at),
			status.access_token_expires_in,
		));
	}
	if let Some(expires_at) = status.refresh_token_expires_at {
		items.push_str(&format!("<li>Refresh token expires at {}</li>", rfc3339(expires_at)));
	}
	if let Some(updated_at) = status.updated_at {
		items.push_str(&format!("<li>Last updated at {}</li>", rfc3339(updated_at)));
	}

	if items.is_empty() { items } else { format!("<ul>{items}</ul>") }
}

fn rfc3339(instant: OffsetDateTime) -> String {
	instant.format(&Rfc3339).unwrap_or_else(|_| instant.to_string())
}

fn layout(title: &str, body: &str) -> String {
	format!(
		"<!DOCTYPE html><html lang=\"en\"><head><meta charset=\"utf-8\">\
		<title>{title}</title></head><body>{body}</body></html>"
	)
}

fn escape(raw: &str) -> String {
	let mut escaped = String::with_capacity(raw.len());

	for c in raw.chars() {
		match c {
			'&' => escaped.push_str("&amp;"),
			'<' => escaped.push_str("&lt;"),
			'>' => escaped.push_str("&gt;"),
			'"' => escaped.push_str("&quot;"),
			'\'' => escaped.push_str("&#39;"),
			_ => escaped.push(c),
		}
	}

	escaped
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;
	use crate::{auth::TokenStatus, flows::AuthorizationPhase};

	fn status() -> CredentialStatus {
		CredentialStatus {
			authorized: true,
			token_status: TokenStatus::Active,
			access_token_expires_at: Some(macros::datetime!(2025-01-01 02:00 UTC)),
			access_token_expires_in: 7200,
			refresh_token_expires_at: None,
			updated_at: Some(macros::datetime!(2025-01-01 00:00 UTC)),
			phase: AuthorizationPhase::Completed,
			pending_authorization: false,
		}
	}

	#[test]
	fn authorize_link_is_escaped() {
		let url = Url::parse("https://open.larksuite.com/authorize?client_id=a&state=b")
			.expect("Authorize URL fixture should parse.");
		let page = start(&url, &status());

		assert!(page.contains("client_id=a&amp;state=b"));
		assert!(page.contains("2025-01-01T02:00:00Z"));
		assert!(page.contains("in 7200s"));
	}

	#[test]
	fn failure_page_escapes_upstream_text_and_links_home() {
		let page = failure(&Error::UpstreamDenied { error: "<script>".into() });

		assert!(!page.contains("<script>"));
		assert!(page.contains("&lt;script&gt;"));
		assert!(page.contains("href=\"/\""));
		assert!(page.contains("upstream_denied"));
	}
}
