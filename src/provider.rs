//! Upstream provider description.
//!
//! `descriptor` exposes validated metadata ([`ProviderDescriptor`]) covering the HTTPS-only
//! authorization, token, and API endpoints, the scopes requested during authorization, and
//! provider quirks (PKCE, scope delimiter, default token lifetime). The Lark Open Platform
//! preset is available via [`ProviderDescriptor::lark`].

pub mod descriptor;

pub use descriptor::*;
