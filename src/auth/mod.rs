//! Authentication for the Google advertising APIs.
//!
//! - [`oauth`]: OAuth2 credential providers producing `Authorization` headers
//! - [`api_scope`]: OAuth2 scopes per API

pub mod oauth;
mod scopes;

pub use scopes::{api_scope, ADWORDS_SCOPE, AD_MANAGER_SCOPE, DFA_SCOPE};
