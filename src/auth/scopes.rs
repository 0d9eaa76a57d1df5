//! OAuth2 scopes for the Google advertising APIs.

/// Scope for the AdWords API.
pub const ADWORDS_SCOPE: &str = "https://www.googleapis.com/auth/adwords";

/// Scope for the Ad Manager (formerly DFP) API.
pub const AD_MANAGER_SCOPE: &str = "https://www.googleapis.com/auth/dfp";

/// Scope for the DFA trafficking API.
pub const DFA_SCOPE: &str = "https://www.googleapis.com/auth/dfatrafficking";

/// Returns the scope for an API name.
///
/// Accepts `adwords`, `ad_manager` (or its former name `dfp`) and `dfa`.
///
/// # Example
///
/// ```rust
/// use googleads::auth::{api_scope, AD_MANAGER_SCOPE};
///
/// assert_eq!(api_scope("ad_manager"), Some(AD_MANAGER_SCOPE));
/// assert_eq!(api_scope("unknown"), None);
/// ```
#[must_use]
pub fn api_scope(api: &str) -> Option<&'static str> {
    match api {
        "adwords" => Some(ADWORDS_SCOPE),
        "ad_manager" | "dfp" => Some(AD_MANAGER_SCOPE),
        "dfa" => Some(DFA_SCOPE),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_scopes() {
        assert_eq!(api_scope("adwords"), Some(ADWORDS_SCOPE));
        assert_eq!(api_scope("dfp"), Some(AD_MANAGER_SCOPE));
        assert_eq!(api_scope("ad_manager"), Some(AD_MANAGER_SCOPE));
        assert_eq!(api_scope("dfa"), Some(DFA_SCOPE));
    }

    #[test]
    fn test_unknown_scope() {
        assert_eq!(api_scope("analytics"), None);
    }
}
