//! Report download failures.

use thiserror::Error;

use crate::soap::XmlElement;

/// An AdWords report download was rejected by the server.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AdWordsReportError {
    /// The server described the problem in a `reportDownloadError` document.
    #[error("AdWords report download failed with HTTP status code: {code}. Type: {error_type}, trigger: {trigger}, field path: {field_path}")]
    BadRequest {
        /// Error type, e.g. `ReportDefinitionError.INVALID_FIELD_NAME_FOR_REPORT`.
        error_type: String,
        /// The request value that caused the error.
        trigger: String,
        /// Where in the definition the trigger was found.
        field_path: String,
        /// HTTP status code.
        code: u16,
        /// Response body.
        content: String,
    },

    /// Any other non-2xx response.
    #[error("AdWords report download failed with HTTP status code: {code}")]
    Http {
        /// HTTP status code.
        code: u16,
        /// Response body.
        content: String,
    },
}

impl AdWordsReportError {
    /// Classifies a failed download from its status and body.
    #[must_use]
    pub fn from_response(code: u16, content: String) -> Self {
        if content.contains("reportDownloadError") {
            if let Some((error_type, trigger, field_path)) = parse_report_download_error(&content) {
                return Self::BadRequest {
                    error_type,
                    trigger,
                    field_path,
                    code,
                    content,
                };
            }
        }
        Self::Http { code, content }
    }

    /// HTTP status code of the failed download.
    #[must_use]
    pub const fn code(&self) -> u16 {
        match self {
            Self::BadRequest { code, .. } | Self::Http { code, .. } => *code,
        }
    }

    /// Response body of the failed download.
    #[must_use]
    pub fn content(&self) -> &str {
        match self {
            Self::BadRequest { content, .. } | Self::Http { content, .. } => content,
        }
    }
}

fn parse_report_download_error(content: &str) -> Option<(String, String, String)> {
    let root = XmlElement::parse(content).ok()?;
    let api_error = root.child("ApiError")?;
    Some((
        api_error.child_text("type")?.to_string(),
        api_error.child_text("trigger")?.to_string(),
        api_error.child_text("fieldPath")?.to_string(),
    ))
}

// Verify AdWordsReportError is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<AdWordsReportError>();
};

#[cfg(test)]
mod tests {
    use super::*;

    const BAD_REQUEST: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<reportDownloadError>
  <ApiError>
    <type>ReportDefinitionError.INVALID_FIELD_NAME_FOR_REPORT</type>
    <trigger>Foo</trigger>
    <fieldPath>selector.fields[0]</fieldPath>
  </ApiError>
</reportDownloadError>"#;

    #[test]
    fn test_report_download_error_is_bad_request() {
        let error = AdWordsReportError::from_response(400, BAD_REQUEST.to_string());
        match &error {
            AdWordsReportError::BadRequest {
                error_type,
                trigger,
                field_path,
                code,
                ..
            } => {
                assert_eq!(error_type, "ReportDefinitionError.INVALID_FIELD_NAME_FOR_REPORT");
                assert_eq!(trigger, "Foo");
                assert_eq!(field_path, "selector.fields[0]");
                assert_eq!(*code, 400);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(error.content(), BAD_REQUEST);
    }

    #[test]
    fn test_other_bodies_are_http_errors() {
        let error = AdWordsReportError::from_response(502, "<html>Bad Gateway</html>".to_string());
        assert_eq!(
            error,
            AdWordsReportError::Http {
                code: 502,
                content: "<html>Bad Gateway</html>".to_string()
            }
        );
        assert!(error.to_string().contains("502"));
    }

    #[test]
    fn test_unparseable_report_download_error_falls_back() {
        let error = AdWordsReportError::from_response(400, "reportDownloadError <".to_string());
        assert!(matches!(error, AdWordsReportError::Http { code: 400, .. }));
    }
}
