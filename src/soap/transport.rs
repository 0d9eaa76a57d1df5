//! HTTP transport shared by every service of a client.
//!
//! [`HttpTransport`] wraps one `reqwest::Client` configured from the
//! client's proxy and timeout settings. SOAP responses are read whole and
//! inflated when the server gzip-encodes them; report downloads are exposed
//! as a [`ChunkedBody`] so they never have to fit in memory.

use std::collections::HashMap;
use std::io::Read;
use std::time::Duration;

use flate2::read::GzDecoder;

use crate::config::ProxyConfig;
use crate::error::ConfigError;
use crate::soap::errors::TransportError;

/// Size of the chunks a [`ChunkedBody`] yields.
pub const DOWNLOAD_CHUNK_SIZE: usize = 16 * 1024;

/// A fully read response.
#[derive(Clone, Debug)]
pub struct HttpResponse {
    /// HTTP status code.
    pub code: u16,
    /// Response headers with lowercased names.
    pub headers: HashMap<String, Vec<String>>,
    /// Body text, inflated if it was gzip-encoded.
    pub body: String,
}

impl HttpResponse {
    /// Returns `true` for 2xx responses.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.code >= 200 && self.code <= 299
    }
}

/// HTTP client for WSDL downloads, SOAP calls and report downloads.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
}

// Verify HttpTransport is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<HttpTransport>();
};

impl HttpTransport {
    /// Builds a transport honoring the proxy, TLS and timeout settings.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the proxy or CA file is unusable.
    pub fn new(proxy_config: &ProxyConfig, timeout: Duration) -> Result<Self, ConfigError> {
        Ok(Self {
            client: proxy_config.build_http_client(timeout)?,
        })
    }

    /// Wraps an existing client.
    #[must_use]
    pub const fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    fn with_headers(
        mut builder: reqwest::RequestBuilder,
        headers: &HashMap<String, String>,
    ) -> reqwest::RequestBuilder {
        for (key, value) in headers {
            builder = builder.header(key, value);
        }
        builder
    }

    /// GETs a document as text.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Status`] for non-2xx responses.
    pub async fn get_text(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
    ) -> Result<String, TransportError> {
        let response = Self::with_headers(self.client.get(url), headers)
            .send()
            .await?;
        let response = Self::read(response).await?;
        if !response.is_ok() {
            return Err(TransportError::Status {
                code: response.code,
                url: url.to_string(),
                body: response.body,
            });
        }
        Ok(response.body)
    }

    /// POSTs a body and reads the whole response, whatever its status.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if the request fails or a gzip body
    /// cannot be inflated.
    pub async fn post(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
        body: Vec<u8>,
    ) -> Result<HttpResponse, TransportError> {
        let response = Self::with_headers(self.client.post(url), headers)
            .body(body)
            .send()
            .await?;
        Self::read(response).await
    }

    /// POSTs an urlencoded form and returns the unread response.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Network`] if the request cannot be sent.
    pub async fn post_form(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
        form: &[(&str, &str)],
    ) -> Result<reqwest::Response, TransportError> {
        Ok(Self::with_headers(self.client.post(url), headers)
            .form(form)
            .send()
            .await?)
    }

    /// GETs a resource for streaming.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Status`] for non-2xx responses.
    pub async fn get_stream(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
    ) -> Result<ChunkedBody, TransportError> {
        let response = Self::with_headers(self.client.get(url), headers)
            .send()
            .await?;
        if !response.status().is_success() {
            let code = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                code,
                url: url.to_string(),
                body,
            });
        }
        Ok(ChunkedBody::new(response))
    }

    async fn read(response: reqwest::Response) -> Result<HttpResponse, TransportError> {
        let code = response.status().as_u16();
        let headers = parse_response_headers(response.headers());
        let bytes = response.bytes().await?;

        let gzipped = headers
            .get("content-encoding")
            .is_some_and(|values| values.iter().any(|v| v.eq_ignore_ascii_case("gzip")));
        let body = if gzipped {
            let mut text = String::new();
            GzDecoder::new(bytes.as_ref())
                .read_to_string(&mut text)
                .map_err(TransportError::Decompress)?;
            text
        } else {
            String::from_utf8_lossy(&bytes).into_owned()
        };

        Ok(HttpResponse {
            code,
            headers,
            body,
        })
    }
}

fn parse_response_headers(headers: &reqwest::header::HeaderMap) -> HashMap<String, Vec<String>> {
    let mut result: HashMap<String, Vec<String>> = HashMap::new();
    for (name, value) in headers {
        let key = name.as_str().to_lowercase();
        let value = value.to_str().unwrap_or_default().to_string();
        result.entry(key).or_default().push(value);
    }
    result
}

/// A response body re-chunked into [`DOWNLOAD_CHUNK_SIZE`] pieces.
///
/// Bytes are passed through untouched; a gzip report stays gzip.
#[derive(Debug)]
pub struct ChunkedBody {
    response: reqwest::Response,
    buffer: Vec<u8>,
    finished: bool,
}

impl ChunkedBody {
    pub(crate) const fn new(response: reqwest::Response) -> Self {
        Self {
            response,
            buffer: Vec::new(),
            finished: false,
        }
    }

    /// Returns the next chunk, or `None` at the end of the body. Every
    /// chunk but the last is exactly [`DOWNLOAD_CHUNK_SIZE`] bytes.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Network`] if reading fails.
    pub async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        while !self.finished && self.buffer.len() < DOWNLOAD_CHUNK_SIZE {
            match self.response.chunk().await? {
                Some(bytes) => self.buffer.extend_from_slice(&bytes),
                None => self.finished = true,
            }
        }
        if self.buffer.is_empty() {
            return Ok(None);
        }
        let rest = self
            .buffer
            .split_off(self.buffer.len().min(DOWNLOAD_CHUNK_SIZE));
        Ok(Some(std::mem::replace(&mut self.buffer, rest)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn transport() -> HttpTransport {
        HttpTransport::new(&ProxyConfig::default(), Duration::from_secs(10)).unwrap()
    }

    #[tokio::test]
    async fn test_post_inflates_gzip_response() {
        let server = MockServer::start().await;
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"<ok/>").unwrap();
        let compressed = encoder.finish().unwrap();

        Mock::given(method("POST"))
            .and(path("/soap"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Content-Encoding", "gzip")
                    .set_body_bytes(compressed),
            )
            .mount(&server)
            .await;

        let response = transport()
            .post(&format!("{}/soap", server.uri()), &HashMap::new(), Vec::new())
            .await
            .unwrap();
        assert!(response.is_ok());
        assert_eq!(response.body, "<ok/>");
    }

    #[tokio::test]
    async fn test_get_text_fails_on_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("missing"))
            .mount(&server)
            .await;

        match transport().get_text(&server.uri(), &HashMap::new()).await {
            Err(TransportError::Status { code, body, .. }) => {
                assert_eq!(code, 404);
                assert_eq!(body, "missing");
            }
            other => panic!("Expected Status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_chunked_body_yields_fixed_size_chunks() {
        let server = MockServer::start().await;
        let payload: Vec<u8> = (0..40_000u32).map(|i| (i % 251) as u8).collect();
        Mock::given(method("GET"))
            .and(path("/report"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(payload.clone()))
            .mount(&server)
            .await;

        let mut body = transport()
            .get_stream(&format!("{}/report", server.uri()), &HashMap::new())
            .await
            .unwrap();

        let mut sizes = Vec::new();
        let mut received = Vec::new();
        while let Some(chunk) = body.next_chunk().await.unwrap() {
            sizes.push(chunk.len());
            received.extend(chunk);
        }
        assert_eq!(sizes, vec![16_384, 16_384, 7_232]);
        assert_eq!(received, payload);
    }
}
