//! On-disk caching of downloaded WSDL documents.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use sha2::{Digest, Sha256};

use crate::soap::{HttpTransport, TransportError};

/// Default age after which a cached WSDL is downloaded again.
pub const DEFAULT_WSDL_CACHE_MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);

const CACHE_DIRECTORY: &str = "googleads-wsdl-cache";

/// Where WSDL documents are cached between client instances.
///
/// The default caches under the system temporary directory for one day.
/// Cache failures never fail a request; they are logged and the document
/// is downloaded instead.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WsdlCache {
    /// Always download.
    Disabled,
    /// Cache in a directory.
    Directory {
        /// Directory holding the cached documents.
        path: PathBuf,
        /// Age after which a cached document is stale.
        max_age: Duration,
    },
}

impl Default for WsdlCache {
    fn default() -> Self {
        Self::Directory {
            path: std::env::temp_dir().join(CACHE_DIRECTORY),
            max_age: DEFAULT_WSDL_CACHE_MAX_AGE,
        }
    }
}

impl WsdlCache {
    /// Caches in `path` with the default max age.
    #[must_use]
    pub fn directory(path: impl Into<PathBuf>) -> Self {
        Self::Directory {
            path: path.into(),
            max_age: DEFAULT_WSDL_CACHE_MAX_AGE,
        }
    }

    /// Returns the document at `url`, from the cache when fresh.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if the document has to be downloaded
    /// and the download fails.
    pub async fn fetch(&self, transport: &HttpTransport, url: &str) -> Result<String, TransportError> {
        let Self::Directory { path, max_age } = self else {
            return transport.get_text(url, &HashMap::new()).await;
        };

        let file = path.join(cache_file_name(url));
        if let Some(cached) = read_fresh(&file, *max_age).await {
            tracing::debug!(url, "Using cached WSDL");
            return Ok(cached);
        }

        let document = transport.get_text(url, &HashMap::new()).await?;
        if let Err(error) = write(path, &file, &document).await {
            tracing::warn!(url, path = %file.display(), %error, "Failed to cache WSDL");
        }
        Ok(document)
    }
}

fn cache_file_name(url: &str) -> String {
    format!("{:x}.wsdl", Sha256::digest(url.as_bytes()))
}

async fn read_fresh(file: &Path, max_age: Duration) -> Option<String> {
    let modified = tokio::fs::metadata(file).await.ok()?.modified().ok()?;
    let age = SystemTime::now()
        .duration_since(modified)
        .unwrap_or_default();
    if age > max_age {
        return None;
    }
    tokio::fs::read_to_string(file).await.ok()
}

async fn write(directory: &Path, file: &Path, document: &str) -> std::io::Result<()> {
    tokio::fs::create_dir_all(directory).await?;
    tokio::fs::write(file, document).await
}
