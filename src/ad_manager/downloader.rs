//! Report jobs and PQL result downloads.

use std::fmt;
use std::io::Write;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::runtime::{Builder, Runtime};

use crate::ad_manager::convert::convert_value_for_csv;
use crate::ad_manager::AdManagerClient;
use crate::error::GoogleAdsError;
use crate::pql::{PqlValues, Statement, SUGGESTED_PAGE_LIMIT};
use crate::soap::{ChunkedBody, SoapError, SoapObject, SoapService, SoapValue};

/// Default delay between report status checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

const REPORT_SERVICE: &str = "ReportService";
const PQL_SERVICE: &str = "PublisherQueryLanguageService";

/// Status of an Ad Manager report job.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReportJobStatus {
    /// The report is ready for download.
    Completed,
    /// The report could not be generated.
    Failed,
    /// The report is being generated.
    InProgress,
    /// The report is queued.
    Pending,
    /// The report is being processed.
    Processing,
    /// A status this library does not know.
    Unknown(String),
}

impl ReportJobStatus {
    /// Returns `true` for `COMPLETED` and `FAILED`.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl From<&str> for ReportJobStatus {
    fn from(status: &str) -> Self {
        match status {
            "COMPLETED" => Self::Completed,
            "FAILED" => Self::Failed,
            "IN_PROGRESS" => Self::InProgress,
            "PENDING" => Self::Pending,
            "PROCESSING" => Self::Processing,
            other => Self::Unknown(other.to_string()),
        }
    }
}

impl fmt::Display for ReportJobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => f.write_str("COMPLETED"),
            Self::Failed => f.write_str("FAILED"),
            Self::InProgress => f.write_str("IN_PROGRESS"),
            Self::Pending => f.write_str("PENDING"),
            Self::Processing => f.write_str("PROCESSING"),
            Self::Unknown(status) => f.write_str(status),
        }
    }
}

/// Options of [`DataDownloader::download_report_to_file`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReportDownloadOptions {
    /// Prepend the report's properties (name, date range, ...).
    pub include_report_properties: bool,
    /// Append a totals row; `None` means "all formats but `CSV_DUMP`".
    pub include_totals_row: Option<bool>,
    /// Download the report gzip-compressed.
    pub use_gzip_compression: bool,
}

impl Default for ReportDownloadOptions {
    fn default() -> Self {
        Self {
            include_report_properties: false,
            include_totals_row: None,
            use_gzip_compression: true,
        }
    }
}

impl ReportDownloadOptions {
    fn to_soap(self, export_format: &str) -> SoapObject {
        let include_totals_row = self
            .include_totals_row
            .unwrap_or(export_format != "CSV_DUMP");
        SoapObject::new()
            .with("exportFormat", export_format)
            .with("includeReportProperties", self.include_report_properties)
            .with("includeTotalsRow", include_totals_row)
            .with("useGzipCompression", self.use_gzip_compression)
    }
}

/// Runs report jobs and downloads report and PQL results.
///
/// Obtained from [`AdManagerClient::data_downloader`]. `ReportService` and
/// `PublisherQueryLanguageService` are resolved on first use through the
/// client's service cache.
///
/// The `_blocking` variants drive the async operations on a private
/// runtime and panic if called from within an async runtime.
///
/// # Example
///
/// ```rust,ignore
/// let downloader = client.data_downloader(None, None)?;
/// let rows = downloader
///     .download_pql_result_to_list("SELECT Id, Name FROM Line_Item", PqlValues::None)
///     .await?;
/// ```
#[derive(Clone, Debug)]
pub struct DataDownloader {
    client: AdManagerClient,
    version: String,
    server: String,
}

// Verify DataDownloader is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<DataDownloader>();
};

impl DataDownloader {
    pub(crate) const fn new(client: AdManagerClient, version: String, server: String) -> Self {
        Self {
            client,
            version,
            server,
        }
    }

    /// The API version used.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// The server used.
    #[must_use]
    pub fn server(&self) -> &str {
        &self.server
    }

    async fn service(&self, name: &str) -> Result<Arc<SoapService>, GoogleAdsError> {
        self.client
            .service(name, Some(&self.version), Some(&self.server))
            .await
    }

    /// Runs a report job and polls its status every `poll_interval` until
    /// it finishes. Returns the job's id.
    ///
    /// Polling never gives up; drop the future to stop waiting.
    ///
    /// # Errors
    ///
    /// - [`GoogleAdsError::ReportJobFailed`] if the job fails
    /// - [`GoogleAdsError::Soap`] for faults and transport failures
    /// - [`GoogleAdsError::UnexpectedResponse`] if the server returns no id
    ///   or status
    pub async fn wait_for_report(
        &self,
        report_job: SoapObject,
        poll_interval: Duration,
    ) -> Result<i64, GoogleAdsError> {
        let service = self.service(REPORT_SERVICE).await?;
        let job = service
            .call("runReportJob", vec![SoapValue::Object(report_job)])
            .await?;
        let report_job_id = job
            .field("id")
            .and_then(SoapValue::as_i64)
            .ok_or_else(|| GoogleAdsError::UnexpectedResponse {
                operation: "runReportJob".to_string(),
                reason: format!("no report job id in {job}"),
            })?;

        let mut status = Self::report_job_status(&service, report_job_id).await?;
        while !status.is_terminal() {
            tracing::debug!("Report job status: {status}");
            tokio::time::sleep(poll_interval).await;
            status = Self::report_job_status(&service, report_job_id).await?;
        }

        if status == ReportJobStatus::Failed {
            return Err(GoogleAdsError::ReportJobFailed { report_job_id });
        }
        tracing::debug!("Report has completed successfully");
        Ok(report_job_id)
    }

    async fn report_job_status(
        service: &SoapService,
        report_job_id: i64,
    ) -> Result<ReportJobStatus, GoogleAdsError> {
        let status = service
            .call("getReportJobStatus", vec![SoapValue::Int(report_job_id)])
            .await?;
        status
            .as_str()
            .map(ReportJobStatus::from)
            .ok_or_else(|| GoogleAdsError::UnexpectedResponse {
                operation: "getReportJobStatus".to_string(),
                reason: format!("expected a status, got {status}"),
            })
    }

    /// Downloads a finished report into `sink`, 16 KiB at a time.
    ///
    /// The report is never held in memory as a whole.
    ///
    /// # Errors
    ///
    /// - [`GoogleAdsError::Soap`] if the download URL cannot be resolved or
    ///   fetched
    /// - [`GoogleAdsError::Io`] if writing to `sink` fails
    pub async fn download_report_to_file<W>(
        &self,
        report_job_id: i64,
        export_format: &str,
        sink: &mut W,
        options: ReportDownloadOptions,
    ) -> Result<(), GoogleAdsError>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let mut body = self
            .report_body(report_job_id, export_format, options)
            .await?;
        while let Some(chunk) = body.next_chunk().await.map_err(SoapError::from)? {
            sink.write_all(&chunk).await?;
        }
        sink.flush().await?;
        Ok(())
    }

    async fn report_body(
        &self,
        report_job_id: i64,
        export_format: &str,
        options: ReportDownloadOptions,
    ) -> Result<ChunkedBody, GoogleAdsError> {
        let service = self.service(REPORT_SERVICE).await?;
        let download_options = options.to_soap(export_format);
        let url = service
            .call(
                "getReportDownloadUrlWithOptions",
                vec![
                    SoapValue::Int(report_job_id),
                    SoapValue::Object(download_options.clone()),
                ],
            )
            .await?;
        let url = url
            .as_str()
            .ok_or_else(|| GoogleAdsError::UnexpectedResponse {
                operation: "getReportDownloadUrlWithOptions".to_string(),
                reason: format!("expected a URL, got {url}"),
            })?
            .to_string();

        tracing::info!(
            "Request Summary: Report job ID: {report_job_id}, {}",
            SoapValue::Object(download_options)
        );
        tracing::info!("Report URL: {url}");

        let inner = &self.client.inner;
        let headers = inner
            .headers
            .download_headers()
            .await
            .map_err(SoapError::from)?;
        let body = inner
            .transport
            .get_stream(&url, &headers)
            .await
            .map_err(SoapError::from)?;
        tracing::debug!("Incoming response: REDACTED REPORT DATA");
        Ok(body)
    }

    /// Runs a PQL query over all result pages and returns the header row
    /// followed by one row per result.
    ///
    /// `query` must not contain `LIMIT` or `OFFSET`; pages of
    /// [`SUGGESTED_PAGE_LIMIT`] rows are requested until a short page.
    ///
    /// # Errors
    ///
    /// - [`GoogleAdsError::Statement`] for bind values with no PQL form
    /// - [`GoogleAdsError::Soap`] for faults and transport failures
    /// - conversion errors of [`convert_value_for_csv`]
    pub async fn download_pql_result_to_list(
        &self,
        query: &str,
        values: impl Into<PqlValues> + Send,
    ) -> Result<Vec<Vec<String>>, GoogleAdsError> {
        let mut rows = Vec::new();
        self.page_through_pql(query, values.into(), |row| {
            rows.push(row);
            Ok(())
        })
        .await?;
        Ok(rows)
    }

    /// Runs a PQL query over all result pages and writes the results to
    /// `sink` as CSV: one header row, then one row per result. Every field
    /// is quoted and rows end in CRLF.
    ///
    /// # Errors
    ///
    /// Errors of [`DataDownloader::download_pql_result_to_list`], plus
    /// [`GoogleAdsError::Csv`] if writing fails.
    pub async fn download_pql_result_to_csv<W: Write + Send>(
        &self,
        query: &str,
        sink: W,
        values: impl Into<PqlValues> + Send,
    ) -> Result<(), GoogleAdsError> {
        let mut writer = csv::WriterBuilder::new()
            .quote_style(csv::QuoteStyle::Always)
            .terminator(csv::Terminator::CRLF)
            .from_writer(sink);
        self.page_through_pql(query, values.into(), |row| {
            writer.write_record(&row)?;
            Ok(())
        })
        .await?;
        writer.flush()?;
        Ok(())
    }

    async fn page_through_pql<F>(
        &self,
        query: &str,
        values: PqlValues,
        mut emit: F,
    ) -> Result<(), GoogleAdsError>
    where
        F: FnMut(Vec<String>) -> Result<(), GoogleAdsError> + Send,
    {
        let entries = values.into_entries()?;
        let service = self.service(PQL_SERVICE).await?;
        let page_size = SUGGESTED_PAGE_LIMIT as usize;
        let mut offset = 0_usize;

        loop {
            let statement = Statement::new(
                format!("{query} LIMIT {SUGGESTED_PAGE_LIMIT} OFFSET {offset}"),
                entries.clone(),
            );
            let result = service.call("select", vec![statement.into()]).await?;
            let rows = result.field("rows").cloned().map(SoapValue::into_list).unwrap_or_default();
            if rows.is_empty() {
                break;
            }

            if offset == 0 {
                let header = result
                    .field("columnTypes")
                    .cloned()
                    .map(SoapValue::into_list)
                    .unwrap_or_default()
                    .iter()
                    .map(|column| {
                        column
                            .field("labelName")
                            .map(ToString::to_string)
                            .unwrap_or_default()
                    })
                    .collect();
                emit(header)?;
            }

            for row in &rows {
                let cells = row
                    .field("values")
                    .cloned()
                    .map(SoapValue::into_list)
                    .unwrap_or_default()
                    .iter()
                    .map(convert_value_for_csv)
                    .collect::<Result<Vec<_>, _>>()?;
                emit(cells)?;
            }

            offset += rows.len();
            if rows.len() != page_size {
                break;
            }
        }
        Ok(())
    }

    /// Blocking [`DataDownloader::wait_for_report`].
    ///
    /// # Errors
    ///
    /// See [`DataDownloader::wait_for_report`].
    ///
    /// # Panics
    ///
    /// Panics if called from within an async runtime.
    pub fn wait_for_report_blocking(
        &self,
        report_job: SoapObject,
        poll_interval: Duration,
    ) -> Result<i64, GoogleAdsError> {
        blocking_runtime()?.block_on(self.wait_for_report(report_job, poll_interval))
    }

    /// Blocking [`DataDownloader::download_report_to_file`], writing to a
    /// [`std::io::Write`].
    ///
    /// # Errors
    ///
    /// See [`DataDownloader::download_report_to_file`].
    ///
    /// # Panics
    ///
    /// Panics if called from within an async runtime.
    pub fn download_report_to_file_blocking<W: Write + ?Sized>(
        &self,
        report_job_id: i64,
        export_format: &str,
        sink: &mut W,
        options: ReportDownloadOptions,
    ) -> Result<(), GoogleAdsError> {
        blocking_runtime()?.block_on(async {
            let mut body = self
                .report_body(report_job_id, export_format, options)
                .await?;
            while let Some(chunk) = body
                .next_chunk()
                .await
                .map_err(SoapError::from)?
            {
                sink.write_all(&chunk)?;
            }
            sink.flush()?;
            Ok(())
        })
    }

    /// Blocking [`DataDownloader::download_pql_result_to_list`].
    ///
    /// # Errors
    ///
    /// See [`DataDownloader::download_pql_result_to_list`].
    ///
    /// # Panics
    ///
    /// Panics if called from within an async runtime.
    pub fn download_pql_result_to_list_blocking(
        &self,
        query: &str,
        values: impl Into<PqlValues> + Send,
    ) -> Result<Vec<Vec<String>>, GoogleAdsError> {
        blocking_runtime()?.block_on(self.download_pql_result_to_list(query, values))
    }
}

/// The runtime behind the blocking variants, shared so pooled connections
/// stay on the runtime that opened them.
fn blocking_runtime() -> Result<&'static Runtime, GoogleAdsError> {
    static RUNTIME: OnceLock<std::io::Result<Runtime>> = OnceLock::new();
    RUNTIME
        .get_or_init(|| Builder::new_current_thread().enable_all().build())
        .as_ref()
        .map_err(|error| {
            GoogleAdsError::Io(std::io::Error::new(error.kind(), error.to_string()))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_job_status_parsing() {
        assert_eq!(ReportJobStatus::from("COMPLETED"), ReportJobStatus::Completed);
        assert_eq!(ReportJobStatus::from("FAILED"), ReportJobStatus::Failed);
        assert_eq!(ReportJobStatus::from("IN_PROGRESS"), ReportJobStatus::InProgress);
        assert_eq!(
            ReportJobStatus::from("ARCHIVED"),
            ReportJobStatus::Unknown("ARCHIVED".to_string())
        );
        assert!(!ReportJobStatus::from("ARCHIVED").is_terminal());
        assert_eq!(ReportJobStatus::Pending.to_string(), "PENDING");
    }

    #[test]
    fn test_blocking_runtime_is_shared_across_threads() {
        let handles: Vec<_> = (0..4)
            .map(|_| std::thread::spawn(|| blocking_runtime().unwrap()))
            .collect();
        let runtimes: Vec<&Runtime> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(runtimes.windows(2).all(|pair| std::ptr::eq(pair[0], pair[1])));
        assert_eq!(blocking_runtime().unwrap().block_on(async { 7 }), 7);
    }

    #[test]
    fn test_totals_row_defaults_by_format() {
        let options = ReportDownloadOptions::default();
        let csv_dump = options.to_soap("CSV_DUMP");
        assert_eq!(csv_dump.get("includeTotalsRow"), Some(&SoapValue::Bool(false)));
        let tsv = options.to_soap("TSV");
        assert_eq!(tsv.get("includeTotalsRow"), Some(&SoapValue::Bool(true)));
        assert_eq!(tsv.get("useGzipCompression"), Some(&SoapValue::Bool(true)));
    }

    #[test]
    fn test_explicit_totals_row_wins() {
        let options = ReportDownloadOptions {
            include_totals_row: Some(true),
            ..ReportDownloadOptions::default()
        };
        let soap = options.to_soap("CSV_DUMP");
        assert_eq!(soap.get("includeTotalsRow"), Some(&SoapValue::Bool(true)));
        assert_eq!(
            soap.get("exportFormat").and_then(SoapValue::as_str),
            Some("CSV_DUMP")
        );
    }
}
