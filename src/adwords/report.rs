//! AdWords report downloads.

use std::collections::HashMap;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::OnceCell;

use crate::adwords::errors::AdWordsReportError;
use crate::adwords::services::report_download_url;
use crate::adwords::AdWordsClient;
use crate::error::GoogleAdsError;
use crate::soap::{
    insert_header, xml_for_complex_type, ChunkedBody, DefaultPacker, RequestContext, Schema,
    SoapError, SoapObject, SoapValue,
};

/// Element of the report schema describing a report.
const REPORT_DEFINITION_ELEMENT: &str = "reportDefinition";

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Downloads AdWords reports described by a `reportDefinition` or an AWQL
/// query.
///
/// Obtained from [`AdWordsClient::report_downloader`]. The report schema is
/// fetched on the first definition-based download.
///
/// # Example
///
/// ```rust,ignore
/// let downloader = client.report_downloader(None, None)?;
/// let mut file = tokio::fs::File::create("report.csv").await?;
/// downloader
///     .download_report_with_awql(
///         "SELECT CampaignId, Clicks FROM CAMPAIGN_PERFORMANCE_REPORT DURING YESTERDAY",
///         "CSV",
///         &mut file,
///         None,
///     )
///     .await?;
/// ```
#[derive(Debug)]
pub struct ReportDownloader {
    client: AdWordsClient,
    endpoint: String,
    schema: OnceCell<Schema>,
}

// Verify ReportDownloader is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<ReportDownloader>();
};

impl ReportDownloader {
    pub(crate) fn new(client: AdWordsClient, version: &str, server: &str) -> Self {
        Self {
            client,
            endpoint: report_download_url(server, version),
            schema: OnceCell::new(),
        }
    }

    /// The report download endpoint.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// URL of the report definition schema.
    #[must_use]
    pub fn schema_url(&self) -> String {
        format!("{}/reportDefinition.xsd", self.endpoint)
    }

    /// Downloads a report described by a `ReportDefinition` object into
    /// `sink`.
    ///
    /// `return_money_in_micros` of `None` leaves the choice to the server.
    ///
    /// # Errors
    ///
    /// - [`GoogleAdsError::Soap`] if the schema cannot be loaded, the
    ///   definition does not fit it, or the request cannot be sent
    /// - [`GoogleAdsError::AdWordsReport`] if the server rejects the request
    /// - [`GoogleAdsError::Io`] if writing to `sink` fails
    pub async fn download_report<W>(
        &self,
        report_definition: SoapObject,
        sink: &mut W,
        return_money_in_micros: Option<bool>,
    ) -> Result<(), GoogleAdsError>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let rdxml = self.serialize_report_definition(report_definition).await?;
        let form = [("__rdxml", rdxml.as_str())];
        self.download(&form, sink, return_money_in_micros).await
    }

    /// Downloads a report described by an AWQL query into `sink`, in
    /// `file_format` (`CSV`, `TSV`, `XML`, `GZIPPED_CSV`, ...).
    ///
    /// # Errors
    ///
    /// See [`ReportDownloader::download_report`].
    pub async fn download_report_with_awql<W>(
        &self,
        query: &str,
        file_format: &str,
        sink: &mut W,
        return_money_in_micros: Option<bool>,
    ) -> Result<(), GoogleAdsError>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let form = [("__fmt", file_format), ("__rdquery", query)];
        self.download(&form, sink, return_money_in_micros).await
    }

    /// Serializes a report definition to its `<reportDefinition>` XML.
    ///
    /// # Errors
    ///
    /// Returns [`GoogleAdsError::Soap`] if the schema cannot be loaded or the
    /// definition does not fit it.
    pub async fn serialize_report_definition(
        &self,
        report_definition: SoapObject,
    ) -> Result<String, GoogleAdsError> {
        let schema = self.schema().await?;
        let xml = xml_for_complex_type(
            schema,
            &DefaultPacker,
            REPORT_DEFINITION_ELEMENT,
            SoapValue::Object(report_definition),
        )
        .map_err(SoapError::from)?;
        Ok(String::from_utf8_lossy(&xml).into_owned())
    }

    async fn schema(&self) -> Result<&Schema, GoogleAdsError> {
        let inner = &self.client.inner;
        self.schema
            .get_or_try_init(|| async {
                let url = self.schema_url();
                tracing::debug!(url = %url, "Loading report definition schema");
                let document = inner
                    .config
                    .wsdl_cache()
                    .fetch(&inner.transport, &url)
                    .await
                    .map_err(SoapError::from)?;
                let schema = Schema::parse_xsd(&document).map_err(SoapError::from)?;
                Ok::<_, GoogleAdsError>(schema)
            })
            .await
    }

    async fn download<W>(
        &self,
        form: &[(&str, &str)],
        sink: &mut W,
        return_money_in_micros: Option<bool>,
    ) -> Result<(), GoogleAdsError>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let headers = self.request_headers(return_money_in_micros).await?;
        tracing::info!("Request made: Report download URL: \"{}\"", self.endpoint);

        let response = self
            .client
            .inner
            .transport
            .post_form(&self.endpoint, &headers, form)
            .await
            .map_err(SoapError::from)?;
        let status = response.status();
        if !status.is_success() {
            let content = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "Report download failed");
            return Err(AdWordsReportError::from_response(status.as_u16(), content).into());
        }

        let mut body = ChunkedBody::new(response);
        while let Some(chunk) = body.next_chunk().await.map_err(SoapError::from)? {
            sink.write_all(&chunk).await?;
        }
        sink.flush().await?;
        Ok(())
    }

    async fn request_headers(
        &self,
        return_money_in_micros: Option<bool>,
    ) -> Result<HashMap<String, String>, GoogleAdsError> {
        let inner = &self.client.inner;
        let config = &inner.config;
        let mut headers = inner.headers.credentials().create_http_header().await?;
        insert_header(&mut headers, "Content-type", FORM_CONTENT_TYPE);
        insert_header(&mut headers, "developerToken", config.developer_token().as_ref());
        if let Some(client_customer_id) = config.client_customer_id() {
            insert_header(&mut headers, "clientCustomerId", client_customer_id.as_ref());
        }
        let user_agent = format!(
            "{}{},gzip",
            config.user_agent(),
            inner.headers.signature(&RequestContext::new())
        );
        insert_header(&mut headers, "User-Agent", &user_agent);
        if let Some(micros) = return_money_in_micros {
            insert_header(
                &mut headers,
                "returnMoneyInMicros",
                if micros { "true" } else { "false" },
            );
        }
        inner.headers.apply_custom_headers(&mut headers);
        Ok(headers)
    }
}
