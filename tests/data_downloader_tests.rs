//! Integration tests for the Ad Manager data downloader.
//!
//! These tests verify report job polling, chunked report downloads and
//! paged PQL exports against a mock server.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::Utc;
use googleads::ad_manager::{DataDownloader, ReportDownloadOptions};
use googleads::auth::oauth::AccessTokenClient;
use googleads::pql::{BindValue, PqlValues};
use googleads::soap::SoapObject;
use googleads::{AdManagerClient, AdManagerConfig, ApplicationName, GoogleAdsError, WsdlCache};
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const NAMESPACE: &str = "https://www.google.com/apis/ads/publisher/v202408";
const REPORT_SERVICE_PATH: &str = "/apis/ads/publisher/v202408/ReportService";
const PQL_SERVICE_PATH: &str = "/apis/ads/publisher/v202408/PublisherQueryLanguageService";
const POLL: Duration = Duration::from_millis(10);

fn downloader(server: &MockServer) -> DataDownloader {
    let config = AdManagerConfig::builder()
        .credentials(AccessTokenClient::new(
            "test-token",
            Utc::now() + chrono::Duration::hours(1),
        ))
        .application_name(ApplicationName::new("downloader tests").unwrap())
        .custom_http_header("X-Trace", "dl")
        .wsdl_cache(WsdlCache::Disabled)
        .build()
        .unwrap();
    AdManagerClient::new(config)
        .unwrap()
        .data_downloader(None, Some(&server.uri()))
        .unwrap()
}

fn envelope(body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
  <soap:Body>{body}</soap:Body>
</soap:Envelope>"#
    )
}

fn rval(operation: &str, content: &str) -> String {
    envelope(&format!(
        r#"<{operation}Response xmlns="{NAMESPACE}"><rval>{content}</rval></{operation}Response>"#
    ))
}

async fn mount_wsdls(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(REPORT_SERVICE_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(include_str!("fixtures/ReportService.wsdl")),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(PQL_SERVICE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(include_str!(
            "fixtures/PublisherQueryLanguageService.wsdl"
        )))
        .mount(server)
        .await;
}

async fn mount_run_report_job(server: &MockServer, id: i64) {
    Mock::given(method("POST"))
        .and(path(REPORT_SERVICE_PATH))
        .and(body_string_contains("runReportJob"))
        .and(body_string_contains("dimensions>DATE<"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(rval("runReportJob", &format!("<id>{id}</id>"))),
        )
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_status(server: &MockServer, status: &str, times: Option<u64>) {
    let mock = Mock::given(method("POST"))
        .and(path(REPORT_SERVICE_PATH))
        .and(body_string_contains("getReportJobStatus"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(rval("getReportJobStatus", status)),
        );
    let mock = match times {
        Some(times) => mock.up_to_n_times(times),
        None => mock,
    };
    mock.mount(server).await;
}

fn report_job() -> SoapObject {
    SoapObject::new().with(
        "reportQuery",
        SoapObject::new()
            .with("dimensions", vec!["DATE"])
            .with("columns", vec!["AD_SERVER_IMPRESSIONS"])
            .with("dateRangeType", "YESTERDAY"),
    )
}

fn text(value: &str) -> String {
    format!(r#"<values xsi:type="TextValue"><value>{value}</value></values>"#)
}

fn number(value: &str) -> String {
    format!(r#"<values xsi:type="NumberValue"><value>{value}</value></values>"#)
}

fn result_set(columns: &[&str], rows: &[String]) -> String {
    let columns: String = columns
        .iter()
        .map(|label| format!("<columnTypes><labelName>{label}</labelName></columnTypes>"))
        .collect();
    let rows: String = rows.iter().map(|row| format!("<rows>{row}</rows>")).collect();
    rval("select", &format!("{columns}{rows}"))
}

#[tokio::test]
async fn test_wait_for_report_polls_until_completed() {
    let server = MockServer::start().await;
    mount_wsdls(&server).await;
    mount_run_report_job(&server, 42).await;
    mount_status(&server, "IN_PROGRESS", Some(2)).await;
    mount_status(&server, "COMPLETED", None).await;

    let id = downloader(&server)
        .wait_for_report(report_job(), POLL)
        .await
        .unwrap();

    assert_eq!(id, 42);
    let status_checks = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|request| String::from_utf8_lossy(&request.body).contains("getReportJobStatus"))
        .count();
    assert_eq!(status_checks, 3);
}

#[tokio::test]
async fn test_wait_for_report_fails_with_job_id() {
    let server = MockServer::start().await;
    mount_wsdls(&server).await;
    mount_run_report_job(&server, 7).await;
    mount_status(&server, "FAILED", None).await;

    let error = downloader(&server)
        .wait_for_report(report_job(), POLL)
        .await
        .unwrap_err();

    assert!(matches!(
        error,
        GoogleAdsError::ReportJobFailed { report_job_id: 7 }
    ));
}

#[tokio::test]
async fn test_download_report_streams_body_to_sink() {
    let server = MockServer::start().await;
    mount_wsdls(&server).await;
    let report_url = format!("{}/reports/download/99", server.uri());
    Mock::given(method("POST"))
        .and(path(REPORT_SERVICE_PATH))
        .and(body_string_contains("getReportDownloadUrlWithOptions"))
        .and(body_string_contains("exportFormat>CSV_DUMP<"))
        .and(body_string_contains("includeTotalsRow>false<"))
        .and(body_string_contains("useGzipCompression>true<"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(rval("getReportDownloadUrlWithOptions", &report_url)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let report: Vec<u8> = (0..40_000).map(|i| (i % 251) as u8).collect();
    Mock::given(method("GET"))
        .and(path("/reports/download/99"))
        .and(header("Authorization", "Bearer test-token"))
        .and(header("X-Trace", "dl"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(report.clone()))
        .expect(1)
        .mount(&server)
        .await;

    let mut sink: Vec<u8> = Vec::new();
    downloader(&server)
        .download_report_to_file(99, "CSV_DUMP", &mut sink, ReportDownloadOptions::default())
        .await
        .unwrap();

    assert_eq!(sink, report);
}

#[tokio::test]
async fn test_download_report_failure_is_transport_error() {
    let server = MockServer::start().await;
    mount_wsdls(&server).await;
    let report_url = format!("{}/reports/download/5", server.uri());
    Mock::given(method("POST"))
        .and(path(REPORT_SERVICE_PATH))
        .and(body_string_contains("includeTotalsRow>true<"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(rval("getReportDownloadUrlWithOptions", &report_url)),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/reports/download/5"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let mut sink: Vec<u8> = Vec::new();
    let error = downloader(&server)
        .download_report_to_file(5, "TSV", &mut sink, ReportDownloadOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(error, GoogleAdsError::Soap(_)));
    assert!(sink.is_empty());
}

#[tokio::test]
async fn test_pql_result_pages_until_short_page() {
    let server = MockServer::start().await;
    mount_wsdls(&server).await;

    let full_page: Vec<String> = (0..500)
        .map(|i| format!("{}{}", number(&i.to_string()), text(&format!("Item {i}"))))
        .collect();
    let last_page: Vec<String> = (500..502)
        .map(|i| format!("{}{}", number(&i.to_string()), text(&format!("Item {i}"))))
        .collect();

    Mock::given(method("POST"))
        .and(path(PQL_SERVICE_PATH))
        .and(body_string_contains("SELECT Id, Name FROM Line_Item LIMIT 500 OFFSET 0"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(result_set(&["Id", "Name"], &full_page)),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(PQL_SERVICE_PATH))
        .and(body_string_contains("SELECT Id, Name FROM Line_Item LIMIT 500 OFFSET 500"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(result_set(&["Id", "Name"], &last_page)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let rows = downloader(&server)
        .download_pql_result_to_list("SELECT Id, Name FROM Line_Item", PqlValues::None)
        .await
        .unwrap();

    assert_eq!(rows.len(), 503);
    assert_eq!(rows[0], vec!["Id", "Name"]);
    assert_eq!(rows[1], vec!["0", "Item 0"]);
    assert_eq!(rows[502], vec!["501", "Item 501"]);
}

#[tokio::test]
async fn test_pql_result_without_rows_is_empty() {
    let server = MockServer::start().await;
    mount_wsdls(&server).await;
    Mock::given(method("POST"))
        .and(path(PQL_SERVICE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(result_set(&["Id"], &[])))
        .expect(1)
        .mount(&server)
        .await;

    let rows = downloader(&server)
        .download_pql_result_to_list("SELECT Id FROM Line_Item WHERE Id = 0", PqlValues::None)
        .await
        .unwrap();

    assert!(rows.is_empty());
}

#[tokio::test]
async fn test_pql_bind_variables_are_sent() {
    let server = MockServer::start().await;
    mount_wsdls(&server).await;
    Mock::given(method("POST"))
        .and(path(PQL_SERVICE_PATH))
        .and(body_string_contains("key>status<"))
        .and(body_string_contains(r#"xsi:type="ns0:TextValue""#))
        .and(body_string_contains("value>READY<"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(result_set(&["Id"], &[number("1")])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut values = BTreeMap::new();
    values.insert("status".to_string(), BindValue::from("READY"));
    let rows = downloader(&server)
        .download_pql_result_to_list("SELECT Id FROM Line_Item WHERE Status = :status", values)
        .await
        .unwrap();

    assert_eq!(rows, vec![vec!["Id".to_string()], vec!["1".to_string()]]);
}

#[tokio::test]
async fn test_pql_result_to_csv() {
    let server = MockServer::start().await;
    mount_wsdls(&server).await;
    let set = format!(
        r#"<values xsi:type="SetValue">{}{}</values>"#,
        text("a"),
        text("b")
    );
    let date_time = r#"<values xsi:type="DateTimeValue"><value><date><year>2017</year><month>1</month><day>2</day></date><hour>3</hour><minute>4</minute><second>5</second><timeZoneId>America/New_York</timeZoneId></value></values>"#;
    let row = format!("{}{}{}{}", number("1.50"), text("say &quot;hi&quot;"), set, date_time);
    Mock::given(method("POST"))
        .and(path(PQL_SERVICE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(result_set(
            &["Amount", "Quote", "Tags", "Created"],
            &[row],
        )))
        .mount(&server)
        .await;

    let mut output = Vec::new();
    downloader(&server)
        .download_pql_result_to_csv("SELECT * FROM Things", &mut output, PqlValues::None)
        .await
        .unwrap();

    let csv = String::from_utf8(output).unwrap();
    assert_eq!(
        csv,
        "\"Amount\",\"Quote\",\"Tags\",\"Created\"\r\n\
         \"1.5\",\"say \"\"\"\"hi\"\"\"\"\",\"\"\"a\"\",\"\"b\"\"\",\"2017-01-02T03:04:05-05:00\"\r\n"
    );
}

#[tokio::test]
async fn test_pql_csv_quotes_set_values() {
    let server = MockServer::start().await;
    mount_wsdls(&server).await;
    let set = format!(
        r#"<values xsi:type="SetValue">{}{}</values>"#,
        text("Look at how many commas and &quot;s there are"),
        text("this,is...how,Christopher Walken, talks")
    );
    let rows = vec![
        format!("{}{}", number("1"), set),
        format!("{}{}", number("2"), text("plain")),
    ];
    Mock::given(method("POST"))
        .and(path(PQL_SERVICE_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(result_set(&["Id", "Targeting"], &rows)),
        )
        .mount(&server)
        .await;

    let mut output = Vec::new();
    downloader(&server)
        .download_pql_result_to_csv("SELECT Id, Targeting FROM Line_Item", &mut output, PqlValues::None)
        .await
        .unwrap();

    let csv = String::from_utf8(output).unwrap();
    let lines: Vec<&str> = csv.split("\r\n").collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], r#""Id","Targeting""#);
    assert_eq!(
        lines[1],
        r#""1","""Look at how many commas and """"s there are"",""this,is...how,Christopher Walken, talks""""#
    );
    assert_eq!(lines[2], r#""2","plain""#);
    assert_eq!(lines[3], "");
}

#[tokio::test]
async fn test_mixed_set_values_fail() {
    let server = MockServer::start().await;
    mount_wsdls(&server).await;
    let set = format!(
        r#"<values xsi:type="SetValue">{}{}</values>"#,
        text("a"),
        number("1")
    );
    Mock::given(method("POST"))
        .and(path(PQL_SERVICE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(result_set(&["Tags"], &[set])))
        .mount(&server)
        .await;

    let error = downloader(&server)
        .download_pql_result_to_list("SELECT Tags FROM Things", PqlValues::None)
        .await
        .unwrap_err();

    assert!(matches!(error, GoogleAdsError::MixedSetVariants { .. }));
}

#[test]
fn test_blocking_pql_download() {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let server = runtime.block_on(async {
        let server = MockServer::start().await;
        mount_wsdls(&server).await;
        Mock::given(method("POST"))
            .and(path(PQL_SERVICE_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(result_set(&["Name"], &[text("blocking")])),
            )
            .mount(&server)
            .await;
        server
    });

    let rows = downloader(&server)
        .download_pql_result_to_list_blocking("SELECT Name FROM Things", PqlValues::None)
        .unwrap();

    assert_eq!(rows, vec![vec!["Name".to_string()], vec!["blocking".to_string()]]);
}
