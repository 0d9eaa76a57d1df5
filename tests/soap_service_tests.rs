//! Integration tests for AdWords SOAP services.
//!
//! These tests verify request marshalling against a WSDL served by a mock
//! server, the AdWords request header and decoding of typed responses.

use chrono::{Duration, Utc};
use googleads::auth::oauth::AccessTokenClient;
use googleads::soap::{MarshalError, SoapError, SoapObject, SoapValue};
use googleads::{
    AdWordsClient, AdWordsConfig, ApplicationName, ClientCustomerId, DeveloperToken, WsdlCache,
};
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CAMPAIGN_SERVICE_PATH: &str = "/api/adwords/cm/v201402/CampaignService";
const NAMESPACE: &str = "https://adwords.google.com/api/adwords/cm/v201402";

fn client() -> AdWordsClient {
    let config = AdWordsConfig::builder()
        .credentials(AccessTokenClient::new(
            "adwords-token",
            Utc::now() + Duration::hours(1),
        ))
        .developer_token(DeveloperToken::new("dev-token-123").unwrap())
        .user_agent(ApplicationName::new("campaign tool").unwrap())
        .client_customer_id(ClientCustomerId::new("123-456-7890").unwrap())
        .wsdl_cache(WsdlCache::Disabled)
        .build()
        .unwrap();
    AdWordsClient::new(config).unwrap()
}

fn envelope(body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
  <soap:Header>
    <ResponseHeader xmlns="{NAMESPACE}"><requestId>abc</requestId><operations>1</operations></ResponseHeader>
  </soap:Header>
  <soap:Body>{body}</soap:Body>
</soap:Envelope>"#
    )
}

async fn mount_wsdl(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(CAMPAIGN_SERVICE_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(include_str!("fixtures/CampaignService.wsdl")),
        )
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_get_decodes_page_entries() {
    let server = MockServer::start().await;
    mount_wsdl(&server).await;
    let response = envelope(&format!(
        r#"<getResponse xmlns="{NAMESPACE}">
             <rval>
               <totalNumEntries>2</totalNumEntries>
               <Page.Type>CampaignPage</Page.Type>
               <entries><id>11</id><name>Spring</name><status>ACTIVE</status></entries>
               <entries><id>12</id><name>Autumn</name><status>PAUSED</status></entries>
             </rval>
           </getResponse>"#
    ));
    Mock::given(method("POST"))
        .and(path(CAMPAIGN_SERVICE_PATH))
        .and(header("Authorization", "Bearer adwords-token"))
        .and(body_string_contains("<ns0:fields>Id</ns0:fields><ns0:fields>Name</ns0:fields>"))
        .and(body_string_contains("<ns0:numberResults>100</ns0:numberResults>"))
        .respond_with(ResponseTemplate::new(200).set_body_string(response))
        .expect(1)
        .mount(&server)
        .await;

    let service = client()
        .service("CampaignService", None, Some(&server.uri()))
        .await
        .unwrap();
    let selector = SoapObject::new()
        .with("fields", vec!["Id", "Name"])
        .with(
            "paging",
            SoapObject::new()
                .with("startIndex", 0)
                .with("numberResults", 100),
        );
    let page = service.call("get", vec![selector.into()]).await.unwrap();

    assert_eq!(page.field("totalNumEntries").and_then(SoapValue::as_i64), Some(2));
    let entries = page.field("entries").and_then(SoapValue::as_list).unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].field("id").and_then(SoapValue::as_i64), Some(11));
    assert_eq!(entries[1].field("name").and_then(SoapValue::as_str), Some("Autumn"));
}

#[tokio::test]
async fn test_request_header_carries_adwords_fields() {
    let server = MockServer::start().await;
    mount_wsdl(&server).await;
    Mock::given(method("POST"))
        .and(path(CAMPAIGN_SERVICE_PATH))
        .and(body_string_contains("<ns0:RequestHeader>"))
        .and(body_string_contains("<ns0:clientCustomerId>123-456-7890</ns0:clientCustomerId>"))
        .and(body_string_contains("<ns0:developerToken>dev-token-123</ns0:developerToken>"))
        .and(body_string_contains("<ns0:userAgent>campaign tool (AwApi-Rust, googleads/"))
        .and(body_string_contains("<ns0:validateOnly>false</ns0:validateOnly>"))
        .respond_with(ResponseTemplate::new(200).set_body_string(envelope(&format!(
            r#"<getResponse xmlns="{NAMESPACE}"><rval><totalNumEntries>0</totalNumEntries></rval></getResponse>"#
        ))))
        .expect(1)
        .mount(&server)
        .await;

    let service = client()
        .service("CampaignService", None, Some(&server.uri()))
        .await
        .unwrap();
    let page = service.call("get", Vec::new()).await.unwrap();

    assert_eq!(page.field("totalNumEntries").and_then(SoapValue::as_i64), Some(0));
    assert!(page.field("entries").is_none());
}

#[tokio::test]
async fn test_mutate_fills_type_field_for_derived_values() {
    let server = MockServer::start().await;
    mount_wsdl(&server).await;
    Mock::given(method("POST"))
        .and(path(CAMPAIGN_SERVICE_PATH))
        .and(body_string_contains("<ns0:operator>ADD</ns0:operator>"))
        .and(body_string_contains(r#"<ns0:settings xsi:type="ns0:GeoTargetTypeSetting">"#))
        .and(body_string_contains(
            "<ns0:Setting.Type>GeoTargetTypeSetting</ns0:Setting.Type>",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_string(envelope(&format!(
            r#"<mutateResponse xmlns="{NAMESPACE}"><rval><value><id>99</id><name>New</name></value></rval></mutateResponse>"#
        ))))
        .expect(1)
        .mount(&server)
        .await;

    let service = client()
        .service("CampaignService", None, Some(&server.uri()))
        .await
        .unwrap();
    let campaign = SoapObject::new().with("name", "New").with(
        "settings",
        vec![SoapObject::of_type("GeoTargetTypeSetting")
            .with("positiveGeoTargetType", "DONT_CARE")],
    );
    let operation = SoapObject::new()
        .with("operator", "ADD")
        .with("operand", campaign);
    let result = service
        .call("mutate", vec![SoapValue::List(vec![operation.into()])])
        .await
        .unwrap();

    let created = result.field("value").and_then(SoapValue::as_list).unwrap();
    assert_eq!(created[0].field("id").and_then(SoapValue::as_i64), Some(99));
}

#[tokio::test]
async fn test_too_many_arguments_are_rejected() {
    let server = MockServer::start().await;
    mount_wsdl(&server).await;

    let service = client()
        .service("CampaignService", None, Some(&server.uri()))
        .await
        .unwrap();
    let error = service
        .call(
            "get",
            vec![SoapObject::new().into(), SoapObject::new().into()],
        )
        .await
        .unwrap_err();

    assert!(matches!(
        error,
        SoapError::Marshal(MarshalError::TooManyArguments { expected: 1, given: 2, .. })
    ));
}

#[tokio::test]
async fn test_unknown_field_is_rejected() {
    let server = MockServer::start().await;
    mount_wsdl(&server).await;

    let service = client()
        .service("CampaignService", None, Some(&server.uri()))
        .await
        .unwrap();
    let selector = SoapObject::new().with("ordering", "Name");
    let error = service.call("get", vec![selector.into()]).await.unwrap_err();

    assert!(matches!(
        error,
        SoapError::Marshal(MarshalError::UnknownField { field, .. }) if field == "ordering"
    ));
}

#[tokio::test]
async fn test_soap_xml_for_complex_type() {
    let server = MockServer::start().await;
    mount_wsdl(&server).await;

    let service = client()
        .service("CampaignService", None, Some(&server.uri()))
        .await
        .unwrap();
    let xml = service
        .soap_xml_for_complex_type(
            "Campaign",
            SoapObject::new()
                .with("id", 5_i64)
                .with("status", "PAUSED")
                .into(),
        )
        .unwrap();

    assert!(xml.contains(&format!(r#"xmlns:ns0="{NAMESPACE}""#)));
    assert!(xml.contains("<ns0:id>5</ns0:id><ns0:status>PAUSED</ns0:status>"));

    let error = service
        .soap_xml_for_complex_type("Budget", SoapObject::new().into())
        .unwrap_err();
    assert!(matches!(
        error,
        SoapError::Marshal(MarshalError::UnknownElement { .. })
    ));
}
