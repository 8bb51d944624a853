//! Tests for the Salesforce client

use super::*;
use crate::config::SalesforceCredentials;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_credentials(login_url: &str) -> SalesforceCredentials {
    SalesforceCredentials {
        login_url: login_url.to_string(),
        client_id: "client".to_string(),
        client_secret: "secret".to_string(),
        username: "user@example.com".to_string(),
        password: "hunter2".to_string(),
        security_token: "tok".to_string(),
    }
}

fn test_client(server: &MockServer) -> SalesforceClient {
    let config = SalesforceClientConfig {
        initial_backoff: Duration::from_millis(5),
        max_backoff: Duration::from_millis(20),
        ..SalesforceClientConfig::default()
    };
    SalesforceClient::with_config(test_credentials(&server.uri()), config)
}

async fn mount_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/services/oauth2/token"))
        .and(body_string_contains("grant_type=password"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "00Dxx!token",
            "instance_url": server.uri(),
        })))
        .mount(server)
        .await;
}

async fn mount_describe(server: &MockServer, object_type: &str, fields: &[&str]) {
    let fields: Vec<_> = fields.iter().map(|name| json!({ "name": name })).collect();
    Mock::given(method("GET"))
        .and(path(format!(
            "/services/data/v59.0/sobjects/{object_type}/describe"
        )))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "fields": fields })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_open_returns_first_page() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_describe(&server, "Account", &["Id", "Name"]).await;

    Mock::given(method("GET"))
        .and(path("/services/data/v59.0/query"))
        .and(query_param("q", "SELECT Id, Name FROM Account"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "totalSize": 2,
            "done": true,
            "records": [
                { "attributes": { "type": "Account" }, "Id": "001", "Name": "Acme" },
                { "attributes": { "type": "Account" }, "Id": "002", "Name": "Globex" },
            ],
        })))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let page = client.open("Account").await.unwrap();

    assert_eq!(page.records.len(), 2);
    assert_eq!(page.total_size, 2);
    assert!(page.next.is_none());
    // Platform metadata is stripped from every record
    assert!(!page.records[0].contains_key("attributes"));
    assert_eq!(page.records[0]["Name"], json!("Acme"));
}

#[tokio::test]
async fn test_open_follows_next_records_url() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_describe(&server, "Account", &["Id"]).await;

    Mock::given(method("GET"))
        .and(path("/services/data/v59.0/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "totalSize": 3,
            "done": false,
            "nextRecordsUrl": "/services/data/v59.0/query/01g-2000",
            "records": [ { "Id": "001" }, { "Id": "002" } ],
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/services/data/v59.0/query/01g-2000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "totalSize": 3,
            "done": true,
            "records": [ { "Id": "003" } ],
        })))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let first = client.open("Account").await.unwrap();
    let locator = first.next.clone().unwrap();
    let second = client.next_page("Account", &locator).await.unwrap();

    assert_eq!(first.records.len(), 2);
    assert_eq!(second.records.len(), 1);
    assert!(second.next.is_none());
}

#[tokio::test]
async fn test_auth_failure_surfaces_as_remote_query() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/services/oauth2/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "authentication failure",
        })))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let err = client.open("Contact").await.unwrap_err();

    match err {
        crate::Error::RemoteQuery { object_type, message } => {
            assert_eq!(object_type, "Contact");
            assert!(message.contains("Authentication failed"));
        }
        other => panic!("expected RemoteQuery, got {other:?}"),
    }
}

#[tokio::test]
async fn test_bad_object_type_fails_at_describe() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    Mock::given(method("GET"))
        .and(path("/services/data/v59.0/sobjects/Bogus/describe"))
        .respond_with(ResponseTemplate::new(404).set_body_string("NOT_FOUND"))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let err = client.open("Bogus").await.unwrap_err();
    assert!(matches!(err, crate::Error::RemoteQuery { .. }));
}

#[tokio::test]
async fn test_transient_server_error_is_retried() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_describe(&server, "Account", &["Id"]).await;

    // First two query attempts fail with 503, third succeeds
    Mock::given(method("GET"))
        .and(path("/services/data/v59.0/query"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/services/data/v59.0/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "totalSize": 1,
            "done": true,
            "records": [ { "Id": "001" } ],
        })))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let page = client.open("Account").await.unwrap();
    assert_eq!(page.records.len(), 1);
}

#[tokio::test]
async fn test_login_happens_once() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/services/oauth2/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "00Dxx!token",
            "instance_url": server.uri(),
        })))
        .expect(1)
        .mount(&server)
        .await;
    mount_describe(&server, "Account", &["Id"]).await;
    mount_describe(&server, "Contact", &["Id"]).await;

    Mock::given(method("GET"))
        .and(path("/services/data/v59.0/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "totalSize": 0,
            "done": true,
            "records": [],
        })))
        .mount(&server)
        .await;

    let client = test_client(&server);
    client.open("Account").await.unwrap();
    client.open("Contact").await.unwrap();
}
