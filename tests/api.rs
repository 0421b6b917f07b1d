//! CORS, validation and consortium routes over real sockets.

use bif_api_server::ApiServer;
use reqwest::StatusCode;
use serde_json::{json, Value};

mod common;

async fn post_consortium(server: &ApiServer, body: Value) -> reqwest::Response {
    common::client()
        .post(common::api_url(server, "/api/v1/consortium"))
        .header("origin", common::COCKPIT_ORIGIN)
        .json(&body)
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn wildcard_allows_requests_without_origin() {
    let (mut server, _www) = common::started("*").await;
    let res = common::client()
        .get(common::api_url(&server, "/healthcheck"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    server.shutdown().await;
}

#[tokio::test]
async fn unlisted_and_missing_origins_are_denied() {
    let (mut server, _www) = common::started("http://a.test, http://b.test").await;
    let client = common::client();

    let res = client
        .get(common::api_url(&server, "/healthcheck"))
        .header("origin", "http://evil.test")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "CORS not allowed for Origin \"http://evil.test\".");

    let res = client
        .get(common::api_url(&server, "/healthcheck"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "CORS not allowed for Origin \"<none>\".");

    let res = client
        .get(common::api_url(&server, "/healthcheck"))
        .header("origin", "http://b.test")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    server.shutdown().await;
}

#[tokio::test]
async fn preflight_is_answered_before_validation() {
    let (mut server, _www) = common::started(common::COCKPIT_ORIGIN).await;
    let res = common::client()
        .request(
            reqwest::Method::OPTIONS,
            common::api_url(&server, "/api/v1/consortium"),
        )
        .header("origin", common::COCKPIT_ORIGIN)
        .header("access-control-request-method", "POST")
        .header("access-control-request-headers", "content-type")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    assert_eq!(
        res.headers()["access-control-allow-methods"],
        "GET,HEAD,PUT,PATCH,POST,DELETE"
    );
    assert_eq!(res.headers()["access-control-allow-headers"], "content-type");
    server.shutdown().await;
}

#[tokio::test]
async fn consortium_round_trip_through_storage() {
    let (mut server, _www) = common::started(common::COCKPIT_ORIGIN).await;

    let res = post_consortium(
        &server,
        json!({ "consortiumName": "Acme", "organizationName": "Acme Org", "baseUrl": "http://acme.test" }),
    )
    .await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let created: Value = res.json().await.unwrap();
    let id = created["id"].as_str().unwrap();

    let res = common::client()
        .get(common::api_url(&server, &format!("/api/v1/consortium/{id}")))
        .header("origin", common::COCKPIT_ORIGIN)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.json::<Value>().await.unwrap(), created);

    let res = common::client()
        .get(common::api_url(&server, "/api/v1/consortium/unknown"))
        .header("origin", common::COCKPIT_ORIGIN)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    server.shutdown().await;
}

#[tokio::test]
async fn invalid_bodies_report_every_error() {
    let (mut server, _www) = common::started(common::COCKPIT_ORIGIN).await;

    let res = post_consortium(&server, json!({ "consortiumName": "Acme", "extra": 1 })).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "request body is invalid");
    assert_eq!(body["errors"].as_array().unwrap().len(), 2);

    server.shutdown().await;
}

#[tokio::test]
async fn undeclared_routes_and_media_types_are_rejected() {
    let (mut server, _www) = common::started(common::COCKPIT_ORIGIN).await;
    let client = common::client();

    let res = client
        .get(common::api_url(&server, "/api/v1/nothing-here"))
        .header("origin", common::COCKPIT_ORIGIN)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client
        .delete(common::api_url(&server, "/healthcheck"))
        .header("origin", common::COCKPIT_ORIGIN)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);

    let res = client
        .post(common::api_url(&server, "/api/v1/consortium"))
        .header("origin", common::COCKPIT_ORIGIN)
        .header("content-type", "text/plain")
        .body("consortiumName=Acme")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

    let res = client
        .post(common::api_url(&server, "/api/v1/consortium"))
        .header("origin", common::COCKPIT_ORIGIN)
        .header("content-type", "application/json")
        .body("{\"consortiumName\":")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    server.shutdown().await;
}

#[tokio::test]
async fn oversized_json_is_rejected() {
    let www = common::www_root();
    let mut config = common::config(www.path(), "*");
    config.api_body_limit_bytes = 64;
    let mut server = common::server(config);
    server.start().await.unwrap();

    let res = post_consortium(
        &server,
        json!({ "consortiumName": "x".repeat(100), "organizationName": "o" }),
    )
    .await;
    assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);

    server.shutdown().await;
}

#[tokio::test]
async fn healthcheck_answers_under_a_custom_document() {
    let www = common::www_root();
    let mut server = common::server(common::config(www.path(), "*")).with_api_document(json!({
        "openapi": "3.1.0",
        "paths": { "/api/v1/consortium": { "post": {} } }
    }));
    server.start().await.unwrap();
    let client = common::client();

    let res = client
        .get(common::api_url(&server, "/healthcheck"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["success"], true);

    let res = client
        .head(common::api_url(&server, "/healthcheck"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    server.shutdown().await;
}
