//! Integration tests for the signed marketplace client against a mock gateway

use bazaar::adapters::marketplace::{ApiCall, MarketplaceApi, SignedClient};
use bazaar::config::{secret_string, MarketplaceConfig, RetryConfig};
use bazaar::domain::{BazaarError, TransportError};
use mockito::Matcher;

const ORDER_LIST: &str = "com.alibaba.trade/alibaba.trade.getBuyerOrderList";
const ORDER_LIST_PATH: &str = "/param2/1/com.alibaba.trade/alibaba.trade.getBuyerOrderList/1234567";

fn config(base_url: String, max_attempts: u32) -> MarketplaceConfig {
    MarketplaceConfig {
        base_url,
        app_key: "1234567".to_string(),
        app_secret: secret_string("secret".to_string()),
        access_token: Some(secret_string("tok".to_string())),
        timeout_seconds: 5,
        retry: RetryConfig {
            max_attempts,
            backoff_base: 2.0,
            backoff_unit_ms: 0,
            max_delay_ms: 0,
        },
    }
}

fn order_call() -> ApiCall {
    ApiCall::new(ORDER_LIST)
        .with_param("pageNo", "1")
        .with_param("pageSize", "50")
}

#[tokio::test]
async fn test_request_is_signed_and_routed() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", ORDER_LIST_PATH)
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("pageNo".into(), "1".into()),
            Matcher::UrlEncoded("pageSize".into(), "50".into()),
            Matcher::UrlEncoded("access_token".into(), "tok".into()),
            Matcher::UrlEncoded(
                "_aop_signature".into(),
                "8AF6D14676F7583BA04F0500AA9FF1B57F9B1649".into(),
            ),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"result": [{"id": 1}], "totalRecord": 1}"#)
        .expect(1)
        .create_async()
        .await;

    let client = SignedClient::new(&config(server.url(), 3)).unwrap();
    let body = client.call(&order_call()).await.unwrap();

    assert_eq!(body["totalRecord"], 1);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_server_errors_are_retried_until_exhausted() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", ORDER_LIST_PATH)
        .match_query(Matcher::Any)
        .with_status(503)
        .with_body("service unavailable")
        .expect(3)
        .create_async()
        .await;

    let client = SignedClient::new(&config(server.url(), 3)).unwrap();
    let err = client.call(&order_call()).await.unwrap_err();

    match err {
        BazaarError::Transport { attempts, source } => {
            assert_eq!(attempts, 3);
            assert!(matches!(source, TransportError::Status { status: 503, .. }));
        }
        other => panic!("expected transport error, got {other:?}"),
    }
    mock.assert_async().await;
}

#[tokio::test]
async fn test_api_error_envelope_is_not_retried() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", ORDER_LIST_PATH)
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"error_code": "gw.SignatureInvalid", "error_message": "bad signature"}"#)
        .expect(1)
        .create_async()
        .await;

    let client = SignedClient::new(&config(server.url(), 5)).unwrap();
    let err = client.call(&order_call()).await.unwrap_err();

    match err {
        BazaarError::Transport { attempts, source } => {
            assert_eq!(attempts, 1);
            match source {
                TransportError::Api { code, message } => {
                    assert_eq!(code, "gw.SignatureInvalid");
                    assert_eq!(message, "bad signature");
                }
                other => panic!("expected API error, got {other:?}"),
            }
        }
        other => panic!("expected transport error, got {other:?}"),
    }
    mock.assert_async().await;
}

#[tokio::test]
async fn test_malformed_body_is_retried() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", ORDER_LIST_PATH)
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body("<html>gateway</html>")
        .expect(2)
        .create_async()
        .await;

    let client = SignedClient::new(&config(server.url(), 2)).unwrap();
    let err = client.call(&order_call()).await.unwrap_err();

    assert!(matches!(
        err,
        BazaarError::Transport {
            attempts: 2,
            source: TransportError::InvalidResponse(_)
        }
    ));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_trailing_slash_in_base_url() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", ORDER_LIST_PATH)
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"result": []}"#)
        .create_async()
        .await;

    let client = SignedClient::new(&config(format!("{}/", server.url()), 1)).unwrap();
    client.call(&order_call()).await.unwrap();

    mock.assert_async().await;
}
