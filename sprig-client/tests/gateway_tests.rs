//! RestTreeGateway against a one-shot local HTTP responder.

use sprig_cache::TreeGateway;
use sprig_client::{ClientConfig, RestTreeGateway};
use sprig_core::{AssetId, BundleId, GatewayError, NodeId, ScopeId};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

fn config_for(base_url: &str) -> ClientConfig {
    ClientConfig::from_toml(&format!(
        r#"
        api_base_url = "{base_url}"
        request_timeout_ms = 5000

        [auth]
        api_key = "test-key"

        [cache]
        children_page_limit = 100
        "#
    ))
    .unwrap()
}

/// Serve exactly one request with `status` and `body`, returning the raw
/// request text.
async fn respond_once(status: &'static str, body: String) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = socket.read(&mut buf).await.unwrap();
            request.extend_from_slice(&buf[..n]);
            let text = String::from_utf8_lossy(&request);
            if let Some(header_end) = text.find("\r\n\r\n") {
                let content_length = text[..header_end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if request.len() >= header_end + 4 + content_length {
                    break;
                }
            }
            if n == 0 {
                break;
            }
        }
        let response = format!(
            "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();
        String::from_utf8_lossy(&request).into_owned()
    });
    (base_url, handle)
}

#[tokio::test]
async fn children_request_shape() {
    let body = r#"{
        "parent_id": "bundle-4",
        "children": [{"id": "asset-9", "type": "asset", "name": "a.pdf", "kind": "pdf"}],
        "total_children": 1,
        "has_more": false
    }"#
    .to_string();
    let (base_url, server) = respond_once("200 OK", body).await;
    let gateway = RestTreeGateway::new(&config_for(&base_url)).unwrap();

    let page = gateway
        .get_children(ScopeId(7), &NodeId::from("bundle-4"), 100)
        .await
        .unwrap();

    assert_eq!(page.children.len(), 1);
    assert_eq!(page.children[0].asset_kind.as_deref(), Some("pdf"));

    let request = server.await.unwrap();
    let request_line = request.lines().next().unwrap();
    assert!(request_line.starts_with("GET /api/v1/infospaces/7/tree/children?"));
    assert!(request_line.contains("parent_id=bundle-4"));
    assert!(request_line.contains("skip=0"));
    assert!(request_line.contains("limit=100"));
    assert!(request.to_ascii_lowercase().contains("x-api-key: test-key"));
}

#[tokio::test]
async fn bulk_request_posts_ids() {
    let (base_url, server) = respond_once("200 OK", "[]".to_string()).await;
    let gateway = RestTreeGateway::new(&config_for(&base_url)).unwrap();

    let assets = gateway
        .batch_get_assets(ScopeId(2), &[AssetId(5), AssetId(9)])
        .await
        .unwrap();

    assert!(assets.is_empty());
    let request = server.await.unwrap();
    assert!(request.starts_with("POST /api/v1/infospaces/2/assets/bulk "));
    assert!(request.ends_with(r#"{"asset_ids":[5,9]}"#));
}

#[tokio::test]
async fn error_detail_is_surfaced() {
    let (base_url, _server) =
        respond_once("404 Not Found", r#"{"detail": "Bundle not found"}"#.to_string()).await;
    let gateway = RestTreeGateway::new(&config_for(&base_url)).unwrap();

    let err = gateway.get_bundle(BundleId(77)).await.unwrap_err();

    assert_eq!(
        err,
        GatewayError::Http {
            endpoint: "/api/v1/bundles/bundles/77".to_string(),
            status: 404,
            message: "Bundle not found".to_string(),
        }
    );
}

#[tokio::test]
async fn bundle_request_path() {
    let body = r#"{
        "id": 77,
        "name": "reports",
        "asset_count": 3,
        "created_at": "2024-01-15T10:30:00Z",
        "updated_at": "2024-01-15T10:30:00Z"
    }"#
    .to_string();
    let (base_url, server) = respond_once("200 OK", body).await;
    let gateway = RestTreeGateway::new(&config_for(&base_url)).unwrap();

    let bundle = gateway.get_bundle(BundleId(77)).await.unwrap();

    assert_eq!(bundle.id, BundleId(77));
    assert_eq!(bundle.asset_count, 3);

    let request = server.await.unwrap();
    assert!(request.starts_with("GET /api/v1/bundles/bundles/77 "));
}

#[tokio::test]
async fn malformed_body_is_a_decode_error() {
    let (base_url, _server) = respond_once("200 OK", "{\"nodes\": 3}".to_string()).await;
    let gateway = RestTreeGateway::new(&config_for(&base_url)).unwrap();

    let err = gateway.get_hierarchy(ScopeId(1)).await.unwrap_err();

    assert!(matches!(err, GatewayError::Decode { .. }));
}

#[tokio::test]
async fn refused_connection_is_a_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);
    let gateway = RestTreeGateway::new(&config_for(&base_url)).unwrap();

    let err = gateway.get_asset(ScopeId(1), AssetId(1)).await.unwrap_err();

    assert!(matches!(err, GatewayError::Transport { .. }));
}
