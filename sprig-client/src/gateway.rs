//! REST implementation of the tree gateway.

use crate::config::{AuthConfig, ClientConfig};
use crate::error::{ClientError, ClientResult};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use sprig_cache::TreeGateway;
use sprig_core::{
    Asset, AssetId, Bundle, BundleId, ChildrenPage, GatewayError, HierarchySnapshot, NodeId,
    ScopeId,
};
use tracing::{debug, trace};

#[derive(Serialize)]
struct ChildrenQuery<'a> {
    parent_id: &'a str,
    skip: u32,
    limit: u32,
}

#[derive(Serialize)]
struct BulkAssetsRequest<'a> {
    asset_ids: &'a [AssetId],
}

#[derive(Deserialize)]
struct ErrorBody {
    detail: serde_json::Value,
}

/// [`TreeGateway`] over the service's JSON HTTP API.
#[derive(Clone)]
pub struct RestTreeGateway {
    client: reqwest::Client,
    base_url: String,
    auth_header: HeaderMap,
}

impl RestTreeGateway {
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        let auth_header = build_auth_headers(&config.auth)?;
        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            auth_header,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T, Q>(&self, path: &str, query: Option<&Q>) -> Result<T, GatewayError>
    where
        T: serde::de::DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!(endpoint = path, "GET");
        let mut request = self.client.get(url).headers(self.auth_header.clone());
        if let Some(query) = query {
            request = request.query(query);
        }
        let response = request.send().await.map_err(|e| transport(path, e))?;
        parse_response(path, response).await
    }

    async fn post_json<T, B>(&self, path: &str, body: &B) -> Result<T, GatewayError>
    where
        T: serde::de::DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!(endpoint = path, "POST");
        let response = self
            .client
            .post(url)
            .headers(self.auth_header.clone())
            .json(body)
            .send()
            .await
            .map_err(|e| transport(path, e))?;
        parse_response(path, response).await
    }
}

#[async_trait]
impl TreeGateway for RestTreeGateway {
    async fn get_hierarchy(&self, scope: ScopeId) -> Result<HierarchySnapshot, GatewayError> {
        let path = format!("/api/v1/infospaces/{scope}/tree");
        self.get_json::<HierarchySnapshot, ()>(&path, None).await
    }

    async fn get_children(
        &self,
        scope: ScopeId,
        parent_id: &NodeId,
        limit: u32,
    ) -> Result<ChildrenPage, GatewayError> {
        let path = format!("/api/v1/infospaces/{scope}/tree/children");
        let query = ChildrenQuery {
            parent_id: parent_id.as_str(),
            skip: 0,
            limit,
        };
        self.get_json(&path, Some(&query)).await
    }

    async fn get_asset(&self, scope: ScopeId, id: AssetId) -> Result<Asset, GatewayError> {
        let path = format!("/api/v1/infospaces/{scope}/assets/{id}");
        self.get_json::<Asset, ()>(&path, None).await
    }

    async fn get_bundle(&self, id: BundleId) -> Result<Bundle, GatewayError> {
        // The bundles router is mounted under `/bundles` and its routes repeat
        // the segment.
        let path = format!("/api/v1/bundles/bundles/{id}");
        self.get_json::<Bundle, ()>(&path, None).await
    }

    async fn batch_get_assets(
        &self,
        scope: ScopeId,
        ids: &[AssetId],
    ) -> Result<Vec<Asset>, GatewayError> {
        // Service extension; deployments without it answer 404 here.
        let path = format!("/api/v1/infospaces/{scope}/assets/bulk");
        self.post_json(&path, &BulkAssetsRequest { asset_ids: ids })
            .await
    }
}

fn transport(path: &str, err: reqwest::Error) -> GatewayError {
    GatewayError::Transport {
        endpoint: path.to_string(),
        reason: err.to_string(),
    }
}

async fn parse_response<T: serde::de::DeserializeOwned>(
    path: &str,
    response: reqwest::Response,
) -> Result<T, GatewayError> {
    let status = response.status();
    let body = response.bytes().await.map_err(|e| transport(path, e))?;
    if status.is_success() {
        trace!(endpoint = path, bytes = body.len(), "response received");
        serde_json::from_slice(&body).map_err(|e| GatewayError::Decode {
            endpoint: path.to_string(),
            reason: e.to_string(),
        })
    } else {
        let text = String::from_utf8_lossy(&body);
        Err(GatewayError::Http {
            endpoint: path.to_string(),
            status: status.as_u16(),
            message: error_message(status.as_u16(), &text),
        })
    }
}

/// Prefer the service's `{"detail": ...}` body; fall back to the raw text.
pub(crate) fn error_message(status: u16, text: &str) -> String {
    match serde_json::from_str::<ErrorBody>(text) {
        Ok(ErrorBody {
            detail: serde_json::Value::String(detail),
        }) => detail,
        Ok(ErrorBody { detail }) => detail.to_string(),
        Err(_) => format!("HTTP {}: {}", status, text),
    }
}

fn build_auth_headers(auth: &AuthConfig) -> ClientResult<HeaderMap> {
    let mut headers = HeaderMap::new();
    if let Some(api_key) = &auth.api_key {
        headers.insert(
            HeaderName::from_static("x-api-key"),
            HeaderValue::from_str(api_key).map_err(|e| ClientError::InvalidHeader(e.to_string()))?,
        );
    }
    if let Some(jwt) = &auth.jwt {
        let value = format!("Bearer {}", jwt);
        headers.insert(
            HeaderName::from_static("authorization"),
            HeaderValue::from_str(&value).map_err(|e| ClientError::InvalidHeader(e.to_string()))?,
        );
    }
    Ok(headers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_prefers_detail() {
        assert_eq!(
            error_message(404, r#"{"detail": "Asset not found"}"#),
            "Asset not found"
        );
    }

    #[test]
    fn test_error_message_structured_detail() {
        let message = error_message(422, r#"{"detail": [{"loc": ["query", "limit"]}]}"#);
        assert!(message.contains("limit"));
    }

    #[test]
    fn test_error_message_falls_back_to_text() {
        assert_eq!(error_message(502, "Bad Gateway"), "HTTP 502: Bad Gateway");
    }

    #[test]
    fn test_auth_headers() {
        let headers = build_auth_headers(&AuthConfig {
            api_key: Some("k".to_string()),
            jwt: Some("t".to_string()),
        })
        .unwrap();
        assert_eq!(headers.get("x-api-key").unwrap(), "k");
        assert_eq!(headers.get("authorization").unwrap(), "Bearer t");
    }

    #[test]
    fn test_invalid_header_rejected() {
        let result = build_auth_headers(&AuthConfig {
            api_key: Some("bad\nkey".to_string()),
            jwt: None,
        });
        assert!(matches!(result, Err(ClientError::InvalidHeader(_))));
    }

    #[test]
    fn test_bulk_body_shape() {
        let body = serde_json::to_value(BulkAssetsRequest {
            asset_ids: &[AssetId(5), AssetId(9)],
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({ "asset_ids": [5, 9] }));
    }
}
