//! HTTP implementation of [`PlatformApi`]
//!
//! Thin REST client over `reqwest`: JSON bodies for element operations,
//! multipart forms for connector package upload/publish, bearer-token auth.
//! Collection endpoints may return either a bare array or an
//! `{ "items": [...] }` envelope; both are tolerated.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use wem_element::{Connector, ConnectorVersion, ElementType, Integration};

use crate::api::{ListFilter, PlatformApi};
use crate::auth::generate_access_token;
use crate::config::WorkspaceConfig;
use crate::error::ApiError;

/// Default platform API base URI; overridable per workspace.
pub const DEFAULT_API_URI: &str = "https://api.platform.example";

/// HTTP client for one workspace.
pub struct HttpPlatformApi {
    http: reqwest::Client,
    base_uri: String,
    token: String,
}

impl HttpPlatformApi {
    /// Build a client for the given workspace, minting a fresh access token.
    ///
    /// # Errors
    /// Fails if the access token cannot be signed or the HTTP client cannot
    /// be constructed.
    pub fn new(config: &WorkspaceConfig) -> Result<Self, ApiError> {
        let token = generate_access_token(&config.credentials)?;
        let base_uri = config
            .api_uri
            .clone()
            .unwrap_or_else(|| DEFAULT_API_URI.to_string());

        Ok(Self {
            http: reqwest::Client::builder().build()?,
            base_uri: base_uri.trim_end_matches('/').to_string(),
            token,
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}/{}", self.base_uri, path))
            .bearer_auth(&self.token)
    }

    async fn check(
        method: &'static str,
        endpoint: &str,
        response: Response,
    ) -> Result<Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ApiError::Status {
            method,
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
            body,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.request(Method::GET, path).send().await?;
        let response = Self::check("GET", path, response).await?;
        let value: Value = response.json().await?;
        serde_json::from_value(value).map_err(|source| ApiError::MalformedResponse {
            endpoint: path.to_string(),
            source,
        })
    }

    async fn send_json(
        &self,
        method: Method,
        path: &str,
        body: &Value,
    ) -> Result<Value, ApiError> {
        let name = method_name(&method);
        let response = self.request(method, path).json(body).send().await?;
        let response = Self::check(name, path, response).await?;
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(Value::Null);
        }
        Ok(response.json().await?)
    }

    async fn list(&self, path: &str) -> Result<Vec<Value>, ApiError> {
        let value: Value = self.get_json(path).await?;
        Ok(unwrap_items(value))
    }

    async fn send_package(
        &self,
        path: &str,
        package: Vec<u8>,
        fields: &[(&str, &str)],
    ) -> Result<(), ApiError> {
        let file = Part::bytes(package)
            .file_name("file.zip")
            .mime_str("application/zip")?;
        let mut form = Form::new().part("file", file);
        for (name, value) in fields {
            form = form.text((*name).to_string(), (*value).to_string());
        }

        let response = self.request(Method::POST, path).multipart(form).send().await?;
        Self::check("POST", path, response).await?;
        Ok(())
    }
}

/// Accept both bare-array and `{items: [...]}` collection responses.
fn unwrap_items(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("items") {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

fn method_name(method: &Method) -> &'static str {
    match *method {
        Method::GET => "GET",
        Method::POST => "POST",
        Method::PUT => "PUT",
        Method::DELETE => "DELETE",
        _ => "HTTP",
    }
}

#[async_trait]
impl PlatformApi for HttpPlatformApi {
    async fn find_all(
        &self,
        element_type: ElementType,
        filter: Option<&ListFilter>,
    ) -> Result<Vec<Value>, ApiError> {
        let mut path = element_type.plural().to_string();
        if let Some(integration_id) = filter.and_then(|f| f.integration_id.as_deref()) {
            path = format!("{path}?integrationId={integration_id}");
        }
        self.list(&path).await
    }

    async fn create(&self, element_type: ElementType, document: &Value) -> Result<Value, ApiError> {
        self.send_json(Method::POST, element_type.plural(), document)
            .await
    }

    async fn update(
        &self,
        element_type: ElementType,
        id: &str,
        document: &Value,
    ) -> Result<Value, ApiError> {
        let path = format!("{}/{id}", element_type.plural());
        self.send_json(Method::PUT, &path, document).await
    }

    async fn reset(&self, element_type: ElementType, id: &str) -> Result<(), ApiError> {
        let path = format!("{}/{id}/reset", element_type.plural());
        self.send_json(Method::POST, &path, &Value::Null).await?;
        Ok(())
    }

    async fn apply_to_integrations(
        &self,
        element_type: ElementType,
        key: &str,
        integration_keys: &[String],
    ) -> Result<(), ApiError> {
        let path = format!("{}/{key}/apply", element_type.plural());
        let body = serde_json::json!({ "integrationKeys": integration_keys });
        self.send_json(Method::POST, &path, &body).await?;
        Ok(())
    }

    async fn put_by_key(
        &self,
        element_type: ElementType,
        key: &str,
        integration_key: Option<&str>,
        document: &Value,
    ) -> Result<Value, ApiError> {
        let mut path = format!("{}/key/{key}", element_type.plural());
        if let Some(integration_key) = integration_key {
            path = format!("{path}?integrationKey={integration_key}");
        }
        self.send_json(Method::PUT, &path, document).await
    }

    async fn list_connectors(&self) -> Result<Vec<Connector>, ApiError> {
        let items = self.list("connectors").await?;
        items
            .into_iter()
            .map(|item| {
                serde_json::from_value(item).map_err(|source| ApiError::MalformedResponse {
                    endpoint: "connectors".to_string(),
                    source,
                })
            })
            .collect()
    }

    async fn create_connector(&self, document: &Value) -> Result<Connector, ApiError> {
        let value = self.send_json(Method::POST, "connectors", document).await?;
        serde_json::from_value(value).map_err(|source| ApiError::MalformedResponse {
            endpoint: "connectors".to_string(),
            source,
        })
    }

    async fn connector_versions(
        &self,
        connector_id: &str,
    ) -> Result<Vec<ConnectorVersion>, ApiError> {
        self.get_json(&format!("connectors/{connector_id}/versions"))
            .await
    }

    async fn download_connector_package(
        &self,
        connector_id: &str,
        version: &str,
    ) -> Result<Vec<u8>, ApiError> {
        let path = format!("connectors/{connector_id}/versions/{version}/package");
        let response = self.request(Method::GET, &path).send().await?;
        let response = Self::check("GET", &path, response).await?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn upload_connector_package(
        &self,
        connector_id: &str,
        package: Vec<u8>,
    ) -> Result<(), ApiError> {
        self.send_package(&format!("connectors/{connector_id}/upload"), package, &[])
            .await
    }

    async fn publish_connector_version(
        &self,
        connector_id: &str,
        version: &str,
        package: Vec<u8>,
        changelog: &str,
    ) -> Result<(), ApiError> {
        self.send_package(
            &format!("connectors/{connector_id}/publish-version"),
            package,
            &[("version", version), ("changelog", changelog)],
        )
        .await
    }

    async fn list_integrations(&self) -> Result<Vec<Integration>, ApiError> {
        let items = self.list("integrations").await?;
        items
            .into_iter()
            .map(|item| {
                serde_json::from_value(item).map_err(|source| ApiError::MalformedResponse {
                    endpoint: "integrations".to_string(),
                    source,
                })
            })
            .collect()
    }

    async fn create_integration(
        &self,
        key: &str,
        name: &str,
        connector_id: &str,
    ) -> Result<Integration, ApiError> {
        let body = serde_json::json!({
            "key": key,
            "name": name,
            "connectorId": connector_id,
        });
        let value = self.send_json(Method::POST, "integrations", &body).await?;
        serde_json::from_value(value).map_err(|source| ApiError::MalformedResponse {
            endpoint: "integrations".to_string(),
            source,
        })
    }

    async fn switch_integration_connector_version(
        &self,
        integration_id: &str,
        version_id: &str,
    ) -> Result<(), ApiError> {
        let path = format!("integrations/{integration_id}/switch-connector-version");
        let body = serde_json::json!({ "connectorVersionId": version_id });
        self.send_json(Method::POST, &path, &body).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unwrap_items_accepts_both_envelopes() {
        assert_eq!(unwrap_items(json!([1, 2])), vec![json!(1), json!(2)]);
        assert_eq!(unwrap_items(json!({"items": [3]})), vec![json!(3)]);
        assert!(unwrap_items(json!({"total": 0})).is_empty());
        assert!(unwrap_items(json!("scalar")).is_empty());
    }

    #[test]
    fn client_construction_trims_base_uri() {
        let config = WorkspaceConfig::new(crate::auth::WorkspaceCredentials::new("k", "s"))
            .with_api_uri("https://api.staging.example/");
        let client = HttpPlatformApi::new(&config).unwrap();
        assert_eq!(client.base_uri, "https://api.staging.example");
    }
}
