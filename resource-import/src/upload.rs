#![doc = "HTTP repository loader: implements the core RepositoryLoader trait with reqwest."]
//
//! # Repository Loader (CLI <-> Core)
//!
//! This module wires the [`RepositoryLoader`] trait from
//! [`resource_import_core::contract`] to a real repository over HTTP.
//!
//! - `create` issues a `PUT` and succeeds only on `201 Created`.
//! - `patch` issues a `PATCH` (or a `POST` with `X-HTTP-Method-Override:
//!   PATCH`, see [`PatchMethod`]) and succeeds only on `204 No Content`.
//! - When credentials are configured, the same `Authorization` header is
//!   attached to every request.
//!
//! Transport errors and unexpected statuses are logged and reported as
//! `false`; they never abort a traversal.

use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, StatusCode};
use serde::Deserialize;
use url::Url;

use resource_import_core::contract::RepositoryLoader;
use resource_import_core::payload::{
    ResourceIdentifier, UploadPayload, DEFAULT_CONTENT_TYPE, SPARQL_UPDATE_CONTENT_TYPE,
};

pub const METHOD_OVERRIDE_HEADER: &str = "X-HTTP-Method-Override";

/// How a SPARQL update is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatchMethod {
    /// A genuine `PATCH` request.
    #[default]
    Native,
    /// `POST` carrying `X-HTTP-Method-Override: PATCH`, for servers or proxies
    /// that reject `PATCH`.
    PostOverride,
}

/// Builds the `Authorization` value for HTTP basic auth.
pub fn basic_auth_header(username: &str, password: &str) -> String {
    let credentials = format!("{username}:{password}");
    format!("Basic {}", STANDARD.encode(credentials.as_bytes()))
}

#[derive(Debug)]
pub struct HttpRepositoryLoader {
    client: Client,
    base_url: Url,
    auth_header: Option<HeaderValue>,
    patch_method: PatchMethod,
}

impl HttpRepositoryLoader {
    /// The base URL should end with `/` for relative identifiers to resolve
    /// under it; one is appended otherwise.
    pub fn new(base_url: &str) -> Result<Self> {
        let mut base_url = Url::parse(base_url)
            .with_context(|| format!("Invalid repository base URL {base_url:?}"))?;
        if !base_url.path().ends_with('/') {
            tracing::warn!(
                base_url = %base_url,
                "Repository base URL does not end with '/', appending one"
            );
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let client = Client::builder()
            .pool_max_idle_per_host(usize::MAX)
            .build()
            .context("Failed to build HTTP client")?;
        tracing::info!(base_url = %base_url, "Initialized HttpRepositoryLoader");
        Ok(HttpRepositoryLoader {
            client,
            base_url,
            auth_header: None,
            patch_method: PatchMethod::default(),
        })
    }

    /// Attaches a precomputed `Authorization` value to every request.
    pub fn with_auth_header(mut self, value: &str) -> Result<Self> {
        let mut header =
            HeaderValue::from_str(value).context("Authorization header is not valid")?;
        header.set_sensitive(true);
        self.auth_header = Some(header);
        tracing::info!("Using Authentication!");
        Ok(self)
    }

    pub fn with_credentials(self, username: &str, password: &str) -> Result<Self> {
        self.with_auth_header(&basic_auth_header(username, password))
    }

    pub fn with_patch_method(mut self, patch_method: PatchMethod) -> Self {
        self.patch_method = patch_method;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolves an identifier against the base URL.
    ///
    /// The identifier is always treated as a relative path, so a segment like
    /// `a:b` is not mistaken for a URL scheme. `?` and `#` are escaped.
    pub fn resolve(&self, identifier: &ResourceIdentifier) -> Result<Url> {
        let escaped = identifier
            .as_str()
            .replace('%', "%25")
            .replace('?', "%3F")
            .replace('#', "%23");
        self.base_url
            .join(&format!("./{escaped}"))
            .with_context(|| format!("Cannot resolve {identifier:?} against {}", self.base_url))
    }

    async fn action(
        &self,
        method: Method,
        identifier: &ResourceIdentifier,
        payload: UploadPayload,
        content_type: &str,
        expected: StatusCode,
    ) -> bool {
        let request_uri = match self.resolve(identifier) {
            Ok(uri) => uri,
            Err(e) => {
                tracing::error!(error = %e, uri_ref = %identifier, "[HTTP] Cannot build request URI");
                return false;
            }
        };

        let mut request = self
            .client
            .request(method.clone(), request_uri.clone())
            .header(CONTENT_TYPE, content_type);
        if method == Method::POST && self.patch_method == PatchMethod::PostOverride {
            request = request.header(METHOD_OVERRIDE_HEADER, "PATCH");
        }
        if let Some(auth) = &self.auth_header {
            request = request.header(AUTHORIZATION, auth.clone());
        }
        tracing::debug!(
            %method,
            url = %request_uri,
            content_type,
            bytes = payload.len(),
            "[HTTP] Sending request"
        );
        let request = request.body(payload.into_body());

        match request.send().await {
            Ok(res) => {
                let status = res.status();
                tracing::debug!(url = %request_uri, %status, "[HTTP] Response");
                if status == expected {
                    true
                } else {
                    let body = res.text().await.unwrap_or_default();
                    tracing::warn!(
                        url = %request_uri,
                        %status,
                        expected = %expected,
                        body = %body,
                        "[HTTP] Unexpected response status"
                    );
                    false
                }
            }
            Err(e) => {
                tracing::warn!(url = %request_uri, error = ?e, "[HTTP] Request failed");
                false
            }
        }
    }
}

#[async_trait]
impl RepositoryLoader for HttpRepositoryLoader {
    async fn create(&self, identifier: ResourceIdentifier, payload: UploadPayload) -> bool {
        let content_type = payload
            .content_type()
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string();
        self.action(
            Method::PUT,
            &identifier,
            payload,
            &content_type,
            StatusCode::CREATED,
        )
        .await
    }

    async fn patch(&self, identifier: ResourceIdentifier, payload: UploadPayload) -> bool {
        let method = match self.patch_method {
            PatchMethod::Native => Method::PATCH,
            PatchMethod::PostOverride => Method::POST,
        };
        self.action(
            method,
            &identifier,
            payload,
            SPARQL_UPDATE_CONTENT_TYPE,
            StatusCode::NO_CONTENT,
        )
        .await
    }
}
