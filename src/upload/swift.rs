use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::SwiftConf;
use crate::error::SubmitError;
use crate::upload::{detect_content_type, ObjectStorage};

#[derive(Deserialize)]
struct TokenResponse {
    token: TokenBody,
}

#[derive(Deserialize, Default)]
struct TokenBody {
    #[serde(default)]
    catalog: Vec<CatalogEntry>,
}

#[derive(Deserialize)]
struct CatalogEntry {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    endpoints: Vec<CatalogEndpoint>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct CatalogEndpoint {
    interface: String,
    region: String,
    url: String,
}

/// OpenStack Swift backend: Keystone v3 password authentication, then plain
/// object PUTs against the region's object-store endpoint.
pub struct SwiftStorage {
    http: reqwest::Client,
    conf: SwiftConf,
    /// Token and storage URL, kept for the lifetime of one staging run.
    session: Option<(String, String)>,
}

impl SwiftStorage {
    pub fn new(conf: SwiftConf) -> Self {
        Self {
            http: reqwest::Client::new(),
            conf,
            session: None,
        }
    }

    async fn authenticate(&mut self) -> Result<(String, String), SubmitError> {
        if let Some(session) = &self.session {
            return Ok(session.clone());
        }

        let body = serde_json::json!({
            "auth": {
                "identity": {
                    "methods": ["password"],
                    "password": {
                        "user": {
                            "name": self.conf.user_name,
                            "domain": { "name": self.conf.domain },
                            "password": self.conf.password,
                        }
                    }
                }
            }
        });

        let url = format!("{}/auth/tokens", self.conf.auth_url.trim_end_matches('/'));
        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| SubmitError::Upload(format!("authentication failed: {e}")))?;
        if !response.status().is_success() {
            return Err(SubmitError::Upload(format!(
                "authentication failed with status {}",
                response.status()
            )));
        }

        let token = response
            .headers()
            .get("X-Subject-Token")
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string())
            .ok_or_else(|| {
                SubmitError::Upload("authentication response carries no token".to_string())
            })?;
        let catalog: TokenResponse = response
            .json()
            .await
            .map_err(|e| SubmitError::Upload(format!("unreadable token response: {e}")))?;

        let storage_url = catalog
            .token
            .catalog
            .iter()
            .filter(|entry| entry.kind == "object-store")
            .flat_map(|entry| entry.endpoints.iter())
            .find(|endpoint| {
                endpoint.interface == "public"
                    && (self.conf.region.is_empty() || endpoint.region == self.conf.region)
            })
            .map(|endpoint| endpoint.url.trim_end_matches('/').to_string())
            .ok_or_else(|| {
                SubmitError::Upload(format!(
                    "no object-store endpoint for region {} in the service catalog",
                    self.conf.region
                ))
            })?;

        self.session = Some((token.clone(), storage_url.clone()));
        Ok((token, storage_url))
    }

    /// Create or override one object, named after the file base name.
    async fn put(&mut self, source: &Path, container: &str) -> Result<(), SubmitError> {
        let (token, storage_url) = self.authenticate().await?;

        let object = source
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| SubmitError::Upload(format!("invalid file name: {source:?}")))?;
        let content = tokio::fs::read(source).await?;

        let url = format!("{storage_url}/{container}/{object}");
        let response = self
            .http
            .put(&url)
            .header("X-Auth-Token", &token)
            .header("Content-Type", detect_content_type(source))
            .body(content)
            .send()
            .await
            .map_err(|e| SubmitError::Upload(format!("upload of {object} failed: {e}")))?;
        if !response.status().is_success() {
            return Err(SubmitError::Upload(format!(
                "upload of {object} failed with status {}",
                response.status()
            )));
        }

        tracing::info!("File {} uploaded", object);
        Ok(())
    }
}

#[async_trait]
impl ObjectStorage for SwiftStorage {
    async fn upload(&mut self, source: &Path, container: &str) -> Result<(), SubmitError> {
        let metadata = tokio::fs::metadata(source).await?;
        if !metadata.is_dir() {
            return self.put(source, container).await;
        }

        let mut entries = tokio::fs::read_dir(source).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                self.put(&entry.path(), container).await?;
            }
        }
        Ok(())
    }
}
