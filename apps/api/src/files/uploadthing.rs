use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{FileServiceError, FileStore};

const API_KEY_HEADER: &str = "x-uploadthing-api-key";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DeleteFilesRequest<'a> {
    file_keys: &'a [String],
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: String,
}

/// Client for the UploadThing REST API. No retries: failures go straight back
/// to the caller.
#[derive(Clone)]
pub struct UploadThingClient {
    client: Client,
    api_url: String,
    api_key: String,
}

impl UploadThingClient {
    pub fn new(api_url: String, api_key: String) -> Result<Self, FileServiceError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }
}

#[async_trait]
impl FileStore for UploadThingClient {
    async fn delete_files(&self, keys: &[String]) -> Result<(), FileServiceError> {
        if keys.is_empty() {
            return Ok(());
        }

        let response = self
            .client
            .post(format!("{}/v6/deleteFiles", self.api_url))
            .header(API_KEY_HEADER, &self.api_key)
            .json(&DeleteFilesRequest { file_keys: keys })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiError>(&body)
                .map(|e| e.error)
                .unwrap_or(body);
            return Err(FileServiceError::Api {
                status: status.as_u16(),
                message,
            });
        }

        debug!("UploadThing accepted deletion of {:?}", keys);
        info!("Deleted {} hosted file(s)", keys.len());
        Ok(())
    }
}
