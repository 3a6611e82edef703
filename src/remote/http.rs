use std::time::Duration;

use bytes::Bytes;
use reqwest::{StatusCode, multipart};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::{debug, info, warn};
use url::Url;

use crate::{ingest::RawFile, record::Record};

use super::{
    ArchiveStats, ArchivedFile, GenerationOptions, GenerationResult, GenerationService,
    Reachability, RemoteError,
};

/// Client for the HTTP API of the barcode generation service.
pub struct HttpClient {
    base: Url,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    data: &'a [Record],
    #[serde(flatten)]
    options: &'a GenerationOptions,
}

#[derive(Deserialize)]
struct FilesResponse {
    #[serde(default)]
    files: Vec<ArchivedFile>,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(alias = "message")]
    error: String,
}

impl HttpClient {
    pub fn new(base: Url, timeout: Duration) -> Result<Self, RemoteError> {
        if base.cannot_be_a_base() {
            return Err(RemoteError::Unreachable(format!("invalid endpoint: {base}")));
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| RemoteError::Unreachable(error.to_string()))?;
        Ok(Self { base, client })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn get_bytes(&self, url: Url) -> Result<Bytes, RemoteError> {
        debug!(%url, "download");
        let response = self.client.get(url).send().await?;
        let response = check_status(response).await?;
        Ok(response.bytes().await?)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, RemoteError> {
        let response = self.client.get(url).send().await?;
        read_json(check_status(response).await?).await
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, RemoteError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let url = response.url().clone();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .map(|body| body.error)
        .unwrap_or(body);
    warn!(%url, %status, message, "service returned an error");
    if status == StatusCode::NOT_FOUND {
        Err(RemoteError::NotFound(url.path().to_owned()))
    } else {
        Err(RemoteError::BadStatus {
            status: status.as_u16(),
            message,
        })
    }
}

async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, RemoteError> {
    let body = response.bytes().await?;
    serde_json::from_slice(&body).map_err(|error| RemoteError::MalformedResponse(error.to_string()))
}

impl GenerationService for HttpClient {
    async fn submit_file(
        &self,
        file: &RawFile,
        options: &GenerationOptions,
    ) -> Result<GenerationResult, RemoteError> {
        let url = self.endpoint(&["api", "upload-and-generate"]);
        let content_type = file
            .content_type
            .as_ref()
            .map(|mime| mime.essence_str().to_owned())
            .unwrap_or_else(|| mime::APPLICATION_OCTET_STREAM.to_string());
        let part = multipart::Part::bytes(file.body.to_vec())
            .file_name(file.name.clone())
            .mime_str(&content_type)?;
        let form = multipart::Form::new()
            .part("file", part)
            .text("create_pdf", options.produce_archive.to_string())
            .text("grid_cols", options.grid_cols.to_string())
            .text("grid_rows", options.grid_rows.to_string())
            .text(
                "auto_generate_second_imei",
                options.derive_secondary.to_string(),
            );
        info!(%url, file = file.name, size = file.size(), ?options, "submit file");
        let response = self.client.post(url).multipart(form).send().await?;
        let result: GenerationResult = read_json(check_status(response).await?).await?;
        info!(
            artifacts = result.artifacts.len(),
            archive = result.archive,
            "generation finished"
        );
        Ok(result)
    }

    async fn submit_records(
        &self,
        records: &[Record],
        options: &GenerationOptions,
    ) -> Result<GenerationResult, RemoteError> {
        let url = self.endpoint(&["api", "generate"]);
        info!(%url, records = records.len(), ?options, "submit records");
        let response = self
            .client
            .post(url)
            .json(&GenerateRequest {
                data: records,
                options,
            })
            .send()
            .await?;
        let result: GenerationResult = read_json(check_status(response).await?).await?;
        info!(
            artifacts = result.artifacts.len(),
            archive = result.archive,
            "generation finished"
        );
        Ok(result)
    }

    async fn download_artifact(&self, id: &str) -> Result<Bytes, RemoteError> {
        self.get_bytes(self.endpoint(&["api", "download", id])).await
    }

    async fn download_archive(&self, id: &str) -> Result<Bytes, RemoteError> {
        self.get_bytes(self.endpoint(&["api", "download-pdf", id]))
            .await
    }

    async fn health(&self) -> Reachability {
        let url = self.endpoint(&["api", "health"]);
        let outcome = match self.client.get(url.clone()).send().await {
            Ok(response) => check_status(response).await.map(|_| ()),
            Err(error) => Err(error.into()),
        };
        match outcome {
            Ok(()) => Reachability::Reachable,
            Err(error) => {
                warn!(%url, %error, "health check failed");
                Reachability::Unreachable(error.to_string())
            }
        }
    }

    async fn list_files(&self) -> Result<Vec<ArchivedFile>, RemoteError> {
        let response: FilesResponse = self.get_json(self.endpoint(&["api", "files"])).await?;
        Ok(response.files)
    }

    async fn archive_stats(&self) -> Result<ArchiveStats, RemoteError> {
        self.get_json(self.endpoint(&["api", "archive", "stats"]))
            .await
    }
}
