//! HTTP client for the external posture analysis service.

use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde::Serialize;
use tracing::{debug, info};
use url::Url;

use super::types::{AnalysisResult, FrameAnalysis};
use crate::error::PostureProError;

/// Whole-file uploads can take a while for the service to process.
pub const VIDEO_TIMEOUT: Duration = Duration::from_secs(120);

pub const FRAME_TIMEOUT: Duration = Duration::from_secs(30);

pub const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// A video file handed over by the UI for whole-file analysis.
#[derive(Debug, Clone)]
pub struct VideoUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

/// Outcome of one health probe against the service.
#[derive(Debug, Clone, Serialize)]
pub struct ProbeResult {
    pub endpoint: String,
    pub reachable: bool,
    pub status_code: Option<u16>,
    /// Parsed JSON body when the endpoint returned one
    pub body: Option<serde_json::Value>,
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PostureApiClient {
    client: reqwest::Client,
    base_url: Url,
    frame_timeout: Duration,
}

impl PostureApiClient {
    pub fn new(base_url: &str) -> Result<Self, PostureProError> {
        let base_url = normalize_base_url(base_url)?;
        let client = reqwest::Client::builder()
            .user_agent("PosturePro/1.0")
            .build()
            .map_err(|e| PostureProError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            frame_timeout: FRAME_TIMEOUT,
        })
    }

    pub fn with_frame_timeout(mut self, timeout: Duration) -> Self {
        self.frame_timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, PostureProError> {
        self.base_url
            .join(path)
            .map_err(|e| PostureProError::Config(format!("Invalid endpoint '{}': {}", path, e)))
    }

    /// Upload a whole video to `/analyze`.
    pub async fn analyze_video(
        &self,
        video: VideoUpload,
    ) -> Result<Vec<AnalysisResult>, PostureProError> {
        let url = self.endpoint("analyze")?;
        info!(
            "Uploading '{}' ({} bytes) to {}",
            video.file_name,
            video.bytes.len(),
            url
        );

        let part = Part::bytes(video.bytes)
            .file_name(video.file_name)
            .mime_str(&video.mime_type)
            .map_err(|e| transport(&url, e))?;
        let form = Form::new().part("video", part);

        let response = self
            .client
            .post(url.clone())
            .multipart(form)
            .timeout(VIDEO_TIMEOUT)
            .send()
            .await
            .map_err(|e| transport(&url, e))?;

        decode_body(&url, response).await
    }

    /// Send one JPEG-encoded camera frame to `/analyze-frame`.
    pub async fn analyze_frame(&self, jpeg: Vec<u8>) -> Result<FrameAnalysis, PostureProError> {
        let url = self.endpoint("analyze-frame")?;
        debug!("Posting {} byte frame to {}", jpeg.len(), url);

        let part = Part::bytes(jpeg)
            .file_name("frame.jpg")
            .mime_str("image/jpeg")
            .map_err(|e| transport(&url, e))?;
        let form = Form::new().part("frame", part);

        let response = self
            .client
            .post(url.clone())
            .multipart(form)
            .timeout(self.frame_timeout)
            .send()
            .await
            .map_err(|e| transport(&url, e))?;

        decode_body(&url, response).await
    }

    /// GET `path` and report reachability. Never fails.
    pub async fn probe(&self, path: &str) -> ProbeResult {
        let endpoint = format!("/{}", path.trim_start_matches('/'));
        let url = match self.endpoint(path.trim_start_matches('/')) {
            Ok(url) => url,
            Err(e) => {
                return ProbeResult {
                    endpoint,
                    reachable: false,
                    status_code: None,
                    body: None,
                    error: Some(e.to_string()),
                }
            }
        };

        match self.client.get(url).timeout(PROBE_TIMEOUT).send().await {
            Ok(response) => {
                let status = response.status();
                let body = response
                    .bytes()
                    .await
                    .ok()
                    .and_then(|b| serde_json::from_slice(&b).ok());
                ProbeResult {
                    endpoint,
                    reachable: status == StatusCode::OK,
                    status_code: Some(status.as_u16()),
                    body,
                    error: None,
                }
            }
            Err(e) => ProbeResult {
                endpoint,
                reachable: false,
                status_code: None,
                body: None,
                error: Some(e.to_string()),
            },
        }
    }
}

/// Parse and validate a base URL, ensuring it joins as a directory.
pub fn normalize_base_url(raw: &str) -> Result<Url, PostureProError> {
    let trimmed = raw.trim();
    let with_slash = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{}/", trimmed)
    };

    let url = Url::parse(&with_slash)
        .map_err(|e| PostureProError::Config(format!("Invalid API base URL '{}': {}", raw, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(PostureProError::Config(format!(
            "Unsupported API URL scheme '{}' in '{}'",
            other, raw
        ))),
    }
}

fn transport(url: &Url, err: reqwest::Error) -> PostureProError {
    PostureProError::Transport {
        url: url.to_string(),
        message: err.to_string(),
    }
}

async fn decode_body<T>(url: &Url, response: reqwest::Response) -> Result<T, PostureProError>
where
    T: serde::de::DeserializeOwned,
{
    let status = response.status();
    if status != StatusCode::OK {
        return Err(PostureProError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let body = response.bytes().await.map_err(|e| transport(url, e))?;
    serde_json::from_slice(&body).map_err(|e| PostureProError::Decode {
        url: url.to_string(),
        message: e.to_string(),
    })
}
