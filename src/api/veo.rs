use crate::FlybyError;
use crate::api::auth::{ServiceAccountKey, TokenSource};
use crate::config::Config;
use crate::frames::FrameImage;
use crate::generator::{GenerationRequest, VideoBackend};
use crate::{logi, logw};
use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;
use tokio::fs;

const API_TIMEOUT: Duration = Duration::from_secs(120);
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(600);

// --- request wire format ---

#[derive(Debug, Serialize)]
struct PredictRequest<'a> {
    instances: Vec<Instance<'a>>,
    parameters: Parameters<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Instance<'a> {
    prompt: &'a str,
    image: InlineImage<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_frame: Option<InlineImage<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineImage<'a> {
    bytes_base64_encoded: String,
    mime_type: &'a str,
}

impl<'a> From<&'a FrameImage> for InlineImage<'a> {
    fn from(frame: &'a FrameImage) -> Self {
        Self {
            bytes_base64_encoded: STANDARD.encode(&frame.bytes),
            mime_type: &frame.mime_type,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Parameters<'a> {
    aspect_ratio: &'a str,
    duration_seconds: u32,
    generate_audio: bool,
    negative_prompt: &'a str,
    resolution: &'a str,
    fps: u32,
    enhance_prompt: bool,
    compression_quality: &'a str,
    sample_count: u32,
}

fn predict_request(req: &GenerationRequest) -> PredictRequest<'_> {
    let params = &req.params;
    PredictRequest {
        instances: vec![Instance {
            prompt: &req.prompt,
            image: InlineImage::from(&req.frames.first),
            last_frame: req.frames.last.as_ref().map(InlineImage::from),
        }],
        parameters: Parameters {
            aspect_ratio: req.aspect.as_str(),
            duration_seconds: params.duration_seconds,
            generate_audio: params.generate_audio,
            negative_prompt: &params.negative_prompt,
            resolution: &params.resolution,
            fps: params.fps,
            enhance_prompt: params.enhance_prompt,
            compression_quality: &params.compression_quality,
            sample_count: params.sample_count,
        },
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FetchOperationRequest<'a> {
    operation_name: &'a str,
}

// --- response wire format ---

/// Long-running operation name returned on submit.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct JobHandle {
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OperationStatus {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub error: Option<OperationError>,
    #[serde(default)]
    pub response: Option<VideoResponse>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct OperationError {
    #[serde(default)]
    pub code: i32,
    #[serde(default)]
    pub message: String,
}

impl fmt::Display for OperationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(code {}) {}", self.code, self.message)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoResponse {
    #[serde(default)]
    pub videos: Vec<GeneratedVideo>,
    #[serde(default)]
    pub rai_media_filtered_count: u32,
    #[serde(default)]
    pub rai_media_filtered_reasons: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedVideo {
    #[serde(default)]
    pub gcs_uri: Option<String>,
    #[serde(default)]
    pub bytes_base64_encoded: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
}

fn parse_gcs_uri(uri: &str) -> Option<(&str, &str)> {
    let rest = uri.strip_prefix("gs://")?;
    let (bucket, object) = rest.split_once('/')?;
    if bucket.is_empty() || object.is_empty() {
        return None;
    }
    Some((bucket, object))
}

fn url_encode_component(input: &str) -> String {
    let mut out = String::new();
    for b in input.bytes() {
        if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b'~') {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{:02X}", b));
        }
    }
    out
}

fn gcs_media_url(bucket: &str, object: &str) -> String {
    format!(
        "https://storage.googleapis.com/storage/v1/b/{}/o/{}?alt=media",
        url_encode_component(bucket),
        url_encode_component(object)
    )
}

pub struct VeoClient {
    http: Client,
    tokens: TokenSource,
    model_url: String,
}

impl VeoClient {
    pub fn new(cfg: &Config, key: ServiceAccountKey) -> Result<Self> {
        let http = Client::builder()
            .build()
            .context("Failed to build HTTP client")?;
        let model_url = format!(
            "https://{loc}-aiplatform.googleapis.com/v1/projects/{project}/locations/{loc}/publishers/google/models/{model}",
            loc = cfg.location,
            project = cfg.project,
            model = cfg.model,
        );
        Ok(Self {
            tokens: TokenSource::new(key, http.clone()),
            http,
            model_url,
        })
    }

    /// Forces a token exchange so bad credentials fail before any job work.
    pub async fn authenticate(&self) -> Result<()> {
        self.tokens.token().await?;
        Ok(())
    }

    async fn post_json<T: Serialize + ?Sized>(&self, url: &str, body: &T) -> Result<String> {
        let token = self.tokens.token().await?;
        let resp = self
            .http
            .post(url)
            .bearer_auth(token)
            .json(body)
            .timeout(API_TIMEOUT)
            .send()
            .await
            .with_context(|| format!("Veo request failed: {}", url))?;
        success_body(resp).await
    }
}

/// Body text of a 2xx response; anything else becomes `FlybyError::Api`.
async fn success_body(resp: Response) -> Result<String> {
    let status = resp.status();
    let raw = resp.text().await.unwrap_or_default();
    if !status.is_success() {
        let snippet = raw.chars().take(800).collect::<String>();
        return Err(FlybyError::Api {
            status: status.as_u16(),
            body: snippet,
        }
        .into());
    }
    Ok(raw)
}

#[async_trait]
impl VideoBackend for VeoClient {
    async fn submit(&self, request: &GenerationRequest) -> Result<JobHandle> {
        let url = format!("{}:predictLongRunning", self.model_url);
        let raw = self.post_json(&url, &predict_request(request)).await?;
        let handle: JobHandle =
            serde_json::from_str(&raw).context("predictLongRunning response parse failed")?;
        logi(format!("Job submitted: {}", handle.name));
        Ok(handle)
    }

    async fn fetch(&self, job: &JobHandle) -> Result<OperationStatus> {
        let url = format!("{}:fetchPredictOperation", self.model_url);
        let body = FetchOperationRequest {
            operation_name: &job.name,
        };
        let raw = self.post_json(&url, &body).await?;
        serde_json::from_str(&raw).context("fetchPredictOperation response parse failed")
    }

    async fn save(&self, video: &GeneratedVideo, dest: &Path) -> Result<()> {
        let bytes = if let Some(encoded) = &video.bytes_base64_encoded {
            STANDARD
                .decode(encoded.as_bytes())
                .context("Generated video is not valid base64")?
        } else if let Some(uri) = &video.gcs_uri {
            let (bucket, object) = parse_gcs_uri(uri)
                .ok_or_else(|| anyhow::anyhow!("Malformed storage URI: {}", uri))?;
            let token = self.tokens.token().await?;
            let resp = self
                .http
                .get(gcs_media_url(bucket, object))
                .bearer_auth(token)
                .timeout(DOWNLOAD_TIMEOUT)
                .send()
                .await
                .context("Cloud Storage download failed")?;
            if !resp.status().is_success() {
                let code = resp.status().as_u16();
                logw(format!("Cloud Storage download HTTP {} for {}", code, uri));
                return Err(FlybyError::Api {
                    status: code,
                    body: uri.clone(),
                }
                .into());
            }
            resp.bytes().await.context("Cloud Storage response read failed")?.to_vec()
        } else {
            return Err(FlybyError::MissingVideoPayload.into());
        };

        if let Some(parent) = dest.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("Failed to create dir {}", parent.display()))?;
            }
        }
        fs::write(dest, &bytes)
            .await
            .with_context(|| format!("Failed to write {}", dest.display()))?;
        Ok(())
    }
}
