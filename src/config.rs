use crate::frames::FrameMode;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_credentials_file")]
    pub credentials_file: PathBuf,
    pub project: String,
    #[serde(default = "default_location")]
    pub location: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default)]
    pub generation: GenerationParams,
    #[serde(default)]
    pub run: RunConfig,
}

/// Fixed per-request knobs sent with every job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationParams {
    pub duration_seconds: u32,
    pub resolution: String,
    pub fps: u32,
    pub generate_audio: bool,
    pub negative_prompt: String,
    pub enhance_prompt: bool,
    pub compression_quality: String,
    pub sample_count: u32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            duration_seconds: 8,
            resolution: "1080p".to_string(),
            fps: 24,
            generate_audio: false,
            negative_prompt: "drones".to_string(),
            enhance_prompt: true,
            compression_quality: "optimized".to_string(),
            sample_count: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchKind {
    #[default]
    Single,
    Styles,
    Angles,
}

/// What the `tree-flyby` binary should generate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub image: Option<PathBuf>,
    pub video: Option<PathBuf>,
    /// Selector string ("", "0".."3"). Absent means ask on the console.
    pub mode: Option<String>,
    pub prompt_add: Option<String>,
    pub batch: BatchKind,
    /// Feed each saved clip into the next video-based job.
    pub chain: bool,
}

impl RunConfig {
    pub fn image_path(&self) -> Result<&Path> {
        match &self.image {
            Some(image) => Ok(image.as_path()),
            None => anyhow::bail!("config.json: run.image missing"),
        }
    }
}

fn default_credentials_file() -> PathBuf {
    PathBuf::from("service_account_file.json")
}

fn default_location() -> String {
    "us-central1".to_string()
}

fn default_model() -> String {
    "veo-3.1-generate-preview".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_poll_interval_secs() -> u64 {
    10
}

impl Config {
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read config: {}", path.as_ref().display()))?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let config: Config =
            serde_json::from_str(content).context("config.json: invalid JSON")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.project.trim().is_empty() {
            anyhow::bail!("config.json: project missing");
        }
        if self.location.trim().is_empty() {
            anyhow::bail!("config.json: location missing");
        }
        if self.model.trim().is_empty() {
            anyhow::bail!("config.json: model missing");
        }
        if self.poll_interval_secs == 0 {
            anyhow::bail!("config.json: poll_interval_secs must be positive");
        }
        if self.generation.duration_seconds == 0 {
            anyhow::bail!("config.json: generation.duration_seconds must be positive");
        }
        if let Some(mode) = &self.run.mode {
            mode.parse::<FrameMode>()?;
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.poll_interval_secs)
    }
}
