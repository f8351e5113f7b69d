use crate::FlybyError;
use crate::ffmpeg;
use crate::image_prep::PreparedImage;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tokio::fs;

/// Which stills are sent as the first and last frame of a clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameMode {
    /// Cropped image as first frame, no last frame.
    Default,
    /// Cropped image as both first and last frame.
    Loop,
    /// Last frame of a previous clip as first frame.
    Continue,
    /// Last frame of a previous clip as first frame, cropped image as last.
    ContinueToImage,
}

impl FrameMode {
    pub fn selector(self) -> u8 {
        match self {
            FrameMode::Default => 0,
            FrameMode::Loop => 1,
            FrameMode::Continue => 2,
            FrameMode::ContinueToImage => 3,
        }
    }

    pub fn needs_video(self) -> bool {
        matches!(self, FrameMode::Continue | FrameMode::ContinueToImage)
    }
}

impl FromStr for FrameMode {
    type Err = FlybyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" | "0" => Ok(FrameMode::Default),
            "1" => Ok(FrameMode::Loop),
            "2" => Ok(FrameMode::Continue),
            "3" => Ok(FrameMode::ContinueToImage),
            other => Err(FlybyError::InvalidMode(other.to_string())),
        }
    }
}

impl fmt::Display for FrameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FrameMode::Default => "image to video",
            FrameMode::Loop => "image as first and last frame",
            FrameMode::Continue => "continue from video",
            FrameMode::ContinueToImage => "continue from video back to image",
        };
        write!(f, "{} ({})", self.selector(), label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl FrameImage {
    pub fn png(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            mime_type: "image/png".to_string(),
        }
    }

    pub async fn from_file(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)
            .await
            .with_context(|| format!("Failed to read frame {}", path.display()))?;
        let format = image::ImageFormat::from_path(path)
            .or_else(|_| image::guess_format(&bytes))
            .with_context(|| format!("Unrecognised image format: {}", path.display()))?;
        Ok(Self {
            bytes,
            mime_type: format.to_mime_type().to_string(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct FramePair {
    pub first: FrameImage,
    pub last: Option<FrameImage>,
}

#[async_trait]
pub trait LastFrameExtractor: Send + Sync {
    async fn last_frame(&self, video: &Path) -> Result<FrameImage>;
}

/// Pulls the final frame with ffprobe/ffmpeg.
#[derive(Debug, Default, Clone, Copy)]
pub struct FfmpegFrameExtractor;

#[async_trait]
impl LastFrameExtractor for FfmpegFrameExtractor {
    async fn last_frame(&self, video: &Path) -> Result<FrameImage> {
        let png = ffmpeg::extract_last_frame_png(video).await?;
        Ok(FrameImage::png(png))
    }
}

pub async fn select_frames(
    mode: FrameMode,
    prepared: &PreparedImage,
    video: Option<&Path>,
    extractor: &dyn LastFrameExtractor,
) -> Result<FramePair> {
    let cropped = FrameImage::from_file(&prepared.path).await?;

    let video_last = if mode.needs_video() {
        let video = video.ok_or(FlybyError::MissingVideo(mode.selector()))?;
        Some(
            extractor
                .last_frame(video)
                .await
                .with_context(|| format!("Failed to take last frame of {}", video.display()))?,
        )
    } else {
        None
    };

    let pair = match (mode, video_last) {
        (FrameMode::Default, _) => FramePair { first: cropped, last: None },
        (FrameMode::Loop, _) => FramePair {
            first: cropped.clone(),
            last: Some(cropped),
        },
        (FrameMode::Continue, Some(tail)) => FramePair { first: tail, last: None },
        (FrameMode::ContinueToImage, Some(tail)) => FramePair {
            first: tail,
            last: Some(cropped),
        },
        (FrameMode::Continue | FrameMode::ContinueToImage, None) => {
            return Err(FlybyError::MissingVideo(mode.selector()).into());
        }
    };
    Ok(pair)
}
