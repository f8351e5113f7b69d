use thiserror::Error;

#[derive(Debug, Error)]
pub enum FlybyError {
    #[error("unknown generation mode {0:?} (expected blank, 0, 1, 2 or 3)")]
    InvalidMode(String),

    #[error("mode {0} needs a source video but none was given")]
    MissingVideo(u8),

    #[error("video has no decodable frames: {0}")]
    EmptyVideo(String),

    #[error("crop of {width}x{height} image collapses to zero pixels")]
    DegenerateCrop { width: u32, height: u32 },

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("API returned HTTP {status}: {body}")]
    Api { status: u16, body: String },

    #[error("generated video carries neither inline bytes nor a storage URI")]
    MissingVideoPayload,
}
