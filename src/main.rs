use anyhow::{Context, Result};
use std::io::{self, BufRead, Write};
use std::path::Path;
use tree_flyby::api::auth::ServiceAccountKey;
use tree_flyby::api::veo::VeoClient;
use tree_flyby::config::Config;
use tree_flyby::frames::{FfmpegFrameExtractor, FrameMode};
use tree_flyby::generator::{Generator, plan_jobs};
use tree_flyby::init;

fn ask_for_mode(image: &Path, video: Option<&Path>) -> Result<FrameMode> {
    let image = image.display();
    let video = video
        .map(|v| v.display().to_string())
        .unwrap_or_else(|| "<no video configured>".to_string());

    print!(
        "Video generation options:\n\
         ( ) Uses {image} in default image - video gen\n\
         (1) Uses {image} as both first and last frame\n\
         (2) Uses last frame of {video} as first frame\n\
         (3) Does (2), then uses {image} as last frame\n> "
    );
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read mode from console")?;
    Ok(line.parse()?)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.json".to_string());
    let cfg = Config::load(&config_path).await?;
    let image = cfg.run.image_path()?.to_path_buf();

    init::ensure_output_dir(&cfg.output_dir).await?;
    if !init::check_ffmpeg().await {
        tracing::warn!("FFmpeg/ffprobe not found in PATH; modes 2 and 3 will fail.");
    }

    let key = ServiceAccountKey::load(&cfg.credentials_file).await?;
    let client = VeoClient::new(&cfg, key)?;
    client.authenticate().await?;

    let mode = match &cfg.run.mode {
        Some(selector) => selector.parse::<FrameMode>()?,
        None => {
            let video = cfg.run.video.clone();
            tokio::task::spawn_blocking(move || ask_for_mode(&image, video.as_deref()))
                .await
                .context("Console prompt task panicked")??
        }
    };

    let jobs = plan_jobs(&cfg.run, mode)?;
    let extractor = FfmpegFrameExtractor;
    let generator = Generator::new(
        &client,
        &extractor,
        cfg.generation.clone(),
        cfg.output_dir.clone(),
        cfg.poll_interval(),
    );

    let summary = generator.run_batch(jobs, cfg.run.chain).await?;
    std::process::exit(if summary.all_saved() { 0 } else { 1 });
}
