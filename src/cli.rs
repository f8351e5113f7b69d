use anyhow::Result;
use std::path::PathBuf;
use tree_flyby::ffmpeg::{CHAINED_CLIP_SECONDS, concat_with_trimmed_tail, ffprobe_duration_seconds};
use tree_flyby::init;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args: Vec<PathBuf> = std::env::args().skip(1).map(PathBuf::from).collect();
    let [first, second, output] = args.as_slice() else {
        eprintln!("usage: flyby-concat <first.mp4> <second.mp4> <output.mp4>");
        std::process::exit(2);
    };

    if !init::check_ffmpeg().await {
        anyhow::bail!("FFmpeg/ffprobe not found in PATH. Please install FFmpeg.");
    }

    tracing::info!(
        "Appending first {:.1}s of {} to {}",
        CHAINED_CLIP_SECONDS,
        second.display(),
        first.display()
    );
    if !concat_with_trimmed_tail(first, second, output).await? {
        anyhow::bail!("Concat produced no output: {}", output.display());
    }

    let duration = ffprobe_duration_seconds(output).await?;
    tracing::info!("Wrote {} ({:.2}s)", output.display(), duration);
    Ok(())
}
