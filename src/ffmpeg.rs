use crate::FlybyError;
use crate::{logi, logw};
use anyhow::{Context, Result};
use std::path::Path;
use tokio::fs;
use tokio::process::Command;

/// Seconds of the second clip kept when chaining two clips.
pub const CHAINED_CLIP_SECONDS: f64 = 7.5;

async fn run_cmd(args: &[String]) -> Result<()> {
    if args.is_empty() {
        return Ok(());
    }

    let mut cmd = Command::new(&args[0]);
    if args.len() > 1 {
        cmd.args(&args[1..]);
    }

    let status = cmd.status().await.context("Command execution failed")?;
    if !status.success() {
        return Err(anyhow::anyhow!("Command failed: {:?}", args));
    }

    Ok(())
}

async fn ffprobe_value(path: &Path, args: &[&str]) -> Result<String> {
    let output = Command::new("ffprobe")
        .args(["-v", "error"])
        .args(args)
        .arg(path)
        .output()
        .await
        .context("ffprobe execution failed")?;

    if !output.status.success() {
        return Err(anyhow::anyhow!(
            "ffprobe failed on {}: {}",
            path.display(),
            String::from_utf8_lossy(&output.stderr).trim()
        ));
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

pub async fn ffprobe_duration_seconds(path: &Path) -> Result<f64> {
    let text = ffprobe_value(
        path,
        &[
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ],
    )
    .await?;

    let duration = text.parse::<f64>().unwrap_or(-1.0);
    if duration <= 0.0 {
        return Err(anyhow::anyhow!("Invalid duration"));
    }
    Ok(duration)
}

pub async fn ffprobe_frame_count(path: &Path) -> Result<u64> {
    let text = ffprobe_value(
        path,
        &[
            "-select_streams",
            "v:0",
            "-count_packets",
            "-show_entries",
            "stream=nb_read_packets",
            "-of",
            "csv=p=0",
        ],
    )
    .await?;

    // No video stream prints nothing.
    Ok(text.lines().next().and_then(|v| v.trim().parse::<u64>().ok()).unwrap_or(0))
}

pub async fn ffprobe_has_audio(path: &Path) -> Result<bool> {
    let text = ffprobe_value(
        path,
        &[
            "-select_streams",
            "a:0",
            "-show_entries",
            "stream=codec_type",
            "-of",
            "csv=p=0",
        ],
    )
    .await?;
    Ok(!text.is_empty())
}

/// Encodes the final frame of `video` as PNG bytes.
pub async fn extract_last_frame_png(video: &Path) -> Result<Vec<u8>> {
    let frames = ffprobe_frame_count(video).await?;
    if frames == 0 {
        return Err(FlybyError::EmptyVideo(video.display().to_string()).into());
    }

    let scratch = tempfile::tempdir().context("Failed to create scratch dir")?;
    let out_png = scratch.path().join("last_frame.png");

    let args = vec![
        "ffmpeg".to_string(),
        "-y".to_string(),
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-i".to_string(),
        video.display().to_string(),
        "-vf".to_string(),
        format!("select=eq(n\\,{})", frames - 1),
        "-vsync".to_string(),
        "0".to_string(),
        "-frames:v".to_string(),
        "1".to_string(),
        out_png.display().to_string(),
    ];
    run_cmd(&args).await?;

    if !out_png.exists() {
        // Packet count can overshoot the decodable frames; keep the last one decoded near the end.
        logw(format!(
            "Frame {} of {} did not decode; falling back to tail scan",
            frames - 1,
            video.display()
        ));
        let args = vec![
            "ffmpeg".to_string(),
            "-y".to_string(),
            "-hide_banner".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            "-sseof".to_string(),
            "-1".to_string(),
            "-i".to_string(),
            video.display().to_string(),
            "-update".to_string(),
            "1".to_string(),
            out_png.display().to_string(),
        ];
        run_cmd(&args).await?;
    }

    let bytes = match fs::read(&out_png).await {
        Ok(bytes) if !bytes.is_empty() => bytes,
        _ => return Err(FlybyError::EmptyVideo(video.display().to_string()).into()),
    };
    logi(format!(
        "Extracted last frame (#{}) from {}",
        frames - 1,
        video.display()
    ));
    Ok(bytes)
}

fn concat_filter(with_audio: bool) -> String {
    let keep = format!("{:.3}", CHAINED_CLIP_SECONDS);
    let video = format!(
        "[0:v]setpts=PTS-STARTPTS[v0];[1:v]trim=duration={keep},setpts=PTS-STARTPTS[v1];"
    );
    if with_audio {
        format!(
            "{video}[0:a]asetpts=PTS-STARTPTS[a0];\
             [1:a]atrim=duration={keep},asetpts=PTS-STARTPTS[a1];\
             [v0][a0][v1][a1]concat=n=2:v=1:a=1[v][a]"
        )
    } else {
        format!("{video}[v0][v1]concat=n=2:v=1:a=0[v]")
    }
}

/// Writes `first` followed by the opening seconds of `second` to `out_mp4`.
/// Audio is carried over only when both clips have an audio stream.
pub async fn concat_with_trimmed_tail(
    first: &Path,
    second: &Path,
    out_mp4: &Path,
) -> Result<bool> {
    for input in [first, second] {
        if !input.exists() {
            return Err(anyhow::anyhow!("Input video not found: {}", input.display()));
        }
    }

    let first_audio = ffprobe_has_audio(first).await?;
    let second_audio = ffprobe_has_audio(second).await?;
    let with_audio = first_audio && second_audio;
    if first_audio != second_audio {
        logw("Only one clip has audio; writing a silent concat");
    }

    let mut args = vec![
        "ffmpeg".to_string(),
        "-y".to_string(),
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-i".to_string(),
        first.display().to_string(),
        "-i".to_string(),
        second.display().to_string(),
        "-filter_complex".to_string(),
        concat_filter(with_audio),
        "-map".to_string(),
        "[v]".to_string(),
    ];
    if with_audio {
        args.extend([
            "-map".to_string(),
            "[a]".to_string(),
            "-c:a".to_string(),
            "aac".to_string(),
            "-b:a".to_string(),
            "192k".to_string(),
        ]);
    }
    args.extend([
        "-c:v".to_string(),
        "libx264".to_string(),
        "-pix_fmt".to_string(),
        "yuv420p".to_string(),
        "-preset".to_string(),
        "veryfast".to_string(),
        "-crf".to_string(),
        "22".to_string(),
        "-movflags".to_string(),
        "+faststart".to_string(),
        out_mp4.display().to_string(),
    ]);

    run_cmd(&args).await?;
    Ok(out_mp4.exists())
}
