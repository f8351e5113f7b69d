use crate::api::veo::{GeneratedVideo, JobHandle, OperationError, OperationStatus};
use crate::config::{BatchKind, GenerationParams, RunConfig};
use crate::frames::{FrameMode, FramePair, LastFrameExtractor, select_frames};
use crate::image_prep::{AspectRatio, prepare_image};
use crate::prompt::{ANGLES, STYLES, build_prompt};
use crate::{logi, logok, logw};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::{Instant, sleep};

#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    pub frames: FramePair,
    pub aspect: AspectRatio,
    pub params: GenerationParams,
}

#[async_trait]
pub trait VideoBackend: Send + Sync {
    async fn submit(&self, request: &GenerationRequest) -> Result<JobHandle>;
    async fn fetch(&self, job: &JobHandle) -> Result<OperationStatus>;
    async fn save(&self, video: &GeneratedVideo, dest: &Path) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct FlybyJob {
    pub image: PathBuf,
    pub video: Option<PathBuf>,
    pub prompt_add: Option<String>,
    pub mode: FrameMode,
}

/// Terminal state of one submitted job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Saved(PathBuf),
    Failed(OperationError),
    /// Finished with neither an error nor a video.
    NoResponse,
}

impl JobOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(self, JobOutcome::Saved(_))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub saved: Vec<PathBuf>,
    pub failed: usize,
    pub empty: usize,
}

impl BatchSummary {
    pub fn all_saved(&self) -> bool {
        self.failed == 0 && self.empty == 0
    }
}

/// Re-fetches `job` every `interval` until the service reports it done.
pub async fn poll_until_done(
    backend: &dyn VideoBackend,
    job: &JobHandle,
    interval: Duration,
) -> Result<OperationStatus> {
    let started = Instant::now();
    loop {
        let status = backend.fetch(job).await?;
        if status.done {
            logi(format!(
                "Job finished after {}s: {}",
                started.elapsed().as_secs(),
                job.name
            ));
            return Ok(status);
        }
        logi(format!(
            "Waiting ({}s elapsed, next check in {}s)",
            started.elapsed().as_secs(),
            interval.as_secs()
        ));
        sleep(interval).await;
    }
}

fn output_path_at(dir: &Path, now: DateTime<Local>) -> PathBuf {
    let stem = now.format("%Y-%m-%d_%H-%M-%S").to_string();
    let mut path = dir.join(format!("{}.mp4", stem));
    let mut n = 1;
    while path.exists() {
        path = dir.join(format!("{}_{}.mp4", stem, n));
        n += 1;
    }
    path
}

pub struct Generator<'a> {
    backend: &'a dyn VideoBackend,
    extractor: &'a dyn LastFrameExtractor,
    params: GenerationParams,
    output_dir: PathBuf,
    poll_interval: Duration,
}

impl<'a> Generator<'a> {
    pub fn new(
        backend: &'a dyn VideoBackend,
        extractor: &'a dyn LastFrameExtractor,
        params: GenerationParams,
        output_dir: impl Into<PathBuf>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            backend,
            extractor,
            params,
            output_dir: output_dir.into(),
            poll_interval,
        }
    }

    pub async fn generate_video(&self, job: &FlybyJob) -> Result<JobOutcome> {
        let prompt = build_prompt(job.prompt_add.as_deref());
        let prepared = prepare_image(&job.image).await?;
        let frames =
            select_frames(job.mode, &prepared, job.video.as_deref(), self.extractor).await?;

        let request = GenerationRequest {
            prompt,
            frames,
            aspect: prepared.aspect,
            params: self.params.clone(),
        };

        logi(format!(
            "Submitting {} ({}, mode {})",
            job.image.display(),
            request.aspect.as_str(),
            job.mode
        ));
        let handle = self.backend.submit(&request).await?;
        let status = poll_until_done(self.backend, &handle, self.poll_interval).await?;
        self.finish(status).await
    }

    async fn finish(&self, status: OperationStatus) -> Result<JobOutcome> {
        if let Some(err) = status.error {
            logw(format!("Video generation errored: {}", err));
            return Ok(JobOutcome::Failed(err));
        }

        let Some(response) = status.response else {
            logw("Operation finished but returned no response");
            return Ok(JobOutcome::NoResponse);
        };
        if response.rai_media_filtered_count > 0 {
            logw(format!(
                "{} video(s) withheld by safety filters: {}",
                response.rai_media_filtered_count,
                response.rai_media_filtered_reasons.join("; ")
            ));
        }
        let Some(video) = response.videos.first() else {
            logw("Operation finished but returned no videos");
            return Ok(JobOutcome::NoResponse);
        };

        let dest = output_path_at(&self.output_dir, Local::now());
        self.backend.save(video, &dest).await?;
        logok(format!("Generated video saved to {}", dest.display()));
        Ok(JobOutcome::Saved(dest))
    }

    /// Runs jobs one after another. With `chain`, each video-based job continues
    /// from the most recent clip saved so far; a failed or empty job leaves that
    /// link in place.
    pub async fn run_batch(&self, jobs: Vec<FlybyJob>, chain: bool) -> Result<BatchSummary> {
        let mut summary = BatchSummary::default();
        let mut previous: Option<PathBuf> = None;
        let total = jobs.len();

        for (idx, mut job) in jobs.into_iter().enumerate() {
            if chain && job.mode.needs_video() {
                if let Some(prev) = &previous {
                    job.video = Some(prev.clone());
                }
            }
            logi(format!("=== Job {}/{} ===", idx + 1, total));
            match self.generate_video(&job).await? {
                JobOutcome::Saved(path) => {
                    previous = Some(path.clone());
                    summary.saved.push(path);
                }
                JobOutcome::Failed(_) => summary.failed += 1,
                JobOutcome::NoResponse => summary.empty += 1,
            }
        }

        logi(format!(
            "All done. Saved: {}, failed: {}, empty: {}",
            summary.saved.len(),
            summary.failed,
            summary.empty
        ));
        Ok(summary)
    }
}

/// Expands the run section into the list of jobs for one invocation.
pub fn plan_jobs(run: &RunConfig, mode: FrameMode) -> Result<Vec<FlybyJob>> {
    let image = run.image_path()?.to_path_buf();
    let job = |prompt_add: Option<String>| FlybyJob {
        image: image.clone(),
        video: run.video.clone(),
        prompt_add,
        mode,
    };

    let jobs = match run.batch {
        BatchKind::Single => vec![job(run.prompt_add.clone())],
        BatchKind::Styles => STYLES.iter().map(|s| job(Some(s.to_string()))).collect(),
        BatchKind::Angles => ANGLES.iter().map(|a| job(a.map(str::to_string))).collect(),
    };
    Ok(jobs)
}
