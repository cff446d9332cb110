use anyhow::{Context, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::compositor::{composite_async, CompositingConfig};
use crate::error::{BatchError, CompositeError, GenerationError};
use crate::generation::ImageGenerator;
use crate::image_data::EncodedImage;
use crate::logo::{LogoSettings, SharedLogoSettings};
use crate::prompts::PromptList;
use crate::state::{BatchEvent, BatchOutcome, BatchReport, BatchStatus, GenerationJob};

/// Sequential batch runner.
///
/// Sends one prompt at a time to the generator, composites the configured
/// logo onto each result and reports progress as [`BatchEvent`]s. There is
/// never more than one generation call in flight. A stop request is honored
/// before the next job starts; the in-flight call is left to finish.
pub struct BatchRunner {
    generator: Arc<dyn ImageGenerator>,
    logo: SharedLogoSettings,
    compositing: CompositingConfig,
    cancel: Mutex<CancellationToken>,
    running: Arc<AtomicBool>,
}

/// Clears the running flag when the batch ends, however it ends
struct RunningGuard(Arc<AtomicBool>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Handle to a batch running on its own task
pub struct BatchHandle {
    events: mpsc::UnboundedReceiver<BatchEvent>,
    cancel: CancellationToken,
    task: JoinHandle<BatchReport>,
}

impl BatchHandle {
    /// Next progress event, `None` once the batch has ended and all events
    /// were consumed
    pub async fn next_event(&mut self) -> Option<BatchEvent> {
        self.events.recv().await
    }

    /// Request a cooperative stop of this batch
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Wait for the batch to end and return its report
    pub async fn wait(self) -> Result<BatchReport> {
        self.task.await.context("Batch task failed")
    }
}

impl BatchRunner {
    pub fn new(generator: Arc<dyn ImageGenerator>, logo: SharedLogoSettings) -> Self {
        Self {
            generator,
            logo,
            compositing: CompositingConfig::default(),
            cancel: Mutex::new(CancellationToken::new()),
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_compositing(mut self, compositing: CompositingConfig) -> Self {
        self.compositing = compositing;
        self
    }

    /// Logo settings read by the runner; edits apply to jobs not yet started
    pub fn logo_settings(&self) -> SharedLogoSettings {
        Arc::clone(&self.logo)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Request a stop of the current batch. Idempotent.
    ///
    /// No new job starts after this returns; a job whose generation call is
    /// already in flight still completes or fails normally.
    pub fn stop(&self) {
        let token = self.cancel.lock().unwrap_or_else(|e| e.into_inner());
        if !token.is_cancelled() {
            info!("🛑 Stop requested");
        }
        token.cancel();
    }

    /// Run a batch on the current task, sending progress to `events`.
    ///
    /// Dropped receivers are tolerated; the batch still runs to completion.
    pub async fn run_batch(
        &self,
        prompts: &PromptList,
        events: mpsc::UnboundedSender<BatchEvent>,
    ) -> Result<BatchReport, BatchError> {
        let (token, guard) = self.begin(prompts)?;
        Ok(self.execute(prompts, token, guard, events).await)
    }

    /// Spawn a batch on its own task and return a handle to it
    pub fn start_batch(self: &Arc<Self>, prompts: PromptList) -> Result<BatchHandle, BatchError> {
        let (token, guard) = self.begin(&prompts)?;
        let (tx, rx) = mpsc::unbounded_channel();

        let runner = Arc::clone(self);
        let cancel = token.clone();
        let task = tokio::spawn(async move { runner.execute(&prompts, token, guard, tx).await });

        Ok(BatchHandle {
            events: rx,
            cancel,
            task,
        })
    }

    /// Validate the request, claim the runner and arm a fresh stop token
    fn begin(&self, prompts: &PromptList) -> Result<(CancellationToken, RunningGuard), BatchError> {
        if prompts.is_empty() {
            return Err(BatchError::NoPrompts);
        }

        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(BatchError::AlreadyRunning);
        }
        let guard = RunningGuard(Arc::clone(&self.running));

        let token = CancellationToken::new();
        *self.cancel.lock().unwrap_or_else(|e| e.into_inner()) = token.clone();

        Ok((token, guard))
    }

    async fn execute(
        &self,
        prompts: &PromptList,
        token: CancellationToken,
        _guard: RunningGuard,
        events: mpsc::UnboundedSender<BatchEvent>,
    ) -> BatchReport {
        let emit = |event: BatchEvent| {
            let _ = events.send(event);
        };

        let batch_id = chrono::Utc::now().timestamp_millis();
        let mut jobs: Vec<GenerationJob> = prompts
            .iter()
            .enumerate()
            .map(|(index, prompt)| GenerationJob::new(format!("img-{}-{}", batch_id, index), prompt))
            .collect();
        let mut status = BatchStatus::new(jobs.len());

        info!("🚀 Starting batch of {} prompts", jobs.len());
        emit(BatchEvent::Started {
            status: status.clone(),
            jobs: jobs.clone(),
        });

        for index in 0..jobs.len() {
            if token.is_cancelled() {
                info!(
                    "🛑 Batch stopped before job {}/{}, {} left pending",
                    index + 1,
                    status.total,
                    status.total - index
                );
                break;
            }

            let prompt = jobs[index].prompt.clone();
            jobs[index].mark_generating();
            status.current = index + 1;
            status.current_prompt = Some(prompt.clone());
            emit(BatchEvent::JobUpdated(jobs[index].clone()));
            emit(BatchEvent::Progress(status.clone()));

            info!("🎨 Generating image {}/{}: {}", status.current, status.total, prompt);

            // Snapshot so that edits during this job only affect later jobs
            let logo = self.logo.read().await.clone();

            match self.process_job(&prompt, &logo).await {
                Ok(image_url) => {
                    jobs[index].mark_completed(image_url);
                    status.completed += 1;
                    info!("✅ Completed {}/{}", status.current, status.total);
                }
                Err(e) => {
                    warn!("❌ Failed {}/{}: {:#}", status.current, status.total, e);
                    jobs[index].mark_failed(e.to_string());
                    status.failed += 1;
                }
            }

            emit(BatchEvent::JobUpdated(jobs[index].clone()));
            emit(BatchEvent::Progress(status.clone()));
        }

        let outcome = if token.is_cancelled() {
            emit(BatchEvent::Stopped(status.clone()));
            BatchOutcome::Stopped
        } else {
            emit(BatchEvent::Finished(status.clone()));
            BatchOutcome::Finished
        };

        info!(
            "🎉 Batch {:?}: {} completed, {} failed, {} total",
            outcome, status.completed, status.failed, status.total
        );

        BatchReport {
            outcome,
            status,
            jobs,
        }
    }

    /// Generate one image and apply the logo; returns the final data URI
    async fn process_job(&self, prompt: &str, logo: &LogoSettings) -> Result<String> {
        let generated = self.generator.generate(prompt).await?;
        if generated.is_empty() {
            return Err(GenerationError::MissingImage.into());
        }
        debug!("Received {} bytes of {}", generated.len(), generated.mime_type);

        if image::guess_format(&generated.data).is_err() {
            return Err(GenerationError::InvalidPayload("unrecognised image format".to_string()).into());
        }

        let finished = apply_logo(generated, logo, &self.compositing).await?;
        Ok(finished.to_data_uri())
    }
}

/// Post-process a generated image with the configured logo.
///
/// Without a logo the image is returned untouched. A logo that is not a
/// valid data URI is treated like an undecodable logo and skipped.
pub async fn apply_logo(
    generated: EncodedImage,
    logo: &LogoSettings,
    compositing: &CompositingConfig,
) -> Result<EncodedImage, CompositeError> {
    if !logo.is_enabled() {
        return Ok(generated);
    }

    let logo_image = match EncodedImage::from_data_uri(&logo.url) {
        Ok(image) => image,
        Err(e) => {
            warn!("Logo is not a usable data URI, keeping original image: {}", e);
            return Ok(generated);
        }
    };

    debug!("Compositing logo at {} ({}%, {}% opacity)", logo.position, logo.size, logo.opacity);
    let options = logo.composite_options(compositing.padding_percent, compositing.badge);
    composite_async(generated, logo_image, options).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::GeneratorProvider;
    use crate::state::JobStatus;
    use async_trait::async_trait;
    use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
    use std::collections::{HashMap, HashSet};
    use std::io::Cursor;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;
    use tokio::sync::Notify;

    fn solid_png(width: u32, height: u32, color: [u8; 4]) -> EncodedImage {
        let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba(color)));
        let mut bytes = Vec::new();
        image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png).unwrap();
        EncodedImage::png(bytes)
    }

    /// Generator returning a fixed image, failing for selected prompts and
    /// optionally parking on one prompt until released
    struct StubGenerator {
        image: EncodedImage,
        fail_on: HashSet<String>,
        gate_on: Option<String>,
        release: Notify,
        calls: Mutex<Vec<String>>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl StubGenerator {
        fn new() -> Self {
            Self {
                image: solid_png(64, 48, [0, 0, 255, 255]),
                fail_on: HashSet::new(),
                gate_on: None,
                release: Notify::new(),
                calls: Mutex::new(Vec::new()),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            }
        }

        fn failing_on(mut self, prompt: &str) -> Self {
            self.fail_on.insert(prompt.to_string());
            self
        }

        fn gated_on(mut self, prompt: &str) -> Self {
            self.gate_on = Some(prompt.to_string());
            self
        }

        fn returning(mut self, image: EncodedImage) -> Self {
            self.image = image;
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ImageGenerator for StubGenerator {
        async fn generate(&self, prompt: &str) -> Result<EncodedImage, GenerationError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            self.calls.lock().unwrap().push(prompt.to_string());

            if self.gate_on.as_deref() == Some(prompt) {
                self.release.notified().await;
            } else {
                tokio::time::sleep(Duration::from_millis(2)).await;
            }

            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.fail_on.contains(prompt) {
                return Err(GenerationError::Status {
                    status: 500,
                    body: "simulated failure".to_string(),
                });
            }
            Ok(self.image.clone())
        }

        fn provider_type(&self) -> GeneratorProvider {
            GeneratorProvider::Http
        }
    }

    fn runner_with(generator: Arc<StubGenerator>, logo: LogoSettings) -> Arc<BatchRunner> {
        Arc::new(BatchRunner::new(generator, logo.into_shared()))
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<BatchEvent>) -> Vec<BatchEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn logo_data_uri() -> String {
        solid_png(10, 10, [255, 0, 0, 255]).to_data_uri()
    }

    async fn wait_until_generating(handle: &mut BatchHandle, prompt: &str) -> Vec<BatchEvent> {
        let mut seen = Vec::new();
        while let Some(event) = handle.next_event().await {
            let reached = matches!(
                &event,
                BatchEvent::JobUpdated(job) if job.prompt == prompt && job.status == JobStatus::Generating
            );
            seen.push(event);
            if reached {
                return seen;
            }
        }
        panic!("batch ended before '{}' started", prompt);
    }

    #[tokio::test]
    async fn test_scenario_one_failure_in_three() {
        let generator = Arc::new(StubGenerator::new().failing_on("broken-trigger"));
        let runner = runner_with(generator.clone(), LogoSettings::default());
        let prompts = PromptList::from_prompts(["red apple on table", "broken-trigger", "blue sky"]);

        let (tx, mut rx) = mpsc::unbounded_channel();
        let report = runner.run_batch(&prompts, tx).await.unwrap();

        assert_eq!(report.outcome, BatchOutcome::Finished);
        assert_eq!(report.status.current, 3);
        assert_eq!(report.status.total, 3);
        assert_eq!(report.status.completed, 2);
        assert_eq!(report.status.failed, 1);

        let exportable: Vec<&str> = report.completed_jobs().map(|j| j.prompt.as_str()).collect();
        assert_eq!(exportable, vec!["red apple on table", "blue sky"]);

        let failed = &report.jobs[1];
        assert_eq!(failed.status, JobStatus::Failed);
        assert!(failed.error.as_deref().unwrap().contains("500"));
        assert!(failed.image_url.is_none());

        assert_eq!(generator.calls(), prompts.as_slice());

        let events = drain(&mut rx);
        assert!(matches!(events.last(), Some(BatchEvent::Finished(_))));
    }

    #[tokio::test]
    async fn test_initial_event_has_all_jobs_pending() {
        let generator = Arc::new(StubGenerator::new());
        let runner = runner_with(generator, LogoSettings::default());
        let prompts = PromptList::parse("a\nb");

        let (tx, mut rx) = mpsc::unbounded_channel();
        runner.run_batch(&prompts, tx).await.unwrap();

        match drain(&mut rx).first() {
            Some(BatchEvent::Started { status, jobs }) => {
                assert_eq!(status.current, 0);
                assert_eq!(status.total, 2);
                assert!(jobs.iter().all(|job| job.status == JobStatus::Pending));
            }
            other => panic!("unexpected first event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_one_job_generating_at_a_time() {
        let generator = Arc::new(StubGenerator::new().failing_on("p3"));
        let runner = runner_with(generator.clone(), LogoSettings::default());
        let prompts = PromptList::parse("p1\np2\np3\np4\np5");

        let (tx, mut rx) = mpsc::unbounded_channel();
        runner.run_batch(&prompts, tx).await.unwrap();

        assert_eq!(generator.max_in_flight.load(Ordering::SeqCst), 1);

        let mut statuses: HashMap<String, JobStatus> = HashMap::new();
        for event in drain(&mut rx) {
            if let BatchEvent::JobUpdated(job) = event {
                if let Some(previous) = statuses.get(&job.id) {
                    assert!(previous.can_transition_to(job.status), "{:?} -> {:?}", previous, job.status);
                } else {
                    assert_eq!(job.status, JobStatus::Generating);
                }
                statuses.insert(job.id.clone(), job.status);

                let generating = statuses.values().filter(|s| **s == JobStatus::Generating).count();
                assert!(generating <= 1);
            }
        }
        assert!(statuses.values().all(|s| s.is_terminal()));
    }

    #[tokio::test]
    async fn test_progress_is_monotonic() {
        let generator = Arc::new(StubGenerator::new().failing_on("b").failing_on("d"));
        let runner = runner_with(generator, LogoSettings::default());
        let prompts = PromptList::parse("a\nb\nc\nd");

        let (tx, mut rx) = mpsc::unbounded_channel();
        runner.run_batch(&prompts, tx).await.unwrap();

        let mut last_current = 0;
        let mut progress_events = 0;
        for event in drain(&mut rx) {
            if let BatchEvent::Progress(status) = event {
                progress_events += 1;
                assert!(status.current >= last_current);
                assert!(status.completed + status.failed <= status.current);
                assert!(status.current <= status.total);
                last_current = status.current;
            }
        }
        assert_eq!(progress_events, 8);
        assert_eq!(last_current, 4);
    }

    #[tokio::test]
    async fn test_failures_do_not_abort_batch() {
        let generator = Arc::new(StubGenerator::new().failing_on("first").failing_on("last"));
        let runner = runner_with(generator, LogoSettings::default());
        let prompts = PromptList::parse("first\nmiddle\nlast");

        let (tx, _rx) = mpsc::unbounded_channel();
        let report = runner.run_batch(&prompts, tx).await.unwrap();

        assert!(report.jobs.iter().all(|job| job.status.is_terminal()));
        assert_eq!(report.status.failed, 2);
        assert_eq!(report.status.completed, 1);
    }

    #[tokio::test]
    async fn test_stop_during_in_flight_job() {
        let generator = Arc::new(StubGenerator::new().gated_on("p2"));
        let runner = runner_with(generator.clone(), LogoSettings::default());
        let prompts = PromptList::parse("p1\np2\np3\np4");

        let mut handle = runner.start_batch(prompts).unwrap();
        wait_until_generating(&mut handle, "p2").await;

        runner.stop();
        runner.stop();
        generator.release.notify_one();

        let mut rest = Vec::new();
        while let Some(event) = handle.next_event().await {
            rest.push(event);
        }
        let report = handle.wait().await.unwrap();

        assert_eq!(report.outcome, BatchOutcome::Stopped);
        assert_eq!(report.jobs[0].status, JobStatus::Completed);
        assert_eq!(report.jobs[1].status, JobStatus::Completed);
        assert_eq!(report.jobs[2].status, JobStatus::Pending);
        assert_eq!(report.jobs[3].status, JobStatus::Pending);
        assert_eq!(report.status.current, 2);
        assert_eq!(generator.calls(), vec!["p1", "p2"]);

        for event in &rest {
            if let BatchEvent::JobUpdated(job) = event {
                assert!(job.prompt == "p2", "unexpected update for {}", job.prompt);
            }
        }
        assert!(matches!(rest.last(), Some(BatchEvent::Stopped(_))));
        assert!(!runner.is_running());
    }

    #[tokio::test]
    async fn test_handle_stop_matches_runner_stop() {
        let generator = Arc::new(StubGenerator::new().gated_on("a"));
        let runner = runner_with(generator.clone(), LogoSettings::default());

        let mut handle = runner.start_batch(PromptList::parse("a\nb")).unwrap();
        wait_until_generating(&mut handle, "a").await;
        handle.stop();
        generator.release.notify_one();

        let report = handle.wait().await.unwrap();
        assert!(report.was_stopped());
        assert_eq!(report.jobs[1].status, JobStatus::Pending);
    }

    #[tokio::test]
    async fn test_stop_before_batch_does_not_carry_over() {
        let generator = Arc::new(StubGenerator::new());
        let runner = runner_with(generator, LogoSettings::default());
        runner.stop();

        let (tx, _rx) = mpsc::unbounded_channel();
        let report = runner.run_batch(&PromptList::parse("a\nb"), tx).await.unwrap();
        assert_eq!(report.outcome, BatchOutcome::Finished);
        assert_eq!(report.status.completed, 2);
    }

    #[tokio::test]
    async fn test_empty_prompt_list_is_rejected() {
        let generator = Arc::new(StubGenerator::new());
        let runner = runner_with(generator.clone(), LogoSettings::default());

        let (tx, _rx) = mpsc::unbounded_channel();
        let result = runner.run_batch(&PromptList::parse("\n  \n"), tx).await;
        assert_eq!(result.unwrap_err(), BatchError::NoPrompts);
        assert!(runner.start_batch(PromptList::default()).is_err());
        assert!(generator.calls().is_empty());
    }

    #[tokio::test]
    async fn test_second_batch_rejected_while_running() {
        let generator = Arc::new(StubGenerator::new().gated_on("slow"));
        let runner = runner_with(generator.clone(), LogoSettings::default());

        let mut handle = runner.start_batch(PromptList::parse("slow")).unwrap();
        wait_until_generating(&mut handle, "slow").await;

        let (tx, _rx) = mpsc::unbounded_channel();
        let second = runner.run_batch(&PromptList::parse("other"), tx).await;
        assert_eq!(second.unwrap_err(), BatchError::AlreadyRunning);

        generator.release.notify_one();
        let report = handle.wait().await.unwrap();
        assert_eq!(report.status.completed, 1);
        assert!(!runner.is_running());
    }

    #[tokio::test]
    async fn test_repeated_prompts_get_unique_ids() {
        let generator = Arc::new(StubGenerator::new());
        let runner = runner_with(generator, LogoSettings::default());

        let (tx, _rx) = mpsc::unbounded_channel();
        let report = runner.run_batch(&PromptList::parse("same\nsame\nsame"), tx).await.unwrap();

        let ids: HashSet<&str> = report.jobs.iter().map(|j| j.id.as_str()).collect();
        assert_eq!(ids.len(), 3);
    }

    #[tokio::test]
    async fn test_no_logo_passes_image_through() {
        let generator = Arc::new(StubGenerator::new());
        let expected = generator.image.to_data_uri();
        let runner = runner_with(generator, LogoSettings::default());

        let (tx, _rx) = mpsc::unbounded_channel();
        let report = runner.run_batch(&PromptList::parse("a"), tx).await.unwrap();
        assert_eq!(report.jobs[0].image_url.as_deref(), Some(expected.as_str()));
    }

    #[tokio::test]
    async fn test_logo_is_composited() {
        let generator = Arc::new(StubGenerator::new());
        let original = generator.image.to_data_uri();
        let logo = LogoSettings::default().with_url(logo_data_uri());
        let runner = runner_with(generator, logo);

        let (tx, _rx) = mpsc::unbounded_channel();
        let report = runner.run_batch(&PromptList::parse("a"), tx).await.unwrap();

        let url = report.jobs[0].image_url.clone().unwrap();
        assert_ne!(url, original);

        let result = EncodedImage::from_data_uri(&url).unwrap();
        assert_eq!(result.mime_type, "image/png");
        let pixels = image::load_from_memory(&result.data).unwrap();
        assert_eq!((pixels.width(), pixels.height()), (64, 48));
    }

    #[tokio::test]
    async fn test_broken_logo_fails_open() {
        let generator = Arc::new(StubGenerator::new());
        let original = generator.image.to_data_uri();
        let logo = LogoSettings::default().with_url("data:image/png;base64,AAAAAAAA");
        let runner = runner_with(generator, logo);

        let (tx, _rx) = mpsc::unbounded_channel();
        let report = runner.run_batch(&PromptList::parse("a"), tx).await.unwrap();

        assert_eq!(report.jobs[0].status, JobStatus::Completed);
        assert_eq!(report.jobs[0].image_url.as_deref(), Some(original.as_str()));
    }

    #[tokio::test]
    async fn test_undecodable_generated_image_fails_job() {
        // PNG signature followed by garbage: recognised format, broken data
        let mut broken = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
        broken.extend_from_slice(b"garbage");

        let generator = Arc::new(StubGenerator::new().returning(EncodedImage::png(broken)));
        let logo = LogoSettings::default().with_url(logo_data_uri());
        let runner = runner_with(generator, logo);

        let (tx, _rx) = mpsc::unbounded_channel();
        let report = runner.run_batch(&PromptList::parse("a\nb"), tx).await.unwrap();

        assert_eq!(report.status.failed, 2);
        assert!(report.jobs.iter().all(|j| j.status == JobStatus::Failed && j.image_url.is_none()));
        assert!(report.jobs[0].error.as_deref().unwrap().contains("decode base image"));
    }

    #[tokio::test]
    async fn test_unrecognised_payload_fails_job_without_logo() {
        let generator = Arc::new(
            StubGenerator::new().returning(EncodedImage::new("image/png", b"not an image".to_vec())),
        );
        let runner = runner_with(generator, LogoSettings::default());

        let (tx, _rx) = mpsc::unbounded_channel();
        let report = runner.run_batch(&PromptList::parse("a"), tx).await.unwrap();
        assert_eq!(report.jobs[0].status, JobStatus::Failed);
    }

    #[tokio::test]
    async fn test_empty_payload_fails_job() {
        let generator = Arc::new(StubGenerator::new().returning(EncodedImage::png(Vec::new())));
        let runner = runner_with(generator, LogoSettings::default());

        let (tx, _rx) = mpsc::unbounded_channel();
        let report = runner.run_batch(&PromptList::parse("a"), tx).await.unwrap();

        assert_eq!(report.jobs[0].status, JobStatus::Failed);
        assert_eq!(report.jobs[0].error.as_deref(), Some("no image data in response"));
        assert_eq!(report.failed_jobs().count(), 1);
    }

    #[tokio::test]
    async fn test_logo_change_applies_to_later_jobs_only() {
        let generator = Arc::new(StubGenerator::new().gated_on("first"));
        let original = generator.image.to_data_uri();
        let runner = runner_with(generator.clone(), LogoSettings::default());

        let mut handle = runner.start_batch(PromptList::parse("first\nsecond")).unwrap();
        wait_until_generating(&mut handle, "first").await;

        {
            let shared = runner.logo_settings();
            let mut settings = shared.write().await;
            settings.url = logo_data_uri();
        }
        generator.release.notify_one();

        let report = handle.wait().await.unwrap();
        assert_eq!(report.jobs[0].image_url.as_deref(), Some(original.as_str()));
        assert_ne!(report.jobs[1].image_url.as_deref(), Some(original.as_str()));
        assert_eq!(report.jobs[1].status, JobStatus::Completed);
    }
}
