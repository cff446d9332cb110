use serde::{Deserialize, Serialize};

/// Lifecycle of a single generation job.
///
/// `Pending -> Generating -> {Completed | Failed}`. A job left `Pending`
/// when the batch is stopped stays that way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Generating,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Whether the state machine allows moving from `self` to `next`
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Generating)
                | (Self::Generating, Self::Completed)
                | (Self::Generating, Self::Failed)
        )
    }
}

/// One prompt's unit of work
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationJob {
    /// Unique within the batch, even for repeated prompts
    pub id: String,

    /// Prompt exactly as sent to the generator
    pub prompt: String,

    pub status: JobStatus,

    /// Data URI of the final image, set only when completed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    /// Short failure reason, set only when failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GenerationJob {
    pub fn new(id: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            prompt: prompt.into(),
            status: JobStatus::Pending,
            image_url: None,
            error: None,
        }
    }

    pub fn mark_generating(&mut self) {
        debug_assert!(self.status.can_transition_to(JobStatus::Generating));
        self.status = JobStatus::Generating;
    }

    pub fn mark_completed(&mut self, image_url: String) {
        debug_assert!(self.status.can_transition_to(JobStatus::Completed));
        self.status = JobStatus::Completed;
        self.image_url = Some(image_url);
        self.error = None;
    }

    pub fn mark_failed(&mut self, error: impl Into<String>) {
        debug_assert!(self.status.can_transition_to(JobStatus::Failed));
        self.status = JobStatus::Failed;
        self.image_url = None;
        self.error = Some(error.into());
    }

    /// Completed jobs with an image are the only ones eligible for export
    pub fn is_exportable(&self) -> bool {
        self.status == JobStatus::Completed && self.image_url.is_some()
    }
}

/// Aggregate progress of a batch.
///
/// `completed + failed <= current <= total` holds at every update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStatus {
    /// 1-based index of the job being processed, 0 before the first job
    pub current: usize,
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_prompt: Option<String>,
}

impl BatchStatus {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    /// Number of jobs that reached a terminal state
    pub fn attempted(&self) -> usize {
        self.completed + self.failed
    }

    pub fn remaining(&self) -> usize {
        self.total.saturating_sub(self.attempted())
    }

    /// Fraction of the batch attempted so far, 0.0-1.0
    pub fn progress(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.attempted() as f64 / self.total as f64
    }
}

/// How a batch ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchOutcome {
    /// Every job was attempted and no stop was requested
    Finished,
    /// A stop was requested
    Stopped,
}

/// Update emitted while a batch runs, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchEvent {
    /// Emitted once with all jobs pending and `current == 0`
    Started { status: BatchStatus, jobs: Vec<GenerationJob> },

    /// A job changed state
    JobUpdated(GenerationJob),

    /// Aggregate progress changed
    Progress(BatchStatus),

    /// All jobs were attempted
    Finished(BatchStatus),

    /// The batch ended early on request
    Stopped(BatchStatus),
}

impl BatchEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished(_) | Self::Stopped(_))
    }
}

/// Final state of a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    pub outcome: BatchOutcome,
    pub status: BatchStatus,
    pub jobs: Vec<GenerationJob>,
}

impl BatchReport {
    /// Jobs eligible for export, in prompt order
    pub fn completed_jobs(&self) -> impl Iterator<Item = &GenerationJob> {
        self.jobs.iter().filter(|job| job.is_exportable())
    }

    pub fn failed_jobs(&self) -> impl Iterator<Item = &GenerationJob> {
        self.jobs.iter().filter(|job| job.status == JobStatus::Failed)
    }

    pub fn was_stopped(&self) -> bool {
        self.outcome == BatchOutcome::Stopped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_state_machine() {
        use JobStatus::*;

        assert!(Pending.can_transition_to(Generating));
        assert!(Generating.can_transition_to(Completed));
        assert!(Generating.can_transition_to(Failed));

        assert!(!Pending.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(Generating));
        assert!(!Failed.can_transition_to(Pending));
        assert!(!Completed.can_transition_to(Failed));

        assert!(Completed.is_terminal());
        assert!(Failed.is_terminal());
        assert!(!Pending.is_terminal());
    }

    #[test]
    fn test_job_fields_follow_status() {
        let mut job = GenerationJob::new("img-1-0", "a cat");
        assert!(!job.is_exportable());

        job.mark_generating();
        job.mark_completed("data:image/png;base64,AAAA".to_string());
        assert!(job.is_exportable());
        assert!(job.error.is_none());

        let mut failed = GenerationJob::new("img-1-1", "a dog");
        failed.mark_generating();
        failed.mark_failed("Generation failed");
        assert!(!failed.is_exportable());
        assert!(failed.image_url.is_none());
        assert_eq!(failed.error.as_deref(), Some("Generation failed"));
    }

    #[test]
    fn test_batch_status_accounting() {
        let mut status = BatchStatus::new(4);
        assert_eq!(status.progress(), 0.0);

        status.current = 3;
        status.completed = 2;
        status.failed = 1;
        assert_eq!(status.attempted(), 3);
        assert_eq!(status.remaining(), 1);
        assert_eq!(status.progress(), 0.75);

        assert_eq!(BatchStatus::default().progress(), 0.0);
    }

    #[test]
    fn test_job_serialization_omits_empty_fields() {
        let job = GenerationJob::new("img-1-0", "a cat");
        let json = serde_json::to_value(&job).unwrap();
        assert_eq!(json["status"], "pending");
        assert!(json.get("image_url").is_none());
        assert!(json.get("error").is_none());
    }
}
