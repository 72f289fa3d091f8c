use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use slide_common::{GenerationRequest, JobId, OutputMode, ProjectId, SlideConfig};
use slide_protocol::{Event, Navigation, Op, Submission};

use crate::backend::GenerationBackend;
use crate::error::{ErrorReporter, GenerationError, Result, StudioError};
use crate::project::{Project, ProjectSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorConfig {
    pub build_timeout: Duration,
    pub revision_ack_delay: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self::from(&SlideConfig::default())
    }
}

impl From<&SlideConfig> for OrchestratorConfig {
    fn from(config: &SlideConfig) -> Self {
        Self {
            build_timeout: config.build_timeout(),
            revision_ack_delay: config.revision_ack_delay(),
        }
    }
}

/// Drives one project's generation jobs and revision turns.
///
/// All state lives in a single [`Project`] behind an async mutex; deferred
/// work (the backend call, revision acknowledgements) runs in spawned tasks
/// that re-check the project's cancellation token under that mutex before
/// writing. Cloning the handle shares the project; dropping the last clone
/// tears it down.
#[derive(Clone)]
pub struct GenerationOrchestrator {
    inner: Arc<Inner>,
}

struct Inner {
    project_id: ProjectId,
    project: Arc<Mutex<Project>>,
    backend: Arc<dyn GenerationBackend>,
    config: OrchestratorConfig,
    cancel: CancellationToken,
    tx_event: mpsc::UnboundedSender<Event>,
    rx_event: Mutex<mpsc::UnboundedReceiver<Event>>,
    /// Deadlines of pending revision acknowledgements, drained in order.
    tx_ack: mpsc::UnboundedSender<(Instant, u64)>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

fn forward(tx_event: &mpsc::UnboundedSender<Event>, events: Vec<Event>) {
    for event in events {
        let _ = tx_event.send(event);
    }
}

impl GenerationOrchestrator {
    /// Must be called from within a Tokio runtime.
    pub fn spawn(
        project_id: ProjectId,
        backend: Arc<dyn GenerationBackend>,
        config: OrchestratorConfig,
    ) -> Self {
        let (tx_event, rx_event) = mpsc::unbounded_channel::<Event>();
        let (tx_ack, rx_ack) = mpsc::unbounded_channel::<(Instant, u64)>();
        let project = Arc::new(Mutex::new(Project::new(project_id.clone())));
        let cancel = CancellationToken::new();

        tokio::spawn(run_ack_queue(
            project.clone(),
            tx_event.clone(),
            cancel.clone(),
            rx_ack,
        ));
        tracing::info!("Opened project {project_id}");

        let inner = Arc::new(Inner {
            project_id,
            project,
            backend,
            config,
            cancel,
            tx_event,
            rx_event: Mutex::new(rx_event),
            tx_ack,
        });
        Self { inner }
    }

    pub fn project_id(&self) -> &ProjectId {
        &self.inner.project_id
    }

    /// Starts a job for `prompt` and returns without waiting for the build.
    pub async fn submit(&self, prompt: &str, mode: OutputMode) -> Result<JobId> {
        let mut project = self.inner.project.lock().await;
        let (job_id, events) = project.submit(prompt, mode)?;
        forward(&self.inner.tx_event, events);

        let request = project
            .job()
            .map(|job| job.request.clone())
            .unwrap_or_else(|| GenerationRequest::new(prompt.trim(), mode));
        tokio::spawn(run_build(
            self.inner.project.clone(),
            self.inner.backend.clone(),
            self.inner.tx_event.clone(),
            self.inner.cancel.clone(),
            job_id.clone(),
            request,
            self.inner.config.build_timeout,
        ));
        Ok(job_id)
    }

    /// Appends the user's revision turn now and the agent's acknowledgement
    /// after the configured delay.
    pub async fn revise(&self, text: &str) -> Result<()> {
        let mut project = self.inner.project.lock().await;
        let (revision, events) = project.request_revision(text)?;
        forward(&self.inner.tx_event, events);
        // Queued while still holding the project lock so queue order matches
        // chat order.
        let due = Instant::now() + self.inner.config.revision_ack_delay;
        self.inner
            .tx_ack
            .send((due, revision))
            .map_err(|_| StudioError::ProjectClosed)?;
        Ok(())
    }

    /// Moves the deck cursor and returns its new position.
    pub async fn navigate(&self, navigation: Navigation) -> Result<usize> {
        let mut project = self.inner.project.lock().await;
        let events = project.navigate(navigation)?;
        forward(&self.inner.tx_event, events);
        Ok(project.deck().cursor())
    }

    pub async fn snapshot(&self) -> ProjectSnapshot {
        self.inner.project.lock().await.snapshot()
    }

    /// Dispatches a protocol submission. Rejections are also reported on the
    /// event stream as `Event::Error`.
    pub async fn handle(&self, submission: Submission) -> Result<()> {
        tracing::debug!("Handling submission {}", submission.id);
        let result = match submission.op {
            Op::Submit { prompt, mode } => self.submit(&prompt, mode).await.map(|_| ()),
            Op::Revise { text } => self.revise(&text).await,
            Op::Navigate(navigation) => self.navigate(navigation).await.map(|_| ()),
            Op::Shutdown => {
                self.shutdown().await;
                Ok(())
            }
        };
        if let Err(err) = &result {
            let _ = self.inner.tx_event.send(Event::Error {
                message: ErrorReporter::format_user_error(err),
            });
        }
        result
    }

    pub async fn next_event(&self) -> Option<Event> {
        let mut rx = self.inner.rx_event.lock().await;
        rx.recv().await
    }

    /// Returns an already queued event without waiting.
    pub async fn try_next_event(&self) -> Option<Event> {
        let mut rx = self.inner.rx_event.lock().await;
        rx.try_recv().ok()
    }

    /// Tears the project down. Pending builds and acknowledgements become
    /// no-ops; the final state is returned.
    pub async fn shutdown(&self) -> ProjectSnapshot {
        let mut project = self.inner.project.lock().await;
        if project.close() {
            self.inner.cancel.cancel();
            tracing::info!("Closed project {}", self.inner.project_id);
            let _ = self.inner.tx_event.send(Event::ShutdownComplete);
        }
        project.snapshot()
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }
}

async fn run_build(
    project: Arc<Mutex<Project>>,
    backend: Arc<dyn GenerationBackend>,
    tx_event: mpsc::UnboundedSender<Event>,
    cancel: CancellationToken,
    job_id: JobId,
    request: GenerationRequest,
    budget: Duration,
) {
    let outcome = tokio::select! {
        _ = cancel.cancelled() => {
            tracing::debug!("Build of job {job_id} cancelled");
            return;
        }
        result = tokio::time::timeout(budget, backend.generate(&request, cancel.child_token())) => {
            match result {
                Ok(outcome) => outcome,
                Err(_) => Err(GenerationError::Timeout {
                    timeout_ms: u64::try_from(budget.as_millis()).unwrap_or(u64::MAX),
                }),
            }
        }
    };

    let mut project = project.lock().await;
    if cancel.is_cancelled() || project.is_closed() {
        tracing::debug!("Discarding result of job {job_id} after teardown");
        return;
    }
    match project.complete_build(&job_id, outcome) {
        Ok(events) => forward(&tx_event, events),
        Err(err) => tracing::warn!("Could not complete job {job_id}: {err}"),
    }
}

async fn run_ack_queue(
    project: Arc<Mutex<Project>>,
    tx_event: mpsc::UnboundedSender<Event>,
    cancel: CancellationToken,
    mut rx_ack: mpsc::UnboundedReceiver<(Instant, u64)>,
) {
    loop {
        let (due, revision) = tokio::select! {
            _ = cancel.cancelled() => break,
            due = rx_ack.recv() => match due {
                Some(due) => due,
                None => break,
            },
        };
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep_until(due) => {}
        }

        let mut project = project.lock().await;
        if cancel.is_cancelled() || project.is_closed() {
            break;
        }
        match project.acknowledge_revision(revision) {
            Ok(events) => forward(&tx_event, events),
            Err(err) => {
                tracing::warn!("Dropping revision acknowledgement: {err}");
                break;
            }
        }
    }
    tracing::debug!("Revision acknowledgement queue stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DemoBackend;
    use async_trait::async_trait;
    use slide_common::{Slide, Speaker};
    use slide_protocol::JobStatus;

    const BUILD: Duration = Duration::from_millis(3000);

    fn orchestrator() -> GenerationOrchestrator {
        GenerationOrchestrator::spawn(
            ProjectId::generate(),
            Arc::new(DemoBackend::new(BUILD)),
            OrchestratorConfig::default(),
        )
    }

    async fn drain(orch: &GenerationOrchestrator) -> Vec<Event> {
        let mut events = Vec::new();
        while let Some(event) = orch.try_next_event().await {
            events.push(event);
        }
        events
    }

    struct StalledBackend;

    #[async_trait]
    impl GenerationBackend for StalledBackend {
        async fn generate(
            &self,
            _request: &GenerationRequest,
            cancel: CancellationToken,
        ) -> std::result::Result<Vec<Slide>, GenerationError> {
            cancel.cancelled().await;
            Err(GenerationError::Cancelled)
        }
    }

    struct FailingBackend;

    #[async_trait]
    impl GenerationBackend for FailingBackend {
        async fn generate(
            &self,
            _request: &GenerationRequest,
            _cancel: CancellationToken,
        ) -> std::result::Result<Vec<Slide>, GenerationError> {
            Err(GenerationError::Backend {
                reason: "model unavailable".to_string(),
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_resubmits_yield_one_transition() {
        let orch = orchestrator();
        orch.submit("Quarterly Review", OutputMode::Deck).await.unwrap();
        for _ in 0..10 {
            let err = orch
                .submit("Quarterly Review", OutputMode::Deck)
                .await
                .unwrap_err();
            assert!(matches!(err, StudioError::ConcurrentJobConflict { .. }));
        }
        tokio::time::sleep(BUILD * 2).await;

        let events = drain(&orch).await;
        let statuses: Vec<JobStatus> = events
            .iter()
            .filter_map(|e| match e {
                Event::JobStatusChanged { status, .. } => Some(*status),
                _ => None,
            })
            .collect();
        assert_eq!(statuses, vec![JobStatus::Building, JobStatus::Ready]);
        let turns = events
            .iter()
            .filter(|e| matches!(e, Event::ChatTurnAppended { .. }))
            .count();
        assert_eq!(turns, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_backend_times_out_into_failed() {
        let config = OrchestratorConfig {
            build_timeout: Duration::from_millis(500),
            ..OrchestratorConfig::default()
        };
        let orch =
            GenerationOrchestrator::spawn(ProjectId::generate(), Arc::new(StalledBackend), config);
        orch.submit("Quarterly Review", OutputMode::Deck).await.unwrap();
        tokio::time::sleep(Duration::from_millis(600)).await;

        let snapshot = orch.snapshot().await;
        assert_eq!(snapshot.status, Some(JobStatus::Failed));
        assert_eq!(snapshot.turns.len(), 2);
        assert_eq!(snapshot.turns[1].speaker, Speaker::Agent);
        assert!(snapshot.turns[1].text.contains("longer than"));

        orch.submit("Quarterly Review", OutputMode::Deck).await.unwrap();
        assert_eq!(orch.snapshot().await.status, Some(JobStatus::Building));
    }

    #[tokio::test(start_paused = true)]
    async fn backend_error_surfaces_in_chat() {
        let orch = GenerationOrchestrator::spawn(
            ProjectId::generate(),
            Arc::new(FailingBackend),
            OrchestratorConfig::default(),
        );
        orch.submit("Quarterly Review", OutputMode::Deck).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        let snapshot = orch.snapshot().await;
        assert_eq!(snapshot.status, Some(JobStatus::Failed));
        assert!(snapshot.turns[1].text.contains("model unavailable"));
        assert!(snapshot.slides.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn acknowledgements_follow_submission_order() {
        let orch = orchestrator();
        orch.submit("Quarterly Review", OutputMode::Deck).await.unwrap();
        tokio::time::sleep(BUILD + Duration::from_millis(1)).await;

        orch.revise("Make it shorter").await.unwrap();
        tokio::time::sleep(Duration::from_millis(500)).await;
        orch.revise("Change Style").await.unwrap();

        tokio::time::sleep(Duration::from_millis(501)).await;
        let texts: Vec<String> = orch
            .snapshot()
            .await
            .turns
            .into_iter()
            .skip(2)
            .map(|t| t.text)
            .collect();
        assert_eq!(texts.len(), 3);
        assert_eq!(texts[0], "Make it shorter");
        assert_eq!(texts[1], "Change Style");

        tokio::time::sleep(Duration::from_millis(500)).await;
        let turns = orch.snapshot().await.turns;
        assert_eq!(turns.len(), 6);
        assert_eq!(turns[4].speaker, Speaker::Agent);
        assert_eq!(turns[5].speaker, Speaker::Agent);
    }

    #[tokio::test(start_paused = true)]
    async fn resubmit_settles_pending_acknowledgement_first() {
        let orch = orchestrator();
        orch.submit("Quarterly Review", OutputMode::Deck).await.unwrap();
        tokio::time::sleep(BUILD + Duration::from_millis(1)).await;

        orch.revise("a").await.unwrap();
        orch.submit("Q2", OutputMode::Poster).await.unwrap();
        tokio::time::sleep(Duration::from_millis(1001)).await;

        let snapshot = orch.snapshot().await;
        assert_eq!(snapshot.status, Some(JobStatus::Building));
        let texts: Vec<&str> = snapshot.turns[2..].iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts.len(), 3);
        assert_eq!(texts[0], "a");
        assert_eq!(texts[1], crate::project::REVISION_ACK);
        assert!(texts[2].contains("drafting a poster"));

        // The new deck still completes, and a later revision waits its full delay.
        tokio::time::sleep(BUILD).await;
        assert_eq!(orch.snapshot().await.status, Some(JobStatus::Ready));
        orch.revise("b").await.unwrap();
        tokio::time::sleep(Duration::from_millis(999)).await;
        assert_eq!(orch.snapshot().await.turns.last().map(|t| t.text.as_str()), Some("b"));
        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(
            orch.snapshot().await.turns.last().map(|t| t.text.clone()),
            Some(crate::project::REVISION_ACK.to_string())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn revision_while_building_is_rejected() {
        let orch = orchestrator();
        orch.submit("Quarterly Review", OutputMode::Deck).await.unwrap();
        let err = orch.revise("Make it shorter").await.unwrap_err();
        assert!(matches!(err, StudioError::NotReady { .. }));
        assert_eq!(orch.snapshot().await.turns.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn teardown_drops_pending_acknowledgements() {
        let orch = orchestrator();
        orch.submit("Quarterly Review", OutputMode::Deck).await.unwrap();
        tokio::time::sleep(BUILD + Duration::from_millis(1)).await;
        orch.revise("Make it shorter").await.unwrap();

        let closed = orch.shutdown().await;
        assert!(closed.closed);
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(orch.snapshot().await.turns.len(), 3);
        assert!(matches!(
            orch.revise("Again").await,
            Err(StudioError::ProjectClosed)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn handle_reports_rejections_as_events() {
        let orch = orchestrator();
        let result = orch
            .handle(Submission::new(Op::Submit {
                prompt: "  ".to_string(),
                mode: OutputMode::Deck,
            }))
            .await;
        assert!(result.is_err());
        assert!(matches!(
            orch.next_event().await,
            Some(Event::Error { .. })
        ));

        orch.handle(Submission::new(Op::Shutdown)).await.unwrap();
        assert_eq!(orch.next_event().await, Some(Event::ShutdownComplete));
        assert!(orch.is_shut_down());
    }
}
