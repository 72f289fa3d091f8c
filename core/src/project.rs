use serde::Serialize;
use std::collections::VecDeque;

use slide_common::{
    ChatTurn, GenerationRequest, JobId, OutputMode, ProjectId, Slide, Speaker,
};
use slide_protocol::{Event, JobStatus, Navigation};

use crate::chat::ChatState;
use crate::deck::DeckState;
use crate::error::{ErrorReporter, GenerationError, Result, StudioError};
use crate::job::GenerationJob;

pub const REVISION_ACK: &str =
    "Understood. Applying those changes to the current slide deck. One moment...";

fn build_started_message(mode: OutputMode) -> String {
    let artifact = match mode {
        OutputMode::Deck => "presentation",
        OutputMode::Poster => "poster",
    };
    format!(
        "I've analyzed your request. I'm now drafting a {artifact} focused on your requirements. One moment while I synthesize the content..."
    )
}

fn build_finished_message(mode: OutputMode, slide_count: usize) -> String {
    match mode {
        OutputMode::Deck => format!(
            "I've finished drafting your presentation! You have {slide_count} slides ready. How do they look?"
        ),
        OutputMode::Poster => "I've finished drafting your poster! How does it look?".to_string(),
    }
}

/// State owned by one project view: its job slot, deck and chat log.
///
/// Every mutating method returns the events the views need to observe the
/// change. Once closed, the project refuses all further mutation.
#[derive(Debug)]
pub struct Project {
    id: ProjectId,
    job: Option<GenerationJob>,
    deck: DeckState,
    chat: ChatState,
    /// Revisions whose acknowledgement has not been appended yet, oldest first.
    pending_revisions: VecDeque<u64>,
    next_revision: u64,
    closed: bool,
}

impl Project {
    pub fn new(id: ProjectId) -> Self {
        Self {
            id,
            job: None,
            deck: DeckState::new(),
            chat: ChatState::new(),
            pending_revisions: VecDeque::new(),
            next_revision: 0,
            closed: false,
        }
    }

    pub fn id(&self) -> &ProjectId {
        &self.id
    }

    pub fn job(&self) -> Option<&GenerationJob> {
        self.job.as_ref()
    }

    pub fn status(&self) -> Option<JobStatus> {
        self.job.as_ref().map(|job| job.status)
    }

    pub fn deck(&self) -> &DeckState {
        &self.deck
    }

    pub fn chat(&self) -> &ChatState {
        &self.chat
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            Err(StudioError::ProjectClosed)
        } else {
            Ok(())
        }
    }

    fn append(&mut self, speaker: Speaker, text: impl Into<String>) -> Event {
        let turn = self.chat.append(speaker, text).clone();
        Event::ChatTurnAppended { turn }
    }

    /// Opens a new job for `prompt` and moves it straight to `Building`.
    ///
    /// A finished (`Ready` or `Failed`) job is replaced; an active one makes
    /// the submit fail with `ConcurrentJobConflict`.
    pub fn submit(&mut self, prompt: &str, mode: OutputMode) -> Result<(JobId, Vec<Event>)> {
        self.ensure_open()?;
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(StudioError::invalid_request("prompt is empty"));
        }
        if let Some(current) = self.job.as_ref().filter(|job| job.status.is_active()) {
            return Err(StudioError::ConcurrentJobConflict {
                job_id: current.id.clone(),
            });
        }

        // Outstanding acknowledgements belong to the previous deck and must
        // land before the new job's turns.
        let mut events = self.flush_revisions();

        let mut job = GenerationJob::new(GenerationRequest::new(prompt, mode));
        job.start_building();
        let job_id = job.id.clone();
        if let Some(previous) = self.job.replace(job) {
            tracing::debug!("Job {} ({}) replaced by {job_id}", previous.id, previous.status);
        }
        tracing::info!("Project {}: job {job_id} building ({mode} mode)", self.id);

        events.push(Event::JobStatusChanged {
            job_id: job_id.clone(),
            status: JobStatus::Building,
        });
        events.push(self.append(Speaker::Agent, build_started_message(mode)));
        Ok((job_id, events))
    }

    /// Applies the backend outcome of `job_id`.
    ///
    /// Completions for a job that is no longer the building one are stale and
    /// produce no events.
    pub fn complete_build(
        &mut self,
        job_id: &JobId,
        outcome: std::result::Result<Vec<Slide>, GenerationError>,
    ) -> Result<Vec<Event>> {
        self.ensure_open()?;
        let mode = match self.job.as_ref() {
            Some(job) if &job.id == job_id && job.status == JobStatus::Building => {
                job.request.mode
            }
            _ => {
                tracing::debug!("Project {}: dropping stale completion for job {job_id}", self.id);
                return Ok(Vec::new());
            }
        };

        let slides = match outcome {
            Ok(slides) if slides.is_empty() => {
                return Ok(self.fail_build(GenerationError::InvalidDeck {
                    reason: "no slides".to_string(),
                }));
            }
            Ok(slides) => slides,
            Err(err) => return Ok(self.fail_build(err)),
        };

        let slide_count = slides.len();
        if let Err(err) = self.deck.replace_all(slides) {
            return Ok(self.fail_build(GenerationError::InvalidDeck {
                reason: err.to_string(),
            }));
        }

        let mut events = vec![
            Event::DeckReplaced { slide_count },
            Event::CursorMoved { index: 0 },
        ];
        if let Some(job) = self.job.as_mut() {
            job.mark_ready();
        }
        tracing::info!("Project {}: job {job_id} ready with {slide_count} slides", self.id);
        events.push(Event::JobStatusChanged {
            job_id: job_id.clone(),
            status: JobStatus::Ready,
        });
        events.push(self.append(Speaker::Agent, build_finished_message(mode, slide_count)));
        Ok(events)
    }

    fn fail_build(&mut self, err: GenerationError) -> Vec<Event> {
        let Some(job) = self.job.as_mut() else {
            return Vec::new();
        };
        job.mark_failed(err.to_string());
        let job_id = job.id.clone();
        tracing::warn!("Project {}: job {job_id} failed: {err}", self.id);
        vec![
            Event::JobStatusChanged {
                job_id,
                status: JobStatus::Failed,
            },
            self.append(Speaker::Agent, ErrorReporter::format_generation_error(&err)),
        ]
    }

    /// Records the user's revision turn and returns the revision number the
    /// delayed [`Project::acknowledge_revision`] call must pass back.
    pub fn request_revision(&mut self, text: &str) -> Result<(u64, Vec<Event>)> {
        self.ensure_open()?;
        let text = text.trim();
        if text.is_empty() {
            return Err(StudioError::invalid_request("revision is empty"));
        }
        if self.status() != Some(JobStatus::Ready) {
            return Err(StudioError::not_ready(self.status()));
        }
        let revision = self.next_revision;
        self.next_revision += 1;
        self.pending_revisions.push_back(revision);
        Ok((revision, vec![self.append(Speaker::User, text)]))
    }

    /// Appends the acknowledgement for `revision`. Revisions already flushed
    /// by a newer submit produce no events.
    pub fn acknowledge_revision(&mut self, revision: u64) -> Result<Vec<Event>> {
        self.ensure_open()?;
        if self.pending_revisions.front() != Some(&revision) {
            tracing::debug!("Project {}: revision {revision} already acknowledged", self.id);
            return Ok(Vec::new());
        }
        self.pending_revisions.pop_front();
        Ok(vec![self.append(Speaker::Agent, REVISION_ACK)])
    }

    pub fn pending_revisions(&self) -> usize {
        self.pending_revisions.len()
    }

    fn flush_revisions(&mut self) -> Vec<Event> {
        let pending = self.pending_revisions.len();
        self.pending_revisions.clear();
        (0..pending)
            .map(|_| self.append(Speaker::Agent, REVISION_ACK))
            .collect()
    }

    pub fn navigate(&mut self, navigation: Navigation) -> Result<Vec<Event>> {
        self.ensure_open()?;
        let moved = match navigation {
            Navigation::Next => self.deck.next(),
            Navigation::Prev => self.deck.prev(),
            Navigation::Select(index) => self.deck.select(index),
        };
        if moved {
            Ok(vec![Event::CursorMoved {
                index: self.deck.cursor(),
            }])
        } else {
            Ok(Vec::new())
        }
    }

    /// Marks the project torn down. Returns false if it already was.
    pub fn close(&mut self) -> bool {
        if self.closed {
            return false;
        }
        if let Some(job) = self.job.as_ref().filter(|job| job.status.is_active()) {
            tracing::info!("Project {}: closing with job {} still {}", self.id, job.id, job.status);
        }
        self.closed = true;
        true
    }

    pub fn snapshot(&self) -> ProjectSnapshot {
        ProjectSnapshot {
            id: self.id.clone(),
            job_id: self.job.as_ref().map(|job| job.id.clone()),
            status: self.status(),
            request: self.job.as_ref().map(|job| job.request.clone()),
            slides: self.deck.slides().to_vec(),
            cursor: self.deck.cursor(),
            turns: self.chat.turns().to_vec(),
            closed: self.closed,
        }
    }
}

/// Point-in-time copy of a project, handed to views.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectSnapshot {
    pub id: ProjectId,
    pub job_id: Option<JobId>,
    pub status: Option<JobStatus>,
    pub request: Option<GenerationRequest>,
    pub slides: Vec<Slide>,
    pub cursor: usize,
    pub turns: Vec<ChatTurn>,
    pub closed: bool,
}

impl ProjectSnapshot {
    pub fn current_slide(&self) -> Option<&Slide> {
        self.slides.get(self.cursor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::demo_deck;

    fn project() -> Project {
        Project::new(ProjectId::from("p-1".to_string()))
    }

    fn chat_events(events: &[Event]) -> usize {
        events
            .iter()
            .filter(|e| matches!(e, Event::ChatTurnAppended { .. }))
            .count()
    }

    #[test]
    fn blank_prompt_creates_nothing() {
        let mut p = project();
        let err = p.submit("   \n", OutputMode::Deck).unwrap_err();
        assert!(matches!(err, StudioError::InvalidRequest { .. }));
        assert!(p.job().is_none());
        assert!(p.chat().is_empty());
    }

    #[test]
    fn submit_builds_and_acknowledges_once() {
        let mut p = project();
        let (_, events) = p.submit("Quarterly Review", OutputMode::Deck).unwrap();
        assert_eq!(p.status(), Some(JobStatus::Building));
        assert_eq!(chat_events(&events), 1);
        assert_eq!(p.chat().len(), 1);

        for _ in 0..5 {
            let err = p.submit("Quarterly Review", OutputMode::Deck).unwrap_err();
            assert!(matches!(err, StudioError::ConcurrentJobConflict { .. }));
        }
        assert_eq!(p.chat().len(), 1);
    }

    #[test]
    fn completion_reveals_deck_atomically() {
        let mut p = project();
        let (job_id, _) = p.submit("Quarterly Review", OutputMode::Deck).unwrap();
        let events = p.complete_build(&job_id, Ok(demo_deck())).unwrap();

        assert_eq!(p.status(), Some(JobStatus::Ready));
        assert_eq!(p.deck().len(), 5);
        assert_eq!(p.deck().cursor(), 0);
        assert_eq!(p.chat().len(), 2);
        assert_eq!(chat_events(&events), 1);
        assert!(p.chat().turns()[1].text.contains("5 slides"));

        let again = p.complete_build(&job_id, Ok(demo_deck())).unwrap();
        assert!(again.is_empty());
        assert_eq!(p.chat().len(), 2);
    }

    #[test]
    fn failure_keeps_previous_deck() {
        let mut p = project();
        let (first, _) = p.submit("Quarterly Review", OutputMode::Deck).unwrap();
        p.complete_build(&first, Ok(demo_deck())).unwrap();
        p.navigate(Navigation::Select(2)).unwrap();

        let (second, _) = p.submit("Board update", OutputMode::Deck).unwrap();
        assert_ne!(first, second);
        p.complete_build(&second, Err(GenerationError::Timeout { timeout_ms: 30_000 }))
            .unwrap();

        assert_eq!(p.status(), Some(JobStatus::Failed));
        assert_eq!(p.deck().len(), 5);
        assert_eq!(p.deck().cursor(), 2);
        let last = p.chat().last().unwrap();
        assert_eq!(last.speaker, Speaker::Agent);
        assert!(last.text.contains("retry"));
    }

    #[test]
    fn failed_job_is_replaced_by_new_submit() {
        let mut p = project();
        let (first, _) = p.submit("Quarterly Review", OutputMode::Deck).unwrap();
        p.complete_build(
            &first,
            Err(GenerationError::Backend {
                reason: "offline".to_string(),
            }),
        )
        .unwrap();

        let (second, _) = p.submit("Quarterly Review", OutputMode::Poster).unwrap();
        assert_eq!(p.job().map(|j| &j.id), Some(&second));
        assert_eq!(p.status(), Some(JobStatus::Building));

        let stale = p.complete_build(&first, Ok(demo_deck())).unwrap();
        assert!(stale.is_empty());
        assert!(p.deck().is_empty());
    }

    #[test]
    fn empty_or_invalid_deck_fails_the_job() {
        let mut p = project();
        let (job_id, _) = p.submit("Quarterly Review", OutputMode::Deck).unwrap();
        p.complete_build(&job_id, Ok(Vec::new())).unwrap();
        assert_eq!(p.status(), Some(JobStatus::Failed));
        assert!(p.job().and_then(|j| j.failure.as_deref()).unwrap().contains("no slides"));

        let (job_id, _) = p.submit("Quarterly Review", OutputMode::Deck).unwrap();
        let mut deck = demo_deck();
        deck[1] = deck[0].clone();
        p.complete_build(&job_id, Ok(deck)).unwrap();
        assert_eq!(p.status(), Some(JobStatus::Failed));
        assert!(p.deck().is_empty());
    }

    #[test]
    fn revision_requires_ready_deck() {
        let mut p = project();
        assert!(matches!(
            p.request_revision("shorter"),
            Err(StudioError::NotReady { .. })
        ));

        let (job_id, _) = p.submit("Quarterly Review", OutputMode::Deck).unwrap();
        assert!(matches!(
            p.request_revision("shorter"),
            Err(StudioError::NotReady { .. })
        ));
        assert_eq!(p.chat().len(), 1);

        p.complete_build(&job_id, Ok(demo_deck())).unwrap();
        assert!(matches!(
            p.request_revision("  "),
            Err(StudioError::InvalidRequest { .. })
        ));
        let (revision, _) = p.request_revision("Make it shorter").unwrap();
        p.acknowledge_revision(revision).unwrap();
        let turns = p.chat().turns();
        assert_eq!(turns[2].speaker, Speaker::User);
        assert_eq!(turns[3].text, REVISION_ACK);
        assert!(p.acknowledge_revision(revision).unwrap().is_empty());
        assert_eq!(p.chat().len(), 4);
    }

    #[test]
    fn submit_settles_outstanding_revisions_first() {
        let mut p = project();
        let (job_id, _) = p.submit("Quarterly Review", OutputMode::Deck).unwrap();
        p.complete_build(&job_id, Ok(demo_deck())).unwrap();
        let (first, _) = p.request_revision("a").unwrap();
        let (second, _) = p.request_revision("b").unwrap();

        let (_, events) = p.submit("Q2", OutputMode::Poster).unwrap();
        assert_eq!(p.pending_revisions(), 0);
        assert_eq!(chat_events(&events), 3);
        assert!(matches!(
            events[2],
            Event::JobStatusChanged {
                status: JobStatus::Building,
                ..
            }
        ));

        let texts: Vec<&str> = p.chat().turns()[2..].iter().map(|t| t.text.as_str()).collect();
        assert_eq!(&texts[..4], &["a", "b", REVISION_ACK, REVISION_ACK]);
        assert!(texts[4].contains("drafting a poster"));

        assert!(p.acknowledge_revision(first).unwrap().is_empty());
        assert!(p.acknowledge_revision(second).unwrap().is_empty());
        assert_eq!(p.chat().len(), 7);
    }

    #[test]
    fn navigation_emits_only_on_movement() {
        let mut p = project();
        let (job_id, _) = p.submit("Quarterly Review", OutputMode::Deck).unwrap();
        p.complete_build(&job_id, Ok(demo_deck())).unwrap();

        assert!(p.navigate(Navigation::Prev).unwrap().is_empty());
        assert_eq!(
            p.navigate(Navigation::Next).unwrap(),
            vec![Event::CursorMoved { index: 1 }]
        );
        assert!(p.navigate(Navigation::Select(10)).unwrap().is_empty());
        assert_eq!(p.snapshot().cursor, 1);
    }

    #[test]
    fn closed_project_rejects_everything() {
        let mut p = project();
        let (job_id, _) = p.submit("Quarterly Review", OutputMode::Deck).unwrap();
        assert!(p.close());
        assert!(!p.close());

        assert!(matches!(
            p.complete_build(&job_id, Ok(demo_deck())),
            Err(StudioError::ProjectClosed)
        ));
        assert!(matches!(p.acknowledge_revision(0), Err(StudioError::ProjectClosed)));
        assert_eq!(p.status(), Some(JobStatus::Building));
        assert!(p.deck().is_empty());
        assert_eq!(p.chat().len(), 1);
    }
}
