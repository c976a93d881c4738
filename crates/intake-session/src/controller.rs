use std::future::Future;
use std::sync::Arc;

use intake_spec::navigator;
use intake_spec::{
    Answer, AnswerInput, EffectiveSequence, Gender, Language, OverallProgress, ParticipantId,
    PartProgress, Position, ProgressSession, QuestionView, Questionnaire, Resume,
    SectionProgress, SectionSummary, SessionKey, Step, build_answer, overall_progress,
    per_part_progress, per_section_progress,
};
use intake_store::{ProgressStore, StoreError};
use time::OffsetDateTime;

use crate::error::SessionError;

/// Source of timestamps for answers, cursor moves and completion.
pub trait Clock: Send + Sync {
    fn now(&self) -> OffsetDateTime;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// Identity supplied by the authentication layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub id: ParticipantId,
    pub gender: Gender,
}

impl Participant {
    pub fn new(id: impl Into<String>, gender: Gender) -> Self {
        Self {
            id: ParticipantId::new(id),
            gender,
        }
    }

    pub fn key(&self) -> SessionKey {
        SessionKey::new(self.id.clone(), self.gender)
    }
}

/// What the participant is looking at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    LanguageSelection,
    SectionOverview,
    Question,
    Complete,
    /// Left via save-and-exit; reopen to resume.
    Closed,
}

/// Stored progress found when the controller was opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Existing {
    None,
    Resumable { language: Language, answered: usize },
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeNotice {
    /// The stored cursor no longer matched the questionnaire.
    Relocated { stored: Position, resumed_at: Position },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LanguageOutcome {
    Started,
    Resumed { notice: Option<ResumeNotice> },
    /// A stored session exists in another language. Nothing has been
    /// discarded yet; pass the token to `confirm_restart` to proceed.
    ConfirmationRequired(PendingRestart),
    AlreadyComplete,
}

/// Proof that a destructive language switch was offered to the participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRestart {
    key: SessionKey,
    from: Language,
    to: Language,
    answers_at_risk: usize,
}

impl PendingRestart {
    pub fn from(&self) -> &Language {
        &self.from
    }

    pub fn to(&self) -> &Language {
        &self.to
    }

    /// Number of stored answers that confirming will discard.
    pub fn answers_at_risk(&self) -> usize {
        self.answers_at_risk
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    Moved(Position),
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retreat {
    Moved(Position),
    AtStart,
}

/// One row of the section overview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverviewEntry {
    pub summary: SectionSummary,
    pub answered: usize,
    pub is_complete: bool,
    pub is_current: bool,
}

struct Active {
    sequence: EffectiveSequence,
    session: ProgressSession,
    overview: bool,
}

enum Phase {
    Selecting {
        stored: Option<ProgressSession>,
    },
    Active(Box<Active>),
    Complete {
        session: ProgressSession,
        sequence: Option<EffectiveSequence>,
    },
    Closed,
}

impl Phase {
    fn label(&self) -> &'static str {
        match self {
            Phase::Selecting { .. } => "selecting a language",
            Phase::Active(_) => "answering",
            Phase::Complete { .. } => "complete",
            Phase::Closed => "closed",
        }
    }
}

/// Drives one participant's questionnaire session.
///
/// Every mutating operation takes `&mut self` and awaits the store's
/// confirmation before touching local state, so operations are strictly
/// serialized and a failed write leaves the cursor and answers unchanged.
/// Store calls run on a spawned task: dropping the returned future does not
/// cancel a write that is already in flight.
pub struct IntakeController {
    definition: Arc<Questionnaire>,
    store: Arc<dyn ProgressStore>,
    clock: Arc<dyn Clock>,
    participant: Participant,
    found: Existing,
    phase: Phase,
}

impl IntakeController {
    pub async fn open(
        definition: Arc<Questionnaire>,
        store: Arc<dyn ProgressStore>,
        participant: Participant,
    ) -> Result<Self, SessionError> {
        Self::open_with_clock(definition, store, participant, Arc::new(SystemClock)).await
    }

    pub async fn open_with_clock(
        definition: Arc<Questionnaire>,
        store: Arc<dyn ProgressStore>,
        participant: Participant,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, SessionError> {
        // Refuse up front when nothing applies to this participant.
        let default_language = definition.default_language()?;
        EffectiveSequence::build(Arc::clone(&definition), &default_language, participant.gender)?;

        let key = participant.key();
        let stored = {
            let store = Arc::clone(&store);
            let key = key.clone();
            confirmed("get_session", async move { store.get_session(&key).await }).await?
        };

        let (found, phase) = match stored {
            Some(session) if session.is_complete => {
                tracing::info!(participant = %key, "questionnaire already complete");
                let sequence = EffectiveSequence::build(
                    Arc::clone(&definition),
                    &session.language,
                    participant.gender,
                )
                .ok();
                (Existing::Complete, Phase::Complete { session, sequence })
            }
            Some(session) => {
                tracing::debug!(
                    participant = %key,
                    language = %session.language,
                    answered = session.answers.len(),
                    "found resumable session"
                );
                (
                    Existing::Resumable {
                        language: session.language.clone(),
                        answered: session.answers.len(),
                    },
                    Phase::Selecting {
                        stored: Some(session),
                    },
                )
            }
            None => (Existing::None, Phase::Selecting { stored: None }),
        };

        Ok(Self {
            definition,
            store,
            clock,
            participant,
            found,
            phase,
        })
    }

    pub fn participant(&self) -> &Participant {
        &self.participant
    }

    pub fn definition(&self) -> &Arc<Questionnaire> {
        &self.definition
    }

    pub fn existing(&self) -> &Existing {
        &self.found
    }

    pub fn screen(&self) -> Screen {
        match &self.phase {
            Phase::Selecting { .. } => Screen::LanguageSelection,
            Phase::Active(active) if active.overview => Screen::SectionOverview,
            Phase::Active(_) => Screen::Question,
            Phase::Complete { .. } => Screen::Complete,
            Phase::Closed => Screen::Closed,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self.phase, Phase::Complete { .. })
    }

    pub fn session(&self) -> Option<&ProgressSession> {
        match &self.phase {
            Phase::Active(active) => Some(&active.session),
            Phase::Complete { session, .. } => Some(session),
            Phase::Selecting { .. } | Phase::Closed => None,
        }
    }

    pub fn sequence(&self) -> Option<&EffectiveSequence> {
        match &self.phase {
            Phase::Active(active) => Some(&active.sequence),
            Phase::Complete { sequence, .. } => sequence.as_ref(),
            Phase::Selecting { .. } | Phase::Closed => None,
        }
    }

    pub fn current_position(&self) -> Option<Position> {
        self.active().map(|active| active.session.current_position)
    }

    pub fn current_question(&self) -> Option<QuestionView> {
        let active = self.active()?;
        active.sequence.view(active.session.current_position)
    }

    /// Stored answer for the question under the cursor, for pre-filling.
    pub fn current_answer(&self) -> Option<&Answer> {
        let active = self.active()?;
        let question = active
            .sequence
            .position_to_question(active.session.current_position)?;
        active.session.answers.get(&question.id)
    }

    /// Whether "previous" should be offered.
    pub fn can_retreat(&self) -> bool {
        self.active().is_some_and(|active| {
            matches!(
                navigator::previous(&active.sequence, active.session.current_position),
                Some(Step::At(_))
            )
        })
    }

    pub fn overall_progress(&self) -> Option<OverallProgress> {
        let (sequence, session) = self.sequence().zip(self.session())?;
        Some(overall_progress(sequence, &session.answers))
    }

    pub fn section_progress(&self) -> Option<Vec<SectionProgress>> {
        let (sequence, session) = self.sequence().zip(self.session())?;
        Some(per_section_progress(sequence, &session.answers))
    }

    pub fn part_progress(&self) -> Option<Vec<PartProgress>> {
        let (sequence, session) = self.sequence().zip(self.session())?;
        Some(per_part_progress(sequence, &session.answers))
    }

    pub fn section_overview(&self) -> Option<Vec<OverviewEntry>> {
        let active = self.active()?;
        let current = active.session.current_position;
        let progress = per_section_progress(&active.sequence, &active.session.answers);
        Some(
            active
                .sequence
                .section_summaries()
                .into_iter()
                .zip(progress)
                .map(|(summary, progress)| OverviewEntry {
                    is_current: summary.first.part == current.part
                        && summary.first.section == current.section,
                    answered: progress.answered,
                    is_complete: progress.is_complete,
                    summary,
                })
                .collect(),
        )
    }

    /// Starts, resumes or (after confirmation) restarts the session.
    pub async fn choose_language(
        &mut self,
        requested: &Language,
    ) -> Result<LanguageOutcome, SessionError> {
        let stored = match &self.phase {
            Phase::Selecting { stored } => stored.clone(),
            Phase::Complete { .. } => return Ok(LanguageOutcome::AlreadyComplete),
            _ => return Err(self.invalid("choose_language")),
        };

        let sequence = EffectiveSequence::build(
            Arc::clone(&self.definition),
            requested,
            self.participant.gender,
        )?;
        let language = sequence.language().clone();

        match stored {
            Some(session) if session.language == language => self.resume(session, sequence).await,
            Some(session) => Ok(LanguageOutcome::ConfirmationRequired(
                self.pending_restart(&session, language),
            )),
            None => self.start_fresh(sequence).await,
        }
    }

    /// Discards the stored session and starts over in the pending language.
    pub async fn confirm_restart(&mut self, pending: PendingRestart) -> Result<(), SessionError> {
        let still_valid = matches!(
            &self.phase,
            Phase::Selecting { stored: Some(session) }
                if session.key() == pending.key && session.language == pending.from
        );
        if !still_valid {
            return Err(SessionError::StaleConfirmation);
        }

        let sequence = EffectiveSequence::build(
            Arc::clone(&self.definition),
            &pending.to,
            self.participant.gender,
        )?;

        let store = self.store();
        let key = pending.key.clone();
        confirmed("reset_session", async move { store.reset_session(&key).await }).await?;
        tracing::info!(
            participant = %pending.key,
            from = %pending.from,
            to = %pending.to,
            discarded = pending.answers_at_risk,
            "session reset for language change"
        );
        self.phase = Phase::Selecting { stored: None };
        self.found = Existing::None;

        match self.start_fresh(sequence).await? {
            LanguageOutcome::Started | LanguageOutcome::Resumed { .. } => Ok(()),
            LanguageOutcome::AlreadyComplete => Err(SessionError::AlreadyComplete),
            LanguageOutcome::ConfirmationRequired(_) => Err(SessionError::StaleConfirmation),
        }
    }

    /// Keeps the stored session untouched.
    pub fn decline_restart(&self, pending: PendingRestart) {
        tracing::debug!(
            participant = %pending.key,
            kept = %pending.from,
            "language change declined"
        );
    }

    /// Validates and stores an answer for the current question. The cursor stays put.
    pub async fn record_answer(&mut self, input: AnswerInput) -> Result<&Answer, SessionError> {
        let now = self.clock.now();
        let store = self.store();
        let key = self.participant.key();
        let active = self.active_mut("record_answer")?;

        let position = active.session.current_position;
        let answer = build_answer(&active.sequence, position, input, now)?;
        let record = answer.clone();
        confirmed("save_answer", async move { store.save_answer(&key, &record).await }).await?;

        let question_id = answer.question_id.clone();
        tracing::debug!(question = %question_id, position = %position, "answer recorded");
        active.session.apply_answer(answer);
        active
            .session
            .answers
            .get(&question_id)
            .ok_or(SessionError::CursorLost(position))
    }

    /// Moves to the next question, completing the session after the last one.
    pub async fn advance(&mut self) -> Result<Advance, SessionError> {
        let now = self.clock.now();
        let store = self.store();
        let key = self.participant.key();
        let active = self.active_mut("advance")?;

        let position = active.session.current_position;
        let question = active
            .sequence
            .position_to_question(position)
            .ok_or(SessionError::CursorLost(position))?;
        if !active.session.answers.contains(&question.id) {
            return Err(SessionError::Unanswered {
                question_id: question.id.clone(),
                number: question.number.clone(),
            });
        }

        match navigator::next(&active.sequence, position) {
            Some(Step::At(next)) => {
                confirmed("update_position", async move {
                    store.update_position(&key, next, now).await
                })
                .await?;
                active.session.apply_position(next, now);
                active.overview = false;
                tracing::debug!(from = %position, to = %next, "advanced");
                Ok(Advance::Moved(next))
            }
            Some(Step::End) => {
                confirmed("mark_complete", async move { store.mark_complete(&key, now).await })
                    .await?;
                self.finish(now);
                Ok(Advance::Completed)
            }
            Some(Step::Start) | None => Err(SessionError::CursorLost(position)),
        }
    }

    /// Moves back one question. A no-op at the first question.
    pub async fn retreat(&mut self) -> Result<Retreat, SessionError> {
        let now = self.clock.now();
        let store = self.store();
        let key = self.participant.key();
        let active = self.active_mut("retreat")?;

        let position = active.session.current_position;
        match navigator::previous(&active.sequence, position) {
            Some(Step::At(previous)) => {
                confirmed("update_position", async move {
                    store.update_position(&key, previous, now).await
                })
                .await?;
                active.session.apply_position(previous, now);
                active.overview = false;
                tracing::debug!(from = %position, to = %previous, "retreated");
                Ok(Retreat::Moved(previous))
            }
            Some(Step::Start) => Ok(Retreat::AtStart),
            Some(Step::End) | None => Err(SessionError::CursorLost(position)),
        }
    }

    /// Places the cursor on the first question of a section from the overview.
    pub async fn jump_to_section(&mut self, target: Position) -> Result<(), SessionError> {
        let now = self.clock.now();
        let store = self.store();
        let key = self.participant.key();
        let active = self.active_mut("jump_to_section")?;

        if !active.sequence.is_section_start(target) {
            return Err(SessionError::NotASectionStart(target));
        }
        confirmed("update_position", async move {
            store.update_position(&key, target, now).await
        })
        .await?;
        active.session.apply_position(target, now);
        active.overview = false;
        tracing::debug!(to = %target, "jumped to section");
        Ok(())
    }

    pub fn show_overview(&mut self) -> Result<(), SessionError> {
        self.active_mut("show_overview")?.overview = true;
        Ok(())
    }

    pub fn close_overview(&mut self) -> Result<(), SessionError> {
        self.active_mut("close_overview")?.overview = false;
        Ok(())
    }

    /// Records the answer and, once stored, advances.
    pub async fn submit(&mut self, input: AnswerInput) -> Result<Advance, SessionError> {
        self.record_answer(input).await?;
        self.advance().await
    }

    /// Persists the cursor and leaves without completing.
    pub async fn save_and_exit(&mut self) -> Result<(), SessionError> {
        let now = self.clock.now();
        let store = self.store();
        let key = self.participant.key();
        let active = self.active_mut("save_and_exit")?;

        let position = active.session.current_position;
        confirmed("update_position", async move {
            store.update_position(&key, position, now).await
        })
        .await?;
        active.session.apply_position(position, now);
        tracing::info!(participant = %self.participant.key(), position = %position, "saved and exited");
        self.phase = Phase::Closed;
        Ok(())
    }

    async fn resume(
        &mut self,
        mut session: ProgressSession,
        sequence: EffectiveSequence,
    ) -> Result<LanguageOutcome, SessionError> {
        let notice = match sequence.resume_position(session.current_position, &session.answers) {
            Resume::Intact(_) => None,
            Resume::Relocated { stored, resumed_at } => {
                let now = self.clock.now();
                let store = self.store();
                let key = session.key();
                confirmed("update_position", async move {
                    store.update_position(&key, resumed_at, now).await
                })
                .await?;
                session.apply_position(resumed_at, now);
                Some(ResumeNotice::Relocated { stored, resumed_at })
            }
        };

        tracing::info!(
            participant = %session.key(),
            language = %session.language,
            position = %session.current_position,
            answered = session.answers.len(),
            "session resumed"
        );
        self.phase = Phase::Active(Box::new(Active {
            sequence,
            session,
            overview: false,
        }));
        Ok(LanguageOutcome::Resumed { notice })
    }

    async fn start_fresh(
        &mut self,
        sequence: EffectiveSequence,
    ) -> Result<LanguageOutcome, SessionError> {
        let session = ProgressSession::new(
            self.participant.key(),
            sequence.language().clone(),
            sequence.first(),
            self.clock.now(),
        );
        let store = self.store();
        let record = session.clone();
        let created =
            confirmed("create_session", async move { store.create_session(&record).await }).await;
        match created {
            Ok(()) => {}
            Err(SessionError::Store(StoreError::AlreadyExists(_))) => {
                return self.settle_existing(sequence).await;
            }
            Err(err) => return Err(err),
        }

        tracing::info!(
            participant = %session.key(),
            language = %session.language,
            total = sequence.total_question_count(),
            "session started"
        );
        self.phase = Phase::Active(Box::new(Active {
            sequence,
            session,
            overview: false,
        }));
        Ok(LanguageOutcome::Started)
    }

    /// A create was refused because a record is already stored, typically one
    /// written by an earlier attempt whose confirmation never arrived.
    async fn settle_existing(
        &mut self,
        sequence: EffectiveSequence,
    ) -> Result<LanguageOutcome, SessionError> {
        let store = self.store();
        let key = self.participant.key();
        let lookup = key.clone();
        let Some(session) =
            confirmed("get_session", async move { store.get_session(&lookup).await }).await?
        else {
            return Err(StoreError::AlreadyExists(key.to_string()).into());
        };
        tracing::debug!(
            participant = %key,
            language = %session.language,
            answered = session.answers.len(),
            "create refused, using the stored session"
        );

        if session.is_complete {
            self.found = Existing::Complete;
            let sequence = EffectiveSequence::build(
                Arc::clone(&self.definition),
                &session.language,
                self.participant.gender,
            )
            .ok();
            self.phase = Phase::Complete { session, sequence };
            return Ok(LanguageOutcome::AlreadyComplete);
        }

        self.found = Existing::Resumable {
            language: session.language.clone(),
            answered: session.answers.len(),
        };
        if session.language != *sequence.language() {
            let pending = self.pending_restart(&session, sequence.language().clone());
            self.phase = Phase::Selecting {
                stored: Some(session),
            };
            return Ok(LanguageOutcome::ConfirmationRequired(pending));
        }

        if session.answers.is_empty() && session.current_position == sequence.first() {
            tracing::info!(
                participant = %key,
                language = %session.language,
                total = sequence.total_question_count(),
                "session started"
            );
            self.phase = Phase::Active(Box::new(Active {
                sequence,
                session,
                overview: false,
            }));
            return Ok(LanguageOutcome::Started);
        }
        self.resume(session, sequence).await
    }

    fn pending_restart(&self, session: &ProgressSession, to: Language) -> PendingRestart {
        tracing::info!(
            participant = %self.participant.key(),
            from = %session.language,
            to = %to,
            "language change requires confirmation"
        );
        PendingRestart {
            key: session.key(),
            from: session.language.clone(),
            to,
            answers_at_risk: session.answers.len(),
        }
    }

    fn finish(&mut self, at: OffsetDateTime) {
        if let Phase::Active(active) = std::mem::replace(&mut self.phase, Phase::Closed) {
            let Active {
                sequence,
                mut session,
                ..
            } = *active;
            session.apply_completion(at);
            tracing::info!(
                participant = %session.key(),
                answered = session.answers.len(),
                "questionnaire completed"
            );
            self.phase = Phase::Complete {
                session,
                sequence: Some(sequence),
            };
        }
    }

    fn active(&self) -> Option<&Active> {
        match &self.phase {
            Phase::Active(active) => Some(&**active),
            _ => None,
        }
    }

    fn active_mut(&mut self, operation: &'static str) -> Result<&mut Active, SessionError> {
        match &mut self.phase {
            Phase::Active(active) => Ok(&mut **active),
            Phase::Complete { .. } => Err(SessionError::AlreadyComplete),
            other => Err(SessionError::InvalidState {
                operation,
                state: other.label(),
            }),
        }
    }

    fn invalid(&self, operation: &'static str) -> SessionError {
        SessionError::InvalidState {
            operation,
            state: self.phase.label(),
        }
    }

    fn store(&self) -> Arc<dyn ProgressStore> {
        Arc::clone(&self.store)
    }
}

/// Runs a store call to completion on its own task and reports the outcome.
async fn confirmed<T, F>(operation: &'static str, call: F) -> Result<T, SessionError>
where
    T: Send + 'static,
    F: Future<Output = Result<T, StoreError>> + Send + 'static,
{
    match tokio::spawn(call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => {
            tracing::warn!(operation, error = %err, "progress store call failed");
            Err(err.into())
        }
        Err(join) => {
            tracing::warn!(operation, error = %join, "progress store task did not finish");
            Err(StoreError::Interrupted(join.to_string()).into())
        }
    }
}
