//! Persistence contract for progress sessions.
//!
//! The session controller talks to storage exclusively through
//! [`ProgressStore`]. Two backends ship with the crate: [`MemoryStore`] for
//! tests and embedding, and [`FsStore`] which keeps one JSON document per
//! participant and gender on disk.

mod error;
#[cfg(feature = "fs")]
mod fs;
mod memory;

use async_trait::async_trait;
use intake_spec::{Answer, Position, ProgressSession, SessionKey};
use time::OffsetDateTime;

pub use error::StoreError;
#[cfg(feature = "fs")]
pub use fs::FsStore;
pub use memory::MemoryStore;

/// Remote progress store.
///
/// Every operation may fail; callers must surface failures instead of
/// assuming the write happened. `save_answer` and `update_position` are
/// idempotent, so retrying a failed call is always safe.
#[async_trait]
pub trait ProgressStore: Send + Sync + 'static {
    async fn get_session(&self, key: &SessionKey) -> Result<Option<ProgressSession>, StoreError>;

    /// Stores a freshly created session. Fails with `AlreadyExists` if one is present.
    async fn create_session(&self, session: &ProgressSession) -> Result<(), StoreError>;

    /// Upserts `answer` keyed by its question id.
    async fn save_answer(&self, key: &SessionKey, answer: &Answer) -> Result<(), StoreError>;

    async fn update_position(
        &self,
        key: &SessionKey,
        position: Position,
        at: OffsetDateTime,
    ) -> Result<(), StoreError>;

    async fn mark_complete(&self, key: &SessionKey, at: OffsetDateTime) -> Result<(), StoreError>;

    /// Destroys the stored session and all of its answers.
    async fn reset_session(&self, key: &SessionKey) -> Result<(), StoreError>;
}

/// Applies a mutation to an in-flight record, shared by the bundled backends.
pub(crate) enum Mutation<'a> {
    Answer(&'a Answer),
    Position(Position, OffsetDateTime),
    Complete(OffsetDateTime),
}

impl Mutation<'_> {
    pub(crate) fn apply(self, session: &mut ProgressSession) -> Result<(), StoreError> {
        if session.is_complete {
            // A repeated completion is a retry of a write that already landed.
            if matches!(self, Mutation::Complete(_)) {
                return Ok(());
            }
            return Err(StoreError::Completed(session.key().to_string()));
        }
        match self {
            Mutation::Answer(answer) => session.apply_answer(answer.clone()),
            Mutation::Position(position, at) => session.apply_position(position, at),
            Mutation::Complete(at) => session.apply_completion(at),
        }
        Ok(())
    }
}
