use std::collections::BTreeMap;

use async_trait::async_trait;
use intake_spec::{Answer, Position, ProgressSession, SessionKey};
use time::OffsetDateTime;
use tokio::sync::RwLock;

use crate::{Mutation, ProgressStore, StoreError};

/// Process-local store backed by a map.
#[derive(Debug, Default)]
pub struct MemoryStore {
    sessions: RwLock<BTreeMap<SessionKey, ProgressSession>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `sessions`, keyed by their participant and gender.
    pub fn with_sessions(sessions: impl IntoIterator<Item = ProgressSession>) -> Self {
        Self {
            sessions: RwLock::new(
                sessions
                    .into_iter()
                    .map(|session| (session.key(), session))
                    .collect(),
            ),
        }
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    async fn mutate(&self, key: &SessionKey, mutation: Mutation<'_>) -> Result<(), StoreError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(key)
            .ok_or_else(|| StoreError::NotFound(key.to_string()))?;
        mutation.apply(session)
    }
}

#[async_trait]
impl ProgressStore for MemoryStore {
    async fn get_session(&self, key: &SessionKey) -> Result<Option<ProgressSession>, StoreError> {
        Ok(self.sessions.read().await.get(key).cloned())
    }

    async fn create_session(&self, session: &ProgressSession) -> Result<(), StoreError> {
        let key = session.key();
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&key) {
            return Err(StoreError::AlreadyExists(key.to_string()));
        }
        sessions.insert(key, session.clone());
        Ok(())
    }

    async fn save_answer(&self, key: &SessionKey, answer: &Answer) -> Result<(), StoreError> {
        self.mutate(key, Mutation::Answer(answer)).await
    }

    async fn update_position(
        &self,
        key: &SessionKey,
        position: Position,
        at: OffsetDateTime,
    ) -> Result<(), StoreError> {
        self.mutate(key, Mutation::Position(position, at)).await
    }

    async fn mark_complete(&self, key: &SessionKey, at: OffsetDateTime) -> Result<(), StoreError> {
        self.mutate(key, Mutation::Complete(at)).await
    }

    async fn reset_session(&self, key: &SessionKey) -> Result<(), StoreError> {
        self.sessions.write().await.remove(key);
        Ok(())
    }
}
