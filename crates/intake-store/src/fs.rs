use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use intake_spec::{Answer, Position, ProgressSession, SessionKey};
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use time::OffsetDateTime;
use tokio::sync::Mutex;

use crate::{Mutation, ProgressStore, StoreError};

/// One pretty-printed JSON file per session under `root`.
///
/// Writes go to a sibling temp file that is then renamed over the record, so
/// a crash mid-write leaves the previous version intact.
#[derive(Debug)]
pub struct FsStore {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, key: &SessionKey) -> PathBuf {
        let participant = utf8_percent_encode(key.participant_id.as_str(), NON_ALPHANUMERIC);
        self.root
            .join(format!("{participant}.{}.json", key.gender.as_str()))
    }

    async fn read(&self, key: &SessionKey) -> Result<Option<ProgressSession>, StoreError> {
        match tokio::fs::read(self.path_for(key)).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn write(&self, session: &ProgressSession) -> Result<(), StoreError> {
        let path = self.path_for(&session.key());
        tokio::fs::create_dir_all(&self.root).await?;
        let tmp = path.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(session)?;
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;
        tracing::trace!(path = %path.display(), "session record written");
        Ok(())
    }

    async fn mutate(&self, key: &SessionKey, mutation: Mutation<'_>) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut session = self
            .read(key)
            .await?
            .ok_or_else(|| StoreError::NotFound(key.to_string()))?;
        mutation.apply(&mut session)?;
        self.write(&session).await
    }
}

#[async_trait]
impl ProgressStore for FsStore {
    async fn get_session(&self, key: &SessionKey) -> Result<Option<ProgressSession>, StoreError> {
        self.read(key).await
    }

    async fn create_session(&self, session: &ProgressSession) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let key = session.key();
        if self.read(&key).await?.is_some() {
            return Err(StoreError::AlreadyExists(key.to_string()));
        }
        self.write(session).await
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
        let _guard = self.write_lock.lock().await;
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}
