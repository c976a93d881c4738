#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use intake_session::{Clock, IntakeController, Participant};
use intake_spec::{
    Answer, Gender, Language, Position, ProgressSession, Questionnaire, SessionKey,
};
use intake_store::{MemoryStore, ProgressStore, StoreError};
use serde_json::{Value, json};
use time::OffsetDateTime;
use time::macros::datetime;

fn text(en: &str, pt: &str) -> Value {
    json!({ "en": en, "pt": pt })
}

/// Female: a1 (3 questions) then b1 (2). Male: a1 (2), a2 (1), b1 (2).
pub fn definition_value() -> Value {
    json!({
        "id": "clinic-intake",
        "version": "2",
        "languages": ["en", "pt"],
        "default_language": "en",
        "parts": [
            {
                "id": "a",
                "title": text("General", "Geral"),
                "sections": [
                    {
                        "id": "a1",
                        "title": text("History", "Histórico"),
                        "questions": [
                            { "id": "a1q1", "number": "1", "text": text("Age?", "Idade?"), "type": "free_text" },
                            { "id": "a1q2", "number": "2", "text": text("Cycle length?", "Duração do ciclo?"), "type": "free_text", "gender": "female" },
                            { "id": "a1q3", "number": "3", "text": text("Smoker?", "Fumante?"), "type": "single_choice",
                              "options": [text("Yes", "Sim"), text("No", "Não")],
                              "follow_up": text("How many per day?", "Quantos por dia?") }
                        ]
                    },
                    {
                        "id": "a2",
                        "title": text("Andrology", "Andrologia"),
                        "questions": [
                            { "id": "a2q1", "number": "4", "text": text("Prior semen analysis?", "Espermograma prévio?"), "type": "free_text", "gender": "male" }
                        ]
                    }
                ]
            },
            {
                "id": "b",
                "title": text("Lifestyle", "Estilo de vida"),
                "sections": [
                    {
                        "id": "b1",
                        "title": text("Habits", "Hábitos"),
                        "questions": [
                            { "id": "b1q1", "number": "5", "text": text("Exercise?", "Exercício?"), "type": "single_choice",
                              "allow_multiple": true,
                              "options": [text("Walking", "Caminhada"), text("Running", "Corrida")] },
                            { "id": "b1q2", "number": "6", "text": text("Diet notes", "Notas de dieta"), "type": "free_text" }
                        ]
                    }
                ]
            }
        ]
    })
}

pub fn definition() -> Arc<Questionnaire> {
    Arc::new(Questionnaire::from_value(definition_value()).expect("fixture definition is valid"))
}

pub fn en() -> Language {
    Language::parse("en").expect("en")
}

pub fn pt() -> Language {
    Language::parse("pt").expect("pt")
}

pub fn participant(gender: Gender) -> Participant {
    Participant::new("couple-17", gender)
}

pub fn key(gender: Gender) -> SessionKey {
    participant(gender).key()
}

/// Advances one minute on every reading so timestamps are distinct and predictable.
pub struct TickingClock(Mutex<OffsetDateTime>);

impl TickingClock {
    pub fn new() -> Arc<Self> {
        Arc::new(Self(Mutex::new(datetime!(2026-04-01 09:00 UTC))))
    }
}

impl Clock for TickingClock {
    fn now(&self) -> OffsetDateTime {
        let mut current = self.0.lock().expect("clock lock");
        *current += time::Duration::minutes(1);
        *current
    }
}

/// Memory store whose writes can be made to fail or to stall.
#[derive(Default)]
pub struct FlakyStore {
    pub inner: MemoryStore,
    failing: AtomicBool,
    delay: Option<Duration>,
}

impl FlakyStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn seeded(sessions: impl IntoIterator<Item = ProgressSession>) -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryStore::with_sessions(sessions),
            ..Self::default()
        })
    }

    pub fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay: Some(delay),
            ..Self::default()
        })
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    async fn gate(&self) -> Result<(), StoreError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("connection reset".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl ProgressStore for FlakyStore {
    async fn get_session(&self, key: &SessionKey) -> Result<Option<ProgressSession>, StoreError> {
        self.inner.get_session(key).await
    }

    async fn create_session(&self, session: &ProgressSession) -> Result<(), StoreError> {
        self.gate().await?;
        self.inner.create_session(session).await
    }

    async fn save_answer(&self, key: &SessionKey, answer: &Answer) -> Result<(), StoreError> {
        self.gate().await?;
        self.inner.save_answer(key, answer).await
    }

    async fn update_position(
        &self,
        key: &SessionKey,
        position: Position,
        at: OffsetDateTime,
    ) -> Result<(), StoreError> {
        self.gate().await?;
        self.inner.update_position(key, position, at).await
    }

    async fn mark_complete(&self, key: &SessionKey, at: OffsetDateTime) -> Result<(), StoreError> {
        self.gate().await?;
        self.inner.mark_complete(key, at).await
    }

    async fn reset_session(&self, key: &SessionKey) -> Result<(), StoreError> {
        self.gate().await?;
        self.inner.reset_session(key).await
    }
}

pub async fn open(store: &Arc<FlakyStore>, gender: Gender) -> IntakeController {
    let store: Arc<dyn ProgressStore> = store.clone();
    IntakeController::open_with_clock(definition(), store, participant(gender), TickingClock::new())
        .await
        .expect("controller opens")
}

pub async fn stored(store: &FlakyStore, gender: Gender) -> ProgressSession {
    store
        .inner
        .get_session(&key(gender))
        .await
        .expect("store readable")
        .expect("session stored")
}
