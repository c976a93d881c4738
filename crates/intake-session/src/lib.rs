//! Session controller for participant intake.
//!
//! [`IntakeController`] owns one participant's walk through a questionnaire:
//! language selection, resuming stored progress, answering, free navigation
//! between sections and completion. Local state only changes after the
//! [`intake_store::ProgressStore`] has confirmed the matching write.

mod controller;
mod error;

pub use controller::{
    Advance, Clock, Existing, IntakeController, LanguageOutcome, OverviewEntry, Participant,
    PendingRestart, ResumeNotice, Retreat, Screen, SystemClock,
};
pub use error::SessionError;
