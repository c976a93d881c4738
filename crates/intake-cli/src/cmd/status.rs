use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use intake_spec::{
    EffectiveSequence, Gender, OverallProgress, ParticipantId, Position, ProgressSession,
    SectionProgress, SessionKey, overall_progress, per_section_progress,
};
use intake_store::ProgressStore;
use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::cmd::i18n::{tr, trf};
use crate::config::Settings;

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    /// Participant identifier
    #[arg(long, value_name = "ID")]
    pub participant: String,

    /// Participant gender (male or female)
    #[arg(long, value_name = "GENDER")]
    pub gender: Gender,

    /// Emit the report as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct StatusReport {
    participant: String,
    gender: Gender,
    language: String,
    is_complete: bool,
    current_position: Position,
    #[serde(skip_serializing_if = "Option::is_none")]
    current_question: Option<String>,
    started_at: String,
    last_updated_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    completed_at: Option<String>,
    overall: OverallProgress,
    sections: Vec<SectionProgress>,
}

fn timestamp(at: OffsetDateTime) -> Result<String> {
    Ok(at.format(&Rfc3339)?)
}

fn report(session: &ProgressSession, sequence: &EffectiveSequence) -> Result<StatusReport> {
    Ok(StatusReport {
        participant: session.participant_id.to_string(),
        gender: session.gender,
        language: session.language.to_string(),
        is_complete: session.is_complete,
        current_position: session.current_position,
        current_question: sequence
            .position_to_question(session.current_position)
            .map(|question| question.number.clone()),
        started_at: timestamp(session.started_at)?,
        last_updated_at: timestamp(session.last_updated_at)?,
        completed_at: session.completed_at.map(timestamp).transpose()?,
        overall: overall_progress(sequence, &session.answers),
        sections: per_section_progress(sequence, &session.answers),
    })
}

pub async fn run(args: StatusArgs, settings: &Settings) -> Result<()> {
    let key = SessionKey::new(ParticipantId::new(args.participant), args.gender);
    let store = settings.store();
    let Some(session) = store.get_session(&key).await? else {
        if args.json {
            println!("null");
        } else {
            println!("{}", trf("status.none", &[("key", key.to_string())]));
        }
        return Ok(());
    };

    let definition = settings.load_definition()?;
    let sequence = EffectiveSequence::build(Arc::clone(&definition), &session.language, key.gender)?;
    let report = report(&session, &sequence)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let state = if report.is_complete {
        tr("status.complete")
    } else {
        tr("status.in_progress")
    };
    println!(
        "{}",
        trf(
            "status.summary",
            &[
                ("key", key.to_string()),
                ("language", report.language.clone()),
                ("state", state),
            ]
        )
    );
    println!(
        "{}",
        trf(
            "status.overall",
            &[
                ("answered", report.overall.answered.to_string()),
                ("total", report.overall.total.to_string()),
                ("percent", report.overall.percent.to_string()),
            ]
        )
    );
    if let Some(number) = &report.current_question
        && !report.is_complete
    {
        println!("{}", trf("status.current", &[("number", number.clone())]));
    }
    for section in &report.sections {
        let marker = if section.is_complete { "x" } else { " " };
        println!(
            "  [{marker}] {} {}/{}",
            section.title, section.answered, section.total
        );
    }
    Ok(())
}
