use std::sync::Arc;

use anyhow::{Result, bail};
use clap::Args;
use intake_spec::{DefinitionError, EffectiveSequence, Gender};
use serde::Serialize;

use crate::cmd::i18n::{tr, trf};
use crate::config::Settings;

#[derive(Args, Debug, Clone)]
pub struct CheckArgs {
    /// Emit the summary as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct GenderTotal {
    gender: Gender,
    questions: usize,
    sections: usize,
}

#[derive(Debug, Serialize)]
struct CheckReport {
    id: String,
    version: String,
    languages: Vec<String>,
    default_language: String,
    totals: Vec<GenderTotal>,
}

pub fn run(args: CheckArgs, settings: &Settings) -> Result<()> {
    let definition = match settings.load_definition() {
        Ok(definition) => definition,
        Err(err) => {
            if let Some(DefinitionError::Invalid(issues)) = err.downcast_ref::<DefinitionError>() {
                for issue in issues {
                    eprintln!("{}", trf("check.issue", &[("issue", issue.to_string())]));
                }
                bail!(trf("check.invalid", &[("count", issues.len().to_string())]));
            }
            return Err(err);
        }
    };

    let language = definition.default_language()?;
    let totals = Gender::ALL
        .iter()
        .map(|gender| {
            let sequence = EffectiveSequence::build(Arc::clone(&definition), &language, *gender)?;
            Ok(GenderTotal {
                gender: *gender,
                questions: sequence.total_question_count(),
                sections: sequence.section_summaries().len(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let report = CheckReport {
        id: definition.id.clone(),
        version: definition.version.clone(),
        languages: definition.languages.clone(),
        default_language: definition.default_language.clone(),
        totals,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!(
        "{}",
        trf(
            "check.valid",
            &[("id", report.id.clone()), ("version", report.version.clone())]
        )
    );
    println!(
        "{}",
        trf(
            "check.languages",
            &[
                ("languages", report.languages.join(", ")),
                ("default", report.default_language.clone()),
            ]
        )
    );
    println!("{}", tr("check.totals"));
    for total in &report.totals {
        println!(
            "{}",
            trf(
                "check.gender_total",
                &[
                    ("gender", total.gender.to_string()),
                    ("questions", total.questions.to_string()),
                    ("sections", total.sections.to_string()),
                ]
            )
        );
    }
    Ok(())
}
