use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use intake_spec::{EffectiveSequence, Gender, Language};

use crate::cmd::i18n::trf;
use crate::config::Settings;

#[derive(Args, Debug, Clone)]
pub struct OutlineArgs {
    /// Participant gender (male or female)
    #[arg(long, value_name = "GENDER")]
    pub gender: Gender,

    /// Questionnaire language (defaults to the definition's default)
    #[arg(long, value_name = "LANG")]
    pub language: Option<Language>,

    /// Emit the section summaries as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: OutlineArgs, settings: &Settings) -> Result<()> {
    let definition = settings.load_definition()?;
    let language = match args.language {
        Some(language) => language,
        None => definition.default_language()?,
    };
    let sequence = EffectiveSequence::build(Arc::clone(&definition), &language, args.gender)?;
    let sections = sequence.section_summaries();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&sections)?);
        return Ok(());
    }

    println!(
        "{}",
        trf(
            "outline.header",
            &[
                ("gender", args.gender.to_string()),
                ("language", sequence.language().to_string()),
                ("total", sequence.total_question_count().to_string()),
            ]
        )
    );
    let mut current_part = None;
    for (idx, section) in sections.iter().enumerate() {
        if current_part != Some(section.first.part) {
            current_part = Some(section.first.part);
            println!("{}", section.part_title);
        }
        println!(
            "{}",
            trf(
                "outline.section",
                &[
                    ("n", (idx + 1).to_string()),
                    ("title", section.title.clone()),
                    ("count", section.question_count.to_string()),
                ]
            )
        );
    }
    Ok(())
}
