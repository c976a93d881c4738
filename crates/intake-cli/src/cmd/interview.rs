use std::sync::Arc;

use anyhow::{Result, anyhow};
use clap::Args;
use intake_session::{
    Existing, IntakeController, LanguageOutcome, Participant, ResumeNotice, Retreat, Screen,
    SessionError,
};
use intake_spec::{AnswerInput, DefinitionError, Gender, Language, QuestionView};
use intake_store::ProgressStore;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::cmd::i18n::{tr, trf};
use crate::config::Settings;

#[derive(Args, Debug, Clone)]
pub struct InterviewArgs {
    /// Participant identifier
    #[arg(long, value_name = "ID")]
    pub participant: String,

    /// Participant gender (male or female)
    #[arg(long, value_name = "GENDER")]
    pub gender: Gender,

    /// Questionnaire language; asked interactively when omitted
    #[arg(long, value_name = "LANG")]
    pub language: Option<Language>,
}

pub async fn run(args: InterviewArgs, settings: &Settings) -> Result<()> {
    let definition = settings.load_definition()?;
    let store: Arc<dyn ProgressStore> = Arc::new(settings.store());
    let participant = Participant::new(args.participant, args.gender);
    let controller = IntakeController::open(definition, store, participant).await?;

    let mut interview = Interview::new(
        controller,
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
    );
    interview.run(args.language).await
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Back,
    Sections,
    Jump(usize),
    Exit,
    Unknown(String),
}

fn parse_command(line: &str) -> Option<Command> {
    let rest = line.strip_prefix(':')?;
    let mut words = rest.split_whitespace();
    Some(match (words.next(), words.next(), words.next()) {
        (Some("back"), None, None) => Command::Back,
        (Some("sections"), None, None) => Command::Sections,
        (Some("exit"), None, None) => Command::Exit,
        (Some("jump"), Some(n), None) => n
            .parse()
            .map(Command::Jump)
            .unwrap_or_else(|_| Command::Unknown(line.to_string())),
        _ => Command::Unknown(line.to_string()),
    })
}

/// Maps option numbers to labels; comma-separated picks for multi-select.
fn parse_answer(view: &QuestionView, line: &str) -> AnswerInput {
    if view.options.is_empty() {
        return AnswerInput::text(line);
    }
    let picks: Vec<String> = line
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(|token| match token.parse::<usize>() {
            Ok(n) if (1..=view.options.len()).contains(&n) => view.options[n - 1].clone(),
            _ => token.to_string(),
        })
        .collect();
    match picks.as_slice() {
        [] => AnswerInput::text(""),
        [single] if !view.allow_multiple => AnswerInput::text(single.clone()),
        _ => AnswerInput::choices(picks),
    }
}

fn is_yes(line: &str) -> bool {
    matches!(
        line.trim().to_lowercase().as_str(),
        "y" | "yes" | "s" | "sim"
    )
}

/// Line-oriented front end over an [`IntakeController`].
pub struct Interview<R, W> {
    controller: IntakeController,
    input: R,
    output: W,
}

impl<R, W> Interview<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(controller: IntakeController, input: R, output: W) -> Self {
        Self {
            controller,
            input,
            output,
        }
    }

    pub async fn run(&mut self, language: Option<Language>) -> Result<()> {
        if self.controller.is_complete() {
            return self.say(tr("interview.already_complete")).await;
        }
        if !self.select_language(language).await? {
            return Ok(());
        }

        loop {
            let keep_going = match self.controller.screen() {
                Screen::Question => self.question().await?,
                Screen::SectionOverview => self.overview().await?,
                Screen::Complete => {
                    return self.say(tr("interview.complete")).await;
                }
                Screen::LanguageSelection | Screen::Closed => return Ok(()),
            };
            if !keep_going {
                return self.leave().await;
            }
        }
    }

    async fn say(&mut self, line: impl AsRef<str>) -> Result<()> {
        self.output.write_all(line.as_ref().as_bytes()).await?;
        self.output.write_all(b"\n").await?;
        self.output.flush().await?;
        Ok(())
    }

    /// `None` once input is exhausted.
    async fn prompt(&mut self, text: impl AsRef<str>) -> Result<Option<String>> {
        self.output.write_all(text.as_ref().as_bytes()).await?;
        self.output.flush().await?;
        let mut line = String::new();
        if self.input.read_line(&mut line).await? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }

    /// Returns `false` when the participant never got past language selection.
    async fn select_language(&mut self, preset: Option<Language>) -> Result<bool> {
        let resumable = match self.controller.existing() {
            Existing::Resumable { language, answered } => Some((language.clone(), *answered)),
            _ => None,
        };
        if let Some((language, answered)) = &resumable {
            self.say(trf(
                "interview.found",
                &[
                    ("answered", answered.to_string()),
                    ("language", language.to_string()),
                ],
            ))
            .await?;
        }

        let mut requested = preset;
        loop {
            let language = match requested.take() {
                Some(language) => language,
                None => {
                    let definition = Arc::clone(self.controller.definition());
                    let offered = definition.languages.join(", ");
                    let Some(line) = self
                        .prompt(trf("interview.choose_language", &[("offered", offered)]))
                        .await?
                    else {
                        return Ok(false);
                    };
                    let line = line.trim();
                    if line.is_empty() {
                        match &resumable {
                            Some((language, _)) => language.clone(),
                            None => definition.default_language()?,
                        }
                    } else {
                        match Language::parse(line) {
                            Ok(language) => language,
                            Err(err) => {
                                self.say(err.to_string()).await?;
                                continue;
                            }
                        }
                    }
                }
            };

            match self.controller.choose_language(&language).await {
                Ok(LanguageOutcome::Started) => {
                    self.say(tr("interview.started")).await?;
                    return Ok(true);
                }
                Ok(LanguageOutcome::Resumed { notice }) => {
                    self.say(tr("interview.resumed")).await?;
                    if let Some(ResumeNotice::Relocated { .. }) = notice {
                        self.say(tr("interview.relocated")).await?;
                    }
                    return Ok(true);
                }
                Ok(LanguageOutcome::AlreadyComplete) => {
                    self.say(tr("interview.already_complete")).await?;
                    return Ok(false);
                }
                Ok(LanguageOutcome::ConfirmationRequired(pending)) => {
                    let question = trf(
                        "interview.confirm_restart",
                        &[
                            ("from", pending.from().to_string()),
                            ("to", pending.to().to_string()),
                            ("count", pending.answers_at_risk().to_string()),
                        ],
                    );
                    let Some(reply) = self.prompt(question).await? else {
                        return Ok(false);
                    };
                    if !is_yes(&reply) {
                        requested = Some(pending.from().clone());
                        self.controller.decline_restart(pending);
                        continue;
                    }
                    match self.controller.confirm_restart(pending).await {
                        Ok(()) => {
                            self.say(tr("interview.started")).await?;
                            return Ok(true);
                        }
                        Err(err) if err.is_retryable() => self.report(err).await?,
                        Err(err) => return Err(err.into()),
                    }
                }
                Err(
                    err @ SessionError::Definition(
                        DefinitionError::UnsupportedLanguage(_) | DefinitionError::InvalidLanguage(_),
                    ),
                ) => self.say(err.to_string()).await?,
                Err(err) if err.is_retryable() => self.report(err).await?,
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Shows the current question and handles one line of input.
    async fn question(&mut self) -> Result<bool> {
        let view = self
            .controller
            .current_question()
            .ok_or_else(|| anyhow!("no question under the cursor"))?;
        let percent = self
            .controller
            .overall_progress()
            .map_or(0, |progress| progress.percent);
        let current = self
            .controller
            .current_answer()
            .map(|answer| answer.value.display());

        self.say(trf(
            "interview.progress",
            &[
                ("part", view.part_title.clone()),
                ("section", view.section_title.clone()),
                ("ordinal", view.ordinal.to_string()),
                ("total", view.total.to_string()),
                ("percent", percent.to_string()),
            ],
        ))
        .await?;
        self.say(format!("{}. {}", view.number, view.text)).await?;
        for (idx, option) in view.options.iter().enumerate() {
            self.say(format!("  {}) {option}", idx + 1)).await?;
        }
        if view.allow_multiple {
            self.say(tr("interview.multiple_hint")).await?;
        }
        if let Some(current) = &current {
            self.say(trf("interview.current", &[("value", current.clone())]))
                .await?;
        }

        let Some(line) = self.prompt("> ").await? else {
            return Ok(false);
        };
        let line = line.trim();

        match parse_command(line) {
            Some(Command::Exit) => return Ok(false),
            Some(Command::Back) => match self.controller.retreat().await {
                Ok(Retreat::AtStart) => self.say(tr("interview.at_start")).await?,
                Ok(Retreat::Moved(_)) => {}
                Err(err) => self.report(err).await?,
            },
            Some(Command::Sections) => self.controller.show_overview()?,
            Some(Command::Jump(n)) => self.jump(n).await?,
            Some(Command::Unknown(raw)) => {
                self.say(trf("interview.unknown_command", &[("command", raw)]))
                    .await?;
            }
            None if line.is_empty() && current.is_some() => {
                if let Err(err) = self.controller.advance().await {
                    self.report(err).await?;
                }
            }
            None => {
                let mut input = parse_answer(&view, line);
                if let Some(follow_up) = &view.follow_up {
                    let Some(extra) = self
                        .prompt(trf("interview.follow_up", &[("prompt", follow_up.clone())]))
                        .await?
                    else {
                        return Ok(false);
                    };
                    if !extra.trim().is_empty() {
                        input = input.with_follow_up(extra.trim());
                    }
                }
                if let Err(err) = self.controller.submit(input).await {
                    self.report(err).await?;
                }
            }
        }
        Ok(true)
    }

    async fn overview(&mut self) -> Result<bool> {
        let entries = self.controller.section_overview().unwrap_or_default();
        self.say(tr("interview.sections")).await?;
        for (idx, entry) in entries.iter().enumerate() {
            let marker = if entry.is_complete {
                "x"
            } else if entry.is_current {
                ">"
            } else {
                " "
            };
            self.say(format!(
                "  {}. [{marker}] {} / {} ({}/{})",
                idx + 1,
                entry.summary.part_title,
                entry.summary.title,
                entry.answered,
                entry.summary.question_count
            ))
            .await?;
        }

        let Some(line) = self.prompt(tr("interview.pick_section")).await? else {
            return Ok(false);
        };
        match line.trim() {
            "" => self.controller.close_overview()?,
            ":exit" => return Ok(false),
            other => match other.parse::<usize>() {
                Ok(n) => self.jump(n).await?,
                Err(_) => {
                    self.say(trf("interview.no_such_section", &[("n", other.to_string())]))
                        .await?;
                }
            },
        }
        Ok(true)
    }

    /// Jumps to the start of the `n`th section (1-based) of the overview.
    async fn jump(&mut self, n: usize) -> Result<()> {
        let target = self
            .controller
            .section_overview()
            .and_then(|entries| n.checked_sub(1).and_then(|idx| entries.into_iter().nth(idx)))
            .map(|entry| entry.summary.first);
        match target {
            Some(position) => {
                if let Err(err) = self.controller.jump_to_section(position).await {
                    self.report(err).await?;
                }
                Ok(())
            }
            None => {
                self.say(trf("interview.no_such_section", &[("n", n.to_string())]))
                    .await
            }
        }
    }

    async fn leave(&mut self) -> Result<()> {
        self.controller.save_and_exit().await?;
        self.say(tr("interview.saved")).await
    }

    /// Shows recoverable errors inline; anything else aborts the interview.
    async fn report(&mut self, err: SessionError) -> Result<()> {
        if err.is_validation() || matches!(err, SessionError::NotASectionStart(_)) {
            self.say(trf("interview.invalid", &[("reason", err.to_string())]))
                .await
        } else if err.is_retryable() {
            self.say(trf("interview.save_failed", &[("reason", err.to_string())]))
                .await
        } else {
            Err(err.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use intake_spec::{AnswerValue, Position};
    use intake_store::MemoryStore;

    use super::*;

    fn sample_settings() -> Settings {
        Settings {
            definition: None,
            data_dir: PathBuf::from("unused"),
        }
    }

    async fn interview(
        store: &Arc<MemoryStore>,
        gender: Gender,
        script: &'static str,
    ) -> Interview<&'static [u8], Vec<u8>> {
        let definition = sample_settings().load_definition().expect("sample");
        let store: Arc<dyn ProgressStore> = store.clone();
        let controller =
            IntakeController::open(definition, store, Participant::new("p-1", gender))
                .await
                .expect("open");
        Interview::new(controller, script.as_bytes(), Vec::new())
    }

    fn transcript<R>(interview: &Interview<R, Vec<u8>>) -> String {
        String::from_utf8_lossy(&interview.output).into_owned()
    }

    fn view(options: &[&str], allow_multiple: bool) -> QuestionView {
        QuestionView {
            id: "q".into(),
            number: "1".into(),
            text: "Pick".into(),
            kind: intake_spec::QuestionKind::SingleChoice,
            allow_multiple,
            options: options.iter().map(|option| option.to_string()).collect(),
            follow_up: None,
            part_title: "Part".into(),
            section_title: "Section".into(),
            position: Position::default(),
            ordinal: 1,
            total: 1,
        }
    }

    #[test]
    fn commands_are_recognised() {
        assert_eq!(parse_command(":back"), Some(Command::Back));
        assert_eq!(parse_command(":jump 3"), Some(Command::Jump(3)));
        assert_eq!(
            parse_command(":jump x"),
            Some(Command::Unknown(":jump x".into()))
        );
        assert_eq!(parse_command(":exit"), Some(Command::Exit));
        assert_eq!(parse_command("33"), None);
    }

    #[test]
    fn option_numbers_map_to_labels() {
        let single = view(&["Yes", "No"], false);
        assert_eq!(parse_answer(&single, "2"), AnswerInput::text("No"));
        assert_eq!(parse_answer(&single, "Yes"), AnswerInput::text("Yes"));
        assert_eq!(parse_answer(&single, "7"), AnswerInput::text("7"));

        let multi = view(&["Walking", "Running", "Cycling"], true);
        assert_eq!(
            parse_answer(&multi, "3, 1"),
            AnswerInput::choices(["Cycling", "Walking"])
        );
    }

    #[tokio::test]
    async fn scripted_interview_saves_and_exits() {
        let store = Arc::new(MemoryStore::new());
        let mut session = interview(&store, Gender::Female, "en\n33\n:back\n\n:exit\n").await;
        session.run(None).await.expect("interview");

        let output = transcript(&session);
        assert!(output.contains("1. How old are you?"));
        assert!(output.contains("2. What is your occupation?"));

        let stored = store
            .get_session(&intake_spec::SessionKey::new(
                intake_spec::ParticipantId::new("p-1"),
                Gender::Female,
            ))
            .await
            .expect("readable")
            .expect("stored");
        assert_eq!(
            stored.answers.get("age").map(|answer| &answer.value),
            Some(&AnswerValue::Text("33".into()))
        );
        assert_eq!(stored.current_position, Position::new(0, 0, 1));
        assert!(!stored.is_complete);
    }

    #[tokio::test]
    async fn invalid_choice_is_reported_and_asked_again() {
        let store = Arc::new(MemoryStore::new());
        let mut session = interview(
            &store,
            Gender::Male,
            ":jump 2\nMaybe\n\n1\n10\n",
        )
        .await;
        session
            .run(Some(Language::parse("en").expect("en")))
            .await
            .expect("interview");

        let output = transcript(&session);
        assert!(output.contains("3. Do you smoke?"));
        assert!(output.contains("Maybe"));
        assert!(output.contains("4. How often do you drink alcohol?"));
    }

    #[tokio::test]
    async fn end_of_input_saves_progress() {
        let store = Arc::new(MemoryStore::new());
        let mut session = interview(&store, Gender::Male, "pt\n41\n").await;
        session.run(None).await.expect("interview");
        assert_eq!(session.controller.screen(), Screen::Closed);
        assert!(transcript(&session).contains("Qual é a sua idade?"));
    }
}
