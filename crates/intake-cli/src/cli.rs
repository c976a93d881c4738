use std::ffi::OsString;
use std::path::PathBuf;

use anyhow::{Error, Result};
use clap::{Arg, ArgAction, CommandFactory, FromArgMatches, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::cmd::{
    self, check::CheckArgs, interview::InterviewArgs, outline::OutlineArgs, status::StatusArgs,
};
use crate::config::{IntakeConfig, Settings};

const LOG_ENV: &str = "INTAKE_LOG";

#[derive(Parser, Debug)]
#[command(
    name = "intake",
    about = "Resumable participant intake questionnaires",
    version,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Language for messages (en or pt)
    #[arg(long = "locale", value_name = "LOCALE", global = true)]
    locale: Option<String>,

    /// Configuration file (defaults to $INTAKE_CONFIG or the per-user intake.toml)
    #[arg(long = "config", value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    /// Questionnaire definition JSON (defaults to the bundled sample)
    #[arg(long = "definition", value_name = "PATH", global = true)]
    definition: Option<PathBuf>,

    /// Directory holding stored sessions
    #[arg(long = "data-dir", value_name = "DIR", global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate the questionnaire definition
    Check(CheckArgs),
    /// List the sections a participant will see
    Outline(OutlineArgs),
    /// Print the JSON Schema of the definition format
    Schema,
    /// Show the stored progress of a participant
    Status(StatusArgs),
    /// Answer the questionnaire interactively
    Interview(InterviewArgs),
}

pub async fn main() -> Result<()> {
    let argv: Vec<OsString> = std::env::args_os().collect();
    init_tracing();

    // The config file may carry the locale, and help text is localized before clap runs.
    let early_config = cmd::i18n::flag_from_argv(&argv, "--config").map(PathBuf::from);
    let early_locale = cmd::i18n::flag_from_argv(&argv, "--locale").or_else(|| {
        IntakeConfig::load(early_config.as_deref())
            .ok()
            .and_then(|config| config.locale)
    });
    cmd::i18n::init(early_locale.as_deref());
    tracing::debug!(locale = cmd::i18n::selected_locale(), "message catalog selected");

    let mut command = localize_help(Cli::command(), true);
    let matches = match command.try_get_matches_from_mut(argv) {
        Ok(matches) => matches,
        Err(err) => err.exit(),
    };
    let cli = Cli::from_arg_matches(&matches).map_err(|err| Error::msg(err.to_string()))?;

    if let Commands::Schema = cli.command {
        return cmd::schema::run();
    }

    let config = IntakeConfig::load(cli.config.as_deref())?;
    let settings = Settings::resolve(config, cli.definition, cli.data_dir)?;
    match cli.command {
        Commands::Check(args) => cmd::check::run(args, &settings),
        Commands::Outline(args) => cmd::outline::run(args, &settings),
        Commands::Schema => cmd::schema::run(),
        Commands::Status(args) => cmd::status::run(args, &settings).await,
        Commands::Interview(args) => cmd::interview::run(args, &settings).await,
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn localize_help(mut command: clap::Command, is_root: bool) -> clap::Command {
    if let Some(about) = command.get_about().map(|s| s.to_string()) {
        command = command.about(cmd::i18n::tr_lit(&about));
    }
    if let Some(long_about) = command.get_long_about().map(|s| s.to_string()) {
        command = command.long_about(cmd::i18n::tr_lit(&long_about));
    }

    command = command
        .disable_help_subcommand(true)
        .disable_help_flag(true)
        .arg(
            Arg::new("help")
                .short('h')
                .long("help")
                .action(ArgAction::Help)
                .help(cmd::i18n::tr_lit("Print help")),
        );
    if is_root {
        command = command.disable_version_flag(true).arg(
            Arg::new("version")
                .short('V')
                .long("version")
                .action(ArgAction::Version)
                .help(cmd::i18n::tr_lit("Print version")),
        );
    }

    let arg_ids = command
        .get_arguments()
        .map(|arg| arg.get_id().clone())
        .collect::<Vec<_>>();
    for arg_id in arg_ids {
        command = command.mut_arg(arg_id, |arg| {
            let mut arg = arg;
            if let Some(help) = arg.get_help().map(ToString::to_string) {
                arg = arg.help(cmd::i18n::tr_lit(&help));
            }
            arg
        });
    }

    let sub_names = command
        .get_subcommands()
        .map(|sub| sub.get_name().to_string())
        .collect::<Vec<_>>();
    for name in sub_names {
        command = command.mut_subcommand(name, |sub| localize_help(sub, false));
    }
    command
}
