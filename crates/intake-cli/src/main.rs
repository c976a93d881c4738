mod cli;
mod cmd;
mod config;

use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    match cli::main().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}: {err:#}", cmd::i18n::tr("cli.error"));
            ExitCode::FAILURE
        }
    }
}
