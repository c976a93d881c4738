use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use tempfile::TempDir;

fn workspace() -> TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(dir.path().join("intake.toml"), "data_dir = \"sessions\"\n")
        .expect("write config");
    dir
}

fn intake(dir: &Path) -> Command {
    intake_in(dir, "en")
}

fn intake_in(dir: &Path, locale: &str) -> Command {
    let mut cmd = Command::cargo_bin("intake").expect("intake binary");
    cmd.env_remove("INTAKE_LOG")
        .env_remove("INTAKE_CONFIG")
        .arg("--locale")
        .arg(locale)
        .arg("--config")
        .arg(dir.join("intake.toml"));
    cmd
}

fn status_json(dir: &Path, participant: &str, gender: &str) -> Value {
    let output = intake(dir)
        .args(["status", "--participant", participant, "--gender", gender, "--json"])
        .output()
        .expect("status runs");
    assert!(output.status.success());
    serde_json::from_slice(&output.stdout).expect("status json")
}

#[test]
fn schema_describes_the_definition_format() {
    let dir = workspace();
    intake(dir.path())
        .arg("schema")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"default_language\""))
        .stdout(predicate::str::contains("\"parts\""));
}

#[test]
fn check_accepts_the_bundled_sample() {
    let dir = workspace();
    intake(dir.path())
        .arg("check")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Definition fertility-intake (version 1.0) is valid",
        ))
        .stdout(predicate::str::contains("male: 9 questions in 4 sections"))
        .stdout(predicate::str::contains("female: 10 questions in 5 sections"));
}

#[test]
fn check_lists_every_authoring_problem() {
    let dir = workspace();
    let definition = dir.path().join("broken.json");
    std::fs::write(
        &definition,
        r#"{
            "id": "broken",
            "version": "1",
            "languages": ["en"],
            "default_language": "en",
            "parts": [{
                "id": "a",
                "title": { "en": "A" },
                "sections": [{
                    "id": "s",
                    "title": { "en": "S" },
                    "questions": [
                        { "id": "q1", "number": "1", "text": { "en": "One" }, "type": "free_text" },
                        { "id": "q1", "number": "2", "text": { "en": "Two" }, "type": "single_choice" }
                    ]
                }]
            }]
        }"#,
    )
    .expect("write definition");

    intake(dir.path())
        .arg("--definition")
        .arg(&definition)
        .arg("check")
        .assert()
        .failure()
        .stderr(predicate::str::contains("question id 'q1' is used more than once"))
        .stderr(predicate::str::contains("choice question 'q1' has no options"));
}

#[test]
fn outline_follows_gender_and_language() {
    let dir = workspace();
    let output = intake(dir.path())
        .args(["outline", "--gender", "male", "--language", "pt-BR", "--json"])
        .output()
        .expect("outline runs");
    assert!(output.status.success());
    let sections: Value = serde_json::from_slice(&output.stdout).expect("json");
    let titles: Vec<&str> = sections
        .as_array()
        .expect("array")
        .iter()
        .filter_map(|section| section["title"].as_str())
        .collect();
    assert_eq!(
        titles,
        vec![
            "Sobre você",
            "Hábitos",
            "Exames anteriores",
            "Tentativas de gravidez"
        ]
    );
}

#[test]
fn status_without_a_session() {
    let dir = workspace();
    intake(dir.path())
        .args(["status", "--participant", "p-0", "--gender", "male"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No stored session for p-0/male"));
}

#[test]
fn messages_follow_the_locale_flag() {
    let dir = workspace();
    intake_in(dir.path(), "pt")
        .args(["status", "--participant", "p-0", "--gender", "male"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Nenhuma sessão armazenada"));
}

#[test]
fn interview_progress_survives_between_runs() {
    let dir = workspace();
    intake(dir.path())
        .args(["interview", "--participant", "p-9", "--gender", "female"])
        .write_stdin("en\n33\n:exit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("1. How old are you?"))
        .stdout(predicate::str::contains("Progress saved"));
    assert!(dir.path().join("sessions").is_dir());

    let status = status_json(dir.path(), "p-9", "female");
    assert_eq!(status["language"], "en");
    assert_eq!(status["is_complete"], false);
    assert_eq!(status["overall"]["answered"], 1);
    assert_eq!(status["overall"]["total"], 10);
    assert_eq!(status["current_position"]["question_index"], 1);

    // Declining the language switch resumes in the stored language.
    intake(dir.path())
        .args(["interview", "--participant", "p-9", "--gender", "female"])
        .write_stdin("pt\nn\n:exit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Saved progress found: 1 answer(s) in en.",
        ))
        .stdout(predicate::str::contains("Welcome back"))
        .stdout(predicate::str::contains("2. What is your occupation?"));
    assert_eq!(status_json(dir.path(), "p-9", "female")["overall"]["answered"], 1);
}

#[test]
fn finished_interview_is_not_reopened() {
    let dir = workspace();
    let answers = "41\nengineer\n2\n\n1\n1,2\n1\n2024\n2\n12\nnone\n";
    intake(dir.path())
        .args([
            "interview",
            "--participant",
            "p-3",
            "--gender",
            "male",
            "--language",
            "en",
        ])
        .write_stdin(answers)
        .assert()
        .success()
        .stdout(predicate::str::contains("All done"));

    let status = status_json(dir.path(), "p-3", "male");
    assert_eq!(status["is_complete"], true);
    assert_eq!(status["overall"]["percent"], 100);
    assert!(status["completed_at"].is_string());

    intake(dir.path())
        .args(["interview", "--participant", "p-3", "--gender", "male"])
        .write_stdin("en\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("already been completed"));
}
