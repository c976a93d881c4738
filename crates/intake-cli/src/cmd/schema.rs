use anyhow::Result;
use intake_spec::Questionnaire;

pub fn run() -> Result<()> {
    let schema = Questionnaire::json_schema();
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}
