use anyhow::Result;
use cold_outreach::utils::validation::Validate;
use cold_outreach::{
    AppConfig, EmailGenerator, LocalStorage, OpenAiClient, Orchestrator, PromptRenderer,
    RunOutcome, SelectionMode,
};
use httpmock::prelude::*;
use std::io::Cursor;
use tempfile::TempDir;

/// Batch run against a mocked chat-completions endpoint, configured from TOML.
#[tokio::test]
async fn test_batch_run_through_http_client() -> Result<()> {
    let temp_dir = TempDir::new()?;
    std::fs::write(
        temp_dir.path().join("companies.csv"),
        "Company;Revenue\nAcme;10M\nGlobex;20M\n",
    )?;

    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v1/chat/completions")
            .json_body_partial(r#"{"model": "gpt-3.5-turbo", "temperature": 0.8, "max_tokens": 300}"#)
            .body_contains("You are a helpful AI sales assistant.");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "Subject: Hi\n\nHello there"}}],
                "usage": {"prompt_tokens": 400, "completion_tokens": 100, "total_tokens": 500}
            }));
    });

    let config = AppConfig::from_toml_str(&format!(
        r#"
[sources]
primary_path = "companies.csv"

[generation]
base_url = "{}"
api_key = "sk-test"

[output]
path = "emails.csv"
"#,
        server.url("/v1")
    ))?;
    config.validate()?;

    let client = OpenAiClient::new(
        config.generation.base_url.clone(),
        config.api_key(),
        config.request_timeout(),
    )?;
    let generator = EmailGenerator::new(
        client,
        PromptRenderer::new(config.prompt.sender.clone()),
        config.generation_settings(),
    );
    let storage = LocalStorage::new(temp_dir.path().to_str().unwrap().to_string());
    let orchestrator = Orchestrator::new(storage, generator, config.run_settings()?);

    let mut out = Vec::new();
    let report = orchestrator
        .run(SelectionMode::Batch, &mut Cursor::new("1\n0\nstop\n"), &mut out)
        .await?;

    api_mock.assert_hits(2);
    assert!(matches!(report.outcome, RunOutcome::Completed { .. }));
    assert_eq!(report.totals.total_tokens, 1000);
    assert_eq!(report.rows[0].company, "Globex");
    assert_eq!(report.rows[0].estimated_cost, Some(500.0 / 1000.0 * 0.002));

    let table = std::fs::read_to_string(temp_dir.path().join("emails.csv"))?;
    assert!(table.starts_with("Index,Version,Company,GeneratedEmail"));
    assert!(table.contains("Hello there"));
    Ok(())
}

#[tokio::test]
async fn test_rate_limited_company_is_recorded_empty() -> Result<()> {
    let temp_dir = TempDir::new()?;
    std::fs::write(temp_dir.path().join("companies.csv"), "Company\nAcme\n")?;

    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(POST).path("/chat/completions");
        then.status(429).body(r#"{"error": {"message": "Rate limit reached"}}"#);
    });

    let config = AppConfig::from_toml_str(&format!(
        "[generation]\nbase_url = \"{}\"\napi_key = \"sk-test\"\n[output]\npath = \"emails.csv\"\n",
        server.base_url()
    ))?;
    let client = OpenAiClient::new(
        config.generation.base_url.clone(),
        config.api_key(),
        config.request_timeout(),
    )?;
    let generator = EmailGenerator::new(client, PromptRenderer::default(), config.generation_settings());
    let storage = LocalStorage::new(temp_dir.path().to_str().unwrap().to_string());
    let orchestrator = Orchestrator::new(storage, generator, config.run_settings()?);

    let mut out = Vec::new();
    let report = orchestrator
        .run(SelectionMode::Single, &mut Cursor::new("0\n"), &mut out)
        .await?;

    // single call: no retry
    api_mock.assert_hits(1);
    assert_eq!(report.rows.len(), 1);
    assert!(report.rows[0].generated_email.is_empty());
    assert!(report.rows[0].estimated_cost.is_none());
    assert_eq!(report.totals.total_tokens, 0);
    Ok(())
}
