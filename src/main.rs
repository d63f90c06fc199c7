use clap::Parser;
use cold_outreach::utils::error::ErrorSeverity;
use cold_outreach::utils::{logger, validation::Validate};
use cold_outreach::{
    CliConfig, EmailGenerator, LocalStorage, OpenAiClient, Orchestrator, OutreachError,
    PromptRenderer, RunOutcome, SelectionMode,
};

fn exit_code(e: &OutreachError) -> i32 {
    match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    }
}

fn fail(e: OutreachError) -> ! {
    tracing::error!(
        "❌ Run failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 Suggestion: {}", e.recovery_suggestion());
    std::process::exit(exit_code(&e));
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.log_json {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting cold-outreach");
    tracing::debug!("CLI config: {:?}", cli);

    let config = cli.resolve().unwrap_or_else(|e| fail(e));

    // 啟動時即驗證配置與金鑰，避免第一次呼叫 API 才失敗
    let checked = if cli.dry_run {
        config.validate_offline()
    } else {
        config.validate()
    };
    if let Err(e) = checked {
        fail(e);
    }

    let client = OpenAiClient::new(
        config.generation.base_url.clone(),
        config.api_key(),
        config.request_timeout(),
    )
    .unwrap_or_else(|e| fail(e));
    let generator = EmailGenerator::new(
        client,
        PromptRenderer::new(config.prompt.sender.clone()),
        config.generation_settings(),
    );
    let settings = config.run_settings().unwrap_or_else(|e| fail(e));
    let orchestrator = Orchestrator::new(LocalStorage::new(".".to_string()), generator, settings);

    let stdin = std::io::stdin();
    let mut input = stdin.lock();
    let mut out = std::io::stdout();

    let report = if cli.dry_run {
        orchestrator.preview(&mut input, &mut out).await
    } else {
        let mode = if cli.batch {
            SelectionMode::Batch
        } else {
            SelectionMode::Single
        };
        orchestrator.run(mode, &mut input, &mut out).await
    };

    let report = report.unwrap_or_else(|e| fail(e));
    match report.outcome {
        RunOutcome::Completed { output_path } => {
            let failed = report.rows.iter().filter(|r| r.tokens_used.is_none()).count();
            tracing::info!(
                "✅ {} emails written to {} ({} failed)",
                report.rows.len(),
                output_path,
                failed
            );
        }
        RunOutcome::Previewed => tracing::info!("Dry run finished, nothing was sent"),
        RunOutcome::NoData => tracing::warn!("No data to process"),
        RunOutcome::InvalidSelection(reason) => tracing::warn!("Selection rejected: {}", reason),
        RunOutcome::NothingSelected => tracing::warn!("No companies selected"),
    }

    Ok(())
}
