use anyhow::Context;
use clap::Parser;
use startup_jobs::config::{AuditCommand, Command};
use startup_jobs::config::toml_config::StoreKind;
use startup_jobs::utils::error::ErrorSeverity;
use startup_jobs::utils::{logger, validation::Validate};
use startup_jobs::{
    AppConfig, AuditJob, AuditService, Cli, JobRegistry, StartupOrchestrator, StartupOutcome,
};
use std::path::Path;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 初始化日誌
    if cli.json_logs {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    let config = load_config(&cli.config)?;
    if cli.verbose {
        tracing::debug!("Loaded config: {:?}", config);
    }

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    match cli.resolved_command() {
        Command::Run => run(config).await,
        Command::Audit { action } => audit(config, action).await,
    }
}

fn load_config(path: &str) -> anyhow::Result<AppConfig> {
    if !Path::new(path).exists() {
        tracing::info!("📁 Config file '{}' not found, using defaults", path);
        return Ok(AppConfig::default());
    }

    tracing::info!("📁 Loading configuration from: {}", path);
    AppConfig::from_file(path).with_context(|| format!("failed to load config file '{}'", path))
}

async fn run(config: AppConfig) -> anyhow::Result<()> {
    tracing::info!("🚀 Starting startup-jobs");

    let registry = JobRegistry::new();
    let audit_service = AuditService::new(config.build_audit_store());
    let task = Arc::new(AuditJob::new(audit_service, config.job_source()));
    let source = config
        .build_config_source()
        .context("failed to build configuration source")?;
    let settings = config.startup_settings()?;

    let orchestrator = Arc::new(StartupOrchestrator::new(
        registry.clone(),
        source,
        task,
        settings,
    ));
    let startup = orchestrator.launch()?;

    // 排程器在啟動 hook 之後才開始；本程式沒有靜態宣告的 job
    registry.bootstrap(config.scheduler.start_mode, 0);

    match startup.await.context("startup task failed")? {
        StartupOutcome::Registered { handle, fallback } => {
            tracing::info!(
                "✅ Job '{}' running every {:?}{}",
                handle.name(),
                handle.interval(),
                if fallback { " (fallback interval)" } else { "" }
            );
        }
        StartupOutcome::Disabled => {
            tracing::info!("Job disabled by configuration, nothing to run");
            return Ok(());
        }
        StartupOutcome::Aborted(e) => {
            tracing::error!("❌ Startup aborted: {}", e);
            tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
            eprintln!("❌ {}", e.user_friendly_message());

            let exit_code = match e.severity() {
                ErrorSeverity::Low => 0,
                ErrorSeverity::Medium => 2,
                ErrorSeverity::High => 1,
                ErrorSeverity::Critical => 3,
            };
            if exit_code > 0 {
                std::process::exit(exit_code);
            }
            return Ok(());
        }
    }

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;

    for info in registry.jobs().await {
        tracing::info!(
            "📊 Job '{}': {} runs, {} ok, {} failed, {} skipped",
            info.name,
            info.invocations,
            info.successes,
            info.failures,
            info.skipped
        );
    }
    tracing::info!("Shutting down");
    Ok(())
}

async fn audit(config: AppConfig, action: AuditCommand) -> anyhow::Result<()> {
    if config.audit.store == StoreKind::Memory {
        tracing::warn!("Audit store is 'memory'; records from other processes are not visible");
    }

    let service = AuditService::new(config.build_audit_store());
    let output = match action {
        AuditCommand::List => serde_json::to_string_pretty(&service.list_logs().await?)?,
        AuditCommand::Count => serde_json::to_string_pretty(&service.count_logs().await?)?,
    };
    println!("{}", output);
    Ok(())
}
