use std::process::ExitCode;
use std::sync::Arc;

use batchreg::batch::{BatchOrchestrator, RawUpload};
use batchreg::config::Config;
use batchreg::dispatch::HttpDispatcher;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cli::DispatchArgs;

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Run one batch from a local file and print the report.
///
/// Exits with 2 when any record could not be registered.
pub async fn dispatch(args: DispatchArgs) -> Result<ExitCode, AnyError> {
    let mut config = Config::load()?;
    if let Some(concurrency) = args.concurrency {
        config.batch.concurrency = concurrency;
    }

    let buffer = tokio::fs::read(&args.file)
        .await
        .map_err(|e| format!("Failed to read {}: {}", args.file.display(), e))?;

    let dispatcher = HttpDispatcher::new(&config.dispatch)?;
    let orchestrator = BatchOrchestrator::from_config(Arc::new(dispatcher), &config);

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, finishing in-flight requests");
            on_ctrl_c.cancel();
        }
    });

    info!(file = %args.file.display(), "Dispatching upload");
    let upload = RawUpload::new(args.event_id, args.api_key, args.api_secret, buffer);
    let report = orchestrator.process_upload(upload, &cancel).await?;

    print!("{}", report);

    Ok(if report.all_succeeded() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(2)
    })
}

pub fn show_config() -> Result<ExitCode, AnyError> {
    let config = Config::load()?;
    print!("{}", toml::to_string_pretty(&config)?);
    Ok(ExitCode::SUCCESS)
}
