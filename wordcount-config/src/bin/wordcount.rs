use anyhow::{Context, Result, bail};
use clap::Parser;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wordcount_config::{
    Cli, OutputFormat, SettingsSource, WordCounterSettings,
    report::{render_json, render_table},
};
use wordcount_core::WordCountRuntime;
use wordcount_core::orchestration::JobEventPayload;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let (mut settings, source) = match &cli.config {
        Some(path) => (
            WordCounterSettings::load_from_file(path)?,
            SettingsSource::File(path.clone()),
        ),
        None => WordCounterSettings::load_from_env()?,
    };
    info!(?source, "settings loaded");

    cli.apply(&mut settings);
    if let Err(err) = settings.validate() {
        for problem in err.problems() {
            warn!("{problem}");
        }
        bail!(err);
    }
    let documents = settings.document_keys()?;

    let runtime = WordCountRuntime::new(settings.orchestrator.clone())
        .context("failed to start word count runtime")?;

    let mut events = runtime.events().subscribe();
    let progress = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => match event.payload {
                    JobEventPayload::DocumentStatusChanged { document, status } => {
                        info!(job_id = %event.job_id, %document, %status, "document finished");
                    }
                    JobEventPayload::Finished { .. } => break,
                    JobEventPayload::Started { .. } => {}
                },
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "progress events dropped"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    let job = runtime.spawn_job();
    let mut results = job.subscribe()?;
    job.start(documents)?;

    let report = results
        .recv()
        .await
        .context("job stopped without publishing a result")?;
    let _ = progress.await;
    runtime.shutdown().await;

    match cli.format {
        OutputFormat::Table => print!("{}", render_table(&report, cli.top)),
        OutputFormat::Json => println!("{}", render_json(&report)?),
    }
    Ok(())
}
