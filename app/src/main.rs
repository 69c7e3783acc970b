//! `paineel` - SEI ANEEL process monitor.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

mod check;
mod cli;
mod console;
mod manage;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Command, RunArgs};
use paineel_browser::BrowserEngine;
use paineel_captcha::{CaptchaResolver, ResolverSettings, TesseractOcr, TwoCaptchaClient};
use paineel_core::{AppConfig, RunControl};
use paineel_ledger::SheetsLedger;
use paineel_mail::SmtpNotifier;
use paineel_monitor::{
    ChangeDetector, ExtractorSettings, Orchestrator, OutcomeStatus, ProcessExtractor,
    RecordReconciler, RunReport, SnapshotStore,
};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};

fn init_tracing(verbose: bool, configured_level: &str) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let fallback = if verbose {
        "info,paineel=debug".to_string()
    } else {
        configured_level.to_string()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let loaded = AppConfig::load_with_env(cli.config.as_deref());
    let level = loaded
        .as_ref()
        .map_or_else(|_| "info".to_string(), |c| c.logging.level.clone());
    init_tracing(cli.verbose, &level);

    let config = match loaded {
        Ok(config) => config,
        Err(e) => {
            error!("configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let outcome = match cli.command {
        None => run_monitor(&config, &cli.run).await,
        Some(Command::Run(ref args)) => run_monitor(&config, args).await,
        Some(Command::Manage { ref action }) => run_manage(&config, action).await,
        Some(Command::Check {
            skip_captcha,
            skip_smtp,
            skip_ledger,
        }) => {
            let options = check::CheckOptions {
                captcha: !skip_captcha,
                smtp: !skip_smtp,
                ledger: !skip_ledger,
            };
            Ok(if check::run(&config, &options).await {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
    };

    match outcome {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn connect_ledger(config: &AppConfig) -> anyhow::Result<RecordReconciler> {
    let ledger = SheetsLedger::connect(&config.ledger)
        .await
        .context("cannot open the ledger")?;
    Ok(RecordReconciler::new(
        Arc::new(ledger),
        config.ledger.retry_policy(),
    ))
}

async fn run_manage(config: &AppConfig, action: &cli::ManageAction) -> anyhow::Result<ExitCode> {
    let reconciler = connect_ledger(config).await?;
    manage::run(&reconciler, action).await?;
    Ok(ExitCode::SUCCESS)
}

async fn run_monitor(config: &AppConfig, args: &RunArgs) -> anyhow::Result<ExitCode> {
    if let Err(e) = config.ensure_required() {
        error!("{}", e);
        return Ok(ExitCode::FAILURE);
    }

    let mut execution = config.execution.clone();
    if args.max_processes.is_some() {
        execution.max_processes = args.max_processes;
    }

    let reconciler = Arc::new(connect_ledger(config).await?);

    std::fs::create_dir_all(&config.paths.temp_dir).with_context(|| {
        format!("cannot create {}", config.paths.temp_dir.display())
    })?;
    let remote = TwoCaptchaClient::new(&config.captcha).context("captcha client")?;
    let resolver = CaptchaResolver::new(
        Box::new(remote),
        Box::new(TesseractOcr::new(&config.ocr)),
        ResolverSettings::from_config(config),
    );
    let extractor = ProcessExtractor::new(resolver, ExtractorSettings::from_config(config));

    let control = RunControl::new();
    control.set_step_mode(args.step_mode);

    let engine = Arc::new(
        BrowserEngine::launch(&config.browser)
            .await
            .context("cannot start the browser")?,
    );

    let mut orchestrator = Orchestrator::new(
        engine.clone(),
        extractor,
        reconciler,
        control.clone(),
        execution,
    );
    if config.notification_configured() {
        orchestrator = orchestrator.with_notifier(
            ChangeDetector::new(SnapshotStore::new(config.paths.snapshot_file())),
            Box::new(SmtpNotifier::from_config(config)),
        );
    } else {
        warn!("email notification not configured, change detection skipped");
    }

    let interrupt = control.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, stopping after the current number");
            interrupt.cancel();
        }
    });
    if args.interactive || args.step_mode {
        console::spawn(control.clone(), orchestrator.stats());
    }

    let result = orchestrator.run(args.processes.clone()).await;
    engine.close().await;

    match result {
        Ok(report) => {
            print_summary(&report);
            Ok(if report.cancelled {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            })
        }
        Err(e) => {
            let stats = orchestrator.stats();
            let stats = stats.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            println!("{stats}");
            error!("{}", e);
            Ok(ExitCode::FAILURE)
        }
    }
}

fn print_summary(report: &RunReport) {
    println!();
    println!("{}", "=".repeat(50));
    if report.cancelled {
        println!("Run interrupted, partial summary:");
    } else if report.deadline_hit {
        println!("Time limit reached, partial summary:");
    }
    println!("{}", report.stats);

    let failed = report.count(|s| matches!(s, OutcomeStatus::Failed(_)));
    if failed > 0 {
        println!("Still failing ({failed}):");
        for outcome in &report.outcomes {
            if let OutcomeStatus::Failed(reason) = &outcome.status {
                println!("  {} - {}", outcome.identifier, reason);
            }
        }
    }
    if let Some(changes) = &report.changes {
        println!(
            "Changes detected: {} (notification {})",
            changes.events.len(),
            if changes.notified { "sent" } else { "not sent" }
        );
    }
    info!(
        processed = report.stats.processed(),
        total = report.stats.total,
        "done"
    );
}
