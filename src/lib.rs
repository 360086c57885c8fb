// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod harness;
pub mod logging;
pub mod runnable;
pub mod testcase;
pub mod types;

use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::{ConfigFile, TestSpec, load_and_validate};
use crate::errors::HookrunError;
use crate::harness::{ConfigSuite, Harness, Summary};
use crate::runnable::Parent;

pub use crate::engine::{Failure, Outcome, Pending, RunError, RunState, Thrown};
pub use crate::exec::{Context, Done, ExecutionMode};
pub use crate::runnable::Runnable;
pub use crate::testcase::Test;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - test construction (one command body per test)
/// - the sequential harness with retries
/// - the final summary
pub async fn run(args: CliArgs) -> Result<Summary> {
    let cfg = load_and_validate(&args.config)?;
    let specs = selected_specs(&cfg, args.test.as_deref())?;

    if args.dry_run {
        print_dry_run(&cfg, &specs);
        return Ok(Summary::default());
    }

    let suite: Arc<dyn Parent> = Arc::new(ConfigSuite::from_section(&cfg.suite));
    let mut harness = Harness::new(suite);

    info!(tests = specs.len(), "running tests");
    for spec in specs {
        harness.run_spec(spec).await;
    }

    let summary = harness.finish();
    print_summary(&summary);
    Ok(summary)
}

fn selected_specs<'a>(cfg: &'a ConfigFile, only: Option<&str>) -> Result<Vec<&'a TestSpec>> {
    match only {
        Some(key) => {
            let spec = cfg
                .find(key)
                .ok_or_else(|| HookrunError::ConfigError(format!("no test named '{key}'")))?;
            Ok(vec![spec])
        }
        None => Ok(cfg.tests.iter().collect()),
    }
}

/// Simple dry-run output: print resolved tests and their settings.
fn print_dry_run(cfg: &ConfigFile, specs: &[&TestSpec]) {
    println!("hookrun dry-run");
    if let Some(title) = &cfg.suite.title {
        println!("  suite: {title}");
    }
    if cfg.suite.pending {
        println!("  suite is pending; no test will run");
    }
    println!();

    println!("tests ({}):", specs.len());
    for spec in specs {
        println!("  - {} ({})", spec.key, spec.title);
        match &spec.cmd {
            Some(cmd) => println!("      cmd: {cmd}"),
            None => println!("      pending (no cmd)"),
        }
        println!("      timeout: {}ms", spec.timeout_ms);
        if !spec.enable_timeouts {
            println!("      timeouts disabled");
        }
        println!("      slow: {}ms", spec.slow_ms);
        if spec.retries > 0 {
            println!("      retries: {}", spec.retries);
        }
        if spec.allow_uncaught {
            println!("      allow_uncaught: true");
        }
        if let Some(globals) = &spec.globals {
            println!("      globals: {:?}", globals);
        }
    }

    debug!("dry-run complete (no execution)");
}

fn print_summary(summary: &Summary) {
    println!();
    println!(
        "{} passing, {} failing, {} pending",
        summary.passed, summary.failed, summary.pending
    );
    for (i, (title, message)) in summary.failures.iter().enumerate() {
        println!("  {}) {title}", i + 1);
        println!("     {message}");
    }
    if summary.unexpected > 0 {
        println!("{} unexpected completion signal(s)", summary.unexpected);
    }
}
