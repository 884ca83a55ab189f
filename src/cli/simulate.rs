use std::sync::Arc;

use anyhow::{bail, Result};
use clap::Args;
use storefront_event_bus::{
    CompositeObserver, EventBus, InMemoryBus, SyncEvent, SyncObserver, TracingObserver,
};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::cli::context::CliContext;
use storefront_harness::scenarios::{ScenarioRunner, ScenarioSelection};

const EVENT_BUFFER: usize = 256;

#[derive(Args, Clone, Debug)]
pub struct SimulateArgs {
    /// Scenario to run: a, b, c, d or all
    #[arg(short, long, default_value = "all")]
    pub scenario: ScenarioSelection,

    /// Print every synchronization event as a JSON line
    #[arg(long)]
    pub events: bool,
}

pub async fn cmd_simulate(args: SimulateArgs, ctx: &CliContext) -> Result<()> {
    let config = ctx.config();
    let mut observer = CompositeObserver::new()
        .with(Arc::new(TracingObserver::new(config.observer.verbosity)));

    let printer = if args.events {
        let bus = InMemoryBus::<SyncEvent>::new(EVENT_BUFFER);
        let printer = spawn_event_printer(&bus);
        observer = observer.with(bus);
        Some(printer)
    } else {
        None
    };

    let reports = {
        let runner = ScenarioRunner::new(config, Arc::new(observer) as Arc<dyn SyncObserver>);
        runner.run_all(&args.scenario.0).await
    };

    // The runner held the last bus handle; the printer drains and exits.
    if let Some(printer) = printer {
        printer.await?;
    }

    let mut failed = 0;
    for report in &reports {
        println!(
            "[{}] {} {} ({}ms): {}",
            report.status,
            report.scenario,
            report.scenario.title(),
            report.elapsed_ms,
            report.detail
        );
        if !report.passed() {
            failed += 1;
        }
    }

    if failed > 0 {
        bail!("{failed} of {} scenarios failed", reports.len());
    }
    Ok(())
}

fn spawn_event_printer(bus: &Arc<InMemoryBus<SyncEvent>>) -> JoinHandle<()> {
    let mut receiver = bus.subscribe();
    tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(event) => match serde_json::to_string(&event) {
                    Ok(line) => println!("{line}"),
                    Err(err) => warn!(?err, "failed to encode event"),
                },
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "event printer lagged"),
                Err(RecvError::Closed) => break,
            }
        }
    })
}
