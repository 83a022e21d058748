//! # filmscreend
//!
//! Composition root that wires the CVM integration to a client and runs it.
//!
//! ## Responsibilities
//! - Load configuration (config file, env vars)
//! - Initialise logging
//! - Validate the controller connection, then set the integration up
//! - Log every platform event published on the bus
//! - Read operator instructions from stdin; run until `quit` or Ctrl-C, even
//!   once stdin is closed
//! - Tear the integration down on exit
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer. No domain logic belongs here.

mod config;
mod console;

use std::future::Future;
use std::sync::Arc;

use filmscreen_adapter_virtual::VirtualCvm;
use filmscreen_app::event_bus::InProcessEventBus;
use filmscreen_app::integration::{FilmscreenIntegration, validate_connection};
use filmscreen_domain::event::Event;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::console::Instruction;

type Integration = FilmscreenIntegration<VirtualCvm, Arc<InProcessEventBus>>;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.logging.filter))
        .init();

    let client = Arc::new(VirtualCvm::new(
        config.simulator.clone(),
        config.credentials(),
    ));

    let title = validate_connection(client.as_ref(), &config.cvm.host).await?;
    tracing::info!(%title, address = %config.address(), "controller reachable");

    // Event bus
    let bus = Arc::new(InProcessEventBus::new(256));
    let logger = tokio::spawn(log_events(bus.subscribe()));

    let integration =
        FilmscreenIntegration::setup(client, config.integration_options(), Arc::clone(&bus))
            .await?;

    serve(
        &integration,
        BufReader::new(tokio::io::stdin()),
        tokio::signal::ctrl_c(),
    )
    .await?;

    integration.teardown();
    logger.abort();
    Ok(())
}

/// How the console loop finished.
#[derive(Debug, PartialEq, Eq)]
enum ConsoleExit {
    Quit,
    EndOfInput,
}

/// Run the console on `input` until the operator quits or `shutdown`
/// resolves. Closing `input` only stops reading instructions.
async fn serve<R, S>(integration: &Integration, input: R, shutdown: S) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    S: Future<Output = std::io::Result<()>>,
{
    tokio::pin!(shutdown);
    tokio::select! {
        exit = run_console(integration, input) => {
            if exit? == ConsoleExit::EndOfInput {
                tracing::info!("stdin closed, running until interrupted");
                shutdown.await?;
                tracing::info!("interrupted");
            }
        }
        result = &mut shutdown => {
            result?;
            tracing::info!("interrupted");
        }
    }
    Ok(())
}

async fn run_console<R>(integration: &Integration, input: R) -> std::io::Result<ConsoleExit>
where
    R: AsyncBufRead + Unpin,
{
    let device_id = integration.device().unique_id.clone();
    let mut lines = input.lines();

    while let Some(line) = lines.next_line().await? {
        let instruction = match console::parse(&line, &device_id) {
            Ok(Some(instruction)) => instruction,
            Ok(None) => continue,
            Err(err) => {
                eprintln!("{err}");
                continue;
            }
        };
        match instruction {
            Instruction::Quit => return Ok(ConsoleExit::Quit),
            Instruction::Status => print_status(integration),
            Instruction::Service {
                target,
                service,
                data,
            } => {
                if let Err(err) = integration
                    .handle_service_call(target.as_deref(), service, data)
                    .await
                {
                    tracing::warn!(service, error = %err, "service call failed");
                }
            }
        }
    }
    Ok(ConsoleExit::EndOfInput)
}

fn print_status(integration: &Integration) {
    for cover in integration.covers() {
        let position = cover
            .current_cover_position()
            .map_or_else(|| "?".to_string(), |p| p.to_string());
        println!(
            "{:<32} {:<8} position={position}",
            cover.name(),
            cover.state().status().to_string()
        );
    }
}

async fn log_events(mut rx: broadcast::Receiver<Event>) {
    loop {
        match rx.recv().await {
            Ok(event) => tracing::info!(
                event_type = ?event.event_type,
                entity_id = event.entity_id.as_deref().unwrap_or("-"),
                data = %event.data,
                "event"
            ),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "event logger lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
