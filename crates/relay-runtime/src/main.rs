//! # Anonymous Relay
//!
//! Console front end for the relay core.
//!
//! ## Startup Sequence
//!
//! 1. Initialize logging (`RUST_LOG`, default `info`, to stderr)
//! 2. Load configuration (`RELAY_CONFIG`, then `RELAY_*` overrides)
//! 3. Wire adapters and the relay service
//! 4. Start maintenance tasks
//! 5. Read commands from stdin until EOF, `quit` or Ctrl+C
//! 6. Drain deliveries and stop

use anyhow::{Context, Result};
use tokio::io::BufReader;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use relay_runtime::console::{run_console, ConsoleDriver, HELP};
use relay_runtime::{RelayRuntime, RuntimeConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = RuntimeConfig::from_env().context("loading relay configuration")?;

    let runtime = RelayRuntime::new(config);
    runtime.start();

    let driver = ConsoleDriver::new(&runtime.container());
    println!("{HELP}");
    info!("Relay is running. Type commands, Ctrl+D or Ctrl+C to stop.");

    let mut stdout = std::io::stdout();
    let input = BufReader::new(tokio::io::stdin());
    let interrupted = tokio::select! {
        result = run_console(&driver, input, &mut stdout, runtime.shutdown_signal()) => {
            result.context("reading console input")?;
            false
        }
        result = tokio::signal::ctrl_c() => {
            result.context("listening for Ctrl+C")?;
            info!("Ctrl+C received");
            true
        }
    };

    runtime.shutdown().await;
    if interrupted {
        // Pending stdin read blocks runtime teardown
        std::process::exit(0);
    }
    Ok(())
}
