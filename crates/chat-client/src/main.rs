//! Relay Chat terminal client entry point.
//!
//! ```text
//! main()
//!  └─ stdin thread      -- posts typed lines as events
//!  └─ printer task      -- writes output lines to stdout
//!  └─ ClientRuntime     -- owns client state until /quit or EOF
//! ```

use anyhow::Context;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use chat_client::infrastructure::input::spawn_stdin_reader;
use chat_client::infrastructure::network::connector::TcpConnector;
use chat_client::infrastructure::network::runtime::ClientRuntime;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr and default to `warn` so they stay out of the chat.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let (output_tx, mut output_rx) = mpsc::unbounded_channel::<String>();
    let printer = tokio::spawn(async move {
        while let Some(line) = output_rx.recv().await {
            println!("{line}");
        }
    });

    let runtime = ClientRuntime::new(TcpConnector, output_tx);
    spawn_stdin_reader(runtime.events()).context("failed to start input reader")?;
    runtime.run().await;

    printer.await.context("output task failed")?;
    Ok(())
}
