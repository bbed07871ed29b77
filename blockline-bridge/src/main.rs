//! blockline - status bar daemon
//!
//! Runs the compiled-in blocks, publishes the status line to the X root window
//! (or stdout with `-p`), and listens for clicks on a control socket.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use blockline_bridge::ipc::{self, ControlRequest, ControlResponse, ControlState};
use blockline_bridge::paths;
use blockline_core::config::DEFAULT_DELIMITER;
use blockline_core::slot::DEFAULT_SLOT_CAPACITY;
use blockline_core::{
    EngineConfig, Publisher, Registry, RootNamePublisher, StatusEngine, StdoutPublisher,
    default_blocks, signals,
};

/// blockline - modular status bar for dwm-style window managers
#[derive(Parser, Debug)]
#[command(name = "blockline", version, about)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Print the status line to stdout instead of setting the root window name
    #[arg(short = 'p', long)]
    stdout: bool,

    /// Text placed between blocks
    #[arg(short, long, default_value = DEFAULT_DELIMITER)]
    delimiter: String,

    /// Maximum bytes kept per block
    #[arg(long, default_value_t = DEFAULT_SLOT_CAPACITY)]
    capacity: usize,

    /// Kill a block command after this many seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Control socket path
    #[arg(long, global = true)]
    socket: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ask a running instance to run a block now
    Click {
        /// Block position, counted from the left starting at 0
        index: usize,
        /// Mouse button exported to the block as BLOCK_BUTTON
        #[arg(long)]
        button: Option<u8>,
    },
    /// Print the status line a running instance last published
    Status,
    /// List the blocks of a running instance
    Blocks,
    /// Check that an instance is running
    Ping,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let args = Args::parse();

    // stdout may be the output surface, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_max_level(if args.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .with_writer(std::io::stderr)
        .init();

    let socket = args.socket.clone().unwrap_or_else(paths::default_socket_path);

    match &args.command {
        Some(Command::Click { index, button }) => {
            let request = ControlRequest::RunBlock {
                index: *index,
                button: *button,
            };
            client(&socket, request).await
        }
        Some(Command::Status) => client(&socket, ControlRequest::Status).await,
        Some(Command::Blocks) => client(&socket, ControlRequest::Blocks).await,
        Some(Command::Ping) => client(&socket, ControlRequest::Ping).await,
        None => daemon(&args, socket).await,
    }
}

async fn daemon(args: &Args, socket: PathBuf) -> Result<()> {
    let registry = Registry::new(default_blocks()).context("Invalid block table")?;
    let config = EngineConfig {
        delimiter: args.delimiter.clone(),
        slot_capacity: args.capacity,
        block_timeout: args.timeout.map(Duration::from_secs),
        ..EngineConfig::default()
    };

    tracing::info!("Starting blockline v{}", env!("CARGO_PKG_VERSION"));

    if args.stdout {
        serve(registry, config, StdoutPublisher::stdout(), socket).await
    } else {
        let publisher = RootNamePublisher::connect().context("Failed to open the display")?;
        serve(registry, config, publisher, socket).await
    }
}

async fn serve<P: Publisher>(
    registry: Registry,
    config: EngineConfig,
    publisher: P,
    socket: PathBuf,
) -> Result<()> {
    let engine = StatusEngine::new(registry.clone(), config, publisher);

    signals::listen(&registry, engine.pending_signals())
        .context("Failed to install block signal handlers")?;

    // Clicks are optional: a missing socket must not take the status line down.
    let control = match ipc::bind(&socket) {
        Ok(listener) => {
            let state = ControlState {
                trigger: engine.trigger_handle(),
                status: engine.subscribe(),
                registry,
            };
            Some(tokio::spawn(ipc::serve(listener, state)))
        }
        Err(e) => {
            tracing::warn!("control socket disabled: {:#}", e);
            None
        }
    };

    engine.run(shutdown_signal()).await;

    if let Some(task) = control {
        task.abort();
        let _ = std::fs::remove_file(&socket);
    }
    Ok(())
}

async fn client(socket: &std::path::Path, request: ControlRequest) -> Result<()> {
    match ipc::request(socket, &request).await? {
        ControlResponse::Ok => {}
        ControlResponse::Pong { version } => println!("blockline {}", version),
        ControlResponse::Status { text } => println!("{}", text),
        ControlResponse::Blocks { blocks } => {
            for (index, block) in blocks.iter().enumerate() {
                let signal = block
                    .signal
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "-".into());
                println!(
                    "{:>2}  {:<10} signal {:<3} {}{}",
                    index,
                    format!("{:?}", block.interval),
                    signal,
                    block.icon,
                    block.command
                );
            }
        }
        ControlResponse::Error { message } => bail!(message),
    }
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => tracing::info!("Ctrl+C received, exiting"),
        _ = terminate => tracing::info!("SIGTERM received, exiting"),
    }
}
