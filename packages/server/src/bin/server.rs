//! WebSocket broadcast relay server.
//!
//! Every frame received from one client is relayed to all other connected
//! clients. Clients that cannot keep up are disconnected.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin hiroba-server
//! cargo run --bin hiroba-server -- --host 0.0.0.0 --port 3000 --mailbox-capacity 64
//! ```

use std::num::NonZeroUsize;

use clap::Parser;
use hiroba_server::{relay::Relay, relay::RelayConfig, ui::Server};
use hiroba_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "hiroba-server")]
#[command(about = "WebSocket broadcast relay server", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, default_value = "8080")]
    port: u16,

    /// Frames a client may have pending before it is disconnected
    #[arg(long, default_value = "256")]
    mailbox_capacity: NonZeroUsize,

    /// Depth of the registry command queue
    #[arg(long, default_value = "1024")]
    command_buffer: NonZeroUsize,

    /// Default log level when RUST_LOG is not set
    #[arg(long, default_value = "debug")]
    log_level: String,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), &args.log_level);

    // 1. Start the relay (registry event loop)
    let config = RelayConfig::new(args.mailbox_capacity, args.command_buffer);
    tracing::info!(
        "Starting relay with mailbox capacity {} and command buffer {}",
        config.mailbox_capacity,
        config.command_buffer
    );
    let relay = Relay::start(config);

    // 2. Create and run the server
    let server = Server::new(relay);
    if let Err(e) = server.run(args.host, args.port).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
