//! Terminal client for the Hiroba relay server.
//!
//! Connects to the relay and sends every line typed at the ">" prompt as one
//! text frame. Frames relayed from other clients are printed as they arrive.
//! Automatically reconnects on disconnection (max 5 attempts with 5 second interval).
//!
//! Run with:
//! ```not_rust
//! cargo run --bin hiroba-client -- --name alice
//! cargo run --bin hiroba-client -- -u ws://127.0.0.1:3000/ws
//! ```

use clap::Parser;

use hiroba_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "hiroba-client")]
#[command(about = "Terminal client for the WebSocket broadcast relay", long_about = None)]
struct Args {
    /// Label shown in the prompt (never sent to the server)
    #[arg(short = 'n', long, default_value = "me")]
    name: String,

    /// WebSocket server URL
    #[arg(short = 'u', long, default_value = "ws://127.0.0.1:8080/ws")]
    url: String,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let args = Args::parse();

    // Run the client
    if let Err(e) = hiroba_client::run_client(args.url, args.name).await {
        tracing::error!("Client error: {}", e);
        std::process::exit(1);
    }
}
