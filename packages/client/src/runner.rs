//! Client execution logic with reconnection support.

use std::time::Duration;

use super::{error::ClientError, session::run_client_session, ui::spawn_line_reader};

const MAX_RECONNECT_ATTEMPTS: u32 = 5;
const RECONNECT_INTERVAL_SECS: u64 = 5;

/// Run the WebSocket client with reconnection logic
///
/// The terminal reader lives across reconnects, so lines typed while
/// reconnecting are sent once the next session is up.
pub async fn run_client(url: String, name: String) -> Result<(), Box<dyn std::error::Error>> {
    let mut input = spawn_line_reader(name.clone());
    let mut reconnect_count = 0;

    loop {
        tracing::info!(
            "Attempting to connect to {} (attempt {}/{})",
            url,
            reconnect_count + 1,
            MAX_RECONNECT_ATTEMPTS
        );

        match run_client_session(&url, &name, &mut input).await {
            Ok(()) => {
                tracing::info!("Client session ended normally");
                // If connection ended normally (user exit), don't reconnect
                break;
            }
            Err(e) => {
                tracing::warn!("{}", e);
                reconnect_count = failed_attempts(reconnect_count, &e);

                if reconnect_count >= MAX_RECONNECT_ATTEMPTS {
                    return Err(Box::new(ClientError::ReconnectExhausted(
                        MAX_RECONNECT_ATTEMPTS,
                    )));
                }

                tracing::info!(
                    "Reconnecting in {} seconds... (attempt {}/{})",
                    RECONNECT_INTERVAL_SECS,
                    reconnect_count + 1,
                    MAX_RECONNECT_ATTEMPTS
                );

                tokio::time::sleep(Duration::from_secs(RECONNECT_INTERVAL_SECS)).await;
            }
        }
    }

    Ok(())
}

/// Number of consecutive failed attempts after a session ended with `error`.
///
/// A session that got connected starts a new outage, so the count restarts.
fn failed_attempts(previous: u32, error: &ClientError) -> u32 {
    if error.was_connected() {
        1
    } else {
        previous + 1
    }
}
