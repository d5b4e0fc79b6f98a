//! Message formatting utilities for client display.

use chrono::{DateTime, Utc};

/// Message formatter for client display
pub struct MessageFormatter;

impl MessageFormatter {
    /// Format the banner shown after connecting
    ///
    /// # Arguments
    ///
    /// * `url` - The relay URL
    /// * `name` - The prompt label of this client
    pub fn format_connected(url: &str, name: &str) -> String {
        format!(
            "\nConnected to {} as '{}'. Type messages and press Enter to send. Press Ctrl+C to exit.\n",
            url, name
        )
    }

    /// Format a relayed text frame
    ///
    /// # Arguments
    ///
    /// * `text` - The frame content
    /// * `received_at` - Unix timestamp when the frame arrived (milliseconds)
    pub fn format_text_frame(text: &str, received_at: i64) -> String {
        format!("\n[{}] {}\n", clock_label(received_at), text)
    }

    /// Format a relayed binary frame
    pub fn format_binary_frame(byte_count: usize, received_at: i64) -> String {
        format!(
            "\n[{}] (binary frame: {} bytes)\n",
            clock_label(received_at),
            byte_count
        )
    }

    /// Format a confirmation message after sending
    pub fn format_sent_confirmation(sent_at: i64) -> String {
        format!("sent at {}\n", clock_label(sent_at))
    }
}

/// `HH:MM:SS` in UTC, or the raw value if it is out of range
fn clock_label(timestamp_millis: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(timestamp_millis)
        .map(|dt| dt.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| timestamp_millis.to_string())
}
