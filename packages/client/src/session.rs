//! WebSocket client session management.

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};

use hiroba_shared::time::get_timestamp;

use super::{error::ClientError, formatter::MessageFormatter, ui::redisplay_prompt};

/// Run one WebSocket session until it ends.
///
/// Lines received on `input` are sent as text frames. Returns `Ok(())` when
/// `input` closes (the user exited) and an error when the connection ends.
pub async fn run_client_session(
    url: &str,
    name: &str,
    input: &mut mpsc::UnboundedReceiver<String>,
) -> Result<(), ClientError> {
    let (ws_stream, _response) = connect_async(url)
        .await
        .map_err(|e| ClientError::Connect(e.to_string()))?;

    tracing::info!("Connected to relay server!");
    print!("{}", MessageFormatter::format_connected(url, name));
    redisplay_prompt(name);

    let (mut write, mut read) = ws_stream.split();

    // Spawn a task to handle incoming frames
    let name_for_read = name.to_string();
    let mut read_task = tokio::spawn(async move {
        while let Some(message) = read.next().await {
            match message {
                Ok(Message::Text(text)) => {
                    print!(
                        "{}",
                        MessageFormatter::format_text_frame(text.as_str(), get_timestamp())
                    );
                    redisplay_prompt(&name_for_read);
                }
                Ok(Message::Binary(data)) => {
                    print!(
                        "{}",
                        MessageFormatter::format_binary_frame(data.len(), get_timestamp())
                    );
                    redisplay_prompt(&name_for_read);
                }
                Ok(Message::Close(frame)) => {
                    tracing::info!("Server closed the connection: {:?}", frame);
                    return ClientError::ServerClosed;
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!("WebSocket read error: {}", e);
                    return ClientError::ConnectionLost(e.to_string());
                }
            }
        }
        ClientError::ConnectionLost("stream ended".to_string())
    });

    loop {
        tokio::select! {
            read_result = &mut read_task => {
                return Err(read_result
                    .unwrap_or_else(|e| ClientError::ConnectionLost(e.to_string())));
            }
            line = input.recv() => {
                let Some(line) = line else {
                    // User exited
                    read_task.abort();
                    if let Err(e) = write.close().await {
                        tracing::debug!("Failed to close WebSocket: {}", e);
                    }
                    return Ok(());
                };

                if let Err(e) = write.send(Message::text(line)).await {
                    tracing::warn!("Failed to send message: {}", e);
                    read_task.abort();
                    return Err(ClientError::ConnectionLost(e.to_string()));
                }

                print!("{}", MessageFormatter::format_sent_confirmation(get_timestamp()));
                redisplay_prompt(name);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use tokio::{net::TcpListener, sync::oneshot, time::timeout};
    use tokio_tungstenite::accept_async;

    const TIMEOUT: Duration = Duration::from_secs(5);

    #[tokio::test]
    async fn test_connect_failure_is_reported() {
        // テスト項目: 接続できない URL では Connect エラーになる
        // given (前提条件):
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let (_input_tx, mut input_rx) = mpsc::unbounded_channel();

        // when (操作):
        let url = format!("ws://{}/ws", addr);
        let result = run_client_session(&url, "alice", &mut input_rx).await;

        // then (期待する結果):
        assert!(matches!(result, Err(ClientError::Connect(_))));
    }

    #[tokio::test]
    async fn test_lines_are_sent_and_server_close_ends_session() {
        // テスト項目: 入力した行がテキストフレームとして送られ、サーバーの close でセッションが終わる
        // given (前提条件):
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (received_tx, received_rx) = oneshot::channel();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(stream).await.unwrap();
            while let Some(Ok(message)) = ws.next().await {
                if let Message::Text(text) = message {
                    let _ = received_tx.send(text.as_str().to_string());
                    break;
                }
            }
            ws.close(None).await.unwrap();
        });
        let (input_tx, mut input_rx) = mpsc::unbounded_channel();
        input_tx.send("hello".to_string()).unwrap();

        // when (操作):
        let url = format!("ws://{}/ws", addr);
        let result = timeout(TIMEOUT, run_client_session(&url, "alice", &mut input_rx))
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(received_rx.await.unwrap(), "hello");
        assert!(matches!(result, Err(ClientError::ServerClosed)));
    }

    #[tokio::test]
    async fn test_closed_input_ends_session_normally() {
        // テスト項目: 入力が閉じられるとセッションは正常終了する
        // given (前提条件):
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(stream).await.unwrap();
            while let Some(Ok(_)) = ws.next().await {}
        });
        let (input_tx, mut input_rx) = mpsc::unbounded_channel::<String>();
        drop(input_tx);

        // when (操作):
        let url = format!("ws://{}/ws", addr);
        let result = timeout(TIMEOUT, run_client_session(&url, "alice", &mut input_rx))
            .await
            .unwrap();

        // then (期待する結果):
        assert!(result.is_ok());
    }
}
