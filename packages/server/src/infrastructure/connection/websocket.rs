//! axum の WebSocket を使った接続アダプタ
//!
//! ## 責務
//!
//! - アップグレード済みの `WebSocket` を読み込み側と書き込み側に分割
//! - WebSocket メッセージとフレームの相互変換
//! - 切断理由の分類（想定内の切断か、それ以外のエラーか）
//!
//! ## 変換ルール
//!
//! - 受信: `Text` と `Binary` はフレームになり、`Ping` / `Pong` は読み飛ばす
//!   （Ping への応答は axum が行う）
//! - 送信: UTF-8 として正しいフレームは `Text`、それ以外は `Binary` で送る

use std::{error::Error as StdError, io};

use async_trait::async_trait;
use axum::extract::ws::{CloseFrame, Message, WebSocket, close_code};
use futures_util::{
    sink::SinkExt,
    stream::{SplitSink, SplitStream, StreamExt},
};

use crate::domain::{Connection, ConnectionError, Frame, FrameSink, FrameSource};

/// Close code sent by browsers when a page is navigated away or closed.
const CLOSE_GOING_AWAY: u16 = close_code::AWAY;

/// Close code reported when a connection dropped without a close frame.
const CLOSE_ABNORMAL: u16 = close_code::ABNORMAL;

/// An upgraded WebSocket connection.
pub struct WebSocketConnection {
    socket: WebSocket,
}

impl WebSocketConnection {
    pub fn new(socket: WebSocket) -> Self {
        Self { socket }
    }
}

impl Connection for WebSocketConnection {
    type Source = WebSocketSource;
    type Sink = WebSocketSink;

    fn split(self) -> (Self::Source, Self::Sink) {
        let (sink, stream) = self.socket.split();
        (WebSocketSource { stream }, WebSocketSink { sink })
    }
}

/// Read half of a WebSocket connection.
pub struct WebSocketSource {
    stream: SplitStream<WebSocket>,
}

#[async_trait]
impl FrameSource for WebSocketSource {
    async fn receive_frame(&mut self) -> Result<Option<Frame>, ConnectionError> {
        while let Some(message) = self.stream.next().await {
            match message.map_err(classify_error)? {
                Message::Text(text) => return Ok(Some(Frame::from(text.as_str()))),
                Message::Binary(bytes) => return Ok(Some(Frame::from(bytes.as_ref()))),
                Message::Ping(_) | Message::Pong(_) => {
                    tracing::trace!("Skipped control frame");
                }
                Message::Close(frame) => return close_outcome(frame),
            }
        }
        Ok(None)
    }
}

/// Write half of a WebSocket connection.
pub struct WebSocketSink {
    sink: SplitSink<WebSocket, Message>,
}

#[async_trait]
impl FrameSink for WebSocketSink {
    async fn send_frame(&mut self, frame: Frame) -> Result<(), ConnectionError> {
        self.sink
            .send(to_message(&frame))
            .await
            .map_err(classify_error)
    }

    async fn close(&mut self) -> Result<(), ConnectionError> {
        let close = Message::Close(Some(CloseFrame {
            code: close_code::NORMAL,
            reason: "".into(),
        }));
        self.sink.send(close).await.map_err(classify_error)?;
        self.sink.close().await.map_err(classify_error)
    }
}

/// Convert a frame to the outgoing WebSocket message.
fn to_message(frame: &Frame) -> Message {
    match frame.as_text() {
        Some(text) => Message::Text(text.into()),
        None => Message::Binary(frame.as_bytes().to_vec().into()),
    }
}

/// Map a received close frame to the end of the frame stream.
fn close_outcome(frame: Option<CloseFrame>) -> Result<Option<Frame>, ConnectionError> {
    match frame {
        None => Ok(None),
        Some(frame) if frame.code == close_code::NORMAL => Ok(None),
        Some(frame) if frame.code == CLOSE_GOING_AWAY || frame.code == CLOSE_ABNORMAL => Err(
            ConnectionError::PeerGone(format!("close code {}", frame.code)),
        ),
        Some(frame) => Err(ConnectionError::UnexpectedClose {
            code: frame.code,
            reason: frame.reason.to_string(),
        }),
    }
}

/// Messages tungstenite uses for a peer that went away without an I/O error.
///
/// axum does not expose tungstenite's error type, so these are matched on the
/// rendered text. This is best-effort: if the wording changes upstream, such
/// closures are reported as transport errors (logged at warn) instead.
const PEER_GONE_MESSAGES: [&str; 3] = [
    "Connection reset without closing handshake",
    "Connection closed normally",
    "Trying to work with closed connection",
];

/// Classify a transport error.
///
/// Resets, broken pipes and handshakes that were cut short mean the peer went
/// away; anything else is reported as a transport error.
fn classify_error(error: axum::Error) -> ConnectionError {
    if is_peer_gone(&error) {
        ConnectionError::PeerGone(error.to_string())
    } else {
        ConnectionError::Transport(error.to_string())
    }
}

fn is_peer_gone<'a>(error: &'a (dyn StdError + 'static)) -> bool {
    let chain = || {
        std::iter::successors(Some(error), |err: &&'a (dyn StdError + 'static)| (*err).source())
    };

    // An I/O error anywhere in the chain decides by its kind alone
    if let Some(io_error) = chain().find_map(|err| err.downcast_ref::<io::Error>()) {
        return is_peer_gone_kind(io_error.kind());
    }
    chain().any(|err| is_peer_gone_message(&err.to_string()))
}

fn is_peer_gone_kind(kind: io::ErrorKind) -> bool {
    matches!(
        kind,
        io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::UnexpectedEof
    )
}

fn is_peer_gone_message(message: &str) -> bool {
    PEER_GONE_MESSAGES
        .iter()
        .any(|known| message.contains(known))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close_frame(code: u16, reason: &str) -> Option<CloseFrame> {
        Some(CloseFrame {
            code,
            reason: reason.into(),
        })
    }

    #[test]
    fn test_text_frame_is_sent_as_text() {
        // テスト項目: UTF-8 のフレームは Text メッセージとして送信される
        // given (前提条件):
        let frame = Frame::from("hello");

        // when (操作):
        let message = to_message(&frame);

        // then (期待する結果):
        assert_eq!(message, Message::Text("hello".into()));
    }

    #[test]
    fn test_non_utf8_frame_is_sent_as_binary() {
        // テスト項目: UTF-8 でないフレームは Binary メッセージとして送信される
        // given (前提条件):
        let frame = Frame::from(vec![0xff, 0x00]);

        // when (操作):
        let message = to_message(&frame);

        // then (期待する結果):
        assert_eq!(message, Message::Binary(vec![0xff, 0x00].into()));
    }

    #[test]
    fn test_normal_close_ends_stream_cleanly() {
        // テスト項目: close フレームなし、または 1000 での切断は正常終了として扱われる
        // given (前提条件):

        // when (操作):
        let without_frame = close_outcome(None);
        let normal = close_outcome(close_frame(close_code::NORMAL, "bye"));

        // then (期待する結果):
        assert!(matches!(without_frame, Ok(None)));
        assert!(matches!(normal, Ok(None)));
    }

    #[test]
    fn test_going_away_close_is_expected() {
        // テスト項目: 1001 (going away) は想定内の切断として扱われる
        // given (前提条件):
        let frame = close_frame(close_code::AWAY, "");

        // when (操作):
        let result = close_outcome(frame);

        // then (期待する結果):
        let error = result.unwrap_err();
        assert!(error.is_expected_closure());
    }

    #[test]
    fn test_other_close_codes_are_unexpected() {
        // テスト項目: それ以外の close コードは想定外の切断として扱われる
        // given (前提条件):
        let frame = close_frame(close_code::POLICY, "policy violation");

        // when (操作):
        let result = close_outcome(frame);

        // then (期待する結果):
        match result {
            Err(ConnectionError::UnexpectedClose { code, reason }) => {
                assert_eq!(code, close_code::POLICY);
                assert_eq!(reason, "policy violation");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_reset_is_classified_as_peer_gone() {
        // テスト項目: 接続リセットは PeerGone に分類される
        // given (前提条件):
        let error = axum::Error::new(io::Error::new(io::ErrorKind::ConnectionReset, "reset"));

        // when (操作):
        let classified = classify_error(error);

        // then (期待する結果):
        assert!(classified.is_expected_closure());
    }

    #[test]
    fn test_other_errors_are_transport_errors() {
        // テスト項目: その他のエラーは Transport に分類される
        // given (前提条件):
        let error = axum::Error::new(io::Error::other("invalid utf-8"));

        // when (操作):
        let classified = classify_error(error);

        // then (期待する結果):
        assert!(matches!(classified, ConnectionError::Transport(_)));
    }

    #[test]
    fn test_known_close_messages_are_peer_gone() {
        // テスト項目: tungstenite の切断メッセージは PeerGone に分類され、似ているだけの文言は分類されない
        // given (前提条件):
        let reset = "WebSocket protocol error: Connection reset without closing handshake";
        let unrelated = "Connection closed by proxy policy";

        // when (操作):
        let reset_gone = is_peer_gone_message(reset);
        let unrelated_gone = is_peer_gone_message(unrelated);

        // then (期待する結果):
        assert!(reset_gone);
        assert!(!unrelated_gone);
    }

    #[test]
    fn test_io_errors_are_classified_by_kind_only() {
        // テスト項目: I/O エラーは文言ではなく種類で分類される
        // given (前提条件):
        let error = axum::Error::new(io::Error::other("Connection closed normally"));

        // when (操作):
        let classified = classify_error(error);

        // then (期待する結果):
        assert!(matches!(classified, ConnectionError::Transport(_)));
    }
}
