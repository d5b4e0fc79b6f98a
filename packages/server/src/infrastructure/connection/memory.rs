//! チャネルを使ったプロセス内の接続アダプタ
//!
//! ## 責務
//!
//! - ソケットを使わずにメンバーのポンプを動かす
//! - テストからピア側の操作（送信、切断、読み取りエラー）を行えるようにする
//!
//! ## 設計ノート
//!
//! ピアからメンバーへの方向は無制限のチャネル、メンバーからピアへの方向は
//! 容量付きのチャネルです。ピアが読み取りを止めると `send_frame` が待機するため、
//! 遅いクライアントを再現できます。

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::domain::{Connection, ConnectionError, Frame, FrameSink, FrameSource};

/// メンバーからピアへのチャネルのデフォルト容量
const DEFAULT_PEER_CAPACITY: usize = 64;

/// ピアが観測するイベント
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerEvent {
    /// メンバーから書き込まれたフレーム
    Frame(Frame),
    /// メンバーから送られた close
    Closed,
}

/// メンバー側の接続
pub struct InMemoryConnection {
    inbound: mpsc::UnboundedReceiver<Result<Frame, ConnectionError>>,
    outbound: mpsc::Sender<PeerEvent>,
}

/// テストが操作するピア側
pub struct InMemoryPeer {
    to_member: Option<mpsc::UnboundedSender<Result<Frame, ConnectionError>>>,
    from_member: mpsc::Receiver<PeerEvent>,
}

impl InMemoryConnection {
    /// 接続とピアのペアを作成
    pub fn pair() -> (Self, InMemoryPeer) {
        Self::pair_with_capacity(DEFAULT_PEER_CAPACITY)
    }

    /// ピアが読み取らずに保持できるイベント数を指定してペアを作成
    ///
    /// `peer_capacity` は 1 以上である必要があります。
    pub fn pair_with_capacity(peer_capacity: usize) -> (Self, InMemoryPeer) {
        let (to_member, inbound) = mpsc::unbounded_channel();
        let (outbound, from_member) = mpsc::channel(peer_capacity.max(1));
        (
            Self { inbound, outbound },
            InMemoryPeer {
                to_member: Some(to_member),
                from_member,
            },
        )
    }
}

impl Connection for InMemoryConnection {
    type Source = InMemorySource;
    type Sink = InMemorySink;

    fn split(self) -> (Self::Source, Self::Sink) {
        (
            InMemorySource {
                inbound: self.inbound,
            },
            InMemorySink {
                outbound: self.outbound,
            },
        )
    }
}

/// `InMemoryConnection` の読み込み側
pub struct InMemorySource {
    inbound: mpsc::UnboundedReceiver<Result<Frame, ConnectionError>>,
}

#[async_trait]
impl FrameSource for InMemorySource {
    async fn receive_frame(&mut self) -> Result<Option<Frame>, ConnectionError> {
        match self.inbound.recv().await {
            Some(Ok(frame)) => Ok(Some(frame)),
            Some(Err(e)) => Err(e),
            None => Ok(None),
        }
    }
}

/// `InMemoryConnection` の書き込み側
pub struct InMemorySink {
    outbound: mpsc::Sender<PeerEvent>,
}

#[async_trait]
impl FrameSink for InMemorySink {
    async fn send_frame(&mut self, frame: Frame) -> Result<(), ConnectionError> {
        self.outbound
            .send(PeerEvent::Frame(frame))
            .await
            .map_err(|_| ConnectionError::PeerGone("in-memory peer dropped".to_string()))
    }

    async fn close(&mut self) -> Result<(), ConnectionError> {
        self.outbound
            .send(PeerEvent::Closed)
            .await
            .map_err(|_| ConnectionError::PeerGone("in-memory peer dropped".to_string()))
    }
}

impl InMemoryPeer {
    /// メンバーへフレームを送信
    ///
    /// 既に切断している場合は `false` を返す
    pub fn send(&self, frame: impl Into<Frame>) -> bool {
        match &self.to_member {
            Some(sender) => sender.send(Ok(frame.into())).is_ok(),
            None => false,
        }
    }

    /// 読み込みエラーを発生させてから切断する
    pub fn fail(&mut self, error: ConnectionError) {
        if let Some(sender) = self.to_member.take() {
            let _ = sender.send(Err(error));
        }
    }

    /// 正常に切断する（メンバー側の `receive_frame` は `Ok(None)` を返す）
    pub fn disconnect(&mut self) {
        self.to_member = None;
    }

    /// メンバーからの次のイベントを待つ
    ///
    /// メンバー側の書き込み半分が破棄されると `None` を返す
    pub async fn recv(&mut self) -> Option<PeerEvent> {
        self.from_member.recv().await
    }

    /// 既に届いているイベントがあれば取り出す
    pub fn try_recv(&mut self) -> Option<PeerEvent> {
        self.from_member.try_recv().ok()
    }
}
