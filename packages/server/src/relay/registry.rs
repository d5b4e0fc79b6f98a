//! Membership registry
//!
//! The registry is the single authority over the live membership set. It runs
//! as one event-loop task consuming an ordered stream of commands, so admit,
//! remove and broadcast never interleave: a broadcast always sees either the
//! whole effect of an admission/removal or none of it.
//!
//! Callers talk to the loop through a cloneable [`RegistryHandle`].

use std::{collections::HashMap, num::NonZeroUsize, sync::Arc};

use hiroba_shared::time::Clock;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};

use crate::domain::{Frame, MemberId, RegistryError};

use super::mailbox::{Delivery, MailboxSender};

/// Commands processed by the registry event loop
#[derive(Debug)]
enum RegistryCommand {
    Admit {
        id: MemberId,
        mailbox: MailboxSender,
        respond_to: oneshot::Sender<Result<(), RegistryError>>,
    },
    Remove {
        id: MemberId,
        respond_to: oneshot::Sender<bool>,
    },
    Broadcast {
        frame: Frame,
        exclude: Option<MemberId>,
    },
    Snapshot {
        respond_to: oneshot::Sender<RegistrySnapshot>,
    },
}

/// Lifetime counters of the registry.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RegistryStats {
    /// Members ever admitted
    pub admitted: u64,
    /// Members removed by an explicit remove or because their consumer was gone
    pub removed: u64,
    /// Members evicted because their mailbox was full
    pub evicted: u64,
    /// Broadcast passes processed
    pub broadcasts: u64,
    /// Frames successfully queued into mailboxes
    pub deliveries: u64,
}

/// One admitted member as seen in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberSummary {
    pub id: MemberId,
    /// Unix timestamp in milliseconds
    pub admitted_at: i64,
}

/// The membership set and counters at one event boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistrySnapshot {
    /// Members sorted by admission time
    pub members: Vec<MemberSummary>,
    pub stats: RegistryStats,
}

impl RegistrySnapshot {
    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn contains(&self, id: &MemberId) -> bool {
        self.members.iter().any(|member| &member.id == id)
    }
}

/// Result of one broadcast pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct BroadcastOutcome {
    delivered: usize,
    evicted: Vec<MemberId>,
    closed: Vec<MemberId>,
}

struct MemberEntry {
    mailbox: MailboxSender,
    admitted_at: i64,
}

/// Registry state owned by the event loop.
pub struct Registry {
    members: HashMap<MemberId, MemberEntry>,
    stats: RegistryStats,
    clock: Arc<dyn Clock>,
}

impl Registry {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            members: HashMap::new(),
            stats: RegistryStats::default(),
            clock,
        }
    }

    /// Start the event loop and return a handle to it.
    ///
    /// The loop stops once every handle has been dropped.
    pub fn spawn(self, command_buffer: NonZeroUsize) -> RegistryHandle {
        let (sender, receiver) = mpsc::channel(command_buffer.get());
        tokio::spawn(self.run(receiver));
        RegistryHandle { sender }
    }

    async fn run(mut self, mut receiver: mpsc::Receiver<RegistryCommand>) {
        while let Some(command) = receiver.recv().await {
            self.handle(command);
        }
        tracing::debug!(
            "Registry stopped with {} member(s) still admitted",
            self.members.len()
        );
    }

    fn handle(&mut self, command: RegistryCommand) {
        match command {
            RegistryCommand::Admit {
                id,
                mailbox,
                respond_to,
            } => {
                let _ = respond_to.send(self.admit(id, mailbox));
            }
            RegistryCommand::Remove { id, respond_to } => {
                let _ = respond_to.send(self.remove(&id));
            }
            RegistryCommand::Broadcast { frame, exclude } => {
                self.broadcast(&frame, exclude.as_ref());
            }
            RegistryCommand::Snapshot { respond_to } => {
                let _ = respond_to.send(self.snapshot());
            }
        }
    }

    fn admit(&mut self, id: MemberId, mailbox: MailboxSender) -> Result<(), RegistryError> {
        if self.members.contains_key(&id) {
            tracing::warn!("Member '{}' is already admitted. Rejecting admission.", id);
            return Err(RegistryError::AlreadyAdmitted(id));
        }

        let entry = MemberEntry {
            mailbox,
            admitted_at: self.clock.now_millis(),
        };
        self.members.insert(id, entry);
        self.stats.admitted += 1;
        tracing::info!(
            "Member '{}' admitted. Total members: {}",
            id,
            self.members.len()
        );
        Ok(())
    }

    /// Remove a member, closing its mailbox. Absent members are a no-op.
    fn remove(&mut self, id: &MemberId) -> bool {
        // Dropping the entry drops the only mailbox sender, which closes it.
        match self.members.remove(id) {
            Some(_entry) => {
                self.stats.removed += 1;
                tracing::info!(
                    "Member '{}' removed. Total members: {}",
                    id,
                    self.members.len()
                );
                true
            }
            None => {
                tracing::debug!("Member '{}' is not admitted, nothing to remove", id);
                false
            }
        }
    }

    fn broadcast(&mut self, frame: &Frame, exclude: Option<&MemberId>) -> BroadcastOutcome {
        let mut outcome = BroadcastOutcome::default();

        for (id, entry) in &self.members {
            if Some(id) == exclude {
                continue;
            }
            match entry.mailbox.try_deliver(frame.clone()) {
                Delivery::Delivered => outcome.delivered += 1,
                Delivery::Full => outcome.evicted.push(*id),
                Delivery::Closed => outcome.closed.push(*id),
            }
        }

        // Removals are applied after the pass so the set is never mutated
        // while it is being iterated.
        for id in &outcome.evicted {
            if self.members.remove(id).is_some() {
                self.stats.evicted += 1;
                tracing::warn!(
                    "Member '{}' evicted: mailbox full. Total members: {}",
                    id,
                    self.members.len()
                );
            }
        }
        for id in &outcome.closed {
            if self.members.remove(id).is_some() {
                self.stats.removed += 1;
                tracing::info!(
                    "Member '{}' removed: outbound pump gone. Total members: {}",
                    id,
                    self.members.len()
                );
            }
        }

        self.stats.broadcasts += 1;
        self.stats.deliveries += outcome.delivered as u64;
        tracing::debug!(
            "Broadcast {} byte(s) to {} member(s)",
            frame.len(),
            outcome.delivered
        );

        outcome
    }

    fn snapshot(&self) -> RegistrySnapshot {
        let mut members: Vec<MemberSummary> = self
            .members
            .iter()
            .map(|(id, entry)| MemberSummary {
                id: *id,
                admitted_at: entry.admitted_at,
            })
            .collect();

        // Sort by admission time, then id, for consistent ordering
        members.sort_by(|a, b| a.admitted_at.cmp(&b.admitted_at).then(a.id.cmp(&b.id)));

        RegistrySnapshot {
            members,
            stats: self.stats,
        }
    }
}

/// Cloneable handle to the registry event loop.
#[derive(Debug, Clone)]
pub struct RegistryHandle {
    sender: mpsc::Sender<RegistryCommand>,
}

impl RegistryHandle {
    /// Admit a member. It is a broadcast target as soon as this returns.
    pub async fn admit(&self, id: MemberId, mailbox: MailboxSender) -> Result<(), RegistryError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(RegistryCommand::Admit {
                id,
                mailbox,
                respond_to: tx,
            })
            .await
            .map_err(|_| RegistryError::Stopped)?;
        rx.await.map_err(|_| RegistryError::Stopped)?
    }

    /// Remove a member and close its mailbox.
    ///
    /// Returns `false` if the member was not admitted (already removed or
    /// evicted); calling this more than once is harmless.
    pub async fn remove(&self, id: MemberId) -> Result<bool, RegistryError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(RegistryCommand::Remove { id, respond_to: tx })
            .await
            .map_err(|_| RegistryError::Stopped)?;
        rx.await.map_err(|_| RegistryError::Stopped)
    }

    /// Queue a broadcast of `frame` to every member except `exclude`.
    ///
    /// Returns once the command is queued; delivery happens when the event
    /// loop processes it, in the order commands were queued.
    pub async fn broadcast(
        &self,
        frame: Frame,
        exclude: Option<MemberId>,
    ) -> Result<(), RegistryError> {
        self.sender
            .send(RegistryCommand::Broadcast { frame, exclude })
            .await
            .map_err(|_| RegistryError::Stopped)
    }

    /// Membership and counters after every previously queued command.
    pub async fn snapshot(&self) -> Result<RegistrySnapshot, RegistryError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(RegistryCommand::Snapshot { respond_to: tx })
            .await
            .map_err(|_| RegistryError::Stopped)?;
        rx.await.map_err(|_| RegistryError::Stopped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::mailbox::{MailboxReceiver, mailbox};
    use hiroba_shared::time::FixedClock;

    fn capacity(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    fn create_test_registry() -> Registry {
        Registry::new(Arc::new(FixedClock::new(1000)))
    }

    fn admit_member(registry: &mut Registry, mailbox_capacity: usize) -> (MemberId, MailboxReceiver) {
        let id = MemberId::generate();
        let (sender, receiver) = mailbox(capacity(mailbox_capacity));
        registry.admit(id, sender).unwrap();
        (id, receiver)
    }

    fn drain(receiver: &mut MailboxReceiver) -> Vec<Frame> {
        std::iter::from_fn(|| receiver.try_recv()).collect()
    }

    #[test]
    fn test_admit_adds_member_with_admission_time() {
        // テスト項目: 受け入れたメンバーが admitted_at 付きでスナップショットに現れる
        // given (前提条件):
        let mut registry = create_test_registry();

        // when (操作):
        let (id, _receiver) = admit_member(&mut registry, 4);

        // then (期待する結果):
        let snapshot = registry.snapshot();
        assert_eq!(snapshot.member_count(), 1);
        assert_eq!(snapshot.members[0].id, id);
        assert_eq!(snapshot.members[0].admitted_at, 1000);
        assert_eq!(snapshot.stats.admitted, 1);
    }

    #[test]
    fn test_admit_rejects_duplicate_member() {
        // テスト項目: 既に登録済みの MemberId の受け入れは拒否され、集合は変わらない
        // given (前提条件):
        let mut registry = create_test_registry();
        let (id, mut original) = admit_member(&mut registry, 4);
        let (duplicate_sender, _duplicate_receiver) = mailbox(capacity(4));

        // when (操作):
        let result = registry.admit(id, duplicate_sender);

        // then (期待する結果):
        assert_eq!(result, Err(RegistryError::AlreadyAdmitted(id)));
        assert_eq!(registry.snapshot().member_count(), 1);
        // The original mailbox is still the one receiving broadcasts
        registry.broadcast(&Frame::from("still here"), None);
        assert_eq!(drain(&mut original), vec![Frame::from("still here")]);
    }

    #[test]
    fn test_broadcast_excludes_sender() {
        // テスト項目: ブロードキャストは送信者以外の全メンバーに届く
        // given (前提条件):
        let mut registry = create_test_registry();
        let (alice, mut alice_rx) = admit_member(&mut registry, 4);
        let (_bob, mut bob_rx) = admit_member(&mut registry, 4);
        let (_charlie, mut charlie_rx) = admit_member(&mut registry, 4);

        // when (操作):
        let outcome = registry.broadcast(&Frame::from("hello"), Some(&alice));

        // then (期待する結果):
        assert_eq!(outcome.delivered, 2);
        assert!(drain(&mut alice_rx).is_empty());
        assert_eq!(drain(&mut bob_rx), vec![Frame::from("hello")]);
        assert_eq!(drain(&mut charlie_rx), vec![Frame::from("hello")]);
    }

    #[test]
    fn test_broadcast_without_exclusion_reaches_everyone() {
        // テスト項目: 除外指定がない場合は全メンバーに届く
        // given (前提条件):
        let mut registry = create_test_registry();
        let (_alice, mut alice_rx) = admit_member(&mut registry, 4);
        let (_bob, mut bob_rx) = admit_member(&mut registry, 4);

        // when (操作):
        let outcome = registry.broadcast(&Frame::from("notice"), None);

        // then (期待する結果):
        assert_eq!(outcome.delivered, 2);
        assert_eq!(drain(&mut alice_rx).len(), 1);
        assert_eq!(drain(&mut bob_rx).len(), 1);
    }

    #[test]
    fn test_remove_closes_mailbox_and_is_idempotent() {
        // テスト項目: 削除でメールボックスが閉じ、二度目の削除は何もしない
        // given (前提条件):
        let mut registry = create_test_registry();
        let (id, mut receiver) = admit_member(&mut registry, 4);

        // when (操作):
        let first = registry.remove(&id);
        let second = registry.remove(&id);

        // then (期待する結果):
        assert!(first);
        assert!(!second);
        assert_eq!(registry.snapshot().member_count(), 0);
        assert_eq!(registry.snapshot().stats.removed, 1);
        assert!(receiver.is_closed());
        assert_eq!(receiver.try_recv(), None);
    }

    #[test]
    fn test_removed_member_receives_no_further_broadcasts() {
        // テスト項目: 削除後のメンバーにはブロードキャストが届かない
        // given (前提条件):
        let mut registry = create_test_registry();
        let (alice, _alice_rx) = admit_member(&mut registry, 4);
        let (bob, _bob_rx) = admit_member(&mut registry, 4);
        registry.remove(&bob);

        // when (操作):
        let outcome = registry.broadcast(&Frame::from("hi"), Some(&alice));

        // then (期待する結果):
        assert_eq!(outcome.delivered, 0);
        assert!(outcome.evicted.is_empty());
    }

    #[test]
    fn test_slow_consumer_is_evicted_on_overflow() {
        // テスト項目: 容量 C のメールボックスに C+1 回配信するとメンバーが退去させられる
        // given (前提条件):
        let mut registry = create_test_registry();
        let (sender, _sender_rx) = admit_member(&mut registry, 8);
        let (slow, mut slow_rx) = admit_member(&mut registry, 2);

        // when (操作):
        let outcomes: Vec<BroadcastOutcome> = (0..3)
            .map(|i| registry.broadcast(&Frame::from(format!("m{}", i)), Some(&sender)))
            .collect();

        // then (期待する結果):
        assert!(outcomes[0].evicted.is_empty());
        assert!(outcomes[1].evicted.is_empty());
        assert_eq!(outcomes[2].evicted, vec![slow]);
        let snapshot = registry.snapshot();
        assert!(!snapshot.contains(&slow));
        assert_eq!(snapshot.stats.evicted, 1);

        // Queued frames are still drained, then the mailbox reports closed
        assert_eq!(
            drain(&mut slow_rx),
            vec![Frame::from("m0"), Frame::from("m1")]
        );
        assert!(slow_rx.is_closed());

        // Subsequent broadcasts no longer reference the evicted member
        let outcome = registry.broadcast(&Frame::from("m3"), Some(&sender));
        assert_eq!(outcome.delivered, 0);
        assert!(outcome.evicted.is_empty());
    }

    #[test]
    fn test_eviction_does_not_affect_healthy_members() {
        // テスト項目: 遅いメンバーの退去は他のメンバーへの配信を妨げない
        // given (前提条件):
        let mut registry = create_test_registry();
        let (slow, _slow_rx) = admit_member(&mut registry, 1);
        let (_healthy, mut healthy_rx) = admit_member(&mut registry, 8);

        // when (操作):
        registry.broadcast(&Frame::from("a"), None);
        let outcome = registry.broadcast(&Frame::from("b"), None);

        // then (期待する結果):
        assert_eq!(outcome.evicted, vec![slow]);
        assert_eq!(outcome.delivered, 1);
        assert_eq!(
            drain(&mut healthy_rx),
            vec![Frame::from("a"), Frame::from("b")]
        );
    }

    #[test]
    fn test_member_with_dropped_consumer_is_removed() {
        // テスト項目: 受信側がいなくなったメンバーは配信時に集合から外される
        // given (前提条件):
        let mut registry = create_test_registry();
        let (gone, gone_rx) = admit_member(&mut registry, 4);
        drop(gone_rx);

        // when (操作):
        let outcome = registry.broadcast(&Frame::from("anyone?"), None);

        // then (期待する結果):
        assert_eq!(outcome.closed, vec![gone]);
        let snapshot = registry.snapshot();
        assert_eq!(snapshot.member_count(), 0);
        assert_eq!(snapshot.stats.removed, 1);
        assert_eq!(snapshot.stats.evicted, 0);
    }

    #[test]
    fn test_snapshot_is_sorted_by_admission_time() {
        // テスト項目: スナップショットのメンバーは受け入れ時刻順に並ぶ
        // given (前提条件):
        let clock = Arc::new(SteppingClock::default());
        let mut registry = Registry::new(clock);
        let (first, _first_rx) = admit_member(&mut registry, 1);
        let (second, _second_rx) = admit_member(&mut registry, 1);
        let (third, _third_rx) = admit_member(&mut registry, 1);

        // when (操作):
        let snapshot = registry.snapshot();

        // then (期待する結果):
        let ids: Vec<MemberId> = snapshot.members.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![first, second, third]);
    }

    #[derive(Default)]
    struct SteppingClock {
        ticks: std::sync::atomic::AtomicI64,
    }

    impl Clock for SteppingClock {
        fn now_millis(&self) -> i64 {
            self.ticks
                .fetch_add(1, std::sync::atomic::Ordering::Relaxed)
        }
    }

    #[tokio::test]
    async fn test_handle_serializes_commands() {
        // テスト項目: ハンドル経由の操作はキュー順に処理され、スナップショットは直前までの結果を反映する
        // given (前提条件):
        let handle = create_test_registry().spawn(capacity(16));
        let alice = MemberId::generate();
        let bob = MemberId::generate();
        let (alice_tx, mut alice_rx) = mailbox(capacity(4));
        let (bob_tx, mut bob_rx) = mailbox(capacity(4));
        handle.admit(alice, alice_tx).await.unwrap();
        handle.admit(bob, bob_tx).await.unwrap();

        // when (操作):
        handle.broadcast(Frame::from("first"), Some(alice)).await.unwrap();
        handle.broadcast(Frame::from("second"), Some(bob)).await.unwrap();
        handle.broadcast(Frame::from("third"), Some(alice)).await.unwrap();
        let snapshot = handle.snapshot().await.unwrap();

        // then (期待する結果):
        assert_eq!(snapshot.member_count(), 2);
        assert_eq!(snapshot.stats.broadcasts, 3);
        assert_eq!(snapshot.stats.deliveries, 3);
        assert_eq!(alice_rx.recv().await, Some(Frame::from("second")));
        assert_eq!(bob_rx.recv().await, Some(Frame::from("first")));
        assert_eq!(bob_rx.recv().await, Some(Frame::from("third")));
    }

    #[tokio::test]
    async fn test_handle_remove_twice_has_single_effect() {
        // テスト項目: 同じメンバーを二度削除しても一度目と同じ結果になる
        // given (前提条件):
        let handle = create_test_registry().spawn(capacity(16));
        let id = MemberId::generate();
        let (sender, mut receiver) = mailbox(capacity(4));
        handle.admit(id, sender).await.unwrap();

        // when (操作):
        let first = handle.remove(id).await.unwrap();
        let second = handle.remove(id).await.unwrap();

        // then (期待する結果):
        assert!(first);
        assert!(!second);
        assert_eq!(receiver.recv().await, None);
        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.stats.removed, 1);
        assert_eq!(snapshot.member_count(), 0);
    }

    #[tokio::test]
    async fn test_handle_reports_stopped_registry() {
        // テスト項目: イベントループが停止している場合、ハンドルの操作は Stopped を返す
        // given (前提条件):
        let (sender, receiver) = mpsc::channel(1);
        drop(receiver);
        let handle = RegistryHandle { sender };
        let (mailbox_tx, _mailbox_rx) = mailbox(capacity(1));

        // when (操作):
        let admitted = handle.admit(MemberId::generate(), mailbox_tx).await;
        let snapshot = handle.snapshot().await;

        // then (期待する結果):
        assert_eq!(admitted, Err(RegistryError::Stopped));
        assert_eq!(snapshot, Err(RegistryError::Stopped));
    }
}
