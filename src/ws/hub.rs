//! Per-scope broadcast hub with bounded replay.
//!
//! A [`Channel`] is one logical feed: a FIFO replay buffer capped at the
//! configured capacity plus a dynamic set of live subscriber sinks. New
//! subscribers receive the buffered backlog first and then join the live
//! feed; the handoff happens under a single lock acquisition so no event
//! can be duplicated, dropped, or reordered around it.
//!
//! Sinks are bounded mpsc senders. A sink that is full (stalled consumer)
//! or closed (disconnected consumer) is pruned on the spot without
//! affecting delivery to the remaining sinks, and without ever blocking
//! the publisher.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use log::{info, warn};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use super::types::{LogFrame, TraceFrame};

/// Default replay buffer capacity per feed.
pub const DEFAULT_REPLAY_CAPACITY: usize = 100;

/// Extra per-sink queue room beyond the replay capacity. Replay always
/// fits, and a live subscriber may fall this many events behind before it
/// counts as stalled and is pruned.
pub const SINK_SLACK: usize = 64;

struct Sink<T> {
    id: u64,
    tx: mpsc::Sender<T>,
}

struct ChannelInner<T> {
    buffer: VecDeque<T>,
    sinks: Vec<Sink<T>>,
}

/// One broadcast feed: bounded replay buffer plus live sinks.
pub struct Channel<T> {
    capacity: usize,
    next_id: AtomicU64,
    inner: Mutex<ChannelInner<T>>,
}

/// A live subscription to a [`Channel`].
///
/// Receives the replayed backlog first, then live events. Dropping the
/// subscription without calling [`Channel::unsubscribe`] is fine: the
/// closed sink is pruned on the next publish.
pub struct Subscription<T> {
    id: u64,
    rx: mpsc::Receiver<T>,
}

impl<T> Subscription<T> {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Receive the next event. `None` means the sink was pruned (this
    /// subscriber stalled) or the channel was dropped.
    pub async fn recv(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// Unwrap into the raw receiver, for adapters that need a `Stream`.
    pub fn into_receiver(self) -> mpsc::Receiver<T> {
        self.rx
    }
}

impl<T: Clone> Channel<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            next_id: AtomicU64::new(0),
            inner: Mutex::new(ChannelInner {
                buffer: VecDeque::with_capacity(capacity),
                sinks: Vec::new(),
            }),
        }
    }

    /// Append an event to the replay buffer (evicting the oldest entry at
    /// capacity) and push it to every live sink. Never blocks.
    pub fn publish(&self, event: T) {
        let mut inner = self.inner.lock().expect("hub lock poisoned");
        if self.capacity > 0 {
            if inner.buffer.len() == self.capacity {
                inner.buffer.pop_front();
            }
            inner.buffer.push_back(event.clone());
        }

        inner.sinks.retain(|sink| match sink.tx.try_send(event.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!("Pruning stalled subscriber {}", sink.id);
                false
            }
            Err(TrySendError::Closed(_)) => false,
        });
    }

    /// Register a new subscriber. The current buffer contents are
    /// delivered to it, in order, before any subsequently published event.
    pub fn subscribe(&self) -> Subscription<T> {
        let mut inner = self.inner.lock().expect("hub lock poisoned");
        let (tx, rx) = mpsc::channel(self.capacity + SINK_SLACK);
        for event in &inner.buffer {
            // Cannot fail: the queue is empty and larger than the buffer.
            let _ = tx.try_send(event.clone());
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        inner.sinks.push(Sink { id, tx });
        Subscription { id, rx }
    }

    /// Remove a subscriber. Idempotent.
    pub fn unsubscribe(&self, id: u64) {
        let mut inner = self.inner.lock().expect("hub lock poisoned");
        inner.sinks.retain(|sink| sink.id != id);
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().expect("hub lock poisoned").sinks.len()
    }

    pub fn buffered_len(&self) -> usize {
        self.inner.lock().expect("hub lock poisoned").buffer.len()
    }
}

/// The broadcast feeds shared by everyone observing one scope.
///
/// Long-lived: the hub outlives any turn and any subscriber, so an
/// operator can attach a log viewer at any time and still see recent
/// history, and two browser tabs chatting against the same network
/// observe each other's trace and log events.
pub struct ScopeHub {
    scope: String,
    logs: Channel<LogFrame>,
    trace: Channel<TraceFrame>,
}

impl ScopeHub {
    pub fn new(scope: impl Into<String>, replay_capacity: usize) -> Self {
        Self {
            scope: scope.into(),
            logs: Channel::new(replay_capacity),
            trace: Channel::new(replay_capacity),
        }
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn logs(&self) -> &Channel<LogFrame> {
        &self.logs
    }

    pub fn trace(&self) -> &Channel<TraceFrame> {
        &self.trace
    }

    /// Record a log line: mirrored to the process log and broadcast to
    /// every log subscriber of this scope.
    pub fn log_event(&self, message: impl Into<String>, source: &str) {
        let frame = LogFrame::new(message, source);
        info!("[{}] {}: {}", self.scope, frame.source, frame.message);
        self.logs.publish(frame);
    }

    /// Broadcast one agent-trace step to every internal-chat subscriber.
    pub fn trace_event(&self, frame: TraceFrame) {
        self.trace.publish(frame);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(sub: &mut Subscription<u64>) -> Vec<u64> {
        let mut out = Vec::new();
        while let Ok(v) = sub.rx.try_recv() {
            out.push(v);
        }
        out
    }

    #[tokio::test]
    async fn replay_then_live_preserves_order_without_gaps() {
        let channel: Channel<u64> = Channel::new(100);
        for i in 0..60 {
            channel.publish(i);
        }
        let mut sub = channel.subscribe();
        for i in 60..120 {
            channel.publish(i);
        }
        let got = drain(&mut sub);
        assert_eq!(got, (0..120).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn subscriber_during_concurrent_publishing_sees_each_event_once() {
        let channel = std::sync::Arc::new(Channel::<u64>::new(100));
        let publisher = {
            let channel = channel.clone();
            tokio::spawn(async move {
                for i in 0..300 {
                    channel.publish(i);
                    tokio::task::yield_now().await;
                }
            })
        };

        tokio::task::yield_now().await;
        let mut sub = channel.subscribe();

        let mut got = Vec::new();
        while got.last() != Some(&299) {
            match sub.recv().await {
                Some(v) => got.push(v),
                None => panic!("subscriber was pruned"),
            }
        }
        publisher.await.unwrap();

        // A contiguous suffix of the published sequence: in order, no
        // duplicates, nothing skipped after the replay start.
        let first = got[0];
        assert_eq!(got, (first..300).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn buffer_is_bounded_and_keeps_newest() {
        let channel: Channel<u64> = Channel::new(100);
        for i in 0..250 {
            channel.publish(i);
        }
        assert_eq!(channel.buffered_len(), 100);

        let mut sub = channel.subscribe();
        let got = drain(&mut sub);
        assert_eq!(got, (150..250).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn stalled_sink_is_pruned_without_affecting_healthy_sink() {
        let channel: Channel<u64> = Channel::new(4);
        let stalled = channel.subscribe();
        let mut healthy = channel.subscribe();
        assert_eq!(channel.subscriber_count(), 2);

        let total = (4 + SINK_SLACK + 10) as u64;
        let mut got = Vec::new();
        for i in 0..total {
            channel.publish(i);
            // The healthy sink drains as it goes; the stalled one never does.
            while let Ok(v) = healthy.rx.try_recv() {
                got.push(v);
            }
        }

        assert_eq!(got, (0..total).collect::<Vec<_>>());
        assert_eq!(channel.subscriber_count(), 1);
        drop(stalled);
    }

    #[tokio::test]
    async fn unsubscribe_is_idempotent() {
        let channel: Channel<u64> = Channel::new(4);
        let sub = channel.subscribe();
        let id = sub.id();
        channel.unsubscribe(id);
        channel.unsubscribe(id);
        assert_eq!(channel.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn dropped_subscription_is_pruned_on_next_publish() {
        let channel: Channel<u64> = Channel::new(4);
        let sub = channel.subscribe();
        drop(sub);
        channel.publish(1);
        assert_eq!(channel.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn hub_log_event_reaches_log_subscribers() {
        let hub = ScopeHub::new("demo", 10);
        let mut sub = hub.logs().subscribe();
        hub.log_event("hello", super::super::types::SOURCE_BACKEND);
        let frame = sub.recv().await.unwrap();
        assert_eq!(frame.message, "hello");
        assert_eq!(frame.source, "swarmdeck");
    }
}
