//! Liveness - heartbeat producer and dead-listener consumer.
//!
//! ## Pieces
//!
//! | Piece | Role |
//! |-------|------|
//! | [`Pulse`] | Last-heartbeat clock carried by every listener |
//! | [`HeartbeatBroadcaster`] | Pushes heartbeats through every binding on a fixed interval |
//! | [`DisconnectMonitor`] | Removes listeners reported dead, outside any session lock |
//!
//! Controllers never disconnect a listener themselves while fanning out:
//! they report it on the dead-listener channel, and the monitor calls
//! [`Dispatcher::remove_listener`], which is where disconnect handling
//! (including the game's hang action) happens exactly once.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::ports::{Dispatcher, KeepAlive, Listener};

/// Sender side of the dead-listener channel.
pub type DeadListenerSink = mpsc::UnboundedSender<Arc<dyn Listener>>;

/// Receiver side of the dead-listener channel.
pub type DeadListenerFeed = mpsc::UnboundedReceiver<Arc<dyn Listener>>;

pub fn dead_listener_channel() -> (DeadListenerSink, DeadListenerFeed) {
    mpsc::unbounded_channel()
}

/// Heartbeat clock.
///
/// Alive while the last [`touch`](Pulse::touch) is younger than the
/// threshold. Creation counts as the first heartbeat.
#[derive(Debug)]
pub struct Pulse {
    origin: Instant,
    last_beat_ms: AtomicU64,
    threshold: Duration,
}

impl Pulse {
    pub fn new(threshold: Duration) -> Self {
        Self {
            origin: Instant::now(),
            last_beat_ms: AtomicU64::new(0),
            threshold,
        }
    }

    pub fn touch(&self) {
        self.last_beat_ms.store(self.elapsed_ms(), Ordering::Release);
    }

    pub fn is_alive(&self) -> bool {
        self.silence() < self.threshold
    }

    /// Time since the last heartbeat.
    pub fn silence(&self) -> Duration {
        let last = self.last_beat_ms.load(Ordering::Acquire);
        Duration::from_millis(self.elapsed_ms().saturating_sub(last))
    }

    pub fn threshold(&self) -> Duration {
        self.threshold
    }

    fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

/// Periodically pushes heartbeats through every registered binding.
pub struct HeartbeatBroadcaster {
    bindings: Vec<Arc<dyn KeepAlive>>,
    interval: Duration,
}

impl HeartbeatBroadcaster {
    pub fn new(interval: Duration) -> Self {
        Self {
            bindings: Vec::new(),
            interval,
        }
    }

    pub fn with_binding(mut self, binding: Arc<dyn KeepAlive>) -> Self {
        self.bindings.push(binding);
        self
    }

    /// Run the heartbeat loop until shutdown signal is received.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        tracing::debug!("heartbeat broadcaster stopping");
                        return;
                    }
                }
                _ = ticker.tick() => self.beat_once().await,
            }
        }
    }

    /// One heartbeat round over every binding.
    pub async fn beat_once(&self) {
        for binding in &self.bindings {
            tracing::trace!(binding = binding.name(), "sending heartbeats");
            binding.send_heartbeats().await;
        }
    }
}

/// Consumes dead-listener reports and detaches them from their session.
pub struct DisconnectMonitor {
    dispatcher: Arc<dyn Dispatcher>,
    feed: DeadListenerFeed,
}

impl DisconnectMonitor {
    pub fn new(dispatcher: Arc<dyn Dispatcher>, feed: DeadListenerFeed) -> Self {
        Self { dispatcher, feed }
    }

    /// Run until shutdown or until every sender is gone.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        return;
                    }
                }
                report = self.feed.recv() => match report {
                    Some(listener) => self.handle(listener).await,
                    None => return,
                },
            }
        }
    }

    /// Handles every report already queued (for tests and shutdown).
    pub async fn drain(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(listener) = self.feed.try_recv() {
            self.handle(listener).await;
            handled += 1;
        }
        handled
    }

    async fn handle(&self, listener: Arc<dyn Listener>) {
        tracing::info!(identity = %listener.identity(), "listener judged dead, disconnecting");
        if let Err(e) = self.dispatcher.remove_listener(&listener).await {
            tracing::warn!(identity = %listener.identity(), error = %e, "failed to remove dead listener");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::action::Action;
    use crate::domain::foundation::Identity;
    use crate::ports::{DispatchError, ListenerError};
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Mutex;

    #[tokio::test(start_paused = true)]
    async fn pulse_dies_after_threshold_of_silence() {
        let pulse = Pulse::new(Duration::from_secs(10));
        assert!(pulse.is_alive());

        time::advance(Duration::from_secs(9)).await;
        assert!(pulse.is_alive());

        time::advance(Duration::from_secs(2)).await;
        assert!(!pulse.is_alive());
    }

    #[tokio::test(start_paused = true)]
    async fn touch_restarts_the_clock() {
        let pulse = Pulse::new(Duration::from_secs(10));
        time::advance(Duration::from_secs(8)).await;
        pulse.touch();
        time::advance(Duration::from_secs(8)).await;

        assert!(pulse.is_alive());
        assert_eq!(pulse.silence(), Duration::from_secs(8));
    }

    struct CountingBinding {
        beats: AtomicUsize,
    }

    #[async_trait]
    impl KeepAlive for CountingBinding {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn send_heartbeats(&self) {
            self.beats.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn broadcaster_beats_on_every_interval_until_shutdown() {
        let binding = Arc::new(CountingBinding {
            beats: AtomicUsize::new(0),
        });
        let broadcaster =
            HeartbeatBroadcaster::new(Duration::from_secs(1)).with_binding(binding.clone());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(async move { broadcaster.run(shutdown_rx).await });
        // First tick fires immediately, then once per second.
        time::sleep(Duration::from_millis(3500)).await;
        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();

        assert_eq!(binding.beats.load(Ordering::SeqCst), 4);
    }

    struct SilentListener {
        identity: Identity,
    }

    #[async_trait]
    impl Listener for SilentListener {
        fn identity(&self) -> &Identity {
            &self.identity
        }

        async fn notify(&self, _action: &Action) -> Result<(), ListenerError> {
            Ok(())
        }

        async fn heartbeat(&self) -> Result<(), ListenerError> {
            Ok(())
        }

        async fn check_pulse(&self) -> bool {
            false
        }
    }

    #[derive(Default)]
    struct RecordingDispatcher {
        removed: Mutex<Vec<Identity>>,
    }

    #[async_trait]
    impl Dispatcher for RecordingDispatcher {
        async fn execute(&self, _action: Action) -> Result<(), DispatchError> {
            Ok(())
        }

        async fn register_new_listener(
            &self,
            _listener: Arc<dyn Listener>,
        ) -> Result<(), DispatchError> {
            Ok(())
        }

        async fn remove_listener(&self, listener: &Arc<dyn Listener>) -> Result<(), DispatchError> {
            self.removed.lock().await.push(listener.identity().clone());
            Ok(())
        }
    }

    #[tokio::test]
    async fn monitor_removes_reported_listeners() {
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let (sink, feed) = dead_listener_channel();
        let mut monitor = DisconnectMonitor::new(dispatcher.clone(), feed);

        let listener: Arc<dyn Listener> = Arc::new(SilentListener {
            identity: Identity::new("alice"),
        });
        sink.send(listener).unwrap();

        assert_eq!(monitor.drain().await, 1);
        assert_eq!(*dispatcher.removed.lock().await, vec![Identity::new("alice")]);
    }
}
