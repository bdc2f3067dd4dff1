//! Listener doubles shared by the application tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::domain::action::Action;
use crate::domain::foundation::Identity;
use crate::ports::{Listener, ListenerError};

/// Records every action it is notified of.
pub(crate) struct RecordingListener {
    identity: Identity,
    seen: Mutex<Vec<Action>>,
    alive: AtomicBool,
}

impl RecordingListener {
    pub(crate) fn new(identity: &str) -> Arc<Self> {
        Arc::new(Self {
            identity: Identity::new(identity),
            seen: Mutex::new(Vec::new()),
            alive: AtomicBool::new(true),
        })
    }

    pub(crate) fn actions(&self) -> Vec<Action> {
        self.seen.lock().unwrap().clone()
    }

    pub(crate) fn labels(&self) -> Vec<&'static str> {
        self.seen.lock().unwrap().iter().map(Action::label).collect()
    }

    pub(crate) fn last(&self) -> Option<Action> {
        self.seen.lock().unwrap().last().cloned()
    }

    pub(crate) fn clear(&self) {
        self.seen.lock().unwrap().clear();
    }

    /// Makes every later pulse check fail.
    pub(crate) fn kill(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl Listener for RecordingListener {
    fn identity(&self) -> &Identity {
        &self.identity
    }

    async fn notify(&self, action: &Action) -> Result<(), ListenerError> {
        self.seen.lock().unwrap().push(action.clone());
        Ok(())
    }

    async fn heartbeat(&self) -> Result<(), ListenerError> {
        Ok(())
    }

    async fn check_pulse(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }
}

/// Records like [`RecordingListener`] but parks inside `notify` for one
/// action label until the test opens the gate.
pub(crate) struct GatedListener {
    inner: Arc<RecordingListener>,
    label: &'static str,
    reached: tokio::sync::Notify,
    gate: tokio::sync::Notify,
}

impl GatedListener {
    pub(crate) fn new(identity: &str, label: &'static str) -> Arc<Self> {
        Arc::new(Self {
            inner: RecordingListener::new(identity),
            label,
            reached: tokio::sync::Notify::new(),
            gate: tokio::sync::Notify::new(),
        })
    }

    /// Waits until a notify for the gated label is parked.
    pub(crate) async fn parked(&self) {
        self.reached.notified().await;
    }

    pub(crate) fn open(&self) {
        self.gate.notify_one();
    }

    pub(crate) fn labels(&self) -> Vec<&'static str> {
        self.inner.labels()
    }
}

#[async_trait]
impl Listener for GatedListener {
    fn identity(&self) -> &Identity {
        self.inner.identity()
    }

    async fn notify(&self, action: &Action) -> Result<(), ListenerError> {
        if action.label() == self.label {
            self.reached.notify_one();
            self.gate.notified().await;
        }
        self.inner.notify(action).await
    }

    async fn heartbeat(&self) -> Result<(), ListenerError> {
        Ok(())
    }

    async fn check_pulse(&self) -> bool {
        self.inner.check_pulse().await
    }
}
