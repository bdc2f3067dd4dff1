//! Shared plumbing for session controllers.

use std::sync::Arc;

use crate::application::liveness::DeadListenerSink;
use crate::domain::action::Action;
use crate::domain::foundation::Identity;
use crate::ports::Listener;

/// Model plus the listeners observing it. Always lives behind the owning
/// controller's mutex.
pub(crate) struct SessionCore<M> {
    pub(crate) model: M,
    pub(crate) listeners: Vec<Arc<dyn Listener>>,
    /// Set once the session handed its members elsewhere. A retired session
    /// answers `DispatchError::Moved` so callers look the route up again.
    pub(crate) retired: bool,
}

impl<M> SessionCore<M> {
    pub(crate) fn new(model: M, listeners: Vec<Arc<dyn Listener>>) -> Self {
        Self {
            model,
            listeners,
            retired: false,
        }
    }

    pub(crate) fn attach(&mut self, listener: Arc<dyn Listener>) {
        if !self.listeners.iter().any(|l| Arc::ptr_eq(l, &listener)) {
            self.listeners.push(listener);
        }
    }

    /// Returns false when the listener was not attached here.
    pub(crate) fn detach(&mut self, listener: &Arc<dyn Listener>) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|l| !Arc::ptr_eq(l, listener));
        self.listeners.len() != before
    }

    pub(crate) fn is_attached(&self, identity: &Identity) -> bool {
        self.listeners.iter().any(|l| l.identity() == identity)
    }

    pub(crate) fn listeners_of(&self, identity: &Identity) -> Vec<Arc<dyn Listener>> {
        self.listeners
            .iter()
            .filter(|l| l.identity() == identity)
            .cloned()
            .collect()
    }

    /// Detaches every listener of `identity`.
    pub(crate) fn release(&mut self, identity: &Identity) -> Vec<Arc<dyn Listener>> {
        let (released, kept) = std::mem::take(&mut self.listeners)
            .into_iter()
            .partition(|l| l.identity() == identity);
        self.listeners = kept;
        released
    }
}

/// Delivers `action` to every listener in order.
///
/// Notify failures are logged and never abort the fan-out. A listener whose
/// pulse is gone afterwards is reported on `dead`; removing it is the
/// disconnect monitor's job since the caller holds a session lock.
pub(crate) async fn fan_out(
    listeners: &[Arc<dyn Listener>],
    action: &Action,
    dead: &DeadListenerSink,
) {
    for listener in listeners {
        if let Err(e) = listener.notify(action).await {
            tracing::warn!(
                identity = %listener.identity(),
                action = action.label(),
                error = %e,
                "notify failed"
            );
        }
        if !listener.check_pulse().await {
            tracing::debug!(identity = %listener.identity(), "pulse lost during fan-out");
            let _ = dead.send(listener.clone());
        }
    }
}
