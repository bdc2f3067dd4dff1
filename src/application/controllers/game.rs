//! Game controller - the authoritative game session.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;

use super::session::{fan_out, SessionCore};
use crate::application::liveness::DeadListenerSink;
use crate::domain::action::{Action, ServerAction};
use crate::domain::foundation::{GameId, Identity, Timestamp};
use crate::domain::game::{Game, GameState};
use crate::ports::{DispatchError, Listener};

pub struct GameController {
    id: GameId,
    /// Fixed at creation; lets reconnect lookups skip the session lock.
    members: Vec<Identity>,
    ended: AtomicBool,
    inner: Mutex<SessionCore<Game>>,
    dead: DeadListenerSink,
}

impl GameController {
    pub fn new(game: Game, listeners: Vec<Arc<dyn Listener>>, dead: DeadListenerSink) -> Self {
        Self {
            id: game.id(),
            members: game.players().iter().map(|p| p.identity.clone()).collect(),
            ended: AtomicBool::new(game.state() == GameState::Ended),
            inner: Mutex::new(SessionCore::new(game, listeners)),
            dead,
        }
    }

    pub fn id(&self) -> GameId {
        self.id
    }

    pub fn members(&self) -> &[Identity] {
        &self.members
    }

    pub fn is_member(&self, identity: &Identity) -> bool {
        self.members.contains(identity)
    }

    pub fn has_ended(&self) -> bool {
        self.ended.load(Ordering::Acquire)
    }

    pub async fn snapshot(&self) -> Game {
        self.inner.lock().await.model.clone()
    }

    pub async fn ended_at(&self) -> Option<Timestamp> {
        self.inner.lock().await.model.ended_at()
    }

    pub async fn listener_count(&self) -> usize {
        self.inner.lock().await.listeners.len()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Commands
    // ─────────────────────────────────────────────────────────────────────────

    /// Sends the opening snapshot to everyone migrated in from the lobby.
    pub async fn announce_start(&self) {
        let mut inner = self.inner.lock().await;
        let mut start = Action::server(
            Identity::server(),
            ServerAction::GameStart {
                game: Box::new(inner.model.clone()),
            },
        );
        if start.apply(&mut inner.model).is_ok() {
            start.refresh_snapshot(&inner.model);
        }
        fan_out(&inner.listeners, &start, &self.dead).await;
    }

    pub async fn execute(&self, mut action: Action) -> Result<(), DispatchError> {
        let mut inner = self.inner.lock().await;
        if inner.retired {
            return Err(DispatchError::Moved(action.identity));
        }
        if action.apply(&mut inner.model).is_ok() {
            self.track_end(&inner.model);
        }
        fan_out(&inner.listeners, &action, &self.dead).await;
        Ok(())
    }

    /// Reattaches a reconnecting member and resyncs everyone.
    pub async fn resume(&self, listener: Arc<dyn Listener>) -> Result<(), DispatchError> {
        let mut inner = self.inner.lock().await;
        let identity = listener.identity().clone();
        if inner.retired || !self.is_member(&identity) {
            return Err(DispatchError::Moved(identity));
        }

        let mut resume = Action::server(
            identity.clone(),
            ServerAction::Resume {
                game: Box::new(inner.model.clone()),
            },
        );
        if resume.apply(&mut inner.model).is_ok() {
            self.track_end(&inner.model);
        }
        resume.refresh_snapshot(&inner.model);
        inner.attach(listener);
        tracing::info!(game_id = %self.id, identity = %identity, "player resumed");

        fan_out(&inner.listeners, &resume, &self.dead).await;
        Ok(())
    }

    /// Detaches a listener. When it was the identity's last one the player is
    /// hung, once, and the remaining players are told.
    ///
    /// Returns true when a hang was applied.
    pub async fn detach(&self, listener: &Arc<dyn Listener>) -> bool {
        let mut inner = self.inner.lock().await;
        if !inner.detach(listener) || inner.retired {
            return false;
        }
        let identity = listener.identity();
        if inner.is_attached(identity) {
            return false;
        }

        let mut hang = Action::server(identity.clone(), ServerAction::Hang);
        if let Err(e) = hang.apply(&mut inner.model) {
            tracing::debug!(game_id = %self.id, identity = %identity, error = %e, "hang not applied");
            return false;
        }
        self.track_end(&inner.model);
        tracing::info!(game_id = %self.id, identity = %identity, "player hung");
        fan_out(&inner.listeners, &hang, &self.dead).await;
        true
    }

    /// Stops accepting actions; used when an ended game is evicted.
    pub async fn retire(&self) {
        let mut inner = self.inner.lock().await;
        inner.retired = true;
        inner.listeners.clear();
    }

    fn track_end(&self, game: &Game) {
        if game.state() == GameState::Ended {
            self.ended.store(true, Ordering::Release);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::liveness::dead_listener_channel;
    use crate::application::test_support::RecordingListener;
    use crate::domain::action::PlayerAction;
    use crate::domain::game::{GameFactory, Side, StandardGameFactory};
    use crate::domain::lobby::{Lobby, Pawn};

    fn id(s: &str) -> Identity {
        Identity::new(s)
    }

    fn game() -> Game {
        let mut lobby = Lobby::new(2);
        lobby.add_player(id("a"), "alice", Some(Pawn::Red)).unwrap();
        lobby.add_player(id("b"), "bob", Some(Pawn::Blue)).unwrap();
        StandardGameFactory::default().from_lobby(&lobby)
    }

    fn controller() -> (GameController, Arc<RecordingListener>, Arc<RecordingListener>) {
        let (dead, _feed) = dead_listener_channel();
        let a = RecordingListener::new("a");
        let b = RecordingListener::new("b");
        let listeners: Vec<Arc<dyn Listener>> = vec![a.clone(), b.clone()];
        (GameController::new(game(), listeners, dead), a, b)
    }

    #[tokio::test]
    async fn start_is_announced_with_snapshot() {
        let (controller, a, b) = controller();
        controller.announce_start().await;

        for listener in [&a, &b] {
            assert_eq!(listener.labels(), vec!["game_start"]);
        }
    }

    #[tokio::test]
    async fn actions_are_fanned_out_to_every_member() {
        let (controller, a, b) = controller();
        controller
            .execute(Action::player(id("a"), PlayerAction::PlaceStarterCard { side: Side::Front }))
            .await
            .unwrap();

        assert_eq!(a.labels(), vec!["place_starter_card"]);
        assert_eq!(b.labels(), vec!["place_starter_card"]);
        assert!(controller.snapshot().await.players()[0].starter_placed());
    }

    #[tokio::test]
    async fn chat_is_kept_and_sent_to_every_member() {
        let (controller, a, b) = controller();
        controller
            .execute(Action::player(
                id("b"),
                PlayerAction::SendMessage {
                    message: "hello".into(),
                },
            ))
            .await
            .unwrap();

        assert_eq!(a.labels(), vec!["send_message"]);
        assert_eq!(b.labels(), vec!["send_message"]);
        let game = controller.snapshot().await;
        assert_eq!(game.chat().last(1)[0].text, "hello");
        assert_eq!(game.chat().last(1)[0].nickname, "bob");
    }

    #[tokio::test]
    async fn last_listener_gone_hangs_exactly_once() {
        let (controller, a, b) = controller();
        let a_dyn: Arc<dyn Listener> = a.clone();

        assert!(controller.detach(&a_dyn).await);
        assert!(!controller.detach(&a_dyn).await);

        assert!(controller.snapshot().await.is_disconnected(&id("a")));
        assert_eq!(b.labels(), vec!["hang"]);
        assert!(a.labels().is_empty());
    }

    #[tokio::test]
    async fn resume_reattaches_and_resyncs() {
        let (controller, a, b) = controller();
        let a_dyn: Arc<dyn Listener> = a.clone();
        controller.detach(&a_dyn).await;

        let again = RecordingListener::new("a");
        controller.resume(again.clone()).await.unwrap();

        assert!(!controller.snapshot().await.is_disconnected(&id("a")));
        assert_eq!(again.labels(), vec!["resume"]);
        assert_eq!(b.labels(), vec!["hang", "resume"]);
        assert_eq!(controller.listener_count().await, 2);
    }

    #[tokio::test]
    async fn retired_controller_reports_moved() {
        let (controller, _a, _b) = controller();
        controller.retire().await;

        let err = controller
            .execute(Action::player(id("a"), PlayerAction::PlaceStarterCard { side: Side::Front }))
            .await
            .unwrap_err();
        assert_eq!(err, DispatchError::Moved(id("a")));
    }
}
