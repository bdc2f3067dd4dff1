//! End-to-end sessions over the remote-invocation binding, alone and
//! mixed with TCP players.

mod common;

use codex_session::adapters::remote::{RemoteClient, RemoteClientConfig};
use codex_session::application::Placement;
use codex_session::domain::action::PlayerAction;
use codex_session::domain::client_state::PlayerState;
use codex_session::domain::game::{GameState, Side};
use codex_session::domain::lobby::Pawn;
use codex_session::ports::SessionConnection;
use common::{client_listener, eventually, id, view, TestServer};

async fn placement(server: &TestServer, who: &str) -> Option<Placement> {
    server.dispatcher.placement_of(&id(who)).await
}

#[tokio::test]
async fn remote_and_tcp_players_share_a_lobby() {
    let server = TestServer::start(2).await;
    let s = &server;

    let (a, a_view) = s.remote_player("a").await;
    assert!(matches!(placement(s, "a").await, Some(Placement::Lobby(_))));
    let (b, b_view) = s.tcp_player("b").await;
    eventually("b seated", || async move {
        placement(s, "b").await == placement(s, "a").await
    })
    .await;

    a.submit(PlayerAction::ChoosePawn { pawn: Pawn::Red }).await.unwrap();
    b.submit(PlayerAction::ChoosePawn { pawn: Pawn::Blue }).await.unwrap();

    for observer in [&a_view, &b_view] {
        eventually("game started", || async move {
            view(observer, |st| st.player_state() == PlayerState::SelectingStarterSide).await
        })
        .await;
    }
    assert!(matches!(placement(s, "a").await, Some(Placement::Game(_))));
}

#[tokio::test]
async fn closing_a_remote_client_hangs_the_player() {
    let server = TestServer::start(2).await;
    let s = &server;

    let (a, _a_view) = s.remote_player("a").await;
    let (b, b_view) = s.remote_player("b").await;
    a.submit(PlayerAction::ChoosePawn { pawn: Pawn::Red }).await.unwrap();
    b.submit(PlayerAction::ChoosePawn { pawn: Pawn::Blue }).await.unwrap();
    a.submit(PlayerAction::PlaceStarterCard { side: Side::Front })
        .await
        .unwrap();
    b.submit(PlayerAction::PlaceStarterCard { side: Side::Back })
        .await
        .unwrap();
    view(&b_view, |st| {
        assert_eq!(st.game().map(|g| g.state()), Some(GameState::Playing));
    })
    .await;

    a.close().await;

    let observer = &b_view;
    eventually("a marked absent", || async move {
        view(observer, |st| st.game().unwrap().is_disconnected(&id("a"))).await
    })
    .await;
    view(&b_view, |st| assert_eq!(st.player_state(), PlayerState::PlacingCard)).await;
}

#[tokio::test]
async fn player_may_resume_over_the_other_binding() {
    let server = TestServer::start(2).await;
    let s = &server;

    let (a, _a_view) = s.remote_player("a").await;
    let (b, b_view) = s.remote_player("b").await;
    a.submit(PlayerAction::ChoosePawn { pawn: Pawn::Red }).await.unwrap();
    b.submit(PlayerAction::ChoosePawn { pawn: Pawn::Blue }).await.unwrap();
    a.close().await;
    let observer = &b_view;
    eventually("a marked absent", || async move {
        view(observer, |st| st.game().is_some_and(|g| g.is_disconnected(&id("a")))).await
    })
    .await;

    let (_a, a_view) = s.tcp_player("a").await;
    let a_view = &a_view;
    eventually("a resumed on the starter choice", || async move {
        view(a_view, |st| st.player_state() == PlayerState::SelectingStarterSide).await
    })
    .await;
    view(&b_view, |st| assert!(!st.game().unwrap().is_disconnected(&id("a")))).await;
}

#[tokio::test]
async fn unknown_endpoint_refuses_the_connection() {
    let server = TestServer::start(2).await;

    let result = RemoteClient::connect(
        &server.remote_url("nowhere"),
        client_listener("a"),
        RemoteClientConfig::default(),
    )
    .await;

    assert!(result.is_err());
    assert_eq!(placement(&server, "a").await, None);
}
