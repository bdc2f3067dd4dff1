//! End-to-end sessions over the TCP binding on loopback.

mod common;

use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_util::codec::Framed;

use codex_session::adapters::tcp::{Packet, PacketCodec, TcpClient};
use codex_session::application::{ClientListener, Placement};
use codex_session::domain::action::PlayerAction;
use codex_session::domain::client_state::PlayerState;
use codex_session::domain::game::{GameState, PickSource, Position, Side};
use codex_session::domain::lobby::Pawn;
use codex_session::ports::SessionConnection;
use common::{eventually, id, view, ScriptedPeer, TestServer};

async fn placement(server: &TestServer, who: &str) -> Option<Placement> {
    server.dispatcher.placement_of(&id(who)).await
}

async fn in_lobby(server: &TestServer, who: &str) -> bool {
    matches!(placement(server, who).await, Some(Placement::Lobby(_)))
}

/// Two-player game in which `a`, a scripted peer, holds the first turn.
async fn scripted_game(server: &TestServer) -> (ScriptedPeer, TcpClient, Arc<ClientListener>) {
    let a = ScriptedPeer::connect(server.tcp_addr, "a").await;
    eventually("a seated", || async move { in_lobby(server, "a").await }).await;
    let (b, b_view) = server.tcp_player("b").await;
    eventually("b seated", || async move { in_lobby(server, "b").await }).await;

    a.submit(PlayerAction::ChoosePawn { pawn: Pawn::Red });
    b.submit(PlayerAction::ChoosePawn { pawn: Pawn::Blue }).await.unwrap();
    {
        let b_view = &b_view;
        eventually("game started", || async move {
            view(b_view, |st| st.game().is_some()).await
        })
        .await;

        a.submit(PlayerAction::PlaceStarterCard { side: Side::Front });
        b.submit(PlayerAction::PlaceStarterCard { side: Side::Front })
            .await
            .unwrap();
        eventually("starters placed", || async move {
            view(b_view, |st| st.game().map(|g| g.state()) == Some(GameState::Playing)).await
        })
        .await;
    }
    (a, b, b_view)
}

async fn wait_until_absent(observer: &ClientListener, who: &str) {
    eventually("player marked absent", || async move {
        view(observer, |st| st.game().is_some_and(|g| g.is_disconnected(&id(who)))).await
    })
    .await;
}

#[tokio::test]
async fn third_player_is_seated_in_a_new_lobby() {
    let server = TestServer::start(2).await;
    let s = &server;

    let (_a, a_view) = s.tcp_player("a").await;
    eventually("a seated", || async move { in_lobby(s, "a").await }).await;
    let (_b, _b_view) = s.tcp_player("b").await;
    eventually("b seated", || async move { in_lobby(s, "b").await }).await;
    let (_c, c_view) = s.tcp_player("c").await;
    eventually("c seated", || async move { in_lobby(s, "c").await }).await;

    let (Some(Placement::Lobby(first)), Some(Placement::Lobby(second))) =
        (placement(s, "a").await, placement(s, "c").await)
    else {
        panic!("a and c should both be seated");
    };
    assert_ne!(first, second);
    assert_eq!(placement(s, "b").await, Some(Placement::Lobby(first)));
    assert_eq!(s.dispatcher.open_lobbies().await.len(), 2);

    let a_view = &a_view;
    eventually("a sees a full lobby", || async move {
        view(a_view, |st| st.lobby().map(|l| l.players().len()) == Some(2)).await
    })
    .await;
    let c_view = &c_view;
    eventually("c sits alone", || async move {
        view(c_view, |st| {
            st.player_state() == PlayerState::InLobby
                && st.lobby().map(|l| l.players().len()) == Some(1)
        })
        .await
    })
    .await;
}

#[tokio::test]
async fn full_lobby_moves_both_players_into_the_game() {
    let server = TestServer::start(2).await;
    let s = &server;

    let (a, a_view) = s.tcp_player("a").await;
    eventually("a seated", || async move { in_lobby(s, "a").await }).await;
    let (b, b_view) = s.tcp_player("b").await;
    eventually("b seated", || async move { in_lobby(s, "b").await }).await;

    a.submit(PlayerAction::ChoosePawn { pawn: Pawn::Green }).await.unwrap();
    b.submit(PlayerAction::ChoosePawn { pawn: Pawn::Yellow }).await.unwrap();

    for observer in [&a_view, &b_view] {
        eventually("starter side selection", || async move {
            view(observer, |st| {
                st.game().is_some() && st.player_state() == PlayerState::SelectingStarterSide
            })
            .await
        })
        .await;
    }

    let Some(Placement::Game(game_id)) = placement(s, "a").await else {
        panic!("a should be in a game");
    };
    assert_eq!(placement(s, "b").await, Some(Placement::Game(game_id)));
    assert!(s.dispatcher.open_lobbies().await.is_empty());
    assert_eq!(s.dispatcher.registry().len().await, 1);
}

#[tokio::test]
async fn silent_player_with_a_full_hand_passes_the_turn() {
    let server = TestServer::start(2).await;
    let (a, _b, b_view) = scripted_game(&server).await;
    let resources_before = view(&b_view, |st| st.game().unwrap().deck().resources_left()).await;

    a.go_silent();
    wait_until_absent(&b_view, "a").await;

    view(&b_view, |st| {
        let game = st.game().unwrap();
        assert_eq!(game.current_player().unwrap().identity, id("b"));
        assert_eq!(game.player(&id("a")).unwrap().hand.len(), 3);
        assert_eq!(game.deck().resources_left(), resources_before);
        assert_eq!(st.player_state(), PlayerState::PlacingCard);
    })
    .await;
}

#[tokio::test]
async fn silent_player_with_a_short_hand_draws_a_substitute() {
    let server = TestServer::start(2).await;
    let (a, _b, b_view) = scripted_game(&server).await;

    let card_id = view(&b_view, |st| st.game().unwrap().player(&id("a")).unwrap().hand[0].id).await;
    a.submit(PlayerAction::PlaceCard {
        card_id,
        position: Position::new(1, 1),
        side: Side::Front,
    });
    let observer = &b_view;
    eventually("placement replicated", || async move {
        view(observer, |st| st.game().unwrap().player(&id("a")).unwrap().hand.len() == 2).await
    })
    .await;
    let resources_before = view(&b_view, |st| st.game().unwrap().deck().resources_left()).await;

    a.go_silent();
    wait_until_absent(&b_view, "a").await;

    view(&b_view, |st| {
        let game = st.game().unwrap();
        assert_eq!(game.player(&id("a")).unwrap().hand.len(), 3);
        assert_eq!(game.deck().resources_left(), resources_before - 1);
        assert_eq!(game.current_player().unwrap().identity, id("b"));
    })
    .await;
}

#[tokio::test]
async fn reconnecting_player_resumes_on_their_turn_phase() {
    let server = TestServer::start(2).await;
    let (a, b, b_view) = scripted_game(&server).await;

    a.go_silent();
    wait_until_absent(&b_view, "a").await;
    drop(a);

    let (_a, a_view) = server.tcp_player("a").await;
    let a_view = &a_view;
    eventually("a resumed asleep", || async move {
        view(a_view, |st| st.game().is_some() && st.player_state() == PlayerState::Sleeping).await
    })
    .await;
    let observer = &b_view;
    eventually("b sees a back", || async move {
        view(observer, |st| !st.game().unwrap().is_disconnected(&id("a"))).await
    })
    .await;

    let card_id = view(&b_view, |st| st.game().unwrap().player(&id("b")).unwrap().hand[0].id).await;
    b.submit(PlayerAction::PlaceCard {
        card_id,
        position: Position::new(1, 1),
        side: Side::Back,
    })
    .await
    .unwrap();
    b.submit(PlayerAction::PickCard {
        source: PickSource::ResourceDeck,
    })
    .await
    .unwrap();

    eventually("turn comes back to a", || async move {
        view(a_view, |st| st.player_state() == PlayerState::PlacingCard).await
    })
    .await;
}

#[tokio::test]
async fn out_of_turn_move_leaves_the_game_unchanged() {
    let server = TestServer::start(2).await;
    let (_a, b, b_view) = scripted_game(&server).await;
    let before = server.dispatcher.registry().snapshot().await;

    let card_id = view(&b_view, |st| st.game().unwrap().player(&id("b")).unwrap().hand[0].id).await;
    b.submit(PlayerAction::PlaceCard {
        card_id,
        position: Position::new(1, 1),
        side: Side::Front,
    })
    .await
    .unwrap();

    let observer = &b_view;
    eventually("b told the move failed", || async move {
        view(observer, |st| st.last_error().is_some()).await
    })
    .await;
    assert_eq!(server.dispatcher.registry().snapshot().await, before);
    view(&b_view, |st| assert_eq!(st.player_state(), PlayerState::Sleeping)).await;
}

/// Reads until the server closes the socket.
async fn wait_for_close(framed: &mut Framed<TcpStream, PacketCodec>) {
    let drained = tokio::time::timeout(Duration::from_secs(5), async {
        while let Some(Ok(_)) = framed.next().await {}
    })
    .await;
    assert!(drained.is_ok(), "server kept the connection open");
}

#[tokio::test]
async fn connection_must_open_with_identity() {
    let server = TestServer::start(2).await;
    let mut raw = server.raw_tcp().await;

    raw.send(Packet::Heartbeat).await.unwrap();

    wait_for_close(&mut raw).await;
    assert_eq!(server.tcp.connection_count().await, 0);
    assert!(server.dispatcher.open_lobbies().await.is_empty());
}

#[tokio::test]
async fn second_identity_packet_ends_the_connection() {
    let server = TestServer::start(2).await;
    let s = &server;
    let mut raw = s.raw_tcp().await;

    raw.send(Packet::Identity { value: id("a") }).await.unwrap();
    eventually("a seated", || async move { in_lobby(s, "a").await }).await;
    assert_eq!(s.tcp.connection_count().await, 1);

    raw.send(Packet::Identity { value: id("mallory") }).await.unwrap();

    wait_for_close(&mut raw).await;
    eventually("connection dropped", || async move { s.tcp.connection_count().await == 0 }).await;
    eventually("seat given up", || async move { placement(s, "a").await.is_none() }).await;
    assert_eq!(placement(s, "mallory").await, None);
}

#[tokio::test]
async fn chat_reaches_every_player() {
    let server = TestServer::start(2).await;
    let (_a, b, b_view) = scripted_game(&server).await;

    // Chat is open to the player whose turn it is not.
    b.submit(PlayerAction::SendMessage {
        message: "your move".into(),
    })
    .await
    .unwrap();

    let observer = &b_view;
    eventually("chat replicated", || async move {
        view(observer, |st| st.game().is_some_and(|g| !g.chat().is_empty())).await
    })
    .await;
    view(&b_view, |st| {
        let last = st.game().unwrap().chat().last(1);
        assert_eq!(last[0].sender, id("b"));
        assert_eq!(last[0].text, "your move");
        assert_eq!(st.player_state(), PlayerState::Sleeping);
    })
    .await;
    let game_id = match placement(&server, "b").await {
        Some(Placement::Game(game_id)) => game_id,
        other => panic!("b should be in a game, got {:?}", other),
    };
    let saved = server.dispatcher.registry().snapshot().await;
    assert_eq!(saved[&game_id].chat().len(), 1);
}
