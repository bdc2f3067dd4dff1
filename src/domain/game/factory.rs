//! Building a game out of a ready lobby.

use super::aggregate::Game;
use super::cards::{Deck, GameCard};
use super::player::Player;
use crate::domain::foundation::GameId;
use crate::domain::lobby::Lobby;

/// Builds the authoritative game for a lobby that is ready to start.
pub trait GameFactory: Send + Sync {
    fn from_lobby(&self, lobby: &Lobby) -> Game;
}

/// Deals two resource cards and one gold card per seat, in seat order.
///
/// Decks are laid out in id order; shuffling is left to whoever supplies
/// a richer factory.
#[derive(Debug, Clone)]
pub struct StandardGameFactory {
    resource_cards: u32,
    gold_cards: u32,
}

impl StandardGameFactory {
    pub fn new(resource_cards: u32, gold_cards: u32) -> Self {
        Self {
            resource_cards,
            gold_cards,
        }
    }
}

impl Default for StandardGameFactory {
    fn default() -> Self {
        Self::new(40, 40)
    }
}

impl GameFactory for StandardGameFactory {
    fn from_lobby(&self, lobby: &Lobby) -> Game {
        let resources = (1..=self.resource_cards).rev().map(GameCard::resource).collect();
        let golds = (1..=self.gold_cards)
            .rev()
            .map(|n| GameCard::gold(self.resource_cards + n))
            .collect();
        let mut deck = Deck::new(resources, golds);

        let players = lobby
            .players()
            .iter()
            .map(|seat| {
                let mut player = Player::new(seat.identity.clone(), seat.nickname.clone(), seat.pawn);
                player.hand.extend(deck.draw_resource());
                player.hand.extend(deck.draw_resource());
                player.hand.extend(deck.draw_gold());
                player
            })
            .collect();

        Game::new(GameId::new(), players, deck)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::Identity;
    use crate::domain::game::{GameState, MAX_HAND_SIZE};
    use crate::domain::lobby::Pawn;

    #[test]
    fn every_seat_gets_a_full_hand() {
        let mut lobby = Lobby::new(2);
        lobby
            .add_player(Identity::new("a"), "alice", Some(Pawn::Red))
            .unwrap();
        lobby
            .add_player(Identity::new("b"), "bob", Some(Pawn::Blue))
            .unwrap();

        let game = StandardGameFactory::default().from_lobby(&lobby);

        assert_eq!(game.state(), GameState::Starting);
        assert_eq!(game.players().len(), 2);
        for player in game.players() {
            assert_eq!(player.hand.len(), MAX_HAND_SIZE);
        }
        assert_eq!(game.players()[0].nickname, "alice");
        assert_eq!(game.players()[1].pawn, Some(Pawn::Blue));
        assert_eq!(game.deck().resources_left(), 40 - 2 - 4);
        assert_eq!(game.deck().golds_left(), 40 - 2 - 2);
    }
}
