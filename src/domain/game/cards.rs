//! Cards, placements and the shared card supply.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DomainError, ErrorCode};

/// Which pile a card comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardKind {
    Resource,
    Gold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GameCard {
    pub id: u32,
    pub kind: CardKind,
}

impl GameCard {
    pub fn resource(id: u32) -> Self {
        Self {
            id,
            kind: CardKind::Resource,
        }
    }

    pub fn gold(id: u32) -> Self {
        Self {
            id,
            kind: CardKind::Gold,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Front,
    Back,
}

/// Grid coordinate on a player's board; the starter card sits at the origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const ORIGIN: Position = Position { x: 0, y: 0 };

    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub card_id: u32,
    pub position: Position,
    pub side: Side,
}

/// Where a pick takes its card from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "from", rename_all = "snake_case")]
pub enum PickSource {
    ResourceDeck,
    GoldDeck,
    Visible { card_id: u32 },
}

/// Card supply consulted when a disconnected player's turn is skipped.
pub trait CardSupply {
    /// Takes one card for a player who cannot pick for themselves, or `None`
    /// when nothing is left anywhere.
    fn draw_substitute(&mut self) -> Option<GameCard>;

    /// True once no card can be drawn or picked anymore.
    fn is_exhausted(&self) -> bool;
}

/// Covered piles plus two face-up cards per kind.
///
/// Piles are drawn from the end of the vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deck {
    resources: Vec<GameCard>,
    golds: Vec<GameCard>,
    visible_resources: [Option<GameCard>; 2],
    visible_golds: [Option<GameCard>; 2],
}

impl Deck {
    /// Builds a deck and turns up the visible cards.
    pub fn new(resources: Vec<GameCard>, golds: Vec<GameCard>) -> Self {
        let mut deck = Self {
            resources,
            golds,
            visible_resources: [None, None],
            visible_golds: [None, None],
        };
        for slot in 0..2 {
            deck.visible_resources[slot] = deck.resources.pop();
            deck.visible_golds[slot] = deck.golds.pop();
        }
        deck
    }

    pub fn resources_left(&self) -> usize {
        self.resources.len()
    }

    pub fn golds_left(&self) -> usize {
        self.golds.len()
    }

    pub fn visible_resources(&self) -> &[Option<GameCard>; 2] {
        &self.visible_resources
    }

    pub fn visible_golds(&self) -> &[Option<GameCard>; 2] {
        &self.visible_golds
    }

    pub fn draw_resource(&mut self) -> Option<GameCard> {
        self.resources.pop()
    }

    pub fn draw_gold(&mut self) -> Option<GameCard> {
        self.golds.pop()
    }

    /// Takes a card for a regular pick, refilling a visible slot from its pile.
    pub fn take(&mut self, source: PickSource) -> Result<GameCard, DomainError> {
        match source {
            PickSource::ResourceDeck => self
                .resources
                .pop()
                .ok_or_else(|| DomainError::new(ErrorCode::CardNotFound, "Resource deck is empty")),
            PickSource::GoldDeck => self
                .golds
                .pop()
                .ok_or_else(|| DomainError::new(ErrorCode::CardNotFound, "Gold deck is empty")),
            PickSource::Visible { card_id } => {
                if let Some(card) = take_visible(&mut self.visible_resources, card_id) {
                    refill(&mut self.visible_resources, &mut self.resources);
                    return Ok(card);
                }
                if let Some(card) = take_visible(&mut self.visible_golds, card_id) {
                    refill(&mut self.visible_golds, &mut self.golds);
                    return Ok(card);
                }
                Err(DomainError::new(
                    ErrorCode::CardNotFound,
                    format!("Card {} is not on the table", card_id),
                ))
            }
        }
    }
}

impl CardSupply for Deck {
    fn draw_substitute(&mut self) -> Option<GameCard> {
        if let Some(card) = self.resources.pop() {
            return Some(card);
        }
        if let Some(card) = self.golds.pop() {
            return Some(card);
        }
        self.visible_resources
            .iter_mut()
            .chain(self.visible_golds.iter_mut())
            .find_map(Option::take)
    }

    fn is_exhausted(&self) -> bool {
        self.resources.is_empty()
            && self.golds.is_empty()
            && self.visible_resources.iter().all(Option::is_none)
            && self.visible_golds.iter().all(Option::is_none)
    }
}

fn take_visible(slots: &mut [Option<GameCard>; 2], card_id: u32) -> Option<GameCard> {
    slots
        .iter_mut()
        .find(|slot| matches!(slot, Some(card) if card.id == card_id))
        .and_then(Option::take)
}

fn refill(slots: &mut [Option<GameCard>; 2], pile: &mut Vec<GameCard>) {
    for slot in slots.iter_mut().filter(|s| s.is_none()) {
        *slot = pile.pop();
    }
}
