//! Error types for the domain layer.

use std::error::Error;
use std::fmt;

/// Error codes organized by category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Validation errors
    ValidationFailed,

    // Not found errors
    LobbyNotFound,
    PlayerNotFound,
    CardNotFound,

    // Lobby errors
    LobbyFull,
    NicknameTaken,
    PawnTaken,
    AlreadySeated,
    NotFirstPlayer,
    NotEnoughPlayers,
    PawnsMissing,

    // Turn errors
    NotYourTurn,
    WrongTurnPhase,
    PositionOccupied,
    StarterAlreadyPlaced,
    StarterNotPlaced,

    // State errors
    InvalidStateTransition,
    AlreadyDisconnected,
    WrongSession,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCode::ValidationFailed => "VALIDATION_FAILED",
            ErrorCode::LobbyNotFound => "LOBBY_NOT_FOUND",
            ErrorCode::PlayerNotFound => "PLAYER_NOT_FOUND",
            ErrorCode::CardNotFound => "CARD_NOT_FOUND",
            ErrorCode::LobbyFull => "LOBBY_FULL",
            ErrorCode::NicknameTaken => "NICKNAME_TAKEN",
            ErrorCode::PawnTaken => "PAWN_TAKEN",
            ErrorCode::AlreadySeated => "ALREADY_SEATED",
            ErrorCode::NotFirstPlayer => "NOT_FIRST_PLAYER",
            ErrorCode::NotEnoughPlayers => "NOT_ENOUGH_PLAYERS",
            ErrorCode::PawnsMissing => "PAWNS_MISSING",
            ErrorCode::NotYourTurn => "NOT_YOUR_TURN",
            ErrorCode::WrongTurnPhase => "WRONG_TURN_PHASE",
            ErrorCode::PositionOccupied => "POSITION_OCCUPIED",
            ErrorCode::StarterAlreadyPlaced => "STARTER_ALREADY_PLACED",
            ErrorCode::StarterNotPlaced => "STARTER_NOT_PLACED",
            ErrorCode::InvalidStateTransition => "INVALID_STATE_TRANSITION",
            ErrorCode::AlreadyDisconnected => "ALREADY_DISCONNECTED",
            ErrorCode::WrongSession => "WRONG_SESSION",
        };
        write!(f, "{}", s)
    }
}

/// Standard domain error with code and message.
///
/// This is what an action captures when applying it fails; the message is
/// what the initiating player eventually sees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainError {
    pub code: ErrorCode,
    pub message: String,
}

impl DomainError {
    /// Creates a new domain error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Creates a validation error for a specific field.
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ValidationFailed,
            format!("{}: {}", field, message.into()),
        )
    }
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl Error for DomainError {}
