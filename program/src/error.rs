// Lottery Program - Errors
use solana_program::{msg, program_error::ProgramError};
use thiserror::Error;

use crate::state::LotteryState;

/// Errors that may be returned by the Lottery program
#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum LotteryError {
    /// Payment attached to an entry is below the entrance fee
    #[error("Insufficient fund: payment is below the entrance fee")]
    InsufficientFund,

    /// Entries are only accepted while the lottery is open
    #[error("Lottery is not open")]
    NotOpen,

    #[error("Upkeep not needed: balance={balance}, players={players}, state={state:?}")]
    UpkeepNotNeeded {
        balance: u64,
        players: u64,
        state: LotteryState,
    },

    /// Prize payout was rejected by the recipient account
    #[error("Transfer of the prize pool failed")]
    TransferFailed,

    #[error("Lottery already initialized")]
    AlreadyInitialized,

    #[error("Lottery account does not match the program derived address")]
    InvalidLotteryAccount,

    #[error("VRF coordinator does not match the configured coordinator")]
    InvalidCoordinator,

    #[error("Only the VRF coordinator can fulfill randomness requests")]
    OnlyCoordinatorCanFulfill,

    #[error("Request id does not match an outstanding randomness request")]
    UnknownRequest,

    #[error("No random words were delivered")]
    EmptyWords,

    #[error("Winner account does not match the selected player")]
    WinnerAccountMismatch,

    #[error("Player registry is full")]
    RegistryFull,

    #[error("Player index out of bounds")]
    PlayerIndexOutOfBounds,

    #[error("Coordinator returned an invalid request id")]
    InvalidRequestId,
}

impl LotteryError {
    /// Stable custom error code surfaced through `ProgramError::Custom`
    pub fn code(&self) -> u32 {
        match self {
            LotteryError::InsufficientFund => 0,
            LotteryError::NotOpen => 1,
            LotteryError::UpkeepNotNeeded { .. } => 2,
            LotteryError::TransferFailed => 3,
            LotteryError::AlreadyInitialized => 4,
            LotteryError::InvalidLotteryAccount => 5,
            LotteryError::InvalidCoordinator => 6,
            LotteryError::OnlyCoordinatorCanFulfill => 7,
            LotteryError::UnknownRequest => 8,
            LotteryError::EmptyWords => 9,
            LotteryError::WinnerAccountMismatch => 10,
            LotteryError::RegistryFull => 11,
            LotteryError::PlayerIndexOutOfBounds => 12,
            LotteryError::InvalidRequestId => 13,
        }
    }
}

impl From<LotteryError> for ProgramError {
    fn from(e: LotteryError) -> Self {
        // The diagnostic payload only survives in the program logs
        msg!("Lottery error: {}", e);
        ProgramError::Custom(e.code())
    }
}

/// Errors returned by the mock VRF coordinator program
#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum CoordinatorError {
    #[error("Coordinator already initialized")]
    AlreadyInitialized,

    #[error("Invalid subscription")]
    InvalidSubscription,

    #[error("Must be subscription owner")]
    MustBeSubOwner,

    #[error("Too many consumers")]
    TooManyConsumers,

    #[error("Invalid consumer")]
    InvalidConsumer,

    #[error("Invalid number of random words")]
    InvalidNumWords,

    #[error("Nonexistent request")]
    NonexistentRequest,

    #[error("Request already fulfilled")]
    RequestAlreadyFulfilled,

    #[error("Insufficient subscription balance")]
    InsufficientBalance,

    #[error("Invalid random words")]
    InvalidRandomWords,

    #[error("Invalid account address")]
    InvalidAccountAddress,

    #[error("Arithmetic overflow")]
    Overflow,
}

impl CoordinatorError {
    /// Coordinator codes start at 100 so they never collide with the lottery's
    pub fn code(&self) -> u32 {
        100 + *self as u32
    }
}

impl From<CoordinatorError> for ProgramError {
    fn from(e: CoordinatorError) -> Self {
        msg!("Coordinator error: {}", e);
        ProgramError::Custom(e.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lottery_error_codes() {
        assert_eq!(
            ProgramError::from(LotteryError::InsufficientFund),
            ProgramError::Custom(0)
        );
        assert_eq!(ProgramError::from(LotteryError::NotOpen), ProgramError::Custom(1));
        let upkeep = LotteryError::UpkeepNotNeeded {
            balance: 0,
            players: 0,
            state: LotteryState::Open,
        };
        assert_eq!(ProgramError::from(upkeep), ProgramError::Custom(2));
        assert_eq!(
            ProgramError::from(LotteryError::TransferFailed),
            ProgramError::Custom(3)
        );
    }

    #[test]
    fn test_upkeep_not_needed_message_carries_diagnostics() {
        let error = LotteryError::UpkeepNotNeeded {
            balance: 42,
            players: 3,
            state: LotteryState::Calculating,
        };
        assert_eq!(
            error.to_string(),
            "Upkeep not needed: balance=42, players=3, state=Calculating"
        );
    }

    #[test]
    fn test_coordinator_error_codes_are_offset() {
        assert_eq!(
            ProgramError::from(CoordinatorError::AlreadyInitialized),
            ProgramError::Custom(100)
        );
        assert_eq!(
            ProgramError::from(CoordinatorError::RequestAlreadyFulfilled),
            ProgramError::Custom(107)
        );
        assert_eq!(
            ProgramError::from(CoordinatorError::Overflow),
            ProgramError::Custom(111)
        );
    }
}
