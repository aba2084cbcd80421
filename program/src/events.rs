// Lottery Program - Events
//
// Events are not part of the account state. They are appended to the
// transaction log so automation and staging clients can follow a round.
use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{log::sol_log_data, msg, pubkey::Pubkey};

#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub enum LotteryEvent {
    /// A player was added to the registry
    LotteryEnter { player: Pubkey },
    /// Upkeep moved the round to CALCULATING and asked the oracle for words
    RequestedLotteryWinner { request_id: u64 },
    /// The pool was paid out
    WinnerPicked { winner: Pubkey },
}

impl LotteryEvent {
    /// Log the event, human readable first, then as Borsh bytes
    pub fn emit(&self) {
        msg!("Event: {:?}", self);
        match self.try_to_vec() {
            Ok(bytes) => sol_log_data(&[&bytes]),
            Err(e) => msg!("Failed to encode event: {}", e),
        }
    }
}
