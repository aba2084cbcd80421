// Automated Lottery
// Players buy a ticket for a fixed fee; once the round has been open long
// enough a keeper asks a VRF coordinator for randomness and the callback
// pays the whole pool to one player.

// Core modules
pub mod error;
pub mod instruction;
pub mod processor;
pub mod state;
pub mod utils;

// Round lifecycle
pub mod events;
pub mod settlement;
pub mod upkeep;

// Randomness
pub mod oracle;
pub mod vrf_mock;

pub mod network_config;

#[cfg(not(feature = "no-entrypoint"))]
mod entrypoint;

use solana_program::{account_info::AccountInfo, entrypoint::ProgramResult, pubkey::Pubkey};

pub fn process_instruction(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    instruction_data: &[u8],
) -> ProgramResult {
    processor::Processor::process(program_id, accounts, instruction_data)
}
