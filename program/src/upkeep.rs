// Lottery Program - Upkeep evaluation
use solana_program::clock::UnixTimestamp;
use std::convert::TryFrom;

use crate::{
    error::LotteryError,
    state::{Lottery, LotteryState},
};

/// Result of an upkeep check, mirrored back to the automation caller
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpkeepCheck {
    pub upkeep_needed: bool,
    /// Opaque pass-through for the automation caller, always empty
    pub perform_data: Vec<u8>,
}

/// Whether settlement should begin at `now` with `balance` lamports in the pool.
///
/// All four conditions are required: the round is open, the interval has
/// elapsed since the last settlement, at least one player entered and the
/// pool is not empty.
pub fn check_upkeep(lottery: &Lottery, now: UnixTimestamp, balance: u64) -> UpkeepCheck {
    let is_open = lottery.state() == LotteryState::Open;
    let time_passed = now
        .checked_sub(lottery.last_timestamp())
        .and_then(|elapsed| u64::try_from(elapsed).ok())
        .map_or(false, |elapsed| elapsed >= lottery.interval());
    let has_players = lottery.number_of_players() > 0;
    let has_balance = balance > 0;

    UpkeepCheck {
        upkeep_needed: is_open && time_passed && has_players && has_balance,
        perform_data: Vec::new(),
    }
}

/// Re-evaluate the upkeep predicate, failing with diagnostics when it is false
pub fn ensure_upkeep_needed(
    lottery: &Lottery,
    now: UnixTimestamp,
    balance: u64,
) -> Result<(), LotteryError> {
    if check_upkeep(lottery, now, balance).upkeep_needed {
        return Ok(());
    }
    Err(LotteryError::UpkeepNotNeeded {
        balance,
        players: lottery.number_of_players() as u64,
        state: lottery.state(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::LotteryConfig;
    use solana_program::pubkey::Pubkey;

    const START: UnixTimestamp = 1_700_000_000;
    const INTERVAL: u64 = 30;
    const FEE: u64 = 10_000_000;

    fn lottery_with_players(count: usize) -> Lottery {
        let config = LotteryConfig {
            entrance_fee: FEE,
            interval: INTERVAL,
            gas_lane: [0u8; 32],
            subscription_id: 1,
            callback_gas_limit: 500_000,
        };
        let mut lottery = Lottery::new(254, Pubkey::new_unique(), config, START);
        for _ in 0..count {
            lottery.enter(Pubkey::new_unique(), FEE).unwrap();
        }
        lottery
    }

    #[test]
    fn test_upkeep_needed_when_all_conditions_hold() {
        let lottery = lottery_with_players(1);
        let check = check_upkeep(&lottery, START + INTERVAL as i64, FEE);
        assert!(check.upkeep_needed);
        assert!(check.perform_data.is_empty());
        assert!(check_upkeep(&lottery, START + 10_000, FEE).upkeep_needed);
    }

    #[test]
    fn test_no_upkeep_without_balance() {
        let lottery = lottery_with_players(1);
        for now in [START, START + INTERVAL as i64, START + 1_000_000] {
            assert!(!check_upkeep(&lottery, now, 0).upkeep_needed);
        }
    }

    #[test]
    fn test_no_upkeep_while_calculating() {
        let mut lottery = lottery_with_players(2);
        lottery.begin_calculating(1).unwrap();
        assert!(!check_upkeep(&lottery, START + 1_000, FEE * 2).upkeep_needed);
    }

    #[test]
    fn test_no_upkeep_before_interval() {
        let lottery = lottery_with_players(1);
        assert!(!check_upkeep(&lottery, START, FEE).upkeep_needed);
        assert!(!check_upkeep(&lottery, START + INTERVAL as i64 - 1, FEE).upkeep_needed);
        // Clock behind the last settlement
        assert!(!check_upkeep(&lottery, START - 100, FEE).upkeep_needed);
    }

    #[test]
    fn test_no_upkeep_without_players() {
        let lottery = lottery_with_players(0);
        // Lamports sent straight to the pool do not count as an entry
        assert!(!check_upkeep(&lottery, START + 1_000, FEE).upkeep_needed);
    }

    #[test]
    fn test_ensure_upkeep_needed_reports_diagnostics() {
        let mut lottery = lottery_with_players(3);
        lottery.begin_calculating(9).unwrap();
        assert_eq!(
            ensure_upkeep_needed(&lottery, START + 1_000, 3 * FEE),
            Err(LotteryError::UpkeepNotNeeded {
                balance: 3 * FEE,
                players: 3,
                state: LotteryState::Calculating,
            })
        );

        let lottery = lottery_with_players(1);
        assert_eq!(ensure_upkeep_needed(&lottery, START + 1_000, FEE), Ok(()));
    }
}
