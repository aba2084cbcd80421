// Lottery Program - Settlement
use solana_program::{account_info::AccountInfo, clock::UnixTimestamp, pubkey::Pubkey};

use crate::{
    error::LotteryError,
    state::{Lottery, LotteryState},
};

/// Outcome of a settled round
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Settlement {
    pub winner_index: usize,
    pub winner: Pubkey,
}

/// Map a random word onto the registry, `None` when it is empty
pub fn winner_index(random_word: u64, player_count: usize) -> Option<usize> {
    if player_count == 0 {
        return None;
    }
    Some((random_word % player_count as u64) as usize)
}

/// Resolve the outstanding request `request_id` with the delivered `words`.
///
/// Only `words[0]` is used. On success the round is closed: winner recorded,
/// registry cleared, timestamp reset and state back to OPEN. The caller still
/// owes the payout and must abort the transaction if it fails.
pub fn settle(
    lottery: &mut Lottery,
    request_id: u64,
    words: &[u64],
    now: UnixTimestamp,
) -> Result<Settlement, LotteryError> {
    if lottery.state() != LotteryState::Calculating
        || lottery.pending_request_id() != Some(request_id)
    {
        return Err(LotteryError::UnknownRequest);
    }
    let random_word = *words.first().ok_or(LotteryError::EmptyWords)?;
    let index = winner_index(random_word, lottery.number_of_players())
        .ok_or(LotteryError::PlayerIndexOutOfBounds)?;
    let winner = *lottery.player(index)?;
    lottery.close_round(winner, now);

    Ok(Settlement {
        winner_index: index,
        winner,
    })
}

/// Move `amount` lamports from the program owned pool to `recipient`
pub fn transfer_prize(
    pool_info: &AccountInfo,
    recipient_info: &AccountInfo,
    amount: u64,
) -> Result<(), LotteryError> {
    if !recipient_info.is_writable || recipient_info.executable {
        return Err(LotteryError::TransferFailed);
    }

    let pool_lamports = pool_info
        .lamports()
        .checked_sub(amount)
        .ok_or(LotteryError::TransferFailed)?;
    let recipient_lamports = recipient_info
        .lamports()
        .checked_add(amount)
        .ok_or(LotteryError::TransferFailed)?;

    **pool_info
        .try_borrow_mut_lamports()
        .map_err(|_| LotteryError::TransferFailed)? = pool_lamports;
    **recipient_info
        .try_borrow_mut_lamports()
        .map_err(|_| LotteryError::TransferFailed)? = recipient_lamports;
    Ok(())
}
