// VRF coordinator interface for the lottery program
//
// The coordinator is a separate program. Consumers ask it for random words
// through a CPI and receive them later through a callback instruction that
// the coordinator signs with its signer PDA.
use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    account_info::AccountInfo,
    instruction::{AccountMeta, Instruction},
    msg,
    program::{get_return_data, invoke_signed},
    program_error::ProgramError,
    pubkey::Pubkey,
    system_program,
};
use std::convert::TryInto;

use crate::error::LotteryError;

/// Seed of the PDA the coordinator signs callbacks with
pub const VRF_SIGNER_SEED: &[u8] = b"vrf-signer";

/// Instruction tag consumers reserve for the randomness callback
pub const FULFILL_RANDOM_WORDS_TAG: u8 = 4;

/// Parameters of a randomness request
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct RandomWordsRequest {
    /// Gas lane / key hash selecting the oracle key
    pub key_hash: [u8; 32],
    pub subscription_id: u64,
    pub minimum_confirmations: u16,
    pub callback_gas_limit: u32,
    pub num_words: u32,
}

/// Instructions understood by a VRF coordinator
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq)]
pub enum CoordinatorInstruction {
    /// Create the coordinator state account
    ///
    /// Accounts expected:
    /// 0. `[signer, writable]` Payer
    /// 1. `[writable]` Coordinator state (PDA)
    /// 2. `[]` System program
    Initialize { base_fee: u64 },

    /// Open a new subscription owned by the signer
    ///
    /// Accounts expected:
    /// 0. `[signer, writable]` Owner, pays for the account
    /// 1. `[writable]` Coordinator state
    /// 2. `[writable]` Subscription (PDA of the next subscription id)
    /// 3. `[]` System program
    CreateSubscription,

    /// Credit the subscription balance
    ///
    /// Accounts expected:
    /// 0. `[signer]` Funder
    /// 1. `[writable]` Subscription
    FundSubscription { amount: u64 },

    /// Allow `consumer` to request randomness on the subscription
    ///
    /// Accounts expected:
    /// 0. `[signer]` Subscription owner
    /// 1. `[writable]` Subscription
    AddConsumer { consumer: Pubkey },

    /// Request random words. The request id is returned as return data.
    ///
    /// Accounts expected:
    /// 0. `[writable]` Coordinator state
    /// 1. `[writable]` Subscription
    /// 2. `[writable]` Request (PDA of the next request id)
    /// 3. `[signer]` Consumer account
    /// 4. `[signer, writable]` Payer for the request account
    /// 5. `[]` System program
    RequestRandomWords(RandomWordsRequest),

    /// Deliver the words of a pending request to its consumer
    ///
    /// Accounts expected:
    /// 0. `[]` Coordinator state
    /// 1. `[writable]` Subscription
    /// 2. `[writable]` Request
    /// 3. `[]` Consumer program
    /// 4. `[]` Coordinator signer (PDA)
    /// Remaining accounts are forwarded to the consumer callback
    FulfillRandomWords {
        request_id: u64,
        words_override: Option<Vec<u64>>,
    },
}

/// Address the coordinator signs callbacks with
pub fn coordinator_signer(coordinator_program: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[VRF_SIGNER_SEED], coordinator_program)
}

pub const COORDINATOR_SEED: &[u8] = b"coordinator";
pub const SUBSCRIPTION_SEED: &[u8] = b"subscription";
pub const REQUEST_SEED: &[u8] = b"request";

/// Find the coordinator state address
pub fn find_coordinator_address(coordinator_program: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[COORDINATOR_SEED], coordinator_program)
}

/// Find the address of subscription `subscription_id`
pub fn find_subscription_address(coordinator_program: &Pubkey, subscription_id: u64) -> (Pubkey, u8) {
    Pubkey::find_program_address(
        &[SUBSCRIPTION_SEED, &subscription_id.to_le_bytes()],
        coordinator_program,
    )
}

/// Find the address of request `request_id`
pub fn find_request_address(coordinator_program: &Pubkey, request_id: u64) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[REQUEST_SEED, &request_id.to_le_bytes()], coordinator_program)
}

/// Whether `signer_info` is the callback signer of `coordinator_program`
pub fn is_coordinator_signer(signer_info: &AccountInfo, coordinator_program: &Pubkey) -> bool {
    let (expected, _) = coordinator_signer(coordinator_program);
    signer_info.is_signer && *signer_info.key == expected
}

/// Build the coordinator instruction requesting random words
pub fn request_random_words_instruction(
    coordinator_program: &Pubkey,
    coordinator_state: &Pubkey,
    subscription: &Pubkey,
    request_account: &Pubkey,
    consumer: &Pubkey,
    payer: &Pubkey,
    request: RandomWordsRequest,
) -> Result<Instruction, ProgramError> {
    let data = CoordinatorInstruction::RequestRandomWords(request)
        .try_to_vec()
        .map_err(|_| ProgramError::InvalidInstructionData)?;

    Ok(Instruction {
        program_id: *coordinator_program,
        accounts: vec![
            AccountMeta::new(*coordinator_state, false),
            AccountMeta::new(*subscription, false),
            AccountMeta::new(*request_account, false),
            AccountMeta::new_readonly(*consumer, true),
            AccountMeta::new(*payer, true),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
        data,
    })
}

/// Ask the coordinator for random words on behalf of the consumer PDA.
///
/// Returns the request id the coordinator assigned.
#[allow(clippy::too_many_arguments)]
pub fn request_random_words<'a>(
    request: RandomWordsRequest,
    coordinator_program_info: &AccountInfo<'a>,
    coordinator_state_info: &AccountInfo<'a>,
    subscription_info: &AccountInfo<'a>,
    request_info: &AccountInfo<'a>,
    consumer_info: &AccountInfo<'a>,
    payer_info: &AccountInfo<'a>,
    system_program_info: &AccountInfo<'a>,
    consumer_signer_seeds: &[&[u8]],
) -> Result<u64, ProgramError> {
    let instruction = request_random_words_instruction(
        coordinator_program_info.key,
        coordinator_state_info.key,
        subscription_info.key,
        request_info.key,
        consumer_info.key,
        payer_info.key,
        request,
    )?;

    invoke_signed(
        &instruction,
        &[
            coordinator_state_info.clone(),
            subscription_info.clone(),
            request_info.clone(),
            consumer_info.clone(),
            payer_info.clone(),
            system_program_info.clone(),
            coordinator_program_info.clone(),
        ],
        &[consumer_signer_seeds],
    )?;

    let request_id = read_request_id(coordinator_program_info.key)?;
    msg!("VRF randomness requested, request id {}", request_id);
    Ok(request_id)
}

/// Read the request id the coordinator left in the return data
pub fn read_request_id(coordinator_program: &Pubkey) -> Result<u64, ProgramError> {
    let (program_id, data) = get_return_data().ok_or(LotteryError::InvalidRequestId)?;
    if program_id != *coordinator_program {
        msg!("Return data was set by {}, not the coordinator", program_id);
        return Err(LotteryError::InvalidCoordinator.into());
    }
    decode_request_id(&data).map_err(Into::into)
}

fn decode_request_id(data: &[u8]) -> Result<u64, LotteryError> {
    let request_id = data
        .get(..8)
        .and_then(|slice| slice.try_into().ok())
        .map(u64::from_le_bytes)
        .ok_or(LotteryError::InvalidRequestId)?;
    if request_id == 0 {
        return Err(LotteryError::InvalidRequestId);
    }
    Ok(request_id)
}

/// Callback instruction data: tag, request id, word count, words
pub fn pack_fulfill_random_words(request_id: u64, words: &[u64]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(1 + 8 + 4 + 8 * words.len());
    buf.push(FULFILL_RANDOM_WORDS_TAG);
    buf.extend_from_slice(&request_id.to_le_bytes());
    buf.extend_from_slice(&(words.len() as u32).to_le_bytes());
    for word in words {
        buf.extend_from_slice(&word.to_le_bytes());
    }
    buf
}

/// Inverse of [`pack_fulfill_random_words`] without the leading tag
pub fn unpack_fulfill_random_words(input: &[u8]) -> Result<(u64, Vec<u64>), ProgramError> {
    let request_id = input
        .get(..8)
        .and_then(|slice| slice.try_into().ok())
        .map(u64::from_le_bytes)
        .ok_or(ProgramError::InvalidInstructionData)?;
    let count = input
        .get(8..12)
        .and_then(|slice| slice.try_into().ok())
        .map(u32::from_le_bytes)
        .ok_or(ProgramError::InvalidInstructionData)? as usize;
    let body = input
        .get(12..)
        .filter(|body| body.len() == count.saturating_mul(8))
        .ok_or(ProgramError::InvalidInstructionData)?;

    let words = body
        .chunks_exact(8)
        .map(|chunk| {
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(chunk);
            u64::from_le_bytes(bytes)
        })
        .collect();
    Ok((request_id, words))
}

/// Build the callback the coordinator sends to `consumer_program`
pub fn fulfill_random_words_instruction(
    consumer_program: &Pubkey,
    coordinator_signer: &Pubkey,
    request_id: u64,
    words: &[u64],
    forwarded_accounts: &[AccountMeta],
) -> Instruction {
    let mut accounts = vec![AccountMeta::new_readonly(*coordinator_signer, true)];
    accounts.extend_from_slice(forwarded_accounts);

    Instruction {
        program_id: *consumer_program,
        accounts,
        data: pack_fulfill_random_words(request_id, words),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_callback_data_layout() {
        let data = pack_fulfill_random_words(7, &[42, u64::MAX]);
        assert_eq!(data[0], FULFILL_RANDOM_WORDS_TAG);
        assert_eq!(data.len(), 1 + 8 + 4 + 16);

        let (request_id, words) = unpack_fulfill_random_words(&data[1..]).unwrap();
        assert_eq!(request_id, 7);
        assert_eq!(words, vec![42, u64::MAX]);
    }

    #[test]
    fn test_callback_with_truncated_words_is_rejected() {
        let data = pack_fulfill_random_words(7, &[42, 43]);
        assert_eq!(
            unpack_fulfill_random_words(&data[1..data.len() - 1]),
            Err(ProgramError::InvalidInstructionData)
        );
        assert_eq!(
            unpack_fulfill_random_words(&[1, 2, 3]),
            Err(ProgramError::InvalidInstructionData)
        );
    }

    #[test]
    fn test_request_id_must_be_positive() {
        assert_eq!(decode_request_id(&5u64.to_le_bytes()), Ok(5));
        assert_eq!(
            decode_request_id(&0u64.to_le_bytes()),
            Err(LotteryError::InvalidRequestId)
        );
        assert_eq!(decode_request_id(&[1, 2]), Err(LotteryError::InvalidRequestId));
    }

    #[test]
    fn test_callback_is_signed_by_coordinator_signer() {
        let consumer = Pubkey::new_unique();
        let coordinator = Pubkey::new_unique();
        let (signer, _) = coordinator_signer(&coordinator);
        let forwarded = [AccountMeta::new(Pubkey::new_unique(), false)];

        let instruction =
            fulfill_random_words_instruction(&consumer, &signer, 3, &[9], &forwarded);
        assert_eq!(instruction.program_id, consumer);
        assert_eq!(instruction.accounts[0], AccountMeta::new_readonly(signer, true));
        assert_eq!(instruction.accounts[1], forwarded[0]);
    }

    #[test]
    fn test_request_random_words_instruction_encodes_request() {
        let request = RandomWordsRequest {
            key_hash: [3u8; 32],
            subscription_id: 1,
            minimum_confirmations: 3,
            callback_gas_limit: 500_000,
            num_words: 1,
        };
        let coordinator = Pubkey::new_unique();
        let consumer = Pubkey::new_unique();
        let instruction = request_random_words_instruction(
            &coordinator,
            &Pubkey::new_unique(),
            &Pubkey::new_unique(),
            &Pubkey::new_unique(),
            &consumer,
            &Pubkey::new_unique(),
            request,
        )
        .unwrap();

        assert_eq!(instruction.program_id, coordinator);
        assert_eq!(instruction.accounts[3], AccountMeta::new_readonly(consumer, true));
        assert_eq!(
            CoordinatorInstruction::try_from_slice(&instruction.data).unwrap(),
            CoordinatorInstruction::RequestRandomWords(request)
        );
    }
}
