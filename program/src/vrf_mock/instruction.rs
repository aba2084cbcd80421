// Mock VRF coordinator - client side instruction builders
use solana_program::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
    system_program,
};

use crate::oracle::{
    self, find_coordinator_address, find_request_address, find_subscription_address,
    CoordinatorInstruction,
};

pub fn initialize(program_id: &Pubkey, payer: &Pubkey, base_fee: u64) -> Instruction {
    let (state, _) = find_coordinator_address(program_id);
    Instruction::new_with_borsh(
        *program_id,
        &CoordinatorInstruction::Initialize { base_fee },
        vec![
            AccountMeta::new(*payer, true),
            AccountMeta::new(state, false),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
    )
}

/// `subscription_id` must be the coordinator's next subscription id
pub fn create_subscription(program_id: &Pubkey, owner: &Pubkey, subscription_id: u64) -> Instruction {
    let (state, _) = find_coordinator_address(program_id);
    let (subscription, _) = find_subscription_address(program_id, subscription_id);
    Instruction::new_with_borsh(
        *program_id,
        &CoordinatorInstruction::CreateSubscription,
        vec![
            AccountMeta::new(*owner, true),
            AccountMeta::new(state, false),
            AccountMeta::new(subscription, false),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
    )
}

pub fn fund_subscription(
    program_id: &Pubkey,
    funder: &Pubkey,
    subscription_id: u64,
    amount: u64,
) -> Instruction {
    let (subscription, _) = find_subscription_address(program_id, subscription_id);
    Instruction::new_with_borsh(
        *program_id,
        &CoordinatorInstruction::FundSubscription { amount },
        vec![
            AccountMeta::new_readonly(*funder, true),
            AccountMeta::new(subscription, false),
        ],
    )
}

pub fn add_consumer(
    program_id: &Pubkey,
    owner: &Pubkey,
    subscription_id: u64,
    consumer: &Pubkey,
) -> Instruction {
    let (subscription, _) = find_subscription_address(program_id, subscription_id);
    Instruction::new_with_borsh(
        *program_id,
        &CoordinatorInstruction::AddConsumer {
            consumer: *consumer,
        },
        vec![
            AccountMeta::new_readonly(*owner, true),
            AccountMeta::new(subscription, false),
        ],
    )
}

/// Deliver request `request_id` to `consumer_program`.
///
/// `forwarded` are the accounts the consumer callback expects after the
/// coordinator signer. Without `words_override` the words are derived from
/// the request id.
pub fn fulfill_random_words(
    program_id: &Pubkey,
    subscription_id: u64,
    request_id: u64,
    consumer_program: &Pubkey,
    forwarded: &[AccountMeta],
    words_override: Option<Vec<u64>>,
) -> Instruction {
    let (state, _) = find_coordinator_address(program_id);
    let (subscription, _) = find_subscription_address(program_id, subscription_id);
    let (request, _) = find_request_address(program_id, request_id);
    let (signer, _) = oracle::coordinator_signer(program_id);

    let mut accounts = vec![
        AccountMeta::new_readonly(state, false),
        AccountMeta::new(subscription, false),
        AccountMeta::new(request, false),
        AccountMeta::new_readonly(*consumer_program, false),
        AccountMeta::new_readonly(signer, false),
    ];
    accounts.extend_from_slice(forwarded);

    Instruction::new_with_borsh(
        *program_id,
        &CoordinatorInstruction::FulfillRandomWords {
            request_id,
            words_override,
        },
        accounts,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use borsh::BorshDeserialize;

    #[test]
    fn test_fulfill_forwards_consumer_accounts_last() {
        let program_id = Pubkey::new_unique();
        let consumer_program = Pubkey::new_unique();
        let forwarded = [
            AccountMeta::new(Pubkey::new_unique(), false),
            AccountMeta::new(Pubkey::new_unique(), false),
        ];

        let instruction =
            fulfill_random_words(&program_id, 1, 2, &consumer_program, &forwarded, Some(vec![42]));
        assert_eq!(instruction.accounts.len(), 7);
        assert_eq!(instruction.accounts[3].pubkey, consumer_program);
        assert_eq!(&instruction.accounts[5..], &forwarded[..]);
        assert_eq!(
            CoordinatorInstruction::try_from_slice(&instruction.data).unwrap(),
            CoordinatorInstruction::FulfillRandomWords {
                request_id: 2,
                words_override: Some(vec![42]),
            }
        );
    }
}
