// Mock VRF coordinator - Instruction Processor
use borsh::BorshDeserialize;
use solana_program::{
    account_info::{next_account_info, AccountInfo},
    clock::Clock,
    entrypoint::ProgramResult,
    instruction::AccountMeta,
    keccak, msg,
    program::{invoke_signed, set_return_data},
    program_error::ProgramError,
    program_pack::Pack,
    pubkey::Pubkey,
    sysvar::Sysvar,
};

use crate::{
    error::CoordinatorError,
    utils,
    oracle::{
        self, CoordinatorInstruction, RandomWordsRequest, COORDINATOR_SEED, REQUEST_SEED,
        SUBSCRIPTION_SEED, VRF_SIGNER_SEED,
    },
};

use super::state::{CoordinatorState, RequestRecord, Subscription, MAX_CONSUMERS, MAX_NUM_WORDS};

pub fn process_instruction(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    instruction_data: &[u8],
) -> ProgramResult {
    Processor::process(program_id, accounts, instruction_data)
}

/// Deterministic word `index` of request `request_id`
pub fn derive_random_word(request_id: u64, index: u32) -> u64 {
    let hash = keccak::hashv(&[&request_id.to_le_bytes(), &index.to_le_bytes()]).to_bytes();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&hash[..8]);
    u64::from_le_bytes(bytes)
}

pub struct Processor;

impl Processor {
    pub fn process(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        instruction_data: &[u8],
    ) -> ProgramResult {
        let instruction = CoordinatorInstruction::try_from_slice(instruction_data)
            .map_err(|_| ProgramError::InvalidInstructionData)?;

        match instruction {
            CoordinatorInstruction::Initialize { base_fee } => {
                msg!("Coordinator instruction: Initialize");
                Self::process_initialize(program_id, accounts, base_fee)
            }
            CoordinatorInstruction::CreateSubscription => {
                msg!("Coordinator instruction: Create Subscription");
                Self::process_create_subscription(program_id, accounts)
            }
            CoordinatorInstruction::FundSubscription { amount } => {
                msg!("Coordinator instruction: Fund Subscription");
                Self::process_fund_subscription(program_id, accounts, amount)
            }
            CoordinatorInstruction::AddConsumer { consumer } => {
                msg!("Coordinator instruction: Add Consumer");
                Self::process_add_consumer(program_id, accounts, consumer)
            }
            CoordinatorInstruction::RequestRandomWords(request) => {
                msg!("Coordinator instruction: Request Random Words");
                Self::process_request_random_words(program_id, accounts, request)
            }
            CoordinatorInstruction::FulfillRandomWords {
                request_id,
                words_override,
            } => {
                msg!("Coordinator instruction: Fulfill Random Words");
                Self::process_fulfill_random_words(program_id, accounts, request_id, words_override)
            }
        }
    }

    fn process_initialize(program_id: &Pubkey, accounts: &[AccountInfo], base_fee: u64) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let payer_info = next_account_info(account_info_iter)?;
        let state_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;

        if !payer_info.is_signer {
            return Err(ProgramError::MissingRequiredSignature);
        }

        let (expected_state, bump_seed) = oracle::find_coordinator_address(program_id);
        if *state_info.key != expected_state {
            return Err(CoordinatorError::InvalidAccountAddress.into());
        }
        if state_info.owner == program_id {
            return Err(CoordinatorError::AlreadyInitialized.into());
        }

        utils::create_pda_account(
            payer_info,
            state_info,
            system_program_info,
            program_id,
            CoordinatorState::LEN,
            &[COORDINATOR_SEED, &[bump_seed]],
        )?;

        let state = CoordinatorState {
            is_initialized: true,
            base_fee,
            next_subscription_id: 1,
            next_request_id: 1,
        };
        CoordinatorState::pack(state, &mut state_info.data.borrow_mut())?;

        msg!("Coordinator initialized with base fee {}", base_fee);
        Ok(())
    }

    fn process_create_subscription(program_id: &Pubkey, accounts: &[AccountInfo]) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let owner_info = next_account_info(account_info_iter)?;
        let state_info = next_account_info(account_info_iter)?;
        let subscription_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;

        if !owner_info.is_signer {
            return Err(ProgramError::MissingRequiredSignature);
        }

        let mut state = Self::load_state(program_id, state_info)?;
        let subscription_id = state.next_subscription_id;
        let (expected_subscription, bump_seed) =
            oracle::find_subscription_address(program_id, subscription_id);
        if *subscription_info.key != expected_subscription {
            return Err(CoordinatorError::InvalidAccountAddress.into());
        }

        utils::create_pda_account(
            owner_info,
            subscription_info,
            system_program_info,
            program_id,
            Subscription::LEN,
            &[SUBSCRIPTION_SEED, &subscription_id.to_le_bytes(), &[bump_seed]],
        )?;

        let subscription = Subscription {
            is_initialized: true,
            id: subscription_id,
            owner: *owner_info.key,
            balance: 0,
            consumer_count: 0,
            consumers: [Pubkey::default(); MAX_CONSUMERS],
        };
        Subscription::pack(subscription, &mut subscription_info.data.borrow_mut())?;

        state.next_subscription_id = subscription_id
            .checked_add(1)
            .ok_or(CoordinatorError::Overflow)?;
        CoordinatorState::pack(state, &mut state_info.data.borrow_mut())?;

        set_return_data(&subscription_id.to_le_bytes());
        msg!("Subscription {} created for {}", subscription_id, owner_info.key);
        Ok(())
    }

    fn process_fund_subscription(program_id: &Pubkey, accounts: &[AccountInfo], amount: u64) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let funder_info = next_account_info(account_info_iter)?;
        let subscription_info = next_account_info(account_info_iter)?;

        if !funder_info.is_signer {
            return Err(ProgramError::MissingRequiredSignature);
        }

        let mut subscription = Self::load_subscription(program_id, subscription_info)?;
        let old_balance = subscription.balance;
        subscription.balance = old_balance
            .checked_add(amount)
            .ok_or(CoordinatorError::Overflow)?;
        Subscription::pack(subscription, &mut subscription_info.data.borrow_mut())?;

        msg!(
            "Subscription {} funded: {} -> {}",
            subscription.id,
            old_balance,
            subscription.balance
        );
        Ok(())
    }

    fn process_add_consumer(program_id: &Pubkey, accounts: &[AccountInfo], consumer: Pubkey) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let owner_info = next_account_info(account_info_iter)?;
        let subscription_info = next_account_info(account_info_iter)?;

        if !owner_info.is_signer {
            return Err(ProgramError::MissingRequiredSignature);
        }

        let mut subscription = Self::load_subscription(program_id, subscription_info)?;
        if subscription.owner != *owner_info.key {
            return Err(CoordinatorError::MustBeSubOwner.into());
        }
        if !subscription.add_consumer(consumer) {
            return Err(CoordinatorError::TooManyConsumers.into());
        }
        Subscription::pack(subscription, &mut subscription_info.data.borrow_mut())?;

        msg!("Consumer {} added to subscription {}", consumer, subscription.id);
        Ok(())
    }

    fn process_request_random_words(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        request: RandomWordsRequest,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let state_info = next_account_info(account_info_iter)?;
        let subscription_info = next_account_info(account_info_iter)?;
        let request_info = next_account_info(account_info_iter)?;
        let consumer_info = next_account_info(account_info_iter)?;
        let payer_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;

        if !consumer_info.is_signer || !payer_info.is_signer {
            return Err(ProgramError::MissingRequiredSignature);
        }

        let subscription = Self::load_subscription(program_id, subscription_info)?;
        if subscription.id != request.subscription_id {
            return Err(CoordinatorError::InvalidSubscription.into());
        }
        if !subscription.is_consumer(consumer_info.key) {
            msg!("{} is not a consumer of subscription {}", consumer_info.key, subscription.id);
            return Err(CoordinatorError::InvalidConsumer.into());
        }
        if request.num_words == 0 || request.num_words > MAX_NUM_WORDS {
            return Err(CoordinatorError::InvalidNumWords.into());
        }

        let mut state = Self::load_state(program_id, state_info)?;
        let request_id = state.next_request_id;
        let (expected_request, bump_seed) = oracle::find_request_address(program_id, request_id);
        if *request_info.key != expected_request {
            return Err(CoordinatorError::InvalidAccountAddress.into());
        }

        utils::create_pda_account(
            payer_info,
            request_info,
            system_program_info,
            program_id,
            RequestRecord::LEN,
            &[REQUEST_SEED, &request_id.to_le_bytes(), &[bump_seed]],
        )?;

        let clock = Clock::get()?;
        let record = RequestRecord {
            is_initialized: true,
            request_id,
            subscription_id: subscription.id,
            consumer: *consumer_info.key,
            consumer_program: *consumer_info.owner,
            key_hash: request.key_hash,
            minimum_confirmations: request.minimum_confirmations,
            callback_gas_limit: request.callback_gas_limit,
            num_words: request.num_words,
            requested_slot: clock.slot,
            fulfilled: false,
        };
        RequestRecord::pack(record, &mut request_info.data.borrow_mut())?;

        state.next_request_id = request_id
            .checked_add(1)
            .ok_or(CoordinatorError::Overflow)?;
        CoordinatorState::pack(state, &mut state_info.data.borrow_mut())?;

        set_return_data(&request_id.to_le_bytes());
        msg!(
            "Random words requested: id={}, subscription={}, words={}",
            request_id,
            subscription.id,
            request.num_words
        );
        Ok(())
    }

    fn process_fulfill_random_words(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        request_id: u64,
        words_override: Option<Vec<u64>>,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let state_info = next_account_info(account_info_iter)?;
        let subscription_info = next_account_info(account_info_iter)?;
        let request_info = next_account_info(account_info_iter)?;
        let consumer_program_info = next_account_info(account_info_iter)?;
        let signer_info = next_account_info(account_info_iter)?;
        let forwarded: Vec<AccountInfo> = account_info_iter.cloned().collect();

        let (expected_request, _) = oracle::find_request_address(program_id, request_id);
        if *request_info.key != expected_request || request_info.owner != program_id {
            return Err(CoordinatorError::NonexistentRequest.into());
        }
        let mut record = RequestRecord::unpack(&request_info.data.borrow())
            .map_err(|_| CoordinatorError::NonexistentRequest)?;
        if record.fulfilled {
            return Err(CoordinatorError::RequestAlreadyFulfilled.into());
        }

        if *consumer_program_info.key != record.consumer_program {
            return Err(CoordinatorError::InvalidConsumer.into());
        }
        match forwarded.first() {
            Some(consumer_info) if *consumer_info.key == record.consumer => {}
            _ => return Err(CoordinatorError::InvalidConsumer.into()),
        }

        let (expected_signer, signer_bump) = oracle::coordinator_signer(program_id);
        if *signer_info.key != expected_signer {
            return Err(CoordinatorError::InvalidAccountAddress.into());
        }

        let state = Self::load_state(program_id, state_info)?;
        let mut subscription = Self::load_subscription(program_id, subscription_info)?;
        if subscription.id != record.subscription_id {
            return Err(CoordinatorError::InvalidSubscription.into());
        }
        subscription.balance = subscription
            .balance
            .checked_sub(state.base_fee)
            .ok_or(CoordinatorError::InsufficientBalance)?;

        let words = match words_override {
            Some(words) => {
                if words.len() != record.num_words as usize {
                    return Err(CoordinatorError::InvalidRandomWords.into());
                }
                words
            }
            None => (0..record.num_words)
                .map(|index| derive_random_word(request_id, index))
                .collect(),
        };

        // Mark before the callback so it cannot be delivered twice
        record.fulfilled = true;
        RequestRecord::pack(record, &mut request_info.data.borrow_mut())?;
        Subscription::pack(subscription, &mut subscription_info.data.borrow_mut())?;

        let forwarded_metas: Vec<AccountMeta> = forwarded
            .iter()
            .map(|account| AccountMeta {
                pubkey: *account.key,
                is_signer: account.is_signer,
                is_writable: account.is_writable,
            })
            .collect();
        let callback = oracle::fulfill_random_words_instruction(
            &record.consumer_program,
            signer_info.key,
            request_id,
            &words,
            &forwarded_metas,
        );

        let mut callback_accounts = Vec::with_capacity(forwarded.len() + 2);
        callback_accounts.push(signer_info.clone());
        callback_accounts.extend(forwarded);
        callback_accounts.push(consumer_program_info.clone());

        invoke_signed(&callback, &callback_accounts, &[&[VRF_SIGNER_SEED, &[signer_bump]]])?;

        msg!("Request {} fulfilled with {} words", request_id, words.len());
        Ok(())
    }

    fn load_state(program_id: &Pubkey, state_info: &AccountInfo) -> Result<CoordinatorState, ProgramError> {
        if state_info.owner != program_id {
            return Err(ProgramError::IncorrectProgramId);
        }
        CoordinatorState::unpack(&state_info.data.borrow())
    }

    fn load_subscription(
        program_id: &Pubkey,
        subscription_info: &AccountInfo,
    ) -> Result<Subscription, ProgramError> {
        if subscription_info.owner != program_id {
            return Err(CoordinatorError::InvalidSubscription.into());
        }
        Subscription::unpack(&subscription_info.data.borrow())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_words_are_deterministic() {
        assert_eq!(derive_random_word(1, 0), derive_random_word(1, 0));
        assert_ne!(derive_random_word(1, 0), derive_random_word(1, 1));
        assert_ne!(derive_random_word(1, 0), derive_random_word(2, 0));
    }
}
