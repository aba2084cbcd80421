// Lottery Program - Instruction Processor
use solana_program::{
    account_info::{next_account_info, AccountInfo},
    clock::Clock,
    entrypoint::ProgramResult,
    msg,
    program::{invoke, set_return_data},
    program_error::ProgramError,
    pubkey::Pubkey,
    rent::Rent,
    system_instruction,
    sysvar::Sysvar,
};

use crate::{
    error::LotteryError,
    events::LotteryEvent,
    instruction::LotteryInstruction,
    oracle::{self, RandomWordsRequest},
    settlement,
    state::{Lottery, LotteryConfig, LOTTERY_SEED, NUM_WORDS, REQUEST_CONFIRMATIONS},
    upkeep,
    utils::{self, find_lottery_address},
};

/// Program state handler.
pub struct Processor {}

impl Processor {
    /// Process a Lottery instruction
    pub fn process(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        instruction_data: &[u8],
    ) -> ProgramResult {
        let instruction = LotteryInstruction::unpack(instruction_data)?;

        match instruction {
            LotteryInstruction::Initialize(config) => {
                msg!("Instruction: Initialize");
                Self::process_initialize(program_id, accounts, config)
            }
            LotteryInstruction::EnterLottery { amount } => {
                msg!("Instruction: Enter Lottery");
                Self::process_enter_lottery(program_id, accounts, amount)
            }
            LotteryInstruction::CheckUpkeep { .. } => {
                msg!("Instruction: Check Upkeep");
                Self::process_check_upkeep(program_id, accounts)
            }
            LotteryInstruction::PerformUpkeep { .. } => {
                msg!("Instruction: Perform Upkeep");
                Self::process_perform_upkeep(program_id, accounts)
            }
            LotteryInstruction::FulfillRandomWords { request_id, words } => {
                msg!("Instruction: Fulfill Random Words");
                Self::process_fulfill_random_words(program_id, accounts, request_id, &words)
            }
        }
    }

    /// Process Initialize instruction
    ///
    /// Creates the lottery PDA with its immutable configuration and opens
    /// the first round.
    fn process_initialize(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        config: LotteryConfig,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let deployer_info = next_account_info(account_info_iter)?;
        let lottery_info = next_account_info(account_info_iter)?;
        let coordinator_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;

        if !deployer_info.is_signer {
            msg!("Deployer must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }

        let (expected_lottery, bump_seed) = find_lottery_address(program_id);
        if *lottery_info.key != expected_lottery {
            return Err(LotteryError::InvalidLotteryAccount.into());
        }

        if !coordinator_info.executable {
            msg!("VRF coordinator must be a program");
            return Err(LotteryError::InvalidCoordinator.into());
        }

        if lottery_info.owner == program_id {
            let existing = Lottery::load(&lottery_info.data.borrow())?;
            if existing.is_initialized {
                return Err(LotteryError::AlreadyInitialized.into());
            }
        } else {
            msg!("Creating lottery account");
            utils::create_pda_account(
                deployer_info,
                lottery_info,
                system_program_info,
                program_id,
                Lottery::LEN,
                &[LOTTERY_SEED, &[bump_seed]],
            )?;
        }

        let clock = Clock::get()?;
        let lottery = Lottery::new(bump_seed, *coordinator_info.key, config, clock.unix_timestamp);
        lottery.save(&mut lottery_info.data.borrow_mut())?;

        msg!(
            "Lottery initialized: EntranceFee={} SOL, Interval={}s, Coordinator={}, Subscription={}",
            utils::lamports_to_sol(config.entrance_fee),
            config.interval,
            coordinator_info.key,
            config.subscription_id
        );
        Ok(())
    }

    /// Process EnterLottery instruction
    fn process_enter_lottery(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        amount: u64,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let player_info = next_account_info(account_info_iter)?;
        let lottery_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;

        if !player_info.is_signer {
            msg!("Player must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }

        let mut lottery = Self::load_lottery(program_id, lottery_info)?;
        lottery.enter(*player_info.key, amount)?;

        invoke(
            &system_instruction::transfer(player_info.key, lottery_info.key, amount),
            &[
                player_info.clone(),
                lottery_info.clone(),
                system_program_info.clone(),
            ],
        )?;

        lottery.save(&mut lottery_info.data.borrow_mut())?;

        msg!(
            "Player {} entered with {} SOL, {} players in the round",
            player_info.key,
            utils::lamports_to_sol(amount),
            lottery.number_of_players()
        );
        LotteryEvent::LotteryEnter {
            player: *player_info.key,
        }
        .emit();
        Ok(())
    }

    /// Process CheckUpkeep instruction
    ///
    /// Read only. Return data is the verdict byte followed by the perform data.
    fn process_check_upkeep(program_id: &Pubkey, accounts: &[AccountInfo]) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let lottery_info = next_account_info(account_info_iter)?;

        let lottery = Self::load_lottery(program_id, lottery_info)?;
        let clock = Clock::get()?;
        let balance = utils::pool_balance(lottery_info, &Rent::get()?);
        let check = upkeep::check_upkeep(&lottery, clock.unix_timestamp, balance);

        msg!(
            "Upkeep needed: {} (state={:?}, players={}, balance={})",
            check.upkeep_needed,
            lottery.state(),
            lottery.number_of_players(),
            balance
        );

        let mut return_data = vec![check.upkeep_needed as u8];
        return_data.extend_from_slice(&check.perform_data);
        set_return_data(&return_data);
        Ok(())
    }

    /// Process PerformUpkeep instruction
    ///
    /// Re-evaluates the upkeep predicate, then moves the round to CALCULATING
    /// and requests exactly one random word from the coordinator.
    fn process_perform_upkeep(program_id: &Pubkey, accounts: &[AccountInfo]) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let caller_info = next_account_info(account_info_iter)?;
        let lottery_info = next_account_info(account_info_iter)?;
        let coordinator_program_info = next_account_info(account_info_iter)?;
        let coordinator_state_info = next_account_info(account_info_iter)?;
        let subscription_info = next_account_info(account_info_iter)?;
        let request_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;

        if !caller_info.is_signer {
            msg!("Caller must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }

        let mut lottery = Self::load_lottery(program_id, lottery_info)?;
        if *coordinator_program_info.key != lottery.vrf_coordinator {
            return Err(LotteryError::InvalidCoordinator.into());
        }

        let clock = Clock::get()?;
        let balance = utils::pool_balance(lottery_info, &Rent::get()?);
        upkeep::ensure_upkeep_needed(&lottery, clock.unix_timestamp, balance)?;

        let config = *lottery.config();
        let request = RandomWordsRequest {
            key_hash: config.gas_lane,
            subscription_id: config.subscription_id,
            minimum_confirmations: REQUEST_CONFIRMATIONS,
            callback_gas_limit: config.callback_gas_limit,
            num_words: NUM_WORDS,
        };
        let request_id = oracle::request_random_words(
            request,
            coordinator_program_info,
            coordinator_state_info,
            subscription_info,
            request_info,
            lottery_info,
            caller_info,
            system_program_info,
            &[LOTTERY_SEED, &[lottery.bump]],
        )?;

        lottery.begin_calculating(request_id)?;
        lottery.save(&mut lottery_info.data.borrow_mut())?;

        msg!(
            "Round closed for entries with {} players and {} lamports",
            lottery.number_of_players(),
            balance
        );
        LotteryEvent::RequestedLotteryWinner { request_id }.emit();
        Ok(())
    }

    /// Process FulfillRandomWords instruction
    ///
    /// Picks the winner, pays out the whole pool and opens the next round.
    /// Any failure, including the payout, aborts the transaction.
    fn process_fulfill_random_words(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        request_id: u64,
        words: &[u64],
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let coordinator_signer_info = next_account_info(account_info_iter)?;
        let lottery_info = next_account_info(account_info_iter)?;
        let winner_info = next_account_info(account_info_iter)?;

        let mut lottery = Self::load_lottery(program_id, lottery_info)?;
        if !oracle::is_coordinator_signer(coordinator_signer_info, &lottery.vrf_coordinator) {
            return Err(LotteryError::OnlyCoordinatorCanFulfill.into());
        }

        let prize = utils::pool_balance(lottery_info, &Rent::get()?);
        let clock = Clock::get()?;
        let outcome = settlement::settle(&mut lottery, request_id, words, clock.unix_timestamp)?;
        msg!(
            "Request {} selects player {} of the round",
            request_id,
            outcome.winner_index
        );

        if *winner_info.key != outcome.winner {
            msg!("Expected winner {}, got {}", outcome.winner, winner_info.key);
            return Err(LotteryError::WinnerAccountMismatch.into());
        }

        settlement::transfer_prize(lottery_info, winner_info, prize)?;
        lottery.save(&mut lottery_info.data.borrow_mut())?;

        msg!(
            "Winner {} received {} SOL",
            outcome.winner,
            utils::lamports_to_sol(prize)
        );
        LotteryEvent::WinnerPicked {
            winner: outcome.winner,
        }
        .emit();
        Ok(())
    }

    /// Load the lottery account, checking owner and address
    fn load_lottery(program_id: &Pubkey, lottery_info: &AccountInfo) -> Result<Lottery, ProgramError> {
        if lottery_info.owner != program_id {
            msg!("Lottery account must be owned by this program");
            return Err(ProgramError::IncorrectProgramId);
        }

        let lottery = Lottery::load(&lottery_info.data.borrow())?;
        if !lottery.is_initialized {
            return Err(ProgramError::UninitializedAccount);
        }

        let expected = Pubkey::create_program_address(&[LOTTERY_SEED, &[lottery.bump]], program_id)
            .map_err(|_| LotteryError::InvalidLotteryAccount)?;
        if *lottery_info.key != expected {
            return Err(LotteryError::InvalidLotteryAccount.into());
        }
        Ok(lottery)
    }
}
