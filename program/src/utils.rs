// Lottery Program - Utility Functions
use solana_program::{
    account_info::AccountInfo,
    entrypoint::ProgramResult,
    msg,
    program::{invoke, invoke_signed},
    pubkey::Pubkey,
    rent::Rent,
    system_instruction,
    sysvar::Sysvar,
};

use crate::state::LOTTERY_SEED;

/// Find the program derived address of the lottery account
pub fn find_lottery_address(program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[LOTTERY_SEED], program_id)
}

/// Lamports held by `account` above its rent-exempt minimum
pub fn pool_balance(account: &AccountInfo, rent: &Rent) -> u64 {
    account
        .lamports()
        .saturating_sub(rent.minimum_balance(account.data_len()))
}

/// Create a rent exempt PDA owned by `owner`, signed with `seeds`.
///
/// A PDA address can receive lamports before it exists, which makes
/// `create_account` fail. In that case the balance is topped up to the rent
/// minimum and the account is allocated and assigned instead.
pub fn create_pda_account<'a>(
    payer_info: &AccountInfo<'a>,
    new_account_info: &AccountInfo<'a>,
    system_program_info: &AccountInfo<'a>,
    owner: &Pubkey,
    space: usize,
    seeds: &[&[u8]],
) -> ProgramResult {
    let required_lamports = Rent::get()?.minimum_balance(space);

    if new_account_info.lamports() == 0 {
        return invoke_signed(
            &system_instruction::create_account(
                payer_info.key,
                new_account_info.key,
                required_lamports,
                space as u64,
                owner,
            ),
            &[
                payer_info.clone(),
                new_account_info.clone(),
                system_program_info.clone(),
            ],
            &[seeds],
        );
    }

    msg!(
        "{} already holds {} lamports",
        new_account_info.key,
        new_account_info.lamports()
    );
    let top_up = required_lamports.saturating_sub(new_account_info.lamports());
    if top_up > 0 {
        invoke(
            &system_instruction::transfer(payer_info.key, new_account_info.key, top_up),
            &[
                payer_info.clone(),
                new_account_info.clone(),
                system_program_info.clone(),
            ],
        )?;
    }
    invoke_signed(
        &system_instruction::allocate(new_account_info.key, space as u64),
        &[new_account_info.clone(), system_program_info.clone()],
        &[seeds],
    )?;
    invoke_signed(
        &system_instruction::assign(new_account_info.key, owner),
        &[new_account_info.clone(), system_program_info.clone()],
        &[seeds],
    )
}

/// Convert lamports to SOL (for display purposes)
pub fn lamports_to_sol(lamports: u64) -> f64 {
    lamports as f64 / 1_000_000_000.0
}

/// Convert SOL to lamports
pub fn sol_to_lamports(sol: f64) -> u64 {
    (sol * 1_000_000_000.0).round() as u64
}
