use solana_program::{
    instruction::{AccountMeta, Instruction},
    program_error::ProgramError,
    pubkey::Pubkey,
    system_program,
};
use std::convert::TryInto;

use crate::{
    oracle::{self, FULFILL_RANDOM_WORDS_TAG},
    state::LotteryConfig,
    utils::find_lottery_address,
};

#[derive(Clone, Debug, PartialEq)]
pub enum LotteryInstruction {
    /// Create the lottery account (constructor)
    ///
    /// Accounts expected:
    /// 0. `[signer, writable]` The deployer, pays for the lottery account
    /// 1. `[writable]` The lottery account (PDA)
    /// 2. `[]` The VRF coordinator program
    /// 3. `[]` The system program
    Initialize(LotteryConfig),

    /// Enter the current round
    ///
    /// Accounts expected:
    /// 0. `[signer, writable]` The player, pays `amount`
    /// 1. `[writable]` The lottery account
    /// 2. `[]` The system program
    EnterLottery {
        /// Payment in lamports, at least the entrance fee
        amount: u64,
    },

    /// Evaluate whether upkeep is needed. Read only; the verdict is logged
    /// and set as return data (`[upkeep_needed, perform_data..]`).
    ///
    /// Accounts expected:
    /// 0. `[]` The lottery account
    CheckUpkeep { check_data: Vec<u8> },

    /// Move the round to CALCULATING and request randomness
    ///
    /// Accounts expected:
    /// 0. `[signer, writable]` Any caller (automation), pays for the request account
    /// 1. `[writable]` The lottery account
    /// 2. `[]` The VRF coordinator program
    /// 3. `[writable]` The coordinator state account
    /// 4. `[writable]` The subscription account
    /// 5. `[writable]` The request account for the next request id
    /// 6. `[]` The system program
    PerformUpkeep { perform_data: Vec<u8> },

    /// Randomness callback, only accepted from the coordinator signer
    ///
    /// Accounts expected:
    /// 0. `[signer]` The coordinator signer (PDA of the coordinator program)
    /// 1. `[writable]` The lottery account
    /// 2. `[writable]` The winner, must be the selected player
    FulfillRandomWords { request_id: u64, words: Vec<u64> },
}

impl LotteryInstruction {
    /// Unpacks a byte buffer into a LotteryInstruction
    pub fn unpack(input: &[u8]) -> Result<Self, ProgramError> {
        let (&tag, rest) = input
            .split_first()
            .ok_or(ProgramError::InvalidInstructionData)?;

        Ok(match tag {
            0 => {
                let (entrance_fee, rest) = Self::unpack_u64(rest)?;
                let (interval, rest) = Self::unpack_u64(rest)?;
                let (gas_lane, rest) = Self::unpack_fixed_bytes::<32>(rest)?;
                let (subscription_id, rest) = Self::unpack_u64(rest)?;
                let (callback_gas_limit, _) = Self::unpack_u32(rest)?;
                Self::Initialize(LotteryConfig {
                    entrance_fee,
                    interval,
                    gas_lane,
                    subscription_id,
                    callback_gas_limit,
                })
            }
            1 => {
                let (amount, _) = Self::unpack_u64(rest)?;
                Self::EnterLottery { amount }
            }
            2 => {
                let (check_data, _) = Self::unpack_bytes(rest)?;
                Self::CheckUpkeep { check_data }
            }
            3 => {
                let (perform_data, _) = Self::unpack_bytes(rest)?;
                Self::PerformUpkeep { perform_data }
            }
            FULFILL_RANDOM_WORDS_TAG => {
                let (request_id, words) = oracle::unpack_fulfill_random_words(rest)?;
                Self::FulfillRandomWords { request_id, words }
            }
            _ => return Err(ProgramError::InvalidInstructionData),
        })
    }

    /// Packs a LotteryInstruction into a byte buffer
    pub fn pack(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        match self {
            Self::Initialize(config) => {
                buf.push(0);
                buf.extend_from_slice(&config.entrance_fee.to_le_bytes());
                buf.extend_from_slice(&config.interval.to_le_bytes());
                buf.extend_from_slice(&config.gas_lane);
                buf.extend_from_slice(&config.subscription_id.to_le_bytes());
                buf.extend_from_slice(&config.callback_gas_limit.to_le_bytes());
            }
            Self::EnterLottery { amount } => {
                buf.push(1);
                buf.extend_from_slice(&amount.to_le_bytes());
            }
            Self::CheckUpkeep { check_data } => {
                buf.push(2);
                Self::pack_bytes(&mut buf, check_data);
            }
            Self::PerformUpkeep { perform_data } => {
                buf.push(3);
                Self::pack_bytes(&mut buf, perform_data);
            }
            Self::FulfillRandomWords { request_id, words } => {
                buf = oracle::pack_fulfill_random_words(*request_id, words);
            }
        }
        buf
    }

    fn unpack_u64(input: &[u8]) -> Result<(u64, &[u8]), ProgramError> {
        let (bytes, rest) = Self::unpack_fixed_bytes::<8>(input)?;
        Ok((u64::from_le_bytes(bytes), rest))
    }

    fn unpack_u32(input: &[u8]) -> Result<(u32, &[u8]), ProgramError> {
        let (bytes, rest) = Self::unpack_fixed_bytes::<4>(input)?;
        Ok((u32::from_le_bytes(bytes), rest))
    }

    fn unpack_fixed_bytes<const N: usize>(input: &[u8]) -> Result<([u8; N], &[u8]), ProgramError> {
        if input.len() < N {
            return Err(ProgramError::InvalidInstructionData);
        }
        let (bytes, rest) = input.split_at(N);
        let bytes = bytes
            .try_into()
            .map_err(|_| ProgramError::InvalidInstructionData)?;
        Ok((bytes, rest))
    }

    fn unpack_bytes(input: &[u8]) -> Result<(Vec<u8>, &[u8]), ProgramError> {
        let (len, rest) = Self::unpack_u32(input)?;
        let len = len as usize;
        if rest.len() < len {
            return Err(ProgramError::InvalidInstructionData);
        }
        let (bytes, rest) = rest.split_at(len);
        Ok((bytes.to_vec(), rest))
    }

    fn pack_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
        buf.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
        buf.extend_from_slice(bytes);
    }
}

/// Create initialize instruction
pub fn initialize(
    program_id: &Pubkey,
    deployer: &Pubkey,
    vrf_coordinator: &Pubkey,
    config: LotteryConfig,
) -> Instruction {
    let (lottery, _) = find_lottery_address(program_id);
    let accounts = vec![
        AccountMeta::new(*deployer, true),
        AccountMeta::new(lottery, false),
        AccountMeta::new_readonly(*vrf_coordinator, false),
        AccountMeta::new_readonly(system_program::id(), false),
    ];

    Instruction {
        program_id: *program_id,
        accounts,
        data: LotteryInstruction::Initialize(config).pack(),
    }
}

/// Create enter_lottery instruction
pub fn enter_lottery(program_id: &Pubkey, player: &Pubkey, amount: u64) -> Instruction {
    let (lottery, _) = find_lottery_address(program_id);
    let accounts = vec![
        AccountMeta::new(*player, true),
        AccountMeta::new(lottery, false),
        AccountMeta::new_readonly(system_program::id(), false),
    ];

    Instruction {
        program_id: *program_id,
        accounts,
        data: LotteryInstruction::EnterLottery { amount }.pack(),
    }
}

/// Create check_upkeep instruction
pub fn check_upkeep(program_id: &Pubkey) -> Instruction {
    let (lottery, _) = find_lottery_address(program_id);

    Instruction {
        program_id: *program_id,
        accounts: vec![AccountMeta::new_readonly(lottery, false)],
        data: LotteryInstruction::CheckUpkeep { check_data: vec![] }.pack(),
    }
}

/// Create perform_upkeep instruction.
///
/// `next_request_id` is read from the coordinator state; it selects the
/// request account the coordinator will create.
pub fn perform_upkeep(
    program_id: &Pubkey,
    caller: &Pubkey,
    vrf_coordinator: &Pubkey,
    subscription_id: u64,
    next_request_id: u64,
) -> Instruction {
    let (lottery, _) = find_lottery_address(program_id);
    let (coordinator_state, _) = oracle::find_coordinator_address(vrf_coordinator);
    let (subscription, _) = oracle::find_subscription_address(vrf_coordinator, subscription_id);
    let (request, _) = oracle::find_request_address(vrf_coordinator, next_request_id);

    let accounts = vec![
        AccountMeta::new(*caller, true),
        AccountMeta::new(lottery, false),
        AccountMeta::new_readonly(*vrf_coordinator, false),
        AccountMeta::new(coordinator_state, false),
        AccountMeta::new(subscription, false),
        AccountMeta::new(request, false),
        AccountMeta::new_readonly(system_program::id(), false),
    ];

    Instruction {
        program_id: *program_id,
        accounts,
        data: LotteryInstruction::PerformUpkeep { perform_data: vec![] }.pack(),
    }
}

/// Accounts a coordinator must forward to the lottery callback, after its signer
pub fn fulfill_callback_accounts(program_id: &Pubkey, winner: &Pubkey) -> Vec<AccountMeta> {
    let (lottery, _) = find_lottery_address(program_id);
    vec![AccountMeta::new(lottery, false), AccountMeta::new(*winner, false)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unpack_initialize() {
        let config = LotteryConfig {
            entrance_fee: 10_000_000,
            interval: 30,
            gas_lane: [9u8; 32],
            subscription_id: 4,
            callback_gas_limit: 500_000,
        };
        let data = LotteryInstruction::Initialize(config).pack();
        assert_eq!(data.len(), 1 + LotteryConfig::LEN);
        assert_eq!(
            LotteryInstruction::unpack(&data).unwrap(),
            LotteryInstruction::Initialize(config)
        );
    }

    #[test]
    fn test_unpack_enter_lottery() {
        let mut data = vec![1];
        data.extend_from_slice(&10_000_000u64.to_le_bytes());
        assert_eq!(
            LotteryInstruction::unpack(&data).unwrap(),
            LotteryInstruction::EnterLottery { amount: 10_000_000 }
        );
    }

    #[test]
    fn test_fulfill_uses_oracle_callback_layout() {
        let instruction = LotteryInstruction::FulfillRandomWords {
            request_id: 1,
            words: vec![42],
        };
        assert_eq!(
            instruction.pack(),
            crate::oracle::pack_fulfill_random_words(1, &[42])
        );
        assert_eq!(LotteryInstruction::unpack(&instruction.pack()).unwrap(), instruction);
    }

    #[test]
    fn test_unpack_rejects_short_or_unknown_input() {
        assert_eq!(
            LotteryInstruction::unpack(&[]),
            Err(ProgramError::InvalidInstructionData)
        );
        assert_eq!(
            LotteryInstruction::unpack(&[1, 0, 0]),
            Err(ProgramError::InvalidInstructionData)
        );
        assert_eq!(
            LotteryInstruction::unpack(&[3, 5, 0, 0, 0, 1]),
            Err(ProgramError::InvalidInstructionData)
        );
        assert_eq!(
            LotteryInstruction::unpack(&[200]),
            Err(ProgramError::InvalidInstructionData)
        );
    }

    #[test]
    fn test_perform_upkeep_accounts() {
        let program_id = Pubkey::new_unique();
        let coordinator = Pubkey::new_unique();
        let caller = Pubkey::new_unique();
        let instruction = perform_upkeep(&program_id, &caller, &coordinator, 1, 1);

        assert_eq!(instruction.accounts.len(), 7);
        assert_eq!(instruction.accounts[0], AccountMeta::new(caller, true));
        assert_eq!(
            instruction.accounts[1].pubkey,
            find_lottery_address(&program_id).0
        );
        assert_eq!(
            instruction.accounts[5].pubkey,
            oracle::find_request_address(&coordinator, 1).0
        );
    }
}
