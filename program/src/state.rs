// Lottery Program - State
use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    clock::UnixTimestamp,
    program_error::ProgramError,
    program_pack::{IsInitialized, Sealed},
    pubkey::Pubkey,
};

use crate::error::LotteryError;

/// Seed of the lottery program derived address
pub const LOTTERY_SEED: &[u8] = b"lottery";

/// Capacity of the participant registry
pub const MAX_PLAYERS: usize = 256;

/// Random words requested per round
pub const NUM_WORDS: u32 = 1;

/// Confirmations the oracle waits for before answering
pub const REQUEST_CONFIRMATIONS: u16 = 3;

/// Round state of the lottery
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LotteryState {
    /// Accepting entries
    Open,
    /// Waiting for the oracle callback
    Calculating,
}

impl From<LotteryState> for u8 {
    fn from(state: LotteryState) -> Self {
        match state {
            LotteryState::Open => 0,
            LotteryState::Calculating => 1,
        }
    }
}

/// Parameters fixed at construction
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct LotteryConfig {
    /// Minimum payment in lamports
    pub entrance_fee: u64,
    /// Minimum seconds between settlements
    pub interval: u64,
    /// VRF key hash
    pub gas_lane: [u8; 32],
    /// Oracle subscription paying for requests
    pub subscription_id: u64,
    /// Compute budget the callback is allowed to use
    pub callback_gas_limit: u32,
}

impl LotteryConfig {
    pub const LEN: usize = 8 + 8 + 32 + 8 + 4;
}

/// Lottery account data
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq)]
pub struct Lottery {
    /// Is the account initialized
    pub is_initialized: bool,
    /// Bump of the lottery PDA
    pub bump: u8,
    /// Program id of the VRF coordinator
    pub vrf_coordinator: Pubkey,
    config: LotteryConfig,
    state: LotteryState,
    last_timestamp: UnixTimestamp,
    /// Zero until the first settlement
    recent_winner: Pubkey,
    pending_request_id: Option<u64>,
    players: Vec<Pubkey>,
}

impl Sealed for Lottery {}

impl IsInitialized for Lottery {
    fn is_initialized(&self) -> bool {
        self.is_initialized
    }
}

impl Lottery {
    /// Account size with the registry at full capacity
    pub const LEN: usize =
        1 + 1 + 32 + LotteryConfig::LEN + 1 + 8 + 32 + (1 + 8) + (4 + 32 * MAX_PLAYERS);

    /// Create a fresh lottery, open from `now`
    pub fn new(
        bump: u8,
        vrf_coordinator: Pubkey,
        config: LotteryConfig,
        now: UnixTimestamp,
    ) -> Self {
        Self {
            is_initialized: true,
            bump,
            vrf_coordinator,
            config,
            state: LotteryState::Open,
            last_timestamp: now,
            recent_winner: Pubkey::default(),
            pending_request_id: None,
            players: Vec::new(),
        }
    }

    /// Decode the account data. Trailing bytes past the registry are ignored.
    pub fn load(data: &[u8]) -> Result<Self, ProgramError> {
        Self::deserialize(&mut &data[..]).map_err(|_| ProgramError::InvalidAccountData)
    }

    pub fn save(&self, data: &mut [u8]) -> Result<(), ProgramError> {
        let mut writer = data;
        self.serialize(&mut writer)
            .map_err(|_| ProgramError::AccountDataTooSmall)
    }

    pub fn config(&self) -> &LotteryConfig {
        &self.config
    }

    pub fn entrance_fee(&self) -> u64 {
        self.config.entrance_fee
    }

    pub fn interval(&self) -> u64 {
        self.config.interval
    }

    pub fn state(&self) -> LotteryState {
        self.state
    }

    pub fn last_timestamp(&self) -> UnixTimestamp {
        self.last_timestamp
    }

    pub fn recent_winner(&self) -> &Pubkey {
        &self.recent_winner
    }

    pub fn pending_request_id(&self) -> Option<u64> {
        self.pending_request_id
    }

    pub fn players(&self) -> &[Pubkey] {
        &self.players
    }

    pub fn number_of_players(&self) -> usize {
        self.players.len()
    }

    pub fn player(&self, index: usize) -> Result<&Pubkey, LotteryError> {
        self.players
            .get(index)
            .ok_or(LotteryError::PlayerIndexOutOfBounds)
    }

    pub fn num_words(&self) -> u32 {
        NUM_WORDS
    }

    pub fn request_confirmations(&self) -> u16 {
        REQUEST_CONFIRMATIONS
    }

    /// Register `player` for the current round.
    ///
    /// The payment is checked before the round state, and neither failure
    /// touches the registry.
    pub fn enter(&mut self, player: Pubkey, amount: u64) -> Result<(), LotteryError> {
        if amount < self.config.entrance_fee {
            return Err(LotteryError::InsufficientFund);
        }
        if self.state != LotteryState::Open {
            return Err(LotteryError::NotOpen);
        }
        if self.players.len() >= MAX_PLAYERS {
            return Err(LotteryError::RegistryFull);
        }
        self.players.push(player);
        Ok(())
    }

    /// OPEN -> CALCULATING, recording the outstanding oracle request
    pub fn begin_calculating(&mut self, request_id: u64) -> Result<(), LotteryError> {
        if self.state != LotteryState::Open {
            return Err(LotteryError::NotOpen);
        }
        if request_id == 0 {
            return Err(LotteryError::InvalidRequestId);
        }
        self.state = LotteryState::Calculating;
        self.pending_request_id = Some(request_id);
        Ok(())
    }

    /// CALCULATING -> OPEN after a winner has been picked
    pub(crate) fn close_round(&mut self, winner: Pubkey, now: UnixTimestamp) {
        self.recent_winner = winner;
        self.players.clear();
        self.last_timestamp = now;
        self.state = LotteryState::Open;
        self.pending_request_id = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEE: u64 = 10_000_000;

    fn config() -> LotteryConfig {
        LotteryConfig {
            entrance_fee: FEE,
            interval: 30,
            gas_lane: [7u8; 32],
            subscription_id: 1,
            callback_gas_limit: 500_000,
        }
    }

    fn lottery() -> Lottery {
        Lottery::new(255, Pubkey::new_unique(), config(), 1_000)
    }

    #[test]
    fn test_new_lottery_is_open() {
        let lottery = lottery();
        assert!(lottery.is_initialized());
        assert_eq!(lottery.state(), LotteryState::Open);
        assert_eq!(lottery.last_timestamp(), 1_000);
        assert_eq!(lottery.entrance_fee(), FEE);
        assert_eq!(lottery.interval(), 30);
        assert_eq!(lottery.recent_winner(), &Pubkey::default());
        assert_eq!(lottery.pending_request_id(), None);
        assert_eq!(lottery.number_of_players(), 0);
        assert_eq!(lottery.num_words(), 1);
        assert_eq!(lottery.request_confirmations(), 3);
    }

    #[test]
    fn test_enter_below_fee_leaves_registry_unchanged() {
        let mut lottery = lottery();
        for amount in [0, 1, FEE / 2, FEE - 1] {
            assert_eq!(
                lottery.enter(Pubkey::new_unique(), amount),
                Err(LotteryError::InsufficientFund)
            );
        }
        assert_eq!(lottery.number_of_players(), 0);
    }

    #[test]
    fn test_enter_appends_in_order() {
        let mut lottery = lottery();
        let first = Pubkey::new_unique();
        let second = Pubkey::new_unique();

        lottery.enter(first, FEE).unwrap();
        assert_eq!(lottery.number_of_players(), 1);
        lottery.enter(second, FEE * 3).unwrap();
        assert_eq!(lottery.number_of_players(), 2);

        assert_eq!(lottery.player(0), Ok(&first));
        assert_eq!(lottery.player(1), Ok(&second));
        assert_eq!(lottery.player(2), Err(LotteryError::PlayerIndexOutOfBounds));
    }

    #[test]
    fn test_enter_while_calculating_fails() {
        let mut lottery = lottery();
        lottery.enter(Pubkey::new_unique(), FEE).unwrap();
        lottery.begin_calculating(1).unwrap();

        assert_eq!(
            lottery.enter(Pubkey::new_unique(), FEE),
            Err(LotteryError::NotOpen)
        );
        assert_eq!(lottery.number_of_players(), 1);
    }

    #[test]
    fn test_registry_capacity() {
        let mut lottery = lottery();
        for _ in 0..MAX_PLAYERS {
            lottery.enter(Pubkey::new_unique(), FEE).unwrap();
        }
        assert_eq!(
            lottery.enter(Pubkey::new_unique(), FEE),
            Err(LotteryError::RegistryFull)
        );
    }

    #[test]
    fn test_begin_calculating_only_once() {
        let mut lottery = lottery();
        assert_eq!(lottery.begin_calculating(0), Err(LotteryError::InvalidRequestId));
        lottery.begin_calculating(5).unwrap();
        assert_eq!(lottery.state(), LotteryState::Calculating);
        assert_eq!(lottery.pending_request_id(), Some(5));
        assert_eq!(lottery.begin_calculating(6), Err(LotteryError::NotOpen));
        assert_eq!(lottery.pending_request_id(), Some(5));
    }

    #[test]
    fn test_close_round_resets() {
        let mut lottery = lottery();
        let player = Pubkey::new_unique();
        lottery.enter(player, FEE).unwrap();
        lottery.begin_calculating(1).unwrap();
        lottery.close_round(player, 2_000);

        assert_eq!(lottery.state(), LotteryState::Open);
        assert_eq!(lottery.recent_winner(), &player);
        assert_eq!(lottery.number_of_players(), 0);
        assert_eq!(lottery.last_timestamp(), 2_000);
        assert_eq!(lottery.pending_request_id(), None);
    }

    #[test]
    fn test_save_and_load_full_account() {
        let mut lottery = lottery();
        for _ in 0..MAX_PLAYERS {
            lottery.enter(Pubkey::new_unique(), FEE).unwrap();
        }
        let mut data = vec![0u8; Lottery::LEN];
        lottery.save(&mut data).unwrap();
        assert_eq!(Lottery::load(&data).unwrap(), lottery);
    }

    #[test]
    fn test_load_ignores_stale_trailing_bytes() {
        let mut lottery = lottery();
        let player = Pubkey::new_unique();
        lottery.enter(player, FEE).unwrap();
        lottery.enter(Pubkey::new_unique(), FEE).unwrap();
        let mut data = vec![0u8; Lottery::LEN];
        lottery.save(&mut data).unwrap();

        lottery.begin_calculating(1).unwrap();
        lottery.close_round(player, 5_000);
        lottery.save(&mut data).unwrap();

        let loaded = Lottery::load(&data).unwrap();
        assert_eq!(loaded.number_of_players(), 0);
        assert_eq!(loaded.recent_winner(), &player);
    }

    #[test]
    fn test_zeroed_account_is_uninitialized() {
        let data = vec![0u8; Lottery::LEN];
        let loaded = Lottery::load(&data).unwrap();
        assert!(!loaded.is_initialized());
    }
}
