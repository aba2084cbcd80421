use arrayref::{array_mut_ref, array_ref, array_refs, mut_array_refs};
use solana_program::{
    program_error::ProgramError,
    program_pack::{IsInitialized, Pack, Sealed},
    pubkey::Pubkey,
};

/// Consumers allowed per subscription
pub const MAX_CONSUMERS: usize = 4;

/// Upper bound on words per request
pub const MAX_NUM_WORDS: u32 = 500;

/// Coordinator state account
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinatorState {
    /// Is the account initialized
    pub is_initialized: bool,
    /// Charged to the subscription on every fulfillment
    pub base_fee: u64,
    /// Id assigned to the next subscription, starts at 1
    pub next_subscription_id: u64,
    /// Id assigned to the next request, starts at 1
    pub next_request_id: u64,
}

/// Subscription account
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Subscription {
    /// Is the account initialized
    pub is_initialized: bool,
    pub id: u64,
    pub owner: Pubkey,
    /// Bookkeeping balance, not backed by lamports
    pub balance: u64,
    pub consumer_count: u8,
    pub consumers: [Pubkey; MAX_CONSUMERS],
}

impl Subscription {
    pub fn is_consumer(&self, consumer: &Pubkey) -> bool {
        self.consumers[..self.consumer_count as usize]
            .iter()
            .any(|registered| registered == consumer)
    }

    /// Returns false when the subscription is full. Adding twice is a no-op.
    pub fn add_consumer(&mut self, consumer: Pubkey) -> bool {
        if self.is_consumer(&consumer) {
            return true;
        }
        let count = self.consumer_count as usize;
        if count >= MAX_CONSUMERS {
            return false;
        }
        self.consumers[count] = consumer;
        self.consumer_count += 1;
        true
    }
}

/// Randomness request record
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RequestRecord {
    /// Is the account initialized
    pub is_initialized: bool,
    pub request_id: u64,
    pub subscription_id: u64,
    /// Account that signed the request
    pub consumer: Pubkey,
    /// Program receiving the callback
    pub consumer_program: Pubkey,
    pub key_hash: [u8; 32],
    pub minimum_confirmations: u16,
    pub callback_gas_limit: u32,
    pub num_words: u32,
    pub requested_slot: u64,
    pub fulfilled: bool,
}

impl Sealed for CoordinatorState {}
impl Sealed for Subscription {}
impl Sealed for RequestRecord {}

impl IsInitialized for CoordinatorState {
    fn is_initialized(&self) -> bool {
        self.is_initialized
    }
}

impl IsInitialized for Subscription {
    fn is_initialized(&self) -> bool {
        self.is_initialized
    }
}

impl IsInitialized for RequestRecord {
    fn is_initialized(&self) -> bool {
        self.is_initialized
    }
}

impl Pack for CoordinatorState {
    const LEN: usize = 1 + 8 + 8 + 8;

    fn unpack_from_slice(src: &[u8]) -> Result<Self, ProgramError> {
        let src = array_ref![src, 0, CoordinatorState::LEN];
        let (is_initialized, base_fee, next_subscription_id, next_request_id) =
            array_refs![src, 1, 8, 8, 8];

        Ok(CoordinatorState {
            is_initialized: is_initialized[0] != 0,
            base_fee: u64::from_le_bytes(*base_fee),
            next_subscription_id: u64::from_le_bytes(*next_subscription_id),
            next_request_id: u64::from_le_bytes(*next_request_id),
        })
    }

    fn pack_into_slice(&self, dst: &mut [u8]) {
        let dst = array_mut_ref![dst, 0, CoordinatorState::LEN];
        let (is_initialized_dst, base_fee_dst, next_subscription_id_dst, next_request_id_dst) =
            mut_array_refs![dst, 1, 8, 8, 8];

        is_initialized_dst[0] = self.is_initialized as u8;
        *base_fee_dst = self.base_fee.to_le_bytes();
        *next_subscription_id_dst = self.next_subscription_id.to_le_bytes();
        *next_request_id_dst = self.next_request_id.to_le_bytes();
    }
}

impl Pack for Subscription {
    const LEN: usize = 1 + 8 + 32 + 8 + 1 + 32 * MAX_CONSUMERS;

    fn unpack_from_slice(src: &[u8]) -> Result<Self, ProgramError> {
        let src = array_ref![src, 0, Subscription::LEN];
        let (is_initialized, id, owner, balance, consumer_count, consumers_flat) =
            array_refs![src, 1, 8, 32, 8, 1, 32 * MAX_CONSUMERS];

        let consumer_count = consumer_count[0];
        if consumer_count as usize > MAX_CONSUMERS {
            return Err(ProgramError::InvalidAccountData);
        }

        let mut consumers = [Pubkey::default(); MAX_CONSUMERS];
        for (consumer, bytes) in consumers.iter_mut().zip(consumers_flat.chunks_exact(32)) {
            let mut key = [0u8; 32];
            key.copy_from_slice(bytes);
            *consumer = Pubkey::new_from_array(key);
        }

        Ok(Subscription {
            is_initialized: is_initialized[0] != 0,
            id: u64::from_le_bytes(*id),
            owner: Pubkey::new_from_array(*owner),
            balance: u64::from_le_bytes(*balance),
            consumer_count,
            consumers,
        })
    }

    fn pack_into_slice(&self, dst: &mut [u8]) {
        let dst = array_mut_ref![dst, 0, Subscription::LEN];
        let (is_initialized_dst, id_dst, owner_dst, balance_dst, consumer_count_dst, consumers_dst) =
            mut_array_refs![dst, 1, 8, 32, 8, 1, 32 * MAX_CONSUMERS];

        is_initialized_dst[0] = self.is_initialized as u8;
        *id_dst = self.id.to_le_bytes();
        owner_dst.copy_from_slice(self.owner.as_ref());
        *balance_dst = self.balance.to_le_bytes();
        consumer_count_dst[0] = self.consumer_count;
        for (bytes, consumer) in consumers_dst.chunks_exact_mut(32).zip(self.consumers.iter()) {
            bytes.copy_from_slice(consumer.as_ref());
        }
    }
}

impl Pack for RequestRecord {
    const LEN: usize = 1 + 8 + 8 + 32 + 32 + 32 + 2 + 4 + 4 + 8 + 1;

    fn unpack_from_slice(src: &[u8]) -> Result<Self, ProgramError> {
        let src = array_ref![src, 0, RequestRecord::LEN];
        let (
            is_initialized,
            request_id,
            subscription_id,
            consumer,
            consumer_program,
            key_hash,
            minimum_confirmations,
            callback_gas_limit,
            num_words,
            requested_slot,
            fulfilled,
        ) = array_refs![src, 1, 8, 8, 32, 32, 32, 2, 4, 4, 8, 1];

        Ok(RequestRecord {
            is_initialized: is_initialized[0] != 0,
            request_id: u64::from_le_bytes(*request_id),
            subscription_id: u64::from_le_bytes(*subscription_id),
            consumer: Pubkey::new_from_array(*consumer),
            consumer_program: Pubkey::new_from_array(*consumer_program),
            key_hash: *key_hash,
            minimum_confirmations: u16::from_le_bytes(*minimum_confirmations),
            callback_gas_limit: u32::from_le_bytes(*callback_gas_limit),
            num_words: u32::from_le_bytes(*num_words),
            requested_slot: u64::from_le_bytes(*requested_slot),
            fulfilled: fulfilled[0] != 0,
        })
    }

    fn pack_into_slice(&self, dst: &mut [u8]) {
        let dst = array_mut_ref![dst, 0, RequestRecord::LEN];
        let (
            is_initialized_dst,
            request_id_dst,
            subscription_id_dst,
            consumer_dst,
            consumer_program_dst,
            key_hash_dst,
            minimum_confirmations_dst,
            callback_gas_limit_dst,
            num_words_dst,
            requested_slot_dst,
            fulfilled_dst,
        ) = mut_array_refs![dst, 1, 8, 8, 32, 32, 32, 2, 4, 4, 8, 1];

        is_initialized_dst[0] = self.is_initialized as u8;
        *request_id_dst = self.request_id.to_le_bytes();
        *subscription_id_dst = self.subscription_id.to_le_bytes();
        consumer_dst.copy_from_slice(self.consumer.as_ref());
        consumer_program_dst.copy_from_slice(self.consumer_program.as_ref());
        key_hash_dst.copy_from_slice(&self.key_hash);
        *minimum_confirmations_dst = self.minimum_confirmations.to_le_bytes();
        *callback_gas_limit_dst = self.callback_gas_limit.to_le_bytes();
        *num_words_dst = self.num_words.to_le_bytes();
        *requested_slot_dst = self.requested_slot.to_le_bytes();
        fulfilled_dst[0] = self.fulfilled as u8;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subscription() -> Subscription {
        Subscription {
            is_initialized: true,
            id: 1,
            owner: Pubkey::new_unique(),
            balance: 0,
            consumer_count: 0,
            consumers: [Pubkey::default(); MAX_CONSUMERS],
        }
    }

    #[test]
    fn test_add_consumer_is_bounded_and_idempotent() {
        let mut subscription = subscription();
        let consumer = Pubkey::new_unique();
        assert!(subscription.add_consumer(consumer));
        assert!(subscription.add_consumer(consumer));
        assert_eq!(subscription.consumer_count, 1);
        assert!(subscription.is_consumer(&consumer));

        for _ in 1..MAX_CONSUMERS {
            assert!(subscription.add_consumer(Pubkey::new_unique()));
        }
        assert!(!subscription.add_consumer(Pubkey::new_unique()));
        assert_eq!(subscription.consumer_count as usize, MAX_CONSUMERS);
    }

    #[test]
    fn test_unregistered_default_key_is_not_a_consumer() {
        let subscription = subscription();
        assert!(!subscription.is_consumer(&Pubkey::default()));
    }

    #[test]
    fn test_subscription_layout() {
        let mut subscription = subscription();
        subscription.balance = 7;
        subscription.add_consumer(Pubkey::new_unique());

        let mut data = vec![0u8; Subscription::LEN];
        Subscription::pack(subscription, &mut data).unwrap();
        assert_eq!(data[0], 1);
        assert_eq!(&data[1..9], &1u64.to_le_bytes());
        assert_eq!(Subscription::unpack(&data).unwrap(), subscription);
    }

    #[test]
    fn test_request_record_layout() {
        let record = RequestRecord {
            is_initialized: true,
            request_id: 3,
            subscription_id: 1,
            consumer: Pubkey::new_unique(),
            consumer_program: Pubkey::new_unique(),
            key_hash: [5u8; 32],
            minimum_confirmations: 3,
            callback_gas_limit: 500_000,
            num_words: 1,
            requested_slot: 10,
            fulfilled: false,
        };
        let mut data = vec![0u8; RequestRecord::LEN];
        RequestRecord::pack(record, &mut data).unwrap();
        assert_eq!(RequestRecord::unpack(&data).unwrap(), record);
    }
}
