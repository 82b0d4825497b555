//! Engine-wide constants and init parameters (spec.md §4.I, `IceInitInfo_t`).

use crate::credentials::CredentialBlock;
use crate::error::IceError;
use crate::stun::channel_data::{CHANNEL_NUMBER_MAX, CHANNEL_NUMBER_MIN};

pub use crate::stun::channel_data::{CHANNEL_NUMBER_MAX as ICE_DEFAULT_TURN_CHANNEL_NUMBER_MAX, CHANNEL_NUMBER_MIN as ICE_DEFAULT_TURN_CHANNEL_NUMBER_MIN};

/// RFC 5766 §2.2: the default lifetime a TURN server grants a permission
/// absent an explicit refresh.
pub const DEFAULT_TURN_PERMISSION_LIFETIME_SECONDS: u64 = 300;
/// RFC 5766 §2.2: the default TURN allocation lifetime.
pub const DEFAULT_TURN_ALLOCATION_LIFETIME_SECONDS: u64 = 600;

/// `IceInitInfo_t`: capacities and credentials supplied at `Init`.
pub struct InitInfo {
    pub credentials: CredentialBlock,
    pub max_local_candidates: usize,
    pub max_remote_candidates: usize,
    pub max_candidate_pairs: usize,
    pub transaction_id_store_capacity: usize,
    pub is_controlling: bool,
}

impl InitInfo {
    pub fn turn_channel_number_range(&self) -> (u16, u16) {
        (CHANNEL_NUMBER_MIN, CHANNEL_NUMBER_MAX)
    }

    /// Field-level validation equivalent to `Ice_Init`'s NULL-pointer checks:
    /// every slab needs room for at least one entry.
    pub fn validate(&self) -> Result<(), IceError> {
        if self.max_local_candidates == 0
            || self.max_remote_candidates == 0
            || self.max_candidate_pairs == 0
            || self.transaction_id_store_capacity == 0
        {
            return Err(IceError::BadParam);
        }

        Ok(())
    }
}
