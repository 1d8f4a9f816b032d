//! Extrinsic kinds used as strict-mode hints.

use serde::{Deserialize, Serialize};

/// Purpose of a transferable-balance computation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtrinsicType {
    /// Native token transfer
    TransferBalance,
    /// Non-native token transfer
    TransferToken,
    /// Cross-chain transfer
    TransferXcm,
    /// Staking bond
    StakingBond,
    /// Staking unbond
    StakingUnbond,
    /// Withdraw unbonded stake
    StakingWithdraw,
    /// NFT transfer
    SendNft,
}
