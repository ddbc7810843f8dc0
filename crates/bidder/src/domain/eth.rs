pub use alloy::primitives::{Address, B256, Bytes, TxHash, U256, keccak256};

/// Unix time in seconds. The contracts store timestamps as `uint32`.
pub type Timestamp = u32;

/// An EIP-155 chain id.
pub type ChainId = u64;

/// A mined transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Receipt {
    pub tx_hash: TxHash,
    pub block: u64,
}
