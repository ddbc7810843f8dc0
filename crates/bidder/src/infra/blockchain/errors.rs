use {
    crate::domain::chain,
    alloy::{
        contract::Error as ContractError,
        providers::PendingTransactionError,
        transports::{RpcError, TransportError},
    },
};

pub trait ContractErrorExt {
    /// Returns whether a given error is a node error. Transport errors count
    /// as node errors unless the node returned revert data with them, in
    /// which case the contract rejected the call.
    fn is_node_error(&self) -> bool;
}

impl ContractErrorExt for ContractError {
    fn is_node_error(&self) -> bool {
        match self {
            // Empty revert data still means the call reverted, so look at the
            // raw data rather than at what alloy manages to decode from it.
            ContractError::TransportError(RpcError::ErrorResp(err)) => {
                let no_revert_data = err.as_revert_data().is_none();
                tracing::debug!(?err, %no_revert_data, "transport rpc error");
                no_revert_data
            }
            ContractError::TransportError(_) => true,
            _ => false,
        }
    }
}

impl From<ContractError> for chain::Error {
    fn from(err: ContractError) -> Self {
        if err.is_node_error() {
            return Self::Node(err.to_string());
        }
        match err {
            ContractError::AbiError(_) | ContractError::ZeroData(..) => {
                Self::Decode(err.to_string())
            }
            err => Self::Revert(err.to_string()),
        }
    }
}

impl From<PendingTransactionError> for chain::Error {
    fn from(err: PendingTransactionError) -> Self {
        Self::Node(err.to_string())
    }
}

impl From<TransportError> for chain::Error {
    fn from(err: TransportError) -> Self {
        match &err {
            RpcError::ErrorResp(payload) if payload.as_revert_data().is_some() => {
                Self::Revert(err.to_string())
            }
            RpcError::DeserError { .. } => Self::Decode(err.to_string()),
            _ => Self::Node(err.to_string()),
        }
    }
}
