use solana_client::client_error::ClientError;
use solana_sdk::message::CompileError;
use solana_sdk::pubkey::Pubkey;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("insufficient funds: account holds {available}, position requires {required}")]
    InsufficientFunds { available: u64, required: u64 },

    #[error("settlement token account {0} has not been initialized")]
    AccountNotInitialized(Pubkey),

    #[error("no swap route from {input_mint} to the settlement token")]
    NoRouteFound { input_mint: Pubkey },

    #[error("developer fee rate {bps} bps exceeds the 10000 bps maximum")]
    InvalidFeeRate { bps: u16 },

    #[error("decode error: {0}")]
    Decode(String),

    #[error("market program error: {0}")]
    Program(String),

    #[error("message compile error: {0:?}")]
    Compile(CompileError),

    #[error(transparent)]
    Network(#[from] reqwest::Error),

    #[error(transparent)]
    Rpc(#[from] ClientError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl From<CompileError> for Error {
    fn from(err: CompileError) -> Self {
        Self::Compile(err)
    }
}

impl From<bincode::Error> for Error {
    fn from(err: bincode::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

impl From<base64::DecodeError> for Error {
    fn from(err: base64::DecodeError) -> Self {
        Self::Decode(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
