pub mod assemble;
pub mod balances;
pub mod compose;
pub mod error;
pub mod fees;
pub mod market;
pub mod quote;
pub mod swap;

use solana_sdk::pubkey::Pubkey;

/// Settlement token the betting program accepts (USDC).
pub const USDC_MINT: Pubkey =
    solana_sdk::pubkey!("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v");

/// Platform wallet the aggregator swap fee is collected into.
pub const SWAP_FEE_WALLET: Pubkey =
    solana_sdk::pubkey!("5qxvvD5fJJK2xPBmifNV1cmbN6vMrncjTinmFWU1eRGs");

/// Platform swap fee passed to the quote endpoint, in basis points.
pub const SWAP_FEE_BPS: u16 = 50;

pub use assemble::{
    place_position_transaction, PaymentBreakdown, PlacePositionTransaction, PositionRequest,
};
pub use error::{Error, Result};
pub use market::{PositionProgram, PositionSide};
pub use quote::{QuoteClient, Route, SwapMode, TokenData};
