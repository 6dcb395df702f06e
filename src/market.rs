use async_trait::async_trait;
use solana_sdk::instruction::Instruction;
use solana_sdk::pubkey::Pubkey;

use crate::error::Result;

/// Side of a parimutuel position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PositionSide {
    Long,
    Short,
}

/// Seam to the on-chain parimutuel market program. The production implementor
/// wraps the market SDK's instruction builder; tests substitute a stub.
#[async_trait]
pub trait PositionProgram: Send + Sync {
    /// Instructions placing a bet of `amount` settlement units on `market` for
    /// `payer`. `placed_at_ms` is the wall-clock timestamp in milliseconds; the
    /// program treats it as an opaque ordering hint, never interpreted here.
    async fn place_position_instructions(
        &self,
        payer: &Pubkey,
        market: &Pubkey,
        amount: u64,
        side: PositionSide,
        placed_at_ms: i64,
    ) -> Result<Vec<Instruction>>;
}
