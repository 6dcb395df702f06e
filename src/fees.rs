use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::instruction::Instruction;
use solana_sdk::pubkey::Pubkey;
use spl_associated_token_account::instruction::create_associated_token_account;

use crate::error::{Error, Result};

/// Split `amount` into `(fee, net)` at `bps` basis points. Fee rounds down, so
/// `fee + net == amount` holds exactly for all 0 ≤ bps ≤ 10_000.
pub fn split_fee(amount: u64, bps: u16) -> (u64, u64) {
    debug_assert!(bps <= 10_000, "fee rate above 100%");
    let fee = (amount as u128 * bps as u128 / 10_000) as u64;
    (fee, amount - fee)
}

/// Token transfer moving the developer fee out of the payer's settlement-token
/// account. Callers only build this when a recipient and a non-zero rate are
/// both configured.
#[allow(deprecated)]
pub fn dev_fee_transfer_instruction(
    user_settlement_ata: &Pubkey,
    dev_account: &Pubkey,
    owner: &Pubkey,
    fee: u64,
) -> Result<Instruction> {
    spl_token::instruction::transfer(
        &spl_token::id(),
        user_settlement_ata,
        dev_account,
        owner,
        &[],
        fee,
    )
    .map_err(|e| Error::Decode(format!("build fee transfer instruction: {e}")))
}

/// Outcome of probing a token account on chain. `LookupFailed` is kept distinct
/// from `NotFound` internally; the collapse happens once, in
/// [`needs_creation`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccountProbe {
    Found,
    NotFound,
    LookupFailed,
}

pub async fn probe_token_account(rpc: &RpcClient, address: &Pubkey) -> AccountProbe {
    match rpc
        .get_account_with_commitment(address, CommitmentConfig::confirmed())
        .await
    {
        Ok(response) => match response.value {
            Some(_) => AccountProbe::Found,
            None => AccountProbe::NotFound,
        },
        Err(_) => AccountProbe::LookupFailed,
    }
}

/// Observed upstream behavior treats any lookup failure as "does not exist", so
/// a failed probe also requests creation. Kept as a faithfulness trade-off, not
/// a recommended design.
pub fn needs_creation(probe: AccountProbe) -> bool {
    match probe {
        AccountProbe::Found => false,
        AccountProbe::NotFound | AccountProbe::LookupFailed => true,
    }
}

/// Returns an associated-token-account creation instruction for
/// `expected_account` unless the probe reports it already exists.
pub async fn create_account_instruction_if_missing(
    rpc: &RpcClient,
    payer: &Pubkey,
    mint: &Pubkey,
    owner: &Pubkey,
    expected_account: &Pubkey,
) -> Option<Instruction> {
    let probe = probe_token_account(rpc, expected_account).await;
    if !needs_creation(probe) {
        return None;
    }
    Some(create_associated_token_account(
        payer,
        owner,
        mint,
        &spl_token::id(),
    ))
}
