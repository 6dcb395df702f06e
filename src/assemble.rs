use chrono::Utc;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::instruction::Instruction;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::transaction::VersionedTransaction;
use spl_associated_token_account::get_associated_token_address;

use crate::error::{Error, Result};
use crate::fees::{self, AccountProbe};
use crate::market::{PositionProgram, PositionSide};
use crate::quote::{QuoteClient, Route, SwapMode};
use crate::{balances, compose, swap, SWAP_FEE_WALLET, USDC_MINT};

/// Safety padding applied to the exact-in fallback's input sizing.
const EXACT_IN_PADDING: f64 = 0.05;

/// Everything one assembly call needs, passed in explicitly; the assembler
/// holds no state between calls.
#[derive(Clone, Debug)]
pub struct PositionRequest {
    /// Mint of the token the user pays with.
    pub input_token_mint: Pubkey,
    /// Bet size in USD, human units.
    pub usd_amount: f64,
    /// Parimutuel market the position is placed on.
    pub market: Pubkey,
    pub side: PositionSide,
    /// Developer fee recipient (a settlement-token account, already
    /// initialized). No transfer is built without it.
    pub dev_fee_account: Option<Pubkey>,
    /// Developer fee rate in basis points, 0..=10_000.
    pub dev_fee_bps: u16,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PaymentBreakdown {
    /// Scaled bet size in settlement units.
    pub total: u64,
    pub dev_fee: u64,
    /// Net amount placed on the market: `total - dev_fee`.
    pub bet_amount: u64,
}

/// Result of one assembly call. The transaction is unsigned; signing and
/// submission are the caller's. Nothing is retained here after return.
#[derive(Debug)]
pub struct PlacePositionTransaction {
    pub transaction: VersionedTransaction,
    pub breakdown: PaymentBreakdown,
}

/// Assemble a single versioned transaction that places `request.usd_amount`
/// on `request.market`, swapping the input token to the settlement token
/// first when necessary.
pub async fn place_position_transaction(
    rpc: &RpcClient,
    quotes: &QuoteClient,
    program: &dyn PositionProgram,
    wallet: &Pubkey,
    request: &PositionRequest,
) -> Result<PlacePositionTransaction> {
    let breakdown = payment_breakdown(request.usd_amount, request.dev_fee_bps)?;

    let transaction = if request.input_token_mint == USDC_MINT {
        without_swap(rpc, program, wallet, request, breakdown).await?
    } else {
        with_swap(rpc, quotes, program, wallet, request, breakdown).await?
    };

    Ok(PlacePositionTransaction {
        transaction,
        breakdown,
    })
}

/// Scale the USD amount and carve out the developer fee. A fee rate above
/// 100% is rejected before any amount math runs on it.
fn payment_breakdown(usd_amount: f64, dev_fee_bps: u16) -> Result<PaymentBreakdown> {
    if dev_fee_bps > 10_000 {
        return Err(Error::InvalidFeeRate { bps: dev_fee_bps });
    }
    let total = scale_usd_amount(usd_amount);
    let (dev_fee, bet_amount) = fees::split_fee(total, dev_fee_bps);
    Ok(PaymentBreakdown {
        total,
        dev_fee,
        bet_amount,
    })
}

/// Settlement token uses 6 decimals; amounts are scaled once, up front.
fn scale_usd_amount(usd_amount: f64) -> u64 {
    (usd_amount * 1_000_000.0).round() as u64
}

fn ensure_initialized(probe: AccountProbe, account: Pubkey) -> Result<()> {
    match probe {
        AccountProbe::Found => Ok(()),
        AccountProbe::NotFound | AccountProbe::LookupFailed => {
            Err(Error::AccountNotInitialized(account))
        }
    }
}

fn ensure_funded(available: u64, required: u64) -> Result<()> {
    if available < required {
        return Err(Error::InsufficientFunds {
            available,
            required,
        });
    }
    Ok(())
}

/// Input quantity for the exact-in fallback: enough of the input token to
/// cover the bet at the current price, padded 5% against movement.
fn padded_input_amount(amount: u64, price: f64) -> u64 {
    let amount_of_input = amount as f64 / price;
    let padding = amount_of_input * EXACT_IN_PADDING;
    (amount_of_input + padding).ceil() as u64
}

/// The one ordering the final transaction is allowed to have.
fn position_instructions(
    swap_instructions: Vec<Instruction>,
    create_fee_account: Option<Instruction>,
    dev_fee_transfer: Option<Instruction>,
    place_position: Vec<Instruction>,
) -> Vec<Instruction> {
    let mut out = Vec::with_capacity(
        swap_instructions.len() + place_position.len() + 2,
    );
    out.extend(create_fee_account);
    out.extend(swap_instructions);
    out.extend(dev_fee_transfer);
    out.extend(place_position);
    out
}

fn dev_fee_transfer(
    request: &PositionRequest,
    wallet: &Pubkey,
    dev_fee: u64,
) -> Result<Option<Instruction>> {
    match request.dev_fee_account {
        Some(dev_account) if request.dev_fee_bps > 0 => {
            let user_ata = get_associated_token_address(wallet, &USDC_MINT);
            Ok(Some(fees::dev_fee_transfer_instruction(
                &user_ata,
                &dev_account,
                wallet,
                dev_fee,
            )?))
        }
        _ => Ok(None),
    }
}

async fn place_instructions(
    program: &dyn PositionProgram,
    wallet: &Pubkey,
    request: &PositionRequest,
    bet_amount: u64,
) -> Result<Vec<Instruction>> {
    program
        .place_position_instructions(
            wallet,
            &request.market,
            bet_amount,
            request.side,
            Utc::now().timestamp_millis(),
        )
        .await
}

/// Input token is already the settlement token: no swap call is made. The
/// user's settlement account must exist and cover the full amount before any
/// instruction is built.
async fn without_swap(
    rpc: &RpcClient,
    program: &dyn PositionProgram,
    wallet: &Pubkey,
    request: &PositionRequest,
    breakdown: PaymentBreakdown,
) -> Result<VersionedTransaction> {
    let user_ata = get_associated_token_address(wallet, &USDC_MINT);
    let probe = fees::probe_token_account(rpc, &user_ata).await;
    ensure_initialized(probe, user_ata)?;

    let available = balances::token_account_balance(rpc, &user_ata).await?;
    ensure_funded(available, breakdown.total)?;

    let place = place_instructions(program, wallet, request, breakdown.bet_amount).await?;
    let instructions = position_instructions(
        Vec::new(),
        None,
        dev_fee_transfer(request, wallet, breakdown.dev_fee)?,
        place,
    );

    let (recent_blockhash, _) = rpc
        .get_latest_blockhash_with_commitment(CommitmentConfig::confirmed())
        .await?;
    compose::recompile(wallet, &instructions, &[], recent_blockhash)
}

/// Route the payment through the aggregator, then splice the fee and
/// bet-placement instructions into the swap's own transaction.
async fn with_swap(
    rpc: &RpcClient,
    quotes: &QuoteClient,
    program: &dyn PositionProgram,
    wallet: &Pubkey,
    request: &PositionRequest,
    breakdown: PaymentBreakdown,
) -> Result<VersionedTransaction> {
    let (routes, mode) = pick_routes(quotes, request, breakdown.total).await?;

    let encoded = swap::swap_transaction(quotes, &routes, wallet, mode).await?;
    let prebuilt = swap::deserialize_transaction(&encoded)?;
    let tables = swap::resolve_lookup_tables(rpc, &prebuilt.message).await?;
    let swap_instructions = compose::decompile_instructions(&prebuilt.message, &tables)?;

    let fee_mint = swap::fee_collection_mint(mode, &routes[0])?;
    let fee_ata = get_associated_token_address(&SWAP_FEE_WALLET, &fee_mint);
    let create_fee_account = fees::create_account_instruction_if_missing(
        rpc,
        wallet,
        &fee_mint,
        &SWAP_FEE_WALLET,
        &fee_ata,
    )
    .await;

    let place = place_instructions(program, wallet, request, breakdown.bet_amount).await?;
    let instructions = position_instructions(
        swap_instructions,
        create_fee_account,
        dev_fee_transfer(request, wallet, breakdown.dev_fee)?,
        place,
    );

    // The swap was quoted against this blockhash; keep it.
    let recent_blockhash = *prebuilt.message.recent_blockhash();
    compose::recompile(wallet, &instructions, &tables, recent_blockhash)
}

/// Exact-out first; fall back to a padded exact-in quote when no exact-out
/// route exists. An unpriced input token cannot be sized, so it surfaces as
/// no-route.
async fn pick_routes(
    quotes: &QuoteClient,
    request: &PositionRequest,
    total: u64,
) -> Result<(Vec<Route>, SwapMode)> {
    let exact_out = quotes
        .exact_out_quote(total, &request.input_token_mint)
        .await?;
    if !exact_out.is_empty() {
        return Ok((exact_out, SwapMode::ExactOut));
    }

    let price = quotes.token_price(&request.input_token_mint).await?;
    if price <= 0.0 {
        return Err(Error::NoRouteFound {
            input_mint: request.input_token_mint,
        });
    }
    let input_quantity = padded_input_amount(total, price);
    let exact_in = quotes
        .exact_in_quote(input_quantity, &request.input_token_mint)
        .await?;
    if exact_in.is_empty() {
        return Err(Error::NoRouteFound {
            input_mint: request.input_token_mint,
        });
    }
    Ok((exact_in, SwapMode::ExactIn))
}
