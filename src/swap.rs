use base64::{engine::general_purpose::STANDARD as BASE64_ENGINE, Engine as _};
use futures::future::try_join_all;
use reqwest::header::ACCEPT;
use serde_json::{json, Value};
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::address_lookup_table::state::AddressLookupTable;
use solana_sdk::address_lookup_table::AddressLookupTableAccount;
use solana_sdk::message::VersionedMessage;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::transaction::VersionedTransaction;
use spl_associated_token_account::get_associated_token_address;

use crate::error::{Error, Result};
use crate::quote::{QuoteClient, Route, SwapMode};
use crate::{SWAP_FEE_WALLET, USDC_MINT};

/// Mint the platform fee-collection account is derived against. Exact-in swaps
/// collect the fee in the settlement token; exact-out swaps collect it in the
/// token the user actually pays with (the first hop's input mint).
pub fn fee_collection_mint(mode: SwapMode, route: &Route) -> Result<Pubkey> {
    match mode {
        SwapMode::ExactIn => Ok(USDC_MINT),
        SwapMode::ExactOut => route.first_hop_input_mint(),
    }
}

/// Auto wrap/unwrap flag sent to the swap-build endpoint. Observed upstream
/// behavior sets it only for exact-out; preserved literally.
pub fn wrap_unwrap_sol(mode: SwapMode) -> bool {
    mode == SwapMode::ExactOut
}

pub(crate) fn swap_request_body(
    route: &Route,
    wallet: &Pubkey,
    mode: SwapMode,
    fee_account: &Pubkey,
) -> Value {
    json!({
        "route": route.as_json(),
        "userPublicKey": wallet.to_string(),
        "wrapUnwrapSOL": wrap_unwrap_sol(mode),
        "feeAccount": fee_account.to_string(),
    })
}

/// Request a prebuilt, serialized swap transaction for the best route. Routes
/// are pre-ranked by the quote endpoint; the first one is executed.
pub async fn swap_transaction(
    client: &QuoteClient,
    routes: &[Route],
    wallet: &Pubkey,
    mode: SwapMode,
) -> Result<String> {
    let route = routes
        .first()
        .ok_or_else(|| Error::Decode("swap requested with an empty route list".to_string()))?;
    let fee_mint = fee_collection_mint(mode, route)?;
    let fee_account = get_associated_token_address(&SWAP_FEE_WALLET, &fee_mint);

    let url = format!("{}/swap", client.quote_api());
    let response = client
        .http()
        .post(&url)
        .header(ACCEPT, "application/json")
        .json(&swap_request_body(route, wallet, mode, &fee_account))
        .send()
        .await?
        .error_for_status()?
        .json::<Value>()
        .await?;

    response
        .get("swapTransaction")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| Error::Decode(format!("swap-build response has no transaction: {response}")))
}

pub fn deserialize_transaction(encoded: &str) -> Result<VersionedTransaction> {
    let bytes = BASE64_ENGINE.decode(encoded)?;
    Ok(bincode::deserialize(&bytes)?)
}

/// Fetch the current state of every lookup table the message references. The
/// table addresses are independent, so all fetches are issued together and
/// merged by position once they complete.
pub async fn resolve_lookup_tables(
    rpc: &RpcClient,
    message: &VersionedMessage,
) -> Result<Vec<AddressLookupTableAccount>> {
    let lookups = match message {
        VersionedMessage::V0(m) => m.address_table_lookups.as_slice(),
        VersionedMessage::Legacy(_) => &[],
    };

    try_join_all(lookups.iter().map(|lookup| async move {
        let account = rpc.get_account(&lookup.account_key).await?;
        let table = AddressLookupTable::deserialize(&account.data).map_err(|e| {
            Error::Decode(format!(
                "deserialize lookup table {}: {e}",
                lookup.account_key
            ))
        })?;
        Ok::<_, Error>(AddressLookupTableAccount {
            key: lookup.account_key,
            addresses: table.addresses.to_vec(),
        })
    }))
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::hash::Hash;
    use solana_sdk::instruction::{AccountMeta, Instruction};
    use solana_sdk::message::v0;
    use solana_sdk::signature::Signature;

    fn exact_out_route() -> Route {
        Route(json!({
            "outAmount": "1000000",
            "marketInfos": [{
                "inputMint": "So11111111111111111111111111111111111111112",
                "outputMint": USDC_MINT.to_string(),
            }]
        }))
    }

    #[test]
    fn wrap_flag_follows_observed_quirk() {
        // Upstream only auto-wraps on exact-out; exact-in sends false.
        assert!(wrap_unwrap_sol(SwapMode::ExactOut));
        assert!(!wrap_unwrap_sol(SwapMode::ExactIn));
    }

    #[test]
    fn fee_mint_is_settlement_token_for_exact_in() {
        let route = exact_out_route();
        assert_eq!(
            fee_collection_mint(SwapMode::ExactIn, &route).unwrap(),
            USDC_MINT
        );
    }

    #[test]
    fn fee_mint_is_first_hop_input_for_exact_out() {
        let route = exact_out_route();
        assert_eq!(
            fee_collection_mint(SwapMode::ExactOut, &route).unwrap().to_string(),
            "So11111111111111111111111111111111111111112"
        );
    }

    #[test]
    fn request_body_round_trips_the_route_verbatim() {
        let route = exact_out_route();
        let wallet = Pubkey::new_unique();
        let fee_account = Pubkey::new_unique();
        let body = swap_request_body(&route, &wallet, SwapMode::ExactOut, &fee_account);

        assert_eq!(body.get("route"), Some(route.as_json()));
        assert_eq!(
            body.get("userPublicKey").and_then(|v| v.as_str()),
            Some(wallet.to_string().as_str())
        );
        assert_eq!(body.get("wrapUnwrapSOL"), Some(&json!(true)));
        assert_eq!(
            body.get("feeAccount").and_then(|v| v.as_str()),
            Some(fee_account.to_string().as_str())
        );
    }

    #[test]
    fn deserialize_rejects_bad_base64() {
        assert!(matches!(
            deserialize_transaction("not base64!!!"),
            Err(Error::Decode(_))
        ));
    }

    #[test]
    fn deserialize_reads_a_serialized_v0_transaction() {
        let payer = Pubkey::new_unique();
        let program = Pubkey::new_unique();
        let instructions = vec![Instruction {
            program_id: program,
            accounts: vec![AccountMeta::new(payer, true)],
            data: vec![42],
        }];
        let message =
            v0::Message::try_compile(&payer, &instructions, &[], Hash::default()).unwrap();
        let tx = VersionedTransaction {
            signatures: vec![Signature::default()],
            message: VersionedMessage::V0(message),
        };

        let encoded = BASE64_ENGINE.encode(bincode::serialize(&tx).unwrap());
        let decoded = deserialize_transaction(&encoded).unwrap();
        assert_eq!(decoded, tx);
    }
}
