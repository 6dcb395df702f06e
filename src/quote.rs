use std::collections::{HashMap, HashSet};
use std::str::FromStr;

use reqwest::{header::ACCEPT, Client};
use serde::Deserialize;
use serde_json::Value;
use solana_sdk::pubkey::Pubkey;

use crate::error::{Error, Result};
use crate::{SWAP_FEE_BPS, USDC_MINT};

pub const DEFAULT_QUOTE_API: &str = "https://quote-api.jup.ag/v4";
pub const DEFAULT_PRICE_API: &str = "https://price.jup.ag/v4";
pub const DEFAULT_TOKEN_LIST_URL: &str = "https://token.jup.ag/strict";

/// Slippage tolerance sent with every quote request.
pub const QUOTE_SLIPPAGE_BPS: u16 = 50;

/// Quote sizing mode: `ExactIn` fixes the input amount, `ExactOut` fixes the
/// amount of settlement token the swap must produce.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SwapMode {
    ExactIn,
    ExactOut,
}

impl SwapMode {
    pub fn as_str(self) -> &'static str {
        match self {
            SwapMode::ExactIn => "ExactIn",
            SwapMode::ExactOut => "ExactOut",
        }
    }
}

/// One swap path returned by the quote endpoint. Kept as opaque JSON because the
/// chosen route is posted back to the swap-build endpoint verbatim; typed
/// accessors cover only the fields this crate actually reads.
#[derive(Clone, Debug, Deserialize)]
pub struct Route(pub(crate) Value);

impl Route {
    pub fn as_json(&self) -> &Value {
        &self.0
    }

    pub fn in_amount(&self) -> Option<u64> {
        amount_field(&self.0, "inAmount")
    }

    pub fn out_amount(&self) -> Option<u64> {
        amount_field(&self.0, "outAmount")
    }

    /// Input mint of the first market hop. This is the token the user actually
    /// pays with, which can differ from the nominal input mint (native-asset
    /// wrapping); the exact-out fee account is derived against it.
    pub fn first_hop_input_mint(&self) -> Result<Pubkey> {
        let mint = self
            .0
            .get("marketInfos")
            .and_then(|m| m.as_array())
            .and_then(|m| m.first())
            .and_then(|hop| hop.get("inputMint"))
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::Decode("route has no marketInfos[0].inputMint".to_string()))?;
        Pubkey::from_str(mint)
            .map_err(|e| Error::Decode(format!("bad inputMint {mint} in route: {e}")))
    }
}

fn amount_field(value: &Value, key: &str) -> Option<u64> {
    match value.get(key)? {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.as_u64(),
        _ => None,
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenData {
    pub address: String,
    #[serde(default)]
    pub chain_id: Option<i64>,
    pub decimals: u8,
    pub name: String,
    pub symbol: String,
    #[serde(default, rename = "logoURI")]
    pub logo_uri: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub extensions: Option<TokenExtensions>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenExtensions {
    #[serde(default)]
    pub coingecko_id: Option<String>,
}

/// The remote route map is keyed by token index, not address.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IndexedRouteMap {
    mint_keys: Vec<String>,
    indexed_route_map: HashMap<String, Vec<usize>>,
}

/// Read-only client for the aggregator's token list, price, and quote endpoints.
#[derive(Clone)]
pub struct QuoteClient {
    http: Client,
    quote_api: String,
    price_api: String,
    token_list_url: String,
}

impl Default for QuoteClient {
    fn default() -> Self {
        Self::new()
    }
}

impl QuoteClient {
    pub fn new() -> Self {
        Self::with_base_urls(
            DEFAULT_QUOTE_API.to_string(),
            DEFAULT_PRICE_API.to_string(),
            DEFAULT_TOKEN_LIST_URL.to_string(),
        )
    }

    pub fn with_base_urls(quote_api: String, price_api: String, token_list_url: String) -> Self {
        Self {
            http: Client::new(),
            quote_api,
            price_api,
            token_list_url,
        }
    }

    pub(crate) fn http(&self) -> &Client {
        &self.http
    }

    pub(crate) fn quote_api(&self) -> &str {
        &self.quote_api
    }

    /// Price of one token in settlement-token units. Returns 0.0 when the feed
    /// has no entry for the mint; callers must treat 0 as "unpriced", not as a
    /// valid quote.
    pub async fn token_price(&self, mint: &Pubkey) -> Result<f64> {
        self.price_by_id(&mint.to_string()).await
    }

    /// USD value of a human-unit token amount. `id` is a mint address or a
    /// symbol the price feed recognizes.
    pub async fn token_value_in_usd(&self, id: &str, ui_amount: f64) -> Result<f64> {
        let price = self.price_by_id(id).await?;
        Ok(price * ui_amount)
    }

    async fn price_by_id(&self, id: &str) -> Result<f64> {
        let url = format!("{}/price", self.price_api);
        let body = self
            .http
            .get(&url)
            .header(ACCEPT, "application/json")
            .query(&[("ids", id)])
            .send()
            .await?
            .error_for_status()?
            .json::<Value>()
            .await?;

        let price = body
            .get("data")
            .and_then(|d| d.get(id))
            .and_then(|e| e.get("price"))
            .and_then(|p| p.as_f64())
            .unwrap_or(0.0);
        Ok(price)
    }

    /// Quote sized to produce exactly `amount` of the settlement token. An empty
    /// list means no direct route exists.
    pub async fn exact_out_quote(&self, amount: u64, input_mint: &Pubkey) -> Result<Vec<Route>> {
        self.quote(amount, input_mint, SwapMode::ExactOut).await
    }

    /// Quote consuming exactly `amount` of the input token; used as the fallback
    /// when exact-out has no route.
    pub async fn exact_in_quote(&self, amount: u64, input_mint: &Pubkey) -> Result<Vec<Route>> {
        self.quote(amount, input_mint, SwapMode::ExactIn).await
    }

    async fn quote(&self, amount: u64, input_mint: &Pubkey, mode: SwapMode) -> Result<Vec<Route>> {
        let url = format!("{}/quote", self.quote_api);
        let body = self
            .http
            .get(&url)
            .header(ACCEPT, "application/json")
            .query(&[
                ("inputMint", input_mint.to_string().as_str()),
                ("outputMint", USDC_MINT.to_string().as_str()),
                ("amount", amount.to_string().as_str()),
                ("slippageBps", QUOTE_SLIPPAGE_BPS.to_string().as_str()),
                ("feeBps", SWAP_FEE_BPS.to_string().as_str()),
                ("swapMode", mode.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json::<Value>()
            .await?;

        let routes = body
            .get("data")
            .and_then(|d| d.as_array())
            .map(|arr| arr.iter().cloned().map(Route).collect())
            .unwrap_or_default();
        Ok(routes)
    }

    /// Full token list filtered to tokens with at least one route to the
    /// settlement token.
    pub async fn swappable_token_list(&self) -> Result<Vec<TokenData>> {
        let token_list = self
            .http
            .get(&self.token_list_url)
            .header(ACCEPT, "application/json")
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<TokenData>>()
            .await?;

        let url = format!("{}/indexed-route-map", self.quote_api);
        let route_map = self
            .http
            .get(&url)
            .header(ACCEPT, "application/json")
            .send()
            .await?
            .error_for_status()?
            .json::<IndexedRouteMap>()
            .await?;

        Ok(filter_swappable(token_list, &route_map))
    }
}

/// Index→address translation pass over the remote route map, then filter the
/// token list to mints reachable from the settlement token.
fn filter_swappable(token_list: Vec<TokenData>, route_map: &IndexedRouteMap) -> Vec<TokenData> {
    let usdc = USDC_MINT.to_string();
    let usdc_index = match route_map.mint_keys.iter().position(|k| *k == usdc) {
        Some(i) => i,
        None => return Vec::new(),
    };

    let reachable: HashSet<&str> = route_map
        .indexed_route_map
        .get(&usdc_index.to_string())
        .map(|indexes| {
            indexes
                .iter()
                .filter_map(|i| route_map.mint_keys.get(*i))
                .map(String::as_str)
                .collect()
        })
        .unwrap_or_default();

    token_list
        .into_iter()
        .filter(|token| reachable.contains(token.address.as_str()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_route() -> Route {
        Route(json!({
            "inAmount": "52500",
            "outAmount": "1000000",
            "otherAmountThreshold": "1005000",
            "swapMode": "ExactOut",
            "marketInfos": [
                {
                    "id": "alpha",
                    "inputMint": "So11111111111111111111111111111111111111112",
                    "outputMint": "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v"
                }
            ]
        }))
    }

    #[test]
    fn route_accessors_read_string_amounts() {
        let route = sample_route();
        assert_eq!(route.in_amount(), Some(52_500));
        assert_eq!(route.out_amount(), Some(1_000_000));
    }

    #[test]
    fn route_first_hop_input_mint() {
        let route = sample_route();
        assert_eq!(
            route.first_hop_input_mint().unwrap().to_string(),
            "So11111111111111111111111111111111111111112"
        );
    }

    #[test]
    fn route_without_hops_is_a_decode_error() {
        let route = Route(json!({ "outAmount": "1" }));
        assert!(route.first_hop_input_mint().is_err());
    }

    fn token(address: &str, symbol: &str) -> TokenData {
        TokenData {
            address: address.to_string(),
            chain_id: Some(101),
            decimals: 6,
            name: symbol.to_string(),
            symbol: symbol.to_string(),
            logo_uri: None,
            tags: Vec::new(),
            extensions: None,
        }
    }

    #[test]
    fn route_map_filter_translates_indexes_before_filtering() {
        let map: IndexedRouteMap = serde_json::from_value(json!({
            "mintKeys": [
                "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v",
                "So11111111111111111111111111111111111111112",
                "MangoCzJ36AjZyKwVj3VnYU4GTonjfVEnJmvvWaxLac"
            ],
            // USDC (index 0) routes to SOL (index 1) only.
            "indexedRouteMap": { "0": [1], "1": [0] }
        }))
        .unwrap();

        let tokens = vec![
            token("So11111111111111111111111111111111111111112", "SOL"),
            token("MangoCzJ36AjZyKwVj3VnYU4GTonjfVEnJmvvWaxLac", "MNGO"),
        ];
        let filtered = filter_swappable(tokens, &map);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].symbol, "SOL");
    }

    #[test]
    fn route_map_without_settlement_token_filters_everything() {
        let map: IndexedRouteMap = serde_json::from_value(json!({
            "mintKeys": ["So11111111111111111111111111111111111111112"],
            "indexedRouteMap": { "0": [] }
        }))
        .unwrap();
        let tokens = vec![token("So11111111111111111111111111111111111111112", "SOL")];
        assert!(filter_swappable(tokens, &map).is_empty());
    }

    #[test]
    fn token_list_entry_parses_remote_shape() {
        let parsed: TokenData = serde_json::from_value(json!({
            "address": "So11111111111111111111111111111111111111112",
            "chainId": 101,
            "decimals": 9,
            "name": "Wrapped SOL",
            "symbol": "SOL",
            "logoURI": "https://example.com/sol.png",
            "tags": ["old-registry"],
            "extensions": { "coingeckoId": "solana" }
        }))
        .unwrap();
        assert_eq!(parsed.decimals, 9);
        assert_eq!(parsed.logo_uri.as_deref(), Some("https://example.com/sol.png"));
        assert_eq!(
            parsed.extensions.and_then(|e| e.coingecko_id).as_deref(),
            Some("solana")
        );
    }
}
