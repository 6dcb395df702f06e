use std::str::FromStr;

use serde_json::Value;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_request::TokenAccountsFilter;
use solana_sdk::pubkey::Pubkey;

use crate::error::{Error, Result};

/// A token account owned by the user, as listed for the payment picker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserToken {
    pub address: Pubkey,
    pub mint: Pubkey,
    pub amount: u64,
}

/// Balance of one token account in smallest units.
pub async fn token_account_balance(rpc: &RpcClient, account: &Pubkey) -> Result<u64> {
    let balance = rpc.get_token_account_balance(account).await?;
    balance
        .amount
        .parse()
        .map_err(|_| Error::Decode(format!("bad token amount {}", balance.amount)))
}

/// All SPL token accounts the owner holds, via the parsed
/// token-accounts-by-owner lookup.
pub async fn user_token_accounts(rpc: &RpcClient, owner: &Pubkey) -> Result<Vec<UserToken>> {
    let accounts = rpc
        .get_token_accounts_by_owner(owner, TokenAccountsFilter::ProgramId(spl_token::id()))
        .await?;

    let mut out = Vec::with_capacity(accounts.len());
    for acc in accounts {
        let data = serde_json::to_value(&acc.account.data)?;
        if let Some(token) = user_token_from_parsed(&acc.pubkey, &data)? {
            out.push(token);
        }
    }
    Ok(out)
}

fn user_token_from_parsed(pubkey: &str, data: &Value) -> Result<Option<UserToken>> {
    let info = match data.get("parsed").and_then(|p| p.get("info")) {
        Some(info) => info,
        None => return Ok(None),
    };
    let mint = info
        .get("mint")
        .and_then(|v| v.as_str())
        .ok_or_else(|| Error::Decode("token account missing mint".to_string()))?;
    let amount = info
        .get("tokenAmount")
        .and_then(|v| v.get("amount"))
        .and_then(|v| v.as_str())
        .unwrap_or("0")
        .parse()
        .unwrap_or(0);

    let address = Pubkey::from_str(pubkey)
        .map_err(|_| Error::Decode(format!("bad token account pubkey {pubkey}")))?;
    let mint = Pubkey::from_str(mint)
        .map_err(|_| Error::Decode(format!("bad mint pubkey {mint}")))?;
    Ok(Some(UserToken {
        address,
        mint,
        amount,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_a_parsed_token_account() {
        let address = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        let data = json!({
            "program": "spl-token",
            "parsed": {
                "type": "account",
                "info": {
                    "mint": mint.to_string(),
                    "owner": Pubkey::new_unique().to_string(),
                    "tokenAmount": {
                        "amount": "123456",
                        "decimals": 6,
                        "uiAmount": 0.123456
                    }
                }
            }
        });

        let token = user_token_from_parsed(&address.to_string(), &data)
            .unwrap()
            .unwrap();
        assert_eq!(token, UserToken { address, mint, amount: 123_456 });
    }

    #[test]
    fn skips_accounts_without_parsed_data() {
        let data = json!(["AAECAw==", "base64"]);
        let parsed = user_token_from_parsed(&Pubkey::new_unique().to_string(), &data).unwrap();
        assert!(parsed.is_none());
    }
}
