use anyhow::{anyhow, Context, Result};
use pariswap::quote::QuoteClient;
use pariswap::USDC_MINT;
use solana_sdk::pubkey::Pubkey;
use std::env;
use std::str::FromStr;

const DEFAULT_USD: &str = "1";

struct Config {
    mint: String,
    usd: f64,
    quote_api: Option<String>,
    skip_token_list: bool,
}

fn parse_args() -> Result<Config> {
    let mut cfg = Config {
        mint: String::new(),
        usd: DEFAULT_USD.parse().unwrap(),
        quote_api: None,
        skip_token_list: false,
    };

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--mint" => {
                cfg.mint = args.next().ok_or_else(|| anyhow!("missing --mint"))?;
            }
            "--usd" => {
                let raw = args.next().ok_or_else(|| anyhow!("missing --usd"))?;
                cfg.usd = raw.parse::<f64>().map_err(|_| anyhow!("bad --usd"))?;
            }
            "--quote-api" => {
                cfg.quote_api = Some(args.next().ok_or_else(|| anyhow!("missing --quote-api"))?);
            }
            "--skip-token-list" => {
                cfg.skip_token_list = true;
            }
            "--help" => {
                print_usage();
                std::process::exit(0);
            }
            other => {
                return Err(anyhow!("unknown argument: {other}"));
            }
        }
    }

    if cfg.mint.is_empty() {
        return Err(anyhow!("missing --mint <input token mint>"));
    }
    Ok(cfg)
}

fn print_usage() {
    println!(
        "quote_check --mint <pubkey> [--usd <amount>] [--quote-api <url>] [--skip-token-list]"
    );
    println!("Prices a mint against USDC and prints the exact-out/exact-in route summary.");
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cfg = parse_args()?;
    let mint = Pubkey::from_str(&cfg.mint).context("parse --mint")?;

    let client = match cfg.quote_api {
        Some(base) => QuoteClient::with_base_urls(
            base,
            pariswap::quote::DEFAULT_PRICE_API.to_string(),
            pariswap::quote::DEFAULT_TOKEN_LIST_URL.to_string(),
        ),
        None => QuoteClient::new(),
    };

    if !cfg.skip_token_list {
        let tokens = client
            .swappable_token_list()
            .await
            .context("fetch swappable token list")?;
        println!("🪙 Tokens with a route to USDC: {}", tokens.len());
        if !tokens.iter().any(|t| t.address == cfg.mint) && mint != USDC_MINT {
            eprintln!("⚠️  {} is not on the swappable list", cfg.mint);
        }
    }

    let price = client.token_price(&mint).await.context("fetch price")?;
    if price > 0.0 {
        println!("💵 Price: {price} USDC");
    } else {
        println!("💵 Price feed has no entry for this mint");
    }

    let amount = (cfg.usd * 1_000_000.0).round() as u64;
    let exact_out = client
        .exact_out_quote(amount, &mint)
        .await
        .context("exact-out quote")?;

    if exact_out.is_empty() {
        println!("🔁 No exact-out route for {} units, trying exact-in", amount);
        if price <= 0.0 {
            return Err(anyhow!("unpriced token, cannot size an exact-in quote"));
        }
        let input = ((amount as f64 / price) * 1.05).ceil() as u64;
        let exact_in = client
            .exact_in_quote(input, &mint)
            .await
            .context("exact-in quote")?;
        println!("📈 Exact-in routes for {input} input units: {}", exact_in.len());
        for (i, route) in exact_in.iter().take(3).enumerate() {
            println!(
                "  #{i}: in={:?} out={:?}",
                route.in_amount(),
                route.out_amount()
            );
        }
    } else {
        println!("📈 Exact-out routes: {}", exact_out.len());
        for (i, route) in exact_out.iter().take(3).enumerate() {
            println!(
                "  #{i}: in={:?} out={:?} pay-with={:?}",
                route.in_amount(),
                route.out_amount(),
                route.first_hop_input_mint().map(|m| m.to_string()).ok()
            );
        }
    }

    Ok(())
}
