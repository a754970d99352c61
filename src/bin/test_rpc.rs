use reqwest::Client;
use serde_json::{json, Value};

const RPC_URL: &str = "https://api.mainnet-beta.solana.com";
const TOKEN_PROGRAM: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";

// USDC mint authority, a wallet that always holds something
const OWNER: &str = "2wmVCSfPxGPjrnMMn7rchp4uaeoTqN39mXFC2zhPdri9";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let client = Client::new();
    println!("Probing Solana RPC at {}...", RPC_URL);

    // native balance
    let balance: Value = client
        .post(RPC_URL)
        .json(&json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "getBalance",
            "params": [OWNER]
        }))
        .send()
        .await?
        .json()
        .await?;

    let lamports = balance["result"]["value"].as_u64().unwrap_or(0);
    println!("Lamports: {} ({} SOL)", lamports, lamports as f64 / 1e9);

    // token accounts under the legacy program
    let accounts: Value = client
        .post(RPC_URL)
        .json(&json!({
            "jsonrpc": "2.0",
            "id": 2,
            "method": "getTokenAccountsByOwner",
            "params": [
                OWNER,
                { "programId": TOKEN_PROGRAM },
                { "encoding": "jsonParsed" }
            ]
        }))
        .send()
        .await?
        .json()
        .await?;

    let list = accounts["result"]["value"].as_array().cloned().unwrap_or_default();
    println!("Fetched {} token accounts", list.len());

    for account in list.iter().take(5) {
        let info = &account["account"]["data"]["parsed"]["info"];
        println!(
            "Mint: {} | Amount: {} | Decimals: {}",
            info["mint"].as_str().unwrap_or("?"),
            info["tokenAmount"]["uiAmount"],
            info["tokenAmount"]["decimals"]
        );
    }

    Ok(())
}
