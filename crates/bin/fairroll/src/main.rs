use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use fairroll::{encrypt_guess, ExchangeParams, FairRoll, Guess};
use fairroll_decrypt::{DecryptConfig, DecryptedView, Decryptor, LocalRelay, LocalWallet, WalletSigner};
use fairroll_fhe::{Address, SoftwareRuntime};
use tokio::sync::Mutex;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "fairroll")]
#[command(about = "encrypted dice rolls on a local fhe devnet", long_about = None)]
struct Args {
    /// points minted per whole native unit
    #[arg(long, global = true, default_value_t = ExchangeParams::default().points_per_eth)]
    points_per_eth: u64,

    /// points credited for a correct guess
    #[arg(long, global = true, default_value_t = ExchangeParams::default().reward_points)]
    reward_points: u64,

    /// label the contract address is derived from
    #[arg(long, global = true, default_value = "fairroll")]
    contract: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// print the exchange rate and reward size
    Rates,

    /// print the contract address and the player address for a key
    Address {
        /// 32-byte secp256k1 key as hex, random when omitted
        #[arg(long, env = "FAIRROLL_KEY")]
        key: Option<String>,
    },

    /// deposit, play rounds and decrypt the result
    Run {
        /// whole native units to deposit before playing
        #[arg(long, default_value_t = 1)]
        deposit: u64,

        /// big (4-6) or small (1-3)
        #[arg(long, default_value = "big")]
        guess: Guess,

        /// rounds to play
        #[arg(long, default_value_t = 1)]
        rounds: u32,

        /// seed for the encrypted dice, entropy when omitted
        #[arg(long)]
        seed: Option<u64>,

        /// 32-byte secp256k1 key as hex, random when omitted
        #[arg(long, env = "FAIRROLL_KEY")]
        key: Option<String>,
    },
}

fn wallet(key: Option<&str>) -> Result<LocalWallet> {
    let Some(key) = key else {
        return Ok(LocalWallet::random());
    };
    let bytes = hex::decode(key.strip_prefix("0x").unwrap_or(key)).context("key is not hex")?;
    let Ok(secret) = <[u8; 32]>::try_from(bytes.as_slice()) else {
        bail!("key must be 32 bytes, got {}", bytes.len());
    };
    Ok(LocalWallet::from_bytes(&secret)?)
}

async fn run(
    contract: Address,
    params: ExchangeParams,
    wallet: LocalWallet,
    deposit: u64,
    guess: Guess,
    rounds: u32,
    seed: Option<u64>,
) -> Result<()> {
    let runtime = match seed {
        Some(seed) => SoftwareRuntime::with_seed(seed),
        None => SoftwareRuntime::new(),
    };
    let config = DecryptConfig::local();
    let relay = Arc::new(LocalRelay::new(runtime.clone(), &config));
    let mut engine = FairRoll::deploy(runtime, contract, params);

    let player = wallet.address();
    let decryptor = Decryptor::new(config, contract, wallet, relay);
    let view = Mutex::new(DecryptedView::new());
    info!(%player, "player ready");

    if deposit > 0 {
        engine.deposit_to_points(player, deposit)?;
        decryptor.refresh(&engine.snapshot(player), &view).await?;
        println!(
            "bought points with {deposit} unit(s): balance {}",
            view.lock().await.balance_text()
        );
    }

    for round in 1..=rounds {
        let input = encrypt_guess(engine.runtime(), contract, player, guess)?;
        engine.play_round(player, input.handles[0], &input.proof)?;
        decryptor.refresh(&engine.snapshot(player), &view).await?;

        let view = view.lock().await;
        println!("round {round}: {}", view.outcome_text());
        println!("         balance {}", view.balance_text());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();
    let params = ExchangeParams::new(args.points_per_eth, args.reward_points);
    let contract = Address::derive(args.contract.as_bytes());

    match args.command {
        Command::Rates => {
            println!("exchange rate: {} points per unit", params.points_per_eth);
            println!("reward size:   {} points", params.reward_points);
        }
        Command::Address { key } => {
            let wallet = wallet(key.as_deref())?;
            println!("contract: {contract}");
            println!("player:   {}", wallet.address());
        }
        Command::Run {
            deposit,
            guess,
            rounds,
            seed,
            key,
        } => {
            let wallet = wallet(key.as_deref())?;
            run(contract, params, wallet, deposit, guess, rounds, seed).await?;
        }
    }
    Ok(())
}
