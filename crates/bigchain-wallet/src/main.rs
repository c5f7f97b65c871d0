//! bigchain-wallet — a CLI for signing and submitting transactions directly
//! against a local ledger store. Operates in-process rather than over RPC:
//! the wallet opens the same sled store a node would, submits into
//! `backlog`, and reads balances/ownership straight out of `bigchain`.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use serde_json::json;

use bigchain_core::types::PubKey;
use bigchain_core::Payload;
use bigchain_crypto::KeyPair;
use bigchain_domain::{owned_assets, AssetLedger, CurrencyLedger};
use bigchain_query::Query;
use bigchain_store::StoreAdapter;

#[derive(Parser, Debug)]
#[command(name = "bigchain-wallet", version, about = "BigchainDB wallet")]
struct Args {
    /// Directory of the ledger store to operate against.
    #[arg(long, default_value = "~/.bigchain/data")]
    data_dir: PathBuf,

    /// Path to this wallet's keyfile (JSON).
    #[arg(long, default_value = "~/.bigchain/wallet.json")]
    keyfile: PathBuf,

    /// Base-58 public keys making up the federation, comma-separated.
    /// Defaults to this wallet's own key — a single-node federation.
    #[arg(long, value_delimiter = ',')]
    federation: Vec<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a new keypair and save it to the keyfile.
    Keygen,
    /// Print this wallet's balance, or another account's.
    Balance { account: Option<String> },
    /// Credit `to` with `amount`, signed by this wallet acting as the
    /// federation's bookkeeper node.
    Charge { to: String, amount: i64 },
    /// Move `amount` from this wallet to `to`.
    Transfer { to: String, amount: i64 },
    /// Mint a new asset named `asset` to `to`.
    CreateAsset { to: String, asset: String },
    /// Transfer `asset`'s current output from this wallet to `to`.
    TransferAsset { to: String, asset: String, txid: String, cid: u32 },
    /// Retire `asset` back to the federation.
    DestroyAsset { asset: String },
    /// List every asset this wallet (or `account`) currently owns.
    OwnedAssets { account: Option<String> },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,bigchain=debug".parse().unwrap()),
        )
        .init();

    let args = Args::parse();
    let keyfile = expand_tilde(&args.keyfile);

    if let Command::Keygen = args.command {
        return cmd_keygen(&keyfile);
    }

    let node = load_keypair(&keyfile)?;
    let data_dir = expand_tilde(&args.data_dir);
    let store = StoreAdapter::open(&data_dir).context("opening ledger store")?;

    let federation: Vec<PubKey> = if args.federation.is_empty() {
        vec![node.public_key().clone()]
    } else {
        args.federation
            .iter()
            .map(|s| PubKey::from_b58(s).map_err(|e| anyhow::anyhow!("invalid federation key {s}: {e}")))
            .collect::<Result<_, _>>()?
    };

    match args.command {
        Command::Keygen => unreachable!("handled above"),
        Command::Balance { account } => cmd_balance(&store, &node, &federation, account)?,
        Command::Charge { to, amount } => cmd_charge(&store, &node, &federation, &to, amount)?,
        Command::Transfer { to, amount } => cmd_transfer(&store, &node, &federation, &to, amount)?,
        Command::CreateAsset { to, asset } => cmd_create_asset(&store, &node, &federation, &to, &asset)?,
        Command::TransferAsset { to, asset, txid, cid } => {
            cmd_transfer_asset(&store, &node, &federation, &to, &asset, &txid, cid)?
        }
        Command::DestroyAsset { asset } => cmd_destroy_asset(&store, &node, &federation, &asset)?,
        Command::OwnedAssets { account } => cmd_owned_assets(&store, &node, account)?,
    }

    Ok(())
}

fn cmd_keygen(keyfile: &Path) -> anyhow::Result<()> {
    if keyfile.exists() {
        bail!("keyfile {} already exists; remove it first", keyfile.display());
    }
    if let Some(parent) = keyfile.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let kp = KeyPair::generate();
    let stored = WalletKeyfile {
        public: kp.public_key().to_b58(),
        private: bs58::encode(kp.secret_seed()).into_string(),
    };
    std::fs::write(keyfile, serde_json::to_string_pretty(&stored)?)
        .with_context(|| format!("writing keyfile to {}", keyfile.display()))?;
    println!("Generated new keypair.");
    println!("Public key: {}", stored.public);
    println!("Keyfile:    {}", keyfile.display());
    Ok(())
}

fn cmd_balance(
    store: &StoreAdapter,
    node: &KeyPair,
    federation: &[PubKey],
    account: Option<String>,
) -> anyhow::Result<()> {
    let owner = resolve_account(node, account)?;
    let ledger = CurrencyLedger::new(node, federation, store);
    let balance = ledger.balance(&owner)?;
    println!("{}: {}", owner.to_b58(), balance);
    Ok(())
}

fn cmd_charge(
    store: &StoreAdapter,
    node: &KeyPair,
    federation: &[PubKey],
    to: &str,
    amount: i64,
) -> anyhow::Result<()> {
    let recipient = PubKey::from_b58(to).map_err(|e| anyhow::anyhow!("invalid recipient: {e}"))?;
    let ledger = CurrencyLedger::new(node, federation, store);
    let mut payload = Payload::empty();
    payload.set("amount", json!(amount));
    let tx = ledger.charge_currency(&recipient, payload)?;
    println!("Submitted charge: {}", tx.id.to_hex());
    Ok(())
}

fn cmd_transfer(
    store: &StoreAdapter,
    node: &KeyPair,
    federation: &[PubKey],
    to: &str,
    amount: i64,
) -> anyhow::Result<()> {
    let recipient = PubKey::from_b58(to).map_err(|e| anyhow::anyhow!("invalid recipient: {e}"))?;
    let ledger = CurrencyLedger::new(node, federation, store);
    let mut payload = Payload::empty();
    payload.set("amount", json!(amount));
    let (sender_tx, receiver_tx) = ledger.transfer_currency(node.public_key(), node, &recipient, payload)?;
    println!("Sender leg:   {}", sender_tx.id.to_hex());
    println!("Receiver leg: {}", receiver_tx.id.to_hex());
    Ok(())
}

fn cmd_create_asset(
    store: &StoreAdapter,
    node: &KeyPair,
    federation: &[PubKey],
    to: &str,
    asset: &str,
) -> anyhow::Result<()> {
    let recipient = PubKey::from_b58(to).map_err(|e| anyhow::anyhow!("invalid recipient: {e}"))?;
    let ledger = AssetLedger::new(node, federation, store);
    let mut payload = Payload::empty();
    payload.set("asset", json!(asset));
    let tx = ledger.create_asset(&recipient, payload)?;
    println!("Submitted asset creation: {}", tx.id.to_hex());
    Ok(())
}

fn cmd_transfer_asset(
    store: &StoreAdapter,
    node: &KeyPair,
    federation: &[PubKey],
    to: &str,
    asset: &str,
    txid: &str,
    cid: u32,
) -> anyhow::Result<()> {
    let recipient = PubKey::from_b58(to).map_err(|e| anyhow::anyhow!("invalid recipient: {e}"))?;
    let input_txid = bigchain_core::TxId::from_hex(txid).context("parsing input txid")?;
    let ledger = AssetLedger::new(node, federation, store);
    let tx = ledger.transfer_asset(
        node.public_key(),
        node,
        &recipient,
        bigchain_core::types::TxInput { txid: input_txid, cid },
    )?;
    println!("Submitted transfer of {asset}: {}", tx.id.to_hex());
    Ok(())
}

fn cmd_destroy_asset(
    store: &StoreAdapter,
    node: &KeyPair,
    federation: &[PubKey],
    asset: &str,
) -> anyhow::Result<()> {
    let ledger = AssetLedger::new(node, federation, store);
    let tx = ledger.destroy_asset(node.public_key(), node, asset)?;
    println!("Submitted destruction of {asset}: {}", tx.id.to_hex());
    Ok(())
}

fn cmd_owned_assets(store: &StoreAdapter, node: &KeyPair, account: Option<String>) -> anyhow::Result<()> {
    let owner = resolve_account(node, account)?;
    let query = Query::new(store);
    let assets = owned_assets(&query, &owner)?;
    if assets.is_empty() {
        println!("{} owns no assets", owner.to_b58());
    } else {
        for asset in assets {
            println!("{asset}");
        }
    }
    Ok(())
}

fn resolve_account(node: &KeyPair, account: Option<String>) -> anyhow::Result<PubKey> {
    match account {
        Some(s) => PubKey::from_b58(&s).map_err(|e| anyhow::anyhow!("invalid account: {e}")),
        None => Ok(node.public_key().clone()),
    }
}

#[derive(Serialize, Deserialize)]
struct WalletKeyfile {
    public: String,
    private: String,
}

fn load_keypair(keyfile: &Path) -> anyhow::Result<KeyPair> {
    let json = std::fs::read_to_string(keyfile)
        .with_context(|| format!("reading keyfile {}", keyfile.display()))?;
    let stored: WalletKeyfile =
        serde_json::from_str(&json).context("parsing keyfile — run `keygen` first?")?;
    let seed_bytes = bs58::decode(&stored.private)
        .into_vec()
        .context("decoding private key")?;
    let seed: [u8; 32] = seed_bytes
        .try_into()
        .map_err(|_| anyhow::anyhow!("private key is not 32 bytes"))?;
    Ok(KeyPair::from_raw(seed))
}

fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Ok(home) = std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE")) {
            return PathBuf::from(home).join(stripped);
        }
    }
    path.to_path_buf()
}
