//! bigchain-node — a one-shot CLI over the ledger core.
//!
//! This binary does not run a voter loop itself; an external supervisor is
//! expected to invoke `propose`/`vote` repeatedly (e.g. on a timer). Each
//! invocation opens the store, does one unit of work, and exits.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use bigchain_consensus::{cast_vote, create_block, election_status, write_vote, ElectionStatus, Federation};
use bigchain_crypto::{KeyPair, LedgerConfig};
use bigchain_query::Query;
use bigchain_store::{Durability, StoreAdapter};
use bigchain_tx::validate_transaction;

#[derive(Parser, Debug)]
#[command(name = "bigchain-node", version, about = "BigchainDB federation node")]
struct Args {
    /// Directory for the persistent ledger store.
    #[arg(long, default_value = "~/.bigchain/data")]
    data_dir: PathBuf,

    /// Path to a TOML config file (keypair, keyring, database section).
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply the genesis block if the store is fresh.
    Genesis,
    /// Build and store a block from every backlog transaction assigned to
    /// this node, after validating each against the current store.
    Propose,
    /// Cast and write this node's vote on a stored block.
    Vote {
        block_id: String,
        #[arg(long, default_value_t = true)]
        valid: bool,
    },
    /// Print basic store statistics.
    Status,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,bigchain=debug".parse().unwrap()),
        )
        .init();

    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;
    let node = config.resolve_keypair().context("resolving node keypair")?;
    let federation = config.federation();

    let data_dir = expand_tilde(&args.data_dir);
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("creating data dir {}", data_dir.display()))?;
    let store = StoreAdapter::open(&data_dir).context("opening ledger store")?;

    match args.command {
        Command::Genesis => run_genesis(&store, &node)?,
        Command::Propose => run_propose(&store, &node, &federation)?,
        Command::Vote { block_id, valid } => run_vote(&store, &node, &block_id, valid)?,
        Command::Status => run_status(&store)?,
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> anyhow::Result<LedgerConfig> {
    match path {
        Some(p) => {
            let text = std::fs::read_to_string(p)
                .with_context(|| format!("reading config from {}", p.display()))?;
            LedgerConfig::from_toml(&text)
                .map_err(|e| anyhow::anyhow!(e))
                .context("parsing config TOML")
        }
        None => {
            warn!("no --config given; resolving keypair from BIGCHAIN_PUBLIC_KEY/BIGCHAIN_PRIVATE_KEY only");
            Ok(LedgerConfig::default())
        }
    }
}

fn run_genesis(store: &StoreAdapter, node: &KeyPair) -> anyhow::Result<()> {
    let block = bigchain_genesis::apply_genesis(store, node).context("applying genesis")?;
    info!(block_id = %block.id, "genesis applied");
    Ok(())
}

fn run_propose(
    store: &StoreAdapter,
    node: &KeyPair,
    federation_keys: &[bigchain_core::types::PubKey],
) -> anyhow::Result<()> {
    let assigned = store
        .backlog_for_assignee(node.public_key())
        .context("reading backlog")?;
    if assigned.is_empty() {
        info!("no backlog transactions assigned to this node");
        return Ok(());
    }

    let query = Query::new(store);
    let mut txs = Vec::with_capacity(assigned.len());
    for backlog_tx in &assigned {
        let tx = backlog_tx.as_transaction();
        if let Err(e) = validate_transaction(&tx, &query) {
            warn!(txid = %tx.id, error = %e, "dropping invalid backlog transaction");
            continue;
        }
        txs.push(tx);
    }
    if txs.is_empty() {
        info!("every assigned backlog transaction failed validation");
        return Ok(());
    }

    let federation = Federation::new(federation_keys.to_vec());
    let block = create_block(txs, node, &federation).context("creating block")?;
    store.put_block(&block, Durability::Hard).context("writing block")?;
    for backlog_tx in &assigned {
        let _ = store.remove_backlog_transaction(backlog_tx);
    }
    info!(block_id = %block.id, "block proposed");
    Ok(())
}

fn run_vote(store: &StoreAdapter, node: &KeyPair, block_id: &str, valid: bool) -> anyhow::Result<()> {
    let id = bigchain_core::BlockId::from_hex(block_id).context("parsing block id")?;
    let block = store
        .get_block(&id)?
        .ok_or_else(|| anyhow::anyhow!("block {block_id} not found"))?;
    let vote = cast_vote(&block, block.id.clone(), valid, None, node).context("casting vote")?;
    write_vote(store, &block.id, vote, Durability::Hard).context("writing vote")?;
    info!(block_id = %block.id, status = ?election_status(&store.get_block(&id)?.expect("just voted")), "vote recorded");
    Ok(())
}

fn run_status(store: &StoreAdapter) -> anyhow::Result<()> {
    let blocks = store.iter_blocks()?;
    let valid = blocks.iter().filter(|b| election_status(b) == ElectionStatus::Valid).count();
    let undecided = blocks.iter().filter(|b| election_status(b) == ElectionStatus::Undecided).count();
    let invalid = blocks.iter().filter(|b| election_status(b) == ElectionStatus::Invalid).count();
    println!(
        "blocks: {} (valid={valid}, undecided={undecided}, invalid={invalid}), backlog: {}",
        blocks.len(),
        store.iter_backlog()?.len()
    );
    Ok(())
}

/// Expand a leading `~` to the user's home directory (`HOME` or
/// `USERPROFILE`).
fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Ok(home) = std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE")) {
            return PathBuf::from(home).join(stripped);
        }
    }
    path.to_path_buf()
}
