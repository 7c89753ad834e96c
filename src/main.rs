// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::path::{Path, PathBuf};
use std::sync::Arc;

use alloy::primitives::Address;
use alloy::providers::Provider;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use secure_links::abi::{self, HardhatArtifact};
use secure_links::blockchain::client::create_wallet;
use secure_links::blockchain::deploy::{deploy_contract, record_deployment};
use secure_links::blockchain::signing::signer_from_pem;
use secure_links::blockchain::{
    connect_readonly, connect_with_wallet, network_by_chain_id, AddressBook, LedgerClientError,
    LocalWalletSigner, SecureLinksLedger, WalletSigner,
};
use secure_links::config::{self, Config};
use secure_links::environment::Environment;
use secure_links::signature::SignatureCache;
use secure_links::state::SecureLinksState;
use secure_links::storage::SignatureDatabase;

type CliResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "secure-links")]
#[command(about = "Secure Links - save, browse and count encrypted links on an FHEVM chain")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON-RPC endpoint (overrides RPC_URL)
    #[arg(long, global = true)]
    rpc_url: Option<String>,

    /// Deployment address table (overrides ADDRESS_BOOK)
    #[arg(long, global = true)]
    address_book: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Copy the contract ABI out of the hardhat artifact
    ExportAbi {
        #[arg(long, default_value = abi::DEFAULT_ARTIFACT_PATH)]
        artifact: PathBuf,

        #[arg(short, long, default_value = abi::DEFAULT_ABI_OUT)]
        out: PathBuf,
    },

    /// Deploy the contract and record its address for the connected chain
    Deploy {
        #[arg(long, default_value = abi::DEFAULT_ARTIFACT_PATH)]
        artifact: PathBuf,
    },

    /// List recorded deployments
    Deployments,

    /// Links saved by an account (defaults to the configured key)
    MyLinks {
        #[arg(long)]
        owner: Option<Address>,
    },

    /// Every saved link, most saved first
    Trending,

    /// Encrypted link counter handle of the configured account
    CountHandle,

    /// Follow the contract and print status updates until Ctrl+C
    Watch,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config::DEFAULT_LOG_FILTER));
    let registry = tracing_subscriber::registry().with(filter);

    let format = std::env::var(config::LOG_FORMAT_ENV).unwrap_or_default();
    if format.eq_ignore_ascii_case("json") {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        // "pretty" and any other value
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_file(true)
                    .with_line_number(true),
            )
            .init();
    }
}

fn load_signer(config: &Config) -> CliResult<Option<LocalWalletSigner>> {
    if let Some(hex) = &config.private_key {
        return Ok(Some(LocalWalletSigner::from_hex(hex)?));
    }
    if let Some(path) = &config.private_key_pem {
        let pem = std::fs::read(path)?;
        return Ok(Some(signer_from_pem(&pem)?));
    }
    Ok(None)
}

fn load_address_book(path: &Path) -> CliResult<AddressBook> {
    if path.exists() {
        Ok(AddressBook::load(path)?)
    } else {
        tracing::warn!(path = %path.display(), "Address book not found, nothing is deployed");
        Ok(AddressBook::new())
    }
}

async fn chain_id<P: Provider>(provider: &P) -> Result<u64, LedgerClientError> {
    provider
        .get_chain_id()
        .await
        .map_err(|e| LedgerClientError::RpcError(format!("Failed to get chain id: {e}")))
}

/// Session against the configured chain, without an FHEVM instance.
async fn open_session(config: &Config) -> CliResult<SecureLinksState> {
    let provider = connect_readonly(&config.rpc_url)?;
    let chain_id = chain_id(&provider).await?;

    let env = Arc::new(Environment::new(load_address_book(&config.address_book)?));
    env.set_chain_id(Some(chain_id));
    if let Some(signer) = load_signer(config)? {
        env.set_signer(Some(Arc::new(signer)));
    }

    let signatures = SignatureCache::new(Arc::new(SignatureDatabase::open(&config.signature_db)?))
        .with_duration_days(config.decryption_duration_days);
    let ledger = Arc::new(SecureLinksLedger::new(provider));

    Ok(SecureLinksState::new(env, ledger, None, signatures))
}

fn print_status(state: &SecureLinksState) {
    if let Some(message) = state.status().latest() {
        eprintln!("{message}");
    }
}

#[tokio::main]
async fn main() -> CliResult {
    init_logging();

    let cli = Cli::parse();
    let mut config = Config::from_env()?;
    if let Some(rpc_url) = cli.rpc_url {
        config.rpc_url = rpc_url;
    }
    if let Some(address_book) = cli.address_book {
        config.address_book = address_book;
    }

    match cli.command {
        Commands::ExportAbi { artifact, out } => {
            let entries = abi::export_abi(&artifact, &out)?;
            println!("Exported {entries} ABI entries to {}", out.display());
        }

        Commands::Deploy { artifact } => {
            let signer = load_signer(&config)?
                .ok_or("deploy needs PRIVATE_KEY or PRIVATE_KEY_PEM")?;
            let deployer = signer.address();
            let code = HardhatArtifact::load(&artifact)?.deploy_code()?;

            let provider =
                connect_with_wallet(&config.rpc_url, create_wallet(signer.inner().clone()))?;
            let chain_id = chain_id(&provider).await?;
            tracing::info!(chain_id, %deployer, "Deploying SecureLinks");

            let deployed = deploy_contract(&provider, code).await?;

            let mut book = load_address_book(&config.address_book)?;
            let network = network_by_chain_id(chain_id);
            let entry = record_deployment(&mut book, chain_id, network.as_ref(), deployed.address);
            book.save(&config.address_book)?;
            println!(
                "SecureLinks deployed to {} on {} (tx {}, block {})",
                entry.address, entry.chain_name, deployed.tx_hash, deployed.block_number
            );
            if let Some(url) = network.and_then(|n| n.explorer_tx_url(deployed.tx_hash)) {
                println!("{url}");
            }
        }

        Commands::Deployments => {
            let book = load_address_book(&config.address_book)?;
            for deployment in book.iter() {
                println!(
                    "{:>10}  {:<12} {}",
                    deployment.chain_id, deployment.chain_name, deployment.address
                );
            }
        }

        Commands::MyLinks { owner } => {
            let state = open_session(&config).await?;
            let owner = owner
                .or_else(|| state.environment().signer_address())
                .ok_or("pass --owner or configure PRIVATE_KEY")?;
            if let Err(e) = state.store().refresh_my_links(owner).await {
                print_status(&state);
                return Err(e.into());
            }
            for link in state.store().my_links() {
                println!("{}  {}", link.url_hash, link.timestamp);
            }
        }

        Commands::Trending => {
            let state = open_session(&config).await?;
            if let Err(e) = state.store().refresh_all_links().await {
                print_status(&state);
                return Err(e.into());
            }
            for link in state.store().trending() {
                println!("{:>6}  {}", link.count, link.url_hash);
            }
        }

        Commands::CountHandle => {
            let state = open_session(&config).await?;
            match state.store().refresh_count_handle().await {
                Ok(Some(handle)) => println!("{handle}"),
                Ok(None) => println!("SecureLinks is not deployed on this network"),
                Err(e) => {
                    print_status(&state);
                    return Err(e.into());
                }
            }
        }

        Commands::Watch => {
            let state = Arc::new(open_session(&config).await?);
            let shutdown = CancellationToken::new();

            let watcher = tokio::spawn({
                let state = state.clone();
                let shutdown = shutdown.clone();
                async move { state.watch_environment(shutdown).await }
            });

            let mut status = state.status().subscribe();
            loop {
                tokio::select! {
                    changed = status.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        if let Some(message) = status.borrow_and_update().clone() {
                            println!("{message}");
                        }
                    }
                    _ = tokio::signal::ctrl_c() => break,
                }
            }

            shutdown.cancel();
            watcher.await?;
        }
    }

    Ok(())
}
