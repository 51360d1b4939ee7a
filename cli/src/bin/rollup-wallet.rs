use std::time::Duration;

use alloy_primitives::{Address, U256};
use anyhow::{Context, bail};
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};
use rollup_client::{Dispatcher, RollupClient};
use tracing::info;
use tracing_subscriber::EnvFilter;
use wallet_core::codec::{
    Erc721Deposit, EtherDeposit, encode_erc721_deposit, encode_ether_deposit, encode_inspect,
    encode_operation,
};
use wallet_core::{
    Asset, BalanceQuery, DEFAULT_DAPP_ADDRESS_RELAY, DEFAULT_ERC721_PORTAL, DEFAULT_ETHER_PORTAL,
    Operation, PortalConfig,
};
use wallet_program::Router;

/// Rollup wallet backend: ether and ERC-721 balances behind the coordinator API
///
/// Polls the coordinator for requests, applies deposits, transfers and
/// withdrawals to the ledger, and answers balance queries.
#[derive(Parser)]
#[command(name = "rollup-wallet", version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the dispatch loop against a coordinator
    Run {
        /// Coordinator base URL
        #[arg(long, env = "ROLLUP_HTTP_SERVER_URL")]
        rollup_url: String,

        #[command(flatten)]
        portals: PortalArgs,

        /// Known dApp address, for setups without a relay input
        #[arg(long, env = "DAPP_ADDRESS")]
        dapp_address: Option<Address>,

        /// Pause between polls when nothing is pending
        #[arg(long, env = "POLL_INTERVAL_MS", default_value_t = 0)]
        poll_interval_ms: u64,
    },

    /// Print a portal deposit payload as hex
    EncodeDeposit {
        #[command(subcommand)]
        kind: DepositKind,
    },

    /// Print a user operation payload
    EncodeOperation {
        #[command(subcommand)]
        operation: OperationKind,
    },

    /// Print a balance query payload
    EncodeInspect {
        /// Account to query
        #[arg(long)]
        account: Address,
        /// ERC-721 contract; omit to query ether
        #[arg(long)]
        erc721: Option<Address>,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args)]
struct PortalArgs {
    /// Ether portal contract
    #[arg(long, env = "ETHER_PORTAL_ADDRESS", default_value_t = DEFAULT_ETHER_PORTAL)]
    ether_portal: Address,

    /// ERC-721 portal contract
    #[arg(long, env = "ERC721_PORTAL_ADDRESS", default_value_t = DEFAULT_ERC721_PORTAL)]
    erc721_portal: Address,

    /// dApp address relay contract
    #[arg(long, env = "DAPP_ADDRESS_RELAY", default_value_t = DEFAULT_DAPP_ADDRESS_RELAY)]
    dapp_relay: Address,
}

impl From<PortalArgs> for PortalConfig {
    fn from(args: PortalArgs) -> Self {
        PortalConfig {
            ether_portal: args.ether_portal,
            erc721_portal: args.erc721_portal,
            dapp_address_relay: args.dapp_relay,
        }
    }
}

#[derive(Subcommand)]
enum DepositKind {
    /// Ether portal payload (depositor, amount)
    Ether {
        #[arg(long)]
        depositor: Address,
        /// Amount in wei
        #[arg(long)]
        amount: U256,
    },
    /// ERC-721 portal payload (contract, account, token id)
    Erc721 {
        #[arg(long)]
        contract: Address,
        #[arg(long)]
        account: Address,
        #[arg(long)]
        token_id: U256,
    },
}

/// Ether amount or a single ERC-721 token.
#[derive(Args)]
struct AssetArgs {
    /// Amount in wei
    #[arg(long, conflicts_with_all = ["erc721", "token_id"])]
    amount: Option<U256>,
    /// ERC-721 contract
    #[arg(long, requires = "token_id")]
    erc721: Option<Address>,
    /// ERC-721 token id
    #[arg(long, requires = "erc721")]
    token_id: Option<U256>,
}

impl AssetArgs {
    fn into_asset(self) -> anyhow::Result<Asset> {
        match (self.amount, self.erc721, self.token_id) {
            (Some(amount), None, None) => Ok(Asset::Ether(amount)),
            (None, Some(contract), Some(token_id)) => Ok(Asset::Erc721 { contract, token_id }),
            _ => bail!("pass either --amount or --erc721 with --token-id"),
        }
    }
}

#[derive(Subcommand)]
enum OperationKind {
    /// Move an asset between two accounts
    Transfer {
        #[arg(long)]
        from: Address,
        #[arg(long)]
        to: Address,
        #[command(flatten)]
        asset: AssetArgs,
    },
    /// Withdraw an asset back to layer 1
    Withdraw {
        #[arg(long)]
        from: Address,
        #[command(flatten)]
        asset: AssetArgs,
    },
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("{level},reqwest=warn,hyper=warn,hyper_util=warn"))
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn print_payload(payload: &[u8]) {
    println!("0x{}", hex::encode(payload));
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Completions { shell } => {
            generate(shell, &mut Cli::command(), "rollup-wallet", &mut std::io::stdout());
        }
        Commands::EncodeDeposit { kind } => {
            let payload = match kind {
                DepositKind::Ether { depositor, amount } => {
                    encode_ether_deposit(&EtherDeposit { depositor, amount })
                }
                DepositKind::Erc721 {
                    contract,
                    account,
                    token_id,
                } => encode_erc721_deposit(&Erc721Deposit {
                    contract,
                    account,
                    token_id,
                }),
            };
            print_payload(&payload);
        }
        Commands::EncodeOperation { operation } => {
            let operation = match operation {
                OperationKind::Transfer { from, to, asset } => Operation::Transfer {
                    from,
                    to,
                    asset: asset.into_asset()?,
                },
                OperationKind::Withdraw { from, asset } => Operation::Withdraw {
                    from,
                    asset: asset.into_asset()?,
                },
            };
            let payload = encode_operation(&operation);
            println!("{}", String::from_utf8_lossy(&payload));
            print_payload(&payload);
        }
        Commands::EncodeInspect { account, erc721 } => {
            let query = match erc721 {
                Some(contract) => BalanceQuery::Erc721 { account, contract },
                None => BalanceQuery::Ether { account },
            };
            print_payload(&encode_inspect(&query));
        }
        Commands::Run {
            rollup_url,
            portals,
            dapp_address,
            poll_interval_ms,
        } => {
            init_tracing(cli.verbose);

            let client = RollupClient::new(rollup_url);
            let rollup_url = client.base_url().to_string();
            let portals = PortalConfig::from(portals);
            info!(
                %rollup_url,
                ether_portal = %portals.ether_portal,
                erc721_portal = %portals.erc721_portal,
                dapp_relay = %portals.dapp_address_relay,
                "starting rollup wallet"
            );

            let mut router = Router::new(portals);
            if let Some(dapp_address) = dapp_address {
                info!(%dapp_address, "dApp address preset");
                router = router.with_dapp_address(dapp_address);
            }

            Dispatcher::new(client, router)
                .with_poll_interval(Duration::from_millis(poll_interval_ms))
                .run()
                .await
                .with_context(|| format!("lost the coordinator at {rollup_url}"))?;
        }
    }
    Ok(())
}
