use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use brens_swap_sdk::{
    amount::format_amount, status_message, ClaimLedger, Error as SdkError, InjectedWallet,
    LocalWallet, SwapClient, SwapConfig, SwapView, TradeDirection,
};
use clap::{CommandFactory, Parser, Subcommand};
use serde_json::json;
use tokio::task::JoinHandle;
use tracing::debug;
use url::Url;

const LEDGER_FILE: &str = "claims.json";

// ─── Version banner ───────────────────────────────────────────────────────────

fn print_banner(config: &SwapConfig) {
    let ver = env!("CARGO_PKG_VERSION");
    println!();
    println!("  Brens Swap  v{ver}  ·  1:1 pegged swaps on Uniswap v4");
    println!("  {}", "─".repeat(62));
    println!("  Network   {} (chain {})", config.chain.name, config.chain.chain_id);
    println!("  Pair      {} / {}", config.token_a.symbol, config.token_b.symbol);
    println!("  Rate      1:1, zero fee");
    println!("  Explorer  {}", config.chain.explorer_url);
    println!();
}

// ─── CLI definition ───────────────────────────────────────────────────────────

/// Brens Swap — approve-then-swap client for a 1:1 pegged-token pool.
///
/// Every command supports --json for machine-readable output.
/// Global options can also be set via environment variables:
///   BRENS_PRIVATE_KEY  — hex private key for the embedded wallet
///   BRENS_WALLET_URL   — EIP-1193 endpoint of an external wallet
#[derive(Parser)]
#[command(
    name    = "brens-swap",
    version = env!("CARGO_PKG_VERSION"),
    long_version = concat!(
        env!("CARGO_PKG_VERSION"), "\n",
        "Network:  Unichain Sepolia (1301)\n",
        "Pool:     Uniswap v4, constant-sum hook\n",
        "Rate:     1:1, zero fee\n",
        "License:  MIT",
    ),
    about = "Swap two pegged test tokens 1:1 through a Uniswap v4 pool.",
    after_help = "\
ENVIRONMENT:
  BRENS_CONFIG        JSON configuration file  [default: built-in Unichain Sepolia]
  BRENS_RPC_URL       JSON-RPC endpoint override
  BRENS_PRIVATE_KEY   Hex private key (embedded wallet)
  BRENS_WALLET_URL    EIP-1193 wallet endpoint (external wallet)
  BRENS_STATE_DIR     Directory for the faucet claim ledger
  RUST_LOG            Log filter  [default: info]

QUICK START:
  brens-swap claim
  brens-swap balances
  brens-swap swap 10 --auto-approve
  brens-swap swap 5 --reverse"
)]
struct Cli {
    /// JSON configuration file replacing the built-in network preset
    #[arg(long, global = true, value_name = "PATH", env = "BRENS_CONFIG")]
    config: Option<PathBuf>,

    /// JSON-RPC endpoint
    #[arg(long, global = true, value_name = "URL", env = "BRENS_RPC_URL")]
    rpc_url: Option<Url>,

    /// Hex private key for the embedded wallet
    #[arg(
        long,
        global     = true,
        value_name = "HEX",
        env        = "BRENS_PRIVATE_KEY",
        hide_env_values = true
    )]
    private_key: Option<String>,

    /// EIP-1193 JSON-RPC endpoint of an external wallet (takes precedence)
    #[arg(long, global = true, value_name = "URL", env = "BRENS_WALLET_URL")]
    wallet_url: Option<Url>,

    /// Directory holding the faucet claim ledger
    #[arg(long, global = true, value_name = "PATH", env = "BRENS_STATE_DIR")]
    state_dir: Option<PathBuf>,

    /// Trade token B for token A instead of A for B
    #[arg(long, global = true, default_value_t = false)]
    reverse: bool,

    /// Output machine-readable JSON instead of human-readable text
    #[arg(long, global = true, default_value_t = false)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the network, contracts and pool this client targets
    Info,

    /// Show wallet balances and router allowance
    Balances,

    /// Approve the router to spend exactly AMOUNT of the input token
    #[command(
        after_help = "\
EXAMPLES:
  brens-swap approve 10
  brens-swap approve 10 --reverse"
    )]
    Approve {
        /// Amount in whole tokens, e.g. 10 or 2.5
        amount: String,
    },

    /// Swap AMOUNT of the input token at 1:1
    ///
    /// Fails with "approval required" when the router allowance is short,
    /// unless --auto-approve is given.
    #[command(
        after_help = "\
EXAMPLES:
  # Sell 10 TKA for 10 TKB
  brens-swap swap 10

  # Approve first if needed, then swap
  brens-swap swap 10 --auto-approve

  # Sell TKB instead
  brens-swap swap 10 --reverse --json"
    )]
    Swap {
        /// Amount in whole tokens, or `max` for the whole balance
        amount: String,

        /// Send the approval first when the allowance is short
        #[arg(long, default_value_t = false)]
        auto_approve: bool,
    },

    /// Claim test tokens from the faucet (once per account)
    Claim,

    /// Show whether this account has claimed and the claim size
    FaucetStatus,
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    // When invoked with no arguments, show banner + full help and exit cleanly.
    if std::env::args().len() == 1 {
        print_banner(&SwapConfig::unichain_sepolia());
        Cli::command().print_long_help().ok();
        println!();
        return Ok(());
    }

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    match &cli.command {
        Commands::Info => cmd_info(&config, cli.json),
        Commands::Balances => {
            let client = connect(&cli, config).await?;
            cmd_balances(&client, cli.json)
        }
        Commands::Approve { amount } => {
            let client = connect(&cli, config).await?;
            cmd_approve(&client, amount, cli.json).await
        }
        Commands::Swap { amount, auto_approve } => {
            let client = connect(&cli, config).await?;
            cmd_swap(&client, amount, *auto_approve, cli.json).await
        }
        Commands::Claim => {
            let client = connect(&cli, config).await?;
            cmd_claim(&client, cli.json).await
        }
        Commands::FaucetStatus => {
            let client = connect(&cli, config).await?;
            cmd_faucet_status(&client, cli.json).await
        }
    }
}

/// Logs go to stderr so `--json` output on stdout stays parseable.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}

// ─── Setup ────────────────────────────────────────────────────────────────────

/// Built-in preset, then `--config`, then `--rpc-url`.
fn load_config(cli: &Cli) -> Result<SwapConfig> {
    let mut config = match &cli.config {
        Some(path) => SwapConfig::from_json_file(path)
            .with_context(|| format!("Cannot load config from '{}'", path.display()))?,
        None => SwapConfig::unichain_sepolia(),
    };
    if let Some(url) = &cli.rpc_url {
        config = config.with_rpc_url(url.clone());
    }
    debug!(chain_id = config.chain.chain_id, rpc = %config.chain.rpc_url, "configuration loaded");
    Ok(config)
}

async fn connect(cli: &Cli, config: SwapConfig) -> Result<SwapClient> {
    let mut client = SwapClient::new(config).context("Invalid configuration")?;

    if let Some(url) = &cli.wallet_url {
        client = client.with_wallet(Arc::new(InjectedWallet::new(url.clone())));
    } else if let Some(key) = &cli.private_key {
        let wallet = LocalWallet::from_private_key(key, client.config().chain.rpc_url.clone())
            .context("Cannot load private key")?;
        client = client.with_wallet(Arc::new(wallet));
    }

    if let Some(dir) = &cli.state_dir {
        let path = dir.join(LEDGER_FILE);
        let ledger = ClaimLedger::open(&path)
            .with_context(|| format!("Cannot open claim ledger '{}'", path.display()))?;
        client = client.with_claim_ledger(ledger);
    }

    if cli.reverse {
        client.set_direction(TradeDirection::BToA);
    }

    client.connect().await.map_err(|e| match e {
        SdkError::NoProviderAvailable => anyhow!(
            "{e}\n  Set BRENS_PRIVATE_KEY / --private-key, or BRENS_WALLET_URL / --wallet-url."
        ),
        other => anyhow!(other).context("Cannot connect wallet"),
    })?;
    Ok(client)
}

/// Print lane status lines as they change. Aborted by the caller when done.
fn watch_status(client: &SwapClient, json_output: bool) -> Option<JoinHandle<()>> {
    if json_output {
        return None;
    }
    let mut rx = client.subscribe();
    Some(tokio::spawn(async move {
        let mut last: (Option<String>, Option<String>) = (None, None);
        while rx.changed().await.is_ok() {
            let current = {
                let state = rx.borrow_and_update();
                (status_message(&state.swap_tx.state), status_message(&state.claim_tx.state))
            };
            for (now, before) in [(&current.0, &last.0), (&current.1, &last.1)] {
                if let Some(line) = now.as_ref().filter(|line| Some(*line) != before.as_ref()) {
                    println!("  · {line}");
                }
            }
            last = current;
        }
    }))
}

fn stop(watcher: Option<JoinHandle<()>>) {
    if let Some(handle) = watcher {
        handle.abort();
    }
}

// ─── info ─────────────────────────────────────────────────────────────────────

fn cmd_info(config: &SwapConfig, json_output: bool) -> Result<()> {
    let key = config.pool_key()?;
    if json_output {
        println!("{}", json!({
            "status":       "ok",
            "command":      "info",
            "chain_id":     config.chain.chain_id,
            "network":      config.chain.name,
            "rpc_url":      config.chain.rpc_url.as_str(),
            "explorer":     config.chain.explorer_url.as_str(),
            "router":       config.contracts.router.to_string(),
            "faucet":       config.contracts.faucet.to_string(),
            "hook":         config.contracts.hook.to_string(),
            "pool_manager": config.contracts.pool_manager.to_string(),
            "token_a":      config.token_a,
            "token_b":      config.token_b,
            "currency0":    key.currency0.to_string(),
            "currency1":    key.currency1.to_string(),
            "fee":          config.pool.fee,
            "tick_spacing": config.pool.tick_spacing,
        }));
    } else {
        print_banner(config);
        println!("─── Contracts ────────────────────────────────────────────────────");
        println!("  Router         {}", config.contracts.router);
        println!("  Faucet         {}", config.contracts.faucet);
        println!("  Hook           {}", config.contracts.hook);
        println!("  Pool manager   {}", config.contracts.pool_manager);
        println!("─── Pool ─────────────────────────────────────────────────────────");
        println!("  {:<14} {}  ({})", "Token A", config.token_a.symbol, config.token_a.address);
        println!("  {:<14} {}  ({})", "Token B", config.token_b.symbol, config.token_b.address);
        println!("  currency0      {}", key.currency0);
        println!("  Fee            {}  (hook-enforced zero fee)", config.pool.fee);
        println!("  Tick spacing   {}", config.pool.tick_spacing);
        println!("  RPC            {}", config.chain.rpc_url);
    }
    Ok(())
}

// ─── balances ─────────────────────────────────────────────────────────────────

fn cmd_balances(client: &SwapClient, json_output: bool) -> Result<()> {
    let view = client.view();
    if json_output {
        println!("{}", json!({
            "status":  "ok",
            "command": "balances",
            "view":    view,
        }));
    } else {
        print_view(&view);
    }
    Ok(())
}

fn print_view(view: &SwapView) {
    println!("─── Wallet ───────────────────────────────────────────────────────");
    if let Some(account) = view.account {
        println!("  Account        {account}");
    }
    println!("  Direction      {} → {}", view.input.symbol, view.output.symbol);
    println!("  {:<14} {}", view.input.symbol, view.input.balance);
    println!("  {:<14} {}", view.output.symbol, view.output.balance);
    println!("  Allowance      {} {}  (router)", view.allowance, view.input.symbol);
    println!("  Faucet         {}", if view.claimed { "claimed" } else { "available" });
}

// ─── approve ──────────────────────────────────────────────────────────────────

async fn cmd_approve(client: &SwapClient, amount: &str, json_output: bool) -> Result<()> {
    client.set_amount(amount);
    let watcher = watch_status(client, json_output);
    let result = client.approve().await;
    stop(watcher);
    let hash = result.context("Approval failed")?;

    let view = client.view();
    if json_output {
        println!("{}", json!({
            "status":    "ok",
            "command":   "approve",
            "token":     view.input.symbol,
            "amount":    amount,
            "allowance": view.allowance,
            "tx":        hash.to_string(),
            "explorer":  client.config().chain.tx_url(hash),
        }));
    } else {
        println!("─── Approved ─────────────────────────────────────────────────────");
        println!("  Token          {}", view.input.symbol);
        println!("  Allowance      {}", view.allowance);
        println!("  Transaction    {hash}");
        println!("  Explorer       {}", client.config().chain.tx_url(hash));
    }
    Ok(())
}

// ─── swap ─────────────────────────────────────────────────────────────────────

async fn cmd_swap(
    client:       &SwapClient,
    amount:       &str,
    auto_approve: bool,
    json_output:  bool,
) -> Result<()> {
    let amount = if amount.eq_ignore_ascii_case("max") {
        let max = client.set_max_amount();
        if max.is_empty() {
            bail!("No {} balance to swap", client.view().input.symbol);
        }
        max
    } else {
        client.set_amount(amount);
        amount.to_string()
    };
    let before = client.view();
    let watcher = watch_status(client, json_output);

    let mut approval = None;
    if client.requires_approval() {
        if !auto_approve {
            stop(watcher);
            bail!(
                "Router allowance ({} {}) is below {amount}.\n  \
                 Run `brens-swap approve {amount}` first, or pass --auto-approve.",
                before.allowance,
                before.input.symbol
            );
        }
        match client.approve().await {
            Ok(hash) => approval = Some(hash),
            Err(e) => {
                stop(watcher);
                return Err(anyhow!(e).context("Approval failed"));
            }
        }
    }

    let result = client.swap().await;
    stop(watcher);
    let hash = result.context("Swap failed")?;
    let after = client.view();
    let spent = format_amount(
        before.input.balance_raw.saturating_sub(after.input.balance_raw),
        client.tokens().input(before.direction).decimals,
    );

    if json_output {
        println!("{}", json!({
            "status":      "ok",
            "command":     "swap",
            "direction":   before.direction,
            "sold":        before.input.symbol,
            "bought":      before.output.symbol,
            "amount_in":   amount,
            "amount_out":  amount,
            "approval_tx": approval.map(|h| h.to_string()),
            "tx":          hash.to_string(),
            "explorer":    client.config().chain.tx_url(hash),
            "balances": {
                before.input.symbol.clone():  after.input.balance,
                before.output.symbol.clone(): after.output.balance,
            },
        }));
    } else {
        println!("─── Swapped ──────────────────────────────────────────────────────");
        println!("  Sold           {amount} {}", before.input.symbol);
        println!("  Received       {amount} {}  (1:1)", before.output.symbol);
        println!("  Balance change −{spent} {}", before.input.symbol);
        if let Some(approval) = approval {
            println!("  Approval tx    {approval}");
        }
        println!("  Transaction    {hash}");
        println!("  Explorer       {}", client.config().chain.tx_url(hash));
        println!();
        print_view(&after);
    }
    Ok(())
}

// ─── claim ────────────────────────────────────────────────────────────────────

async fn cmd_claim(client: &SwapClient, json_output: bool) -> Result<()> {
    let watcher = watch_status(client, json_output);
    let result = client.claim().await;
    stop(watcher);

    let hash = match result {
        Ok(hash) => hash,
        Err(SdkError::AlreadyClaimed) => {
            bail!("This account has already claimed from the faucet.")
        }
        Err(e) => return Err(anyhow!(e).context("Claim failed")),
    };

    let view = client.view();
    if json_output {
        println!("{}", json!({
            "status":   "ok",
            "command":  "claim",
            "tx":       hash.to_string(),
            "explorer": client.config().chain.tx_url(hash),
            "balances": {
                view.input.symbol.clone():  view.input.balance,
                view.output.symbol.clone(): view.output.balance,
            },
        }));
    } else {
        println!("─── Claimed ──────────────────────────────────────────────────────");
        println!("  Transaction    {hash}");
        println!("  Explorer       {}", client.config().chain.tx_url(hash));
        println!();
        print_view(&view);
    }
    Ok(())
}

// ─── faucet-status ────────────────────────────────────────────────────────────

async fn cmd_faucet_status(client: &SwapClient, json_output: bool) -> Result<()> {
    let claimed = client.has_claimed().await.context("Cannot read faucet status")?;
    let amount = client.claim_amount().await.context("Cannot read faucet claim amount")?;
    let decimals = client.tokens().token_a().decimals;
    let per_token = format_amount(amount, decimals);

    if json_output {
        println!("{}", json!({
            "status":       "ok",
            "command":      "faucet-status",
            "account":      client.account().map(|a| a.to_string()),
            "claimed":      claimed,
            "claim_amount": per_token,
        }));
    } else {
        println!("─── Faucet ───────────────────────────────────────────────────────");
        if let Some(account) = client.account() {
            println!("  Account        {account}");
        }
        println!("  Claim amount   {per_token} of each token");
        println!(
            "  Status         {}",
            if claimed { "already claimed" } else { "available — run `brens-swap claim`" }
        );
    }
    Ok(())
}
