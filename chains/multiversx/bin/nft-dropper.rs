use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use core_logic::{PROGRESS_TARGET, RetryConfig, Throttle, setup_logger};
use dialoguer::{Confirm, Input, Select, theme::ColorfulTheme};
use dotenv::dotenv;
use multiversx_dropper::collection::{
    AggregateOptions, aggregate_owners, count_items, fetch_collection_items, parse_allowlist,
};
use multiversx_dropper::distribution::{AutoConfirm, Confirmer, DistributionPlan};
use multiversx_dropper::snapshot::{SNAPSHOT_FILE, read_snapshot, write_snapshot};
use multiversx_dropper::{
    ApiClient, CollectionError, DistributionEngine, DistributionError, DistributionParams,
    GatewaySender, MultiversxConfig, OwnerRecord, RemoteSigner, TokenKind,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, error, info};

#[derive(Parser, Debug)]
#[command(author, version, about = "Snapshot NFT collection owners and airdrop tokens to them")]
struct Args {
    /// Path to config.toml
    #[arg(short, long, default_value = "config/config.toml")]
    config: String,

    /// Debug output on the console
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Snapshot every owner of a collection
    Collect {
        /// Collection ticker, e.g. COLL-abc123
        collection: Option<String>,
        /// Skip owners that are smart contracts (true or false)
        #[arg(long)]
        exclude_contracts: Option<bool>,
        /// Comma separated metadata file names to keep, e.g. 1,7,42 ("" keeps all)
        #[arg(long)]
        metadata_filter: Option<String>,
        #[arg(short, long, default_value = SNAPSHOT_FILE)]
        output: PathBuf,
    },
    /// Send one transfer to every owner in the snapshot
    Distribute {
        /// EGLD, ESDT, SFT or MetaESDT
        #[arg(short, long)]
        kind: Option<TokenKind>,
        /// Token identifier (not used for EGLD)
        #[arg(short, long)]
        token: Option<String>,
        /// Amount per owner, e.g. 0.5
        #[arg(short, long)]
        amount: Option<String>,
        /// Multiply the amount by the number of items each owner holds (true or false)
        #[arg(short, long)]
        multiply: Option<bool>,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
        #[arg(short, long, default_value = SNAPSHOT_FILE)]
        snapshot: PathBuf,
    },
}

/// Asks on the terminal before anything is sent
struct PromptConfirm;

#[async_trait]
impl Confirmer for PromptConfirm {
    async fn confirm(&self, plan: &DistributionPlan) -> Result<bool> {
        let prompt = format!("{}. Proceed?", plan.summary());
        tokio::task::spawn_blocking(move || {
            Confirm::with_theme(&ColorfulTheme::default())
                .with_prompt(prompt)
                .default(false)
                .interact()
        })
        .await?
        .context("Failed to read confirmation")
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv().ok();
    let args = Args::parse();
    let _log_guard = setup_logger("logs", args.verbose);

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(exit_code(&e) as u8)
        }
    }
}

fn exit_code(err: &anyhow::Error) -> i32 {
    if let Some(e) = err.downcast_ref::<DistributionError>() {
        return e.exit_code();
    }
    if let Some(e) = err.downcast_ref::<CollectionError>() {
        return e.exit_code();
    }
    1
}

async fn run(args: Args) -> Result<()> {
    let config = MultiversxConfig::load(&args.config).context("Failed to load config")?;
    info!(target: PROGRESS_TARGET, "Network: {} ({})", config.network, config.api_url());

    match args.command {
        Commands::Collect {
            collection,
            exclude_contracts,
            metadata_filter,
            output,
        } => {
            let collection = match collection {
                Some(c) => c,
                None => prompt_text("Collection ticker")?,
            };
            let exclude_contracts = match exclude_contracts {
                Some(exclude) => exclude,
                None => prompt_yes_no("Exclude smart contract owners?", true)?,
            };
            let metadata_filter = match metadata_filter {
                Some(filter) => filter,
                None => prompt_optional_text("Metadata file names to keep (comma separated, empty for all)")?,
            };
            let options = AggregateOptions {
                exclude_contracts,
                metadata_allowlist: parse_allowlist(&metadata_filter),
            };
            collect(&config, collection.trim(), &options, &output).await
        }
        Commands::Distribute {
            kind,
            token,
            amount,
            multiply,
            yes,
            snapshot,
        } => {
            let records = load_snapshot(&snapshot, yes)?;
            let params = distribution_params(kind, token, amount, multiply, yes)?;
            distribute(&config, &records, &params, yes).await
        }
    }
}

async fn collect(
    config: &MultiversxConfig,
    collection: &str,
    options: &AggregateOptions,
    output: &Path,
) -> Result<()> {
    let api = ApiClient::from_config(config)?;
    let throttle = Throttle::new(config.collection_throttle())?;
    let retry = RetryConfig::from(config.page_retry);

    debug!("Reading {} from {}", collection, api.base_url());
    let total = count_items(&api, &throttle, collection).await?;
    info!(target: PROGRESS_TARGET, "{} holds {} items", collection, total);

    let entries = fetch_collection_items(&api, &throttle, &retry, collection, total).await?;
    let records = aggregate_owners(entries, options)?;
    write_snapshot(output, &records)?;

    info!(
        target: PROGRESS_TARGET,
        "SUCCESS {} owners written to {}",
        records.len(),
        output.display()
    );
    Ok(())
}

async fn distribute(
    config: &MultiversxConfig,
    records: &[OwnerRecord],
    params: &DistributionParams,
    yes: bool,
) -> Result<()> {
    let api = Arc::new(ApiClient::from_config(config)?);
    let signer = Arc::new(RemoteSigner::from_config(config)?);
    let sender = Arc::new(GatewaySender::from_config(config)?);
    let throttle = Throttle::new(config.distribution_throttle())?;

    let engine = DistributionEngine::new(api, signer, sender, throttle, &config.chain_id(), config.gas);
    let report = if yes {
        engine.run(records, params, &AutoConfirm(true)).await?
    } else {
        engine.run(records, params, &PromptConfirm).await?
    };

    info!(
        target: PROGRESS_TARGET,
        "{} transfers recorded ({} failed) in {}",
        report.results.len(),
        report.failed(),
        report.log_path.display()
    );
    Ok(())
}

/// Reads the snapshot, offering to pick another file when it is missing
fn load_snapshot(path: &Path, yes: bool) -> Result<Vec<OwnerRecord>> {
    if let Some(records) = read_snapshot(path) {
        return Ok(records);
    }
    let not_found = || DistributionError::SnapshotNotFound {
        path: path.display().to_string(),
    };
    if yes {
        return Err(not_found().into());
    }

    let retry = Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(format!("No snapshot at {}. Use another file?", path.display()))
        .default(true)
        .interact()?;
    if !retry {
        return Err(not_found().into());
    }

    let other: String = prompt_text("Snapshot path")?;
    read_snapshot(&other).ok_or_else(|| {
        DistributionError::SnapshotNotFound { path: other.clone() }.into()
    })
}

fn prompt_yes_no(prompt: &str, default: bool) -> Result<bool> {
    Ok(Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .default(default)
        .interact()?)
}

fn prompt_optional_text(prompt: &str) -> Result<String> {
    let value: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .allow_empty(true)
        .interact_text()?;
    Ok(value.trim().to_string())
}

fn prompt_text(prompt: &str) -> Result<String> {
    let value: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .interact_text()?;
    Ok(value.trim().to_string())
}

/// Fills whatever was not passed on the command line from prompts
fn distribution_params(
    kind: Option<TokenKind>,
    token: Option<String>,
    amount: Option<String>,
    multiply: Option<bool>,
    yes: bool,
) -> Result<DistributionParams> {
    let kind = match kind {
        Some(kind) => kind,
        None => {
            let names: Vec<String> = TokenKind::ALL.iter().map(ToString::to_string).collect();
            let index = Select::with_theme(&ColorfulTheme::default())
                .with_prompt("Token kind")
                .default(0)
                .items(&names)
                .interact()?;
            TokenKind::ALL[index]
        }
    };

    let token_id = match (kind.needs_token_id(), token) {
        (false, _) => None,
        (true, Some(token)) => Some(token),
        (true, None) => Some(prompt_text("Token identifier")?),
    };

    let amount = match amount {
        Some(amount) => amount,
        None => prompt_text("Amount per owner")?,
    };

    // `--yes` runs unattended, so an unanswered question keeps the flat amount
    let multiply_by_count = match (multiply, yes) {
        (Some(multiply), _) => multiply,
        (None, true) => false,
        (None, false) => prompt_yes_no("Multiply the amount by the items each owner holds?", false)?,
    };

    let params = DistributionParams {
        kind,
        token_id,
        amount,
        multiply_by_count,
    };
    params.validate()?;
    Ok(params)
}
