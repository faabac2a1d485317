//! # BetBroker CLI
//!
//! Command-line interface for peer-to-peer wager escrow. State (ledger, wagers
//! and event trail) lives in a JSON snapshot that every command loads and,
//! for mutating commands, writes back.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use betbroker_core::{
    staging_path, AccountId, Amount, BetBroker, InMemoryLedger, Ledger, Snapshot, Wager,
    WagerEvent, WagerId, WagerStatus, DEFAULT_SNAPSHOT_PATH,
};
use clap::{Parser, Subcommand, ValueEnum, ValueHint};
use colored::*;
use tokio::io::AsyncWriteExt;
use tracing_subscriber::EnvFilter;

/// Supply minted to the arbiter by `init` (10^12 tokens with 18 decimals)
const DEFAULT_SUPPLY: Amount = 1_000_000_000_000_000_000_000_000_000_000;

/// Label of the escrow account when `init` is not given one
const DEFAULT_ESCROW_LABEL: &str = "betbroker-escrow";

#[derive(Parser)]
#[command(name = "betbroker")]
#[command(about = "Peer-to-peer wager escrow with arbiter settlement")]
#[command(version)]
struct Cli {
    /// Snapshot file holding the ledger and the wagers
    #[arg(long, global = true, env = "BETBROKER_STATE",
        default_value = DEFAULT_SNAPSHOT_PATH,
        value_hint = ValueHint::FilePath)]
    state: PathBuf,

    /// Account issuing the command (0x-prefixed hex or a label such as "alice")
    #[arg(long = "as", global = true, value_name = "ACCOUNT")]
    caller: Option<String>,

    /// Log at debug level (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Side {
    Creator,
    Taker,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a fresh snapshot with the whole token supply held by the arbiter
    Init {
        /// Arbiter account
        #[arg(short, long)]
        arbiter: String,
        /// Escrow account that custodies stakes
        #[arg(short, long, default_value = DEFAULT_ESCROW_LABEL)]
        escrow: String,
        /// Initial token supply
        #[arg(short, long, default_value_t = DEFAULT_SUPPLY)]
        supply: Amount,
        /// Overwrite an existing snapshot
        #[arg(long)]
        force: bool,
    },
    /// Transfer tokens from the caller to another account
    Transfer {
        /// Recipient account
        to: String,
        /// Amount in base units
        amount: Amount,
    },
    /// Allow the escrow to pull tokens from the caller
    Approve {
        /// Allowance in base units (unlimited when omitted)
        amount: Option<Amount>,
    },
    /// Show an account's balance and allowance towards the escrow
    Balance {
        /// Account to inspect (defaults to the caller)
        account: Option<String>,
    },
    /// Open a new wager on an event
    Create {
        /// External event identifier
        event_id: u64,
        /// Stake put up by the caller
        creator_amount: Amount,
        /// Stake required from the taker
        taker_amount: Amount,
    },
    /// Match an open wager
    Take {
        /// Wager ID
        id: u64,
    },
    /// Withdraw an unmatched wager (arbiter only)
    Close {
        /// Wager ID
        id: u64,
    },
    /// Record the outcome of a matched wager (arbiter only)
    Distribute {
        /// Wager ID
        id: u64,
        /// Winning side
        #[arg(short, long, value_enum)]
        winner: Side,
    },
    /// Claim the pool of a settled wager as its winner
    Claim {
        /// Wager ID
        id: u64,
    },
    /// Show a single wager
    Show {
        /// Wager ID
        id: u64,
    },
    /// List all wagers in creation order
    List,
    /// List wagers an account created or matched
    ListAccount {
        /// Account to filter on
        account: String,
    },
    /// List wagers on an event that an account could match
    ListOpen {
        /// External event identifier
        event_id: u64,
        /// Prospective taker (defaults to the caller)
        account: Option<String>,
    },
    /// Print the event trail
    Events,
    /// List every account holding tokens
    Holders,
    /// Hand the arbiter privilege to another account (arbiter only)
    TransferArbiter {
        /// New arbiter account
        new_arbiter: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Commands::Init {
        arbiter,
        escrow,
        supply,
        force,
    } = &cli.command
    {
        return init(&cli.state, arbiter, escrow, *supply, *force).await;
    }

    let mut snapshot = read_snapshot(&cli.state).await?;
    let dirty = run(&cli, &mut snapshot.broker)?;
    if dirty {
        write_snapshot(&cli.state, &mut snapshot).await?;
    }
    Ok(())
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn init(
    state: &Path,
    arbiter: &str,
    escrow: &str,
    supply: Amount,
    force: bool,
) -> Result<()> {
    if !force && tokio::fs::try_exists(state).await.unwrap_or(false) {
        bail!("snapshot {:?} already exists (use --force to overwrite)", state);
    }
    let arbiter = parse_account(arbiter)?;
    let escrow = parse_account(escrow)?;
    let ledger = InMemoryLedger::new(arbiter, supply);
    let broker = BetBroker::new(ledger, escrow, arbiter)?;
    let mut snapshot = Snapshot::new(broker);
    write_snapshot(state, &mut snapshot).await?;

    println!("{}", "BetBroker initialized".green().bold());
    println!("{}", "═".repeat(50).bright_black());
    println!("{}: {}", "Arbiter".yellow().bold(), arbiter);
    println!("{}: {}", "Escrow".yellow().bold(), escrow);
    println!("{}: {}", "Supply".yellow().bold(), supply);
    println!("{}: {}", "State".yellow().bold(), state.display());
    println!("{}", "═".repeat(50).bright_black());
    Ok(())
}

/// Executes a loaded-state command. Returns whether the snapshot changed.
fn run(cli: &Cli, broker: &mut BetBroker<InMemoryLedger>) -> Result<bool> {
    match &cli.command {
        Commands::Init { .. } => bail!("init creates state and cannot run against a snapshot"),

        Commands::Transfer { to, amount } => {
            let caller = require_caller(cli)?;
            let to = parse_account(to)?;
            refuse_escrow(broker, &caller, "send tokens")?;
            refuse_escrow(broker, &to, "receive tokens outside a wager")?;
            broker.ledger_mut().transfer(&caller, &to, *amount)?;
            println!(
                "{}: {} -> {} ({})",
                "Transferred".green().bold(),
                caller,
                to,
                amount.to_string().cyan()
            );
            Ok(true)
        }

        Commands::Approve { amount } => {
            let caller = require_caller(cli)?;
            refuse_escrow(broker, &caller, "grant allowances")?;
            let escrow = *broker.escrow_account();
            let amount = amount.unwrap_or(Amount::MAX);
            broker.ledger_mut().approve(&caller, &escrow, amount)?;
            let shown = if amount == Amount::MAX {
                "unlimited".to_string()
            } else {
                amount.to_string()
            };
            println!(
                "{}: escrow may pull {} from {}",
                "Approved".green().bold(),
                shown.cyan(),
                caller
            );
            Ok(true)
        }

        Commands::Balance { account } => {
            let account = account_or_caller(cli, account.as_deref())?;
            let ledger = broker.ledger();
            println!("{}: {}", "Account".yellow().bold(), account);
            println!(
                "{}: {}",
                "Balance".yellow().bold(),
                ledger.balance_of(&account).to_string().cyan()
            );
            println!(
                "{}: {}",
                "Allowance".yellow().bold(),
                ledger
                    .allowance(&account, broker.escrow_account())
                    .to_string()
                    .cyan()
            );
            Ok(false)
        }

        Commands::Create {
            event_id,
            creator_amount,
            taker_amount,
        } => {
            let caller = require_caller(cli)?;
            let id = broker.create_bet(*event_id, *creator_amount, *taker_amount, &caller)?;
            print_last_event(broker);
            println!("{}: {}", "Wager ID".cyan().bold(), id);
            Ok(true)
        }

        Commands::Take { id } => {
            let caller = require_caller(cli)?;
            broker.take_bet(WagerId::from(*id), &caller)?;
            print_last_event(broker);
            Ok(true)
        }

        Commands::Close { id } => {
            let caller = require_caller(cli)?;
            broker.close_bet(WagerId::from(*id), &caller)?;
            print_last_event(broker);
            println!(
                "{}",
                "The creator stake stays in escrow; closing does not refund it.".bright_black()
            );
            Ok(true)
        }

        Commands::Distribute { id, winner } => {
            let caller = require_caller(cli)?;
            let creator_won = matches!(winner, Side::Creator);
            broker.distribute_gains(WagerId::from(*id), creator_won, &caller)?;
            print_last_event(broker);
            Ok(true)
        }

        Commands::Claim { id } => {
            let caller = require_caller(cli)?;
            let paid = broker.claim_gains(WagerId::from(*id), &caller)?;
            println!(
                "{}: wager {} paid {} to {}",
                "Claimed".green().bold(),
                id,
                paid.to_string().cyan(),
                caller
            );
            Ok(true)
        }

        Commands::Show { id } => {
            let wager = broker
                .bet(WagerId::from(*id))
                .with_context(|| format!("wager {id} does not exist"))?;
            print_wager(wager);
            Ok(false)
        }

        Commands::List => {
            print_wagers(&broker.bets());
            Ok(false)
        }

        Commands::ListAccount { account } => {
            let account = parse_account(account)?;
            print_wagers(&broker.bets_by_account(&account));
            Ok(false)
        }

        Commands::ListOpen { event_id, account } => {
            let account = account_or_caller(cli, account.as_deref())?;
            print_wagers(&broker.open_bets(*event_id, &account));
            Ok(false)
        }

        Commands::Holders => {
            let ledger = broker.ledger();
            println!("{}", "Token holders".green().bold());
            println!("{}", "═".repeat(50).bright_black());
            println!("{}: {}", "Owner".yellow().bold(), ledger.owner());
            println!("{}: {}", "Supply".yellow().bold(), ledger.total_supply());
            for (account, balance) in ledger.holders() {
                let role = if account == broker.escrow_account() {
                    " (escrow)".cyan()
                } else if account == broker.arbiter() {
                    " (arbiter)".yellow()
                } else {
                    "".normal()
                };
                println!("{account}{role}: {}", balance.to_string().cyan());
            }
            println!(
                "{}: {}",
                "Owed to wagers".cyan().bold(),
                broker.total_custody()
            );
            println!("{}", "═".repeat(50).bright_black());
            Ok(false)
        }

        Commands::Events => {
            if broker.events().is_empty() {
                println!("{}", "No events yet.".bright_black());
            }
            for event in broker.events() {
                print_event(event);
            }
            Ok(false)
        }

        Commands::TransferArbiter { new_arbiter, yes } => {
            let caller = require_caller(cli)?;
            let new_arbiter = parse_account(new_arbiter)?;
            if !yes {
                let confirmed = inquire::Confirm::new(&format!(
                    "Hand the arbiter privilege from {caller} to {new_arbiter}?"
                ))
                .with_default(false)
                .prompt()?;
                if !confirmed {
                    println!("{}", "Aborted.".yellow());
                    return Ok(false);
                }
            }
            broker.transfer_arbiter(new_arbiter, &caller)?;
            println!(
                "{}: {}",
                "Arbiter transferred to".green().bold(),
                new_arbiter
            );
            Ok(true)
        }
    }
}

async fn read_snapshot(path: &Path) -> Result<Snapshot> {
    let content = tokio::fs::read_to_string(path).await.with_context(|| {
        format!("loading snapshot {:?} (run `betbroker init` first)", path)
    })?;
    Snapshot::from_json(&content).with_context(|| format!("in {:?}", path))
}

/// Writes the snapshot beside `path` and renames it into place once synced.
async fn write_snapshot(path: &Path, snapshot: &mut Snapshot) -> Result<()> {
    snapshot.saved_at = chrono::Utc::now();
    let json = snapshot.to_json()?;
    let staging = staging_path(path);

    let mut file = tokio::fs::File::create(&staging)
        .await
        .with_context(|| format!("creating {:?}", staging))?;
    file.write_all(json.as_bytes())
        .await
        .with_context(|| format!("writing snapshot {:?}", staging))?;
    file.sync_all().await?;
    drop(file);

    tokio::fs::rename(&staging, path)
        .await
        .with_context(|| format!("replacing snapshot {:?}", path))?;
    tracing::debug!(path = %path.display(), "snapshot saved");
    Ok(())
}

fn parse_account(input: &str) -> Result<AccountId> {
    AccountId::parse_or_label(input).with_context(|| format!("invalid account {input:?}"))
}

fn refuse_escrow(
    broker: &BetBroker<InMemoryLedger>,
    account: &AccountId,
    action: &str,
) -> Result<()> {
    if account == broker.escrow_account() {
        bail!("the escrow account {account} cannot {action}");
    }
    Ok(())
}

fn require_caller(cli: &Cli) -> Result<AccountId> {
    match &cli.caller {
        Some(caller) => parse_account(caller),
        None => bail!("this command needs a caller: pass --as <ACCOUNT>"),
    }
}

fn account_or_caller(cli: &Cli, account: Option<&str>) -> Result<AccountId> {
    match account {
        Some(account) => parse_account(account),
        None => require_caller(cli),
    }
}

fn status_label(status: WagerStatus) -> ColoredString {
    let text = status.to_string();
    match status {
        WagerStatus::Open => text.green(),
        WagerStatus::Closed => text.bright_black(),
        WagerStatus::Matched => text.yellow(),
        WagerStatus::Settled => text.cyan(),
        WagerStatus::Claimed => text.magenta(),
    }
}

fn print_wager(wager: &Wager) {
    println!("{}", format!("Wager {}", wager.id).green().bold());
    println!("{}", "═".repeat(50).bright_black());
    println!("{}: {}", "Event".yellow().bold(), wager.event_id);
    println!("{}: {}", "Status".yellow().bold(), status_label(wager.status()));
    println!("{}: {}", "Creator".yellow().bold(), wager.creator);
    println!("{}: {}", "Creator stake".yellow().bold(), wager.creator_amount);
    match &wager.taker {
        Some(taker) => println!("{}: {}", "Taker".yellow().bold(), taker),
        None => println!("{}: {}", "Taker".yellow().bold(), "none".bright_black()),
    }
    println!("{}: {}", "Taker stake".yellow().bold(), wager.taker_amount);
    println!("{}: {}", "Result".yellow().bold(), wager.result);
    println!("{}: {}", "In escrow".cyan().bold(), wager.custody());
    println!("{}", "═".repeat(50).bright_black());
}

fn print_wagers(wagers: &[Wager]) {
    if wagers.is_empty() {
        println!("{}", "No wagers.".bright_black());
        return;
    }
    for wager in wagers {
        let taker = wager
            .taker
            .map(|t| t.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "#{:<4} event {:<6} {:<8} {} ({}) vs {} ({})",
            wager.id,
            wager.event_id,
            status_label(wager.status()),
            wager.creator,
            wager.creator_amount,
            taker,
            wager.taker_amount
        );
    }
}

fn print_last_event(broker: &BetBroker<InMemoryLedger>) {
    if let Some(event) = broker.events().last() {
        print_event(event);
    }
}

fn print_event(event: &WagerEvent) {
    let name = event.name().green().bold();
    match event {
        WagerEvent::WagerCreated {
            id,
            event_id,
            creator,
            creator_amount,
            taker_amount,
        } => println!(
            "{name}(id={id}, event={event_id}, creator={creator}, creator_amount={creator_amount}, taker_amount={taker_amount})"
        ),
        WagerEvent::WagerMatched {
            id,
            event_id,
            creator,
            taker,
            creator_amount,
            taker_amount,
        } => println!(
            "{name}(id={id}, event={event_id}, creator={creator}, taker={taker}, creator_amount={creator_amount}, taker_amount={taker_amount})"
        ),
        WagerEvent::WagerClosed {
            id,
            event_id,
            creator,
            creator_amount,
        } => println!(
            "{name}(id={id}, event={event_id}, creator={creator}, creator_amount={creator_amount})"
        ),
        WagerEvent::GainsDistributed {
            id,
            event_id,
            creator,
            taker,
            creator_amount,
            taker_amount,
            result,
        } => println!(
            "{name}(id={id}, event={event_id}, creator={creator}, taker={taker}, creator_amount={creator_amount}, taker_amount={taker_amount}, result={result})"
        ),
    }
}
