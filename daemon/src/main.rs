//! ballotd: command-line front end for the election ledger.

mod commands;
mod config;
mod error;
mod store;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use ballot_types::{CandidateId, ElectionId, Identity, SystemClock};
use ballot_utils::{init_logging, LogFormat};

use crate::commands::{Action, Session, Window};
use crate::config::DaemonConfig;
use crate::error::DaemonError;
use crate::store::SnapshotStore;

#[derive(Parser)]
#[command(name = "ballotd", about = "Election ledger command-line client")]
struct Cli {
    /// Path to a TOML configuration file. File settings are the base; CLI
    /// flags and env vars override them.
    #[arg(long, env = "BALLOT_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding the ledger snapshot.
    #[arg(long, env = "BALLOT_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Identity the command runs as.
    #[arg(long = "as", env = "BALLOT_IDENTITY", default_value = "")]
    identity: String,

    /// Print results as JSON.
    #[arg(long)]
    json: bool,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "BALLOT_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "BALLOT_LOG_FORMAT")]
    log_format: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Create a new ledger in the data directory.
    Init {
        /// Administrator identity (defaults to the config value, then `--as`).
        #[arg(long)]
        admin: Option<String>,
    },
    /// Allow an identity to create elections (administrator only).
    Authorize { target: String },
    /// Withdraw an identity's creation rights (administrator only).
    Revoke { target: String },
    /// Create an election.
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: String,
        /// Opening time, unix seconds.
        #[arg(long)]
        start: Option<u64>,
        /// Closing time, unix seconds.
        #[arg(long)]
        end: Option<u64>,
        /// Opening time, seconds from now.
        #[arg(long)]
        opens_in: Option<u64>,
        /// Length of the voting window in seconds.
        #[arg(long)]
        lasts: Option<u64>,
    },
    /// Flip an election between active and inactive (administrator only).
    Toggle { election: u64 },
    /// Register a candidate on an election.
    AddCandidate {
        election: u64,
        name: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// Cast a vote.
    Vote { election: u64, candidate: u64 },
    /// Show one election.
    Show { election: u64 },
    /// List all elections.
    List,
    /// List an election's candidates.
    Candidates { election: u64 },
    /// Vote counts in registration order.
    Results { election: u64 },
    /// The leading candidate.
    Winner { election: u64 },
    /// Candidates ranked by votes.
    Standings { election: u64 },
    /// Whether an identity has voted, and for whom.
    HasVoted { election: u64, voter: String },
}

impl Command {
    fn into_action(self, config: &DaemonConfig, caller: &Identity) -> Action {
        match self {
            Command::Init { admin } => Action::Init {
                administrator: admin
                    .or_else(|| config.administrator.clone())
                    .map(Identity::new)
                    .unwrap_or_else(|| caller.clone()),
                creators: config
                    .authorized_creators
                    .iter()
                    .map(|c| Identity::new(c.as_str()))
                    .collect(),
            },
            Command::Authorize { target } => Action::Authorize(Identity::new(target)),
            Command::Revoke { target } => Action::Revoke(Identity::new(target)),
            Command::Create {
                title,
                description,
                start,
                end,
                opens_in,
                lasts,
            } => Action::Create {
                title,
                description,
                window: Window {
                    start,
                    end,
                    opens_in,
                    lasts,
                },
            },
            Command::Toggle { election } => Action::Toggle(ElectionId::new(election)),
            Command::AddCandidate {
                election,
                name,
                description,
            } => Action::AddCandidate {
                election: ElectionId::new(election),
                name,
                description,
            },
            Command::Vote { election, candidate } => Action::Vote {
                election: ElectionId::new(election),
                candidate: CandidateId::new(candidate),
            },
            Command::Show { election } => Action::Show(ElectionId::new(election)),
            Command::List => Action::List,
            Command::Candidates { election } => Action::Candidates(ElectionId::new(election)),
            Command::Results { election } => Action::Results(ElectionId::new(election)),
            Command::Winner { election } => Action::Winner(ElectionId::new(election)),
            Command::Standings { election } => Action::Standings(ElectionId::new(election)),
            Command::HasVoted { election, voter } => Action::HasVoted {
                election: ElectionId::new(election),
                voter: Identity::new(voter),
            },
        }
    }
}

fn load_config(cli: &Cli) -> Result<DaemonConfig, DaemonError> {
    let mut config = match &cli.config {
        Some(path) => DaemonConfig::from_toml_file(path)?,
        None => DaemonConfig::default(),
    };
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(format) = &cli.log_format {
        config.log_format = format.clone();
    }
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_logging(LogFormat::parse(&config.log_format), &config.log_level);
    if let Some(path) = &cli.config {
        tracing::debug!(path = %path.display(), "loaded config");
    }

    let caller = Identity::new(cli.identity.as_str());
    let as_json = cli.json;
    let action = cli.command.into_action(&config, &caller);

    let session = Session {
        store: SnapshotStore::new(config.ledger_path()),
        clock: Arc::new(SystemClock),
        policy: config.policy(),
        caller,
    };
    let output = session.run(action)?;
    println!("{}", output.render(as_json)?);
    Ok(())
}
