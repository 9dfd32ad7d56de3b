//! Command execution against a snapshot-backed ledger.
//!
//! Each invocation loads the snapshot, performs exactly one ledger operation
//! on behalf of the caller, and writes the snapshot back if the operation
//! mutated state.

use std::fmt::Write as _;
use std::sync::Arc;

use serde_json::json;

use ballot_ledger::{Election, Ledger, LedgerEvent, LedgerPolicy};
use ballot_types::{CandidateId, Clock, ElectionId, Identity, Timestamp};
use ballot_utils::format_duration;

use crate::error::DaemonError;
use crate::store::SnapshotStore;

/// What to do. Mirrors the command-line subcommands with parsed values.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    Init {
        administrator: Identity,
        creators: Vec<Identity>,
    },
    Authorize(Identity),
    Revoke(Identity),
    Create {
        title: String,
        description: String,
        window: Window,
    },
    Toggle(ElectionId),
    AddCandidate {
        election: ElectionId,
        name: String,
        description: String,
    },
    Vote {
        election: ElectionId,
        candidate: CandidateId,
    },
    Show(ElectionId),
    List,
    Candidates(ElectionId),
    Results(ElectionId),
    Winner(ElectionId),
    Standings(ElectionId),
    HasVoted {
        election: ElectionId,
        voter: Identity,
    },
}

impl Action {
    fn mutates(&self) -> bool {
        matches!(
            self,
            Action::Init { .. }
                | Action::Authorize(_)
                | Action::Revoke(_)
                | Action::Create { .. }
                | Action::Toggle(_)
                | Action::AddCandidate { .. }
                | Action::Vote { .. }
        )
    }
}

/// A voting window given either as absolute unix seconds or relative to now.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Window {
    pub start: Option<u64>,
    pub end: Option<u64>,
    pub opens_in: Option<u64>,
    pub lasts: Option<u64>,
}

impl Window {
    pub fn resolve(&self, now: Timestamp) -> Result<(Timestamp, Timestamp), DaemonError> {
        let start = match (self.start, self.opens_in) {
            (Some(secs), None) => Timestamp::new(secs),
            (None, Some(delay)) => now.plus(delay),
            (Some(_), Some(_)) => {
                return Err(DaemonError::Usage("give either --start or --opens-in, not both".into()))
            }
            (None, None) => return Err(DaemonError::Usage("missing --start or --opens-in".into())),
        };
        let end = match (self.end, self.lasts) {
            (Some(secs), None) => Timestamp::new(secs),
            (None, Some(length)) => start.plus(length),
            (Some(_), Some(_)) => {
                return Err(DaemonError::Usage("give either --end or --lasts, not both".into()))
            }
            (None, None) => return Err(DaemonError::Usage("missing --end or --lasts".into())),
        };
        Ok((start, end))
    }
}

/// A command's result in both renderings.
#[derive(Debug)]
pub struct Output {
    pub text: String,
    pub json: serde_json::Value,
}

impl Output {
    fn new(text: impl Into<String>, json: serde_json::Value) -> Self {
        Self {
            text: text.into(),
            json,
        }
    }

    pub fn render(&self, as_json: bool) -> Result<String, DaemonError> {
        if as_json {
            Ok(serde_json::to_string_pretty(&self.json)?)
        } else {
            Ok(self.text.clone())
        }
    }
}

pub struct Session {
    pub store: SnapshotStore,
    pub clock: Arc<dyn Clock>,
    pub policy: LedgerPolicy,
    pub caller: Identity,
}

impl Session {
    pub fn run(&self, action: Action) -> Result<Output, DaemonError> {
        // Held from load through save; covers the init existence check too.
        let _lock = if action.mutates() {
            self.store.lock_exclusive()?
        } else {
            self.store.lock_shared()?
        };
        let ledger = self.open(&action)?;
        ledger.subscribe(Box::new(log_event));

        let output = self.execute(&ledger, &action)?;
        if action.mutates() {
            self.store.save(&ledger.snapshot())?;
        }
        Ok(output)
    }

    fn open(&self, action: &Action) -> Result<Ledger, DaemonError> {
        match action {
            Action::Init { administrator, .. } => {
                if self.store.exists() {
                    return Err(DaemonError::AlreadyInitialized(self.store.path().to_path_buf()));
                }
                Ok(Ledger::with_policy(
                    administrator.clone(),
                    Arc::clone(&self.clock),
                    self.policy,
                )?)
            }
            _ => Ok(Ledger::restore(
                self.store.load()?,
                Arc::clone(&self.clock),
                self.policy,
            )?),
        }
    }

    fn execute(&self, ledger: &Ledger, action: &Action) -> Result<Output, DaemonError> {
        let caller = &self.caller;
        let output = match action {
            Action::Init {
                administrator,
                creators,
            } => {
                for creator in creators {
                    ledger.authorize_creator(administrator, creator)?;
                }
                Output::new(
                    format!(
                        "initialized ledger at {} (administrator {administrator})",
                        self.store.path().display()
                    ),
                    json!({
                        "administrator": administrator,
                        "authorized_creators": ledger.authorized_creators(),
                    }),
                )
            }
            Action::Authorize(target) => {
                let changed = ledger.authorize_creator(caller, target)?;
                let text = if changed {
                    format!("{target} may now create elections")
                } else {
                    format!("{target} was already authorized")
                };
                Output::new(text, json!({ "target": target, "changed": changed }))
            }
            Action::Revoke(target) => {
                let changed = ledger.revoke_creator(caller, target)?;
                let text = if changed {
                    format!("{target} may no longer create elections")
                } else {
                    format!("{target} was not authorized")
                };
                Output::new(text, json!({ "target": target, "changed": changed }))
            }
            Action::Create {
                title,
                description,
                window,
            } => {
                let (start, end) = window.resolve(ledger.now())?;
                let id = ledger.create_election(caller, title.as_str(), description.as_str(), start, end)?;
                Output::new(
                    format!("created election {id}"),
                    json!({ "election_id": id }),
                )
            }
            Action::Toggle(id) => {
                let active = ledger.toggle_active(caller, *id)?;
                let state = if active { "active" } else { "inactive" };
                Output::new(
                    format!("election {id} is now {state}"),
                    json!({ "election_id": id, "active": active }),
                )
            }
            Action::AddCandidate {
                election,
                name,
                description,
            } => {
                let candidate = ledger.add_candidate(caller, *election, name.as_str(), description.as_str())?;
                Output::new(
                    format!("added candidate {candidate} ({name}) to election {election}"),
                    json!({ "election_id": election, "candidate_id": candidate }),
                )
            }
            Action::Vote {
                election,
                candidate,
            } => {
                ledger.cast_vote(caller, *election, *candidate)?;
                Output::new(
                    format!("{caller} voted for candidate {candidate} in election {election}"),
                    json!({ "election_id": election, "candidate_id": candidate, "voter": caller }),
                )
            }
            Action::Show(id) => {
                let election = ledger.election(*id)?;
                let status = ledger.status(*id)?;
                let mut text = describe(&election, ledger.now());
                let _ = write!(text, "\nstatus:      {status}");
                let mut json = serde_json::to_value(&election)?;
                json["status"] = json!(status);
                Output::new(text, json)
            }
            Action::List => {
                let elections = ledger.elections();
                let mut text = String::new();
                for election in &elections {
                    let status = election.status_at(ledger.now());
                    let _ = writeln!(
                        text,
                        "{:<6} {:<9} {} ({} votes)",
                        election.id.to_string(),
                        status.as_str(),
                        election.title,
                        election.total_votes
                    );
                }
                if elections.is_empty() {
                    text.push_str("no elections");
                }
                Output::new(text.trim_end(), serde_json::to_value(&elections)?)
            }
            Action::Candidates(id) => {
                let candidates = ledger.candidates(*id)?;
                let mut text = String::new();
                for c in &candidates {
                    let _ = writeln!(text, "{:<4} {}  {}", c.id, c.name, c.description);
                }
                if candidates.is_empty() {
                    text.push_str("no candidates");
                }
                Output::new(text.trim_end(), serde_json::to_value(&candidates)?)
            }
            Action::Results(id) => {
                let results = ledger.results(*id)?;
                let mut text = String::new();
                for c in &results.candidates {
                    let _ = writeln!(text, "{:<4} {:<24} {}", c.id, c.name, c.vote_count);
                }
                let _ = write!(text, "total votes: {}", results.total_votes);
                Output::new(text, serde_json::to_value(&results)?)
            }
            Action::Winner(id) => {
                let winner = ledger.winner(*id)?;
                Output::new(
                    format!(
                        "{} (candidate {}) with {} votes",
                        winner.name, winner.id, winner.vote_count
                    ),
                    serde_json::to_value(&winner)?,
                )
            }
            Action::Standings(id) => {
                let standings = ledger.standings(*id)?;
                let mut text = String::new();
                for s in &standings {
                    let _ = writeln!(
                        text,
                        "{:>3}. {:<24} {:>6} votes {:>3}.{:02}%",
                        s.rank,
                        s.candidate.name,
                        s.candidate.vote_count,
                        s.share_bps / 100,
                        s.share_bps % 100
                    );
                }
                if standings.is_empty() {
                    text.push_str("no candidates");
                }
                Output::new(text.trim_end(), serde_json::to_value(&standings)?)
            }
            Action::HasVoted { election, voter } => {
                if ledger.has_voted(*election, voter)? {
                    let choice = ledger.choice_of(*election, voter)?;
                    Output::new(
                        format!("{voter} voted for candidate {choice} in election {election}"),
                        json!({ "voted": true, "candidate_id": choice }),
                    )
                } else {
                    Output::new(
                        format!("{voter} has not voted in election {election}"),
                        json!({ "voted": false }),
                    )
                }
            }
        };
        Ok(output)
    }
}

fn describe(election: &Election, now: Timestamp) -> String {
    let timing = if now < election.start_time {
        format!("opens in {}", format_duration(election.start_time.remaining_from(now)))
    } else if now <= election.end_time {
        format!("closes in {}", format_duration(election.end_time.remaining_from(now)))
    } else {
        format!("closed {} ago", format_duration(election.end_time.elapsed_since(now)))
    };
    format!(
        "election:    {}\ntitle:       {}\ndescription: {}\ncreator:     {}\nwindow:      {} .. {} ({timing})\nactive:      {}\ncandidates:  {}\nvotes:       {}",
        election.id,
        election.title,
        election.description,
        election.creator,
        election.start_time.as_secs(),
        election.end_time.as_secs(),
        election.active,
        election.candidate_ids.len(),
        election.total_votes,
    )
}

fn log_event(event: &LedgerEvent) {
    tracing::info!(event = event.name(), details = ?event, "ledger event");
}
