use std::collections::BTreeSet;
use std::fs;
use std::process::exit;

use clap::Parser;
use log::{info, warn};
use serde_json::json;
use snafu::{ResultExt, Snafu};
use vote_engine::{Candidate, Method};

use crate::args::Args;
use crate::session::{Session, SessionError};
use crate::store::{FileStore, MemoryStore, StoreError, VoteStore};

mod args;
mod session;
mod store;

#[derive(Debug, Snafu)]
enum CliError {
    #[snafu(display("unknown evaluation method {method:?}"))]
    UnknownMethod { method: String },
    #[snafu(display("could not parse amendment {spec:?}"))]
    BadAmendment { spec: String },
    #[snafu(display("no candidates given and the votes mention none"))]
    EmptySlate,
    #[snafu(display("--record-unspent requires --unspent"))]
    NoUnspentFile,
    #[snafu(display("could not encode the summary"))]
    EncodeSummary { source: serde_json::Error },
    #[snafu(display("could not write the summary to {path:?}"))]
    WriteSummary {
        source: std::io::Error,
        path: String,
    },
    #[snafu(context(false), display("{source}"))]
    Session { source: SessionError },
    #[snafu(context(false), display("{source}"))]
    Store { source: StoreError },
}

fn store_at(path: Option<&str>) -> Box<dyn VoteStore> {
    match path {
        Some(path) => Box::new(FileStore::new(path)),
        None => Box::new(MemoryStore::default()),
    }
}

fn split_amendment(spec: &str) -> Result<(&str, &str), CliError> {
    spec.split_once(':')
        .filter(|(voter, rest)| !voter.is_empty() && !rest.is_empty())
        .ok_or_else(|| CliError::BadAmendment {
            spec: spec.to_string(),
        })
}

/// Replays the command-line ranked submissions, rating amendments and veto
/// toggles on top of the votes file, in that order.
fn apply_amendments(session: &mut Session, args: &Args) -> Result<(), CliError> {
    for spec in &args.rank {
        let (voter, ranking) = split_amendment(spec)?;
        let ranking = ranking
            .split('>')
            .map(|name| session.interpret(name.trim()))
            .collect::<Result<Vec<Candidate>, _>>()?;
        session.submit(voter, ranking)?;
    }
    for spec in &args.rate {
        let (voter, assignment) = split_amendment(spec)?;
        let (name, value) = assignment.split_once('=').ok_or_else(|| CliError::BadAmendment {
            spec: spec.to_string(),
        })?;
        let rating: f64 = value.trim().parse().map_err(|_| CliError::BadAmendment {
            spec: spec.to_string(),
        })?;
        let candidate = session.interpret(name.trim())?;
        session.rate(voter, candidate, rating)?;
    }
    for spec in &args.veto {
        let (voter, name) = split_amendment(spec)?;
        let candidate = session.interpret(name.trim())?;
        let vetoed = session.veto(voter, candidate.clone())?;
        info!(
            "{} {} their veto of {}",
            voter,
            if vetoed { "set" } else { "lifted" },
            candidate
        );
    }
    Ok(())
}

fn run(args: &Args) -> Result<(), CliError> {
    let method: Method = args.method.parse().map_err(|_| CliError::UnknownMethod {
        method: args.method.clone(),
    })?;
    if args.record_unspent && args.unspent.is_none() {
        return NoUnspentFileSnafu.fail();
    }
    let votes = FileStore::new(&args.votes).load()?;
    info!("read {} votes from {:?}", votes.len(), args.votes);

    let candidates: BTreeSet<Candidate> = match &args.candidates {
        Some(names) if !names.is_empty() => {
            names.iter().map(|n| Candidate::new(n.clone())).collect()
        }
        _ => votes
            .iter()
            .flat_map(|vote| {
                let mut mentioned = vote.rankings();
                mentioned.extend(vote.vetoes().iter().cloned());
                mentioned
            })
            .collect(),
    };
    if candidates.is_empty() {
        return EmptySlateSnafu.fail();
    }

    let mut session = Session::new(
        store_at(args.defaults.as_deref()),
        store_at(args.unspent.as_deref()),
    );
    session.start_election(&args.race, candidates)?;
    for vote in votes {
        session.submit_vote(vote)?;
    }
    for name in &args.suggest {
        session.suggest(Candidate::new(name.clone()))?;
    }
    apply_amendments(&mut session, args)?;
    for voter in &args.save_default {
        if !session.save_default_vote(voter)? {
            warn!("{} has no vote to save as a default", voter);
        }
    }
    for voter in &args.clear_default {
        session.clear_default_vote(voter)?;
    }
    session.apply_default_votes()?;
    info!(
        "tallying {} live votes over {:?}",
        session.vote_count()?,
        session.race()?.candidates()
    );

    let result = session.pick_winner(method)?;
    let winners: Vec<&str> = result.winners.iter().map(|c| c.name()).collect();
    info!("winners: {:?}", winners);

    // Assemble the final json
    let summary = json!({
        "race": args.race,
        "method": args.method,
        "winners": winners,
        "rounds": result.rounds,
    });
    let pretty = serde_json::to_string_pretty(&summary).context(EncodeSummarySnafu)?;
    match &args.out {
        Some(path) => fs::write(path, &pretty).context(WriteSummarySnafu { path: path.clone() })?,
        None => println!("{}", pretty),
    }

    if args.record_unspent {
        match result.winners.iter().next() {
            Some(winner) => {
                if result.winners.len() > 1 {
                    warn!(
                        "{} tied winners, recording unspent weight against {:?}",
                        result.winners.len(),
                        winner.name()
                    );
                }
                let winner = winner.clone();
                session.record_unspent(&winner)?;
            }
            None => warn!("no winner, skipping the unspent-weight update"),
        }
    }
    Ok(())
}


fn main() {
    let args = Args::parse();
    let mut builder = env_logger::Builder::from_default_env();
    if args.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.init();

    if let Err(err) = run(&args) {
        log::error!("{}", err);
        exit(1);
    }
}
