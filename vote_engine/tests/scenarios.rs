//! End-to-end scenarios over the public `evaluate` entry point.

use vote_engine::{evaluate, Candidate, Method, Race, Vote};

fn race_abc() -> Race {
    Race::new("game", ["A", "B", "C"].map(Candidate::from)).unwrap()
}

fn ranked(voter: &str, race: &Race, names: &[&str]) -> Vote {
    Vote::ranked(voter, race, names.iter().map(|n| Candidate::from(*n)).collect()).unwrap()
}

fn weighted(voter: &str, race: &Race, pairs: &[(&str, f64)]) -> Vote {
    let mut vote = Vote::weighted(voter);
    for (name, rating) in pairs {
        vote.rate(race, Candidate::from(*name), *rating).unwrap();
    }
    vote
}

#[test]
fn plurality_counts_first_choices() {
    let race = race_abc();
    let votes = vec![
        Vote::single("v1", &race, Candidate::from("A")).unwrap(),
        Vote::single("v2", &race, Candidate::from("A")).unwrap(),
        Vote::single("v3", &race, Candidate::from("B")).unwrap(),
        Vote::single("v4", &race, Candidate::from("C")).unwrap(),
    ];
    let result = evaluate(&race, &votes, Method::SingleChoice).unwrap();
    assert_eq!(result.winners, [Candidate::from("A")].into());
}

#[test]
fn copeland_cycle_ties_three_ways() {
    let race = race_abc();
    let votes = vec![
        ranked("v1", &race, &["A", "B", "C"]),
        ranked("v2", &race, &["B", "C", "A"]),
        ranked("v3", &race, &["C", "A", "B"]),
    ];
    let result = evaluate(&race, &votes, Method::Copeland).unwrap();
    assert_eq!(result.winners.len(), 3);
}

#[test]
fn instant_runoff_transfers_to_a_majority() {
    let race = race_abc();
    let votes = vec![
        ranked("v1", &race, &["A"]),
        ranked("v2", &race, &["A"]),
        ranked("v3", &race, &["B"]),
        ranked("v4", &race, &["B"]),
        ranked("v5", &race, &["C", "A"]),
    ];
    let result = evaluate(&race, &votes, Method::InstantRunoff).unwrap();
    assert_eq!(result.winners, [Candidate::from("A")].into());
}

#[test]
fn weighted_runoff_records_flow_diagnostics() {
    let race = race_abc();
    let votes = vec![
        weighted("v1", &race, &[("A", 3.0), ("C", 1.0)]),
        weighted("v2", &race, &[("B", 2.0), ("C", 1.0)]),
        weighted("v3", &race, &[("A", 1.0)]),
    ];
    let result = evaluate(&race, &votes, Method::WeightedRunoff).unwrap();
    assert_eq!(result.winners, [Candidate::from("A")].into());
    let transfer_rounds: Vec<_> = result
        .rounds
        .iter()
        .filter(|r| !r.transfers.is_empty())
        .collect();
    assert!(!transfer_rounds.is_empty());
    for round in transfer_rounds {
        for flow in &round.transfers {
            assert!(flow.weight > 0.0);
        }
    }
}

#[test]
fn every_method_is_deterministic() {
    let race = race_abc();
    let votes = vec![
        weighted("v1", &race, &[("A", 2.0), ("B", 1.0)]),
        ranked("v2", &race, &["B", "C"]),
        Vote::single("v3", &race, Candidate::from("C")).unwrap(),
    ];
    for method in [
        Method::SingleChoice,
        Method::Copeland,
        Method::InstantRunoff,
        Method::DescendingPoints,
        Method::WeightedRunoff,
        Method::SingleRound,
    ] {
        let first = evaluate(&race, &votes, method).unwrap();
        let second = evaluate(&race, &votes, method).unwrap();
        assert_eq!(first, second, "method {:?}", method);
    }
}

#[test]
fn a_veto_excludes_a_candidate_under_every_method() {
    let race = race_abc();
    let mut angry = weighted("v1", &race, &[("B", 1.0)]);
    angry.veto_toggle(Candidate::from("A"));
    let votes = vec![
        angry,
        ranked("v2", &race, &["A", "B"]),
        ranked("v3", &race, &["A", "C"]),
        ranked("v4", &race, &["A"]),
    ];
    for method in [
        Method::SingleChoice,
        Method::Copeland,
        Method::InstantRunoff,
        Method::DescendingPoints,
        Method::WeightedRunoff,
        Method::SingleRound,
    ] {
        let result = evaluate(&race, &votes, method).unwrap();
        assert!(
            !result.winners.contains(&Candidate::from("A")),
            "method {:?} let a vetoed candidate win",
            method
        );
    }
}

#[test]
fn mass_tie_for_last_does_not_loop_forever() {
    let race = race_abc();
    // All three candidates tie at the bottom immediately.
    let votes = vec![
        weighted("v1", &race, &[("A", 1.0)]),
        weighted("v2", &race, &[("B", 1.0)]),
        weighted("v3", &race, &[("C", 1.0)]),
    ];
    let result = evaluate(&race, &votes, Method::WeightedRunoff).unwrap();
    assert_eq!(result.winners.len(), 3);
    assert_eq!(result.rounds.len(), 1);
}

#[test]
fn evaluating_a_foreign_vote_fails_fast() {
    let race = race_abc();
    let other = Race::new("other", ["X"].map(Candidate::from)).unwrap();
    let votes = vec![Vote::single("v1", &other, Candidate::from("X")).unwrap()];
    assert!(evaluate(&race, &votes, Method::SingleChoice).is_err());
}

#[test]
fn vote_records_round_trip_through_their_line_encoding() {
    let race = race_abc();
    let mut vetoed = weighted("v1", &race, &[("A", 3.0), ("C", -1.0)]);
    vetoed.veto_toggle(Candidate::from("B"));
    let mut shadow = weighted("v2", &race, &[("B", 0.5)]);
    shadow.set_shadow(true);
    let votes = vec![
        vetoed,
        shadow,
        ranked("v3", &race, &["C", "A"]),
        Vote::single("v4", &race, Candidate::from("B")).unwrap(),
    ];

    let lines: Vec<String> = votes
        .iter()
        .map(|v| serde_json::to_string(v).unwrap())
        .collect();
    let decoded: Vec<Vote> = lines
        .iter()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(decoded, votes);

    // Evaluating the decoded snapshot gives the same outcome.
    let a = evaluate(&race, &votes, Method::WeightedRunoff).unwrap();
    let b = evaluate(&race, &decoded, Method::WeightedRunoff).unwrap();
    assert_eq!(a, b);
}
