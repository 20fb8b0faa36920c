//! End-to-end synthesis scenarios
//!
//! Each test builds a small plant, translates a specification and runs
//! the full search, checking the root verdict and, where a controller
//! exists, its shape.

#[cfg(test)]
mod test_scenarios {
    use std::collections::BTreeSet;

    use vigil_automata::ClockConstraint;
    use vigil_automata::ta::{TimedAutomaton, Transition};
    use vigil_logic::MTLFormula;
    use vigil_logic::interval::TimeInterval;
    use vigil_logic::AtomicProposition;
    use vigil_search::controller::create_controller;
    use vigil_search::heuristics::CompositeHeuristic;
    use vigil_search::search::{SearchOutcome, TreeSearch};
    use vigil_search::tree::NodeLabel;
    use vigil_search::{SearchConfig, location_names};
    use vigil_translation::translate;

    fn actions(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn propositions(names: &[&str]) -> Vec<AtomicProposition> {
        names.iter().map(AtomicProposition::new).collect()
    }

    /// One location, one controllable action, an unbounded eventuality:
    /// the controller wins by firing the action right away.
    #[test]
    fn single_action_eventuality_is_realizable() {
        let mut plant = TimedAutomaton::new(["a".to_string()], "l0".to_string(), []);
        plant.add_clock("x");
        plant
            .add_transition(Transition::unguarded(
                "l0".to_string(),
                "a".to_string(),
                "l0".to_string(),
            ))
            .unwrap();
        let spec = MTLFormula::finally(MTLFormula::ap("a"), TimeInterval::at_least(0));
        let ata = translate(&spec, propositions(&["a"])).unwrap();

        let search = TreeSearch::new(
            &plant,
            &ata,
            actions(&["a"]),
            BTreeSet::new(),
            0,
            SearchConfig::default(),
            None,
            Box::new(CompositeHeuristic::standard()),
        )
        .unwrap();
        assert_eq!(search.search(1).unwrap(), SearchOutcome::Realizable);
        assert_eq!(search.root_label(), NodeLabel::Top);

        // The controller fires `a` immediately, in the initial region.
        let controller = create_controller(&search).unwrap();
        let initial = controller.initial_location().clone();
        let immediate = controller
            .transitions()
            .find(|t| t.source == initial && t.guards.contains(&("x".to_string(), ClockConstraint::less_equal(0))))
            .expect("no immediate controller transition");
        assert_eq!(immediate.symbol, "a");
    }

    /// The environment can move the plant into a forbidden location; no
    /// controller choice prevents it.
    #[test]
    fn unavoidable_unsafe_location_is_unrealizable() {
        let mut plant = TimedAutomaton::new(
            ["ok".to_string(), "bad".to_string(), "stay".to_string()],
            "s0".to_string(),
            ["s0".to_string(), "s1".to_string()],
        );
        plant.add_clock("x");
        plant
            .add_transition(Transition::unguarded(
                "s0".to_string(),
                "ok".to_string(),
                "s0".to_string(),
            ))
            .unwrap();
        plant
            .add_transition(Transition::unguarded(
                "s0".to_string(),
                "bad".to_string(),
                "s1".to_string(),
            ))
            .unwrap();
        plant
            .add_transition(Transition::unguarded(
                "s1".to_string(),
                "stay".to_string(),
                "s1".to_string(),
            ))
            .unwrap();

        // The specification talks about plant locations: never reach s1.
        let spec = MTLFormula::globally(!MTLFormula::ap("s1"), TimeInterval::unbounded());
        let ata = translate(&spec, propositions(&["s0", "s1"])).unwrap();

        let search = TreeSearch::new(
            &plant,
            &ata,
            actions(&["ok"]),
            actions(&["bad", "stay"]),
            0,
            SearchConfig { location_constraints: true, ..SearchConfig::default() },
            Some(location_names()),
            Box::new(CompositeHeuristic::standard()),
        )
        .unwrap();
        assert_eq!(search.search(1).unwrap(), SearchOutcome::Unrealizable);
        assert_eq!(search.root_label(), NodeLabel::Bottom);
        assert!(create_controller(&search).is_err());
    }

    /// A bounded eventuality the plant can only satisfy too late: the
    /// environment realizes the violation by acting at time 2.
    #[test]
    fn late_response_refutes_a_bounded_eventuality() {
        let mut plant = TimedAutomaton::new(
            ["p".to_string()],
            "l0".to_string(),
            ["l0".to_string(), "l1".to_string()],
        );
        plant.add_clock("x");
        plant
            .add_transition(Transition::new(
                "l0".to_string(),
                "p".to_string(),
                "l1".to_string(),
                vec![("x".to_string(), ClockConstraint::equal_to(2))],
                [],
            ))
            .unwrap();
        let spec = MTLFormula::finally(MTLFormula::ap("p"), TimeInterval::closed(0, 1));
        let ata = translate(&spec, propositions(&["p"])).unwrap();

        let search = TreeSearch::new(
            &plant,
            &ata,
            BTreeSet::new(),
            actions(&["p"]),
            2,
            SearchConfig::default(),
            None,
            Box::new(CompositeHeuristic::standard()),
        )
        .unwrap();
        assert_eq!(search.search(1).unwrap(), SearchOutcome::Unrealizable);
    }

    /// Conveyor belt: after a move, the item may only be released once
    /// the belt has settled for more than two time units. The release
    /// guard enforces the settling time, so the specification holds.
    #[test]
    fn conveyor_belt_release_window_is_realizable() {
        let mut plant = TimedAutomaton::new(
            ["move".to_string(), "release".to_string()],
            "stopped".to_string(),
            ["stopped".to_string(), "moving".to_string()],
        );
        plant.add_clock("x");
        plant
            .add_transition(Transition::new(
                "stopped".to_string(),
                "move".to_string(),
                "moving".to_string(),
                vec![],
                ["x".to_string()],
            ))
            .unwrap();
        plant
            .add_transition(Transition::new(
                "moving".to_string(),
                "release".to_string(),
                "stopped".to_string(),
                vec![("x".to_string(), ClockConstraint::greater(2))],
                [],
            ))
            .unwrap();
        let spec = MTLFormula::ap("move")
            .dual_until(!MTLFormula::ap("release"), TimeInterval::closed(0, 2));
        let ata = translate(&spec, propositions(&["move", "release"])).unwrap();

        let search = TreeSearch::new(
            &plant,
            &ata,
            actions(&["move"]),
            actions(&["release"]),
            2,
            SearchConfig::default(),
            None,
            Box::new(CompositeHeuristic::standard()),
        )
        .unwrap();
        assert_eq!(search.search(1).unwrap(), SearchOutcome::Realizable);
        let controller = create_controller(&search).unwrap();
        assert!(controller.transitions().any(|t| t.symbol == "move"));
    }

    /// Build the two-process Fischer mutual exclusion protocol as one
    /// explicit timed automaton. Locations are `<p1>_<p2>_<lock>` with
    /// phases idle, setting, waiting and critical; process i must write
    /// the lock within one time unit and may enter its critical section
    /// after waiting at least two.
    fn fischer_plant() -> TimedAutomaton<String, String> {
        const PHASES: [&str; 4] = ["i", "s", "w", "c"];
        let location =
            |p1: &str, p2: &str, lock: usize| -> String { format!("{p1}_{p2}_{lock}") };
        let alphabet = [
            "req1", "set1", "enter1", "exit1", "req2", "set2", "enter2", "exit2",
        ]
        .map(str::to_string);
        let mut locations = Vec::new();
        for p1 in PHASES {
            for p2 in PHASES {
                for lock in 0..3 {
                    locations.push(location(p1, p2, lock));
                }
            }
        }
        let mut plant =
            TimedAutomaton::new(alphabet, location("i", "i", 0), locations.clone());
        for l in locations {
            plant.add_location(l);
        }
        plant.add_clock("x1");
        plant.add_clock("x2");
        let clock = |process: usize| format!("x{process}");
        // Transitions of process 1 for every phase of process 2, and
        // symmetrically.
        for (process, other_phases) in [(1, PHASES), (2, PHASES)] {
            for other in other_phases {
                let with = |mine: &str, others: &str, lock: usize| {
                    if process == 1 {
                        location(mine, others, lock)
                    } else {
                        location(others, mine, lock)
                    }
                };
                plant
                    .add_transition(Transition::new(
                        with("i", other, 0),
                        format!("req{process}"),
                        with("s", other, 0),
                        vec![],
                        [clock(process)],
                    ))
                    .unwrap();
                for lock in 0..3 {
                    plant
                        .add_transition(Transition::new(
                            with("s", other, lock),
                            format!("set{process}"),
                            with("w", other, process),
                            vec![(clock(process), ClockConstraint::less_equal(1))],
                            [clock(process)],
                        ))
                        .unwrap();
                }
                plant
                    .add_transition(Transition::new(
                        with("w", other, process),
                        format!("enter{process}"),
                        with("c", other, process),
                        vec![(clock(process), ClockConstraint::greater_equal(2))],
                        [],
                    ))
                    .unwrap();
                plant
                    .add_transition(Transition::new(
                        with("c", other, process),
                        format!("exit{process}"),
                        with("i", other, 0),
                        vec![],
                        [],
                    ))
                    .unwrap();
            }
        }
        plant
    }

    /// Mutual exclusion holds under every scheduling, so the search
    /// labels the root as winning without any controller choices.
    #[test]
    fn fischer_mutual_exclusion_is_safe() {
        let plant = fischer_plant();
        // The forbidden configurations: both processes critical.
        let both_critical = (0..3)
            .map(|lock| MTLFormula::ap(format!("c_c_{lock}")))
            .reduce(|acc, ap| acc | ap)
            .unwrap();
        let spec = MTLFormula::globally(!both_critical, TimeInterval::unbounded());
        let alphabet: Vec<_> = plant
            .locations()
            .iter()
            .map(|l| AtomicProposition::new(l.clone()))
            .collect();
        let ata = translate(&spec, alphabet).unwrap();

        let environment: BTreeSet<String> = plant.alphabet().iter().cloned().collect();
        let search = TreeSearch::new(
            &plant,
            &ata,
            BTreeSet::new(),
            environment,
            2,
            SearchConfig { location_constraints: true, ..SearchConfig::default() },
            Some(location_names()),
            Box::new(CompositeHeuristic::standard()),
        )
        .unwrap();
        assert_eq!(search.search(2).unwrap(), SearchOutcome::Realizable);

        let controller = create_controller(&search).unwrap();
        let num_locations = controller.locations().len();
        assert!(controller.transitions().count() <= num_locations * num_locations);
    }

    /// Cancelling the search right away leaves the root undecided.
    #[test]
    fn cancellation_keeps_the_root_undecided() {
        let plant = fischer_plant();
        let spec = MTLFormula::globally(!MTLFormula::ap("c_c_1"), TimeInterval::unbounded());
        let alphabet: Vec<_> = plant
            .locations()
            .iter()
            .map(|l| AtomicProposition::new(l.clone()))
            .collect();
        let ata = translate(&spec, alphabet).unwrap();
        let environment: BTreeSet<String> = plant.alphabet().iter().cloned().collect();
        let search = TreeSearch::new(
            &plant,
            &ata,
            BTreeSet::new(),
            environment,
            2,
            SearchConfig { location_constraints: true, ..SearchConfig::default() },
            Some(location_names()),
            Box::new(CompositeHeuristic::standard()),
        )
        .unwrap();
        search.cancel_flag().store(true, std::sync::atomic::Ordering::SeqCst);
        assert_eq!(search.search(1).unwrap(), SearchOutcome::Cancelled);
        assert_eq!(search.root_label(), NodeLabel::Unlabeled);
    }

    /// The node cap aborts the search with an inconclusive verdict.
    #[test]
    fn node_cap_yields_unknown() {
        let plant = fischer_plant();
        let spec = MTLFormula::globally(!MTLFormula::ap("c_c_1"), TimeInterval::unbounded());
        let alphabet: Vec<_> = plant
            .locations()
            .iter()
            .map(|l| AtomicProposition::new(l.clone()))
            .collect();
        let ata = translate(&spec, alphabet).unwrap();
        let environment: BTreeSet<String> = plant.alphabet().iter().cloned().collect();
        let search = TreeSearch::new(
            &plant,
            &ata,
            BTreeSet::new(),
            environment,
            2,
            SearchConfig {
                location_constraints: true,
                node_cap: Some(3),
                ..SearchConfig::default()
            },
            Some(location_names()),
            Box::new(CompositeHeuristic::standard()),
        )
        .unwrap();
        assert_eq!(search.search(1).unwrap(), SearchOutcome::Unknown);
    }

    /// Overlapping action sets are a configuration error.
    #[test]
    fn overlapping_action_sets_are_rejected() {
        let mut plant = TimedAutomaton::new(["a".to_string()], "l0".to_string(), []);
        plant.add_clock("x");
        plant
            .add_transition(Transition::unguarded(
                "l0".to_string(),
                "a".to_string(),
                "l0".to_string(),
            ))
            .unwrap();
        let spec = MTLFormula::finally(MTLFormula::ap("a"), TimeInterval::unbounded());
        let ata = translate(&spec, propositions(&["a"])).unwrap();
        let result = TreeSearch::new(
            &plant,
            &ata,
            actions(&["a"]),
            actions(&["a"]),
            0,
            SearchConfig::default(),
            None,
            Box::new(CompositeHeuristic::standard()),
        );
        assert!(matches!(result, Err(vigil_search::SearchError::OverlappingActions(_))));
    }
}
