//! Change detection: pure diff of a report against the saved baseline.
//!
//! No store, no bus, no clock. Given the same inputs it always returns the
//! same output.

use std::collections::{BTreeSet, HashSet};

use super::report::Observation;
use super::subscription::PolledState;

/// Outcome of one diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    /// Keys to announce downstream, in first-reported order.
    pub new_keys: Vec<String>,
    /// Keys dropped from the baseline.
    pub pruned_keys: Vec<String>,
    /// Baseline to persist.
    pub next_state: PolledState,
}

/// Diff `reported` against `saved`.
///
/// - No baseline: nothing is new, the report becomes the baseline.
/// - `explicit_deletes` wins when non-empty.
/// - Otherwise a worker that just took over prunes whatever it no longer
///   sees; a steady-state worker only reports unpublished items, so absence
///   prunes nothing.
pub fn detect(
    saved: Option<&PolledState>,
    reported: &[String],
    explicit_deletes: &[String],
    first_from_worker: bool,
) -> Detection {
    let reported_set: BTreeSet<String> = reported.iter().cloned().collect();

    let Some(saved) = saved else {
        return Detection {
            new_keys: Vec::new(),
            pruned_keys: Vec::new(),
            next_state: PolledState {
                seen_keys: reported_set,
            },
        };
    };

    let mut emitted = HashSet::new();
    let mut new_keys = Vec::new();
    for key in reported {
        if !saved.contains(key) && emitted.insert(key.as_str()) {
            new_keys.push(key.clone());
        }
    }

    let pruned_keys: Vec<String> = if !explicit_deletes.is_empty() {
        explicit_deletes.to_vec()
    } else if first_from_worker {
        saved
            .seen_keys
            .difference(&reported_set)
            .cloned()
            .collect()
    } else {
        Vec::new()
    };

    let mut seen_keys = saved.seen_keys.clone();
    for key in &pruned_keys {
        seen_keys.remove(key);
    }
    seen_keys.extend(reported_set);

    Detection {
        new_keys,
        pruned_keys,
        next_state: PolledState { seen_keys },
    }
}

/// [`detect`] over a kind-independent observation.
pub fn detect_observation(saved: Option<&PolledState>, observation: &Observation) -> Detection {
    detect(
        saved,
        &observation.reported_keys,
        &observation.explicit_deletes,
        observation.first_from_worker,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn keys(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn range(start: u32, end: u32) -> Vec<String> {
        (start..=end).map(|i| i.to_string()).collect()
    }

    #[rstest]
    #[case::empty(&[], false)]
    #[case::some(&["a", "b", "b"], false)]
    #[case::rebalanced(&["a", "c"], true)]
    fn no_baseline_publishes_nothing(#[case] reported: &[&str], #[case] first: bool) {
        let reported = keys(reported);
        let d = detect(None, &reported, &keys(&["x"]), first);

        assert!(d.new_keys.is_empty());
        assert!(d.pruned_keys.is_empty());
        assert_eq!(d.next_state, PolledState::new(reported));
    }

    #[test]
    fn diff_has_no_hidden_state() {
        let saved = PolledState::new(["v1", "v2"]);
        let reported = keys(&["v2", "v3", "v4"]);

        let first = detect(Some(&saved), &reported, &[], false);
        let second = detect(Some(&saved), &reported, &[], false);
        assert_eq!(first, second);
        assert_eq!(first.new_keys, keys(&["v3", "v4"]));
    }

    #[rstest]
    #[case::empty_report(&[])]
    #[case::single_key(&["c"])]
    #[case::unrelated_keys(&["x", "y"])]
    fn steady_state_never_prunes(#[case] reported: &[&str]) {
        let saved = PolledState::new(["a", "b", "c"]);
        let d = detect(Some(&saved), &keys(reported), &[], false);

        assert!(d.pruned_keys.is_empty());
        for key in ["a", "b", "c"] {
            assert!(d.next_state.contains(key));
        }
    }

    #[test]
    fn rebalancing_reconciles_deletions() {
        let saved = PolledState::new(["a", "b", "c"]);
        let d = detect(Some(&saved), &keys(&["b", "c"]), &[], true);

        assert_eq!(d.pruned_keys, keys(&["a"]));
        assert!(d.new_keys.is_empty());
        assert_eq!(d.next_state, PolledState::new(["b", "c"]));
    }

    #[test]
    fn explicit_deletes_are_used_verbatim() {
        let saved = PolledState::new(["a", "b", "c"]);
        let d = detect(Some(&saved), &keys(&["c", "d"]), &keys(&["b", "zz"]), true);

        assert_eq!(d.pruned_keys, keys(&["b", "zz"]));
        assert_eq!(d.new_keys, keys(&["d"]));
        assert_eq!(d.next_state, PolledState::new(["a", "c", "d"]));
    }

    #[test]
    fn duplicates_in_report_are_announced_once() {
        let saved = PolledState::new(["v1"]);
        let d = detect(Some(&saved), &keys(&["v2", "v1", "v2"]), &[], false);
        assert_eq!(d.new_keys, keys(&["v2"]));
    }

    #[test]
    fn end_to_end_baseline_growth() {
        let saved = PolledState::new(["v1", "v2"]);
        let d = detect(Some(&saved), &keys(&["v1", "v2", "v3"]), &[], false);

        assert_eq!(d.new_keys, keys(&["v3"]));
        assert_eq!(d.next_state, PolledState::new(["v1", "v2", "v3"]));
    }

    #[test]
    fn long_running_sequence_with_rebalance() {
        // first collection: 0..=1000 becomes the baseline
        let d1 = detect(None, &range(0, 1000), &[], true);
        assert_eq!(d1.next_state.len(), 1001);

        // steady state: 1001..=1005 are new
        let d2 = detect(Some(&d1.next_state), &range(1001, 1005), &[], false);
        assert_eq!(d2.new_keys.len(), 5);
        assert_eq!(d2.next_state.len(), 1006);

        // rebalanced worker sees 3..=1011 and was told 0..=2 are gone
        let d3 = detect(Some(&d2.next_state), &range(3, 1011), &range(0, 2), true);
        assert_eq!(d3.new_keys, range(1006, 1011));
        assert_eq!(d3.next_state.len(), 1009);
    }
}
