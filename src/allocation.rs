//! Supervisor allocation editing.
//!
//! A thesis form holds an ordered list of supervisor slots, each with a
//! percentage share. The list always sums to exactly 100 after structural
//! edits (add/remove); manual percentage edits are left alone and caught
//! by form validation at submit time.

use serde::{Deserialize, Serialize};

/// Upper bound on supervisor slots per thesis.
pub const MAX_PARTICIPANTS: usize = 5;

/// One supervisor slot under editing. `person` is unassigned until a user
/// is picked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub person: Option<String>,
    pub percentage: i32,
}

impl Allocation {
    #[must_use]
    pub fn unassigned(percentage: i32) -> Self {
        Self {
            person: None,
            percentage,
        }
    }
}

/// Rewrites every share to an even split. 100 rarely divides evenly; the
/// leftover lands on the first entry so the total stays exactly 100.
fn redistribute(entries: &mut [Allocation]) {
    let n = entries.len() as i32;
    if n == 0 {
        return;
    }
    let share = 100 / n;
    for entry in entries.iter_mut() {
        entry.percentage = share;
    }
    entries[0].percentage = 100 - share * (n - 1);
}

/// Appends an unassigned slot and redistributes shares evenly.
/// A full list (`MAX_PARTICIPANTS`) is returned unchanged.
#[must_use]
pub fn add_participant(entries: &[Allocation]) -> Vec<Allocation> {
    if entries.len() >= MAX_PARTICIPANTS {
        return entries.to_vec();
    }
    let mut out = entries.to_vec();
    out.push(Allocation::unassigned(0));
    redistribute(&mut out);
    out
}

/// Removes the slot at `index` and redistributes shares evenly.
/// Removing the sole remaining slot (or an out-of-range index) is a no-op.
#[must_use]
pub fn remove_participant(entries: &[Allocation], index: usize) -> Vec<Allocation> {
    if entries.len() <= 1 || index >= entries.len() {
        return entries.to_vec();
    }
    let mut out = entries.to_vec();
    out.remove(index);
    redistribute(&mut out);
    out
}

/// Replaces the person at `index` without touching any percentage.
#[must_use]
pub fn update_person(
    entries: &[Allocation],
    index: usize,
    person: Option<String>,
) -> Vec<Allocation> {
    let mut out = entries.to_vec();
    if let Some(entry) = out.get_mut(index) {
        entry.person = person;
    }
    out
}

/// Replaces a single percentage without renormalizing the rest. The
/// resulting sum may drift from 100; submission validation owns that.
#[must_use]
pub fn update_percentage(entries: &[Allocation], index: usize, value: i32) -> Vec<Allocation> {
    let mut out = entries.to_vec();
    if let Some(entry) = out.get_mut(index) {
        entry.percentage = value;
    }
    out
}

#[must_use]
pub fn total(entries: &[Allocation]) -> i32 {
    entries.iter().map(|e| e.percentage).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(percentages: &[i32]) -> Vec<Allocation> {
        percentages
            .iter()
            .map(|&p| Allocation::unassigned(p))
            .collect()
    }

    fn percentages(entries: &[Allocation]) -> Vec<i32> {
        entries.iter().map(|e| e.percentage).collect()
    }

    #[test]
    fn test_add_to_even_split_of_two() {
        let out = add_participant(&entries(&[50, 50]));
        assert_eq!(percentages(&out), vec![34, 33, 33]);
        assert_eq!(out[2].person, None);
    }

    #[test]
    fn test_add_preserves_order_and_persons() {
        let mut start = entries(&[60, 40]);
        start[0].person = Some("alice".into());
        start[1].person = Some("bob".into());
        let out = add_participant(&start);
        assert_eq!(out[0].person.as_deref(), Some("alice"));
        assert_eq!(out[1].person.as_deref(), Some("bob"));
        assert_eq!(out[2].person, None);
    }

    #[test]
    fn test_add_at_capacity_is_noop() {
        let start = entries(&[20, 20, 20, 20, 20]);
        assert_eq!(add_participant(&start), start);
    }

    #[test]
    fn test_remove_from_two_yields_full_share() {
        let out = remove_participant(&entries(&[50, 50]), 0);
        assert_eq!(percentages(&out), vec![100]);
    }

    #[test]
    fn test_remove_sole_entry_is_noop() {
        let start = entries(&[100]);
        assert_eq!(remove_participant(&start, 0), start);
    }

    #[test]
    fn test_remove_out_of_range_is_noop() {
        let start = entries(&[50, 50]);
        assert_eq!(remove_participant(&start, 2), start);
    }

    #[test]
    fn test_manual_percentage_edit_does_not_renormalize() {
        let out = update_percentage(&entries(&[50, 50]), 0, 70);
        assert_eq!(percentages(&out), vec![70, 50]);
        assert_eq!(total(&out), 120);
    }

    #[test]
    fn test_update_person_leaves_percentages() {
        let out = update_person(&entries(&[34, 33, 33]), 1, Some("carol".into()));
        assert_eq!(percentages(&out), vec![34, 33, 33]);
        assert_eq!(out[1].person.as_deref(), Some("carol"));
    }

    #[test]
    fn test_sum_is_exactly_100_under_any_edit_sequence() {
        // Deterministic pseudo-random walk over add/remove operations.
        let mut state = entries(&[100]);
        let mut seed: u64 = 0x5eed;
        for _ in 0..500 {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            if seed % 2 == 0 {
                state = add_participant(&state);
            } else {
                let index = (seed >> 8) as usize % state.len();
                state = remove_participant(&state, index);
            }
            assert!(!state.is_empty());
            assert!(state.len() <= MAX_PARTICIPANTS);
            assert_eq!(total(&state), 100, "sum drifted at {:?}", percentages(&state));
        }
    }

    #[test]
    fn test_identical_edits_are_deterministic() {
        let run = || {
            let mut state = entries(&[100]);
            state = add_participant(&state);
            state = add_participant(&state);
            state = remove_participant(&state, 1);
            state = add_participant(&state);
            state
        };
        assert_eq!(run(), run());
    }
}
