//! The resource-conditioned health model.
//!
//! Each day an occupied patient moves between health states according to a first-order Markov
//! chain. The transition probabilities for a Stable patient depend on the patient's urgency
//! label; those for a Critical patient depend on the bed class the patient actually received.
//! The chain is stored as data in a [`TransitionTable`] and sampled with one weighted draw per
//! call, so the table can be audited, replaced and tested independently of allocation.
use rand::distr::weighted::WeightedIndex;
use rand::distr::Distribution;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::SimError;
use crate::hashing::HashMap;
use crate::patient::{HealthState, UrgencyLabel, WardKind};

/// Order of the entries in a probability row.
pub const ROW_ORDER: [HealthState; 4] = [
    HealthState::Stable,
    HealthState::Critical,
    HealthState::Discharged,
    HealthState::Deceased,
];

const RENORMALIZE_TOLERANCE: f64 = 1e-6;

/// Selects the row of the transition table for a non-terminal patient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "from")]
pub enum TransitionKey {
    Stable { urgency: UrgencyLabel },
    Critical { ward: Option<WardKind> },
}

impl TransitionKey {
    /// Returns `None` for terminal states, which have no outgoing transitions.
    #[must_use]
    pub fn for_patient(
        state: HealthState,
        urgency: UrgencyLabel,
        ward: Option<WardKind>,
    ) -> Option<Self> {
        match state {
            HealthState::Stable => Some(TransitionKey::Stable { urgency }),
            HealthState::Critical => Some(TransitionKey::Critical { ward }),
            HealthState::Discharged | HealthState::Deceased => None,
        }
    }
}

/// One row of the table as it appears in a parameters file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransitionRow {
    #[serde(flatten)]
    pub key: TransitionKey,
    /// Probabilities in [`ROW_ORDER`].
    pub probabilities: [f64; 4],
}

struct CompiledRow {
    probabilities: [f64; 4],
    index: WeightedIndex<f64>,
}

/// A validated table of transition probabilities.
pub struct TransitionTable {
    rows: HashMap<TransitionKey, CompiledRow>,
}

impl TransitionTable {
    /// Builds a table from rows. Rows must contain finite, non-negative probabilities whose
    /// sum is within floating-point drift of one; such rows are renormalized. A later row
    /// with the same key replaces an earlier one.
    pub fn from_rows(rows: &[TransitionRow]) -> Result<Self, SimError> {
        let mut compiled = HashMap::default();
        for row in rows {
            let probabilities = normalize(row)?;
            let index = WeightedIndex::new(probabilities)
                .map_err(|e| SimError::InvalidTransitionRow(format!("{:?}: {e}", row.key)))?;
            compiled.insert(
                row.key,
                CompiledRow {
                    probabilities,
                    index,
                },
            );
        }
        Ok(TransitionTable { rows: compiled })
    }

    /// The probability row for `key`, in [`ROW_ORDER`].
    #[must_use]
    pub fn probabilities(&self, key: TransitionKey) -> Option<[f64; 4]> {
        self.rows.get(&key).map(|row| row.probabilities)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl Default for TransitionTable {
    fn default() -> Self {
        TransitionTable::from_rows(&default_rows())
            .expect("the built-in transition rows are valid")
    }
}

fn normalize(row: &TransitionRow) -> Result<[f64; 4], SimError> {
    if row.probabilities.iter().any(|p| !p.is_finite() || *p < 0.0) {
        return Err(SimError::InvalidTransitionRow(format!(
            "{:?}: probabilities must be finite and non-negative, got {:?}",
            row.key, row.probabilities
        )));
    }
    let sum: f64 = row.probabilities.iter().sum();
    if (sum - 1.0).abs() > RENORMALIZE_TOLERANCE {
        return Err(SimError::InvalidTransitionRow(format!(
            "{:?}: probabilities sum to {sum}",
            row.key
        )));
    }
    Ok(row.probabilities.map(|p| p / sum))
}

/// The built-in rows.
///
/// A Critical-urgency patient who has stabilised uses the Medium row: stabilising does not
/// lower the risk below what a Medium admission carries.
#[must_use]
pub fn default_rows() -> Vec<TransitionRow> {
    use TransitionKey::{Critical, Stable};
    vec![
        TransitionRow {
            key: Stable {
                urgency: UrgencyLabel::Low,
            },
            probabilities: [0.80, 0.05, 0.15, 0.00],
        },
        TransitionRow {
            key: Stable {
                urgency: UrgencyLabel::Medium,
            },
            probabilities: [0.80, 0.10, 0.05, 0.05],
        },
        TransitionRow {
            key: Stable {
                urgency: UrgencyLabel::Critical,
            },
            probabilities: [0.80, 0.10, 0.05, 0.05],
        },
        TransitionRow {
            key: Critical {
                ward: Some(WardKind::Icu),
            },
            probabilities: [0.30, 0.60, 0.05, 0.05],
        },
        TransitionRow {
            key: Critical {
                ward: Some(WardKind::General),
            },
            probabilities: [0.10, 0.50, 0.05, 0.35],
        },
        TransitionRow {
            key: Critical { ward: None },
            probabilities: [0.00, 0.40, 0.00, 0.60],
        },
    ]
}

/// Draws the next health state of a patient.
#[derive(Default)]
pub struct HealthStateMachine {
    table: TransitionTable,
}

impl HealthStateMachine {
    #[must_use]
    pub fn new(table: TransitionTable) -> Self {
        HealthStateMachine { table }
    }

    #[must_use]
    pub fn table(&self) -> &TransitionTable {
        &self.table
    }

    /// Returns the next state for a patient in `current`. Terminal states are returned
    /// unchanged without consuming randomness. A combination with no row in the table is an
    /// error.
    pub fn next_state<R: Rng + ?Sized>(
        &self,
        current: HealthState,
        urgency: UrgencyLabel,
        ward: Option<WardKind>,
        rng: &mut R,
    ) -> Result<HealthState, SimError> {
        let Some(key) = TransitionKey::for_patient(current, urgency, ward) else {
            return Ok(current);
        };
        let row = self.table.rows.get(&key).ok_or(SimError::UnknownTransition {
            state: current,
            urgency,
            ward,
        })?;
        Ok(ROW_ORDER[row.index.sample(rng)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use rand::rngs::SmallRng;
    use rand::{RngCore, SeedableRng};

    fn frequencies(
        machine: &HealthStateMachine,
        current: HealthState,
        urgency: UrgencyLabel,
        ward: Option<WardKind>,
        trials: usize,
    ) -> [f64; 4] {
        let mut rng = SmallRng::seed_from_u64(42);
        let mut counts = [0usize; 4];
        for _ in 0..trials {
            let next = machine.next_state(current, urgency, ward, &mut rng).unwrap();
            let index = ROW_ORDER.iter().position(|s| *s == next).unwrap();
            counts[index] += 1;
        }
        counts.map(|c| c as f64 / trials as f64)
    }

    #[test]
    fn default_rows_sum_to_one() {
        let table = TransitionTable::default();
        assert_eq!(table.len(), 6);
        for row in default_rows() {
            let probabilities = table.probabilities(row.key).unwrap();
            assert_approx_eq!(probabilities.iter().sum::<f64>(), 1.0, 1e-12);
        }
    }

    #[test]
    fn terminal_states_short_circuit_without_drawing() {
        let machine = HealthStateMachine::default();
        let mut rng = SmallRng::seed_from_u64(7);
        let mut untouched = SmallRng::seed_from_u64(7);
        for state in [HealthState::Discharged, HealthState::Deceased] {
            for ward in [None, Some(WardKind::Icu), Some(WardKind::General)] {
                let next = machine
                    .next_state(state, UrgencyLabel::Critical, ward, &mut rng)
                    .unwrap();
                assert_eq!(next, state);
            }
        }
        assert_eq!(rng.next_u64(), untouched.next_u64());
    }

    #[test]
    fn missing_row_is_an_error() {
        let rows: Vec<TransitionRow> = default_rows()
            .into_iter()
            .filter(|row| {
                row.key
                    != TransitionKey::Stable {
                        urgency: UrgencyLabel::Critical,
                    }
            })
            .collect();
        let machine = HealthStateMachine::new(TransitionTable::from_rows(&rows).unwrap());
        let mut rng = SmallRng::seed_from_u64(1);
        let result = machine.next_state(
            HealthState::Stable,
            UrgencyLabel::Critical,
            Some(WardKind::Icu),
            &mut rng,
        );
        assert!(matches!(
            result,
            Err(SimError::UnknownTransition {
                state: HealthState::Stable,
                urgency: UrgencyLabel::Critical,
                ..
            })
        ));
    }

    #[test]
    fn drifting_rows_are_renormalized() {
        let row = TransitionRow {
            key: TransitionKey::Critical { ward: None },
            probabilities: [0.1, 0.2, 0.3, 0.400_000_000_1],
        };
        let table = TransitionTable::from_rows(&[row]).unwrap();
        let probabilities = table.probabilities(row.key).unwrap();
        assert_approx_eq!(probabilities.iter().sum::<f64>(), 1.0, 1e-15);
    }

    #[test]
    fn rejects_invalid_rows() {
        let key = TransitionKey::Critical { ward: None };
        for probabilities in [
            [0.5, 0.5, 0.5, 0.0],
            [1.2, -0.2, 0.0, 0.0],
            [f64::NAN, 0.5, 0.5, 0.0],
            [0.0, 0.0, 0.0, 0.0],
        ] {
            let result = TransitionTable::from_rows(&[TransitionRow { key, probabilities }]);
            assert!(matches!(result, Err(SimError::InvalidTransitionRow(_))));
        }
    }

    #[test]
    fn zero_probability_outcomes_never_occur() {
        let machine = HealthStateMachine::default();
        let observed = frequencies(
            &machine,
            HealthState::Critical,
            UrgencyLabel::Critical,
            None,
            5_000,
        );
        assert_eq!(observed[0], 0.0);
        assert_eq!(observed[2], 0.0);

        let observed = frequencies(
            &machine,
            HealthState::Stable,
            UrgencyLabel::Low,
            Some(WardKind::General),
            5_000,
        );
        assert_eq!(observed[3], 0.0);
    }

    #[test]
    fn empirical_frequencies_match_rows() {
        let machine = HealthStateMachine::default();
        let observed = frequencies(
            &machine,
            HealthState::Critical,
            UrgencyLabel::Critical,
            Some(WardKind::General),
            50_000,
        );
        let expected = [0.10, 0.50, 0.05, 0.35];
        for (o, e) in observed.iter().zip(expected) {
            assert_approx_eq!(*o, e, 0.01);
        }
    }

    #[test]
    fn rows_deserialize_from_json() {
        let json = r#"[
            {"from": "Critical", "ward": "ICU", "probabilities": [0.3, 0.6, 0.05, 0.05]},
            {"from": "Critical", "ward": null, "probabilities": [0.0, 0.4, 0.0, 0.6]},
            {"from": "Stable", "urgency": "Low", "probabilities": [0.8, 0.05, 0.15, 0.0]}
        ]"#;
        let rows: Vec<TransitionRow> = serde_json::from_str(json).unwrap();
        assert_eq!(
            rows[0].key,
            TransitionKey::Critical {
                ward: Some(WardKind::Icu)
            }
        );
        assert_eq!(rows[1].key, TransitionKey::Critical { ward: None });
        assert_eq!(
            rows[2].key,
            TransitionKey::Stable {
                urgency: UrgencyLabel::Low
            }
        );
    }
}
