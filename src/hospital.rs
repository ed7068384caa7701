//! The hospital aggregate: two wards, the health model that ticks their occupants, and the
//! cumulative counters.
//!
//! All mutation goes through [`Hospital::admit`] and [`Hospital::advance_day`]. Both keep the
//! counters consistent with the wards, which [`Hospital::check_invariants`] verifies:
//!
//! * no ward holds more patients than it has beds, and
//! * `admitted == discharged + deceased + occupied`.
use log::{debug, trace};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::SimError;
use crate::health::HealthStateMachine;
use crate::patient::{HealthState, PatientId, PatientRecord, WardKind};
use crate::ward::Ward;

/// Where a patient is sent. `Refused` means no bed is granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Placement {
    Ward(WardKind),
    Refused,
}

impl Placement {
    #[must_use]
    pub fn is_admitted(self) -> bool {
        matches!(self, Placement::Ward(_))
    }
}

/// Monotone event counters for a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HospitalStats {
    pub admitted: u64,
    pub discharged: u64,
    pub deceased: u64,
    pub refused: u64,
}

/// The daily snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HospitalStatus {
    pub icu_free: usize,
    pub general_free: usize,
    pub total_refused: u64,
}

/// Cumulative counters reported at the end of a run. `total_discharged` counts every patient
/// who left a bed, alive or not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub admitted: u64,
    pub discharged: u64,
    pub deceased: u64,
    pub total_discharged: u64,
    pub refused: u64,
}

/// What happened to the population during one call to [`Hospital::advance_day`].
#[derive(Debug, Default)]
pub struct DayOutcome {
    /// Records of patients who left a bed today, in the order they left.
    pub departures: Vec<PatientRecord>,
    /// Critical patients who remain in a General bed after today's tick.
    pub boarding: Vec<PatientId>,
}

#[derive(Debug)]
pub struct Hospital {
    icu: Ward,
    general: Ward,
    stats: HospitalStats,
    health: HealthStateMachineHandle,
}

// `HealthStateMachine` holds sampling tables that are not worth printing in a state dump.
struct HealthStateMachineHandle(HealthStateMachine);

impl std::fmt::Debug for HealthStateMachineHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "HealthStateMachine({} rows)", self.0.table().len())
    }
}

impl Hospital {
    /// Creates a hospital with the built-in transition table.
    ///
    /// # Panics
    ///
    /// Panics if either capacity is zero.
    #[must_use]
    pub fn new(icu_capacity: usize, general_capacity: usize) -> Self {
        Hospital::with_health_model(
            icu_capacity,
            general_capacity,
            HealthStateMachine::default(),
        )
    }

    #[must_use]
    pub fn with_health_model(
        icu_capacity: usize,
        general_capacity: usize,
        health: HealthStateMachine,
    ) -> Self {
        Hospital {
            icu: Ward::new(WardKind::Icu, icu_capacity),
            general: Ward::new(WardKind::General, general_capacity),
            stats: HospitalStats::default(),
            health: HealthStateMachineHandle(health),
        }
    }

    #[must_use]
    pub fn ward(&self, kind: WardKind) -> &Ward {
        match kind {
            WardKind::Icu => &self.icu,
            WardKind::General => &self.general,
        }
    }

    fn ward_mut(&mut self, kind: WardKind) -> &mut Ward {
        match kind {
            WardKind::Icu => &mut self.icu,
            WardKind::General => &mut self.general,
        }
    }

    #[must_use]
    pub fn stats(&self) -> HospitalStats {
        self.stats
    }

    #[must_use]
    pub fn total_occupancy(&self) -> usize {
        self.icu.occupancy().0 + self.general.occupancy().0
    }

    /// Critical patients currently in General beds.
    #[must_use]
    pub fn boarding_count(&self) -> usize {
        self.general
            .patients()
            .filter(|patient| patient.health_state() == HealthState::Critical)
            .count()
    }

    /// Finds an occupied patient in either ward.
    #[must_use]
    pub fn patient(&self, id: PatientId) -> Option<&PatientRecord> {
        self.icu.get(id).or_else(|| self.general.get(id))
    }

    /// Places `patient` according to `placement`. Returns the placement actually realised:
    /// the requested ward on success, otherwise `Refused`. This is the only place where the
    /// `admitted` and `refused` counters change.
    pub fn admit(&mut self, patient: PatientRecord, placement: Placement) -> Placement {
        let id = patient.id();
        let realised = match placement {
            Placement::Ward(kind) => match self.ward_mut(kind).try_admit(patient) {
                Ok(()) => Placement::Ward(kind),
                Err(_) => Placement::Refused,
            },
            Placement::Refused => Placement::Refused,
        };
        match realised {
            Placement::Ward(kind) => {
                self.stats.admitted += 1;
                debug!("patient {id} admitted to {kind}");
            }
            Placement::Refused => {
                self.stats.refused += 1;
                debug!("patient {id} refused");
            }
        }
        realised
    }

    /// Advances every occupied patient by one day and releases those who left.
    ///
    /// Each ward is visited on a snapshot of its occupant ids. A patient whose stay has
    /// reached the expected length is discharged without a draw; everyone else gets one draw
    /// from the health model.
    pub fn advance_day<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<DayOutcome, SimError> {
        let mut outcome = DayOutcome::default();
        for kind in [WardKind::Icu, WardKind::General] {
            for id in self.ward(kind).patient_ids() {
                let state = self.tick_patient(kind, id, rng)?;
                match state {
                    HealthState::Discharged => {
                        let record = self.ward_mut(kind).release(id)?;
                        self.stats.discharged += 1;
                        outcome.departures.push(record);
                    }
                    HealthState::Deceased => {
                        let record = self.ward_mut(kind).release(id)?;
                        self.stats.deceased += 1;
                        outcome.departures.push(record);
                    }
                    HealthState::Critical if kind == WardKind::General => {
                        outcome.boarding.push(id);
                    }
                    HealthState::Stable | HealthState::Critical => {}
                }
            }
        }
        Ok(outcome)
    }

    fn tick_patient<R: Rng + ?Sized>(
        &mut self,
        kind: WardKind,
        id: PatientId,
        rng: &mut R,
    ) -> Result<HealthState, SimError> {
        let Hospital {
            icu,
            general,
            health,
            ..
        } = self;
        let ward = match kind {
            WardKind::Icu => icu,
            WardKind::General => general,
        };
        let patient = ward
            .get_mut(id)
            .ok_or(SimError::PatientNotFound { ward: kind, patient: id })?;

        patient.increment_days_stayed();
        let current = patient.health_state();
        let next = if patient.los_expired() && current != HealthState::Deceased {
            HealthState::Discharged
        } else {
            health
                .0
                .next_state(current, patient.urgency(), patient.assigned_ward(), rng)?
        };
        trace!(
            "patient {id} day {}: {current} -> {next}",
            patient.days_stayed()
        );
        patient.set_health_state(next)?;
        Ok(next)
    }

    /// The daily snapshot. Reading it has no side effects.
    #[must_use]
    pub fn status(&self) -> HospitalStatus {
        HospitalStatus {
            icu_free: self.icu.free_beds(),
            general_free: self.general.free_beds(),
            total_refused: self.stats.refused,
        }
    }

    #[must_use]
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            admitted: self.stats.admitted,
            discharged: self.stats.discharged,
            deceased: self.stats.deceased,
            total_discharged: self.stats.discharged + self.stats.deceased,
            refused: self.stats.refused,
        }
    }

    /// Verifies the capacity and conservation invariants.
    pub fn check_invariants(&self) -> Result<(), SimError> {
        for ward in [&self.icu, &self.general] {
            let (occupied, capacity) = ward.occupancy();
            if occupied > capacity {
                return Err(SimError::CapacityViolation {
                    ward: ward.kind(),
                    occupied,
                    capacity,
                });
            }
        }
        let occupied = self.total_occupancy();
        let HospitalStats {
            admitted,
            discharged,
            deceased,
            ..
        } = self.stats;
        if admitted != discharged + deceased + occupied as u64 {
            return Err(SimError::ConservationViolation {
                admitted,
                discharged,
                deceased,
                occupied,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::{TransitionKey, TransitionRow, TransitionTable};
    use crate::patient::tests::patient;
    use crate::patient::UrgencyLabel;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    /// A model in which nobody changes state on their own.
    fn frozen_model() -> HealthStateMachine {
        let stay = |key: TransitionKey| TransitionRow {
            key,
            probabilities: match key {
                TransitionKey::Stable { .. } => [1.0, 0.0, 0.0, 0.0],
                TransitionKey::Critical { .. } => [0.0, 1.0, 0.0, 0.0],
            },
        };
        let rows: Vec<TransitionRow> = crate::health::default_rows()
            .into_iter()
            .map(|row| stay(row.key))
            .collect();
        HealthStateMachine::new(TransitionTable::from_rows(&rows).unwrap())
    }

    /// A model in which everyone dies at the first draw.
    fn lethal_model() -> HealthStateMachine {
        let rows: Vec<TransitionRow> = crate::health::default_rows()
            .into_iter()
            .map(|row| TransitionRow {
                key: row.key,
                probabilities: [0.0, 0.0, 0.0, 1.0],
            })
            .collect();
        HealthStateMachine::new(TransitionTable::from_rows(&rows).unwrap())
    }

    #[test]
    fn critical_overflow_then_refusal() {
        let mut hospital = Hospital::new(1, 1);
        let first = hospital.admit(
            patient(1, UrgencyLabel::Critical, 5.0),
            Placement::Ward(WardKind::Icu),
        );
        assert_eq!(first, Placement::Ward(WardKind::Icu));
        let refused = hospital.admit(
            patient(2, UrgencyLabel::Critical, 5.0),
            Placement::Ward(WardKind::Icu),
        );
        assert_eq!(refused, Placement::Refused);
        assert_eq!(hospital.stats().refused, 1);
        assert_eq!(hospital.stats().admitted, 1);
    }

    #[test]
    fn refused_decision_counts_as_refusal() {
        let mut hospital = Hospital::new(2, 2);
        let placement = hospital.admit(patient(1, UrgencyLabel::Low, 3.0), Placement::Refused);
        assert_eq!(placement, Placement::Refused);
        assert_eq!(hospital.stats().refused, 1);
        assert_eq!(hospital.total_occupancy(), 0);
        hospital.check_invariants().unwrap();
    }

    #[test]
    fn los_expiry_overrides_draw() {
        let mut hospital = Hospital::with_health_model(2, 2, frozen_model());
        let mut rng = SmallRng::seed_from_u64(3);
        hospital.admit(
            patient(1, UrgencyLabel::Critical, 2.0),
            Placement::Ward(WardKind::Icu),
        );
        hospital.admit(
            patient(2, UrgencyLabel::Medium, 2.0),
            Placement::Ward(WardKind::General),
        );

        let day_one = hospital.advance_day(&mut rng).unwrap();
        assert!(day_one.departures.is_empty());
        assert_eq!(hospital.total_occupancy(), 2);

        let day_two = hospital.advance_day(&mut rng).unwrap();
        assert_eq!(day_two.departures.len(), 2);
        for record in &day_two.departures {
            assert_eq!(record.health_state(), HealthState::Discharged);
            assert_eq!(record.days_stayed(), 2);
        }
        assert_eq!(hospital.stats().discharged, 2);
        assert_eq!(hospital.total_occupancy(), 0);
        hospital.check_invariants().unwrap();
    }

    #[test]
    fn fractional_los_discharges_on_the_following_day() {
        let mut hospital = Hospital::with_health_model(1, 1, frozen_model());
        let mut rng = SmallRng::seed_from_u64(3);
        hospital.admit(
            patient(1, UrgencyLabel::Low, 1.5),
            Placement::Ward(WardKind::General),
        );
        assert!(hospital.advance_day(&mut rng).unwrap().departures.is_empty());
        assert_eq!(hospital.advance_day(&mut rng).unwrap().departures.len(), 1);
    }

    #[test]
    fn deaths_are_released_and_counted() {
        let mut hospital = Hospital::with_health_model(1, 2, lethal_model());
        let mut rng = SmallRng::seed_from_u64(11);
        hospital.admit(
            patient(1, UrgencyLabel::Critical, 9.0),
            Placement::Ward(WardKind::Icu),
        );
        hospital.admit(
            patient(2, UrgencyLabel::Medium, 9.0),
            Placement::Ward(WardKind::General),
        );
        let outcome = hospital.advance_day(&mut rng).unwrap();
        let departed: Vec<PatientId> = outcome.departures.iter().map(PatientRecord::id).collect();
        assert_eq!(departed, vec![PatientId(1), PatientId(2)]);
        assert!(outcome
            .departures
            .iter()
            .all(|r| r.health_state() == HealthState::Deceased));
        assert_eq!(hospital.stats().deceased, 2);
        assert!(hospital.patient(PatientId(1)).is_none());
        assert_eq!(
            outcome.departures[0].assigned_ward(),
            Some(WardKind::Icu),
            "assigned ward is kept after departure"
        );
        hospital.check_invariants().unwrap();
    }

    #[test]
    fn critical_in_general_is_reported_as_boarding() {
        let mut hospital = Hospital::with_health_model(1, 3, frozen_model());
        let mut rng = SmallRng::seed_from_u64(5);
        hospital.admit(
            patient(1, UrgencyLabel::Critical, 10.0),
            Placement::Ward(WardKind::Icu),
        );
        hospital.admit(
            patient(2, UrgencyLabel::Critical, 10.0),
            Placement::Ward(WardKind::General),
        );
        hospital.admit(
            patient(3, UrgencyLabel::Medium, 10.0),
            Placement::Ward(WardKind::General),
        );
        let outcome = hospital.advance_day(&mut rng).unwrap();
        assert_eq!(outcome.boarding, vec![PatientId(2)]);
        assert_eq!(hospital.boarding_count(), 1);

        // A Critical overflow admitted after the tick boards too.
        hospital.admit(
            patient(4, UrgencyLabel::Critical, 10.0),
            Placement::Ward(WardKind::General),
        );
        assert_eq!(hospital.boarding_count(), 2);
        assert_eq!(
            hospital.patient(PatientId(2)).unwrap().health_state(),
            HealthState::Critical
        );
    }

    #[test]
    fn days_stayed_increments_once_per_day() {
        let mut hospital = Hospital::with_health_model(1, 1, frozen_model());
        let mut rng = SmallRng::seed_from_u64(5);
        hospital.admit(
            patient(1, UrgencyLabel::Medium, 30.0),
            Placement::Ward(WardKind::General),
        );
        for day in 1..=5 {
            hospital.advance_day(&mut rng).unwrap();
            assert_eq!(hospital.patient(PatientId(1)).unwrap().days_stayed(), day);
        }
    }

    #[test]
    fn missing_transition_row_aborts_the_tick() {
        let rows = [TransitionRow {
            key: TransitionKey::Critical {
                ward: Some(WardKind::Icu),
            },
            probabilities: [0.3, 0.6, 0.05, 0.05],
        }];
        let model = HealthStateMachine::new(TransitionTable::from_rows(&rows).unwrap());
        let mut hospital = Hospital::with_health_model(1, 1, model);
        let mut rng = SmallRng::seed_from_u64(5);
        hospital.admit(
            patient(1, UrgencyLabel::Low, 30.0),
            Placement::Ward(WardKind::General),
        );
        let err = hospital.advance_day(&mut rng).unwrap_err();
        assert!(matches!(err, SimError::UnknownTransition { .. }));
        assert!(err.is_invariant_breach());
    }

    #[test]
    fn status_is_idempotent() {
        let mut hospital = Hospital::new(3, 5);
        hospital.admit(
            patient(1, UrgencyLabel::Critical, 4.0),
            Placement::Ward(WardKind::Icu),
        );
        hospital.admit(patient(2, UrgencyLabel::Low, 4.0), Placement::Refused);
        let first = hospital.status();
        assert_eq!(first, hospital.status());
        assert_eq!(
            first,
            HospitalStatus {
                icu_free: 2,
                general_free: 5,
                total_refused: 1,
            }
        );
    }

    #[test]
    fn conservation_holds_over_a_long_run() {
        let mut hospital = Hospital::new(3, 6);
        let mut rng = SmallRng::seed_from_u64(2024);
        let mut next_id = 0;
        for _ in 0..200 {
            hospital.advance_day(&mut rng).unwrap();
            for urgency in [UrgencyLabel::Critical, UrgencyLabel::Medium, UrgencyLabel::Low] {
                next_id += 1;
                let kind = if urgency == UrgencyLabel::Critical {
                    WardKind::Icu
                } else {
                    WardKind::General
                };
                hospital.admit(patient(next_id, urgency, 4.0), Placement::Ward(kind));
            }
            hospital.check_invariants().unwrap();
            assert!(hospital.ward(WardKind::Icu).occupancy().0 <= 3);
            assert!(hospital.ward(WardKind::General).occupancy().0 <= 6);
        }
        let summary = hospital.summary();
        assert_eq!(
            summary.total_discharged,
            summary.discharged + summary.deceased
        );
        assert_eq!(summary.admitted + summary.refused, next_id);
    }
}
