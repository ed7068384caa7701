//! The simulation clock.
//!
//! [`init`] builds the hospital from the [`Parameters`] global property and schedules one plan
//! per simulated day. Each day:
//!
//! 1. every occupied patient is advanced by one health draw and departures are released,
//! 2. the day's arrivals are generated, predicted, allocated and admitted (or refused),
//! 3. the hospital invariants are checked and a [`DailyStatusEvent`] is emitted.
//!
//! Any error from these steps is fatal: the hospital state is dumped to the log, the context is
//! aborted and `Context::execute` returns the error.
use std::cell::{Cell, Ref, RefCell};

use log::{debug, error, info, trace, warn};

use crate::allocation::AllocationPolicy;
use crate::arrivals::{ArrivalCount, ArrivalFeed, SyntheticArrivals};
use crate::context::{Context, ExecutionPhase, SimEvent};
use crate::define_data_plugin;
use crate::define_rng;
use crate::error::SimError;
use crate::global_properties::ContextGlobalPropertiesExt;
use crate::health::HealthStateMachine;
use crate::hospital::{DayOutcome, Hospital, HospitalStats, HospitalStatus, Placement, RunSummary};
use crate::parameters::{HospitalParameters, Parameters};
use crate::patient::{HealthState, PatientId, PatientRecord, UrgencyLabel, WardKind};
use crate::prediction::{PredictionService, TriageRules};
use crate::random::ContextRandomExt;

define_rng!(HealthRng);
define_rng!(ArrivalRng);

/// Emitted once per arrival after the allocation decision has been applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PatientAdmittedEvent {
    pub day: u32,
    pub patient: PatientId,
    pub urgency: UrgencyLabel,
    pub expected_los: f64,
    pub placement: Placement,
}
impl SimEvent for PatientAdmittedEvent {}

/// Emitted when a patient leaves a bed, alive or not.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PatientDepartedEvent {
    pub day: u32,
    pub patient: PatientId,
    pub urgency: UrgencyLabel,
    pub ward: Option<WardKind>,
    pub outcome: HealthState,
    pub days_stayed: u32,
    pub expected_los: f64,
}
impl SimEvent for PatientDepartedEvent {}

impl PatientDepartedEvent {
    fn from_record(day: u32, record: &PatientRecord) -> Self {
        PatientDepartedEvent {
            day,
            patient: record.id(),
            urgency: record.urgency(),
            ward: record.assigned_ward(),
            outcome: record.health_state(),
            days_stayed: record.days_stayed(),
            expected_los: record.expected_los(),
        }
    }
}

/// A Critical patient is still in a General bed after the daily tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardingRiskEvent {
    pub day: u32,
    pub patient: PatientId,
}
impl SimEvent for BoardingRiskEvent {}

/// End-of-day snapshot, taken after admissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyStatusEvent {
    pub day: u32,
    pub status: HospitalStatus,
    pub icu_occupied: usize,
    pub general_occupied: usize,
    /// Critical patients in General beds at the end of the day, including overflow admitted
    /// that day.
    pub boarding: usize,
    pub stats: HospitalStats,
}
impl SimEvent for DailyStatusEvent {}

struct SimulationState {
    hospital: RefCell<Hospital>,
    policy: AllocationPolicy,
    predictor: Box<dyn PredictionService>,
    feed: Box<dyn ArrivalFeed>,
    arrivals: ArrivalCount,
    days: u32,
    next_patient_id: Cell<u64>,
    summary: Option<RunSummary>,
}

define_data_plugin!(SimulationPlugin, Option<SimulationState>, None);

fn simulation_state(context: &Context) -> &SimulationState {
    context
        .get_data_container(SimulationPlugin)
        .and_then(Option::as_ref)
        .expect("You must initialize the hospital before using it")
}

pub trait ContextHospitalExt {
    /// Builds the hospital, allocation policy and arrival model from `parameters` with the
    /// built-in arrival feed and triage rules.
    ///
    /// # Errors
    ///
    /// Returns an error if `parameters` are invalid.
    fn init_hospital(&mut self, parameters: &HospitalParameters) -> Result<(), SimError> {
        self.init_hospital_with(
            parameters,
            Box::new(SyntheticArrivals::default()),
            Box::new(TriageRules),
        )
    }

    /// Like [`ContextHospitalExt::init_hospital`] with a caller-supplied arrival feed and
    /// prediction service.
    ///
    /// # Errors
    ///
    /// Returns an error if `parameters` are invalid or the hospital was already initialized.
    fn init_hospital_with(
        &mut self,
        parameters: &HospitalParameters,
        feed: Box<dyn ArrivalFeed>,
        predictor: Box<dyn PredictionService>,
    ) -> Result<(), SimError>;

    /// # Panics
    ///
    /// Panics if the hospital has not been initialized.
    fn hospital(&self) -> Ref<'_, Hospital>;

    fn hospital_status(&self) -> HospitalStatus {
        self.hospital().status()
    }

    /// Runs the daily health tick on every occupied bed using the `HealthRng` stream.
    ///
    /// # Errors
    ///
    /// Returns the first engine error raised by the tick.
    fn advance_hospital_day(&mut self) -> Result<DayOutcome, SimError>;

    /// Generates one arrival, predicts its urgency and stay, applies the allocation policy and
    /// admits or refuses the patient. Emits a [`PatientAdmittedEvent`].
    ///
    /// # Errors
    ///
    /// Returns an error if the predicted stay cannot be used to build a patient record.
    fn admit_arrival(&mut self, day: u32) -> Result<Placement, SimError>;

    /// The summary stored at the end of a completed run.
    fn run_summary(&self) -> Option<RunSummary>;
}

impl ContextHospitalExt for Context {
    fn init_hospital_with(
        &mut self,
        parameters: &HospitalParameters,
        feed: Box<dyn ArrivalFeed>,
        predictor: Box<dyn PredictionService>,
    ) -> Result<(), SimError> {
        parameters.validate()?;
        let container = self.get_data_container_mut(SimulationPlugin);
        if container.is_some() {
            return Err(SimError::SimError(
                "the hospital has already been initialized".to_string(),
            ));
        }
        let health = HealthStateMachine::new(parameters.transition_table()?);
        *container = Some(SimulationState {
            hospital: RefCell::new(Hospital::with_health_model(
                parameters.icu_capacity,
                parameters.general_capacity,
                health,
            )),
            policy: AllocationPolicy::new(parameters.low_acuity_reserve_percent),
            predictor,
            feed,
            arrivals: parameters.arrivals,
            days: parameters.days,
            next_patient_id: Cell::new(1),
            summary: None,
        });
        info!(
            "hospital initialized with {} ICU and {} General beds for {} days",
            parameters.icu_capacity, parameters.general_capacity, parameters.days
        );
        Ok(())
    }

    fn hospital(&self) -> Ref<'_, Hospital> {
        simulation_state(self).hospital.borrow()
    }

    fn advance_hospital_day(&mut self) -> Result<DayOutcome, SimError> {
        let state = simulation_state(self);
        self.sample(HealthRng, |rng| state.hospital.borrow_mut().advance_day(rng))
    }

    fn admit_arrival(&mut self, day: u32) -> Result<Placement, SimError> {
        let state = simulation_state(self);
        let features = self.sample(ArrivalRng, |rng| state.feed.next_features(rng));
        let prediction = state.predictor.predict(&features);

        let id = PatientId(state.next_patient_id.get());
        state.next_patient_id.set(id.0 + 1);
        let record = PatientRecord::new(id, features, prediction.urgency, prediction.expected_los)?;

        let placement = {
            let mut hospital = state.hospital.borrow_mut();
            let decision = state.policy.decide(prediction.urgency, &hospital);
            hospital.admit(record, decision)
        };
        debug!(
            "day {day}: patient {id} ({}, {:?}, expected stay {}) -> {placement:?}",
            prediction.urgency, features.chief_complaint, prediction.expected_los
        );

        self.emit_event(PatientAdmittedEvent {
            day,
            patient: id,
            urgency: prediction.urgency,
            expected_los: prediction.expected_los,
            placement,
        });
        Ok(placement)
    }

    fn run_summary(&self) -> Option<RunSummary> {
        self.get_data_container(SimulationPlugin)
            .and_then(Option::as_ref)
            .and_then(|state| state.summary)
    }
}

fn run_day(context: &mut Context, day: u32) -> Result<(), SimError> {
    trace!("starting day {day}");
    let outcome = context.advance_hospital_day()?;
    for record in &outcome.departures {
        context.emit_event(PatientDepartedEvent::from_record(day, record));
    }
    for &patient in &outcome.boarding {
        warn!("day {day}: patient {patient} is Critical in a General bed");
        context.emit_event(BoardingRiskEvent { day, patient });
    }

    let arrivals = simulation_state(context).arrivals;
    let count = context.sample(ArrivalRng, |rng| arrivals.sample(rng))?;
    for _ in 0..count {
        context.admit_arrival(day)?;
    }

    let event = {
        let hospital = context.hospital();
        hospital.check_invariants()?;
        DailyStatusEvent {
            day,
            status: hospital.status(),
            icu_occupied: hospital.ward(WardKind::Icu).occupancy().0,
            general_occupied: hospital.ward(WardKind::General).occupancy().0,
            boarding: hospital.boarding_count(),
            stats: hospital.stats(),
        }
    };
    info!(
        "day {day}: {count} arrivals, ICU free {}, General free {}, refused so far {}",
        event.status.icu_free, event.status.general_free, event.status.total_refused
    );
    context.emit_event(event);
    Ok(())
}

fn finish(context: &mut Context) {
    let summary = context.hospital().summary();
    info!(
        "run complete: admitted {}, discharged {}, deceased {}, refused {}",
        summary.admitted, summary.discharged, summary.deceased, summary.refused
    );
    if let Some(state) = context.get_data_container_mut(SimulationPlugin).as_mut() {
        state.summary = Some(summary);
    }
}

/// Builds the hospital from the [`Parameters`] global property (or the defaults if it was
/// never set) and schedules every day of the run plus the end-of-run summary.
///
/// # Errors
///
/// Returns an error if the parameters are invalid.
pub fn init(context: &mut Context) -> Result<(), SimError> {
    let parameters = context
        .get_global_property_value(Parameters)
        .cloned()
        .unwrap_or_default();
    context.init_hospital(&parameters)?;
    schedule_days(context, parameters.days);
    Ok(())
}

/// Schedules days `1..=days` at times `1.0..=days` and the summary after the last day.
pub fn schedule_days(context: &mut Context, days: u32) {
    for day in 1..=days {
        context.add_plan(f64::from(day), move |context| {
            if let Err(error) = run_day(context, day) {
                let dump = format!("{:#?}", *context.hospital());
                error!("day {day} failed: {error}\nhospital state:\n{dump}");
                context.abort(error);
            }
        });
    }
    context.add_plan_with_phase(f64::from(days), finish, ExecutionPhase::Last);
}
