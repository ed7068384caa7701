//! The two CSV reports of a run, both fed by simulation events.
//!
//! * `daily_status`: one row per simulated day.
//! * `patient_outcomes`: one row per patient who was refused or left a bed.
use log::error;
use serde::{Deserialize, Serialize};

use crate::context::Context;
use crate::define_report;
use crate::error::SimError;
use crate::hospital::Placement;
use crate::patient::{HealthState, PatientId, UrgencyLabel, WardKind};
use crate::report::{ContextReportExt, Report};
use crate::simulation::{DailyStatusEvent, PatientAdmittedEvent, PatientDepartedEvent};

pub const DAILY_STATUS_REPORT: &str = "daily_status";
pub const PATIENT_OUTCOME_REPORT: &str = "patient_outcomes";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyStatusReport {
    pub day: u32,
    pub icu_free: usize,
    pub general_free: usize,
    pub total_refused: u64,
    pub icu_occupied: usize,
    pub general_occupied: usize,
    pub boarding: usize,
    pub admitted: u64,
    pub discharged: u64,
    pub deceased: u64,
}

define_report!(DailyStatusReport);

impl From<DailyStatusEvent> for DailyStatusReport {
    fn from(event: DailyStatusEvent) -> Self {
        DailyStatusReport {
            day: event.day,
            icu_free: event.status.icu_free,
            general_free: event.status.general_free,
            total_refused: event.status.total_refused,
            icu_occupied: event.icu_occupied,
            general_occupied: event.general_occupied,
            boarding: event.boarding,
            admitted: event.stats.admitted,
            discharged: event.stats.discharged,
            deceased: event.stats.deceased,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Discharged,
    Deceased,
    Refused,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientOutcomeReport {
    pub day: u32,
    pub patient: PatientId,
    pub urgency: UrgencyLabel,
    /// Empty for refused patients.
    pub ward: Option<WardKind>,
    pub outcome: Outcome,
    pub days_stayed: u32,
    pub expected_los: f64,
}

define_report!(PatientOutcomeReport);

fn send_or_abort<T: Report>(context: &mut Context, report: T) {
    if let Err(error) = context.send_report(report) {
        error!("writing a report failed: {error}");
        context.abort(error);
    }
}

/// Creates both report files and subscribes their writers to the simulation events.
///
/// # Errors
///
/// Returns an error if a report file cannot be created.
pub fn init(context: &mut Context) -> Result<(), SimError> {
    context.add_report::<DailyStatusReport>(DAILY_STATUS_REPORT)?;
    context.add_report::<PatientOutcomeReport>(PATIENT_OUTCOME_REPORT)?;

    context.subscribe_to_event(|context, event: DailyStatusEvent| {
        send_or_abort(context, DailyStatusReport::from(event));
    });

    context.subscribe_to_event(|context, event: PatientDepartedEvent| {
        let outcome = if event.outcome == HealthState::Deceased {
            Outcome::Deceased
        } else {
            Outcome::Discharged
        };
        send_or_abort(
            context,
            PatientOutcomeReport {
                day: event.day,
                patient: event.patient,
                urgency: event.urgency,
                ward: event.ward,
                outcome,
                days_stayed: event.days_stayed,
                expected_los: event.expected_los,
            },
        );
    });

    context.subscribe_to_event(|context, event: PatientAdmittedEvent| {
        if event.placement == Placement::Refused {
            send_or_abort(
                context,
                PatientOutcomeReport {
                    day: event.day,
                    patient: event.patient,
                    urgency: event.urgency,
                    ward: None,
                    outcome: Outcome::Refused,
                    days_stayed: 0,
                    expected_los: event.expected_los,
                },
            );
        }
    });
    Ok(())
}
