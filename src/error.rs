use std::fmt::{self, Debug, Display};
use std::io;

use crate::patient::{HealthState, PatientId, UrgencyLabel, WardKind};

/// Provides `SimError` and maps other errors to
/// convert to a `SimError`
#[derive(Debug)]
#[allow(clippy::module_name_repetitions)]
pub enum SimError {
    IoError(io::Error),
    JsonError(serde_json::Error),
    CSVError(csv::Error),
    ClapError(clap::Error),
    /// No transition row covers this state / urgency / ward combination.
    UnknownTransition {
        state: HealthState,
        urgency: UrgencyLabel,
        ward: Option<WardKind>,
    },
    InvalidTransitionRow(String),
    CapacityViolation {
        ward: WardKind,
        occupied: usize,
        capacity: usize,
    },
    ConservationViolation {
        admitted: u64,
        discharged: u64,
        deceased: u64,
        occupied: usize,
    },
    PatientNotFound {
        ward: WardKind,
        patient: PatientId,
    },
    AbsorbingStateViolation {
        patient: PatientId,
        from: HealthState,
        to: HealthState,
    },
    UnknownUrgencyCode(u8),
    UnknownComplaint(String),
    InvalidExpectedLos(f64),
    InvalidParameters(String),
    GlobalPropertyError(String),
    ReportError(String),
    SimError(String),
}

impl SimError {
    /// Whether this error signals a broken engine invariant rather than bad input.
    #[must_use]
    pub fn is_invariant_breach(&self) -> bool {
        matches!(
            self,
            SimError::UnknownTransition { .. }
                | SimError::CapacityViolation { .. }
                | SimError::ConservationViolation { .. }
                | SimError::PatientNotFound { .. }
                | SimError::AbsorbingStateViolation { .. }
        )
    }
}

impl From<io::Error> for SimError {
    fn from(error: io::Error) -> Self {
        SimError::IoError(error)
    }
}

impl From<serde_json::Error> for SimError {
    fn from(error: serde_json::Error) -> Self {
        SimError::JsonError(error)
    }
}

impl From<csv::Error> for SimError {
    fn from(error: csv::Error) -> Self {
        SimError::CSVError(error)
    }
}

impl From<clap::Error> for SimError {
    fn from(error: clap::Error) -> Self {
        SimError::ClapError(error)
    }
}

impl From<String> for SimError {
    fn from(error: String) -> Self {
        SimError::SimError(error)
    }
}

impl From<&str> for SimError {
    fn from(error: &str) -> Self {
        SimError::SimError(error.to_string())
    }
}

impl std::error::Error for SimError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SimError::IoError(error) => Some(error),
            SimError::JsonError(error) => Some(error),
            SimError::CSVError(error) => Some(error),
            SimError::ClapError(error) => Some(error),
            _ => None,
        }
    }
}

impl Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SimError::UnknownTransition {
                state,
                urgency,
                ward,
            } => write!(
                f,
                "no transition row for state {state} with urgency {urgency} in ward {ward:?}"
            ),
            SimError::CapacityViolation {
                ward,
                occupied,
                capacity,
            } => write!(
                f,
                "{ward} ward holds {occupied} patients but has only {capacity} beds"
            ),
            SimError::ConservationViolation {
                admitted,
                discharged,
                deceased,
                occupied,
            } => write!(
                f,
                "admitted ({admitted}) != discharged ({discharged}) + deceased ({deceased}) + occupied ({occupied})"
            ),
            SimError::PatientNotFound { ward, patient } => {
                write!(f, "patient {patient} is not in the {ward} ward")
            }
            SimError::AbsorbingStateViolation { patient, from, to } => write!(
                f,
                "patient {patient} cannot leave terminal state {from} for {to}"
            ),
            SimError::InvalidParameters(message) => write!(f, "invalid parameters: {message}"),
            SimError::ReportError(message) => write!(f, "report error: {message}"),
            _ => write!(f, "Error: {self:?}"),
        }
    }
}
