//! The patient record and the small value types that describe it.
//!
//! A [`PatientRecord`] is created once per arrival from the prediction service's output and is
//! then owned by at most one [`Ward`](crate::ward::Ward). The engine never touches the intake
//! [`PatientFeatures`]; it reads the urgency label and expected length of stay, and it mutates
//! only the health state, the day counter and the assigned ward.
use std::fmt::{self, Display};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{Display as StrumDisplay, EnumIter, EnumString};

use crate::error::SimError;

/// Unique, monotonically assigned patient identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PatientId(pub u64);

impl Display for PatientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Triage classification assigned at intake.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, StrumDisplay, EnumIter,
)]
pub enum UrgencyLabel {
    Critical,
    Medium,
    Low,
}

impl UrgencyLabel {
    /// Decodes the prediction service's class index. Classes are numbered alphabetically:
    /// `0 = Critical`, `1 = Low`, `2 = Medium`.
    pub fn from_code(code: u8) -> Result<Self, SimError> {
        match code {
            0 => Ok(UrgencyLabel::Critical),
            1 => Ok(UrgencyLabel::Low),
            2 => Ok(UrgencyLabel::Medium),
            other => Err(SimError::UnknownUrgencyCode(other)),
        }
    }

    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            UrgencyLabel::Critical => 0,
            UrgencyLabel::Low => 1,
            UrgencyLabel::Medium => 2,
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, StrumDisplay, EnumIter,
)]
pub enum HealthState {
    Stable,
    Critical,
    Discharged,
    Deceased,
}

impl HealthState {
    /// Discharged and Deceased are absorbing.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, HealthState::Discharged | HealthState::Deceased)
    }
}

/// A class of bed, one [`Ward`](crate::ward::Ward) per class.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, StrumDisplay, EnumIter,
)]
pub enum WardKind {
    #[strum(serialize = "ICU")]
    #[serde(rename = "ICU")]
    Icu,
    General,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, StrumDisplay)]
pub enum Gender {
    Female,
    Male,
}

/// Presenting complaint recorded at intake.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    StrumDisplay,
    EnumString,
    EnumIter,
)]
pub enum ChiefComplaint {
    #[strum(serialize = "Chest Pain")]
    ChestPain,
    Flu,
    #[strum(serialize = "Difficulty Breathing")]
    DifficultyBreathing,
    Trauma,
    #[strum(serialize = "General Checkup")]
    GeneralCheckup,
}

impl ChiefComplaint {
    /// Parses a complaint from its display name, e.g. `"Chest Pain"`.
    pub fn parse(name: &str) -> Result<Self, SimError> {
        ChiefComplaint::from_str(name).map_err(|_| SimError::UnknownComplaint(name.to_string()))
    }
}

/// Static intake attributes. Only the prediction service interprets these.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PatientFeatures {
    pub age: u8,
    pub gender: Gender,
    pub chief_complaint: ChiefComplaint,
    pub heart_rate: u16,
    /// Systolic, mmHg.
    pub blood_pressure: u16,
    /// Degrees Celsius, one decimal.
    pub temperature: f64,
    pub oxygen_saturation: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PatientRecord {
    id: PatientId,
    features: PatientFeatures,
    urgency: UrgencyLabel,
    expected_los: f64,
    health_state: HealthState,
    days_stayed: u32,
    assigned_ward: Option<WardKind>,
}

impl PatientRecord {
    /// Creates a record for a new arrival. Critical arrivals start in the Critical state,
    /// everyone else starts Stable.
    pub fn new(
        id: PatientId,
        features: PatientFeatures,
        urgency: UrgencyLabel,
        expected_los: f64,
    ) -> Result<Self, SimError> {
        if !expected_los.is_finite() || expected_los <= 0.0 {
            return Err(SimError::InvalidExpectedLos(expected_los));
        }
        let health_state = match urgency {
            UrgencyLabel::Critical => HealthState::Critical,
            UrgencyLabel::Medium | UrgencyLabel::Low => HealthState::Stable,
        };
        Ok(PatientRecord {
            id,
            features,
            urgency,
            expected_los,
            health_state,
            days_stayed: 0,
            assigned_ward: None,
        })
    }

    #[must_use]
    pub fn id(&self) -> PatientId {
        self.id
    }

    #[must_use]
    pub fn features(&self) -> &PatientFeatures {
        &self.features
    }

    #[must_use]
    pub fn urgency(&self) -> UrgencyLabel {
        self.urgency
    }

    #[must_use]
    pub fn expected_los(&self) -> f64 {
        self.expected_los
    }

    #[must_use]
    pub fn health_state(&self) -> HealthState {
        self.health_state
    }

    #[must_use]
    pub fn days_stayed(&self) -> u32 {
        self.days_stayed
    }

    #[must_use]
    pub fn assigned_ward(&self) -> Option<WardKind> {
        self.assigned_ward
    }

    /// Whether the stay has reached the predicted length.
    #[must_use]
    pub fn los_expired(&self) -> bool {
        f64::from(self.days_stayed) >= self.expected_los
    }

    pub(crate) fn assign_ward(&mut self, ward: WardKind) {
        self.assigned_ward = Some(ward);
    }

    pub(crate) fn increment_days_stayed(&mut self) {
        self.days_stayed += 1;
    }

    /// Applies a new health state. Leaving a terminal state is an invariant breach.
    pub(crate) fn set_health_state(&mut self, next: HealthState) -> Result<(), SimError> {
        if self.health_state.is_terminal() && next != self.health_state {
            return Err(SimError::AbsorbingStateViolation {
                patient: self.id,
                from: self.health_state,
                to: next,
            });
        }
        self.health_state = next;
        Ok(())
    }
}
