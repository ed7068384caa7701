//! The boundary to the prediction service.
//!
//! The engine needs exactly two values for each arrival: an urgency label and an expected
//! length of stay. Where they come from is not its concern; anything implementing
//! [`PredictionService`] can be plugged into the simulation. [`TriageRules`] is a transparent
//! rule set that labels patients the way the synthetic training data was labelled, which is
//! enough to run the simulation without a trained model.
use serde::{Deserialize, Serialize};

use crate::patient::{ChiefComplaint, PatientFeatures, UrgencyLabel};

/// Shortest stay a prediction may report, in days.
pub const MIN_EXPECTED_LOS: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub urgency: UrgencyLabel,
    pub expected_los: f64,
}

impl Prediction {
    /// Rounds `expected_los` to one decimal and clamps it to [`MIN_EXPECTED_LOS`].
    #[must_use]
    pub fn new(urgency: UrgencyLabel, expected_los: f64) -> Self {
        let rounded = (expected_los * 10.0).round() / 10.0;
        Prediction {
            urgency,
            expected_los: rounded.max(MIN_EXPECTED_LOS),
        }
    }
}

pub trait PredictionService {
    fn predict(&self, features: &PatientFeatures) -> Prediction;
}

/// Deterministic triage rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct TriageRules;

impl TriageRules {
    #[must_use]
    pub fn urgency(features: &PatientFeatures) -> UrgencyLabel {
        let PatientFeatures {
            chief_complaint,
            heart_rate,
            blood_pressure,
            temperature,
            oxygen_saturation,
            ..
        } = *features;
        let chest_pain = chief_complaint == ChiefComplaint::ChestPain;
        let trauma = chief_complaint == ChiefComplaint::Trauma;

        if (chest_pain && blood_pressure > 160)
            || oxygen_saturation < 90
            || (trauma && blood_pressure < 90)
            || heart_rate > 130
        {
            UrgencyLabel::Critical
        } else if temperature > 38.5 || chest_pain || trauma || blood_pressure > 150 {
            UrgencyLabel::Medium
        } else {
            UrgencyLabel::Low
        }
    }

    /// Two days of base stay, plus the midpoint of the extra stay for the urgency class, plus
    /// three days for patients over 65.
    #[must_use]
    pub fn expected_los(features: &PatientFeatures, urgency: UrgencyLabel) -> f64 {
        let mut days = 2.0;
        days += match urgency {
            UrgencyLabel::Critical => 7.5,
            UrgencyLabel::Medium => 3.5,
            UrgencyLabel::Low => 0.0,
        };
        if features.age > 65 {
            days += 3.0;
        }
        days
    }
}

impl PredictionService for TriageRules {
    fn predict(&self, features: &PatientFeatures) -> Prediction {
        let urgency = TriageRules::urgency(features);
        Prediction::new(urgency, TriageRules::expected_los(features, urgency))
    }
}
