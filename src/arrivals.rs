//! The arrival feed: how many patients arrive each day and what they look like at intake.
//!
//! [`SyntheticArrivals`] draws complaint-correlated vitals; any other source of intake records
//! can implement [`ArrivalFeed`].
use rand::distr::weighted::WeightedIndex;
use rand::distr::Distribution;
use rand::{Rng, RngCore};
use rand_distr::Poisson;
use serde::{Deserialize, Serialize};

use crate::error::SimError;
use crate::patient::{ChiefComplaint, Gender, PatientFeatures};

/// How many patients arrive on a given day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ArrivalCount {
    Fixed { count: u32 },
    /// Uniform on `min..=max`.
    Uniform { min: u32, max: u32 },
    Poisson { mean: f64 },
}

impl Default for ArrivalCount {
    fn default() -> Self {
        ArrivalCount::Uniform { min: 1, max: 20 }
    }
}

impl ArrivalCount {
    pub fn validate(&self) -> Result<(), SimError> {
        match *self {
            ArrivalCount::Fixed { .. } => Ok(()),
            ArrivalCount::Uniform { min, max } if min > max => Err(SimError::InvalidParameters(
                format!("arrival bounds are inverted: min {min} > max {max}"),
            )),
            ArrivalCount::Uniform { .. } => Ok(()),
            ArrivalCount::Poisson { mean } => poisson(mean).map(|_| ()),
        }
    }

    /// Draws today's count. Fixed counts consume no randomness.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameters` for a Poisson mean that `rand_distr` cannot sample.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<u32, SimError> {
        match *self {
            ArrivalCount::Fixed { count } => Ok(count),
            ArrivalCount::Uniform { min, max } => Ok(rng.random_range(min..=max)),
            ArrivalCount::Poisson { mean } => {
                let draw: f64 = poisson(mean)?.sample(rng);
                Ok(draw as u32)
            }
        }
    }
}

fn poisson(mean: f64) -> Result<Poisson<f64>, SimError> {
    Poisson::new(mean).map_err(|e| {
        SimError::InvalidParameters(format!("Poisson arrival mean {mean} is out of range: {e}"))
    })
}

pub trait ArrivalFeed {
    /// Produces the intake features of the next arrival.
    fn next_features(&self, rng: &mut dyn RngCore) -> PatientFeatures;
}

const COMPLAINTS: [(ChiefComplaint, u32); 5] = [
    (ChiefComplaint::ChestPain, 20),
    (ChiefComplaint::Flu, 30),
    (ChiefComplaint::DifficultyBreathing, 15),
    (ChiefComplaint::Trauma, 15),
    (ChiefComplaint::GeneralCheckup, 20),
];

/// Random arrivals with vitals that depend on the presenting complaint.
#[derive(Debug, Clone)]
pub struct SyntheticArrivals {
    complaint_index: WeightedIndex<u32>,
}

impl Default for SyntheticArrivals {
    fn default() -> Self {
        SyntheticArrivals {
            complaint_index: WeightedIndex::new(COMPLAINTS.iter().map(|(_, w)| *w))
                .expect("complaint weights are positive"),
        }
    }
}

impl ArrivalFeed for SyntheticArrivals {
    fn next_features(&self, rng: &mut dyn RngCore) -> PatientFeatures {
        let chief_complaint = COMPLAINTS[self.complaint_index.sample(rng)].0;
        let age = rng.random_range(18..=90);

        // Normal vitals, overridden below by complaint.
        let mut heart_rate = rng.random_range(60..=90);
        let mut blood_pressure = rng.random_range(110..=130);
        let mut temperature: f64 = rng.random_range(36.5..=37.2);
        let mut oxygen_saturation = rng.random_range(97..=100);

        match chief_complaint {
            ChiefComplaint::ChestPain => {
                heart_rate = rng.random_range(100..=140);
                blood_pressure = rng.random_range(150..=200);
            }
            ChiefComplaint::Flu => {
                temperature = rng.random_range(37.5..=40.5);
                heart_rate = rng.random_range(90..=110);
            }
            ChiefComplaint::DifficultyBreathing => {
                oxygen_saturation = rng.random_range(80..=95);
                heart_rate = rng.random_range(100..=120);
            }
            ChiefComplaint::Trauma => {
                heart_rate = rng.random_range(110..=140);
                blood_pressure = rng.random_range(80..=110);
            }
            ChiefComplaint::GeneralCheckup => {}
        }

        let gender = if rng.random_bool(0.5) {
            Gender::Female
        } else {
            Gender::Male
        };

        PatientFeatures {
            age,
            gender,
            chief_complaint,
            heart_rate,
            blood_pressure,
            temperature: (temperature * 10.0).round() / 10.0,
            oxygen_saturation,
        }
    }
}
