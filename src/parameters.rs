//! Run configuration.
//!
//! [`HospitalParameters`] is read from JSON (every field optional) and stored in the context as
//! the [`Parameters`] global property, which validates it once on the way in.
use serde::{Deserialize, Serialize};

use crate::allocation::DEFAULT_LOW_ACUITY_RESERVE_PERCENT;
use crate::arrivals::ArrivalCount;
use crate::define_global_property;
use crate::error::SimError;
use crate::health::{TransitionRow, TransitionTable};

pub const DEFAULT_ICU_CAPACITY: usize = 15;
pub const DEFAULT_GENERAL_CAPACITY: usize = 40;
pub const DEFAULT_DAYS: u32 = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HospitalParameters {
    pub icu_capacity: usize,
    pub general_capacity: usize,
    pub days: u32,
    pub arrivals: ArrivalCount,
    pub low_acuity_reserve_percent: u32,
    /// Replaces the built-in transition table when present.
    pub transition_table: Option<Vec<TransitionRow>>,
}

impl Default for HospitalParameters {
    fn default() -> Self {
        HospitalParameters {
            icu_capacity: DEFAULT_ICU_CAPACITY,
            general_capacity: DEFAULT_GENERAL_CAPACITY,
            days: DEFAULT_DAYS,
            arrivals: ArrivalCount::default(),
            low_acuity_reserve_percent: DEFAULT_LOW_ACUITY_RESERVE_PERCENT,
            transition_table: None,
        }
    }
}

impl HospitalParameters {
    /// Compiles the configured transition table, or the built-in one.
    pub fn transition_table(&self) -> Result<TransitionTable, SimError> {
        match &self.transition_table {
            Some(rows) => TransitionTable::from_rows(rows),
            None => Ok(TransitionTable::default()),
        }
    }

    /// Checks capacities, run length, reserve, arrival bounds and the transition table.
    pub fn validate(&self) -> Result<(), SimError> {
        if self.icu_capacity == 0 || self.general_capacity == 0 {
            return Err(SimError::InvalidParameters(
                "ICU and General capacity must both be at least one bed".to_string(),
            ));
        }
        if self.days == 0 {
            return Err(SimError::InvalidParameters(
                "the simulation must run for at least one day".to_string(),
            ));
        }
        if self.low_acuity_reserve_percent > 100 {
            return Err(SimError::InvalidParameters(format!(
                "low acuity reserve must be a percentage, got {}",
                self.low_acuity_reserve_percent
            )));
        }
        self.arrivals.validate()?;
        self.transition_table()?;
        Ok(())
    }
}

define_global_property!(Parameters, HospitalParameters, HospitalParameters::validate);
