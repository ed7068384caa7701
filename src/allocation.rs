//! The admission policy.
//!
//! Critical patients go to the ICU and overflow into General. Medium patients only ever get a
//! General bed. Low patients get a General bed only while General keeps a free-bed reserve
//! larger than `low_acuity_reserve_percent` of its capacity, so that low-severity admissions
//! cannot use up the beds later Critical arrivals overflow into.
use serde::{Deserialize, Serialize};

use crate::hospital::{Hospital, Placement};
use crate::patient::{UrgencyLabel, WardKind};

pub const DEFAULT_LOW_ACUITY_RESERVE_PERCENT: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationPolicy {
    low_acuity_reserve_percent: u32,
}

impl Default for AllocationPolicy {
    fn default() -> Self {
        AllocationPolicy {
            low_acuity_reserve_percent: DEFAULT_LOW_ACUITY_RESERVE_PERCENT,
        }
    }
}

impl AllocationPolicy {
    /// # Panics
    ///
    /// Panics if the reserve is above 100 percent.
    #[must_use]
    pub fn new(low_acuity_reserve_percent: u32) -> Self {
        assert!(
            low_acuity_reserve_percent <= 100,
            "reserve must be a percentage, got {low_acuity_reserve_percent}"
        );
        AllocationPolicy {
            low_acuity_reserve_percent,
        }
    }

    #[must_use]
    pub fn low_acuity_reserve_percent(&self) -> u32 {
        self.low_acuity_reserve_percent
    }

    /// Chooses a placement for a patient with the given urgency. Reads occupancy only; the
    /// caller performs the admission.
    #[must_use]
    pub fn decide(&self, urgency: UrgencyLabel, hospital: &Hospital) -> Placement {
        let icu = hospital.ward(WardKind::Icu);
        let general = hospital.ward(WardKind::General);
        match urgency {
            UrgencyLabel::Critical if icu.has_free_bed() => Placement::Ward(WardKind::Icu),
            UrgencyLabel::Critical | UrgencyLabel::Medium if general.has_free_bed() => {
                Placement::Ward(WardKind::General)
            }
            UrgencyLabel::Low
                if self.keeps_reserve(general.free_beds(), general.capacity()) =>
            {
                Placement::Ward(WardKind::General)
            }
            UrgencyLabel::Critical | UrgencyLabel::Medium | UrgencyLabel::Low => Placement::Refused,
        }
    }

    /// `free > reserve% × capacity`, strictly, in integer arithmetic so the threshold is exact.
    fn keeps_reserve(&self, free: usize, capacity: usize) -> bool {
        free as u64 * 100 > u64::from(self.low_acuity_reserve_percent) * capacity as u64
    }
}
