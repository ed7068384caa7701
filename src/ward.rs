use indexmap::IndexMap;
use log::trace;

use crate::error::SimError;
use crate::patient::{PatientId, PatientRecord, WardKind};

/// A fixed-capacity pool of beds of one class.
///
/// Occupants are kept in admission order so that a tick visits them in the same order on every
/// run with the same seed. The number of occupants never exceeds `capacity`.
#[derive(Debug)]
pub struct Ward {
    kind: WardKind,
    capacity: usize,
    occupants: IndexMap<PatientId, PatientRecord>,
}

impl Ward {
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn new(kind: WardKind, capacity: usize) -> Self {
        assert!(capacity > 0, "{kind} ward must have at least one bed");
        Ward {
            kind,
            capacity,
            occupants: IndexMap::with_capacity(capacity),
        }
    }

    #[must_use]
    pub fn kind(&self) -> WardKind {
        self.kind
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// `(used, capacity)`
    #[must_use]
    pub fn occupancy(&self) -> (usize, usize) {
        (self.occupants.len(), self.capacity)
    }

    #[must_use]
    pub fn free_beds(&self) -> usize {
        self.capacity - self.occupants.len()
    }

    #[must_use]
    pub fn has_free_bed(&self) -> bool {
        self.occupants.len() < self.capacity
    }

    /// Admits `patient` if a bed is free and records this ward on the patient. When the ward
    /// is full the patient is handed back unchanged.
    ///
    /// # Panics
    ///
    /// Panics if a patient with the same id is already in this ward.
    pub fn try_admit(&mut self, mut patient: PatientRecord) -> Result<(), PatientRecord> {
        if !self.has_free_bed() {
            trace!("{} ward full, cannot admit patient {}", self.kind, patient.id());
            return Err(patient);
        }
        let id = patient.id();
        assert!(
            !self.occupants.contains_key(&id),
            "patient {id} is already in the {} ward",
            self.kind
        );
        patient.assign_ward(self.kind);
        self.occupants.insert(id, patient);
        trace!(
            "admitted patient {id} to {} ward ({}/{})",
            self.kind,
            self.occupants.len(),
            self.capacity
        );
        Ok(())
    }

    /// Removes a patient and returns the record.
    pub fn release(&mut self, id: PatientId) -> Result<PatientRecord, SimError> {
        self.occupants
            .shift_remove(&id)
            .ok_or(SimError::PatientNotFound {
                ward: self.kind,
                patient: id,
            })
    }

    #[must_use]
    pub fn contains(&self, id: PatientId) -> bool {
        self.occupants.contains_key(&id)
    }

    #[must_use]
    pub fn get(&self, id: PatientId) -> Option<&PatientRecord> {
        self.occupants.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: PatientId) -> Option<&mut PatientRecord> {
        self.occupants.get_mut(&id)
    }

    /// Occupant ids in admission order, copied so the ward can be mutated while they are
    /// visited.
    #[must_use]
    pub fn patient_ids(&self) -> Vec<PatientId> {
        self.occupants.keys().copied().collect()
    }

    pub fn patients(&self) -> impl Iterator<Item = &PatientRecord> {
        self.occupants.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patient::tests::patient;
    use crate::patient::UrgencyLabel;

    #[test]
    fn admits_until_full() {
        let mut ward = Ward::new(WardKind::General, 2);
        assert!(ward.try_admit(patient(1, UrgencyLabel::Low, 3.0)).is_ok());
        assert!(ward.try_admit(patient(2, UrgencyLabel::Low, 3.0)).is_ok());
        let rejected = ward
            .try_admit(patient(3, UrgencyLabel::Medium, 3.0))
            .unwrap_err();
        assert_eq!(rejected.id(), PatientId(3));
        assert_eq!(rejected.assigned_ward(), None);
        assert_eq!(ward.occupancy(), (2, 2));
        assert_eq!(ward.free_beds(), 0);
        assert!(!ward.contains(PatientId(3)));
    }

    #[test]
    fn admission_sets_assigned_ward() {
        let mut ward = Ward::new(WardKind::Icu, 1);
        ward.try_admit(patient(9, UrgencyLabel::Critical, 5.0))
            .unwrap();
        assert_eq!(
            ward.get(PatientId(9)).unwrap().assigned_ward(),
            Some(WardKind::Icu)
        );
    }

    #[test]
    fn release_returns_record_and_frees_bed() {
        let mut ward = Ward::new(WardKind::Icu, 1);
        ward.try_admit(patient(1, UrgencyLabel::Critical, 5.0))
            .unwrap();
        let record = ward.release(PatientId(1)).unwrap();
        assert_eq!(record.id(), PatientId(1));
        assert_eq!(record.assigned_ward(), Some(WardKind::Icu));
        assert_eq!(ward.occupancy(), (0, 1));
        assert!(ward.has_free_bed());
    }

    #[test]
    fn release_of_unknown_patient_fails() {
        let mut ward = Ward::new(WardKind::General, 3);
        let err = ward.release(PatientId(4)).unwrap_err();
        assert!(matches!(
            err,
            SimError::PatientNotFound {
                ward: WardKind::General,
                patient: PatientId(4)
            }
        ));
    }

    #[test]
    fn ids_keep_admission_order() {
        let mut ward = Ward::new(WardKind::General, 4);
        for id in [5, 2, 8] {
            ward.try_admit(patient(id, UrgencyLabel::Low, 3.0)).unwrap();
        }
        ward.release(PatientId(2)).unwrap();
        assert_eq!(ward.patient_ids(), vec![PatientId(5), PatientId(8)]);
    }

    #[test]
    #[should_panic(expected = "patient 1 is already in the General ward")]
    fn double_admission_panics() {
        let mut ward = Ward::new(WardKind::General, 4);
        ward.try_admit(patient(1, UrgencyLabel::Low, 3.0)).unwrap();
        let _ = ward.try_admit(patient(1, UrgencyLabel::Low, 3.0));
    }

    #[test]
    #[should_panic(expected = "ICU ward must have at least one bed")]
    fn zero_capacity_panics() {
        let _ = Ward::new(WardKind::Icu, 0);
    }
}
