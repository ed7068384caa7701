//! A discrete-event simulation of bed allocation in a two-ward hospital.
//!
//! Patients arrive each simulated day with a predicted urgency and expected length of stay. An
//! allocation policy sends each arrival to an ICU bed, a General bed, or refuses them. Every
//! occupied patient then evolves once per day through a Markov health model whose transition
//! probabilities depend on the bed they actually received, so scarcity shows up as mortality.
//!
//! The central object is the [`Context`], which owns simulated time, the plan queue, events and
//! typed data plugins. Model behaviour is layered on top through extension traits:
//! * [`ContextHospitalExt`] holds the [`Hospital`] and runs admissions and the daily tick.
//! * [`ContextRandomExt`] provides independently seeded random streams.
//! * [`ContextReportExt`] writes CSV reports.
//! * [`ContextGlobalPropertiesExt`] stores validated, write-once configuration.
//!
//! The engine core ([`health`], [`ward`], [`hospital`], [`allocation`]) does not depend on the
//! context and can be driven directly:
//!
//! ```rust
//! use rand::rngs::SmallRng;
//! use rand::SeedableRng;
//! use ward_sim::allocation::AllocationPolicy;
//! use ward_sim::hospital::{Hospital, Placement};
//! use ward_sim::patient::{
//!     ChiefComplaint, Gender, PatientFeatures, PatientId, PatientRecord, UrgencyLabel, WardKind,
//! };
//!
//! let mut hospital = Hospital::new(1, 1);
//! let features = PatientFeatures {
//!     age: 70,
//!     gender: Gender::Female,
//!     chief_complaint: ChiefComplaint::ChestPain,
//!     heart_rate: 120,
//!     blood_pressure: 170,
//!     temperature: 37.0,
//!     oxygen_saturation: 96,
//! };
//! let patient = PatientRecord::new(PatientId(1), features, UrgencyLabel::Critical, 9.5).unwrap();
//! let decision = AllocationPolicy::default().decide(patient.urgency(), &hospital);
//! assert_eq!(hospital.admit(patient, decision), Placement::Ward(WardKind::Icu));
//!
//! let mut rng = SmallRng::seed_from_u64(1);
//! hospital.advance_day(&mut rng).unwrap();
//! hospital.check_invariants().unwrap();
//! ```
pub mod allocation;
pub mod arrivals;
pub mod context;
pub mod error;
pub mod global_properties;
pub mod hashing;
pub mod health;
pub mod hospital;
pub mod log;
pub mod parameters;
pub mod patient;
pub mod plan;
pub mod prediction;
pub mod prelude;
pub mod random;
pub mod report;
pub mod reports;
pub mod runner;
pub mod simulation;
pub mod ward;

pub use crate::context::Context;
pub use crate::error::SimError;
pub use crate::global_properties::ContextGlobalPropertiesExt;
pub use crate::hospital::{Hospital, RunSummary};
pub use crate::random::ContextRandomExt;
pub use crate::report::ContextReportExt;
pub use crate::simulation::ContextHospitalExt;

// Re-exported for use in macros.
pub use csv;
pub use paste;
pub use rand;
