use std::fs;
use std::path::Path;

use rand::rngs::SmallRng;
use rand::SeedableRng;
use tempfile::tempdir;
use ward_sim::allocation::AllocationPolicy;
use ward_sim::arrivals::ArrivalCount;
use ward_sim::health::HealthStateMachine;
use ward_sim::hospital::{Hospital, Placement};
use ward_sim::parameters::{HospitalParameters, Parameters};
use ward_sim::patient::{
    ChiefComplaint, Gender, HealthState, PatientFeatures, PatientId, PatientRecord, UrgencyLabel,
    WardKind,
};
use ward_sim::{
    reports, simulation, Context, ContextGlobalPropertiesExt, ContextHospitalExt,
    ContextRandomExt, ContextReportExt, SimError,
};

fn features() -> PatientFeatures {
    PatientFeatures {
        age: 54,
        gender: Gender::Male,
        chief_complaint: ChiefComplaint::Trauma,
        heart_rate: 135,
        blood_pressure: 85,
        temperature: 36.9,
        oxygen_saturation: 93,
    }
}

fn critical(id: u64) -> PatientRecord {
    PatientRecord::new(PatientId(id), features(), UrgencyLabel::Critical, 9.5).unwrap()
}

fn run(parameters: HospitalParameters, seed: u64, output_dir: &Path) -> Context {
    let mut context = Context::new();
    context.init_random(seed);
    context
        .report_options()
        .directory(output_dir.to_path_buf());
    context
        .set_global_property_value(Parameters, parameters)
        .unwrap();
    simulation::init(&mut context).unwrap();
    reports::init(&mut context).unwrap();
    context.execute().unwrap();
    context
}

#[test]
fn one_bed_each_admits_two_critical_and_refuses_the_third() {
    let mut hospital = Hospital::new(1, 1);
    let policy = AllocationPolicy::default();

    let mut placements = Vec::new();
    for id in 1..=3 {
        let decision = policy.decide(UrgencyLabel::Critical, &hospital);
        placements.push(hospital.admit(critical(id), decision));
    }
    assert_eq!(
        placements,
        vec![
            Placement::Ward(WardKind::Icu),
            Placement::Ward(WardKind::General),
            Placement::Refused,
        ]
    );

    let status = hospital.status();
    assert_eq!((status.icu_free, status.general_free, status.total_refused), (0, 0, 1));
    hospital.check_invariants().unwrap();
}

#[test]
fn default_run_conserves_patients() {
    let temp_dir = tempdir().unwrap();
    let context = run(HospitalParameters::default(), 2024, temp_dir.path());

    let summary = context.run_summary().unwrap();
    let hospital = context.hospital();
    hospital.check_invariants().unwrap();
    assert_eq!(
        summary.admitted,
        summary.discharged + summary.deceased + hospital.total_occupancy() as u64
    );
    assert_eq!(summary.total_discharged, summary.discharged + summary.deceased);
    assert!(hospital.ward(WardKind::Icu).occupancy().0 <= 15);
    assert!(hospital.ward(WardKind::General).occupancy().0 <= 40);
    assert_eq!(context.get_current_time(), 50.0);
}

#[test]
fn same_seed_writes_identical_reports() {
    let parameters = HospitalParameters {
        icu_capacity: 3,
        general_capacity: 8,
        days: 25,
        arrivals: ArrivalCount::Poisson { mean: 4.0 },
        ..HospitalParameters::default()
    };
    let first = tempdir().unwrap();
    let second = tempdir().unwrap();
    let a = run(parameters.clone(), 99, first.path());
    let b = run(parameters, 99, second.path());
    assert_eq!(a.run_summary(), b.run_summary());

    for name in ["daily_status.csv", "patient_outcomes.csv"] {
        let left = fs::read_to_string(first.path().join(name)).unwrap();
        let right = fs::read_to_string(second.path().join(name)).unwrap();
        assert!(!left.is_empty());
        assert_eq!(left, right, "{name} differs between runs");
    }
}

#[test]
fn parameters_file_drives_a_run() {
    let temp_dir = tempdir().unwrap();
    let mut context = Context::new();
    context.init_random(5);
    context
        .report_options()
        .directory(temp_dir.path().to_path_buf());
    context
        .load_global_property_from_json(
            Parameters,
            &Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/data/parameters.json"),
        )
        .unwrap();
    simulation::init(&mut context).unwrap();
    reports::init(&mut context).unwrap();
    context.execute().unwrap();

    let status = fs::read_to_string(temp_dir.path().join("daily_status.csv")).unwrap();
    // Header plus one row per day.
    assert_eq!(status.lines().count(), 21);
    assert_eq!(context.hospital().ward(WardKind::Icu).capacity(), 4);
}

#[test]
fn invalid_parameters_never_reach_the_engine() {
    let mut context = Context::new();
    let err = context
        .set_global_property_value(
            Parameters,
            HospitalParameters {
                general_capacity: 0,
                ..HospitalParameters::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, SimError::InvalidParameters(_)));
}

/// Fraction of a Critical cohort that dies when every patient stays in `ward` until absorbed.
fn cohort_mortality(ward: Option<WardKind>, seed: u64) -> f64 {
    let machine = HealthStateMachine::default();
    let mut rng = SmallRng::seed_from_u64(seed);
    let cohort: u32 = 2_000;
    let mut deaths: u32 = 0;
    for _ in 0..cohort {
        let mut state = HealthState::Critical;
        while !state.is_terminal() {
            state = machine
                .next_state(state, UrgencyLabel::Critical, ward, &mut rng)
                .unwrap();
        }
        if state == HealthState::Deceased {
            deaths += 1;
        }
    }
    f64::from(deaths) / f64::from(cohort)
}

#[test]
fn mortality_rises_as_care_falls() {
    let icu = cohort_mortality(Some(WardKind::Icu), 1);
    let general = cohort_mortality(Some(WardKind::General), 2);
    let unassigned = cohort_mortality(None, 3);
    assert!(icu < general, "ICU {icu} vs General {general}");
    assert!(general < unassigned, "General {general} vs unassigned {unassigned}");
    assert!((icu - 0.5).abs() < 0.05, "ICU mortality was {icu}");
    assert_eq!(unassigned, 1.0);
}
