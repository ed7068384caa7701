pub use crate::context::{Context, ExecutionPhase, SimEvent};
pub use crate::error::SimError;
pub use crate::global_properties::ContextGlobalPropertiesExt;
pub use crate::hospital::{Hospital, HospitalStatus, Placement, RunSummary};
pub use crate::log::{debug, error, info, trace, warn};
pub use crate::parameters::{HospitalParameters, Parameters};
pub use crate::patient::{HealthState, PatientId, UrgencyLabel, WardKind};
pub use crate::random::ContextRandomExt;
pub use crate::report::ContextReportExt;
pub use crate::runner::{run_with_custom_args, BaseArgs, ParameterOverrides};
pub use crate::simulation::{
    BoardingRiskEvent, ContextHospitalExt, DailyStatusEvent, PatientAdmittedEvent,
    PatientDepartedEvent,
};
pub use crate::{define_data_plugin, define_global_property, define_report, define_rng};
