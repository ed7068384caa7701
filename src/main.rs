use clap::Args;
use ward_sim::arrivals::ArrivalCount;
use ward_sim::parameters::HospitalParameters;
use ward_sim::runner::{run_with_custom_args, ParameterOverrides};
use ward_sim::{reports, simulation, ContextHospitalExt, SimError};

/// Overrides applied on top of `--config`.
#[derive(Args, Debug)]
struct HospitalArgs {
    /// Number of ICU beds
    #[arg(long)]
    icu_beds: Option<usize>,

    /// Number of General beds
    #[arg(long)]
    general_beds: Option<usize>,

    /// Number of simulated days
    #[arg(long)]
    days: Option<u32>,

    /// Upper bound of the daily arrival count, drawn uniformly from 1..=N
    #[arg(long)]
    max_arrivals: Option<u32>,
}

impl ParameterOverrides for HospitalArgs {
    fn apply(&self, parameters: &mut HospitalParameters) {
        if let Some(icu_beds) = self.icu_beds {
            parameters.icu_capacity = icu_beds;
        }
        if let Some(general_beds) = self.general_beds {
            parameters.general_capacity = general_beds;
        }
        if let Some(days) = self.days {
            parameters.days = days;
        }
        if let Some(max) = self.max_arrivals {
            parameters.arrivals = ArrivalCount::Uniform { min: 1, max };
        }
    }
}

fn main() -> anyhow::Result<()> {
    let result = run_with_custom_args(|context, _, _: Option<HospitalArgs>| {
        simulation::init(context)?;
        reports::init(context)?;
        Ok(())
    });

    let context = match result {
        Ok(context) => context,
        // Prints help, version or a usage error and exits with clap's status code.
        Err(SimError::ClapError(error)) => error.exit(),
        Err(error) => return Err(error.into()),
    };

    if let Some(summary) = context.run_summary() {
        println!(
            "admitted={} discharged={} deceased={} total_discharged={} refused={}",
            summary.admitted,
            summary.discharged,
            summary.deceased,
            summary.total_discharged,
            summary.refused
        );
    }
    Ok(())
}
