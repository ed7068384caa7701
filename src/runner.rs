use std::ffi::OsString;
use std::path::PathBuf;

use clap::{ArgAction, Args, Command, FromArgMatches as _};
use log::info;

use crate::context::Context;
use crate::error::SimError;
use crate::global_properties::ContextGlobalPropertiesExt;
use crate::log::{apply_log_spec, set_log_level, LevelFilter, LogSpec, DEFAULT_LOG_LEVEL};
use crate::parameters::{HospitalParameters, Parameters};
use crate::random::ContextRandomExt;
use crate::report::ContextReportExt;

/// Default cli arguments for the runner
#[derive(Args, Debug, Default)]
pub struct BaseArgs {
    /// Random seed
    #[arg(short, long, default_value = "0")]
    pub random_seed: u64,

    /// Optional path to a JSON parameters file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory for report output
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Prefix prepended to every report file name
    #[arg(long, default_value = "")]
    pub file_prefix: String,

    /// Replace existing report files
    #[arg(short, long)]
    pub force_overwrite: bool,

    /// Log level, e.g. `info` or `ward_sim::hospital=debug,warn`
    #[arg(long)]
    pub log_level: Option<String>,

    /// Raise the log level: -v info, -vv debug, -vvv trace
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

/// Command line arguments that adjust the parameters loaded from `--config`.
pub trait ParameterOverrides {
    fn apply(&self, parameters: &mut HospitalParameters);
}

fn create_cli() -> Command {
    let cli = Command::new("ward-sim").about("Simulates bed allocation in a two-ward hospital");
    BaseArgs::augment_args(cli)
}

/// Runs a simulation with custom cli arguments read from the process arguments.
///
/// # Errors
///
/// Returns an error if argument parsing, loading the parameters, the setup function or the run
/// itself fails.
pub fn run_with_custom_args<A, F>(setup_fn: F) -> Result<Context, SimError>
where
    A: Args + ParameterOverrides,
    F: Fn(&mut Context, BaseArgs, Option<A>) -> Result<(), SimError>,
{
    run_with_custom_args_from(std::env::args_os(), setup_fn)
}

/// Like [`run_with_custom_args`] with an explicit argument list, the first item being the
/// program name.
///
/// # Errors
///
/// See [`run_with_custom_args`].
pub fn run_with_custom_args_from<A, F, I, T>(args: I, setup_fn: F) -> Result<Context, SimError>
where
    A: Args + ParameterOverrides,
    F: Fn(&mut Context, BaseArgs, Option<A>) -> Result<(), SimError>,
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = A::augment_args(create_cli());
    let matches = cli.try_get_matches_from(args)?;

    let base_args_matches = BaseArgs::from_arg_matches(&matches)?;
    let custom_matches = A::from_arg_matches(&matches)?;
    run_with_args_internal(base_args_matches, Some(custom_matches), setup_fn)
}

fn configure_logging(args: &BaseArgs) -> Result<(), SimError> {
    if let Some(log_level) = &args.log_level {
        let spec: LogSpec = log_level.parse()?;
        apply_log_spec(&spec);
    } else {
        let level = match args.verbose {
            0 => DEFAULT_LOG_LEVEL,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        };
        set_log_level(level);
    }
    Ok(())
}

pub(crate) fn run_with_args_internal<A, F>(
    args: BaseArgs,
    custom_args: Option<A>,
    setup_fn: F,
) -> Result<Context, SimError>
where
    A: ParameterOverrides,
    F: Fn(&mut Context, BaseArgs, Option<A>) -> Result<(), SimError>,
{
    configure_logging(&args)?;
    let mut context = Context::new();

    let mut parameters = match &args.config {
        Some(config_path) => {
            info!("loading parameters from {}", config_path.display());
            context.load_parameters_from_json::<HospitalParameters>(config_path)?
        }
        None => HospitalParameters::default(),
    };
    if let Some(custom_args) = &custom_args {
        custom_args.apply(&mut parameters);
    }
    context.set_global_property_value(Parameters, parameters)?;

    let report_config = context.report_options();
    if let Some(output_dir) = &args.output_dir {
        report_config.directory(output_dir.clone());
    }
    report_config
        .file_prefix(args.file_prefix.clone())
        .overwrite(args.force_overwrite);

    context.init_random(args.random_seed);

    // Run the provided Fn
    setup_fn(&mut context, args, custom_args)?;

    context.execute()?;
    Ok(context)
}
