use std::process::ExitCode;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use gst_linkage::config::{ConfigLoader, ResolvedConfig};
use gst_linkage::domain::{Gstin, IdentifierKind, Pan, validate};
use gst_linkage::error::{ErrorKind, LookupError};
use gst_linkage::output::{JsonOutput, OutputMode, TextOutput};
use gst_linkage::registry::VlinkHttpClient;
use gst_linkage::resolver::{LinkageResolver, ProgressSink, ResolverOptions};
use gst_linkage::session::{SessionPhase, SharedSession};

#[derive(Parser)]
#[command(name = "gstlink")]
#[command(about = "Look up GST registrations linked to a PAN through the vlink registry")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    non_interactive: bool,

    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Find every GST registration linked to a PAN")]
    Pan(PanArgs),
    #[command(about = "Show one GST registration")]
    Gst(GstArgs),
    #[command(about = "Check an identifier's format without calling the registry")]
    Validate(ValidateArgs),
}

#[derive(Args)]
struct PanArgs {
    pan: String,

    #[arg(long)]
    best_effort: bool,

    #[arg(long)]
    timeout_secs: Option<u64>,
}

#[derive(Args)]
struct GstArgs {
    gstin: String,
}

#[derive(Args)]
struct ValidateArgs {
    #[arg(value_enum)]
    kind: IdentifierKind,
    value: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(report) => {
            eprintln!("{report:?}");
            if let Some(err) = report.downcast_ref::<LookupError>() {
                return ExitCode::from(map_exit_code(err.kind()));
            }
            ExitCode::from(1)
        }
    }
}

fn map_exit_code(kind: ErrorKind) -> u8 {
    match kind {
        ErrorKind::NotFound => 2,
        ErrorKind::Upstream | ErrorKind::PartialFetchFailure | ErrorKind::Transport => 3,
        ErrorKind::Validation => 4,
        ErrorKind::Config => 1,
    }
}

async fn run() -> miette::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.non_interactive {
        OutputMode::NonInteractive
    } else {
        OutputMode::Interactive
    };

    match cli.command {
        Commands::Pan(args) => {
            let config = ConfigLoader::resolve(cli.config.as_deref())?;
            run_pan(args, config, output_mode).await
        }
        Commands::Gst(args) => {
            let config = ConfigLoader::resolve(cli.config.as_deref())?;
            run_gst(args, config, output_mode).await
        }
        Commands::Validate(args) => run_validate(args, output_mode),
    }
}

async fn run_pan(
    args: PanArgs,
    mut config: ResolvedConfig,
    output_mode: OutputMode,
) -> miette::Result<ExitCode> {
    let pan: Pan = args.pan.parse().map_err(LookupError::from)?;
    if args.best_effort {
        config.strict_aggregation = false;
    }
    if let Some(secs) = args.timeout_secs {
        if secs == 0 {
            return Err(LookupError::InvalidConfig(
                "--timeout-secs must be greater than zero".to_string(),
            )
            .into());
        }
        config.timeout = Duration::from_secs(secs);
    }

    let client = VlinkHttpClient::new(&config)?;
    let resolver = LinkageResolver::new(client, ResolverOptions::from(&config));
    let session = SharedSession::new();

    let sink: &dyn ProgressSink = match output_mode {
        OutputMode::Interactive => &TextOutput,
        OutputMode::NonInteractive => &JsonOutput,
    };
    resolver.resolve_into(&session, &pan, sink).await;

    let snapshot = session.snapshot();
    match output_mode {
        OutputMode::Interactive => TextOutput::print_session(&snapshot).into_diagnostic()?,
        OutputMode::NonInteractive => JsonOutput::print_session(&snapshot).into_diagnostic()?,
    }

    if snapshot.phase() == SessionPhase::Failed {
        let kind = snapshot.error_kind().unwrap_or(ErrorKind::Upstream);
        return Ok(ExitCode::from(map_exit_code(kind)));
    }
    Ok(ExitCode::SUCCESS)
}

async fn run_gst(
    args: GstArgs,
    config: ResolvedConfig,
    output_mode: OutputMode,
) -> miette::Result<ExitCode> {
    let gstin: Gstin = args.gstin.parse().map_err(LookupError::from)?;
    let client = VlinkHttpClient::new(&config)?;
    let resolver = LinkageResolver::new(client, ResolverOptions::from(&config));

    match output_mode {
        OutputMode::Interactive => {
            let detail = resolver.lookup_gst(&gstin, &TextOutput).await?;
            TextOutput::print_detail(&detail).into_diagnostic()?;
        }
        OutputMode::NonInteractive => {
            let detail = resolver.lookup_gst(&gstin, &JsonOutput).await?;
            JsonOutput::print_detail(&detail).into_diagnostic()?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn run_validate(args: ValidateArgs, output_mode: OutputMode) -> miette::Result<ExitCode> {
    let outcome = validate(args.kind, &args.value);
    match output_mode {
        OutputMode::NonInteractive => {
            JsonOutput::print_validation(&outcome).into_diagnostic()?;
            let code = if outcome.is_ok() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(map_exit_code(ErrorKind::Validation))
            };
            Ok(code)
        }
        OutputMode::Interactive => {
            let identifier = outcome.map_err(LookupError::from)?;
            println!("valid {}: {identifier}", identifier.kind());
            Ok(ExitCode::SUCCESS)
        }
    }
}
