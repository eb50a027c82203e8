//! ---
//! cs_section: "05-cli"
//! cs_subsection: "binary"
//! cs_type: "source"
//! cs_scope: "code"
//! cs_description: "Control CLI for inspecting and reconciling cluster primitives."
//! cs_version: "v0.1.0"
//! cs_owner: "tbd"
//! ---
use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use cs_common::config::{AppConfig, LoadedAppConfig};
use cs_common::logging::{init_tracing, LogFormat};
use cs_provider::{DcVersionGate, PrimitiveProvider, SystemCommandRunner};
use tracing::debug;

mod cluster;
mod reconcile;

const SERVICE_NAME: &str = "cs-primitivectl";
const DEFAULT_CONFIG_PATH: &str = "/etc/cs-primitive/config.toml";

#[derive(Debug, Parser)]
#[command(
    author,
    disable_version_flag = true,
    about = "Pacemaker primitive reconciliation utility",
    long_about = None
)]
struct Cli {
    #[arg(
        short = 'V',
        long = "version",
        action = ArgAction::SetTrue,
        help = "Print version information and exit"
    )]
    version: bool,

    /// Configuration file (defaults to CS_PRIMITIVE_CONFIG, then /etc/cs-primitive/config.toml).
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print the primitives currently defined in the cluster.
    Show(cluster::ShowCommand),
    /// Print the configuration statements a manifest would load.
    Render(reconcile::RenderCommand),
    /// Bring the cluster in line with a manifest.
    Apply(reconcile::ApplyCommand),
    /// Stop and delete a primitive.
    Destroy(cluster::NameArg),
    /// Wrap a primitive in its promotion wrapper.
    Promote(cluster::PromoteCommand),
    /// Remove the promotion wrapper of a primitive.
    Demote(cluster::NameArg),
}

/// Configuration plus the collaborators every cluster-facing command needs.
pub struct Session {
    pub config: AppConfig,
}

impl Session {
    fn load(path: Option<&PathBuf>) -> Result<Self> {
        let LoadedAppConfig { config, source } = match path {
            Some(path) => LoadedAppConfig {
                config: AppConfig::from_path(path)?,
                source: Some(path.clone()),
            },
            None => AppConfig::load_with_source(&[DEFAULT_CONFIG_PATH])?,
        };
        init_logging(&config);
        debug!(source = ?source, "configuration loaded");
        Ok(Self { config })
    }

    pub fn provider(&self) -> PrimitiveProvider<SystemCommandRunner> {
        PrimitiveProvider::new(SystemCommandRunner, &self.config.crm)
    }

    pub fn readiness_gate(&self) -> DcVersionGate<SystemCommandRunner> {
        DcVersionGate::new(
            SystemCommandRunner,
            &self.config.crm.attribute_binary,
            self.config.readiness.clone(),
        )
    }
}

fn init_logging(config: &AppConfig) {
    let logging = &config.logging;
    if logging.directory.is_none() && logging.format == LogFormat::Pretty {
        cs_logging::init();
        return;
    }
    if let Err(err) = init_tracing(SERVICE_NAME, logging) {
        cs_logging::init();
        tracing::warn!(error = %err, "file logging unavailable, using stderr only");
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    if cli.version {
        println!("{SERVICE_NAME} {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }
    let Some(command) = cli.command else {
        anyhow::bail!("no command given; see --help");
    };

    if let Commands::Render(cmd) = &command {
        cs_logging::init();
        return reconcile::render(cmd);
    }

    let session = Session::load(cli.config.as_ref())?;
    match command {
        Commands::Show(cmd) => cluster::show(&session, &cmd)?,
        Commands::Apply(cmd) => reconcile::apply(&session, &cmd)?,
        Commands::Destroy(cmd) => cluster::destroy(&session, &cmd)?,
        Commands::Promote(cmd) => cluster::promote(&session, &cmd)?,
        Commands::Demote(cmd) => cluster::demote(&session, &cmd)?,
        Commands::Render(_) => {}
    }
    Ok(())
}
