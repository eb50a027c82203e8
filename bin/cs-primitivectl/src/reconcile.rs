//! ---
//! cs_section: "05-cli"
//! cs_subsection: "binary"
//! cs_type: "source"
//! cs_scope: "code"
//! cs_description: "Manifest-driven render and apply commands."
//! cs_version: "v0.1.0"
//! cs_owner: "tbd"
//! ---
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{ArgAction, Args};
use cs_cib::ConfigurationUpdate;
use cs_logging::{log_system_event, SystemEventOutcome};
use cs_provider::{apply_plan, plan, DesiredPrimitive, Manifest, ReadinessGate, StagedState};

use crate::Session;

#[derive(Debug, Args)]
pub struct RenderCommand {
    /// Desired-state manifest (TOML).
    #[arg(value_name = "MANIFEST")]
    manifest: PathBuf,
}

#[derive(Debug, Args)]
pub struct ApplyCommand {
    /// Desired-state manifest (TOML).
    #[arg(value_name = "MANIFEST")]
    manifest: PathBuf,

    /// Print the plan without changing the cluster.
    #[arg(long = "dry-run", action = ArgAction::SetTrue)]
    dry_run: bool,

    /// Print the plan as JSON instead of one line per action.
    #[arg(long, action = ArgAction::SetTrue)]
    json: bool,
}

fn load_manifest(path: &Path) -> Result<Vec<DesiredPrimitive>> {
    let manifest = Manifest::from_path(path)
        .with_context(|| format!("unable to load manifest {}", path.display()))?;
    Ok(manifest.desired()?)
}

pub fn render(cmd: &RenderCommand) -> Result<()> {
    for entry in load_manifest(&cmd.manifest)? {
        match entry {
            DesiredPrimitive::Present(request) => {
                print!("{}", ConfigurationUpdate::for_primitive(&request.to_primitive()));
            }
            DesiredPrimitive::Absent(name) => println!("# {name}: absent"),
        }
    }
    Ok(())
}

pub fn apply(session: &Session, cmd: &ApplyCommand) -> Result<()> {
    let desired = load_manifest(&cmd.manifest)?;
    session.readiness_gate().wait_until_ready()?;
    let provider = session.provider();
    let discovered = provider
        .instances()
        .context("unable to read cluster configuration")?;
    let plan = plan(&discovered, &desired);

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
        for action in &plan.actions {
            println!("{action}");
        }
    }
    if cmd.dry_run || plan.is_converged() {
        return Ok(());
    }

    let mut state = StagedState::new();
    state.adopt_all(discovered);
    match apply_plan(&provider, &mut state, &plan) {
        Ok(applied) => {
            log_system_event(
                None,
                "cli.apply",
                &format!("{applied} actions applied from {}", cmd.manifest.display()),
                SystemEventOutcome::Success,
            );
            Ok(())
        }
        Err(err) => {
            log_system_event(
                None,
                "cli.apply",
                &format!("apply of {} stopped: {err}", cmd.manifest.display()),
                SystemEventOutcome::Fault,
            );
            Err(err.into())
        }
    }
}
