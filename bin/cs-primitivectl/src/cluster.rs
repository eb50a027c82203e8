//! ---
//! cs_section: "05-cli"
//! cs_subsection: "binary"
//! cs_type: "source"
//! cs_scope: "code"
//! cs_description: "Commands acting on individual primitives of the live cluster."
//! cs_version: "v0.1.0"
//! cs_owner: "tbd"
//! ---
use anyhow::{anyhow, Context, Result};
use clap::{Args, ValueEnum};
use cs_cib::{AttributeMap, ConfigurationUpdate};
use cs_logging::{log_system_event, LogContext, SystemEventOutcome};
use cs_provider::{ReadinessGate, StagedState};

use crate::Session;

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    /// crm shell statements.
    #[default]
    Text,
    Json,
    Yaml,
}

#[derive(Debug, Args)]
pub struct ShowCommand {
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Only show this primitive.
    #[arg(value_name = "NAME")]
    name: Option<String>,
}

#[derive(Debug, Args)]
pub struct NameArg {
    /// Primitive name as it appears in the CIB.
    #[arg(value_name = "NAME")]
    name: String,
}

#[derive(Debug, Args)]
pub struct PromoteCommand {
    #[arg(value_name = "NAME")]
    name: String,

    /// Metadata for the promotion wrapper, as KEY=VALUE.
    #[arg(long = "meta", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    meta: Vec<(String, String)>,
}

fn parse_key_value(raw: &str) -> Result<(String, String)> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("expected KEY=VALUE, got `{raw}`"))?;
    if key.trim().is_empty() {
        return Err(anyhow!("empty key in `{raw}`"));
    }
    Ok((key.trim().to_owned(), value.to_owned()))
}

pub fn show(session: &Session, cmd: &ShowCommand) -> Result<()> {
    session.readiness_gate().wait_until_ready()?;
    let mut primitives = session
        .provider()
        .instances()
        .context("unable to read cluster configuration")?;
    if let Some(name) = &cmd.name {
        primitives.retain(|primitive| &primitive.name == name);
        if primitives.is_empty() {
            return Err(anyhow!("no primitive named `{name}`"));
        }
    }

    match cmd.format {
        OutputFormat::Text => {
            for primitive in &primitives {
                print!("{}", ConfigurationUpdate::for_primitive(primitive));
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&primitives)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(&primitives)?),
    }
    Ok(())
}

pub fn destroy(session: &Session, cmd: &NameArg) -> Result<()> {
    session.readiness_gate().wait_until_ready()?;
    session
        .provider()
        .destroy(&mut StagedState::new(), &cmd.name)
        .with_context(|| format!("unable to destroy `{}`", cmd.name))?;
    println!("Destroyed {}", cmd.name);
    Ok(())
}

pub fn demote(session: &Session, cmd: &NameArg) -> Result<()> {
    session.readiness_gate().wait_until_ready()?;
    session
        .provider()
        .set_promotable(&mut StagedState::new(), &cmd.name, false)
        .with_context(|| format!("unable to demote `{}`", cmd.name))?;
    println!("Removed promotion wrapper of {}", cmd.name);
    Ok(())
}

pub fn promote(session: &Session, cmd: &PromoteCommand) -> Result<()> {
    session.readiness_gate().wait_until_ready()?;
    let provider = session.provider();
    let mut state = StagedState::new();
    state.adopt_all(provider.instances()?);

    provider
        .set_promotable(&mut state, &cmd.name, true)
        .with_context(|| format!("`{}` is not defined in the cluster", cmd.name))?;
    if !cmd.meta.is_empty() {
        let meta: AttributeMap = cmd.meta.iter().cloned().collect();
        if let Some(staged) = state.get_mut(&cmd.name) {
            staged.set_promotion_metadata(meta);
        }
    }

    let ctx = LogContext::new()
        .with_primitive(&cmd.name)
        .with_operation("promote");
    match provider.flush(&mut state, &cmd.name) {
        Ok(_) => {
            log_system_event(
                Some(&ctx),
                "cli.promote",
                "promotion wrapper loaded",
                SystemEventOutcome::Success,
            );
            println!("Promoted {}", cmd.name);
            Ok(())
        }
        Err(err) => {
            log_system_event(
                Some(&ctx),
                "cli.promote",
                &err.to_string(),
                SystemEventOutcome::Fault,
            );
            Err(err.into())
        }
    }
}
