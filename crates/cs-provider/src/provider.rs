//! ---
//! cs_section: "04-reconciliation"
//! cs_subsection: "module"
//! cs_type: "source"
//! cs_scope: "code"
//! cs_description: "Lifecycle controller: discovery, staging, destroy, promotion and flush."
//! cs_version: "v0.1.0"
//! cs_owner: "tbd"
//! ---
use std::io::Write;
use std::path::PathBuf;

use cs_cib::{parse_primitives, promotion_wrapper_name, ConfigurationUpdate, Primitive};
use cs_common::config::CrmConfig;
use cs_logging::{cs_debug, cs_info, log_system_event, LogContext, SystemEventOutcome};
use tempfile::Builder;
use tracing::warn;

use crate::command::{CommandOutput, CommandRunner, CrmShell, Invocation};
use crate::errors::{CommandError, ProviderError, Result};
use crate::staging::{PrimitiveRequest, StagedPrimitive, StagedState};

const STAGING_PREFIX: &str = "cs_primitive_update";

/// Drives the crm shell on behalf of a reconciliation run.
///
/// The provider holds no per-primitive state of its own; every lifecycle
/// operation works against the [`StagedState`] lent to it by the caller.
#[derive(Debug, Clone)]
pub struct PrimitiveProvider<R> {
    runner: R,
    crm: CrmShell,
    staging_dir: Option<PathBuf>,
    default_shadow: Option<String>,
}

impl<R: CommandRunner> PrimitiveProvider<R> {
    pub fn new(runner: R, config: &CrmConfig) -> Self {
        Self {
            runner,
            crm: CrmShell::new(&config.binary),
            staging_dir: config.staging_dir.clone(),
            default_shadow: config.shadow.clone(),
        }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Every primitive currently defined in the configured CIB (the shadow
    /// named by `crm.shadow`, or the live one).
    pub fn instances(&self) -> Result<Vec<Primitive>> {
        let output = self.invoke(self.crm.show_xml(self.default_shadow.as_deref()))?;
        let xml = String::from_utf8_lossy(&output.stdout);
        let primitives = parse_primitives(&xml)?;
        cs_debug!(
            context = LogContext::new().with_operation("discover"),
            "discovered {} primitives",
            primitives.len()
        );
        Ok(primitives)
    }

    /// Record `request` for the next flush. Nothing is sent to the cluster.
    pub fn create(&self, state: &mut StagedState, request: PrimitiveRequest) -> Result<()> {
        request.validate()?;
        let primitive = request.to_primitive();
        let ctx = LogContext::new()
            .with_primitive(&primitive.name)
            .with_shadow(request.shadow.as_deref())
            .with_operation("create");
        cs_debug!(context = ctx, "staged {}", primitive.agent);
        state.stage(StagedPrimitive::pending(primitive, request.shadow.clone()));
        Ok(())
    }

    /// Stop then delete `name`, clearing its staged entry once both succeed.
    ///
    /// A failed delete after a successful stop is not compensated; the
    /// primitive stays defined and stopped.
    pub fn destroy(&self, state: &mut StagedState, name: &str) -> Result<()> {
        let ctx = LogContext::new()
            .with_primitive(name)
            .with_operation("destroy");
        match self.stop_then_delete(name) {
            Ok(()) => {
                state.remove(name);
                log_system_event(
                    Some(&ctx),
                    "primitive.destroy",
                    "primitive stopped and removed",
                    SystemEventOutcome::Success,
                );
                Ok(())
            }
            Err(err) => {
                log_system_event(
                    Some(&ctx),
                    "primitive.destroy",
                    &err.to_string(),
                    SystemEventOutcome::Fault,
                );
                Err(err)
            }
        }
    }

    /// Toggle promotion for `name`.
    ///
    /// Turning promotion off removes the `ms_<name>` wrapper from the cluster
    /// right away. Turning it on is recorded only; the wrapper is written by
    /// the next [`flush`](Self::flush).
    pub fn set_promotable(&self, state: &mut StagedState, name: &str, promotable: bool) -> Result<()> {
        if promotable {
            let staged = state
                .get_mut(name)
                .ok_or_else(|| ProviderError::NotStaged(name.to_owned()))?;
            staged.set_promotable(true);
            return Ok(());
        }

        let wrapper = promotion_wrapper_name(name);
        let ctx = LogContext::new()
            .with_primitive(&wrapper)
            .with_operation("demote");
        if let Err(err) = self.stop_then_delete(&wrapper) {
            log_system_event(
                Some(&ctx),
                "primitive.demote",
                &err.to_string(),
                SystemEventOutcome::Fault,
            );
            return Err(err);
        }
        if let Some(staged) = state.get_mut(name) {
            staged.set_promotable(false);
        }
        log_system_event(
            Some(&ctx),
            "primitive.demote",
            "promotion wrapper removed",
            SystemEventOutcome::Success,
        );
        Ok(())
    }

    /// Write the staged definition of `name` as one `crm configure load update`
    /// transaction. Returns `false` without contacting the cluster when there
    /// is nothing to write.
    ///
    /// The entry is dropped from `state` only after the cluster accepts it.
    pub fn flush(&self, state: &mut StagedState, name: &str) -> Result<bool> {
        let Some(staged) = state.get(name).filter(|staged| staged.is_dirty()) else {
            return Ok(false);
        };
        let shadow = staged.shadow().or(self.default_shadow.as_deref());
        let ctx = LogContext::new()
            .with_primitive(name)
            .with_shadow(shadow)
            .with_operation("flush");
        let update = ConfigurationUpdate::for_primitive(staged.primitive()).render();

        let mut builder = Builder::new();
        builder.prefix(STAGING_PREFIX).suffix(".crm");
        let mut staging = match &self.staging_dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
        .map_err(ProviderError::Staging)?;
        staging
            .write_all(update.as_bytes())
            .and_then(|()| staging.flush())
            .map_err(ProviderError::Staging)?;

        let invocation = self.crm.load_update(staging.path(), shadow);
        let result = self.invoke(invocation);
        // Dropping the handle removes the staging file on every path.
        drop(staging);

        match result {
            Ok(_) => {
                cs_info!(context = ctx, "configuration update loaded");
                state.remove(name);
                Ok(true)
            }
            Err(ProviderError::Command(err)) => {
                log_system_event(
                    Some(&ctx),
                    "primitive.flush",
                    &err.to_string(),
                    SystemEventOutcome::Fault,
                );
                Err(ProviderError::Flush(err))
            }
            Err(err) => Err(err),
        }
    }

    /// Flush every dirty entry in lexical order, stopping at the first failure.
    pub fn flush_all(&self, state: &mut StagedState) -> Result<Vec<String>> {
        let mut flushed = Vec::new();
        for name in state.dirty_names() {
            if self.flush(state, &name)? {
                flushed.push(name);
            }
        }
        Ok(flushed)
    }

    fn stop_then_delete(&self, name: &str) -> Result<()> {
        let shadow = self.default_shadow.as_deref();
        self.invoke(self.crm.stop(name, shadow)).map_err(|err| match err {
            ProviderError::Command(source) => ProviderError::Sequencing {
                target: name.to_owned(),
                source,
            },
            other => other,
        })?;
        self.invoke(self.crm.delete(name, shadow))?;
        Ok(())
    }

    fn invoke(&self, invocation: Invocation) -> Result<CommandOutput> {
        let output = self
            .runner
            .run(&invocation)
            .map_err(|source| ProviderError::Spawn {
                command: invocation.to_string(),
                source,
            })?;
        if output.is_success() {
            return Ok(output);
        }
        warn!(command = %invocation, status = ?output.status, "control command failed");
        Err(CommandError {
            command: invocation.to_string(),
            status: output.status,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
        .into())
    }
}
