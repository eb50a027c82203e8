//! ---
//! cs_section: "04-reconciliation"
//! cs_subsection: "module"
//! cs_type: "source"
//! cs_scope: "code"
//! cs_description: "Blocks discovery until the cluster has elected a DC."
//! cs_version: "v0.1.0"
//! cs_owner: "tbd"
//! ---
use std::path::PathBuf;
use std::thread;
use std::time::Instant;

use cs_common::config::ReadinessConfig;
use tracing::{debug, info};

use crate::command::{CommandRunner, Invocation};
use crate::errors::{ProviderError, Result};

/// Precondition for querying the cluster configuration.
pub trait ReadinessGate {
    fn wait_until_ready(&self) -> Result<()>;
}

/// Gate that never blocks.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopGate;

impl ReadinessGate for NoopGate {
    fn wait_until_ready(&self) -> Result<()> {
        Ok(())
    }
}

/// Polls `crm_attribute --type crm_config --query --name dc-version` until the
/// cluster reports a DC version, then waits `settle` since the attribute can
/// appear slightly before the CIB accepts queries.
#[derive(Debug, Clone)]
pub struct DcVersionGate<R> {
    runner: R,
    attribute_binary: PathBuf,
    config: ReadinessConfig,
}

impl<R: CommandRunner> DcVersionGate<R> {
    pub fn new(runner: R, attribute_binary: impl Into<PathBuf>, config: ReadinessConfig) -> Self {
        Self {
            runner,
            attribute_binary: attribute_binary.into(),
            config,
        }
    }

    fn probe(&self) -> Invocation {
        Invocation::new(
            &self.attribute_binary,
            ["--type", "crm_config", "--query", "--name", "dc-version"],
        )
    }

    fn is_ready(&self) -> bool {
        match self.runner.run(&self.probe()) {
            Ok(output) if output.is_success() => true,
            Ok(output) => {
                debug!(status = ?output.status, "cluster not ready, retrying");
                false
            }
            Err(err) => {
                debug!(error = %err, "readiness probe could not run, retrying");
                false
            }
        }
    }
}

impl<R: CommandRunner> ReadinessGate for DcVersionGate<R> {
    fn wait_until_ready(&self) -> Result<()> {
        if !self.config.enabled {
            return Ok(());
        }
        let started = Instant::now();
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            if self.is_ready() {
                break;
            }
            if started.elapsed() + self.config.poll_interval >= self.config.timeout {
                return Err(ProviderError::NotReady(self.config.timeout));
            }
            thread::sleep(self.config.poll_interval);
        }
        thread::sleep(self.config.settle);
        info!(attempts, "cluster ready");
        Ok(())
    }
}
