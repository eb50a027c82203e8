//! ---
//! cs_section: "04-reconciliation"
//! cs_subsection: "module"
//! cs_type: "source"
//! cs_scope: "code"
//! cs_description: "External control command interface and crm shell invocations."
//! cs_version: "v0.1.0"
//! cs_owner: "tbd"
//! ---
use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use parking_lot::Mutex;
use tracing::debug;

/// Environment variable the crm shell reads to target a configuration shadow.
pub const SHADOW_ENV: &str = "CIB_shadow";

/// A fully described external command: program, argument vector and extra environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
}

impl Invocation {
    pub fn new<I, S>(program: impl Into<PathBuf>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            env: BTreeMap::new(),
        }
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in &self.env {
            write!(f, "{key}={value} ")?;
        }
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Captured result of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub status: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl CommandOutput {
    pub fn success(stdout: impl Into<Vec<u8>>) -> Self {
        Self {
            status: Some(0),
            stdout: stdout.into(),
            stderr: Vec::new(),
        }
    }

    pub fn failure(status: i32, stderr: impl Into<Vec<u8>>) -> Self {
        Self {
            status: Some(status),
            stdout: Vec::new(),
            stderr: stderr.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == Some(0)
    }
}

/// Runs external control commands. Non-zero exits are reported through
/// [`CommandOutput::status`]; only failures to run the program at all are errors.
pub trait CommandRunner {
    fn run(&self, invocation: &Invocation) -> io::Result<CommandOutput>;
}

impl<R: CommandRunner + ?Sized> CommandRunner for &R {
    fn run(&self, invocation: &Invocation) -> io::Result<CommandOutput> {
        (**self).run(invocation)
    }
}

/// Spawns real processes and waits for them to finish.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandRunner;

impl CommandRunner for SystemCommandRunner {
    fn run(&self, invocation: &Invocation) -> io::Result<CommandOutput> {
        debug!(command = %invocation, "running external command");
        let output = Command::new(&invocation.program)
            .args(&invocation.args)
            .envs(&invocation.env)
            .output()?;
        Ok(CommandOutput {
            status: output.status.code(),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}

/// Builds the crm shell invocations the controller needs.
#[derive(Debug, Clone)]
pub struct CrmShell {
    binary: PathBuf,
}

impl CrmShell {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// `crm configure show xml`
    pub fn show_xml(&self, shadow: Option<&str>) -> Invocation {
        scoped(
            Invocation::new(&self.binary, ["configure", "show", "xml"]),
            shadow,
        )
    }

    /// `crm resource stop <name>`
    pub fn stop(&self, name: &str, shadow: Option<&str>) -> Invocation {
        scoped(
            Invocation::new(&self.binary, ["resource", "stop", name]),
            shadow,
        )
    }

    /// `crm configure delete <name>`
    pub fn delete(&self, name: &str, shadow: Option<&str>) -> Invocation {
        scoped(
            Invocation::new(&self.binary, ["configure", "delete", name]),
            shadow,
        )
    }

    /// `crm configure load update <path>`
    pub fn load_update(&self, path: &Path, shadow: Option<&str>) -> Invocation {
        let invocation = Invocation::new(
            &self.binary,
            [
                "configure".to_owned(),
                "load".to_owned(),
                "update".to_owned(),
                path.display().to_string(),
            ],
        );
        scoped(invocation, shadow)
    }
}

/// Point `invocation` at `shadow` through the environment; `None` targets the live CIB.
fn scoped(invocation: Invocation, shadow: Option<&str>) -> Invocation {
    match shadow {
        Some(shadow) => invocation.with_env(SHADOW_ENV, shadow),
        None => invocation,
    }
}

/// An invocation observed by [`RecordingCommandRunner`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
    /// Content of the file named by the last argument, read at call time.
    pub staged_content: Option<String>,
}

impl RecordedCall {
    pub fn starts_with(&self, prefix: &[&str]) -> bool {
        self.args.len() >= prefix.len() && self.args.iter().zip(prefix).all(|(a, p)| a == p)
    }

    pub fn staged_path(&self) -> Option<&Path> {
        self.staged_content
            .as_ref()
            .and_then(|_| self.args.last())
            .map(Path::new)
    }
}

#[derive(Debug)]
struct ScriptedResponse {
    prefix: Vec<String>,
    output: CommandOutput,
    remaining: Option<usize>,
}

/// Scripted runner for tests: records every call and answers from
/// prefix-matched rules, succeeding with empty output when no rule matches.
#[derive(Debug, Default)]
pub struct RecordingCommandRunner {
    calls: Mutex<Vec<RecordedCall>>,
    responses: Mutex<Vec<ScriptedResponse>>,
}

impl RecordingCommandRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every call whose arguments start with `prefix` with `output`.
    pub fn respond(self, prefix: &[&str], output: CommandOutput) -> Self {
        self.push_response(prefix, output, None);
        self
    }

    /// Answer the next `times` matching calls with `output`, then fall through.
    pub fn respond_times(self, prefix: &[&str], times: usize, output: CommandOutput) -> Self {
        self.push_response(prefix, output, Some(times));
        self
    }

    fn push_response(&self, prefix: &[&str], output: CommandOutput, remaining: Option<usize>) {
        self.responses.lock().push(ScriptedResponse {
            prefix: prefix.iter().map(|s| (*s).to_owned()).collect(),
            output,
            remaining,
        });
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self, prefix: &[&str]) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| call.starts_with(prefix))
            .count()
    }
}

impl CommandRunner for RecordingCommandRunner {
    fn run(&self, invocation: &Invocation) -> io::Result<CommandOutput> {
        let staged_content = invocation
            .args
            .last()
            .map(Path::new)
            .filter(|path| path.is_file())
            .map(std::fs::read_to_string)
            .transpose()?;
        let call = RecordedCall {
            args: invocation.args.clone(),
            env: invocation.env.clone(),
            staged_content,
        };

        let mut responses = self.responses.lock();
        let output = responses
            .iter_mut()
            .find(|response| {
                call.starts_with(&response.prefix.iter().map(String::as_str).collect::<Vec<_>>())
                    && response.remaining != Some(0)
            })
            .map(|response| {
                if let Some(remaining) = response.remaining.as_mut() {
                    *remaining -= 1;
                }
                response.output.clone()
            })
            .unwrap_or_else(|| CommandOutput::success(Vec::new()));
        self.calls.lock().push(call);
        Ok(output)
    }
}
