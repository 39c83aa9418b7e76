//! External command execution.
//!
//! Builder-based API for running a configured tool (the bundler) with a
//! working directory and environment. Unlike a plain `Command::output`,
//! a non-zero exit is not an error here: callers decide whether a failed
//! run is a user-facing diagnostic or an infrastructure problem.
//!
//! # Examples
//!
//! ```ignore
//! use crate::utils::exec::Cmd;
//!
//! let output = Cmd::from_slice(&["esbuild", "src/index.js", "--bundle"])
//!     .cwd(root)
//!     .envs([("BRISK_MODE", "production")])
//!     .run()?;
//! ```

use std::{
    ffi::{OsStr, OsString},
    io,
    path::{Path, PathBuf},
    process::{Command, Output},
};

/// Command builder for external process execution.
#[derive(Debug, Default)]
pub struct Cmd {
    program: OsString,
    args: Vec<OsString>,
    cwd: Option<PathBuf>,
    envs: Vec<(String, String)>,
}

impl Cmd {
    /// Create a new command builder.
    pub fn new<S: AsRef<OsStr>>(program: S) -> Self {
        Self {
            program: program.as_ref().to_owned(),
            ..Default::default()
        }
    }

    /// Create from a command array (e.g., `["esbuild"]` or `["npx", "esbuild"]`).
    pub fn from_slice<S: AsRef<OsStr>>(cmd: &[S]) -> Self {
        let mut iter = cmd.iter();
        let program = iter
            .next()
            .map(|s| s.as_ref().to_owned())
            .unwrap_or_default();
        let args: Vec<_> = iter.map(|s| s.as_ref().to_owned()).collect();
        Self {
            program,
            args,
            ..Default::default()
        }
    }

    /// Add multiple arguments. Empty arguments are skipped.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        for arg in args {
            let arg = arg.as_ref();
            if !arg.is_empty() {
                self.args.push(arg.to_owned());
            }
        }
        self
    }

    /// Set working directory.
    pub fn cwd<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.cwd = Some(dir.as_ref().to_owned());
        self
    }

    /// Set environment variables for the subprocess.
    pub fn envs<K, V, I>(mut self, vars: I) -> Self
    where
        K: AsRef<str>,
        V: AsRef<str>,
        I: IntoIterator<Item = (K, V)>,
    {
        for (k, v) in vars {
            self.envs.push((k.as_ref().to_owned(), v.as_ref().to_owned()));
        }
        self
    }

    /// Program name for messages.
    pub fn program_name(&self) -> String {
        self.program.to_string_lossy().to_string()
    }

    /// Execute the command and capture its output.
    ///
    /// Only spawn failures are errors; inspect `Output::status` for the
    /// exit code.
    pub fn run(self) -> io::Result<Output> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).envs(self.envs.iter().cloned());

        if let Some(dir) = &self.cwd {
            cmd.current_dir(dir);
        }

        cmd.output()
    }
}

/// Render the captured output of a failed run as a diagnostic.
///
/// Prefers stderr; stdout is appended when it carries anything.
pub fn format_failure(name: &str, output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);

    let mut msg = format!("`{name}` exited with {}", output.status);
    let stderr = stderr.trim();
    if !stderr.is_empty() {
        msg.push_str("\n\n");
        msg.push_str(stderr);
    }

    let stdout = stdout.trim();
    if !stdout.is_empty() {
        msg.push_str("\n\n");
        msg.push_str(stdout);
    }
    msg
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cmd_builder() {
        let cmd = Cmd::new("echo").args(["hello", "", "world"]).cwd("/tmp");

        assert_eq!(cmd.program, OsString::from("echo"));
        assert_eq!(cmd.args.len(), 2);
        assert_eq!(cmd.cwd, Some(PathBuf::from("/tmp")));
    }

    #[test]
    fn test_cmd_from_slice() {
        let cmd = Cmd::from_slice(&["npx", "esbuild", "--bundle"]);
        assert_eq!(cmd.program_name(), "npx");
        assert_eq!(cmd.args, vec![OsString::from("esbuild"), OsString::from("--bundle")]);
    }

    #[test]
    fn test_cmd_from_empty_slice() {
        let empty: [&str; 0] = [];
        let cmd = Cmd::from_slice(&empty);
        assert!(cmd.program.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_run_reports_exit_status() {
        let output = Cmd::from_slice(&["sh", "-c", "echo oops >&2; exit 3"])
            .run()
            .unwrap();
        assert!(!output.status.success());

        let msg = format_failure("sh", &output);
        assert!(msg.contains("oops"));
    }
}
