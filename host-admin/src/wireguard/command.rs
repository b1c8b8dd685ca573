//! External commands run during setup, echoed as `[~] cmd` before they start.

use crate::error::{AdminError, Result};
use std::io::Write;
use std::process::{Command, Stdio};
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct CommandRunner {
    quiet: bool,
}

fn display(program: &str, args: &[&str]) -> String {
    std::iter::once(program)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ")
}

/// A program missing from PATH is reported by name
fn spawn_error(program: &str, e: std::io::Error) -> AdminError {
    if e.kind() == std::io::ErrorKind::NotFound {
        AdminError::MissingProgram {
            program: program.to_string(),
        }
    } else {
        AdminError::Io(e)
    }
}

impl CommandRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// No `[~]` echo
    #[cfg(test)]
    pub fn quiet() -> Self {
        Self { quiet: true }
    }

    fn announce(&self, command: &str) {
        if !self.quiet {
            println!("[~] {command}");
        }
        debug!("Running {}", command);
    }

    /// Run with inherited stdio; a nonzero exit is an error
    pub fn run(&self, program: &str, args: &[&str]) -> Result<()> {
        let command = display(program, args);
        self.announce(&command);

        let status = Command::new(program)
            .args(args)
            .status()
            .map_err(|e| spawn_error(program, e))?;
        if status.success() {
            Ok(())
        } else {
            Err(AdminError::CommandFailed {
                command,
                status: status.to_string(),
            })
        }
    }

    /// Run and only report whether it succeeded
    pub fn run_allow_failure(&self, program: &str, args: &[&str]) -> bool {
        match self.run(program, args) {
            Ok(()) => true,
            Err(e) => {
                debug!("Ignoring failure: {}", e);
                false
            }
        }
    }

    /// Run and return trimmed stdout
    pub fn capture(&self, program: &str, args: &[&str]) -> Result<String> {
        self.capture_with_input(program, args, None)
    }

    /// Run with `input` on stdin and return trimmed stdout
    pub fn capture_with_input(&self, program: &str, args: &[&str], input: Option<&str>) -> Result<String> {
        let command = display(program, args);
        self.announce(&command);

        let mut child = Command::new(program)
            .args(args)
            .stdin(if input.is_some() { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| spawn_error(program, e))?;

        if let (Some(input), Some(mut stdin)) = (input, child.stdin.take()) {
            stdin.write_all(input.as_bytes())?;
        }

        let output = child.wait_with_output()?;
        if !output.status.success() {
            return Err(AdminError::CommandFailed {
                command,
                status: output.status.to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}
