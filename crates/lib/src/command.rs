//! Running external programs on behalf of a target.
//!
//! Commands run in the project directory with the environment's directories,
//! mode, platform and defines exported as variables (see
//! [`Environment::command_vars`]). A non-zero exit status is a
//! [`TargetError::CommandFailed`].

use std::process::Command;

use tracing::{debug, info};

use crate::environment::Environment;
use crate::target::{Action, ActionOutput, ActionResult, TargetError};

/// Run `program` with `args` and return its trimmed stdout.
pub fn run_command(env: &Environment, program: &str, args: &[&str]) -> Result<String, TargetError> {
  let cmd_line = std::iter::once(program)
    .chain(args.iter().copied())
    .collect::<Vec<_>>()
    .join(" ");
  let mut command = Command::new(program);
  command.args(args);
  run(env, command, cmd_line)
}

/// Run a script through the platform shell and return its trimmed stdout.
pub fn run_shell(env: &Environment, script: &str) -> Result<String, TargetError> {
  let (shell, shell_args) = get_shell();
  let mut command = Command::new(shell);
  command.args(shell_args).arg(script);
  run(env, command, script.to_string())
}

/// An action that runs `script` through the platform shell.
///
/// The script is responsible for writing the target's outputs, and any
/// declared depfiles to `$BUILD_DIR/<name>`.
pub fn shell_action(script: impl Into<String>) -> Action {
  let script = script.into();
  std::sync::Arc::new(move |env: &Environment| -> ActionResult {
    run_shell(env, &script)?;
    Ok(ActionOutput::default())
  })
}

fn run(env: &Environment, mut command: Command, cmd_line: String) -> Result<String, TargetError> {
  info!(cmd = %cmd_line, "executing command");

  command.current_dir(env.project_dir()).envs(env.command_vars());

  debug!(working_dir = %env.project_dir().display(), "spawning process");

  let output = command.output().map_err(|source| TargetError::Spawn {
    cmd: cmd_line.clone(),
    source,
  })?;

  let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
  let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

  if !output.status.success() {
    if !stderr.is_empty() {
      debug!(stderr = %stderr, "command stderr");
    }
    if !stdout.is_empty() {
      debug!(stdout = %stdout, "command stdout");
    }
    return Err(TargetError::CommandFailed {
      cmd: cmd_line,
      code: output.status.code(),
      stderr,
    });
  }

  if !stdout.is_empty() {
    debug!(stdout = %stdout, "command output");
  }

  Ok(stdout)
}

/// Get the shell command and arguments for the current platform.
fn get_shell() -> (&'static str, &'static [&'static str]) {
  #[cfg(unix)]
  {
    ("/bin/sh", &["-c"][..])
  }

  #[cfg(windows)]
  {
    ("powershell.exe", &["-NoProfile", "-ExecutionPolicy", "Bypass", "-Command"][..])
  }
}
