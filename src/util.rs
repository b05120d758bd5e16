//! Utility functions for use in other parts of escher
use crate::Result;
use nix::unistd::setsid;
use std::{
    os::unix::process::CommandExt,
    process::{Command, Stdio},
};
use tracing::info;

/// Run an external command, fully detached from the window manager process.
///
/// The child is placed in its own session so it survives the window manager
/// exiting, and its stdio is redirected to /dev/null. The X connection is
/// opened close-on-exec by the backend, so children never inherit it. An
/// exec failure in the child is reported back as the returned error.
pub fn spawn(argv: &[String]) -> Result<()> {
    let Some((cmd, args)) = argv.split_first() else {
        return Ok(());
    };
    info!(%cmd, "spawning subprocess");

    let mut command = Command::new(cmd);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    // SAFETY: setsid is async-signal-safe and does not allocate
    unsafe {
        command.pre_exec(|| {
            let _ = setsid();
            Ok(())
        });
    }

    command.spawn()?;

    Ok(())
}

/// Run an external command given as a single whitespace separated string.
pub fn spawn_cmd(cmd: impl Into<String>) -> Result<()> {
    let argv: Vec<String> = cmd.into().split_whitespace().map(String::from).collect();

    spawn(&argv)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_with_an_empty_argv_is_a_noop() {
        assert!(spawn(&[]).is_ok());
    }

    #[test]
    fn spawn_reports_missing_binaries() {
        let res = spawn(&["definitely-not-a-real-binary-xyz".to_owned()]);

        assert!(res.is_err());
    }
}
