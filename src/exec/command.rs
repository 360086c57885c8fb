// src/exec/command.rs

//! Shell-command bodies.
//!
//! A command body is an asynchronous body: invoking it spawns the process and
//! returns immediately; a supervising Tokio task signals `Done` when the
//! process exits. If the engine settles the run first (deadline), the
//! supervisor kills the process instead of reporting anything.

use std::process::Stdio;

use anyhow::Context as _;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use crate::engine::Thrown;
use crate::exec::{Done, ExecutionMode};

/// Build an asynchronous body that runs `cmd` through the platform shell.
pub fn command_body(name: impl Into<String>, cmd: impl Into<String>) -> ExecutionMode {
    let name = name.into();
    let cmd = cmd.into();

    ExecutionMode::with_done(move |_ctx, done| {
        let child = spawn_shell(&name, &cmd)?;
        tokio::spawn(supervise(name.clone(), cmd.clone(), child, done));
        Ok(())
    })
}

fn spawn_shell(name: &str, cmd: &str) -> Result<Child, Thrown> {
    info!(test = %name, cmd = %cmd, "starting command");

    let mut command = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(cmd);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(cmd);
        c
    };

    command
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let child = command
        .spawn()
        .with_context(|| format!("spawning process for test '{name}'"))?;
    Ok(child)
}

/// Wait for the process or for the run to settle, whichever comes first.
async fn supervise(name: String, cmd: String, mut child: Child, done: Done) {
    if let Some(stdout) = child.stdout.take() {
        drain_lines(name.clone(), "stdout", stdout);
    }
    if let Some(stderr) = child.stderr.take() {
        drain_lines(name.clone(), "stderr", stderr);
    }

    tokio::select! {
        status = child.wait() => match status {
            Ok(status) if status.success() => {
                debug!(test = %name, "command exited successfully");
                done.ok();
            }
            Ok(status) => {
                let code = status.code().unwrap_or(-1);
                debug!(test = %name, exit_code = code, "command failed");
                done.fail(Thrown::msg(format!("command `{cmd}` exited with code {code}")));
            }
            Err(e) => {
                done.fail(anyhow::Error::new(e).context(format!("waiting for process of test '{name}'")));
            }
        },

        state = done.terminated() => {
            info!(
                test = %name,
                ?state,
                "run settled while command still running; killing process"
            );
            if let Err(e) = child.kill().await {
                warn!(test = %name, error = %e, "failed to kill command process");
            }
        }
    }
}

/// Consume a pipe until EOF so the child never blocks or hits a closed
/// pipe; log lines at debug. Output need not be UTF-8.
fn drain_lines<R>(name: String, stream: &'static str, pipe: R)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(pipe);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf);
                    debug!(test = %name, stream, "{}", line.trim_end_matches(['\r', '\n']));
                }
                Err(e) => {
                    debug!(test = %name, stream, error = %e, "stopped reading output");
                    break;
                }
            }
        }
    });
}
