use crate::error::{Result, RunnerctlError};
use std::io::Read;
use std::process::{Command, Output, Stdio};
use std::time::Duration;
use wait_timeout::ChildExt;

/// Result of a bounded child-process wait.
#[derive(Debug)]
pub enum CommandOutcome {
    Completed(Output),
    TimedOut,
}

/// Run a command with a bounded wait. On expiry the child is killed and
/// reaped; a timeout is never interpreted as partial success.
///
/// Both output pipes are drained on background threads for the whole wait,
/// so a child that writes more than the pipe buffer never wedges on a full
/// pipe and gets misread as a timeout.
pub fn run_with_timeout(cmd: &mut Command, timeout: Duration) -> Result<CommandOutcome> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = cmd.spawn()?;
    let stdout_pipe = child.stdout.take();
    let stderr_pipe = child.stderr.take();
    let stdout_reader = std::thread::spawn(move || drain(stdout_pipe));
    let stderr_reader = std::thread::spawn(move || drain(stderr_pipe));

    match child.wait_timeout(timeout)? {
        Some(status) => {
            let stdout = stdout_reader.join().unwrap_or_default();
            let stderr = stderr_reader.join().unwrap_or_default();
            Ok(CommandOutcome::Completed(Output {
                status,
                stdout,
                stderr,
            }))
        }
        None => {
            child.kill().ok();
            child.wait()?;
            // Killing closes the write ends, so the readers finish.
            let _ = stdout_reader.join();
            let _ = stderr_reader.join();
            Ok(CommandOutcome::TimedOut)
        }
    }
}

fn drain(pipe: Option<impl Read>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        pipe.read_to_end(&mut buf).ok();
    }
    buf
}

/// Like [`run_with_timeout`], but a timeout or non-zero exit is an error.
/// Used for collaborator commands where only success matters.
pub fn run_checked(cmd: &mut Command, timeout: Duration, context: &str) -> Result<Output> {
    match run_with_timeout(cmd, timeout)? {
        CommandOutcome::Completed(output) if output.status.success() => Ok(output),
        CommandOutcome::Completed(output) => {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(RunnerctlError::CommandFailed(format!(
                "{} exited with {}: {}",
                context,
                output.status,
                stderr.trim()
            )))
        }
        CommandOutcome::TimedOut => Err(RunnerctlError::CommandFailed(format!(
            "{} timed out after {}s",
            context,
            timeout.as_secs()
        ))),
    }
}

/// Log captured child output at debug/warn level.
pub fn log_output(context: &str, output: &Output) {
    let stdout = String::from_utf8_lossy(&output.stdout);
    if !stdout.trim().is_empty() {
        tracing::debug!(command = context, "{}", stdout.trim());
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.trim().is_empty() {
        tracing::warn!(command = context, "{}", stderr.trim());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_completed_command() {
        let mut cmd = Command::new("echo");
        cmd.arg("hello");
        match run_with_timeout(&mut cmd, Duration::from_secs(5)).unwrap() {
            CommandOutcome::Completed(output) => {
                assert!(output.status.success());
                assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "hello");
            }
            CommandOutcome::TimedOut => panic!("echo should not time out"),
        }
    }

    #[test]
    fn test_timeout_kills_child() {
        let start = Instant::now();
        let mut cmd = Command::new("sleep");
        cmd.arg("30");
        let outcome = run_with_timeout(&mut cmd, Duration::from_millis(100)).unwrap();
        assert!(matches!(outcome, CommandOutcome::TimedOut));
        // The child is killed and reaped, so we return long before 30s.
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_output_larger_than_pipe_buffer_completes() {
        // 200 KB is well past the kernel pipe buffer; an undrained pipe
        // would block the child until the deadline.
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "yes x | head -c 200000; exit 0"]);
        match run_with_timeout(&mut cmd, Duration::from_secs(5)).unwrap() {
            CommandOutcome::Completed(output) => {
                assert!(output.status.success());
                assert_eq!(output.stdout.len(), 200_000);
            }
            CommandOutcome::TimedOut => panic!("chatty child should complete, not time out"),
        }
    }

    #[test]
    fn test_run_checked_nonzero_exit() {
        let mut cmd = Command::new("false");
        let err = run_checked(&mut cmd, Duration::from_secs(5), "false").unwrap_err();
        assert!(matches!(err, RunnerctlError::CommandFailed(_)));
    }

    #[test]
    fn test_run_checked_timeout_message() {
        let mut cmd = Command::new("sleep");
        cmd.arg("30");
        let err = run_checked(&mut cmd, Duration::from_millis(100), "sleep").unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }
}
