//! Helpers for running child processes with bounded, captured output.

use std::io::Read;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, error, instrument, warn};
use wait_timeout::ChildExt;

/// Captured child process output.
#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub stdout_truncated: usize,
    pub stderr_truncated: usize,
    pub timed_out: bool,
}

impl CommandOutput {
    pub fn stderr_lossy(&self) -> String {
        let mut text = String::from_utf8_lossy(&self.stderr).into_owned();
        if self.stderr_truncated > 0 {
            text.push_str(&format!(
                "\n[stderr truncated {} bytes]",
                self.stderr_truncated
            ));
        }
        text
    }
}

/// Error returned when the child could not be started at all.
#[derive(Debug)]
pub struct SpawnError(pub std::io::Error);

impl std::fmt::Display for SpawnError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "spawn command: {}", self.0)
    }
}

impl std::error::Error for SpawnError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

/// How long pipe readers may keep draining after a timed-out step is killed.
///
/// A descendant that escaped the process group can hold the pipes open
/// indefinitely; past this point its output is abandoned.
const DRAIN_AFTER_KILL: Duration = Duration::from_secs(2);

type StreamResult = Result<(Vec<u8>, usize)>;

/// Run a command to completion and capture stdout/stderr without risking pipe deadlocks.
///
/// Output is read concurrently while the child runs. `output_limit_bytes` bounds the amount of
/// stdout/stderr stored in memory (bytes beyond this are discarded while still draining the pipe).
/// With `timeout == None` the call blocks until the child exits on its own. With a timeout the
/// child leads its own process group, and the whole group is killed when the timeout expires.
#[instrument(skip_all, fields(timeout_secs = timeout.map(|t| t.as_secs()), output_limit_bytes))]
pub fn run_command(
    mut cmd: Command,
    timeout: Option<Duration>,
    output_limit_bytes: usize,
) -> Result<CommandOutput> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        if timeout.is_some() {
            cmd.process_group(0);
        }
    }

    debug!("spawning child process");
    let mut child = match cmd.spawn() {
        Ok(c) => c,
        Err(e) => {
            error!(err = %e, "failed to spawn command");
            return Err(SpawnError(e).into());
        }
    };

    let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
        reap(&mut child);
        return Err(anyhow!("stdout/stderr were not piped"));
    };

    let stdout_rx = spawn_reader(stdout, output_limit_bytes);
    let stderr_rx = spawn_reader(stderr, output_limit_bytes);

    let (status, timed_out) = match wait_child(&mut child, timeout) {
        Ok(waited) => waited,
        Err(err) => {
            reap(&mut child);
            return Err(err);
        }
    };

    let grace = timed_out.then_some(DRAIN_AFTER_KILL);
    let (stdout, stdout_truncated) = collect_output(&stdout_rx, grace).context("join stdout")?;
    let (stderr, stderr_truncated) = collect_output(&stderr_rx, grace).context("join stderr")?;

    if stdout_truncated > 0 || stderr_truncated > 0 {
        warn!(stdout_truncated, stderr_truncated, "output truncated");
    }

    debug!(exit_code = ?status.code(), timed_out, "command finished");
    Ok(CommandOutput {
        status,
        stdout,
        stderr,
        stdout_truncated,
        stderr_truncated,
        timed_out,
    })
}

/// Wait for exit, killing the process group once `timeout` expires.
fn wait_child(child: &mut Child, timeout: Option<Duration>) -> Result<(ExitStatus, bool)> {
    let Some(timeout) = timeout else {
        return Ok((child.wait().context("wait for command")?, false));
    };
    if let Some(status) = child.wait_timeout(timeout).context("wait for command")? {
        return Ok((status, false));
    }
    warn!(
        timeout_secs = timeout.as_secs(),
        "command timed out, killing process group"
    );
    kill_process_group(child);
    child.kill().context("kill command")?;
    let status = child.wait().context("wait command after kill")?;
    Ok((status, true))
}

/// Kill and reap a child after a wait failure so it is not left running.
fn reap(child: &mut Child) {
    if let Err(err) = child.kill() {
        warn!(err = %err, "failed to kill command");
    }
    if let Err(err) = child.wait() {
        warn!(err = %err, "failed to reap command");
    }
}

#[cfg(unix)]
#[allow(unsafe_code)]
fn kill_process_group(child: &Child) {
    let Ok(pgid) = libc::pid_t::try_from(child.id()) else {
        return;
    };
    // SAFETY: killpg only sends a signal; the group was created by process_group(0)
    // at spawn and the leader has not been reaped yet, so the id cannot be reused.
    if unsafe { libc::killpg(pgid, libc::SIGKILL) } != 0 {
        warn!(err = %std::io::Error::last_os_error(), "failed to kill process group");
    }
}

#[cfg(not(unix))]
fn kill_process_group(_child: &Child) {}

fn spawn_reader<R: Read + Send + 'static>(reader: R, limit: usize) -> Receiver<StreamResult> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        // The receiver is gone only when the output was abandoned.
        let _ = tx.send(read_stream_limited(reader, limit));
    });
    rx
}

/// Receive a reader's result. `grace` bounds the wait (used after a kill).
fn collect_output(rx: &Receiver<StreamResult>, grace: Option<Duration>) -> StreamResult {
    let Some(grace) = grace else {
        return rx
            .recv()
            .map_err(|_| anyhow!("output reader thread panicked"))?;
    };
    match rx.recv_timeout(grace) {
        Ok(result) => result,
        Err(RecvTimeoutError::Timeout) => {
            warn!(
                grace_secs = grace.as_secs(),
                "output pipe still open after kill, abandoning"
            );
            Ok((Vec::new(), 0))
        }
        Err(RecvTimeoutError::Disconnected) => Err(anyhow!("output reader thread panicked")),
    }
}

fn read_stream_limited<R: Read>(mut reader: R, limit: usize) -> Result<(Vec<u8>, usize)> {
    let mut buf = Vec::new();
    let mut truncated = 0usize;
    let mut chunk = [0u8; 8192];

    loop {
        let n = reader.read(&mut chunk).context("read output")?;
        if n == 0 {
            break;
        }
        let remaining = limit.saturating_sub(buf.len());
        if remaining > 0 {
            let keep = n.min(remaining);
            buf.extend_from_slice(&chunk[..keep]);
            truncated += n.saturating_sub(keep);
        } else {
            truncated += n;
        }
    }

    Ok((buf, truncated))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_stream_limited_truncates_beyond_limit() {
        let input = vec![b'x'; 100];
        let (buf, truncated) = read_stream_limited(&input[..], 40).expect("read");
        assert_eq!(buf.len(), 40);
        assert_eq!(truncated, 60);
    }

    #[test]
    fn read_stream_limited_keeps_short_input() {
        let (buf, truncated) = read_stream_limited(&b"hello"[..], 40).expect("read");
        assert_eq!(buf, b"hello");
        assert_eq!(truncated, 0);
    }

    #[test]
    fn missing_program_is_spawn_error() {
        let cmd = Command::new("definitely-not-a-real-program-4b1d");
        let err = run_command(cmd, None, 1000).unwrap_err();
        assert!(err.downcast_ref::<SpawnError>().is_some());
    }

    #[cfg(unix)]
    #[test]
    fn captures_stderr_and_exit_code() {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg("echo out; echo err >&2; exit 3");
        let output = run_command(cmd, None, 1000).expect("run");
        assert_eq!(output.status.code(), Some(3));
        assert_eq!(output.stdout, b"out\n");
        assert_eq!(output.stderr_lossy(), "err\n");
        assert!(!output.timed_out);
    }

    #[cfg(unix)]
    #[test]
    fn timeout_kills_grandchildren_holding_pipes() {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg("sleep 30; true");
        let started = std::time::Instant::now();
        let output = run_command(cmd, Some(Duration::from_millis(300)), 1000).expect("run");
        assert!(output.timed_out);
        assert!(
            started.elapsed() < Duration::from_secs(5),
            "took {:?}",
            started.elapsed()
        );
    }

    #[cfg(unix)]
    #[test]
    fn reap_kills_and_collects_running_child() {
        let mut child = Command::new("sh")
            .arg("-c")
            .arg("exec sleep 30")
            .spawn()
            .expect("spawn");
        reap(&mut child);
        let status = child.try_wait().expect("try_wait").expect("child reaped");
        assert!(!status.success());
    }

    #[test]
    fn collect_output_gives_up_after_grace() {
        let (_tx, rx) = mpsc::channel::<StreamResult>();
        let (buf, truncated) =
            collect_output(&rx, Some(Duration::from_millis(50))).expect("collect");
        assert!(buf.is_empty());
        assert_eq!(truncated, 0);
    }

    #[cfg(unix)]
    #[test]
    fn timeout_kills_hung_command() {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg("exec sleep 30");
        let output = run_command(cmd, Some(Duration::from_millis(200)), 1000).expect("run");
        assert!(output.timed_out);
        assert!(!output.status.success());
    }
}
