//! Post-install smoke check.
//!
//! Runs `<destination>/kiln --version` and reports the version text. A
//! failing check does not remove the installed executable; the caller
//! decides what to do with a binary that cannot run on this host.

use camino::Utf8Path;
use log::{debug, warn};
use std::io::{self, Read};
use std::process::{Command, Output, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use wait_timeout::ChildExt;

/// Upper bound on how long the smoke check may run.
pub const SMOKE_CHECK_TIMEOUT: Duration = Duration::from_secs(30);

/// Argument passed to the installed executable.
pub const VERSION_FLAG: &str = "--version";

/// Abstraction for running external commands.
pub trait CommandExecutor {
    /// Runs a command with arguments and returns the captured output.
    ///
    /// # Errors
    ///
    /// Returns any I/O error encountered while spawning or waiting for the
    /// command. A command that outlives the executor's timeout is reported
    /// with [`io::ErrorKind::TimedOut`].
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use kiln_installer::smoke_check::{CommandExecutor, SystemCommandExecutor};
    ///
    /// let executor = SystemCommandExecutor::default();
    /// let output = executor.run("kiln", &["--version"])?;
    /// assert!(output.status.success());
    /// # Ok::<(), std::io::Error>(())
    /// ```
    fn run(&self, cmd: &str, args: &[&str]) -> io::Result<Output>;
}

/// Executes commands on the host system, killing them after a timeout.
#[derive(Debug, Clone, Copy)]
pub struct SystemCommandExecutor {
    timeout: Duration,
}

impl SystemCommandExecutor {
    /// Create an executor that gives each command `timeout` to finish.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for SystemCommandExecutor {
    fn default() -> Self {
        Self::with_timeout(SMOKE_CHECK_TIMEOUT)
    }
}

impl CommandExecutor for SystemCommandExecutor {
    fn run(&self, cmd: &str, args: &[&str]) -> io::Result<Output> {
        let mut child = Command::new(cmd)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        // Pipes are drained concurrently with the wait; a full pipe blocks the child.
        let stdout = drain_pipe(child.stdout.take());
        let stderr = drain_pipe(child.stderr.take());

        match child.wait_timeout(self.timeout)? {
            Some(status) => Ok(Output {
                status,
                stdout: join_pipe(stdout)?,
                stderr: join_pipe(stderr)?,
            }),
            None => {
                let _ = child.kill();
                let _ = child.wait();
                Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("{cmd} did not exit within {} seconds", self.timeout.as_secs()),
                ))
            }
        }
    }
}

fn drain_pipe<R>(pipe: Option<R>) -> JoinHandle<io::Result<Vec<u8>>>
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            pipe.read_to_end(&mut buf)?;
        }
        Ok(buf)
    })
}

fn join_pipe(handle: JoinHandle<io::Result<Vec<u8>>>) -> io::Result<Vec<u8>> {
    handle
        .join()
        .map_err(|_| io::Error::other("output reader thread panicked"))?
}

/// Failures of the post-install smoke check.
#[derive(Debug, thiserror::Error)]
pub enum PostInstallCheckError {
    /// The executable could not be started.
    #[error("could not run {path}: {source}")]
    Spawn {
        /// Path of the installed executable.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The executable did not exit in time.
    #[error("{path} --version did not finish: {reason}")]
    TimedOut {
        /// Path of the installed executable.
        path: String,
        /// Description reported by the executor.
        reason: String,
    },

    /// The executable exited unsuccessfully.
    #[error("{path} --version exited with {status}{}", detail_suffix(stderr))]
    NonZeroExit {
        /// Path of the installed executable.
        path: String,
        /// Exit status as reported by the operating system.
        status: String,
        /// Trimmed standard error output.
        stderr: String,
    },
}

fn detail_suffix(stderr: &str) -> String {
    if stderr.is_empty() {
        String::new()
    } else {
        format!(": {stderr}")
    }
}

/// Run the installed executable with `--version` and return its output.
///
/// The version text is the trimmed standard output, or standard error when
/// the executable writes nothing to standard output.
///
/// # Errors
///
/// Returns [`PostInstallCheckError`] if the executable cannot be spawned,
/// times out, or exits with a non-zero status.
///
/// # Examples
///
/// ```no_run
/// use camino::Utf8Path;
/// use kiln_installer::smoke_check::{SystemCommandExecutor, verify_install};
///
/// let version = verify_install(
///     Utf8Path::new("/home/user/.local/bin"),
///     "kiln",
///     &SystemCommandExecutor::default(),
/// )?;
/// println!("{version}");
/// # Ok::<(), kiln_installer::smoke_check::PostInstallCheckError>(())
/// ```
pub fn verify_install(
    destination_dir: &Utf8Path,
    binary_name: &str,
    executor: &dyn CommandExecutor,
) -> Result<String, PostInstallCheckError> {
    let path = destination_dir.join(binary_name);
    debug!("running {path} {VERSION_FLAG}");

    let result = check_output(path.as_str(), executor.run(path.as_str(), &[VERSION_FLAG]));
    if let Err(err) = &result {
        warn!("post-install check failed: {err}");
    }
    result
}

fn check_output(path: &str, result: io::Result<Output>) -> Result<String, PostInstallCheckError> {
    let output = result.map_err(|source| {
        if source.kind() == io::ErrorKind::TimedOut {
            PostInstallCheckError::TimedOut {
                path: path.to_owned(),
                reason: source.to_string(),
            }
        } else {
            PostInstallCheckError::Spawn {
                path: path.to_owned(),
                source,
            }
        }
    })?;

    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_owned();

    if !output.status.success() {
        return Err(PostInstallCheckError::NonZeroExit {
            path: path.to_owned(),
            status: output.status.to_string(),
            stderr,
        });
    }

    Ok(if stdout.is_empty() { stderr } else { stdout })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{ExpectedCall, StubExecutor, failure_output, success_output};

    const KILN_PATH: &str = "/opt/kiln/bin/kiln";

    fn dest() -> &'static Utf8Path {
        Utf8Path::new("/opt/kiln/bin")
    }

    fn executor_returning(result: io::Result<Output>) -> StubExecutor {
        StubExecutor::new(vec![ExpectedCall {
            cmd: KILN_PATH,
            args: vec![VERSION_FLAG],
            result,
        }])
    }

    #[test]
    fn returns_trimmed_version_text() {
        let executor = executor_returning(Ok(success_output("kiln version 0.63.0-rc.1\n")));

        let version = verify_install(dest(), "kiln", &executor).expect("check passes");
        assert_eq!(version, "kiln version 0.63.0-rc.1");
        executor.assert_finished();
    }

    #[test]
    fn falls_back_to_stderr_for_version_text() {
        let mut output = success_output("");
        output.stderr = b"0.63.0-rc.1\n".to_vec();
        let executor = executor_returning(Ok(output));

        let version = verify_install(dest(), "kiln", &executor).expect("check passes");
        assert_eq!(version, "0.63.0-rc.1");
    }

    #[test]
    fn non_zero_exit_fails_the_check() {
        let executor = executor_returning(Ok(failure_output("exec format error")));

        let err = verify_install(dest(), "kiln", &executor).expect_err("check fails");
        match err {
            PostInstallCheckError::NonZeroExit { path, stderr, .. } => {
                assert_eq!(path, KILN_PATH);
                assert_eq!(stderr, "exec format error");
            }
            other => panic!("expected NonZeroExit, got {other:?}"),
        }
    }

    #[test]
    fn spawn_failure_fails_the_check() {
        let executor = executor_returning(Err(io::Error::new(
            io::ErrorKind::NotFound,
            "no such file",
        )));

        let err = verify_install(dest(), "kiln", &executor).expect_err("check fails");
        assert!(matches!(err, PostInstallCheckError::Spawn { .. }), "got {err:?}");
        assert!(err.to_string().contains(KILN_PATH));
    }

    #[test]
    fn timeout_fails_the_check() {
        let executor = executor_returning(Err(io::Error::new(io::ErrorKind::TimedOut, "too slow")));

        let err = verify_install(dest(), "kiln", &executor).expect_err("check fails");
        assert!(matches!(err, PostInstallCheckError::TimedOut { .. }), "got {err:?}");
    }

    #[test]
    fn failed_check_is_logged_as_warning() {
        let mut logger = logtest::Logger::start();
        let executor = executor_returning(Ok(failure_output("bad cpu type")));

        let _ = verify_install(dest(), "kiln", &executor);

        let mut warned = false;
        while let Some(record) = logger.pop() {
            if record.level() == log::Level::Warn
                && record.args().to_string().contains("bad cpu type")
            {
                warned = true;
            }
        }
        assert!(warned, "expected a warning about the failed check");
    }

    #[cfg(unix)]
    #[test]
    fn system_executor_kills_commands_that_overrun() {
        let executor = SystemCommandExecutor::with_timeout(Duration::from_millis(100));
        let err = executor.run("sleep", &["5"]).expect_err("timed out");
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
    }

    #[cfg(unix)]
    #[test]
    fn system_executor_captures_output() {
        let executor = SystemCommandExecutor::default();
        let output = executor
            .run("sh", &["-c", "echo kiln; echo warn >&2"])
            .expect("runs");
        assert!(output.status.success());
        assert_eq!(output.stdout, b"kiln\n");
        assert_eq!(output.stderr, b"warn\n");
    }

    #[cfg(unix)]
    #[test]
    fn system_executor_reads_output_larger_than_a_pipe_buffer() {
        let executor = SystemCommandExecutor::with_timeout(Duration::from_secs(10));
        let output = executor
            .run("sh", &["-c", "dd if=/dev/zero bs=1024 count=256 2>/dev/null"])
            .expect("large output does not stall the child");
        assert!(output.status.success());
        assert_eq!(output.stdout.len(), 256 * 1024);
    }
}
