//! The chromedriver child process backing a session.

use std::net::TcpListener;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::process::{Child, Command};
use tokio::time::{sleep, Instant};

use super::error::DriverError;

const READY_POLL: Duration = Duration::from_millis(100);

/// A chromedriver listening on a private loopback port.
///
/// On unix the child leads its own process group, so the Chrome it spawns dies with
/// it. The group is killed by [`shutdown`](Self::shutdown), [`kill_now`](Self::kill_now),
/// or on drop if neither ran.
#[derive(Debug)]
pub struct DriverProcess {
    child: Child,
    port: u16,
}

impl DriverProcess {
    /// Spawn `binary` on a free port and wait until it accepts connections.
    pub async fn spawn(binary: &Path, startup_timeout: Duration) -> Result<Self, DriverError> {
        let port = free_port()?;
        let mut command = Command::new(binary);
        command.arg(format!("--port={port}"));
        let child = spawn_grouped(command)
            .map_err(|e| DriverError::Launch(format!("{}: {e}", binary.display())))?;

        let mut process = Self { child, port };
        if let Err(err) = process.wait_ready(startup_timeout).await {
            let _ = process.shutdown().await;
            return Err(err);
        }
        tracing::debug!(port, pid = ?process.child.id(), "driver.process.ready");
        Ok(process)
    }

    pub fn endpoint(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    async fn wait_ready(&mut self, startup_timeout: Duration) -> Result<(), DriverError> {
        let deadline = Instant::now() + startup_timeout;
        loop {
            if let Ok(Some(status)) = self.child.try_wait() {
                return Err(DriverError::Launch(format!(
                    "chromedriver exited during startup ({status})"
                )));
            }
            if TcpStream::connect(("127.0.0.1", self.port)).await.is_ok() {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(DriverError::Launch(format!(
                    "chromedriver not ready on port {} after {startup_timeout:?}",
                    self.port
                )));
            }
            sleep(READY_POLL).await;
        }
    }

    /// Kill the process group and reap chromedriver, unless it already exited.
    pub async fn shutdown(&mut self) -> Result<(), DriverError> {
        if let Ok(Some(_)) = self.child.try_wait() {
            return Ok(());
        }
        self.kill_group();
        self.child
            .kill()
            .await
            .map_err(|e| DriverError::Command(format!("failed to stop chromedriver: {e}")))
    }

    /// Signal the process group without waiting for it to exit.
    pub fn kill_now(&mut self) {
        if let Ok(Some(_)) = self.child.try_wait() {
            return;
        }
        self.kill_group();
        if let Err(err) = self.child.start_kill() {
            tracing::warn!(pid = ?self.child.id(), error = %err, "driver.process.kill_failed");
        }
    }

    #[cfg(unix)]
    fn kill_group(&self) {
        let Some(pid) = self.child.id() else {
            return;
        };
        // SAFETY: killpg only sends a signal; the group was created at spawn.
        if unsafe { libc::killpg(pid as libc::pid_t, libc::SIGKILL) } != 0 {
            tracing::debug!(
                pid,
                error = %std::io::Error::last_os_error(),
                "driver.process.killpg_failed"
            );
        }
    }

    #[cfg(not(unix))]
    fn kill_group(&self) {}
}

impl Drop for DriverProcess {
    fn drop(&mut self) {
        if !matches!(self.child.try_wait(), Ok(Some(_))) {
            self.kill_group();
        }
    }
}

/// Spawn `command` detached from stdio, leading a fresh process group on unix.
fn spawn_grouped(mut command: Command) -> std::io::Result<Child> {
    command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true);
    #[cfg(unix)]
    command.process_group(0);
    command.spawn()
}

fn free_port() -> Result<u16, DriverError> {
    let listener = TcpListener::bind(("127.0.0.1", 0))
        .map_err(|e| DriverError::Launch(format!("no free port: {e}")))?;
    listener
        .local_addr()
        .map(|addr| addr.port())
        .map_err(|e| DriverError::Launch(format!("no free port: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_port_is_non_zero() {
        assert_ne!(free_port().unwrap(), 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn shutdown_kills_the_whole_group() {
        let mut command = Command::new("sh");
        command.args(["-c", "sleep 30 & sleep 30"]);
        let child = spawn_grouped(command).unwrap();
        let pgid = child.id().unwrap() as libc::pid_t;
        let mut process = DriverProcess { child, port: 0 };

        // Let the shell fork its background sleep.
        sleep(Duration::from_millis(200)).await;
        assert_eq!(unsafe { libc::getpgid(pgid) }, pgid);

        process.shutdown().await.unwrap();
        assert!(matches!(process.child.try_wait(), Ok(Some(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn kill_now_does_not_wait() {
        let mut command = Command::new("sh");
        command.args(["-c", "sleep 30"]);
        let child = spawn_grouped(command).unwrap();
        let mut process = DriverProcess { child, port: 0 };

        process.kill_now();
        let status = tokio::time::timeout(Duration::from_secs(5), process.child.wait())
            .await
            .unwrap()
            .unwrap();
        assert!(!status.success());
    }

    #[tokio::test]
    async fn missing_binary_is_a_launch_error() {
        let err = DriverProcess::spawn(
            Path::new("/nonexistent/unfold/chromedriver"),
            Duration::from_millis(200),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, DriverError::Launch(_)));
    }
}
