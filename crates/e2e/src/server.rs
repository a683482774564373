//! Site server management - spawning and health checking a local preview
//!
//! The site itself is an external collaborator. When asked to, the runner
//! launches whatever serves it locally (e.g. `bundle exec jekyll serve`) and
//! waits until the base URL answers.

use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::error::{E2eError, E2eResult};

/// Handle to a running server process
pub struct ServerHandle {
    child: Child,
    base_url: String,
}

impl ServerHandle {
    /// Spawn the serve command and wait for `base_url` to respond
    pub async fn spawn(config: ServerConfig, base_url: &str) -> E2eResult<Self> {
        let (program, args) = config
            .command
            .split_first()
            .ok_or_else(|| E2eError::ServerStartup("empty serve command".to_string()))?;

        info!("Spawning site server: {}", config.command.join(" "));

        let mut cmd = Command::new(program);
        cmd.args(args).stdout(Stdio::null()).stderr(Stdio::null());
        if let Some(dir) = &config.working_dir {
            cmd.current_dir(dir);
        }

        let child = cmd.spawn().map_err(|e| {
            E2eError::ServerStartup(format!("Failed to spawn {}: {}", program, e))
        })?;

        let handle = ServerHandle {
            child,
            base_url: base_url.to_string(),
        };

        handle.wait_for_healthy(config.startup_timeout).await?;

        info!("Site is up at {}", base_url);
        Ok(handle)
    }

    async fn wait_for_healthy(&self, timeout_duration: Duration) -> E2eResult<()> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(2))
            .build()?;

        let start = std::time::Instant::now();
        let mut attempts = 0;

        while start.elapsed() < timeout_duration {
            attempts += 1;

            match client.get(&self.base_url).send().await {
                Ok(resp) if resp.status().is_success() => {
                    return Ok(());
                }
                Ok(resp) => {
                    warn!("Health check returned {}", resp.status());
                }
                Err(e) => {
                    if attempts == 1 {
                        info!("Waiting for site to start...");
                    }
                    // Connection refused is expected while the site builds
                    if !e.is_connect() {
                        warn!("Health check error: {}", e);
                    }
                }
            }

            sleep(Duration::from_millis(250)).await;
        }

        Err(E2eError::ServerHealthCheck(attempts))
    }

    /// Stop the server
    pub fn stop(&mut self) -> E2eResult<()> {
        if let Ok(Some(_)) = self.child.try_wait() {
            return Ok(());
        }

        debug!("Stopping site server (pid: {})", self.child.id());

        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            let pid = Pid::from_raw(self.child.id() as i32);
            if kill(pid, Signal::SIGTERM).is_ok() {
                std::thread::sleep(Duration::from_millis(500));
            }
        }

        let _ = self.child.kill();
        let _ = self.child.wait();

        Ok(())
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

/// Whether `base_url` answers with a success status
pub async fn is_reachable(base_url: &str) -> bool {
    let client = match reqwest::Client::builder()
        .timeout(Duration::from_secs(2))
        .build()
    {
        Ok(client) => client,
        Err(_) => return false,
    };
    matches!(client.get(base_url).send().await, Ok(resp) if resp.status().is_success())
}

/// How to launch the site locally
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Program and arguments
    pub command: Vec<String>,

    /// Directory to run the command in (site root)
    pub working_dir: Option<PathBuf>,

    /// Timeout for the first successful response
    pub startup_timeout: Duration,
}

impl ServerConfig {
    /// Split a shell-like command line on whitespace
    pub fn from_command_line(line: &str) -> Self {
        Self {
            command: line.split_whitespace().map(String::from).collect(),
            ..Default::default()
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            command: vec![
                "bundle".to_string(),
                "exec".to_string(),
                "jekyll".to_string(),
                "serve".to_string(),
            ],
            working_dir: None,
            startup_timeout: Duration::from_secs(60),
        }
    }
}
