//! The controller state machine and worker monitor thread.

use crate::events::SupervisorEvent;
use anyhow::{Context, Result};
use jamdeck_core::{parse_sentinel, ServerState};
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::process::{Child, ChildStdout, Command, Stdio};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

/// How long `start` waits for the sentinel (or an early exit) before
/// reporting success anyway and leaving promotion to the monitor.
const STARTUP_GRACE: Duration = Duration::from_secs(2);

/// How to launch the worker process.
#[derive(Clone, Debug)]
pub struct WorkerCommand {
    pub program: PathBuf,
    pub base_args: Vec<String>,
}

impl WorkerCommand {
    pub fn new(program: impl Into<PathBuf>, base_args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            base_args,
        }
    }

    /// The `jamdeck-server` binary installed next to the current
    /// executable.
    pub fn sibling_server() -> Result<Self> {
        let exe = std::env::current_exe().context("failed to locate current executable")?;
        let dir = exe
            .parent()
            .context("current executable has no parent directory")?;
        let program = dir.join(format!("jamdeck-server{}", std::env::consts::EXE_SUFFIX));
        Ok(Self::new(program, Vec::new()))
    }

    fn build(&self, preferred_port: Option<u16>) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.base_args);
        if let Some(port) = preferred_port {
            command.arg("--port").arg(port.to_string());
        }
        command.stdout(Stdio::piped()).stderr(Stdio::inherit());
        command
    }
}

#[derive(Debug)]
struct Shared {
    state: ServerState,
    bound_port: Option<u16>,
}

struct Inner {
    shared: Mutex<Shared>,
    cond: Condvar,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Spawns and watches one worker process at a time.
///
/// The monitor thread is the only writer of the shared state; `stop`
/// flips the state to `Stopped` before killing the process so the monitor
/// never reads an intentional shutdown as a crash.
pub struct Supervisor {
    command: WorkerCommand,
    inner: Arc<Inner>,
    child: Arc<Mutex<Option<Child>>>,
    monitor: Option<JoinHandle<()>>,
    events: Sender<SupervisorEvent>,
}

impl Supervisor {
    /// Create a supervisor and the event channel its consumers drain.
    pub fn new(command: WorkerCommand) -> (Self, Receiver<SupervisorEvent>) {
        let (events, receiver) = channel();
        let supervisor = Self {
            command,
            inner: Arc::new(Inner {
                shared: Mutex::new(Shared {
                    state: ServerState::Stopped,
                    bound_port: None,
                }),
                cond: Condvar::new(),
            }),
            child: Arc::new(Mutex::new(None)),
            monitor: None,
            events,
        };
        (supervisor, receiver)
    }

    pub fn state(&self) -> ServerState {
        self.inner.lock().state
    }

    /// The port the worker reported via its sentinel, if it has announced
    /// one yet.
    pub fn bound_port(&self) -> Option<u16> {
        self.inner.lock().bound_port
    }

    /// Spawn the worker and wait a bounded grace period for it to either
    /// announce its port or fail early.
    pub fn start(&mut self, preferred_port: Option<u16>) -> Result<()> {
        {
            let shared = self.inner.lock();
            if matches!(shared.state, ServerState::Starting | ServerState::Running) {
                anyhow::bail!("worker is already {}", shared.state);
            }
        }
        // The previous monitor (if any) has hit EOF by now; reclaim it.
        if let Some(handle) = self.monitor.take() {
            let _ = handle.join();
        }

        info!(
            "starting worker {} (preferred port {:?})",
            self.command.program.display(),
            preferred_port
        );
        let mut child = self.command.build(preferred_port).spawn().with_context(|| {
            format!("failed to spawn worker {}", self.command.program.display())
        })?;
        let stdout = child
            .stdout
            .take()
            .context("worker stdout was not captured")?;

        {
            let mut shared = self.inner.lock();
            shared.state = ServerState::Starting;
            shared.bound_port = None;
        }
        self.send(SupervisorEvent::StateChanged(ServerState::Starting));
        *self.lock_child() = Some(child);

        let inner = Arc::clone(&self.inner);
        let child_slot = Arc::clone(&self.child);
        let events = self.events.clone();
        let handle = thread::Builder::new()
            .name("worker-monitor".to_string())
            .spawn(move || monitor_worker(stdout, inner, child_slot, events));
        match handle {
            Ok(handle) => self.monitor = Some(handle),
            Err(e) => {
                self.kill_child();
                self.inner.lock().state = ServerState::Stopped;
                self.send(SupervisorEvent::StateChanged(ServerState::Stopped));
                return Err(e).context("failed to spawn monitor thread");
            }
        }

        // Give an early bind failure a chance to surface before reporting
        // success.
        let guard = self.inner.lock();
        let (shared, _) = self
            .inner
            .cond
            .wait_timeout_while(guard, STARTUP_GRACE, |shared| {
                shared.state == ServerState::Starting && shared.bound_port.is_none()
            })
            .unwrap_or_else(PoisonError::into_inner);
        match shared.state {
            ServerState::Stopped | ServerState::CrashedUnexpectedly => {
                anyhow::bail!("worker exited during startup")
            }
            _ => Ok(()),
        }
    }

    /// Stop the worker intentionally. Safe to call when already stopped.
    pub fn stop(&mut self) {
        {
            let mut shared = self.inner.lock();
            let had_worker = !matches!(shared.state, ServerState::Stopped);
            shared.state = ServerState::Stopped;
            shared.bound_port = None;
            drop(shared);
            self.inner.cond.notify_all();
            if had_worker {
                self.send(SupervisorEvent::StateChanged(ServerState::Stopped));
            }
        }
        self.kill_child();
        if let Some(handle) = self.monitor.take() {
            let _ = handle.join();
        }
    }

    /// Move the worker to a new preferred port. There is no live
    /// reconfiguration; this is always a full stop-then-start.
    pub fn change_port(&mut self, port: u16) -> Result<()> {
        info!("restarting worker on preferred port {}", port);
        self.stop();
        self.start(Some(port))
    }

    fn kill_child(&self) {
        if let Some(mut child) = self.lock_child().take() {
            if let Err(e) = child.kill() {
                debug!("worker already gone: {}", e);
            }
            let _ = child.wait();
        }
    }

    fn lock_child(&self) -> MutexGuard<'_, Option<Child>> {
        self.child.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn send(&self, event: SupervisorEvent) {
        // A dropped receiver just means nobody is listening anymore.
        let _ = self.events.send(event);
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Blocking line reader over the worker's stdout. Sole writer of the
/// supervisor state once `start` has returned.
fn monitor_worker(
    stdout: ChildStdout,
    inner: Arc<Inner>,
    child_slot: Arc<Mutex<Option<Child>>>,
    events: Sender<SupervisorEvent>,
) {
    let reader = BufReader::new(stdout);
    for line in reader.lines() {
        let Ok(line) = line else { break };
        if let Some(port) = parse_sentinel(&line) {
            info!("worker announced port {}", port);
            let became_running = {
                let mut shared = inner.lock();
                shared.bound_port = Some(port);
                let starting = shared.state == ServerState::Starting;
                if starting {
                    shared.state = ServerState::Running;
                }
                starting
            };
            inner.cond.notify_all();
            let _ = events.send(SupervisorEvent::PortDiscovered(port));
            if became_running {
                let _ = events.send(SupervisorEvent::StateChanged(ServerState::Running));
            }
        } else {
            let line = line.trim_end();
            if !line.is_empty() {
                debug!("worker: {}", line);
                let _ = events.send(SupervisorEvent::WorkerLog(line.to_string()));
            }
        }
    }

    // EOF: the worker exited, or stop() killed it. Reap if stop() hasn't.
    if let Some(mut child) = child_slot
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .take()
    {
        match child.wait() {
            Ok(status) => debug!("worker exited with {}", status),
            Err(e) => warn!("failed to reap worker: {}", e),
        }
    }

    let transition = {
        let mut shared = inner.lock();
        let next = match shared.state {
            // stop() already flipped the state; this exit is intentional.
            ServerState::Stopped | ServerState::CrashedUnexpectedly => None,
            // Died before announcing a port.
            ServerState::Starting => Some(ServerState::Stopped),
            ServerState::Running => Some(ServerState::CrashedUnexpectedly),
        };
        if let Some(next) = next {
            shared.state = next;
            shared.bound_port = None;
        }
        next
    };
    inner.cond.notify_all();
    if let Some(next) = transition {
        if next == ServerState::CrashedUnexpectedly {
            warn!("worker exited unexpectedly");
        }
        let _ = events.send(SupervisorEvent::StateChanged(next));
    }
}
