use jamdeck_core::ServerState;

/// Notifications emitted by the supervisor's monitor thread.
///
/// Delivered over an `mpsc` channel: the monitor thread is the only writer
/// of supervisor state, and consumers (a tray menu, a console frontend)
/// drain the channel from their own event loop instead of being called
/// back on the monitor thread.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SupervisorEvent {
    /// The worker lifecycle state changed. `CrashedUnexpectedly` is the
    /// user-facing crash notification and is emitted at most once per
    /// worker lifetime.
    StateChanged(ServerState),
    /// The worker announced its bound port. This is the only source of
    /// the real port; the preferred port may not have been honored.
    PortDiscovered(u16),
    /// An advisory log line from the worker's stdout.
    WorkerLog(String),
}
