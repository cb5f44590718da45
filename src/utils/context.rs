use crate::models::error::SError;
use crate::models::task_status::TaskStatus;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::spawn_blocking;
use tokio::task_local;

pub type StatusSender = UnboundedSender<TaskStatus>;

task_local! {
     static CHANNEL: StatusSender;
}

/// Binds a status channel to a unit of blocking work so code deep inside it
/// can stream progress without threading the sender through every call.
pub struct TaskContext;

impl TaskContext {
    /// Runs `f` on the blocking pool with `channel` bound.
    pub async fn provide<F, R>(channel: StatusSender, f: F) -> Result<R, SError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        spawn_blocking(move || CHANNEL.sync_scope(channel, f))
            .await
            .map_err(|e| SError::AsyncRuntimeError(e.to_string()))
    }

    /// Runs `f` on the current thread with `channel` bound.
    pub fn scope<F, R>(channel: StatusSender, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        CHANNEL.sync_scope(channel, f)
    }

    /// Fails once the receiving side has gone away; callers treat that as
    /// the watcher cancelling the task.
    pub fn emit(status: TaskStatus) -> Result<(), SError> {
        CHANNEL
            .try_with(|c| {
                c.send(status)
                    .map_err(|e| SError::UpdateStatusError(e.to_string()))
            })
            .unwrap_or_else(|_| Err(SError::ContextUnprovided))
    }

    pub fn log(line: impl Into<String>) -> Result<(), SError> {
        let line = line.into();
        tracing::info!("{line}");
        Self::emit(TaskStatus::Log(line))
    }
}
