//! Long-running service over stdin/stdout
//!
//! Requests arrive one JSON object per line. Member updates published by the
//! directory are drained into the work queue after every request, so an
//! external role change is queued before the next line is read.

use std::path::Path;
use std::sync::Arc;

use rolesync_core::{
    Coordinator, GroupId, Invocation, MemberUpdate, MemoryDirectory, RoleId, Settings,
    SyncOptions, SyncRegistry, UserId, WorkQueue, WorkerStats, work_queue,
};
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::broadcast::{self, error::TryRecvError};

use crate::error::{CliError, Result};

/// One line of input
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Operator command
    Command(Invocation),
    /// Role change made outside the service
    SetRoles {
        group: GroupId,
        user: UserId,
        roles: Vec<RoleId>,
    },
}

/// Run the service on the process's stdin and stdout
pub fn run_service(settings: &Settings, snapshot: &Path) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new()?;
    let stats = runtime.block_on(serve(
        settings,
        snapshot,
        tokio::io::stdin(),
        tokio::io::stdout(),
    ))?;
    tracing::info!(?stats, "service stopped");
    Ok(())
}

/// Serve requests from `input` until it is exhausted.
///
/// The snapshot is saved once every queued job has finished.
pub async fn serve<R, W>(
    settings: &Settings,
    snapshot: &Path,
    input: R,
    mut output: W,
) -> Result<WorkerStats>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let directory = Arc::new(MemoryDirectory::load(snapshot)?);
    let registry = SyncRegistry::load(&settings.registry.path);
    let coordinator = Arc::new(Coordinator::new(directory.clone(), registry, settings));
    let mut updates = directory.subscribe();

    let (queue, worker) = work_queue(coordinator, settings.sync.queue_capacity);
    let worker = worker.spawn();

    tracing::info!(
        primary = %settings.groups.primary,
        secondary = %settings.groups.secondary,
        "service started"
    );

    if settings.sync.reconcile_on_startup {
        let report = queue.reconcile(SyncOptions::default()).await?;
        tracing::info!(summary = %report.summary(), "startup sweep finished");
    }

    let mut lines = BufReader::new(input).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match serde_json::from_str::<Request>(line) {
            Ok(Request::Command(invocation)) => {
                let response = queue.command(invocation).await?;
                let mut encoded = serde_json::to_vec(&response)?;
                encoded.push(b'\n');
                output.write_all(&encoded).await?;
                output.flush().await?;
            }
            Ok(Request::SetRoles { group, user, roles }) => {
                if let Err(e) = directory.set_member_roles(group, user, roles.into_iter().collect()) {
                    tracing::warn!(%group, %user, error = %e, "external role change rejected");
                }
            }
            Err(e) => tracing::warn!(error = %e, "ignoring malformed request"),
        }

        forward_pending(&mut updates, &queue).await?;
    }

    forward_pending(&mut updates, &queue).await?;
    drop(queue);
    let stats = worker
        .await
        .map_err(|e| CliError::user(format!("worker failed: {e}")))?;

    directory.save(snapshot)?;
    Ok(stats)
}

/// Move every update published so far into the queue
async fn forward_pending(
    updates: &mut broadcast::Receiver<MemberUpdate>,
    queue: &WorkQueue,
) -> Result<()> {
    loop {
        match updates.try_recv() {
            Ok(update) => queue.submit_update(update).await?,
            Err(TryRecvError::Lagged(missed)) => {
                tracing::warn!(missed, "member updates dropped; run a manual sync");
            }
            Err(TryRecvError::Empty | TryRecvError::Closed) => return Ok(()),
        }
    }
}
