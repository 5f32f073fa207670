//! Bounded work queue consumed by a single worker
//!
//! Member updates, command invocations and reconcile requests are all
//! funneled through one `mpsc` channel, so the coordinator sees one job at a
//! time in arrival order.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::control::{ControlSurface, Invocation, Response};
use crate::coordinator::Coordinator;
use crate::model::MemberUpdate;
use crate::sync::{SyncOptions, SyncReport};
use crate::{Error, Result};

/// A unit of work for the worker
pub enum Job {
    MemberUpdate(MemberUpdate),
    Command {
        invocation: Invocation,
        reply: oneshot::Sender<Response>,
    },
    Reconcile {
        options: SyncOptions,
        reply: Option<oneshot::Sender<SyncReport>>,
    },
}

/// Counters returned when the worker stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub updates: usize,
    /// Updates dropped because automatic sync was off
    pub suppressed: usize,
    pub commands: usize,
    pub sweeps: usize,
}

/// Producer side of the queue
#[derive(Clone)]
pub struct WorkQueue {
    sender: mpsc::Sender<Job>,
}

impl WorkQueue {
    /// Enqueue a member update, waiting for capacity
    pub async fn submit_update(&self, update: MemberUpdate) -> Result<()> {
        self.send(Job::MemberUpdate(update)).await
    }

    /// Enqueue a command and wait for its response
    pub async fn command(&self, invocation: Invocation) -> Result<Response> {
        let (reply, rx) = oneshot::channel();
        self.send(Job::Command { invocation, reply }).await?;
        rx.await.map_err(|_| Error::QueueClosed)
    }

    /// Enqueue a sweep without waiting for it to run
    pub async fn schedule_reconcile(&self, options: SyncOptions) -> Result<()> {
        self.send(Job::Reconcile {
            options,
            reply: None,
        })
        .await
    }

    /// Enqueue a sweep and wait for its report
    pub async fn reconcile(&self, options: SyncOptions) -> Result<SyncReport> {
        let (reply, rx) = oneshot::channel();
        self.send(Job::Reconcile {
            options,
            reply: Some(reply),
        })
        .await?;
        rx.await.map_err(|_| Error::QueueClosed)
    }

    async fn send(&self, job: Job) -> Result<()> {
        self.sender.send(job).await.map_err(|_| Error::QueueClosed)
    }
}

/// Consumer side of the queue
pub struct Worker {
    coordinator: Arc<Coordinator>,
    receiver: mpsc::Receiver<Job>,
}

/// Create a queue of `capacity` jobs and the worker that drains it
pub fn work_queue(coordinator: Arc<Coordinator>, capacity: usize) -> (WorkQueue, Worker) {
    let (sender, receiver) = mpsc::channel(capacity.max(1));
    (
        WorkQueue { sender },
        Worker {
            coordinator,
            receiver,
        },
    )
}

impl Worker {
    pub fn spawn(self) -> JoinHandle<WorkerStats> {
        tokio::spawn(self.run())
    }

    /// Process jobs until every [`WorkQueue`] handle is dropped
    pub async fn run(mut self) -> WorkerStats {
        let mut stats = WorkerStats::default();
        tracing::debug!("worker started");

        while let Some(job) = self.receiver.recv().await {
            match job {
                Job::MemberUpdate(update) => {
                    stats.updates += 1;
                    if self.coordinator.handle_member_update(&update).await.is_none() {
                        stats.suppressed += 1;
                    }
                }
                Job::Command { invocation, reply } => {
                    stats.commands += 1;
                    let response = ControlSurface::new(&self.coordinator).handle(&invocation).await;
                    // Caller may have given up waiting
                    let _ = reply.send(response);
                }
                Job::Reconcile { options, reply } => {
                    stats.sweeps += 1;
                    let report = self.coordinator.reconcile(&options).await;
                    if let Some(reply) = reply {
                        let _ = reply.send(report);
                    }
                }
            }
        }

        tracing::debug!(?stats, "worker stopped");
        stats
    }
}
