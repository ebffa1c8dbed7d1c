use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::app::Result;

/// Something that can keep an authenticated session warm.
#[async_trait]
pub trait SessionRefresh: Send + Sync {
    async fn refresh(&self) -> Result<()>;
}

/// Message type for the keep-alive task
#[derive(Debug)]
enum KeepAliveMessage {
    /// Stop the task
    Shutdown,
}

/// Handle to the scheduled session refresh task.
///
/// The task is owned by this handle: `shutdown` stops it and waits for it to
/// exit, and dropping the handle closes the channel, which stops it too.
pub struct KeepAlive {
    tx: mpsc::Sender<KeepAliveMessage>,
    task: JoinHandle<usize>,
}

impl KeepAlive {
    /// Spawn the task. The first refresh happens one `interval` from now.
    pub fn spawn(session: Arc<dyn SessionRefresh>, interval: Duration) -> Self {
        let (tx, rx) = mpsc::channel(8);
        let task = tokio::spawn(run(session, interval, rx));
        info!(interval_secs = interval.as_secs(), "Session keep-alive started");
        Self { tx, task }
    }

    /// Stop the task; returns how many refreshes it performed.
    pub async fn shutdown(self) -> usize {
        let _ = self.tx.send(KeepAliveMessage::Shutdown).await;
        match self.task.await {
            Ok(count) => count,
            Err(e) => {
                warn!("Keep-alive task join error: {}", e);
                0
            }
        }
    }
}

async fn run(
    session: Arc<dyn SessionRefresh>,
    interval: Duration,
    mut rx: mpsc::Receiver<KeepAliveMessage>,
) -> usize {
    let mut timer = tokio::time::interval(interval);
    timer.tick().await; // Skip the first immediate tick
    let mut refreshes = 0;

    loop {
        tokio::select! {
            msg = rx.recv() => match msg {
                Some(KeepAliveMessage::Shutdown) | None => break,
            },
            _ = timer.tick() => {}
        }

        match session.refresh().await {
            Ok(()) => {
                refreshes += 1;
                debug!(refreshes, "Session refreshed");
            }
            Err(e) => warn!("Session refresh failed: {}", e),
        }
    }

    info!(refreshes, "Session keep-alive stopped");
    refreshes
}
