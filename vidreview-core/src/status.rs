use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, warn};

use crate::api::StatusSource;
use crate::review::{ProcessingState, ReviewState, VideoStatus};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusSnapshot {
    pub fetched_at: DateTime<Utc>,
    pub videos: Vec<VideoStatus>,
}

pub struct StatusPoller {
    source: Arc<dyn StatusSource>,
    interval: Duration,
}

impl fmt::Debug for StatusPoller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatusPoller")
            .field("interval", &self.interval)
            .finish()
    }
}

impl StatusPoller {
    pub fn new(source: Arc<dyn StatusSource>, interval: Duration) -> Self {
        Self { source, interval }
    }

    /// `None` when there was nothing to ask for or the request failed.
    pub async fn poll_once(&self, ids: &[i64]) -> Option<StatusSnapshot> {
        if ids.is_empty() {
            return None;
        }
        match self.source.fetch_statuses(ids).await {
            Ok(videos) => Some(StatusSnapshot {
                fetched_at: Utc::now(),
                videos,
            }),
            Err(err) => {
                warn!(error = %err, ids = ids.len(), "status poll failed");
                None
            }
        }
    }

    /// Polls right away and then on every interval until the handle is
    /// stopped or dropped, or the receiver goes away.
    pub fn spawn(self, ids: Vec<i64>) -> (PollerHandle, mpsc::Receiver<StatusSnapshot>) {
        let (ids_tx, ids_rx) = watch::channel(ids);
        let (snapshots_tx, snapshots_rx) = mpsc::channel(8);
        let task = tokio::spawn(async move {
            let mut ticker = interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let ids = ids_rx.borrow().clone();
                let Some(snapshot) = self.poll_once(&ids).await else {
                    continue;
                };
                if snapshots_tx.send(snapshot).await.is_err() {
                    debug!("status receiver dropped, stopping poller");
                    break;
                }
            }
        });
        let handle = PollerHandle {
            ids: ids_tx,
            task: Some(task),
        };
        (handle, snapshots_rx)
    }
}

/// Owns the polling task. Dropping the handle stops polling.
#[derive(Debug)]
pub struct PollerHandle {
    ids: watch::Sender<Vec<i64>>,
    task: Option<JoinHandle<()>>,
}

impl PollerHandle {
    /// Replaces the set of ids asked for on the next tick.
    pub fn set_ids(&self, ids: Vec<i64>) {
        self.ids.send_replace(ids);
    }

    pub fn ids(&self) -> Vec<i64> {
        self.ids.borrow().clone()
    }

    pub async fn stop(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            let _ = task.await;
        }
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusChange {
    pub id: i64,
    pub review: ReviewState,
    pub processing: ProcessingState,
    pub previous_review: Option<ReviewState>,
    pub previous_processing: Option<ProcessingState>,
}

/// Latest known state per video; reports only rows that changed.
#[derive(Debug, Clone, Default)]
pub struct StatusBoard {
    rows: BTreeMap<i64, VideoStatus>,
}

impl StatusBoard {
    pub fn get(&self, id: i64) -> Option<&VideoStatus> {
        self.rows.get(&id)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn apply(&mut self, snapshot: &StatusSnapshot) -> Vec<StatusChange> {
        let mut changes = Vec::new();
        for video in &snapshot.videos {
            let previous = self.rows.get(&video.id);
            let changed = previous
                .map(|row| row.review != video.review || row.processing != video.processing)
                .unwrap_or(true);
            if changed {
                changes.push(StatusChange {
                    id: video.id,
                    review: video.review,
                    processing: video.processing,
                    previous_review: previous.map(|row| row.review),
                    previous_processing: previous.map(|row| row.processing),
                });
            }
            self.rows.insert(video.id, video.clone());
        }
        changes
    }
}
