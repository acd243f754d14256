//! Notification polling while a user is logged in.
//!
//! The poller fetches the notification list on a fixed period and publishes
//! each result on a channel. It follows the session: polling starts when a
//! session begins and stops (and the list is cleared) when it ends.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::api::{ApiClient, ApiError};
use crate::models::{unread_count, Notification};
use crate::session::{RecurringTimer, SessionEvent, SessionManager};

/// Where notifications come from.
#[async_trait]
pub trait NotificationSource: Send + Sync {
    async fn fetch(&self) -> Result<Vec<Notification>>;
    async fn mark_all_read(&self) -> Result<()>;
}

#[async_trait]
impl NotificationSource for ApiClient {
    async fn fetch(&self) -> Result<Vec<Notification>> {
        self.fetch_notifications().await
    }

    async fn mark_all_read(&self) -> Result<()> {
        self.mark_all_notifications_read().await
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NotificationUpdate {
    Loaded(Vec<Notification>),
    Failed(String),
    /// The session ended; drop anything shown.
    Cleared,
}

struct Shared {
    source: Arc<dyn NotificationSource>,
    latest: Mutex<Vec<Notification>>,
    updates: mpsc::Sender<NotificationUpdate>,
}

impl Shared {
    async fn poll(&self) {
        let update = match self.source.fetch().await {
            Ok(list) => {
                debug!(count = list.len(), unread = unread_count(&list), "Notifications fetched");
                *self.latest.lock().unwrap_or_else(PoisonError::into_inner) = list.clone();
                NotificationUpdate::Loaded(list)
            }
            Err(e) => {
                warn!(error = %e, "Failed to fetch notifications");
                NotificationUpdate::Failed(user_message(&e))
            }
        };
        // Receiver gone means the app is shutting down.
        let _ = self.updates.send(update).await;
    }
}

fn user_message(err: &anyhow::Error) -> String {
    err.downcast_ref::<ApiError>()
        .map(ApiError::user_message)
        .unwrap_or_else(|| err.to_string())
}

pub struct NotificationPoller {
    shared: Arc<Shared>,
    interval: Duration,
    timer: Mutex<RecurringTimer>,
}

impl NotificationPoller {
    pub fn new(
        source: Arc<dyn NotificationSource>,
        interval: Duration,
        updates: mpsc::Sender<NotificationUpdate>,
    ) -> Arc<Self> {
        Arc::new(Self {
            shared: Arc::new(Shared {
                source,
                latest: Mutex::new(Vec::new()),
                updates,
            }),
            interval,
            timer: Mutex::new(RecurringTimer::new("notifications")),
        })
    }

    /// Begin polling; the first fetch happens immediately.
    pub fn start(&self) {
        let shared = self.shared.clone();
        self.timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .start(self.interval, Duration::ZERO, move || {
                let shared = shared.clone();
                async move { shared.poll().await }
            });
    }

    pub fn stop(&self) {
        self.timer.lock().unwrap_or_else(PoisonError::into_inner).stop();
        self.shared
            .latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn is_running(&self) -> bool {
        self.timer.lock().unwrap_or_else(PoisonError::into_inner).is_running()
    }

    /// Fetch once now, outside the schedule.
    pub async fn poll_now(&self) {
        self.shared.poll().await;
    }

    pub fn latest(&self) -> Vec<Notification> {
        self.shared
            .latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn unread_count(&self) -> usize {
        unread_count(&self.shared.latest.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Mark everything read on the server, then locally.
    pub async fn mark_all_read(&self) -> Result<()> {
        self.shared.source.mark_all_read().await?;

        let list = {
            let mut latest = self.shared.latest.lock().unwrap_or_else(PoisonError::into_inner);
            for n in latest.iter_mut() {
                n.is_seen = true;
            }
            latest.clone()
        };
        let _ = self.shared.updates.send(NotificationUpdate::Loaded(list)).await;
        Ok(())
    }

    fn on_session_event(&self, event: &SessionEvent) {
        match event {
            SessionEvent::LoggedIn { .. } | SessionEvent::Restored { .. } => self.start(),
            SessionEvent::Refreshed { .. } => {}
            SessionEvent::LoggedOut { .. } => {
                self.stop();
                let _ = self.shared.updates.try_send(NotificationUpdate::Cleared);
            }
        }
    }

    /// Follow `session` until it is dropped. Starts right away if a session
    /// is already active.
    pub fn bind(self: &Arc<Self>, session: &SessionManager) -> JoinHandle<()> {
        let mut events = session.subscribe();
        if session.is_authenticated() {
            self.start();
        }

        let poller = Arc::downgrade(self);
        tokio::spawn(async move {
            loop {
                let event = match events.recv().await {
                    Ok(event) => event,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Notification poller missed session events");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                };
                match poller.upgrade() {
                    Some(poller) => poller.on_session_event(&event),
                    None => break,
                }
            }
        })
    }
}

impl Drop for NotificationPoller {
    fn drop(&mut self) {
        self.timer.lock().unwrap_or_else(PoisonError::into_inner).stop();
    }
}
