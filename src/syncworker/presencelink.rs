use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::select;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::Mutex;
use tokio::time::{interval_at, Instant};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use crate::discordclient::activity::Activity;
use crate::discordclient::PresenceChannel;
use crate::ipcerror::ErrorClass;
use crate::syncworker::linkerror::LinkError;

/// Owns the presence connection and keeps it alive.
///
/// Every state change of the channel (open, update, close) happens while holding the channel's
/// lock, so an update can never interleave with a reconnect. Reconnecting and updating run as
/// tracked background tasks; none of them ever blocks the sync loop. At most one update is in
/// flight at a time, and a pending update is dropped as soon as the player is gone.
///
/// Reconnecting stops for good once `player_gone` is cancelled, after which the link is
/// abandoned.
pub struct PresenceLink<P> {
    channel: Arc<Mutex<P>>,
    reconnecting: Arc<AtomicBool>,
    abandoned: Arc<AtomicBool>,
    dispatching: Arc<AtomicBool>,
    retry_interval: Duration,
    player_gone: CancellationToken,
    fatal_tx: UnboundedSender<LinkError>,
    tracker: TaskTracker,
}

impl<P> Clone for PresenceLink<P> {
    fn clone(&self) -> Self {
        Self {
            channel: self.channel.clone(),
            reconnecting: self.reconnecting.clone(),
            abandoned: self.abandoned.clone(),
            dispatching: self.dispatching.clone(),
            retry_interval: self.retry_interval,
            player_gone: self.player_gone.clone(),
            fatal_tx: self.fatal_tx.clone(),
            tracker: self.tracker.clone(),
        }
    }
}

impl<P: PresenceChannel> PresenceLink<P> {
    pub fn new(
        channel: P,
        retry_interval: Duration,
        player_gone: CancellationToken,
        fatal_tx: UnboundedSender<LinkError>,
    ) -> Self {
        Self {
            channel: Arc::new(Mutex::new(channel)),
            reconnecting: Arc::new(AtomicBool::new(false)),
            abandoned: Arc::new(AtomicBool::new(false)),
            dispatching: Arc::new(AtomicBool::new(false)),
            retry_interval,
            player_gone,
            fatal_tx,
            tracker: TaskTracker::new(),
        }
    }

    pub fn is_abandoned(&self) -> bool {
        self.abandoned.load(Ordering::SeqCst)
    }

    #[cfg(test)]
    pub fn is_reconnecting(&self) -> bool {
        self.reconnecting.load(Ordering::SeqCst)
    }

    /// Starts retrying `open` in the background, unless that is already happening
    pub fn connect(&self) {
        if self.is_abandoned() || self.reconnecting.swap(true, Ordering::SeqCst) {
            return;
        }
        let link = self.clone();
        self.tracker.spawn(async move { link.retry_open().await });
    }

    async fn retry_open(&self) {
        let mut ticker = interval_at(Instant::now() + self.retry_interval, self.retry_interval);
        loop {
            select! {
                _ = self.player_gone.cancelled() => {}
                _ = ticker.tick() => {}
            }
            if self.player_gone.is_cancelled() {
                debug!("(discord-ipc): player is gone, no longer retrying");
                self.abandoned.store(true, Ordering::SeqCst);
                self.reconnecting.store(false, Ordering::SeqCst);
                return;
            }
            let mut channel = self.channel.lock().await;
            let opened = select! {
                result = channel.open() => result.is_ok(),
                // Checked again at the top of the loop
                _ = self.player_gone.cancelled() => false,
            };
            if opened {
                // Cleared under the lock, so a failing update always sees it
                self.reconnecting.store(false, Ordering::SeqCst);
                info!("(discord-ipc): connected");
                return;
            }
        }
    }

    /// Sends the activity from a background task. A stale connection is torn down and
    /// reconnecting is started; the activity itself is dropped. Nothing is sent while an earlier
    /// update is still waiting for its reply.
    pub fn dispatch(&self, activity: Activity) {
        if self.dispatching.swap(true, Ordering::SeqCst) {
            debug!("(discord-ipc): previous update still pending, skipping");
            return;
        }
        let link = self.clone();
        self.tracker.spawn(async move {
            link.update(activity).await;
            link.dispatching.store(false, Ordering::SeqCst);
        });
    }

    async fn update(&self, activity: Activity) {
        let mut channel = self.channel.lock().await;
        if channel.is_closed() {
            return;
        }
        let result = select! {
            result = channel.update(&activity) => result,
            _ = self.player_gone.cancelled() => {
                debug!("(discord-ipc): player is gone, dropping pending update");
                return;
            }
        };
        let Err(e) = result else {
            return;
        };
        match e.class() {
            ErrorClass::BrokenPipe => {
                if let Err(e) = channel.close().await {
                    let _ = self.fatal_tx.send(LinkError::close_presence(e));
                    return;
                }
                drop(channel);
                info!("(discord-ipc): reconnecting...");
                self.connect();
            }
            ErrorClass::EndOfStream => {}
            ErrorClass::Other => warn!("(discord-ipc): {}", e),
        }
    }

    /// Waits for every background task, then closes the channel. Cancel `player_gone` first, or
    /// a running reconnect will keep this waiting.
    pub async fn close(&self) -> Result<(), LinkError> {
        self.tracker.close();
        self.tracker.wait().await;
        let mut channel = self.channel.lock().await;
        let was_open = !channel.is_closed();
        channel.close().await.map_err(LinkError::close_presence)?;
        if was_open {
            info!("(discord-ipc): disconnected");
        }
        Ok(())
    }
}
