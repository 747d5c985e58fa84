pub mod linkerror;
pub mod playerlink;
pub mod presencelink;

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use linkerror::LinkError;
use playerlink::PlayerLink;
use presencelink::PresenceLink;
use tokio::select;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::activitybuilder;
use crate::discordclient::PresenceChannel;
use crate::ipcerror::ErrorClass;
use crate::mpvclient::PlayerChannel;
use crate::trace_dbg;

enum Cycle {
    Continue,
    PlayerGone,
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

/// Periodically mirrors the player's state onto the presence channel.
///
/// Sampling happens on the worker itself, one cycle per `interval`. Sending the result is
/// handed to [`PresenceLink`], so a slow or dead presence service never delays the next sample.
/// The worker returns once the player is gone, after closing both channels.
pub struct SyncWorker<C, P> {
    player: PlayerLink<C>,
    presence: PresenceLink<P>,
    fatal_rx: UnboundedReceiver<LinkError>,
    interval: Duration,
    /// Epoch milliseconds the elapsed time is measured from, see [`activitybuilder::build`]
    anchor: i64,
}

impl<C: PlayerChannel, P: PresenceChannel> SyncWorker<C, P> {
    pub fn new(
        player: C,
        endpoint: String,
        presence: P,
        interval: Duration,
        retry_interval: Duration,
    ) -> Self {
        let (fatal_tx, fatal_rx) = mpsc::unbounded_channel();
        let player = PlayerLink::new(player, endpoint);
        let presence = PresenceLink::new(presence, retry_interval, player.gone_token(), fatal_tx);
        Self {
            player,
            presence,
            fatal_rx,
            interval,
            anchor: now_millis(),
        }
    }

    async fn cycle(&mut self) -> Cycle {
        let snapshot = match self.player.sample().await {
            Ok(s) => s,
            Err(e) => {
                return match e.class() {
                    ErrorClass::BrokenPipe => {
                        info!("(mpv-ipc): connection lost");
                        Cycle::PlayerGone
                    }
                    ErrorClass::EndOfStream => Cycle::Continue,
                    ErrorClass::Other => {
                        warn!("(mpv-ipc): {}", e);
                        Cycle::Continue
                    }
                };
            }
        };
        debug!("Sampled {} properties", snapshot.len());
        match activitybuilder::build(&snapshot, self.anchor, now_millis()) {
            Ok(built) => {
                self.anchor = built.anchor;
                debug!("Built activity: {:?}", built.activity);
                if !self.presence.is_abandoned() {
                    self.presence.dispatch(built.activity);
                }
            }
            Err(e) => warn!("Skipping update: {}", e),
        }
        Cycle::Continue
    }

    pub async fn run(mut self) -> Result<(), LinkError> {
        trace_dbg!("Starting SyncWorker...");
        self.player.open().await?;
        self.presence.connect();

        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            select! {
                Some(e) = self.fatal_rx.recv() => {
                    error!("{}", e);
                    if let Err(close) = self.player.close().await {
                        error!("{}", close);
                    }
                    return Err(e);
                }
                _ = ticker.tick() => {}
            }
            if self.player.is_closed() {
                break;
            }
            if let Cycle::PlayerGone = self.cycle().await {
                break;
            }
        }
        self.shutdown().await
    }

    /// Player first, then presence. Either failing is fatal.
    async fn shutdown(mut self) -> Result<(), LinkError> {
        self.player.close().await?;
        self.presence.close().await
    }
}
