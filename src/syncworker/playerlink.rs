use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::activitybuilder::snapshot::PlaybackSnapshot;
use crate::ipcerror::{ErrorClass, IpcError};
use crate::mpvclient::PlayerChannel;
use crate::syncworker::linkerror::LinkError;

/// Owns the player connection. There is no reconnecting: once mpv is gone, so is the reason to
/// keep running.
pub struct PlayerLink<C> {
    channel: C,
    endpoint: String,
    /// Cancelled as soon as the player is known to be gone
    gone: CancellationToken,
}

impl<C: PlayerChannel> PlayerLink<C> {
    pub fn new(channel: C, endpoint: String) -> Self {
        Self {
            channel,
            endpoint,
            gone: CancellationToken::new(),
        }
    }

    pub fn gone_token(&self) -> CancellationToken {
        self.gone.clone()
    }

    pub async fn open(&mut self) -> Result<(), LinkError> {
        self.channel
            .open(&self.endpoint)
            .await
            .map_err(LinkError::open_player)?;
        info!("(mpv-ipc): connected");
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        if self.gone.is_cancelled() {
            return true;
        }
        if self.channel.is_closed() {
            self.gone.cancel();
            return true;
        }
        false
    }

    pub async fn sample(&mut self) -> Result<PlaybackSnapshot, IpcError> {
        let result = PlaybackSnapshot::sample(&mut self.channel).await;
        if let Err(e) = &result {
            if e.class() == ErrorClass::BrokenPipe {
                self.gone.cancel();
            }
        }
        result
    }

    pub async fn close(&mut self) -> Result<(), LinkError> {
        let was_open = !self.channel.is_closed();
        self.gone.cancel();
        self.channel.close().await.map_err(LinkError::close_player)?;
        if was_open {
            info!("(mpv-ipc): disconnected");
        }
        Ok(())
    }
}
