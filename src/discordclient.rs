pub mod activity;
pub mod frame;

use std::env;
use std::future::Future;
use std::io::{self, ErrorKind};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use activity::Activity;
use frame::{read_frame, write_frame, Opcode};
use serde_json::{json, Value};
use tokio::io::AsyncWriteExt;
use tokio::net::UnixStream;
use tracing::debug;

use crate::ipcerror::IpcError;

/// Session with a presence service that displays an [`Activity`]
pub trait PresenceChannel: Send + 'static {
    fn open(&mut self) -> impl Future<Output = Result<(), IpcError>> + Send;

    fn update(&mut self, activity: &Activity) -> impl Future<Output = Result<(), IpcError>> + Send;

    fn is_closed(&self) -> bool;

    fn close(&mut self) -> impl Future<Output = Result<(), IpcError>> + Send;
}

static NONCE: AtomicUsize = AtomicUsize::new(1);

const IPC_SOCKETS: u8 = 10;
// Sandboxed installs put the socket one directory further down
const SUBDIRS: [&str; 3] = ["", "app/com.discordapp.Discord", "snap.discord"];

/// Every path Discord may be listening on, most likely first
pub fn socket_candidates() -> Vec<PathBuf> {
    let base = ["XDG_RUNTIME_DIR", "TMPDIR", "TMP", "TEMP"]
        .iter()
        .find_map(|var| env::var_os(var).filter(|v| !v.is_empty()))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("/tmp"));
    SUBDIRS
        .iter()
        .flat_map(|sub| {
            let dir = base.join(sub);
            (0..IPC_SOCKETS).map(move |i| dir.join(format!("discord-ipc-{}", i)))
        })
        .collect()
}

pub struct DiscordClient {
    client_id: String,
    paths: Vec<PathBuf>,
    stream: Option<UnixStream>,
    started: u128,
}

impl DiscordClient {
    pub fn new(client_id: String) -> Self {
        Self::with_paths(client_id, socket_candidates())
    }

    pub fn with_paths(client_id: String, paths: Vec<PathBuf>) -> Self {
        let started = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        Self {
            client_id,
            paths,
            stream: None,
            started,
        }
    }

    fn nonce(&self) -> String {
        format!("{}-{}", self.started, NONCE.fetch_add(1, Ordering::Relaxed))
    }

    async fn handshake(&self, stream: &mut UnixStream) -> Result<(), IpcError> {
        write_frame(
            stream,
            Opcode::Handshake,
            &json!({ "v": 1, "client_id": self.client_id }),
        )
        .await?;
        match read_frame(stream).await? {
            (Opcode::Close, reply) => Err(IpcError::rejected(Self::message(&reply))),
            _ => Ok(()),
        }
    }

    fn message(reply: &Value) -> String {
        reply
            .get("message")
            .or_else(|| reply.get("data").and_then(|d| d.get("message")))
            .and_then(Value::as_str)
            .unwrap_or("no reason given")
            .to_string()
    }
}

impl PresenceChannel for DiscordClient {
    async fn open(&mut self) -> Result<(), IpcError> {
        let mut last = IpcError::io(io::Error::new(
            ErrorKind::NotFound,
            "no Discord IPC socket found",
        ));
        for path in self.paths.clone() {
            let mut stream = match UnixStream::connect(&path).await {
                Ok(s) => s,
                Err(e) => {
                    last = e.into();
                    continue;
                }
            };
            match self.handshake(&mut stream).await {
                Ok(()) => {
                    debug!("Discord IPC handshake done on {}", path.display());
                    self.stream = Some(stream);
                    return Ok(());
                }
                Err(e) => last = e,
            }
        }
        Err(last)
    }

    async fn update(&mut self, activity: &Activity) -> Result<(), IpcError> {
        let payload = json!({
            "cmd": "SET_ACTIVITY",
            "args": {
                "pid": std::process::id(),
                "activity": activity,
            },
            "nonce": self.nonce(),
        });
        let Some(stream) = self.stream.as_mut() else {
            return Err(IpcError::not_connected());
        };
        write_frame(stream, Opcode::Frame, &payload).await?;
        loop {
            match read_frame(stream).await? {
                (Opcode::Ping, body) => write_frame(stream, Opcode::Pong, &body).await?,
                (Opcode::Close, _) => return Err(IpcError::disconnected()),
                (_, reply) => {
                    if reply.get("evt").and_then(Value::as_str) == Some("ERROR") {
                        return Err(IpcError::rejected(Self::message(&reply)));
                    }
                    return Ok(());
                }
            }
        }
    }

    fn is_closed(&self) -> bool {
        self.stream.is_none()
    }

    async fn close(&mut self) -> Result<(), IpcError> {
        let Some(mut stream) = self.stream.take() else {
            return Ok(());
        };
        match stream.shutdown().await {
            Ok(()) => Ok(()),
            Err(e) if matches!(e.kind(), ErrorKind::NotConnected | ErrorKind::BrokenPipe) => {
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tokio::net::UnixListener;

    use super::*;
    use crate::discordclient::activity::{ActivityKind, Assets};

    fn socket_path(name: &str) -> PathBuf {
        env::temp_dir().join(format!("mpvpresence-discord-{}-{}", name, std::process::id()))
    }

    fn activity() -> Activity {
        Activity {
            kind: ActivityKind::Listening,
            details: "Song by Artist".to_string(),
            state: Some("FLAC".to_string()),
            assets: Assets::default(),
            timestamps: None,
        }
    }

    #[tokio::test]
    async fn test_session() {
        let path = socket_path("session");
        let _ = std::fs::remove_file(&path);
        let listener = UnixListener::bind(&path).unwrap();
        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let (op, hello) = read_frame(&mut stream).await.unwrap();
            assert_eq!(op, Opcode::Handshake);
            assert_eq!(hello["client_id"], "1234");
            write_frame(&mut stream, Opcode::Frame, &json!({"evt": "READY"}))
                .await
                .unwrap();

            let (_, req) = read_frame(&mut stream).await.unwrap();
            assert_eq!(req["cmd"], "SET_ACTIVITY");
            assert_eq!(req["args"]["activity"]["type"], 2);
            write_frame(&mut stream, Opcode::Ping, &json!({})).await.unwrap();
            let (op, _) = read_frame(&mut stream).await.unwrap();
            assert_eq!(op, Opcode::Pong);
            write_frame(&mut stream, Opcode::Frame, &json!({"evt": null}))
                .await
                .unwrap();

            let (_, second) = read_frame(&mut stream).await.unwrap();
            assert_ne!(second["nonce"], req["nonce"]);
            write_frame(
                &mut stream,
                Opcode::Frame,
                &json!({"evt": "ERROR", "data": {"code": 4000, "message": "bad activity"}}),
            )
            .await
            .unwrap();
        });

        let missing = socket_path("missing");
        let mut client = DiscordClient::with_paths("1234".to_string(), vec![missing, path.clone()]);
        assert!(client.is_closed());
        client.open().await.unwrap();
        assert!(!client.is_closed());
        client.update(&activity()).await.unwrap();
        let err = client.update(&activity()).await.unwrap_err();
        assert_eq!(err.to_string(), "Request rejected: bad activity");
        server.await.unwrap();

        client.close().await.unwrap();
        assert!(client.is_closed());
        client.close().await.unwrap();
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_handshake_rejected() {
        let path = socket_path("rejected");
        let _ = std::fs::remove_file(&path);
        let listener = UnixListener::bind(&path).unwrap();
        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let _ = read_frame(&mut stream).await.unwrap();
            write_frame(
                &mut stream,
                Opcode::Close,
                &json!({"code": 4000, "message": "Invalid Client ID"}),
            )
            .await
            .unwrap();
        });

        let mut client = DiscordClient::with_paths("0".to_string(), vec![path.clone()]);
        let err = client.open().await.unwrap_err();
        assert_eq!(err.to_string(), "Request rejected: Invalid Client ID");
        assert!(client.is_closed());
        server.await.unwrap();
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_update_without_session() {
        let mut client = DiscordClient::with_paths("0".to_string(), vec![]);
        assert!(client.open().await.is_err());
        let err = client.update(&activity()).await.unwrap_err();
        assert_eq!(err.to_string(), "Channel is not connected");
    }

    #[test]
    fn test_socket_candidates() {
        let paths = socket_candidates();
        assert_eq!(paths.len(), 30);
        assert!(paths[0].ends_with("discord-ipc-0"));
        assert!(paths[10].ends_with("app/com.discordapp.Discord/discord-ipc-0"));
    }
}
