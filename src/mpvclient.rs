pub mod propertyvalue;
pub mod response;

use std::collections::HashMap;
use std::future::Future;
use std::io::ErrorKind;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use propertyvalue::PropertyValue;
use response::{MpvCommand, MpvMessage, SUCCESS, UNAVAILABLE};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::UnixStream;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::ipcerror::IpcError;

/// Request/response access to a running player
pub trait PlayerChannel: Send {
    fn open(&mut self, endpoint: &str) -> impl Future<Output = Result<(), IpcError>> + Send;

    /// Raw property value. A property mpv does not currently have fails with
    /// [`IpcError::unavailable`].
    fn get_property(
        &mut self,
        key: &str,
    ) -> impl Future<Output = Result<PropertyValue, IpcError>> + Send;

    /// The property as mpv would display it, e.g. `"1.500000"` for `speed`
    fn get_property_string(
        &mut self,
        key: &str,
    ) -> impl Future<Output = Result<String, IpcError>> + Send;

    fn is_closed(&self) -> bool;

    fn close(&mut self) -> impl Future<Output = Result<(), IpcError>> + Send;
}

type Pending = Arc<Mutex<HashMap<u64, oneshot::Sender<MpvMessage>>>>;

/// Client for mpv's JSON IPC (`--input-ipc-server`)
///
/// Requests are written as single JSON lines tagged with a `request_id`. A reader task owns the
/// read half of the socket and hands every reply to whoever is waiting on that ID. Events are
/// dropped, as nothing here observes them.
pub struct MpvClient {
    writer: Option<OwnedWriteHalf>,
    reader: Option<JoinHandle<()>>,
    pending: Pending,
    closed: Arc<AtomicBool>,
    next_id: u64,
}

impl MpvClient {
    pub fn new() -> Self {
        Self {
            writer: None,
            reader: None,
            pending: Arc::new(Mutex::new(HashMap::new())),
            closed: Arc::new(AtomicBool::new(true)),
            next_id: 0,
        }
    }

    async fn read_loop(read: OwnedReadHalf, pending: Pending, closed: Arc<AtomicBool>) {
        let mut lines = BufReader::new(read).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let msg: MpvMessage = match serde_json::from_str(&line) {
                        Ok(msg) => msg,
                        Err(e) => {
                            debug!("Skipping malformed line from mpv: {}", e);
                            continue;
                        }
                    };
                    if !msg.is_reply() {
                        continue;
                    }
                    let Some(id) = msg.request_id else {
                        continue;
                    };
                    if let Some(tx) = pending.lock().await.remove(&id) {
                        let _ = tx.send(msg);
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    debug!("mpv socket read failed: {}", e);
                    break;
                }
            }
        }
        // Must be set before the waiters are dropped, see `request`
        closed.store(true, Ordering::SeqCst);
        pending.lock().await.clear();
    }

    async fn request(&mut self, command: Vec<&str>) -> Result<Value, IpcError> {
        let key = command.get(1).copied().unwrap_or_default().to_string();
        let Some(writer) = self.writer.as_mut() else {
            return Err(IpcError::not_connected());
        };
        self.next_id += 1;
        let request_id = self.next_id;
        let (tx, rx) = oneshot::channel();
        {
            let mut pending = self.pending.lock().await;
            if self.closed.load(Ordering::SeqCst) {
                return Err(IpcError::disconnected());
            }
            pending.insert(request_id, tx);
        }

        let mut line = serde_json::to_vec(&MpvCommand {
            command,
            request_id,
        })?;
        line.push(b'\n');
        if let Err(e) = writer.write_all(&line).await {
            self.pending.lock().await.remove(&request_id);
            return Err(e.into());
        }

        let reply = rx.await.map_err(|_| IpcError::disconnected())?;
        match reply.error.as_deref() {
            None | Some(SUCCESS) => Ok(reply.data.unwrap_or(Value::Null)),
            Some(UNAVAILABLE) => Err(IpcError::unavailable(&key)),
            Some(other) => Err(IpcError::rejected(format!("{} ({})", other, key))),
        }
    }
}

impl Default for MpvClient {
    fn default() -> Self {
        Self::new()
    }
}

impl PlayerChannel for MpvClient {
    async fn open(&mut self, endpoint: &str) -> Result<(), IpcError> {
        let stream = UnixStream::connect(endpoint).await?;
        let (read, write) = stream.into_split();
        self.closed.store(false, Ordering::SeqCst);
        let pending = self.pending.clone();
        let closed = self.closed.clone();
        self.reader = Some(tokio::spawn(Self::read_loop(read, pending, closed)));
        self.writer = Some(write);
        Ok(())
    }

    async fn get_property(&mut self, key: &str) -> Result<PropertyValue, IpcError> {
        let value = self.request(vec!["get_property", key]).await?;
        Ok(PropertyValue::from(value))
    }

    async fn get_property_string(&mut self, key: &str) -> Result<String, IpcError> {
        match self.request(vec!["get_property_string", key]).await? {
            Value::String(s) => Ok(s),
            Value::Null => Ok(String::new()),
            other => Ok(other.to_string()),
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    async fn close(&mut self) -> Result<(), IpcError> {
        self.closed.store(true, Ordering::SeqCst);
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
        self.pending.lock().await.clear();
        let Some(mut writer) = self.writer.take() else {
            return Ok(());
        };
        match writer.shutdown().await {
            Ok(()) => Ok(()),
            // mpv already hung up
            Err(e) if e.kind() == ErrorKind::NotConnected => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
