use std::{error::Error, fmt::Display};

use crate::ipcerror::IpcError;

#[derive(Debug)]
enum ErrType {
    OpenPlayer(IpcError),
    ClosePlayer(IpcError),
    ClosePresence(IpcError),
}

impl Display for ErrType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrType::OpenPlayer(e) => write!(f, "(mpv-ipc): failed to connect: {}", e),
            ErrType::ClosePlayer(e) => write!(f, "(mpv-ipc): failed to disconnect: {}", e),
            ErrType::ClosePresence(e) => write!(f, "(discord-ipc): failed to disconnect: {}", e),
        }
    }
}

// Unrecoverable. The bridge stops once one of these is raised.
#[derive(Debug)]
pub struct LinkError {
    reason: ErrType,
}

impl Error for LinkError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.reason {
            ErrType::OpenPlayer(e) | ErrType::ClosePlayer(e) | ErrType::ClosePresence(e) => {
                Some(e)
            }
        }
    }
}

impl Display for LinkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.reason.fmt(f)
    }
}

impl LinkError {
    pub fn open_player(e: IpcError) -> LinkError {
        Self {
            reason: ErrType::OpenPlayer(e),
        }
    }

    pub fn close_player(e: IpcError) -> LinkError {
        Self {
            reason: ErrType::ClosePlayer(e),
        }
    }

    pub fn close_presence(e: IpcError) -> LinkError {
        Self {
            reason: ErrType::ClosePresence(e),
        }
    }
}
