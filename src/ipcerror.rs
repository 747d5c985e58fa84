use std::{error::Error, fmt::Display, io};

/// How a failed channel operation should be handled by whoever observed it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The peer went away abruptly. The channel has to be closed and reopened.
    BrokenPipe,
    /// The peer closed the stream gracefully. Ignored for the current cycle.
    EndOfStream,
    /// Anything else. Logged, and the cycle is skipped.
    Other,
}

#[derive(Debug)]
enum ErrType {
    Io(io::Error),
    Json(serde_json::Error),
    NotConnected,
    Disconnected,
    Unavailable(String),
    Rejected(String),
}

impl Display for ErrType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrType::Io(e) => write!(f, "I/O error: {}", e),
            ErrType::Json(e) => write!(f, "Malformed message: {}", e),
            ErrType::NotConnected => write!(f, "Channel is not connected"),
            ErrType::Disconnected => write!(f, "Peer closed the connection"),
            ErrType::Unavailable(key) => write!(f, "Property unavailable: {}", key),
            ErrType::Rejected(msg) => write!(f, "Request rejected: {}", msg),
        }
    }
}

// Returned by both channels. The socket either failed (`Io`, `Disconnected`, `NotConnected`), or
// the peer answered with something other than success.
#[derive(Debug)]
pub struct IpcError {
    reason: ErrType,
}

impl Error for IpcError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.reason {
            ErrType::Io(e) => Some(e),
            ErrType::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl Display for IpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.reason.fmt(f)
    }
}

impl From<io::Error> for IpcError {
    fn from(e: io::Error) -> Self {
        Self::io(e)
    }
}

impl From<serde_json::Error> for IpcError {
    fn from(e: serde_json::Error) -> Self {
        Self::json(e)
    }
}

impl IpcError {
    pub fn io(e: io::Error) -> IpcError {
        Self {
            reason: ErrType::Io(e),
        }
    }

    pub fn json(e: serde_json::Error) -> IpcError {
        Self {
            reason: ErrType::Json(e),
        }
    }

    pub fn not_connected() -> IpcError {
        Self {
            reason: ErrType::NotConnected,
        }
    }

    pub fn disconnected() -> IpcError {
        Self {
            reason: ErrType::Disconnected,
        }
    }

    pub fn unavailable(key: &str) -> IpcError {
        Self {
            reason: ErrType::Unavailable(key.to_string()),
        }
    }

    pub fn rejected(msg: String) -> IpcError {
        Self {
            reason: ErrType::Rejected(msg),
        }
    }

    pub fn class(&self) -> ErrorClass {
        match &self.reason {
            ErrType::Io(e) => match e.kind() {
                io::ErrorKind::BrokenPipe | io::ErrorKind::ConnectionReset => {
                    ErrorClass::BrokenPipe
                }
                io::ErrorKind::UnexpectedEof => ErrorClass::EndOfStream,
                _ => ErrorClass::Other,
            },
            ErrType::Disconnected => ErrorClass::EndOfStream,
            _ => ErrorClass::Other,
        }
    }

    /// True if the socket itself failed, as opposed to the peer answering with an error.
    /// Sampling aborts on these instead of recording the property as absent.
    pub fn is_transport(&self) -> bool {
        matches!(
            self.reason,
            ErrType::Io(_) | ErrType::NotConnected | ErrType::Disconnected
        )
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_broken_pipe_class() {
        let e = IpcError::io(io::Error::from(io::ErrorKind::BrokenPipe));
        assert_eq!(e.class(), ErrorClass::BrokenPipe);
        let e = IpcError::io(io::Error::from(io::ErrorKind::ConnectionReset));
        assert_eq!(e.class(), ErrorClass::BrokenPipe);
    }

    #[test]
    fn test_end_of_stream_class() {
        let e = IpcError::io(io::Error::from(io::ErrorKind::UnexpectedEof));
        assert_eq!(e.class(), ErrorClass::EndOfStream);
        assert_eq!(IpcError::disconnected().class(), ErrorClass::EndOfStream);
    }

    #[test]
    fn test_other_class() {
        let e = IpcError::io(io::Error::from(io::ErrorKind::PermissionDenied));
        assert_eq!(e.class(), ErrorClass::Other);
        assert_eq!(IpcError::not_connected().class(), ErrorClass::Other);
        assert_eq!(
            IpcError::rejected("invalid parameter".to_string()).class(),
            ErrorClass::Other
        );
    }

    #[test]
    fn test_transport() {
        assert!(IpcError::disconnected().is_transport());
        assert!(IpcError::not_connected().is_transport());
        assert!(!IpcError::unavailable("duration").is_transport());
        assert!(!IpcError::rejected("error running command".to_string()).is_transport());
    }
}
