use std::fmt;

/// Error type for connect operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectError {
    /// The handler is already registered at this address.
    AlreadyConnected,
    /// The address uses a single-handler set and another handler holds the slot.
    SlotOccupied,
}

impl fmt::Display for ConnectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectError::AlreadyConnected => {
                write!(f, "handler is already connected at this address")
            }
            ConnectError::SlotOccupied => {
                write!(f, "single-handler address already has a handler connected")
            }
        }
    }
}

impl std::error::Error for ConnectError {}

/// Error type for disconnect operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectError {
    /// The handler is not registered at the given address.
    NotConnected,
}

impl fmt::Display for DisconnectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisconnectError::NotConnected => {
                write!(f, "handler is not connected at this address")
            }
        }
    }
}

impl std::error::Error for DisconnectError {}
