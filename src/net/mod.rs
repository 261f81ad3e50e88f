//! Port abstractions over the publish/subscribe substrate.
//!
//! The adapter only ever sees [`InputPort`], [`OutputPort`] and [`Network`].
//! Two substrates are provided: [`local::LocalNetwork`] wires ports inside one
//! process, [`udp::UdpNetwork`] exchanges JSON datagrams between processes.

use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

use crate::bottle::Bottle;
use crate::contact::{SkinContactList, Stamp};

pub mod local;
pub mod udp;

/// Transport failures.
#[derive(Debug, thiserror::Error)]
pub enum NetError {
    /// The substrate cannot be reached at all.
    #[error("network unavailable on {host}: {source}")]
    Unavailable {
        /// Host the probe tried to bind.
        host: String,
        /// Underlying socket error.
        #[source]
        source: std::io::Error,
    },
    /// No address or registration exists for a port name.
    #[error("unknown port {0}")]
    UnknownPort(String),
    /// A port with this name is already open.
    #[error("port {0} is already open")]
    AlreadyOpen(String),
    /// Binding the socket behind a port failed.
    #[error("failed to bind port {name}: {source}")]
    Bind {
        /// Port name.
        name: String,
        /// Underlying socket error.
        #[source]
        source: std::io::Error,
    },
    /// Delivering a message failed.
    #[error("failed to send on port {name}: {source}")]
    Send {
        /// Port name.
        name: String,
        /// Underlying socket error.
        #[source]
        source: std::io::Error,
    },
    /// Message could not be encoded.
    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
    /// The port was closed.
    #[error("port {0} is closed")]
    Closed(String),
}

/// Receiving end of a named port.
pub trait InputPort: Send {
    /// Port name, e.g. `/ppsAggregEventsForiCubGui/skin_events_aggreg:i`.
    fn name(&self) -> &str;

    /// Non-blocking read of the newest pending message.
    ///
    /// Older unread messages are discarded. Returns `None` when nothing is
    /// pending or the port is closed.
    fn read(&mut self) -> Option<Bottle>;

    /// Interrupt and close the port. Calling it again is a no-op.
    fn close(&mut self);
}

/// Sending end of a named port.
pub trait OutputPort: Send {
    /// Port name, e.g. `/ppsAggregEventsForiCubGui/contacts:o`.
    fn name(&self) -> &str;

    /// Publish one contact list with its envelope to every connected reader.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::Closed`] after [`OutputPort::close`], or a
    /// transport error when delivery fails.
    fn write(&mut self, stamp: &Stamp, contacts: &SkinContactList) -> Result<(), NetError>;

    /// Interrupt and close the port. Calling it again is a no-op.
    fn close(&mut self);
}

/// A publish/subscribe substrate that can open and wire named ports.
pub trait Network {
    /// Verify the substrate is reachable.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::Unavailable`] when it is not.
    fn check(&self) -> Result<(), NetError>;

    /// Open a named input port.
    ///
    /// # Errors
    ///
    /// Returns an error if the port cannot be created.
    fn open_input(&self, name: &str) -> Result<Box<dyn InputPort>, NetError>;

    /// Open a named output port.
    ///
    /// # Errors
    ///
    /// Returns an error if the port cannot be created.
    fn open_output(&self, name: &str) -> Result<Box<dyn OutputPort>, NetError>;

    /// Route messages written on `src` to `dst`.
    ///
    /// # Errors
    ///
    /// Returns an error if either end cannot be resolved or reached.
    fn connect(&self, src: &str, dst: &str) -> Result<(), NetError>;
}

/// One message on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Datagram {
    /// Payload with an optional envelope.
    Data {
        /// Envelope set by the writer.
        #[serde(default)]
        envelope: Option<Stamp>,
        /// Message body.
        payload: serde_json::Value,
    },
    /// Ask the receiving output port to start sending to `dest`.
    Connect {
        /// Subscriber address.
        dest: SocketAddr,
    },
    /// Ask the receiving output port to stop sending to `dest`.
    Disconnect {
        /// Subscriber address.
        dest: SocketAddr,
    },
}

impl Datagram {
    /// Build a data datagram from a bottle, as an event producer would.
    ///
    /// # Errors
    ///
    /// Returns an error if the bottle cannot be encoded.
    pub fn from_bottle(bottle: &Bottle) -> Result<Self, NetError> {
        Ok(Datagram::Data {
            envelope: None,
            payload: serde_json::to_value(bottle)?,
        })
    }

    /// Build a data datagram carrying a contact list.
    ///
    /// # Errors
    ///
    /// Returns an error if the contacts cannot be encoded.
    pub fn from_contacts(stamp: &Stamp, contacts: &SkinContactList) -> Result<Self, NetError> {
        Ok(Datagram::Data {
            envelope: Some(*stamp),
            payload: serde_json::to_value(contacts)?,
        })
    }
}
