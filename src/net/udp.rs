//! UDP substrate: one non-blocking socket per port, one JSON [`Datagram`]
//! per message.
//!
//! Port names resolve through a static table of `name -> host:port`
//! entries. Own ports without an entry bind an ephemeral port on the
//! configured host.

use std::collections::{BTreeSet, HashMap};
use std::io::ErrorKind;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use super::{Datagram, InputPort, NetError, Network, OutputPort};
use crate::bottle::Bottle;
use crate::contact::{SkinContactList, Stamp};

/// Largest payload a single UDP datagram can carry.
const MAX_DATAGRAM: usize = 65_507;

type Subscribers = Arc<Mutex<BTreeSet<SocketAddr>>>;
type Shared = Arc<Mutex<Local>>;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Default)]
struct Local {
    addrs: HashMap<String, SocketAddr>,
    outputs: HashMap<String, Subscribers>,
    /// Remote producers asked to feed each own input.
    producers: HashMap<String, BTreeSet<SocketAddr>>,
}

impl Local {
    /// Forget a closed port. Returns the producers that were feeding it.
    fn release(&mut self, name: &str) -> BTreeSet<SocketAddr> {
        self.addrs.remove(name);
        self.outputs.remove(name);
        self.producers.remove(name).unwrap_or_default()
    }
}

/// Network of UDP ports resolved through a static name table.
pub struct UdpNetwork {
    host: String,
    table: HashMap<String, String>,
    local: Shared,
}

impl UdpNetwork {
    /// Create a network binding own ports on `host`, resolving names via `table`.
    pub fn new(host: impl Into<String>, table: HashMap<String, String>) -> Self {
        Self {
            host: host.into(),
            table,
            local: Shared::default(),
        }
    }

    /// Resolve a port name: own ports first, then the static table.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::UnknownPort`] when the name has no usable address.
    pub fn resolve(&self, name: &str) -> Result<SocketAddr, NetError> {
        if let Some(addr) = lock(&self.local).addrs.get(name) {
            return Ok(*addr);
        }
        self.table
            .get(name)
            .and_then(|a| a.to_socket_addrs().ok())
            .and_then(|mut addrs| addrs.next())
            .ok_or_else(|| NetError::UnknownPort(name.to_owned()))
    }

    fn bind(&self, name: &str) -> Result<(UdpSocket, SocketAddr), NetError> {
        let bind_err = |source| NetError::Bind {
            name: name.to_owned(),
            source,
        };
        let socket = match self.table.get(name) {
            Some(addr) => UdpSocket::bind(addr.as_str()),
            None => UdpSocket::bind((self.host.as_str(), 0)),
        }
        .map_err(bind_err)?;
        socket.set_nonblocking(true).map_err(bind_err)?;
        let addr = socket.local_addr().map_err(bind_err)?;
        let mut local = lock(&self.local);
        if local.addrs.contains_key(name) {
            return Err(NetError::AlreadyOpen(name.to_owned()));
        }
        local.addrs.insert(name.to_owned(), addr);
        debug!(port = name, %addr, "udp port bound");
        Ok((socket, addr))
    }

    fn send_control(&self, to: SocketAddr, msg: &Datagram) -> Result<(), NetError> {
        let bytes = serde_json::to_vec(msg)?;
        let send_err = |source| NetError::Send {
            name: to.to_string(),
            source,
        };
        let socket = UdpSocket::bind((self.host.as_str(), 0)).map_err(send_err)?;
        socket.send_to(&bytes, to).map_err(send_err)?;
        Ok(())
    }
}

impl Network for UdpNetwork {
    fn check(&self) -> Result<(), NetError> {
        UdpSocket::bind((self.host.as_str(), 0))
            .map(|_| ())
            .map_err(|source| NetError::Unavailable {
                host: self.host.clone(),
                source,
            })
    }

    fn open_input(&self, name: &str) -> Result<Box<dyn InputPort>, NetError> {
        let (socket, addr) = self.bind(name)?;
        Ok(Box::new(UdpInputPort {
            name: name.to_owned(),
            addr,
            socket: Some(socket),
            local: Arc::clone(&self.local),
            buf: vec![0; MAX_DATAGRAM],
        }))
    }

    fn open_output(&self, name: &str) -> Result<Box<dyn OutputPort>, NetError> {
        let (socket, _) = self.bind(name)?;
        let subscribers: Subscribers = Arc::default();
        lock(&self.local)
            .outputs
            .insert(name.to_owned(), Arc::clone(&subscribers));
        Ok(Box::new(UdpOutputPort {
            name: name.to_owned(),
            socket: Some(socket),
            subscribers,
            local: Arc::clone(&self.local),
            buf: vec![0; MAX_DATAGRAM],
        }))
    }

    fn connect(&self, src: &str, dst: &str) -> Result<(), NetError> {
        let dest = self.resolve(dst)?;
        let own = lock(&self.local).outputs.get(src).cloned();
        match own {
            Some(subscribers) => {
                lock(&subscribers).insert(dest);
            }
            None => {
                let source = self.resolve(src)?;
                self.send_control(source, &Datagram::Connect { dest })?;
                let mut local = lock(&self.local);
                if local.addrs.contains_key(dst) && !local.outputs.contains_key(dst) {
                    local
                        .producers
                        .entry(dst.to_owned())
                        .or_default()
                        .insert(source);
                }
            }
        }
        debug!(src, dst, %dest, "udp connection requested");
        Ok(())
    }
}

/// Input port reading data datagrams from its socket.
///
/// Closing it asks every producer it was connected to to stop sending and
/// frees the name for reuse.
pub struct UdpInputPort {
    name: String,
    addr: SocketAddr,
    socket: Option<UdpSocket>,
    local: Shared,
    buf: Vec<u8>,
}

impl InputPort for UdpInputPort {
    fn name(&self) -> &str {
        &self.name
    }

    fn read(&mut self) -> Option<Bottle> {
        let socket = self.socket.as_ref()?;
        let mut newest = None;
        loop {
            let len = match socket.recv_from(&mut self.buf) {
                Ok((len, _)) => len,
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) => {
                    debug!(port = %self.name, error = %e, "udp receive failed");
                    break;
                }
            };
            let Some(bytes) = self.buf.get(..len) else {
                continue;
            };
            match serde_json::from_slice::<Datagram>(bytes) {
                Ok(Datagram::Data { payload, .. }) => {
                    match serde_json::from_value::<Bottle>(payload) {
                        Ok(bottle) => newest = Some(bottle),
                        Err(e) => debug!(port = %self.name, error = %e, "dropping undecodable payload"),
                    }
                }
                Ok(other) => debug!(port = %self.name, datagram = ?other, "ignoring control datagram"),
                Err(e) => debug!(port = %self.name, error = %e, "dropping undecodable datagram"),
            }
        }
        newest
    }

    fn close(&mut self) {
        let Some(socket) = self.socket.take() else {
            return;
        };
        let producers = lock(&self.local).release(&self.name);
        if !producers.is_empty() {
            match serde_json::to_vec(&Datagram::Disconnect { dest: self.addr }) {
                Ok(bytes) => {
                    for producer in producers {
                        if let Err(e) = socket.send_to(&bytes, producer) {
                            warn!(port = %self.name, %producer, error = %e, "udp disconnect failed");
                        }
                    }
                }
                Err(e) => warn!(port = %self.name, error = %e, "failed to encode disconnect"),
            }
        }
        debug!(port = %self.name, "udp input closed");
    }
}

impl Drop for UdpInputPort {
    fn drop(&mut self) {
        self.close();
    }
}

/// Output port sending to every subscribed address.
pub struct UdpOutputPort {
    name: String,
    socket: Option<UdpSocket>,
    subscribers: Subscribers,
    local: Shared,
    buf: Vec<u8>,
}

impl UdpOutputPort {
    fn drain_control(&mut self, socket: &UdpSocket) {
        loop {
            let len = match socket.recv_from(&mut self.buf) {
                Ok((len, _)) => len,
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) => {
                    debug!(port = %self.name, error = %e, "udp control receive failed");
                    break;
                }
            };
            let Some(bytes) = self.buf.get(..len) else {
                continue;
            };
            match serde_json::from_slice::<Datagram>(bytes) {
                Ok(Datagram::Connect { dest }) => {
                    debug!(port = %self.name, %dest, "subscriber added");
                    lock(&self.subscribers).insert(dest);
                }
                Ok(Datagram::Disconnect { dest }) => {
                    debug!(port = %self.name, %dest, "subscriber removed");
                    lock(&self.subscribers).remove(&dest);
                }
                Ok(Datagram::Data { .. }) => {
                    debug!(port = %self.name, "ignoring data sent to an output port");
                }
                Err(e) => debug!(port = %self.name, error = %e, "dropping undecodable datagram"),
            }
        }
    }
}

impl OutputPort for UdpOutputPort {
    fn name(&self) -> &str {
        &self.name
    }

    fn write(&mut self, stamp: &Stamp, contacts: &SkinContactList) -> Result<(), NetError> {
        let Some(socket) = self.socket.take() else {
            return Err(NetError::Closed(self.name.clone()));
        };
        self.drain_control(&socket);
        let result = send_all(&self.name, &socket, &self.subscribers, stamp, contacts);
        self.socket = Some(socket);
        result
    }

    fn close(&mut self) {
        if self.socket.take().is_some() {
            lock(&self.subscribers).clear();
            lock(&self.local).release(&self.name);
            debug!(port = %self.name, "udp output closed");
        }
    }
}

impl Drop for UdpOutputPort {
    fn drop(&mut self) {
        self.close();
    }
}

fn send_all(
    name: &str,
    socket: &UdpSocket,
    subscribers: &Subscribers,
    stamp: &Stamp,
    contacts: &SkinContactList,
) -> Result<(), NetError> {
    let bytes = serde_json::to_vec(&Datagram::from_contacts(stamp, contacts)?)?;
    let targets: Vec<SocketAddr> = lock(subscribers).iter().copied().collect();
    let mut first_err = None;
    for target in targets {
        if let Err(source) = socket.send_to(&bytes, target) {
            warn!(port = name, %target, error = %source, "udp send failed");
            first_err.get_or_insert(NetError::Send {
                name: name.to_owned(),
                source,
            });
        }
    }
    first_err.map_or(Ok(()), Err)
}
