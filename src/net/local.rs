//! In-process substrate.
//!
//! Ports live in a shared registry and exchange messages over unbounded
//! `tokio::sync::mpsc` channels, read with `try_recv` so nothing blocks.
//! External endpoints are stood in for by [`Producer`] (feeds input ports)
//! and [`Sink`] (receives from output ports).

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use tracing::debug;

use super::{InputPort, NetError, Network, OutputPort};
use crate::bottle::Bottle;
use crate::contact::{SkinContactList, Stamp};

/// A contact list as delivered to a [`Sink`].
#[derive(Debug, Clone, PartialEq)]
pub struct Published {
    /// Envelope set by the writer.
    pub stamp: Stamp,
    /// Message body.
    pub contacts: SkinContactList,
}

type Subscribers<T> = Arc<Mutex<Vec<mpsc::UnboundedSender<T>>>>;

#[derive(Default)]
struct Registry {
    bottle_sources: HashMap<String, Subscribers<Bottle>>,
    bottle_targets: HashMap<String, mpsc::UnboundedSender<Bottle>>,
    contact_sources: HashMap<String, Subscribers<Published>>,
    contact_targets: HashMap<String, mpsc::UnboundedSender<Published>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Shared in-process network. Clones refer to the same registry.
#[derive(Clone)]
pub struct LocalNetwork {
    registry: Arc<Mutex<Registry>>,
    available: bool,
}

impl Default for LocalNetwork {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalNetwork {
    /// Create an empty, reachable network.
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry::default())),
            available: true,
        }
    }

    /// Create a network whose [`Network::check`] always fails.
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new()
        }
    }

    /// Register an external event source under `name`.
    pub fn producer(&self, name: &str) -> Producer {
        let subscribers: Subscribers<Bottle> = Arc::default();
        lock(&self.registry)
            .bottle_sources
            .insert(name.to_owned(), Arc::clone(&subscribers));
        Producer { subscribers }
    }

    /// Register an external contact consumer under `name`.
    pub fn sink(&self, name: &str) -> Sink {
        let (tx, rx) = mpsc::unbounded_channel();
        lock(&self.registry)
            .contact_targets
            .insert(name.to_owned(), tx);
        Sink { rx }
    }
}

impl Network for LocalNetwork {
    fn check(&self) -> Result<(), NetError> {
        if self.available {
            return Ok(());
        }
        Err(NetError::Unavailable {
            host: "local".to_owned(),
            source: std::io::Error::new(std::io::ErrorKind::NotConnected, "network disabled"),
        })
    }

    fn open_input(&self, name: &str) -> Result<Box<dyn InputPort>, NetError> {
        let mut registry = lock(&self.registry);
        if registry
            .bottle_targets
            .get(name)
            .is_some_and(|tx| !tx.is_closed())
        {
            return Err(NetError::AlreadyOpen(name.to_owned()));
        }
        let (tx, rx) = mpsc::unbounded_channel();
        registry.bottle_targets.insert(name.to_owned(), tx);
        debug!(port = name, "local input opened");
        Ok(Box::new(LocalInputPort {
            name: name.to_owned(),
            rx: Some(rx),
        }))
    }

    fn open_output(&self, name: &str) -> Result<Box<dyn OutputPort>, NetError> {
        let mut registry = lock(&self.registry);
        if registry.contact_sources.contains_key(name) {
            return Err(NetError::AlreadyOpen(name.to_owned()));
        }
        let subscribers: Subscribers<Published> = Arc::default();
        registry
            .contact_sources
            .insert(name.to_owned(), Arc::clone(&subscribers));
        debug!(port = name, "local output opened");
        Ok(Box::new(LocalOutputPort {
            name: name.to_owned(),
            subscribers,
            registry: Arc::clone(&self.registry),
            closed: false,
        }))
    }

    fn connect(&self, src: &str, dst: &str) -> Result<(), NetError> {
        let registry = lock(&self.registry);
        if let Some(subs) = registry.bottle_sources.get(src) {
            let tx = registry
                .bottle_targets
                .get(dst)
                .ok_or_else(|| NetError::UnknownPort(dst.to_owned()))?;
            lock(subs).push(tx.clone());
            return Ok(());
        }
        if let Some(subs) = registry.contact_sources.get(src) {
            let tx = registry
                .contact_targets
                .get(dst)
                .ok_or_else(|| NetError::UnknownPort(dst.to_owned()))?;
            lock(subs).push(tx.clone());
            return Ok(());
        }
        Err(NetError::UnknownPort(src.to_owned()))
    }
}

/// Input port backed by an in-process channel.
pub struct LocalInputPort {
    name: String,
    rx: Option<mpsc::UnboundedReceiver<Bottle>>,
}

impl InputPort for LocalInputPort {
    fn name(&self) -> &str {
        &self.name
    }

    fn read(&mut self) -> Option<Bottle> {
        let rx = self.rx.as_mut()?;
        let mut newest = None;
        while let Ok(bottle) = rx.try_recv() {
            newest = Some(bottle);
        }
        newest
    }

    fn close(&mut self) {
        if let Some(mut rx) = self.rx.take() {
            rx.close();
            debug!(port = %self.name, "local input closed");
        }
    }
}

/// Output port fanning out to connected [`Sink`]s.
pub struct LocalOutputPort {
    name: String,
    subscribers: Subscribers<Published>,
    registry: Arc<Mutex<Registry>>,
    closed: bool,
}

impl OutputPort for LocalOutputPort {
    fn name(&self) -> &str {
        &self.name
    }

    fn write(&mut self, stamp: &Stamp, contacts: &SkinContactList) -> Result<(), NetError> {
        if self.closed {
            return Err(NetError::Closed(self.name.clone()));
        }
        let mut subs = lock(&self.subscribers);
        subs.retain(|tx| {
            tx.send(Published {
                stamp: *stamp,
                contacts: contacts.clone(),
            })
            .is_ok()
        });
        Ok(())
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        lock(&self.subscribers).clear();
        lock(&self.registry).contact_sources.remove(&self.name);
        debug!(port = %self.name, "local output closed");
    }
}

/// Stand-in for an external event source such as a skin events aggregator.
pub struct Producer {
    subscribers: Subscribers<Bottle>,
}

impl Producer {
    /// Deliver one message to every connected input. Returns how many got it.
    pub fn send(&self, bottle: Bottle) -> usize {
        let mut subs = lock(&self.subscribers);
        subs.retain(|tx| tx.send(bottle.clone()).is_ok());
        subs.len()
    }
}

/// Stand-in for an external contact consumer such as a force visualizer.
pub struct Sink {
    rx: mpsc::UnboundedReceiver<Published>,
}

impl Sink {
    /// Next delivered message, if any.
    pub fn try_recv(&mut self) -> Option<Published> {
        self.rx.try_recv().ok()
    }

    /// Drain every delivered message.
    pub fn drain(&mut self) -> Vec<Published> {
        let mut out = Vec::new();
        while let Some(msg) = self.try_recv() {
            out.push(msg);
        }
        out
    }
}
