//! Tests for configure, run and close.

use std::time::Duration;

use ppsgui::adapter::{
    EventAdapter, State, GUI_FORCES_SINK, PPS_EVENTS_SOURCE, SKIN_EVENTS_SOURCE,
};
use ppsgui::net::local::LocalNetwork;
use ppsgui::net::Network;

use super::{config, message, record};

#[test]
fn autoconnect_wires_well_known_endpoints() {
    let net = LocalNetwork::new();
    let skin = net.producer(SKIN_EVENTS_SOURCE);
    let pps = net.producer(PPS_EVENTS_SOURCE);
    let mut gui = net.sink(GUI_FORCES_SINK);

    let mut cfg = config("auto", true, true);
    cfg.autoconnect = true;
    let mut adapter = EventAdapter::configure(cfg, &net).expect("configure");

    assert_eq!(skin.send(message(vec![record(1, [0.0; 3], [0.0, 0.0, 1.0], 1.0)])), 1);
    assert_eq!(pps.send(message(vec![record(2, [0.0; 3], [0.0, 0.0, 1.0], 1.0)])), 1);
    assert_eq!(adapter.update().len(), 2);

    let published = gui.drain();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].contacts.len(), 2);
}

#[test]
fn autoconnect_failures_are_not_fatal() {
    let net = LocalNetwork::new();
    let mut cfg = config("lonely", true, true);
    cfg.autoconnect = true;

    let mut adapter = EventAdapter::configure(cfg, &net).expect("configure without peers");
    assert_eq!(adapter.state(), State::Running);
    assert!(adapter.update().is_empty());
}

#[test]
fn disabled_sources_open_no_input_ports() {
    let net = LocalNetwork::new();
    let cfg = config("quiet", false, true);
    let _adapter = EventAdapter::configure(cfg.clone(), &net).expect("configure");

    net.producer("/src:o");
    assert!(net.connect("/src:o", &cfg.skin_events_port()).is_err());
    assert!(net.connect("/src:o", &cfg.pps_events_port()).is_ok());
}

#[test]
fn close_is_idempotent_and_releases_ports() {
    let net = LocalNetwork::new();
    let cfg = config("closing", true, false);
    let producer = net.producer("/src:o");
    let mut sink = net.sink("/gui");
    let mut adapter = EventAdapter::configure(cfg.clone(), &net).expect("configure");
    net.connect("/src:o", &cfg.skin_events_port()).expect("wire input");
    net.connect(&cfg.contacts_port(), "/gui").expect("wire output");

    adapter.close();
    adapter.close();
    assert_eq!(adapter.state(), State::Closed);

    assert_eq!(producer.send(message(vec![record(1, [0.0; 3], [1.0; 3], 1.0)])), 0);
    assert!(adapter.update().is_empty());
    assert!(sink.drain().is_empty());
}

#[test]
fn names_can_be_reused_after_close() {
    let net = LocalNetwork::new();
    let cfg = config("again", true, true);

    let mut first = EventAdapter::configure(cfg.clone(), &net).expect("first configure");
    assert!(EventAdapter::configure(cfg.clone(), &net).is_err());

    first.close();
    let second = EventAdapter::configure(cfg, &net);
    assert!(second.is_ok());
}

#[test]
fn unavailable_network_fails_check() {
    let net = LocalNetwork::unavailable();
    assert!(net.check().is_err());
    assert!(LocalNetwork::new().check().is_ok());
}

#[tokio::test(start_paused = true)]
async fn run_ticks_until_shutdown_then_closes() {
    let net = LocalNetwork::new();
    let cfg = config("runner", true, true);
    let mut sink = net.sink("/gui");
    let mut adapter = EventAdapter::configure(cfg.clone(), &net).expect("configure");
    net.connect(&cfg.contacts_port(), "/gui").expect("wire output");

    adapter.run(tokio::time::sleep(Duration::from_millis(100))).await;

    assert_eq!(adapter.state(), State::Closed);
    let published = sink.drain();
    assert!(published.len() >= 3, "got {} ticks", published.len());
    assert!(published.len() <= 5, "got {} ticks", published.len());
}
