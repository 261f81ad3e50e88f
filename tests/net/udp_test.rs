//! Tests for the UDP substrate over loopback.

use std::collections::HashMap;
use std::net::{SocketAddr, UdpSocket};
use std::thread::sleep;
use std::time::Duration;

use ppsgui::adapter::{EventAdapter, GUI_FORCES_SINK, SKIN_EVENTS_SOURCE};
use ppsgui::bottle::{Bottle, Value};
use ppsgui::config::AdapterConfig;
use ppsgui::contact::{SkinContactList, Stamp};
use ppsgui::net::udp::UdpNetwork;
use ppsgui::net::{Datagram, Network};

const SETTLE: Duration = Duration::from_millis(50);

fn peer() -> (UdpSocket, SocketAddr) {
    let socket = UdpSocket::bind("127.0.0.1:0").expect("bind peer");
    socket
        .set_read_timeout(Some(Duration::from_secs(2)))
        .expect("set timeout");
    let addr = socket.local_addr().expect("peer addr");
    (socket, addr)
}

fn send(socket: &UdpSocket, to: SocketAddr, datagram: &Datagram) {
    let bytes = serde_json::to_vec(datagram).expect("encode datagram");
    socket.send_to(&bytes, to).expect("send datagram");
}

fn recv(socket: &UdpSocket) -> Datagram {
    let mut buf = vec![0; 65_536];
    let (len, _) = socket.recv_from(&mut buf).expect("receive datagram");
    serde_json::from_slice(&buf[..len]).expect("decode datagram")
}

fn record(part: i64, activation: f64) -> Value {
    let mut b = Bottle::new();
    b.push(part);
    for v in [0.1, 0.2, 0.3, 0.0, 0.0, 1.0] {
        b.push(v);
    }
    for _ in 7..13 {
        b.push(0.0);
    }
    b.push(activation);
    Value::List(b)
}

#[test]
fn adapter_round_trip_over_loopback() {
    let (gui, gui_addr) = peer();
    let (producer, _) = peer();
    let table = HashMap::from([("/viz/forces".to_owned(), gui_addr.to_string())]);
    let net = UdpNetwork::new("127.0.0.1", table);
    net.check().expect("loopback available");

    let cfg = AdapterConfig {
        name: "udp".to_owned(),
        pps: false,
        ..AdapterConfig::default()
    };
    let mut adapter = EventAdapter::configure(cfg.clone(), &net).expect("configure");
    net.connect(&cfg.contacts_port(), "/viz/forces")
        .expect("connect output");

    let input_addr = net.resolve(&cfg.skin_events_port()).expect("input bound");
    let msg: Bottle = vec![record(3, 0.5)].into();
    send(&producer, input_addr, &Datagram::from_bottle(&msg).expect("encode"));
    sleep(SETTLE);

    assert_eq!(adapter.update().len(), 1);

    match recv(&gui) {
        Datagram::Data { envelope, payload } => {
            assert_eq!(envelope.map(|s| s.count), Some(1));
            let contacts: SkinContactList = serde_json::from_value(payload).expect("contacts");
            assert_eq!(contacts.len(), 1);
            assert_eq!(contacts[0].force, [0.0, 0.0, -25.0]);
            assert_eq!(contacts[0].link_num, 2);
        }
        other => panic!("expected data, got {other:?}"),
    }
}

#[test]
fn input_drops_undecodable_datagrams() {
    let (producer, _) = peer();
    let net = UdpNetwork::new("127.0.0.1", HashMap::new());
    let mut input = net.open_input("/in:i").expect("open input");
    let addr = net.resolve("/in:i").expect("bound");

    producer.send_to(b"not json", addr).expect("send garbage");
    send(
        &producer,
        addr,
        &Datagram::Data {
            envelope: None,
            payload: serde_json::json!({"not": "a list"}),
        },
    );
    sleep(SETTLE);
    assert!(input.read().is_none());

    let good: Bottle = vec![Value::Int(9)].into();
    send(&producer, addr, &Datagram::from_bottle(&good).expect("encode"));
    sleep(SETTLE);
    assert_eq!(input.read(), Some(good));
}

#[test]
fn remote_connect_sends_control_datagram_to_producer() {
    let (source, source_addr) = peer();
    let table = HashMap::from([(SKIN_EVENTS_SOURCE.to_owned(), source_addr.to_string())]);
    let net = UdpNetwork::new("127.0.0.1", table);
    let _input = net.open_input("/me/skin:i").expect("open input");
    let input_addr = net.resolve("/me/skin:i").expect("bound");

    net.connect(SKIN_EVENTS_SOURCE, "/me/skin:i").expect("connect");

    assert_eq!(recv(&source), Datagram::Connect { dest: input_addr });
}

#[test]
fn adapter_close_disconnects_from_producers() {
    let (source, source_addr) = peer();
    let (_gui, gui_addr) = peer();
    let table = HashMap::from([
        (SKIN_EVENTS_SOURCE.to_owned(), source_addr.to_string()),
        (GUI_FORCES_SINK.to_owned(), gui_addr.to_string()),
    ]);
    let net = UdpNetwork::new("127.0.0.1", table);
    let cfg = AdapterConfig {
        name: "bye".to_owned(),
        autoconnect: true,
        pps: false,
        ..AdapterConfig::default()
    };

    let mut adapter = EventAdapter::configure(cfg.clone(), &net).expect("configure");
    let input_addr = net.resolve(&cfg.skin_events_port()).expect("input bound");
    assert_eq!(recv(&source), Datagram::Connect { dest: input_addr });

    adapter.close();
    assert_eq!(recv(&source), Datagram::Disconnect { dest: input_addr });
}

#[test]
fn adapter_can_be_configured_again_after_close() {
    let net = UdpNetwork::new("127.0.0.1", HashMap::new());
    let cfg = AdapterConfig {
        name: "again".to_owned(),
        ..AdapterConfig::default()
    };

    let mut first = EventAdapter::configure(cfg.clone(), &net).expect("first configure");
    first.close();
    assert!(net.resolve(&cfg.contacts_port()).is_err());

    let second = EventAdapter::configure(cfg.clone(), &net).expect("second configure");
    assert!(net.resolve(&cfg.skin_events_port()).is_ok());
    drop(second);
    assert!(net.resolve(&cfg.skin_events_port()).is_err());
}

#[test]
fn output_honours_subscription_requests() {
    let (subscriber, sub_addr) = peer();
    let net = UdpNetwork::new("127.0.0.1", HashMap::new());
    let mut out = net.open_output("/out:o").expect("open output");
    let out_addr = net.resolve("/out:o").expect("bound");

    send(&subscriber, out_addr, &Datagram::Connect { dest: sub_addr });
    sleep(SETTLE);

    let stamp = Stamp { count: 7, time: 1.5 };
    out.write(&stamp, &Vec::new()).expect("write");
    match recv(&subscriber) {
        Datagram::Data { envelope, payload } => {
            assert_eq!(envelope, Some(stamp));
            assert_eq!(payload, serde_json::json!([]));
        }
        other => panic!("expected data, got {other:?}"),
    }

    out.close();
    assert!(out.write(&stamp, &Vec::new()).is_err());
}

#[test]
fn unreachable_host_fails_check() {
    let net = UdpNetwork::new("not-a-host.invalid", HashMap::new());
    assert!(net.check().is_err());
}
