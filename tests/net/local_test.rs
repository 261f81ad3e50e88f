//! Tests for the in-process substrate.

use ppsgui::bottle::{Bottle, Value};
use ppsgui::contact::Stamp;
use ppsgui::net::local::LocalNetwork;
use ppsgui::net::{NetError, Network};

fn bottle(tag: i64) -> Bottle {
    vec![Value::Int(tag)].into()
}

#[test]
fn read_is_non_blocking_and_keeps_newest() {
    let net = LocalNetwork::new();
    let producer = net.producer("/p:o");
    let mut input = net.open_input("/in:i").expect("open input");
    net.connect("/p:o", "/in:i").expect("connect");

    assert!(input.read().is_none());
    producer.send(bottle(1));
    producer.send(bottle(2));
    assert_eq!(input.read(), Some(bottle(2)));
    assert!(input.read().is_none());
}

#[test]
fn one_producer_fans_out_to_many_inputs() {
    let net = LocalNetwork::new();
    let producer = net.producer("/p:o");
    let mut a = net.open_input("/a:i").expect("open a");
    let mut b = net.open_input("/b:i").expect("open b");
    net.connect("/p:o", "/a:i").expect("connect a");
    net.connect("/p:o", "/b:i").expect("connect b");

    assert_eq!(producer.send(bottle(7)), 2);
    assert_eq!(a.read(), Some(bottle(7)));
    assert_eq!(b.read(), Some(bottle(7)));
}

#[test]
fn connect_rejects_unknown_names() {
    let net = LocalNetwork::new();
    let _input = net.open_input("/in:i").expect("open input");
    assert!(matches!(
        net.connect("/missing:o", "/in:i"),
        Err(NetError::UnknownPort(name)) if name == "/missing:o"
    ));
    net.producer("/p:o");
    assert!(matches!(
        net.connect("/p:o", "/missing:i"),
        Err(NetError::UnknownPort(name)) if name == "/missing:i"
    ));
}

#[test]
fn output_write_after_close_fails() {
    let net = LocalNetwork::new();
    let mut out = net.open_output("/out:o").expect("open output");
    let mut sink = net.sink("/s");
    net.connect("/out:o", "/s").expect("connect");

    out.write(&Stamp::default(), &Vec::new()).expect("write");
    assert_eq!(sink.drain().len(), 1);

    out.close();
    out.close();
    assert!(matches!(
        out.write(&Stamp::default(), &Vec::new()),
        Err(NetError::Closed(_))
    ));
    assert!(net.connect("/out:o", "/s").is_err());
}

#[test]
fn closed_input_reads_nothing() {
    let net = LocalNetwork::new();
    let producer = net.producer("/p:o");
    let mut input = net.open_input("/in:i").expect("open input");
    net.connect("/p:o", "/in:i").expect("connect");

    producer.send(bottle(1));
    input.close();
    assert!(input.read().is_none());
    assert_eq!(input.name(), "/in:i");
}
