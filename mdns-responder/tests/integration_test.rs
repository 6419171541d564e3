//! Integration tests for mdns-responder
//!
//! These tests drive the sans-I/O responder shell end to end, without actual
//! network I/O: interfaces are reported by hand, query datagrams are crafted
//! with the message builder, and the queued reply datagrams are parsed back.

use bytes::BytesMut;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Instant;

use mdns_responder::message::builder::MessageBuilder;
use mdns_responder::message::name::Name;
use mdns_responder::message::reader::MessageReader;
use mdns_responder::message::DnsType;
use mdns_responder::{
    LinkMtu, MDNS_DEST_ADDR, Responder, ResponderConfig, TaggedBytesMut, TransportContext,
    TransportProtocol,
};

const ETHERNET_MTU: LinkMtu = LinkMtu {
    mtu: 1500,
    ip_header_size: 20,
    udp_header_size: 8,
};

fn test_responder() -> Responder {
    let config = ResponderConfig::new().with_host_name("ServiceHost");
    let mut responder = Responder::new(config);
    responder
        .register_service("Service Instance 1", "_service1._udp", 1234, b"")
        .unwrap();
    responder
        .handle_interface_up(
            0,
            &[IpAddr::V4(Ipv4Addr::new(192, 168, 23, 45))],
            ETHERNET_MTU,
            Instant::now(),
        )
        .unwrap();
    responder
}

fn drain(responder: &mut Responder) -> Vec<(u32, BytesMut)> {
    let mut datagrams = Vec::new();
    while let Some(out) = responder.poll_write() {
        assert_eq!(out.message.transport.peer_addr, MDNS_DEST_ADDR);
        datagrams.push((out.interface_id, out.message.message));
    }
    datagrams
}

fn tag(data: &[u8]) -> TaggedBytesMut {
    TaggedBytesMut {
        now: Instant::now(),
        transport: TransportContext {
            local_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 5353),
            peer_addr: MDNS_DEST_ADDR,
            transport_protocol: TransportProtocol::UDP,
        },
        message: BytesMut::from(data),
    }
}

fn build_query(qname: &str, typ: DnsType) -> Vec<u8> {
    let name = Name::from_dotted(qname).unwrap();
    let mut buf = vec![0u8; 512];
    let mut builder = MessageBuilder::new(&mut buf, 0, 0);
    assert!(builder.add_question(name.as_bytes(), typ as u16, false));
    let size = builder.size();
    buf.truncate(size);
    buf
}

#[test]
fn test_interface_up_announces_services() {
    let mut responder = test_responder();
    let datagrams = drain(&mut responder);
    assert_eq!(datagrams.len(), 1);

    let (interface_id, message) = &datagrams[0];
    assert_eq!(*interface_id, 0);
    let mut reader = MessageReader::new(message);
    assert!(reader.is_valid());
    assert_eq!(reader.flags(), 0x8400);
    // the service PTR and the enumeration PTR
    assert_eq!(reader.answer_rr_count(), 2);
    for i in 0..2 {
        let entry = reader.entry(i).unwrap();
        assert_eq!(entry.rr_type(), DnsType::Ptr as u16);
        assert_eq!(entry.rr_ttl(), 4500);
    }
}

#[test]
fn test_query_gets_reply() {
    let mut responder = test_responder();
    drain(&mut responder); // discard announcements

    let query = build_query("_service1._udp.local", DnsType::Ptr);
    responder.handle_read(0, tag(&query)).unwrap();

    let datagrams = drain(&mut responder);
    assert_eq!(datagrams.len(), 1);

    let mut reader = MessageReader::new(&datagrams[0].1);
    assert_eq!(reader.flags(), 0x8400);
    assert_eq!(reader.question_count(), 0);
    assert_eq!(reader.answer_rr_count(), 1);
    // SRV, TXT and NSEC of the instance plus A and NSEC of the host
    assert_eq!(reader.additional_rr_count(), 5);

    let answer = reader.entry(0).unwrap();
    assert_eq!(answer.rr_type(), DnsType::Ptr as u16);
    let mut owner = Name::new();
    owner
        .append_compressed_name(answer.data(), answer.name_pos())
        .unwrap();
    assert_eq!(owner.to_string(), "_service1._udp.local.");
}

#[test]
fn test_host_address_query() {
    let mut responder = test_responder();
    drain(&mut responder);

    let query = build_query("ServiceHost.local", DnsType::A);
    responder.handle_read(0, tag(&query)).unwrap();

    let datagrams = drain(&mut responder);
    assert_eq!(datagrams.len(), 1);
    let mut reader = MessageReader::new(&datagrams[0].1);
    assert_eq!(reader.answer_rr_count(), 1);
    let answer = reader.entry(0).unwrap();
    assert_eq!(answer.rr_type(), DnsType::A as u16);
    assert!(answer.rr_cache_flush());
    let rdata = &answer.data()[answer.rdata_pos()..answer.rdata_pos() + answer.rdata_len()];
    assert_eq!(rdata, &[192, 168, 23, 45]);
}

#[test]
fn test_malformed_datagram_keeps_shell_operational() {
    let mut responder = test_responder();
    drain(&mut responder);

    // a 7-byte buffer is not even a header
    responder.handle_read(0, tag(&[0u8; 7])).unwrap();
    assert!(responder.poll_write().is_none());

    // the shell keeps answering afterwards
    let query = build_query("_service1._udp.local", DnsType::Ptr);
    responder.handle_read(0, tag(&query)).unwrap();
    assert_eq!(drain(&mut responder).len(), 1);
}

#[test]
fn test_unknown_interface_is_an_error() {
    let mut responder = test_responder();
    drain(&mut responder);

    let query = build_query("_service1._udp.local", DnsType::Ptr);
    assert!(responder.handle_read(7, tag(&query)).is_err());
}

#[test]
fn test_interface_down_drops_state() {
    let mut responder = test_responder();
    drain(&mut responder);

    responder.handle_interface_down(0);
    let query = build_query("_service1._udp.local", DnsType::Ptr);
    assert!(responder.handle_read(0, tag(&query)).is_err());
}

#[test]
fn test_register_service_rerenders_databases() {
    let mut responder = test_responder();
    drain(&mut responder);

    // not published yet
    let query = build_query("_service2._udp.local", DnsType::Ptr);
    responder.handle_read(0, tag(&query)).unwrap();
    assert!(drain(&mut responder).is_empty());

    responder
        .register_service("Service Instance 2", "_service2._udp", 5678, b"")
        .unwrap();
    responder.handle_read(0, tag(&query)).unwrap();
    let datagrams = drain(&mut responder);
    assert_eq!(datagrams.len(), 1);
    let mut reader = MessageReader::new(&datagrams[0].1);
    assert_eq!(reader.answer_rr_count(), 1);
}

#[test]
fn test_announce_covers_all_interfaces() {
    let mut responder = test_responder();
    responder
        .handle_interface_up(
            1,
            &[IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2))],
            ETHERNET_MTU,
            Instant::now(),
        )
        .unwrap();
    drain(&mut responder);

    responder.announce(Instant::now());
    let datagrams = drain(&mut responder);
    let mut interfaces: Vec<u32> = datagrams.iter().map(|(id, _)| *id).collect();
    interfaces.sort_unstable();
    assert_eq!(interfaces, vec![0, 1]);
}

#[test]
fn test_close_sends_goodbyes() {
    let mut responder = test_responder();
    drain(&mut responder);

    responder.close().unwrap();
    let datagrams = drain(&mut responder);
    assert_eq!(datagrams.len(), 1);

    let mut reader = MessageReader::new(&datagrams[0].1);
    assert_eq!(reader.flags(), 0x8400);
    assert_eq!(reader.answer_rr_count(), 2);
    for i in 0..2 {
        let entry = reader.entry(i).unwrap();
        assert_eq!(entry.rr_ttl(), 0);
    }

    // everything fails after close
    let query = build_query("_service1._udp.local", DnsType::Ptr);
    assert!(responder.handle_read(0, tag(&query)).is_err());
    assert!(responder.register_service("x", "_x._udp", 1, b"").is_err());
}

#[test]
fn test_duplicate_interface_rejected() {
    let mut responder = test_responder();
    let result = responder.handle_interface_up(
        0,
        &[IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1))],
        ETHERNET_MTU,
        Instant::now(),
    );
    assert!(result.is_err());
}

#[test]
fn test_tiny_mtu_rejected() {
    let config = ResponderConfig::new().with_host_name("h");
    let mut responder = Responder::new(config);
    let result = responder.handle_interface_up(
        0,
        &[IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1))],
        LinkMtu {
            mtu: 20,
            ip_header_size: 20,
            udp_header_size: 8,
        },
        Instant::now(),
    );
    assert!(result.is_err());
}
