//! # mdns-responder
//!
//! A sans-I/O mDNS / DNS-SD responder for Rust.
//!
//! The responder publishes a host record and a set of service instances on
//! the mDNS multicast group (224.0.0.251:5353) and answers queries from peers
//! following the DNS-SD conventions: service enumeration, instance
//! resolution, known-answer suppression, additional-record generation and
//! NSEC negative answers.
//!
//! ## What is mDNS / DNS-SD?
//!
//! Multicast DNS lets devices on a local network resolve names and discover
//! each other without a central DNS server. DNS-SD layers service discovery
//! on top: a service instance is published as a PTR record pointing at an
//! instance name that owns SRV and TXT records, which in turn point at the
//! host's address records. It's the protocol behind Bonjour and Avahi.
//!
//! ## Sans-I/O Design
//!
//! The crate performs no I/O itself. The caller is responsible for:
//!
//! 1. Opening a multicast socket (see [`MulticastSocket`]) and watching
//!    interfaces come and go.
//! 2. Reporting interfaces via [`Responder::handle_interface_up`] /
//!    [`Responder::handle_interface_down`].
//! 3. Feeding received datagrams to [`Responder::handle_read`].
//! 4. Sending every datagram drained from [`Responder::poll_write`] to the
//!    multicast group.
//!
//! This keeps the protocol engine runtime-agnostic (tokio, async-std, smol or
//! blocking I/O) and fully testable without a network.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::net::{IpAddr, Ipv4Addr};
//! use std::time::Instant;
//! use mdns_responder::{LinkMtu, Responder, ResponderConfig};
//!
//! let config = ResponderConfig::new().with_host_name("kitchen-printer");
//! let mut responder = Responder::new(config);
//!
//! // publish a service instance
//! responder
//!     .register_service("Kitchen Printer", "_ipp._tcp", 631, b"")
//!     .unwrap();
//!
//! // a link appeared
//! responder
//!     .handle_interface_up(
//!         0,
//!         &[IpAddr::V4(Ipv4Addr::new(192, 168, 1, 10))],
//!         LinkMtu { mtu: 1500, ip_header_size: 20, udp_header_size: 8 },
//!         Instant::now(),
//!     )
//!     .unwrap();
//!
//! // drain the unsolicited announcements and send them to 224.0.0.251:5353
//! while let Some(datagram) = responder.poll_write() {
//!     assert_eq!(datagram.message.transport.peer_addr.to_string(), "224.0.0.251:5353");
//! }
//! ```
//!
//! ## Protocol Details
//!
//! - Replies and announcements always go to the multicast group; the
//!   unicast-response (QU) bit is parsed but not honored.
//! - Names are accepted compressed on input (backward pointers only) and
//!   always emitted uncompressed.
//! - Reply datagrams are filled up to the link MTU and never exceed 9000
//!   bytes including IP and UDP headers; large answer sets are fragmented
//!   across datagrams.
//! - Shutdown emits goodbye announcements (TTL 0).

#![warn(rust_2018_idioms)]
#![allow(dead_code)]

pub mod config;
pub mod db;
pub mod dump;
pub mod message;
pub mod proto;
pub mod registry;
pub mod server;
pub mod socket;

pub use config::ResponderConfig;
pub use db::{Database, Domain, Record, RecordData};
pub use proto::{
    Emitter, MDNS_DEST_ADDR, MDNS_MSG_SIZE_MAX, MDNS_MULTICAST_IPV4, MDNS_PORT, QueryProcessor,
};
pub use server::{LinkMtu, OutboundDatagram, Responder};
pub use socket::MulticastSocket;

// Re-export the transport tagging types for convenience
pub use shared::{TaggedBytesMut, TransportContext, TransportMessage, TransportProtocol};
