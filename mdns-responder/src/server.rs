//! Sans-I/O responder shell.
//!
//! [`Responder`] wires the network collaborator's callbacks to the query
//! processor and the emitter. It performs no I/O itself: the caller reports
//! interfaces coming and going, feeds received datagrams to
//! [`handle_read`](Responder::handle_read), and sends everything drained from
//! [`poll_write`](Responder::poll_write) to the multicast group on the
//! matching interface.
//!
//! All calls must come from one thread (or an equivalent serial executor);
//! the shell holds no locks.

use std::collections::{HashMap, VecDeque};
use std::net::IpAddr;
use std::time::Instant;

use bytes::BytesMut;
use shared::error::{Error, Result};
use shared::{TaggedBytesMut, TransportContext, TransportProtocol};

use crate::config::ResponderConfig;
use crate::db::Database;
use crate::message::HEADER_LEN;
use crate::proto::emitter::Emitter;
use crate::proto::{
    MDNS_DEST_ADDR, MDNS_MSG_SIZE_MAX, QueryProcessor, announcement_records,
};
use crate::registry::{Host, ServiceCollection, ServiceInstance, interface_database};

/// Link MTU of an interface, with the IP and UDP header sizes the responder
/// has to budget for.
#[derive(Copy, Clone, Debug)]
pub struct LinkMtu {
    pub mtu: usize,
    pub ip_header_size: usize,
    pub udp_header_size: usize,
}

impl LinkMtu {
    /// The usable (ideal, maximum) payload sizes for this link.
    fn payload_sizes(&self) -> (usize, usize) {
        let msg_mtu = MDNS_MSG_SIZE_MAX.min(self.mtu);
        let header_size = self.ip_header_size + self.udp_header_size;
        (msg_mtu - header_size, MDNS_MSG_SIZE_MAX - header_size)
    }
}

/// A datagram to send to the multicast group on one interface.
#[derive(Debug)]
pub struct OutboundDatagram {
    pub interface_id: u32,
    pub message: TaggedBytesMut,
}

struct Interface {
    addresses: Vec<IpAddr>,
    mtu: LinkMtu,
    database: Database,
}

/// The responder: per-interface record databases plus the processing glue.
///
/// ```rust
/// use std::net::{IpAddr, Ipv4Addr};
/// use std::time::Instant;
/// use mdns_responder::{LinkMtu, Responder, ResponderConfig};
///
/// let mut responder = Responder::new(ResponderConfig::new().with_host_name("myhost"));
/// responder
///     .register_service("My Printer", "_ipp._tcp", 631, b"")
///     .unwrap();
/// responder
///     .handle_interface_up(
///         0,
///         &[IpAddr::V4(Ipv4Addr::new(192, 168, 1, 10))],
///         LinkMtu { mtu: 1500, ip_header_size: 20, udp_header_size: 8 },
///         Instant::now(),
///     )
///     .unwrap();
///
/// // the interface's records are announced right away
/// assert!(responder.poll_write().is_some());
/// ```
pub struct Responder {
    config: ResponderConfig,
    service_instances: Vec<ServiceInstance>,
    interfaces: HashMap<u32, Interface>,
    write_outs: VecDeque<OutboundDatagram>,
    closed: bool,
}

impl Responder {
    pub fn new(config: ResponderConfig) -> Self {
        Responder {
            config,
            service_instances: Vec::new(),
            interfaces: HashMap::new(),
            write_outs: VecDeque::new(),
            closed: false,
        }
    }

    /// Registers a service instance and re-renders every interface database.
    ///
    /// The instance is published as `<instance_name>.<service_name>.<domain>`
    /// with an SRV record carrying `port` and the given pre-encoded TXT
    /// payload.
    pub fn register_service(
        &mut self,
        instance_name: &str,
        service_name: &str,
        port: u16,
        txt_record: &[u8],
    ) -> Result<()> {
        if self.closed {
            return Err(Error::ErrResponderClosed);
        }
        let instance = ServiceInstance::new(
            &self.config.host_name,
            instance_name,
            service_name,
            &self.config.domain_name,
            port,
            txt_record,
        )?;
        self.service_instances.push(instance);

        // re-render the per-interface views
        let ids: Vec<u32> = self.interfaces.keys().copied().collect();
        for id in ids {
            let addresses = self.interfaces[&id].addresses.clone();
            let database = self.render_database(&addresses)?;
            if let Some(interface) = self.interfaces.get_mut(&id) {
                interface.database = database;
            }
        }
        Ok(())
    }

    /// A new interface appeared: build its database view and announce the
    /// published services on it.
    pub fn handle_interface_up(
        &mut self,
        interface_id: u32,
        addresses: &[IpAddr],
        mtu: LinkMtu,
        now: Instant,
    ) -> Result<()> {
        if self.closed {
            return Err(Error::ErrResponderClosed);
        }
        if self.interfaces.contains_key(&interface_id) {
            return Err(Error::ErrInterfaceExists);
        }
        // at least a DNS header must fit the usable payload
        if mtu.ip_header_size + mtu.udp_header_size + HEADER_LEN > MDNS_MSG_SIZE_MAX.min(mtu.mtu) {
            return Err(Error::ErrMtuTooSmall);
        }

        let database = self.render_database(addresses)?;
        self.interfaces.insert(
            interface_id,
            Interface {
                addresses: addresses.to_vec(),
                mtu,
                database,
            },
        );
        log::debug!("interface {interface_id} up with {} addresses", addresses.len());

        self.announce_interface(interface_id, false, now);
        Ok(())
    }

    /// An interface disappeared; its state is dropped.
    pub fn handle_interface_down(&mut self, interface_id: u32) {
        self.interfaces.remove(&interface_id);
        log::debug!("interface {interface_id} down");
    }

    /// Processes one received datagram and queues every reply datagram it
    /// produces.
    ///
    /// Malformed input is not an error: it yields no replies.
    pub fn handle_read(&mut self, interface_id: u32, msg: TaggedBytesMut) -> Result<()> {
        if self.closed {
            return Err(Error::ErrResponderClosed);
        }
        let interface = self
            .interfaces
            .get(&interface_id)
            .ok_or(Error::ErrUnknownInterface)?;
        let (ideal_size, max_size) = interface.mtu.payload_sizes();

        let mut replies = Vec::new();
        let mut proc = QueryProcessor::new(&msg.message, &interface.database);
        let mut out = [0u8; MDNS_MSG_SIZE_MAX];
        loop {
            let out_size = proc.run(&mut out, ideal_size, max_size);
            if out_size == 0 {
                break;
            }
            replies.push(BytesMut::from(&out[..out_size]));
        }

        for reply in replies {
            log::trace!(
                "queuing {} byte reply on interface {interface_id}",
                reply.len()
            );
            self.write_outs.push_back(OutboundDatagram {
                interface_id,
                message: TaggedBytesMut {
                    now: msg.now,
                    transport: TransportContext {
                        local_addr: msg.transport.local_addr,
                        peer_addr: MDNS_DEST_ADDR,
                        transport_protocol: TransportProtocol::UDP,
                    },
                    message: reply,
                },
            });
        }
        Ok(())
    }

    /// Queues unsolicited announcements of all published services on every
    /// live interface.
    pub fn announce(&mut self, now: Instant) {
        let ids: Vec<u32> = self.interfaces.keys().copied().collect();
        for id in ids {
            self.announce_interface(id, false, now);
        }
    }

    /// The next datagram to send, if any.
    pub fn poll_write(&mut self) -> Option<OutboundDatagram> {
        self.write_outs.pop_front()
    }

    /// Shuts the responder down: goodbye announcements (TTL 0) are queued for
    /// every live interface and all further calls fail.
    ///
    /// Drain [`poll_write`](Responder::poll_write) afterwards to get the
    /// goodbyes on the wire.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        let ids: Vec<u32> = self.interfaces.keys().copied().collect();
        for id in ids {
            self.announce_interface(id, true, Instant::now());
        }
        self.interfaces.clear();
        self.closed = true;
        Ok(())
    }

    fn render_database(&self, addresses: &[IpAddr]) -> Result<Database> {
        let host = Host::new(
            &self.config.host_name,
            &self.config.domain_name,
            addresses.to_vec(),
        )?;
        let services = ServiceCollection::new(
            &self.config.domain_name,
            self.service_instances.clone(),
        );
        interface_database(&host, &services)
    }

    fn announce_interface(&mut self, interface_id: u32, tear_down: bool, now: Instant) {
        let Some(interface) = self.interfaces.get(&interface_id) else {
            return;
        };
        let (ideal_size, max_size) = interface.mtu.payload_sizes();

        let records = announcement_records(&interface.database);
        if records.is_empty() {
            return;
        }

        let mut datagrams = Vec::new();
        let mut emitter = Emitter::new(records.len(), 0, tear_down);
        let mut out = [0u8; MDNS_MSG_SIZE_MAX];
        loop {
            let out_size = emitter.run(&records, &mut out, ideal_size, max_size);
            if out_size == 0 {
                break;
            }
            datagrams.push(BytesMut::from(&out[..out_size]));
        }

        for datagram in datagrams {
            log::trace!(
                "queuing {} byte {} on interface {interface_id}",
                datagram.len(),
                if tear_down { "goodbye" } else { "announcement" }
            );
            self.write_outs.push_back(OutboundDatagram {
                interface_id,
                message: TaggedBytesMut {
                    now,
                    transport: TransportContext {
                        peer_addr: MDNS_DEST_ADDR,
                        ..Default::default()
                    },
                    message: datagram,
                },
            });
        }
    }
}
