//! Socket utilities.
//!
//! [`MulticastSocket`] builds a UDP socket configured for mDNS: bound to the
//! mDNS port with address reuse, non-blocking, and joined to the 224.0.0.251
//! multicast group.
//!
//! ```rust,ignore
//! use mdns_responder::MulticastSocket;
//!
//! let std_socket = MulticastSocket::new().into_std()?;
//! // for tokio:
//! let socket = tokio::net::UdpSocket::from_std(std_socket)?;
//! ```

use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};

use socket2::{Domain, Protocol, Socket, Type};

use crate::proto::{MDNS_MULTICAST_IPV4, MDNS_PORT};

/// A builder for multicast UDP sockets suitable for mDNS.
#[derive(Debug, Clone, Default)]
pub struct MulticastSocket {
    local_ipv4: Option<Ipv4Addr>,
    local_port: Option<u16>,
    interface: Option<Ipv4Addr>,
    loopback: Option<bool>,
}

impl MulticastSocket {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind to a specific local IPv4 address instead of the platform default.
    pub fn with_local_ipv4(mut self, local_ipv4: Ipv4Addr) -> Self {
        self.local_ipv4 = Some(local_ipv4);
        self
    }

    /// Bind to a port other than 5353.
    pub fn with_local_port(mut self, local_port: u16) -> Self {
        self.local_port = Some(local_port);
        self
    }

    /// Join the multicast group on a specific network interface.
    ///
    /// If not set, the group is joined on all interfaces (`INADDR_ANY`).
    pub fn with_interface(mut self, interface: Ipv4Addr) -> Self {
        self.interface = Some(interface);
        self
    }

    /// Control whether sent multicast datagrams loop back to this host.
    pub fn with_loopback(mut self, loopback: bool) -> Self {
        self.loopback = Some(loopback);
        self
    }

    /// Builds the configured `std::net::UdpSocket`.
    ///
    /// The socket has `SO_REUSEADDR` enabled (and `SO_REUSEPORT` on supported
    /// platforms, so the responder can coexist with other mDNS stacks), is
    /// non-blocking for async compatibility, and has joined the mDNS
    /// multicast group.
    ///
    /// # Errors
    ///
    /// Fails when socket creation, option setup, binding or the multicast
    /// join fails.
    pub fn into_std(self) -> io::Result<UdpSocket> {
        let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;

        socket.set_reuse_address(true)?;

        #[cfg(all(unix, not(target_os = "solaris"), not(target_os = "illumos")))]
        socket.set_reuse_port(true)?;

        socket.set_nonblocking(true)?;

        let local_ip = if let Some(local_ipv4) = self.local_ipv4 {
            IpAddr::V4(local_ipv4)
        } else if cfg!(target_os = "linux") {
            IpAddr::V4(MDNS_MULTICAST_IPV4)
        } else {
            // binding the group address doesn't work on Mac/Win; 0.0.0.0 does
            IpAddr::V4(Ipv4Addr::UNSPECIFIED)
        };

        let local_port = self.local_port.unwrap_or(MDNS_PORT);
        let local_addr = SocketAddr::new(local_ip, local_port);

        socket.bind(&local_addr.into())?;

        if let Some(loopback) = self.loopback {
            socket.set_multicast_loop_v4(loopback)?;
        }

        let iface = self.interface.unwrap_or(Ipv4Addr::UNSPECIFIED);
        socket.join_multicast_v4(&MDNS_MULTICAST_IPV4, &iface)?;

        Ok(socket.into())
    }
}
