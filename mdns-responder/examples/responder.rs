//! mDNS responder example
//!
//! Publishes a host name and one service instance on the local network and
//! answers mDNS queries until interrupted.
//!
//! # Usage
//!
//! ```
//! cargo run --package mdns-responder --example responder
//! ```
//!
//! Then resolve it from another machine, e.g. with macOS dns-sd:
//! ```
//! dns-sd -B _service1._udp local.
//! ```

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Instant;

use bytes::BytesMut;
use clap::Parser;
use mdns_responder::dump::MessageDump;
use mdns_responder::{
    LinkMtu, MDNS_DEST_ADDR, MulticastSocket, Responder, ResponderConfig, TaggedBytesMut,
    TransportContext, TransportProtocol,
};
use tokio::net::UdpSocket;

#[derive(Parser, Debug)]
#[command(name = "mDNS Responder")]
#[command(version = "0.1.0")]
#[command(about = "An example mDNS/DNS-SD responder publishing one service instance")]
struct Args {
    /// Host name to publish (without the .local suffix)
    #[arg(long, default_value = "rust-mdns-host")]
    host_name: String,

    /// Service instance name
    #[arg(long, default_value = "Rust Service Instance")]
    instance_name: String,

    /// Service type
    #[arg(long, default_value = "_service1._udp")]
    service_name: String,

    /// Port advertised in the SRV record
    #[arg(long, default_value_t = 1234)]
    port: u16,

    /// Local IP address to advertise (autodetected if not specified)
    #[arg(long)]
    local_ip: Option<String>,

    /// Link MTU used to size reply datagrams
    #[arg(long, default_value_t = 1500)]
    mtu: usize,
}

fn get_local_ip() -> Option<Ipv4Addr> {
    // Connect a throwaway socket to a public address to learn which local
    // interface would carry the traffic. Nothing is actually sent.
    let socket = std::net::UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect("8.8.8.8:80").ok()?;
    match socket.local_addr().ok()?.ip() {
        IpAddr::V4(ip) => Some(ip),
        IpAddr::V6(_) => None,
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let local_ip = if let Some(ip_str) = &args.local_ip {
        ip_str.parse::<Ipv4Addr>()?
    } else {
        get_local_ip().unwrap_or(Ipv4Addr::LOCALHOST)
    };

    log::info!("Starting mDNS responder");
    log::info!("  Host name: {}.local", args.host_name);
    log::info!(
        "  Service:   {}.{}.local port {}",
        args.instance_name,
        args.service_name,
        args.port
    );
    log::info!("  Address:   {local_ip}");

    let std_socket = MulticastSocket::new().with_interface(local_ip).into_std()?;
    let socket = UdpSocket::from_std(std_socket)?;
    let local_addr = socket.local_addr()?;

    let config = ResponderConfig::new().with_host_name(args.host_name);
    let mut responder = Responder::new(config);
    responder.register_service(&args.instance_name, &args.service_name, args.port, b"")?;
    responder.handle_interface_up(
        0,
        &[IpAddr::V4(local_ip)],
        LinkMtu {
            mtu: args.mtu,
            ip_header_size: 20,
            udp_header_size: 8,
        },
        Instant::now(),
    )?;

    let mut buf = vec![0u8; 9000];
    loop {
        // send whatever the responder queued (announcements, replies)
        while let Some(out) = responder.poll_write() {
            log::debug!(
                "sending {} bytes to {}\n{}",
                out.message.message.len(),
                MDNS_DEST_ADDR,
                MessageDump(&out.message.message)
            );
            socket.send_to(&out.message.message, MDNS_DEST_ADDR).await?;
        }

        tokio::select! {
            result = socket.recv_from(&mut buf) => {
                let (len, src) = result?;
                // skip our own multicast echo
                if src == local_addr {
                    continue;
                }
                log::debug!("received {len} bytes from {src}\n{}", MessageDump(&buf[..len]));
                let msg = TaggedBytesMut {
                    now: Instant::now(),
                    transport: TransportContext {
                        local_addr: SocketAddr::new(IpAddr::V4(local_ip), 5353),
                        peer_addr: src,
                        transport_protocol: TransportProtocol::UDP,
                    },
                    message: BytesMut::from(&buf[..len]),
                };
                responder.handle_read(0, msg)?;
            }
            _ = tokio::signal::ctrl_c() => {
                log::info!("shutting down");
                break;
            }
        }
    }

    // say goodbye before leaving
    responder.close()?;
    while let Some(out) = responder.poll_write() {
        socket.send_to(&out.message.message, MDNS_DEST_ADDR).await?;
    }

    Ok(())
}
