use std::net::{IpAddr, UdpSocket};

use nix::ifaddrs::getifaddrs;
use nix::sys::socket::{AddressFamily, SockaddrLike};

// Any routable address works: connecting a UDP socket sends nothing.
const ROUTE_TARGET: &str = "10.254.254.254:1";

pub fn local_ip() -> Option<IpAddr> {
    let resolve = || -> std::io::Result<IpAddr> {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.connect(ROUTE_TARGET)?;
        Ok(socket.local_addr()?.ip())
    };

    match resolve() {
        Ok(ip) => Some(ip),
        Err(e) => {
            log::warn!("Failed to determine local IP address: {e}");
            None
        }
    }
}

pub fn mac_address(interface: &str) -> Option<String> {
    let addrs = match getifaddrs() {
        Ok(addrs) => addrs,
        Err(e) => {
            log::warn!("Failed to list network interfaces: {e}");
            return None;
        }
    };

    for ifaddr in addrs {
        if ifaddr.interface_name != interface {
            continue;
        }
        if let Some(addr) = ifaddr.address
            && addr.family() == Some(AddressFamily::Packet)
            && let Some(link_addr) = addr.as_link_addr()
            && let Some(mac) = link_addr.addr()
        {
            return format_mac(&mac);
        }
    }

    log::warn!("No hardware address found for {interface}");
    None
}

// All-zero addresses belong to interfaces without hardware, such as loopback.
fn format_mac(mac: &[u8; 6]) -> Option<String> {
    if mac.iter().all(|&b| b == 0) {
        return None;
    }
    let parts: Vec<String> = mac.iter().map(|b| format!("{b:02x}")).collect();
    Some(parts.join(":"))
}
