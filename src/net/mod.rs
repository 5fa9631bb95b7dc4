//! USB CDC-ECM network device with a handful of tiny IP services.
//!
//! The host sees a USB Ethernet adapter. Frames arrive as 64-byte bulk
//! packets and are reassembled by [`ecm::RxAssembler`] inside
//! [`device::EcmDevice`], the `smoltcp` PHY of [`stack::NetStack`]. The
//! interface answers ARP and ping itself; DHCP and DNS run on UDP sockets and
//! the [`http`] state machine on a TCP socket on port 80.
//!
//! Default addressing: the device is `172.16.42.1/24` and leases
//! `172.16.42.2` to the host.

pub use smoltcp::wire::{EthernetAddress, Ipv4Address};

pub mod device;
pub mod dhcp;
pub mod dns;
pub mod ecm;
pub mod fs;
pub mod http;
pub mod stack;

pub use device::EcmDevice;
pub use stack::{NetStack, SocketBuffers, Ticker};

pub const DEVICE_MAC: EthernetAddress = EthernetAddress([0x00, 0x22, 0x97, 0x08, 0xA0, 0x69]);

pub const HOST_IP: Ipv4Address = Ipv4Address::new(172, 16, 42, 1);
pub const CLIENT_IP: Ipv4Address = Ipv4Address::new(172, 16, 42, 2);
pub const NETMASK: Ipv4Address = Ipv4Address::new(255, 255, 255, 0);
pub const PREFIX_LEN: u8 = 24;

/// Largest Ethernet frame without FCS.
pub const MTU: usize = 1514;
