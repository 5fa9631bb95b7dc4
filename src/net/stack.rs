//! The device end of the link: a `smoltcp` interface over [`EcmDevice`] with
//! the DHCP, DNS and web servers bound to its sockets.
//!
//! The board feeds bulk OUT packets to [`NetStack::device`], calls
//! [`NetStack::poll`] from its main loop and sends every frame
//! [`EcmDevice::send_next`] yields on the bulk IN endpoint.

use smoltcp::iface::{self, Interface, SocketHandle, SocketSet, SocketStorage};
use smoltcp::socket::{tcp, udp};
use smoltcp::time::Instant;
use smoltcp::wire::{EthernetAddress, HardwareAddress, IpAddress, IpCidr, IpEndpoint, Ipv4Address};

use super::device::EcmDevice;
use super::http::{self, ApiHandler, HttpSession};
use super::{dhcp, dns, DEVICE_MAC, HOST_IP, PREFIX_LEN};

/// Period of the timer behind the web server's idle polls.
pub const PERIOD_MS: u32 = 500;

/// DHCP, DNS and HTTP.
pub const SOCKET_COUNT: usize = 3;

/// Datagrams buffered per UDP socket and direction.
const UDP_PACKETS: usize = 2;
const DNS_MESSAGE_MAX: usize = 512;
const DHCP_BUFFER_LEN: usize = UDP_PACKETS * dhcp::MESSAGE_SIZE_MAX;
const DNS_BUFFER_LEN: usize = UDP_PACKETS * DNS_MESSAGE_MAX;

pub const HTTP_RX_LEN: usize = http::REQUEST_LEN;
pub const HTTP_TX_LEN: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    pub mac: EthernetAddress,
    pub host: Ipv4Address,
    pub prefix_len: u8,
    /// Serve leases on port 67.
    pub dhcp: Option<dhcp::Config>,
    /// Answer every DNS query on port 53 with `host`.
    pub dns: bool,
}

impl Default for Config {
    /// 172.16.42.1/24 with DHCP and DNS
    fn default() -> Self {
        Self {
            mac: DEVICE_MAC,
            host: HOST_IP,
            prefix_len: PREFIX_LEN,
            dhcp: Some(dhcp::Config::default()),
            dns: true,
        }
    }
}

struct UdpBuffers<const N: usize> {
    rx_meta: [udp::PacketMetadata; UDP_PACKETS],
    rx: [u8; N],
    tx_meta: [udp::PacketMetadata; UDP_PACKETS],
    tx: [u8; N],
}

impl<const N: usize> UdpBuffers<N> {
    const fn new() -> Self {
        Self {
            rx_meta: [udp::PacketMetadata::EMPTY; UDP_PACKETS],
            rx: [0; N],
            tx_meta: [udp::PacketMetadata::EMPTY; UDP_PACKETS],
            tx: [0; N],
        }
    }

    fn socket(&mut self) -> udp::Socket<'_> {
        udp::Socket::new(
            udp::PacketBuffer::new(&mut self.rx_meta[..], &mut self.rx[..]),
            udp::PacketBuffer::new(&mut self.tx_meta[..], &mut self.tx[..]),
        )
    }
}

/// Memory behind the sockets of a [`NetStack`]. Best kept in a `static`.
pub struct SocketBuffers {
    dhcp: UdpBuffers<DHCP_BUFFER_LEN>,
    dns: UdpBuffers<DNS_BUFFER_LEN>,
    http_rx: [u8; HTTP_RX_LEN],
    http_tx: [u8; HTTP_TX_LEN],
}

impl SocketBuffers {
    pub const fn new() -> Self {
        Self {
            dhcp: UdpBuffers::new(),
            dns: UdpBuffers::new(),
            http_rx: [0; HTTP_RX_LEN],
            http_tx: [0; HTTP_TX_LEN],
        }
    }
}

impl Default for SocketBuffers {
    fn default() -> Self {
        Self::new()
    }
}

pub struct NetStack<'a> {
    config: Config,
    device: EcmDevice,
    iface: Interface,
    sockets: SocketSet<'a>,
    dhcp: Option<(SocketHandle, dhcp::DhcpServer)>,
    dns: Option<SocketHandle>,
    http: SocketHandle,
    session: HttpSession,
    ticker: Ticker,
    clock: Clock,
}

impl<'a> NetStack<'a> {
    pub fn new(
        config: Config,
        storage: &'a mut [SocketStorage<'a>; SOCKET_COUNT],
        buffers: &'a mut SocketBuffers,
    ) -> Self {
        info!("net: host {}/{=u8}", config.host, config.prefix_len);

        let mut device = EcmDevice::default();
        let mut iface = Interface::new(
            iface::Config::new(HardwareAddress::Ethernet(config.mac)),
            &mut device,
            Instant::ZERO,
        );
        iface.update_ip_addrs(|addrs| {
            if addrs.push(IpCidr::new(IpAddress::Ipv4(config.host), config.prefix_len)).is_err() {
                error!("net: no room for the host address");
            }
        });

        let SocketBuffers {
            dhcp: dhcp_buffers,
            dns: dns_buffers,
            http_rx,
            http_tx,
        } = buffers;
        let mut sockets = SocketSet::new(&mut storage[..]);

        let dhcp = match config.dhcp {
            Some(dhcp_config) => {
                let mut socket = dhcp_buffers.socket();
                if socket.bind(dhcp::SERVER_PORT).is_err() {
                    error!("net: cannot bind port {=u16}", dhcp::SERVER_PORT);
                }
                Some((sockets.add(socket), dhcp::DhcpServer::new(dhcp_config)))
            }
            None => None,
        };

        let dns = if config.dns {
            let mut socket = dns_buffers.socket();
            if socket.bind(dns::PORT).is_err() {
                error!("net: cannot bind port {=u16}", dns::PORT);
            }
            Some(sockets.add(socket))
        } else {
            None
        };

        let mut socket = tcp::Socket::new(
            tcp::SocketBuffer::new(&mut http_rx[..]),
            tcp::SocketBuffer::new(&mut http_tx[..]),
        );
        if socket.listen(http::PORT).is_err() {
            error!("net: cannot listen on port {=u16}", http::PORT);
        }
        let http = sockets.add(socket);

        Self {
            config,
            device,
            iface,
            sockets,
            dhcp,
            dns,
            http,
            session: HttpSession::default(),
            ticker: Ticker::new(0),
            clock: Clock::default(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn device(&mut self) -> &mut EcmDevice {
        &mut self.device
    }

    pub fn http_session(&self) -> &HttpSession {
        &self.session
    }

    /// Handles received frames and runs the servers. `now_ms` is a free
    /// running millisecond counter; it may wrap.
    ///
    /// Returns true when anything on the interface changed.
    pub fn poll<A: ApiHandler + ?Sized>(&mut self, now_ms: u32, api: &mut A) -> bool {
        let now = self.clock.update(now_ms);
        let tick = self.ticker.poll(now_ms);

        let mut activity = self.iface.poll(now, &mut self.device, &mut self.sockets);

        self.serve_dhcp();
        self.serve_dns();
        let socket = self.sockets.get_mut::<tcp::Socket>(self.http);
        self.session.serve(socket, api, tick);

        activity |= self.iface.poll(now, &mut self.device, &mut self.sockets);
        activity
    }

    fn serve_dhcp(&mut self) {
        let Some((handle, server)) = &self.dhcp else {
            return;
        };
        let socket = self.sockets.get_mut::<udp::Socket>(*handle);

        // one spare byte so an oversized request fails validation
        let mut buf = [0u8; dhcp::MESSAGE_SIZE_MAX + 1];
        while let Ok((len, _)) = socket.recv_slice(&mut buf) {
            let Some(reply_len) = server.handle(&mut buf, len) else {
                continue;
            };
            // the client has no address yet
            let to = IpEndpoint::new(IpAddress::Ipv4(Ipv4Address::BROADCAST), dhcp::CLIENT_PORT);
            if socket.send_slice(&buf[..reply_len], to).is_err() {
                warn!("dhcp: reply dropped");
            }
        }
    }

    fn serve_dns(&mut self) {
        let Some(handle) = self.dns else {
            return;
        };
        let socket = self.sockets.get_mut::<udp::Socket>(handle);

        let mut buf = [0u8; DNS_MESSAGE_MAX];
        while let Ok((len, meta)) = socket.recv_slice(&mut buf) {
            let Some(reply_len) = dns::answer(&mut buf, len, self.config.host) else {
                continue;
            };
            if socket.send_slice(&buf[..reply_len], meta.endpoint).is_err() {
                warn!("dns: reply dropped");
            }
        }
    }
}

/// Extends the board's wrapping millisecond counter into a monotonic
/// `smoltcp` timestamp.
#[derive(Debug, Default)]
struct Clock {
    last_ms: u32,
    elapsed_ms: i64,
}

impl Clock {
    fn update(&mut self, now_ms: u32) -> Instant {
        self.elapsed_ms += now_ms.wrapping_sub(self.last_ms) as i64;
        self.last_ms = now_ms;
        Instant::from_millis(self.elapsed_ms)
    }
}

/// Fires every [`PERIOD_MS`] of a free-running millisecond counter.
#[derive(Debug, Default)]
pub struct Ticker {
    last_ms: u32,
}

impl Ticker {
    pub fn new(now_ms: u32) -> Self {
        Self { last_ms: now_ms }
    }

    pub fn poll(&mut self, now_ms: u32) -> bool {
        if now_ms.wrapping_sub(self.last_ms) < PERIOD_MS {
            return false;
        }
        self.last_ms = now_ms;
        true
    }
}
