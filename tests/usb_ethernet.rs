//! A host talking to the device through the ECM bulk endpoints.
//!
//! The host side is a second `smoltcp` interface on its own [`EcmDevice`];
//! every frame crosses the link as 64-byte bulk packets.

use ch32_cookbook::net::device::Frame;
use ch32_cookbook::net::ecm::{self, ControlResponse, EcmControl};
use ch32_cookbook::net::fs;
use ch32_cookbook::net::http::{StatusApi, API_HEADER};
use ch32_cookbook::net::stack::{Config, SOCKET_COUNT};
use ch32_cookbook::net::{EcmDevice, NetStack, SocketBuffers, CLIENT_IP, DEVICE_MAC, HOST_IP, MTU, PREFIX_LEN};
use smoltcp::iface::{self, Interface, SocketHandle, SocketSet, SocketStorage};
use smoltcp::phy::ChecksumCapabilities;
use smoltcp::socket::tcp;
use smoltcp::time::Instant;
use smoltcp::wire::{
    ArpOperation, ArpPacket, ArpRepr, EthernetAddress, EthernetFrame, EthernetProtocol, EthernetRepr,
    HardwareAddress, Icmpv4Message, Icmpv4Packet, Icmpv4Repr, IpAddress, IpCidr, IpProtocol, Ipv4Packet, Ipv4Repr,
};

const HOST_MAC: EthernetAddress = EthernetAddress([0x02, 0x50, 0x4F, 0x00, 0x00, 0x01]);
const STEP_MS: u32 = 10;

/// Both ends of the USB link.
struct Link<'a> {
    device: NetStack<'a>,
    host: Interface,
    host_dev: EcmDevice,
    host_sockets: SocketSet<'a>,
    api: StatusApi,
    now_ms: u32,
    to_device: Vec<Frame>,
    to_host: Vec<Frame>,
}

impl<'a> Link<'a> {
    fn new(device: NetStack<'a>, host_storage: &'a mut [SocketStorage<'a>]) -> Self {
        let mut host_dev = EcmDevice::default();
        let mut host = Interface::new(
            iface::Config::new(HardwareAddress::Ethernet(HOST_MAC)),
            &mut host_dev,
            Instant::ZERO,
        );
        host.update_ip_addrs(|addrs| {
            addrs.push(IpCidr::new(IpAddress::Ipv4(CLIENT_IP), PREFIX_LEN)).unwrap();
        });

        Self {
            device,
            host,
            host_dev,
            host_sockets: SocketSet::new(host_storage),
            api: StatusApi::default(),
            now_ms: 0,
            to_device: Vec::new(),
            to_host: Vec::new(),
        }
    }

    fn poll_host(&mut self) {
        let now = Instant::from_millis(self.now_ms as i64);
        self.host.poll(now, &mut self.host_dev, &mut self.host_sockets);
        while let Some(frame) = self.host_dev.pop_frame() {
            self.to_device.push(frame);
        }
    }

    fn poll_device(&mut self) {
        self.api.uptime_ms = self.now_ms;
        self.device.poll(self.now_ms, &mut self.api);
        while let Some(frame) = self.device.device().pop_frame() {
            self.to_host.push(frame);
        }
    }

    /// Runs both ends for `steps` clock steps, delivering every frame.
    fn run(&mut self, steps: usize) {
        for _ in 0..steps {
            self.now_ms += STEP_MS;
            self.poll_host();
            self.poll_device();

            for _ in 0..64 {
                if self.to_device.is_empty() && self.to_host.is_empty() {
                    break;
                }
                for frame in core::mem::take(&mut self.to_device) {
                    for packet in ecm::tx_chunks(&frame) {
                        assert!(packet.len() <= ecm::MAX_PACKET_SIZE);
                        self.device.device().on_bulk_out(packet);
                    }
                    self.poll_device();
                }
                for frame in core::mem::take(&mut self.to_host) {
                    for packet in ecm::tx_chunks(&frame) {
                        self.host_dev.on_bulk_out(packet);
                    }
                    self.poll_host();
                }
            }
        }
    }

    fn client(&mut self, handle: SocketHandle) -> &mut tcp::Socket<'a> {
        self.host_sockets.get_mut::<tcp::Socket>(handle)
    }

    /// Sends `request` to port 80 and collects the response until the device
    /// closes the connection.
    fn fetch(&mut self, handle: SocketHandle, request: &[u8]) -> Vec<u8> {
        let cx = self.host.context();
        let socket = self.host_sockets.get_mut::<tcp::Socket>(handle);
        socket.connect(cx, (IpAddress::Ipv4(HOST_IP), 80), 49152).unwrap();

        for _ in 0..100 {
            self.run(1);
            if self.client(handle).may_send() {
                break;
            }
        }
        assert_eq!(self.client(handle).state(), tcp::State::Established);
        self.client(handle).send_slice(request).unwrap();

        let mut response = Vec::new();
        for _ in 0..200 {
            self.run(1);
            let socket = self.client(handle);
            let mut buf = [0u8; 512];
            while let Ok(len) = socket.recv_slice(&mut buf) {
                if len == 0 {
                    break;
                }
                response.extend_from_slice(&buf[..len]);
            }
            if !socket.may_recv() {
                break;
            }
        }
        response
    }
}

fn client_socket<'a>(rx: &'a mut [u8], tx: &'a mut [u8]) -> tcp::Socket<'a> {
    tcp::Socket::new(tcp::SocketBuffer::new(rx), tcp::SocketBuffer::new(tx))
}

/// Pushes `frame` through bulk OUT and collects what the device sends back.
fn exchange(stack: &mut NetStack, frame: &[u8]) -> Vec<Frame> {
    for packet in ecm::tx_chunks(frame) {
        assert!(packet.len() <= ecm::MAX_PACKET_SIZE);
        stack.device().on_bulk_out(packet);
    }
    stack.poll(10, &mut StatusApi::default());
    core::iter::from_fn(|| stack.device().pop_frame()).collect()
}

fn ethernet(dst: EthernetAddress, ethertype: EthernetProtocol, payload_len: usize) -> Vec<u8> {
    let repr = EthernetRepr {
        src_addr: HOST_MAC,
        dst_addr: dst,
        ethertype,
    };
    let mut buf = vec![0u8; repr.buffer_len() + payload_len];
    repr.emit(&mut EthernetFrame::new_unchecked(&mut buf[..]));
    buf
}

fn arp_request() -> Vec<u8> {
    let repr = ArpRepr::EthernetIpv4 {
        operation: ArpOperation::Request,
        source_hardware_addr: HOST_MAC,
        source_protocol_addr: CLIENT_IP,
        target_hardware_addr: EthernetAddress::default(),
        target_protocol_addr: HOST_IP,
    };
    let mut buf = ethernet(EthernetAddress::BROADCAST, EthernetProtocol::Arp, repr.buffer_len());
    repr.emit(&mut ArpPacket::new_unchecked(&mut buf[14..]));
    buf
}

fn ping_frame(payload: &[u8]) -> Vec<u8> {
    let echo = Icmpv4Repr::EchoRequest {
        ident: 0x1234,
        seq_no: 1,
        data: payload,
    };
    let ip = Ipv4Repr {
        src_addr: CLIENT_IP,
        dst_addr: HOST_IP,
        next_header: IpProtocol::Icmp,
        payload_len: echo.buffer_len(),
        hop_limit: 64,
    };
    let caps = ChecksumCapabilities::default();
    let mut buf = ethernet(DEVICE_MAC, EthernetProtocol::Ipv4, ip.buffer_len() + echo.buffer_len());
    ip.emit(&mut Ipv4Packet::new_unchecked(&mut buf[14..]), &caps);
    echo.emit(&mut Icmpv4Packet::new_unchecked(&mut buf[34..]), &caps);
    buf
}

#[test]
fn link_comes_up_after_packet_filter() {
    let mut control = EcmControl::default();
    assert_eq!(control.take_notification(), None);
    assert_eq!(control.handle_class_request(0x22, 0), ControlResponse::Nak);

    assert_eq!(
        control.handle_class_request(ecm::request::SET_ETHERNET_PACKET_FILTER, 0),
        ControlResponse::Ack
    );
    assert!(!control.is_connected());
    assert_eq!(control.take_notification(), Some([0xA1, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00]));
    assert!(control.is_connected());
    assert_eq!(control.take_notification(), None);
}

#[test]
fn host_resolves_device_address() {
    let mut storage = [SocketStorage::EMPTY; SOCKET_COUNT];
    let mut buffers = SocketBuffers::new();
    let mut stack = NetStack::new(Config::default(), &mut storage, &mut buffers);

    let replies = exchange(&mut stack, &arp_request());
    assert_eq!(replies.len(), 1);

    let eth = EthernetFrame::new_checked(&replies[0][..]).unwrap();
    assert_eq!(
        (eth.dst_addr(), eth.src_addr(), eth.ethertype()),
        (HOST_MAC, DEVICE_MAC, EthernetProtocol::Arp)
    );
    match ArpRepr::parse(&ArpPacket::new_checked(eth.payload()).unwrap()).unwrap() {
        ArpRepr::EthernetIpv4 {
            operation,
            source_hardware_addr,
            source_protocol_addr,
            ..
        } => {
            assert_eq!(operation, ArpOperation::Reply);
            assert_eq!((source_hardware_addr, source_protocol_addr), (DEVICE_MAC, HOST_IP));
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn large_ping_spans_many_packets() {
    let mut storage = [SocketStorage::EMPTY; SOCKET_COUNT];
    let mut buffers = SocketBuffers::new();
    let mut stack = NetStack::new(Config::default(), &mut storage, &mut buffers);
    exchange(&mut stack, &arp_request());

    // 14 + 20 + 8 + 982 = 1024, a multiple of the packet size
    for payload_len in [982, 1000, 1472] {
        let payload: Vec<u8> = (0..payload_len).map(|i| i as u8).collect();
        let request = ping_frame(&payload);
        let replies = exchange(&mut stack, &request);
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].len(), request.len());

        let eth = EthernetFrame::new_checked(&replies[0][..]).unwrap();
        assert_eq!(eth.dst_addr(), HOST_MAC);
        let ip = Ipv4Packet::new_checked(eth.payload()).unwrap();
        assert_eq!((ip.src_addr(), ip.dst_addr()), (HOST_IP, CLIENT_IP));
        let icmp = Icmpv4Packet::new_checked(ip.payload()).unwrap();
        assert_eq!(icmp.msg_type(), Icmpv4Message::EchoReply);
        assert!(icmp.verify_checksum());
        assert_eq!(icmp.data(), &payload[..]);
    }
}

#[test]
fn exact_multiple_ends_with_zero_length_packet() {
    let frame = ping_frame(&[0u8; 982]);
    assert_eq!(frame.len(), 1024);
    let packets: Vec<&[u8]> = ecm::tx_chunks(&frame).collect();
    assert_eq!(packets.len(), 17);
    assert!(packets[..16].iter().all(|p| p.len() == 64));
    assert!(packets[16].is_empty());
}

#[test]
fn browser_gets_index_page() {
    let mut storage = [SocketStorage::EMPTY; SOCKET_COUNT];
    let mut buffers = SocketBuffers::new();
    let device = NetStack::new(Config::default(), &mut storage, &mut buffers);

    let mut host_storage = [SocketStorage::EMPTY; 1];
    let (mut rx, mut tx) = ([0u8; 2048], [0u8; 512]);
    let mut link = Link::new(device, &mut host_storage[..]);
    let client = link.host_sockets.add(client_socket(&mut rx, &mut tx));

    let response = link.fetch(client, b"GET / HTTP/1.1\r\nHost: 172.16.42.1\r\n\r\n");
    assert_eq!(response, fs::INDEX_HTML.data);
    assert!(response.len() < MTU);
}

#[test]
fn status_api_over_tcp() {
    let mut storage = [SocketStorage::EMPTY; SOCKET_COUNT];
    let mut buffers = SocketBuffers::new();
    let device = NetStack::new(Config::default(), &mut storage, &mut buffers);

    let mut host_storage = [SocketStorage::EMPTY; 1];
    let (mut rx, mut tx) = ([0u8; 2048], [0u8; 512]);
    let mut link = Link::new(device, &mut host_storage[..]);
    let client = link.host_sockets.add(client_socket(&mut rx, &mut tx));

    let response = link.fetch(client, b"GET /api/status HTTP/1.1\r\nHost: 172.16.42.1\r\n\r\n");
    assert!(response.starts_with(API_HEADER.as_bytes()));
    let body = core::str::from_utf8(&response[API_HEADER.len()..]).unwrap();
    assert!(body.starts_with("{\"uptime_ms\": "));
    assert!(body.ends_with("}\r\n"));
}

#[test]
fn hostname_request_is_redirected() {
    let mut storage = [SocketStorage::EMPTY; SOCKET_COUNT];
    let mut buffers = SocketBuffers::new();
    let device = NetStack::new(Config::default(), &mut storage, &mut buffers);

    let mut host_storage = [SocketStorage::EMPTY; 1];
    let (mut rx, mut tx) = ([0u8; 2048], [0u8; 512]);
    let mut link = Link::new(device, &mut host_storage[..]);
    let client = link.host_sockets.add(client_socket(&mut rx, &mut tx));

    let response = link.fetch(client, b"GET /generate_204 HTTP/1.1\r\nHost: clients3.google.com\r\n\r\n");
    assert!(response.starts_with(b"HTTP/1.0 302 Found\r\nLocation: http://172.16.42.1/\r\n"));
}
