//! Single-lease DHCP server.
//!
//! Every DISCOVER gets an OFFER and every REQUEST an ACK for the same client
//! address. The reply is built over the request in place.

use core::fmt::Write as _;

use super::{Ipv4Address, CLIENT_IP, HOST_IP, NETMASK};

pub const SERVER_PORT: u16 = 67;
pub const CLIENT_PORT: u16 = 68;

/// Fixed BOOTP part in front of the options.
pub const HEADER_LEN: usize = 236;
/// Header, magic and a message type option.
pub const MESSAGE_SIZE_MIN: usize = 244;
/// Largest unextended message, RFC 2131.
pub const MESSAGE_SIZE_MAX: usize = 576;

pub const MAGIC: [u8; 4] = [0x63, 0x82, 0x53, 0x63];

const BOOTREQUEST: u8 = 1;
const BOOTREPLY: u8 = 2;
const HTYPE_ETHERNET: u8 = 1;

const OP: usize = 0;
const HTYPE: usize = 1;
const FLAGS: usize = 10;
const YIADDR: usize = 16;

mod option {
    pub const PAD: u8 = 0;
    pub const SUBNET: u8 = 1;
    pub const ROUTER: u8 = 3;
    pub const DNS: u8 = 6;
    pub const LEASE_TIME: u8 = 51;
    pub const MESSAGE_TYPE: u8 = 53;
    pub const SERVER_ID: u8 = 54;
    pub const CAPTIVE_PORTAL: u8 = 114;
    pub const END: u8 = 255;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MessageType {
    Discover = 1,
    Offer = 2,
    Request = 3,
    Ack = 5,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    pub server: Ipv4Address,
    pub client: Ipv4Address,
    pub netmask: Ipv4Address,
    pub lease_secs: u32,
    /// Also hand out router, DNS and an RFC 8910 captive portal URL, all
    /// pointing at the server.
    pub captive_portal: bool,
}

impl Default for Config {
    /// 172.16.42.1 leasing 172.16.42.2/24 for 42 days
    fn default() -> Self {
        Self {
            server: HOST_IP,
            client: CLIENT_IP,
            netmask: NETMASK,
            lease_secs: 0x0037_5F00,
            captive_portal: false,
        }
    }
}

pub struct DhcpServer {
    config: Config,
}

impl DhcpServer {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Rewrites the request in `buf[..len]` into its reply and returns the
    /// reply length. Invalid or unanswerable requests give `None`.
    pub fn handle(&self, buf: &mut [u8], len: usize) -> Option<usize> {
        let request = buf.get(..len)?;
        if !is_valid(request) {
            debug!("dhcp: invalid request, {=usize} bytes", len);
            return None;
        }

        let reply_type = match request_type(request)? {
            MessageType::Discover => MessageType::Offer,
            MessageType::Request => MessageType::Ack,
            _ => return None,
        };
        info!("dhcp: answering with type {=u8}", reply_type as u8);

        self.write_reply(buf, reply_type)
    }

    fn write_reply(&self, buf: &mut [u8], reply_type: MessageType) -> Option<usize> {
        let config = &self.config;
        let mut options = Options::new(buf.get_mut(HEADER_LEN..)?);

        options.raw(&MAGIC)?;
        options.put(option::MESSAGE_TYPE, &[reply_type as u8])?;
        options.put(option::SERVER_ID, config.server.as_bytes())?;
        options.put(option::SUBNET, config.netmask.as_bytes())?;
        options.put(option::LEASE_TIME, &config.lease_secs.to_be_bytes())?;
        if config.captive_portal {
            let url = portal_url(config.server)?;
            options.put(option::CAPTIVE_PORTAL, url.as_bytes())?;
            options.put(option::ROUTER, config.server.as_bytes())?;
            options.put(option::DNS, config.server.as_bytes())?;
        }
        options.raw(&[option::END])?;
        let options_len = options.len;

        buf[OP] = BOOTREPLY;
        buf[FLAGS..FLAGS + 2].fill(0);
        buf[YIADDR..YIADDR + 4].copy_from_slice(config.client.as_bytes());

        Some(HEADER_LEN + options_len)
    }
}

/// `http://<server>/index.html`
pub fn portal_url(server: Ipv4Address) -> Option<heapless::String<40>> {
    let mut url = heapless::String::new();
    write!(url, "http://{}/index.html", server).ok()?;
    Some(url)
}

pub fn is_valid(request: &[u8]) -> bool {
    (MESSAGE_SIZE_MIN..=MESSAGE_SIZE_MAX).contains(&request.len())
        && request[HTYPE] == HTYPE_ETHERNET
        && request[OP] == BOOTREQUEST
        && request[HEADER_LEN..HEADER_LEN + 4] == MAGIC
}

/// Message type from option 53. Pads are skipped and the walk stops at END.
pub fn request_type(request: &[u8]) -> Option<MessageType> {
    let options = request.get(HEADER_LEN..)?;
    let mut idx = MAGIC.len();

    while idx + 3 <= options.len() {
        match options[idx] {
            option::END => break,
            option::PAD => idx += 1,
            option::MESSAGE_TYPE => match options[idx + 2] {
                1 => return Some(MessageType::Discover),
                3 => return Some(MessageType::Request),
                _ => idx += options[idx + 1] as usize + 2,
            },
            _ => idx += options[idx + 1] as usize + 2,
        }
    }

    None
}

struct Options<'a> {
    buf: &'a mut [u8],
    len: usize,
}

impl<'a> Options<'a> {
    fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, len: 0 }
    }

    fn raw(&mut self, bytes: &[u8]) -> Option<()> {
        let end = self.len + bytes.len();
        self.buf.get_mut(self.len..end)?.copy_from_slice(bytes);
        self.len = end;
        Some(())
    }

    fn put(&mut self, code: u8, value: &[u8]) -> Option<()> {
        self.raw(&[code, value.len() as u8])?;
        self.raw(value)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn request(kind: u8) -> [u8; MESSAGE_SIZE_MAX] {
        let mut buf = [0u8; MESSAGE_SIZE_MAX];
        buf[OP] = BOOTREQUEST;
        buf[HTYPE] = HTYPE_ETHERNET;
        buf[2] = 6;
        buf[4..8].copy_from_slice(&[0xDE, 0xAD, 0xBE, 0xEF]);
        buf[FLAGS] = 0x80;
        buf[28..34].copy_from_slice(&[0x02, 0, 0, 0, 0, 0x01]);
        buf[HEADER_LEN..HEADER_LEN + 4].copy_from_slice(&MAGIC);
        // a pad, a hostname option, then the message type
        let opts = [0, 12, 3, b'p', b'c', b'1', 53, 1, kind, 255];
        buf[HEADER_LEN + 4..HEADER_LEN + 4 + opts.len()].copy_from_slice(&opts);
        buf
    }

    #[test]
    fn discover_gets_offer() {
        let mut buf = request(1);
        let server = DhcpServer::new(Config::default());
        let len = server.handle(&mut buf, 300).unwrap();

        assert_eq!(len, 262);
        assert_eq!(buf[OP], BOOTREPLY);
        assert_eq!(&buf[FLAGS..FLAGS + 2], &[0, 0]);
        assert_eq!(&buf[YIADDR..YIADDR + 4], &[172, 16, 42, 2]);
        // transaction id and client hardware address survive
        assert_eq!(&buf[4..8], &[0xDE, 0xAD, 0xBE, 0xEF]);
        assert_eq!(&buf[28..34], &[0x02, 0, 0, 0, 0, 0x01]);

        assert_eq!(
            &buf[HEADER_LEN..len],
            &[
                0x63, 0x82, 0x53, 0x63, //
                53, 1, 2, //
                54, 4, 172, 16, 42, 1, //
                1, 4, 255, 255, 255, 0, //
                51, 4, 0x00, 0x37, 0x5F, 0x00, //
                255,
            ]
        );
    }

    #[test]
    fn request_gets_ack() {
        let mut buf = request(3);
        let len = DhcpServer::new(Config::default()).handle(&mut buf, 300).unwrap();
        assert_eq!(len, 262);
        assert_eq!(&buf[HEADER_LEN + 4..HEADER_LEN + 7], &[53, 1, 5]);
    }

    #[test]
    fn captive_portal_block() {
        let mut buf = request(1);
        let server = DhcpServer::new(Config {
            captive_portal: true,
            ..Default::default()
        });
        let len = server.handle(&mut buf, 300).unwrap();

        let url = b"http://172.16.42.1/index.html";
        assert_eq!(len, 262 + 2 + url.len() + 6 + 6);

        let block = &buf[HEADER_LEN + 25..len];
        assert_eq!(block[0], 114);
        assert_eq!(block[1] as usize, url.len());
        assert_eq!(&block[2..2 + url.len()], url);
        assert_eq!(&block[2 + url.len()..], &[3, 4, 172, 16, 42, 1, 6, 4, 172, 16, 42, 1, 255]);
    }

    #[test]
    fn invalid_requests_are_ignored() {
        let server = DhcpServer::new(Config::default());

        let mut short = request(1);
        assert_eq!(server.handle(&mut short, 243), None);

        let mut long = [0u8; 600];
        long[..MESSAGE_SIZE_MAX].copy_from_slice(&request(1));
        assert_eq!(server.handle(&mut long, 577), None);

        let mut token_ring = request(1);
        token_ring[HTYPE] = 6;
        assert_eq!(server.handle(&mut token_ring, 300), None);

        let mut reply = request(1);
        reply[OP] = BOOTREPLY;
        assert_eq!(server.handle(&mut reply, 300), None);

        let mut no_magic = request(1);
        no_magic[HEADER_LEN] = 0;
        assert_eq!(server.handle(&mut no_magic, 300), None);

        let mut release = request(7);
        assert_eq!(server.handle(&mut release, 300), None);
    }

    #[test]
    fn option_walk_stops_at_end() {
        let mut buf = request(1);
        // END before the message type
        buf[HEADER_LEN + 4] = 255;
        assert_eq!(request_type(&buf[..300]), None);

        // a length running off the end does not panic
        let mut buf = request(1);
        buf[HEADER_LEN + 5] = 12;
        buf[HEADER_LEN + 6] = 250;
        assert_eq!(request_type(&buf[..300]), None);
    }
}
