//! Web server connection state in the style of uIP's httpd.
//!
//! The TCP engine calls one `on_*` method per event and then transmits
//! [`HttpConnection::pending`] when the returned [`Action`] says so.
//! [`HttpSession`] is that engine for a `smoltcp` TCP socket.

use core::fmt::Write as _;

use smoltcp::socket::tcp;

use super::fs::{self, File};

pub const PORT: u16 = 80;

/// Polls without progress before a connection is dropped.
pub const MAX_POLLS: u8 = 10;

/// Space for responses produced by an [`ApiHandler`].
pub const API_BUFFER_LEN: usize = 256;

/// Request bytes read from the socket at once.
pub const REQUEST_LEN: usize = 512;

/// Request bytes searched for the end of the path.
const PATH_END: usize = 40;

/// Sent to clients that ask for a hostname instead of an address.
pub const CAPTIVE_REDIRECT: &[u8] = b"HTTP/1.0 302 Found\r\n\
Location: http://172.16.42.1/\r\n\
Content-Length: 0\r\n\
Connection: close\r\n\
\r\n";

pub const API_HEADER: &str = "HTTP/1.0 200 OK\r\nServer: uIP/0.9\r\nContent-type: application/json\r\n\r\n";

/// Serves `GET /api/<endpoint>`.
pub trait ApiHandler {
    /// Writes a complete HTTP response into `out` and returns its length, or
    /// `None` to answer 404.
    fn handle(&mut self, endpoint: &str, out: &mut [u8]) -> Option<usize>;
}

/// `GET /api/status` reports the uptime.
#[derive(Debug, Default, Clone, Copy)]
pub struct StatusApi {
    pub uptime_ms: u32,
}

impl ApiHandler for StatusApi {
    fn handle(&mut self, endpoint: &str, out: &mut [u8]) -> Option<usize> {
        if endpoint != "status" {
            return None;
        }

        let mut response = heapless::String::<API_BUFFER_LEN>::new();
        write!(response, "{}{{\"uptime_ms\": {}}}\r\n", API_HEADER, self.uptime_ms).ok()?;
        let bytes = response.as_bytes();
        out.get_mut(..bytes.len())?.copy_from_slice(bytes);
        Some(bytes.len())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum State {
    /// Connected, waiting for the request line.
    NoGet,
    /// Streaming a response.
    File,
}

/// What the TCP engine should do after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Action {
    None,
    /// Send [`HttpConnection::pending`].
    Send,
    Close,
    Abort,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Body {
    Static(&'static [u8]),
    Api(usize),
}

pub struct HttpConnection {
    state: State,
    body: Body,
    offset: usize,
    polls: u8,
    api_buf: [u8; API_BUFFER_LEN],
}

impl Default for HttpConnection {
    fn default() -> Self {
        Self {
            state: State::NoGet,
            body: Body::Static(&[]),
            offset: 0,
            polls: 0,
            api_buf: [0; API_BUFFER_LEN],
        }
    }
}

impl HttpConnection {
    pub fn state(&self) -> State {
        self.state
    }

    pub fn on_connected(&mut self) {
        self.state = State::NoGet;
        self.body = Body::Static(&[]);
        self.offset = 0;
        self.polls = 0;
    }

    /// Idle poll from the TCP timer. Lingering connections are aborted.
    pub fn on_poll(&mut self) -> Action {
        self.polls = self.polls.saturating_add(1);
        if self.polls > MAX_POLLS {
            debug!("http: idle, aborting");
            Action::Abort
        } else {
            Action::None
        }
    }

    /// The first data segment, which must hold the request line.
    pub fn on_data<A: ApiHandler + ?Sized>(&mut self, request: &[u8], api: &mut A) -> Action {
        if self.state != State::NoGet {
            return Action::None;
        }
        if !request.starts_with(b"GET ") {
            debug!("http: not a GET, aborting");
            return Action::Abort;
        }

        self.offset = 0;
        self.state = State::File;

        if wants_redirect(request) {
            debug!("http: captive portal redirect");
            self.body = Body::Static(CAPTIVE_REDIRECT);
            return Action::Send;
        }

        let path = request_path(request);
        self.body = match path {
            b"/" => Body::Static(fs::INDEX_HTML.data),
            _ if path.starts_with(b"/api/") => {
                let endpoint = core::str::from_utf8(&path[5..]).ok();
                match endpoint.and_then(|e| api.handle(e, &mut self.api_buf)) {
                    Some(len) => Body::Api(len.min(API_BUFFER_LEN)),
                    None => Body::Static(fs::NOT_FOUND_HTML.data),
                }
            }
            _ => {
                let file = core::str::from_utf8(path).ok().and_then(fs::open);
                Body::Static(file.map_or(fs::NOT_FOUND_HTML.data, |f: &File| f.data))
            }
        };

        Action::Send
    }

    /// The peer acknowledged `len` bytes of [`pending`](Self::pending).
    pub fn on_acked(&mut self, len: usize) -> Action {
        self.offset = (self.offset + len).min(self.body().len());
        if self.remaining() == 0 {
            Action::Close
        } else {
            Action::Send
        }
    }

    /// Next segment to transmit, at most `mss` bytes.
    pub fn pending(&self, mss: usize) -> &[u8] {
        let rest = &self.body()[self.offset..];
        &rest[..rest.len().min(mss)]
    }

    pub fn remaining(&self) -> usize {
        self.body().len() - self.offset
    }

    fn body(&self) -> &[u8] {
        match self.body {
            Body::Static(data) => data,
            Body::Api(len) => &self.api_buf[..len],
        }
    }
}

/// Drives an [`HttpConnection`] from the state of a TCP socket listening on
/// [`PORT`].
///
/// uIP events map onto socket state: the socket turning active is
/// `connected`, readable data is `data`, a shrinking send queue is `acked`.
#[derive(Default)]
pub struct HttpSession {
    conn: HttpConnection,
    connected: bool,
    /// Response bytes handed to the socket and not yet acknowledged.
    in_flight: usize,
}

impl HttpSession {
    pub fn connection(&self) -> &HttpConnection {
        &self.conn
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Services `socket` once. `tick` marks a periodic timer expiry, which
    /// counts as an idle poll when nothing else happened.
    pub fn serve<A: ApiHandler + ?Sized>(&mut self, socket: &mut tcp::Socket, api: &mut A, tick: bool) {
        if !socket.is_open() {
            self.connected = false;
            if socket.listen(PORT).is_err() {
                error!("http: cannot listen on port {=u16}", PORT);
            }
            return;
        }
        if !socket.is_active() {
            self.connected = false;
            return;
        }
        if !self.connected {
            debug!("http: connected");
            self.connected = true;
            self.in_flight = 0;
            self.conn.on_connected();
        }

        let mut action = Action::None;
        let mut progress = false;

        if socket.can_recv() {
            let mut request = [0u8; REQUEST_LEN];
            if let Ok(len) = socket.recv_slice(&mut request) {
                action = self.conn.on_data(&request[..len], api);
                progress = true;
            }
        }

        let queued = socket.send_queue();
        if self.in_flight > queued {
            let acked = self.in_flight - queued;
            self.in_flight = queued;
            action = self.conn.on_acked(acked);
            progress = true;
        }

        if tick && !progress {
            action = self.conn.on_poll();
        }

        match action {
            Action::Abort => {
                socket.abort();
                self.connected = false;
            }
            Action::Close => socket.close(),
            Action::Send | Action::None => self.push(socket),
        }
    }

    /// Queues whatever part of the response the socket has not seen yet.
    fn push(&mut self, socket: &mut tcp::Socket) {
        if self.conn.state() != State::File || !socket.can_send() {
            return;
        }

        let pending = self.conn.pending(usize::MAX);
        let unsent = pending.get(self.in_flight..).unwrap_or_default();
        if unsent.is_empty() {
            return;
        }
        match socket.send_slice(unsent) {
            Ok(len) => self.in_flight += len,
            Err(_) => warn!("http: send failed"),
        }
    }
}

/// A `Host:` header whose value does not start like an address.
fn wants_redirect(request: &[u8]) -> bool {
    request
        .windows(5)
        .position(|w| w[..4].eq_ignore_ascii_case(b"host") && w[4] == b':')
        .and_then(|at| request.get(at + 6))
        .is_some_and(|&c| !c.is_ascii_digit() && c != b'[')
}

/// The path of the request line, ending at a space or line break in the
/// first 40 bytes.
fn request_path(request: &[u8]) -> &[u8] {
    let limit = request.len().min(PATH_END);
    let start = 4.min(limit);
    let end = request[start..limit]
        .iter()
        .position(|&c| c == b' ' || c == b'\r' || c == b'\n')
        .map_or(limit, |i| start + i);
    &request[start..end]
}
