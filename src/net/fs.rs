//! Read-only file system baked into flash.
//!
//! Files hold complete HTTP responses, headers included, so the web server
//! only has to stream them.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct File {
    pub name: &'static str,
    pub data: &'static [u8],
}

pub const INDEX_HTML: File = File {
    name: "/index.html",
    data: concat!(
        "HTTP/1.0 200 OK\r\n",
        "Server: uIP/0.9\r\n",
        "Content-type: text/html\r\n",
        "\r\n",
        "<html><head><title>ch32</title></head><body>\n",
        "<h1>Hello from a CH32 over USB</h1>\n",
        "<p>Uptime: <span id=\"up\">?</span> ms</p>\n",
        "<script>fetch('/api/status').then(r=>r.json())",
        ".then(j=>document.getElementById('up').textContent=j.uptime_ms)</script>\n",
        "</body></html>\n",
    )
    .as_bytes(),
};

pub const NOT_FOUND_HTML: File = File {
    name: "/404.html",
    data: concat!(
        "HTTP/1.0 404 File not found\r\n",
        "Server: uIP/0.9\r\n",
        "Content-type: text/html\r\n",
        "\r\n",
        "<html><body><h1>404 - file not found</h1></body></html>\n",
    )
    .as_bytes(),
};

pub static FILES: &[File] = &[INDEX_HTML, NOT_FOUND_HTML];

pub fn open(name: &str) -> Option<&'static File> {
    FILES.iter().find(|file| file.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup() {
        assert_eq!(open("/index.html"), Some(&INDEX_HTML));
        assert_eq!(open("/404.html").map(|f| f.name), Some("/404.html"));
        assert_eq!(open("/index.htm"), None);
        assert_eq!(open(""), None);
    }

    #[test]
    fn files_are_responses() {
        for file in FILES {
            assert!(file.data.starts_with(b"HTTP/1.0 "));
            assert!(file.data.windows(4).any(|w| w == b"\r\n\r\n"));
        }
    }
}
