//! Catch-all DNS responder: every name resolves to the device.

use super::Ipv4Address;

pub const PORT: u16 = 53;
pub const HEADER_LEN: usize = 12;
/// Name pointer plus the A record.
pub const ANSWER_LEN: usize = 16;
pub const RESPONSE_FLAGS: u16 = 0x8180;
pub const TTL_SECS: u32 = 300;

const TYPE_A: u16 = 1;
const CLASS_IN: u16 = 1;

/// Turns the query in `buf[..len]` into a one-answer response in place.
///
/// The question is kept as sent and answered with `host`. Returns the
/// response length, `len + 16`.
pub fn answer(buf: &mut [u8], len: usize, host: Ipv4Address) -> Option<usize> {
    if len < HEADER_LEN || buf.len() < len + ANSWER_LEN {
        return None;
    }
    trace!("dns: query of {=usize} bytes", len);

    buf[2..4].copy_from_slice(&RESPONSE_FLAGS.to_be_bytes());
    buf[4..6].copy_from_slice(&1u16.to_be_bytes());
    buf[6..8].copy_from_slice(&1u16.to_be_bytes());
    buf[8..12].fill(0);

    let answer = &mut buf[len..len + ANSWER_LEN];
    // compressed name pointing at the first question
    answer[0] = 0xC0;
    answer[1] = HEADER_LEN as u8;
    answer[2..4].copy_from_slice(&TYPE_A.to_be_bytes());
    answer[4..6].copy_from_slice(&CLASS_IN.to_be_bytes());
    answer[6..10].copy_from_slice(&TTL_SECS.to_be_bytes());
    answer[10..12].copy_from_slice(&4u16.to_be_bytes());
    answer[12..16].copy_from_slice(host.as_bytes());

    Some(len + ANSWER_LEN)
}

#[cfg(test)]
mod tests {
    use super::*;

    // "example.com" A IN, id 0xBEEF, recursion desired
    const QUERY: [u8; 29] = [
        0xBE, 0xEF, 0x01, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, //
        7, b'e', b'x', b'a', b'm', b'p', b'l', b'e', 3, b'c', b'o', b'm', 0, //
        0x00, 0x01, 0x00, 0x01,
    ];

    #[test]
    fn answers_with_host_address() {
        let mut buf = [0u8; 64];
        buf[..QUERY.len()].copy_from_slice(&QUERY);

        let len = answer(&mut buf, QUERY.len(), Ipv4Address::new(172, 16, 42, 1)).unwrap();
        assert_eq!(len, QUERY.len() + 16);

        assert_eq!(&buf[..12], &[0xBE, 0xEF, 0x81, 0x80, 0, 1, 0, 1, 0, 0, 0, 0]);
        assert_eq!(&buf[12..QUERY.len()], &QUERY[12..]);
        assert_eq!(
            &buf[QUERY.len()..len],
            &[0xC0, 0x0C, 0, 1, 0, 1, 0, 0, 0x01, 0x2C, 0, 4, 172, 16, 42, 1]
        );
    }

    #[test]
    fn needs_room_for_the_answer() {
        let mut buf = QUERY;
        assert_eq!(answer(&mut buf, QUERY.len(), Ipv4Address::new(1, 2, 3, 4)), None);
        assert_eq!(answer(&mut [0u8; 64], 11, Ipv4Address::new(1, 2, 3, 4)), None);
    }
}
