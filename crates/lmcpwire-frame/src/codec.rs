use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};
use crate::name::MessageName;

/// Opens the sentinel; the decimal total length follows.
pub const SENTINEL_START: &[u8; 8] = b"+=+=+=+=";

/// Closes the sentinel; the attribute block follows.
pub const SENTINEL_END: &[u8; 8] = b"#@#@#@#@";

/// Opens the footer; the decimal checksum follows.
pub const FOOTER_START: &[u8; 8] = b"!%!%!%!%";

/// Closes the footer and the envelope.
pub const FOOTER_END: &[u8; 8] = b"?^?^?^?^";

/// Fixed header constant counted into the declared total length.
pub const HEADER_SIZE: usize = 8;

/// Fixed checksum-size constant counted into the declared total length.
pub const CHECKSUM_SIZE: usize = 4;

/// Default maximum declared envelope length accepted by the decoder: 16 MiB.
pub const DEFAULT_MAX_ENVELOPE: usize = 16 * 1024 * 1024;

/// Serialization format tag written into every attribute block.
pub const LMCP_FORMAT: &str = "lmcp";

/// Longest decimal field accepted by the decoder (`u32::MAX` has 10 digits).
const MAX_DECIMAL_DIGITS: usize = 10;

const MARKER_LEN: usize = 8;

/// Parsed attribute block: `<type>$<format>|<type name>|<group>|<entity>|<service>$`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attributes {
    pub content_type: String,
    pub format: String,
    pub type_name: String,
    pub group: String,
    pub entity_id: u64,
    pub service_id: u64,
}

/// A decoded envelope.
#[derive(Debug, Clone)]
pub struct Envelope {
    /// Message name taken from the attribute block's content type.
    pub name: MessageName,
    pub attributes: Attributes,
    /// The opaque payload that followed the attribute block.
    pub payload: Bytes,
    /// Checksum carried in the footer (already verified).
    pub checksum: u32,
    declared_length: usize,
}

impl Envelope {
    /// Total length this envelope declared in its sentinel.
    pub fn declared_length(&self) -> usize {
        self.declared_length
    }
}

/// The attribute block written in front of every payload.
pub fn attributes(name: &MessageName) -> String {
    format!("{name}${LMCP_FORMAT}|{name}||0|0$")
}

/// Additive checksum: wrapping `u32` sum of every byte.
pub fn checksum(data: &[u8]) -> u32 {
    checksum_parts(&[data])
}

/// [`checksum`] over the concatenation of `parts`, without concatenating them.
pub fn checksum_parts(parts: &[&[u8]]) -> u32 {
    parts
        .iter()
        .flat_map(|part| part.iter())
        .fold(0u32, |sum, &byte| sum.wrapping_add(u32::from(byte)))
}

/// Total length the sentinel declares for `payload_len` bytes under `name`.
pub fn declared_length(payload_len: usize, name: &MessageName) -> usize {
    2 * name.as_str().len() + LMCP_FORMAT.len() + 8 + payload_len + HEADER_SIZE + CHECKSUM_SIZE
}

/// Frame a payload into a fresh envelope.
pub fn frame(payload: &[u8], name: &MessageName) -> Bytes {
    let mut dst = BytesMut::new();
    encode_envelope(payload, name, &mut dst);
    dst.freeze()
}

/// Append the envelope for `payload` to `dst`.
///
/// Wire format:
/// ```text
/// +=+=+=+= <total length> #@#@#@#@
/// <name>$lmcp|<name>||0|0$ <payload>
/// !%!%!%!% <checksum> ?^?^?^?^
/// ```
/// Both numbers are unpadded decimal ASCII. The total length counts the
/// attribute block, the payload, and the header and checksum constants.
/// The checksum covers the attribute block and the payload.
pub fn encode_envelope(payload: &[u8], name: &MessageName, dst: &mut BytesMut) {
    let attrs = attributes(name);
    let total = (attrs.len() + payload.len() + HEADER_SIZE + CHECKSUM_SIZE).to_string();
    let sum = checksum_parts(&[attrs.as_bytes(), payload]).to_string();

    dst.reserve(4 * MARKER_LEN + total.len() + attrs.len() + payload.len() + sum.len());
    dst.put_slice(SENTINEL_START);
    dst.put_slice(total.as_bytes());
    dst.put_slice(SENTINEL_END);
    dst.put_slice(attrs.as_bytes());
    dst.put_slice(payload);
    dst.put_slice(FOOTER_START);
    dst.put_slice(sum.as_bytes());
    dst.put_slice(FOOTER_END);
}

enum Scan<T> {
    Incomplete,
    Invalid,
    Found(T),
}

/// Match `marker` at `at`, tolerating a buffer that ends inside it.
fn scan_marker(buf: &[u8], at: usize, marker: &[u8; MARKER_LEN]) -> Scan<usize> {
    let available = buf.len().saturating_sub(at).min(MARKER_LEN);
    if buf[at..at + available] != marker[..available] {
        return Scan::Invalid;
    }
    if available < MARKER_LEN {
        return Scan::Incomplete;
    }
    Scan::Found(at + MARKER_LEN)
}

/// Parse `<digits><close>` at `at`, returning the value and the end offset.
fn scan_number(buf: &[u8], at: usize, close: &[u8; MARKER_LEN]) -> Scan<(u64, usize)> {
    let digits = buf[at..].iter().take_while(|b| b.is_ascii_digit()).count();
    if digits > MAX_DECIMAL_DIGITS {
        return Scan::Invalid;
    }
    let after = at + digits;
    if after == buf.len() {
        return Scan::Incomplete;
    }
    if digits == 0 {
        return Scan::Invalid;
    }

    let end = match scan_marker(buf, after, close) {
        Scan::Found(end) => end,
        Scan::Incomplete => return Scan::Incomplete,
        Scan::Invalid => return Scan::Invalid,
    };

    let value = buf[at..after]
        .iter()
        .fold(0u64, |acc, b| acc * 10 + u64::from(b - b'0'));
    Scan::Found((value, end))
}

/// Decode one envelope from the front of `src`.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete envelope yet.
/// On success, consumes the envelope bytes from the buffer.
pub fn decode_envelope(src: &mut BytesMut, max_envelope: usize) -> Result<Option<Envelope>> {
    let buf = &src[..];

    let after_start = match scan_marker(buf, 0, SENTINEL_START) {
        Scan::Found(end) => end,
        Scan::Incomplete => return Ok(None),
        Scan::Invalid => return Err(FrameError::InvalidSentinel),
    };

    let (declared, body_start) = match scan_number(buf, after_start, SENTINEL_END) {
        Scan::Found(found) => found,
        Scan::Incomplete => return Ok(None),
        Scan::Invalid => return Err(FrameError::InvalidLength),
    };

    let declared = usize::try_from(declared).map_err(|_| FrameError::InvalidLength)?;
    if declared < HEADER_SIZE + CHECKSUM_SIZE {
        return Err(FrameError::InvalidLength);
    }
    if declared > max_envelope {
        return Err(FrameError::EnvelopeTooLarge {
            size: declared,
            max: max_envelope,
        });
    }

    let content_len = declared - HEADER_SIZE - CHECKSUM_SIZE;
    let footer_start = body_start + content_len;
    if buf.len() <= footer_start {
        return Ok(None);
    }

    let after_footer_start = match scan_marker(buf, footer_start, FOOTER_START) {
        Scan::Found(end) => end,
        Scan::Incomplete => return Ok(None),
        Scan::Invalid => return Err(FrameError::InvalidFooter),
    };

    let (expected, envelope_end) = match scan_number(buf, after_footer_start, FOOTER_END) {
        Scan::Found(found) => found,
        Scan::Incomplete => return Ok(None),
        Scan::Invalid => return Err(FrameError::InvalidFooter),
    };
    let expected = u32::try_from(expected).map_err(|_| FrameError::InvalidFooter)?;

    let content = &buf[body_start..footer_start];
    let actual = checksum(content);
    if actual != expected {
        return Err(FrameError::ChecksumMismatch { expected, actual });
    }

    let (attributes, attr_len) = parse_attributes(content)?;
    let name = MessageName::new(attributes.content_type.clone())
        .map_err(|_| FrameError::InvalidAttributes("content type is not a valid message name"))?;

    src.advance(body_start);
    let content = src.split_to(content_len).freeze();
    src.advance(envelope_end - footer_start);

    Ok(Some(Envelope {
        name,
        attributes,
        payload: content.slice(attr_len..),
        checksum: expected,
        declared_length: declared,
    }))
}

/// Split the attribute block off the addressed content.
fn parse_attributes(content: &[u8]) -> Result<(Attributes, usize)> {
    let type_end = content
        .iter()
        .position(|&b| b == b'$')
        .ok_or(FrameError::InvalidAttributes("missing '$' after content type"))?;
    let descriptor_len = content[type_end + 1..]
        .iter()
        .position(|&b| b == b'$')
        .ok_or(FrameError::InvalidAttributes("unterminated descriptor"))?;
    let block_end = type_end + 1 + descriptor_len;

    let content_type = std::str::from_utf8(&content[..type_end])
        .map_err(|_| FrameError::InvalidAttributes("content type is not UTF-8"))?;
    let descriptor = std::str::from_utf8(&content[type_end + 1..block_end])
        .map_err(|_| FrameError::InvalidAttributes("descriptor is not UTF-8"))?;

    let fields: Vec<&str> = descriptor.split('|').collect();
    let [format, type_name, group, entity, service] = fields.as_slice() else {
        return Err(FrameError::InvalidAttributes("descriptor must have five fields"));
    };

    let entity_id = entity
        .parse::<u64>()
        .map_err(|_| FrameError::InvalidAttributes("entity id is not a number"))?;
    let service_id = service
        .parse::<u64>()
        .map_err(|_| FrameError::InvalidAttributes("service id is not a number"))?;

    let attributes = Attributes {
        content_type: content_type.to_string(),
        format: format.to_string(),
        type_name: type_name.to_string(),
        group: group.to_string(),
        entity_id,
        service_id,
    };
    Ok((attributes, block_end + 1))
}

/// Configuration for envelope reading and writing.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum declared envelope length in bytes. Default: 16 MiB.
    pub max_envelope_size: usize,
    /// Read timeout for blocking operations.
    pub read_timeout: Option<std::time::Duration>,
    /// Write timeout for blocking operations.
    pub write_timeout: Option<std::time::Duration>,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_envelope_size: DEFAULT_MAX_ENVELOPE,
            read_timeout: None,
            write_timeout: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> MessageName {
        MessageName::new(s).unwrap()
    }

    #[test]
    fn test_ping_example_layout() {
        let ping = name("afrl.cmasi.Ping");
        let attrs = attributes(&ping);
        assert_eq!(attrs, "afrl.cmasi.Ping$lmcp|afrl.cmasi.Ping||0|0$");
        assert_eq!(attrs.len(), 42);

        let wire = frame(&[0x01, 0x02, 0x03], &ping);

        let attr_sum: u32 = attrs.bytes().map(u32::from).sum();
        let expected_sum = attr_sum + 6;
        assert_eq!(expected_sum, 3970);

        let mut expected = Vec::new();
        expected.extend_from_slice(b"+=+=+=+=57#@#@#@#@");
        expected.extend_from_slice(attrs.as_bytes());
        expected.extend_from_slice(&[0x01, 0x02, 0x03]);
        expected.extend_from_slice(b"!%!%!%!%3970?^?^?^?^");
        assert_eq!(wire.as_ref(), expected.as_slice());
        assert_eq!(declared_length(3, &ping), 57);
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let msg = name("afrl.cmasi.AirVehicleState");
        let mut buf = BytesMut::new();
        encode_envelope(b"hello, amase!", &msg, &mut buf);

        let envelope = decode_envelope(&mut buf, DEFAULT_MAX_ENVELOPE)
            .unwrap()
            .unwrap();

        assert_eq!(envelope.name, msg);
        assert_eq!(envelope.payload.as_ref(), b"hello, amase!");
        assert_eq!(envelope.attributes.format, "lmcp");
        assert_eq!(envelope.attributes.type_name, msg.as_str());
        assert_eq!(envelope.attributes.group, "");
        assert_eq!(envelope.attributes.entity_id, 0);
        assert_eq!(envelope.attributes.service_id, 0);
        assert_eq!(envelope.declared_length(), declared_length(13, &msg));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_empty_payload() {
        let msg = name("afrl.cmasi.Ping");
        let wire = frame(b"", &msg);
        assert!(wire.starts_with(b"+=+=+=+=54#@#@#@#@"));

        let mut buf = BytesMut::from(wire.as_ref());
        let envelope = decode_envelope(&mut buf, DEFAULT_MAX_ENVELOPE)
            .unwrap()
            .unwrap();
        assert!(envelope.payload.is_empty());
        assert_eq!(envelope.checksum, 3964);
    }

    #[test]
    fn test_payload_with_dollar_signs() {
        let msg = name("afrl.cmasi.KeyValuePair");
        let mut buf = BytesMut::new();
        encode_envelope(b"$$|$", &msg, &mut buf);

        let envelope = decode_envelope(&mut buf, DEFAULT_MAX_ENVELOPE)
            .unwrap()
            .unwrap();
        assert_eq!(envelope.payload.as_ref(), b"$$|$");
    }

    #[test]
    fn test_checksum_wraps() {
        let data = vec![0xFF; (u32::MAX / 0xFF) as usize + 2];
        let expected = (data.len() as u64 * 0xFF) % (1u64 << 32);
        assert_eq!(u64::from(checksum(&data)), expected);
    }

    #[test]
    fn test_checksum_parts_matches_concatenation() {
        assert_eq!(
            checksum_parts(&[&b"abc"[..], &b""[..], &b"\x80\xFF"[..]]),
            checksum(b"abc\x80\xFF")
        );
    }

    #[test]
    fn test_decode_every_prefix_is_incomplete() {
        let wire = frame(b"partial", &name("afrl.cmasi.Ping"));
        for cut in 0..wire.len() {
            let mut buf = BytesMut::from(&wire[..cut]);
            let result = decode_envelope(&mut buf, DEFAULT_MAX_ENVELOPE).unwrap();
            assert!(result.is_none(), "prefix of {cut} bytes decoded");
            assert_eq!(buf.len(), cut);
        }
    }

    #[test]
    fn test_decode_invalid_sentinel() {
        let mut buf = BytesMut::from(&b"+=+-"[..]);
        let result = decode_envelope(&mut buf, DEFAULT_MAX_ENVELOPE);
        assert!(matches!(result, Err(FrameError::InvalidSentinel)));
    }

    #[test]
    fn test_decode_invalid_length() {
        for wire in [
            &b"+=+=+=+=#@#@#@#@"[..],
            &b"+=+=+=+=12x"[..],
            &b"+=+=+=+=12345678901#@#@#@#@"[..],
            &b"+=+=+=+=11#@#@#@#@"[..],
        ] {
            let mut buf = BytesMut::from(wire);
            let result = decode_envelope(&mut buf, DEFAULT_MAX_ENVELOPE);
            assert!(
                matches!(result, Err(FrameError::InvalidLength)),
                "{:?}",
                String::from_utf8_lossy(wire)
            );
        }
    }

    #[test]
    fn test_decode_envelope_too_large() {
        let mut buf = BytesMut::from(&b"+=+=+=+=4096#@#@#@#@"[..]);
        let result = decode_envelope(&mut buf, 1024);
        assert!(matches!(
            result,
            Err(FrameError::EnvelopeTooLarge {
                size: 4096,
                max: 1024
            })
        ));
    }

    #[test]
    fn test_decode_checksum_mismatch() {
        let wire = frame(b"abc", &name("afrl.cmasi.Ping"));
        let mut corrupted = wire.to_vec();
        // Flip a payload byte; the declared length still lines up.
        let payload_at = corrupted.len() - b"!%!%!%!%".len() - 4 - b"?^?^?^?^".len() - 1;
        corrupted[payload_at] = b'z';

        let mut buf = BytesMut::from(corrupted.as_slice());
        let result = decode_envelope(&mut buf, DEFAULT_MAX_ENVELOPE);
        assert!(matches!(result, Err(FrameError::ChecksumMismatch { .. })));
    }

    #[test]
    fn test_decode_invalid_footer() {
        let wire = frame(b"abc", &name("afrl.cmasi.Ping"));
        let mut corrupted = wire.to_vec();
        let footer_at = corrupted.len() - b"!%!%!%!%4258?^?^?^?^".len();
        corrupted[footer_at] = b'X';

        let mut buf = BytesMut::from(corrupted.as_slice());
        let result = decode_envelope(&mut buf, DEFAULT_MAX_ENVELOPE);
        assert!(matches!(result, Err(FrameError::InvalidFooter)));
    }

    #[test]
    fn test_decode_invalid_attributes() {
        let content = b"no-delimiters-here";
        let mut wire = Vec::new();
        wire.extend_from_slice(SENTINEL_START);
        wire.extend_from_slice((content.len() + 12).to_string().as_bytes());
        wire.extend_from_slice(SENTINEL_END);
        wire.extend_from_slice(content);
        wire.extend_from_slice(FOOTER_START);
        wire.extend_from_slice(checksum(content).to_string().as_bytes());
        wire.extend_from_slice(FOOTER_END);

        let mut buf = BytesMut::from(wire.as_slice());
        let result = decode_envelope(&mut buf, DEFAULT_MAX_ENVELOPE);
        assert!(matches!(result, Err(FrameError::InvalidAttributes(_))));
    }

    #[test]
    fn test_multiple_envelopes() {
        let mut buf = BytesMut::new();
        encode_envelope(b"first", &name("afrl.cmasi.AirVehicleConfiguration"), &mut buf);
        encode_envelope(b"second", &name("afrl.cmasi.AirVehicleState"), &mut buf);

        let e1 = decode_envelope(&mut buf, DEFAULT_MAX_ENVELOPE)
            .unwrap()
            .unwrap();
        assert_eq!(e1.name.as_str(), "afrl.cmasi.AirVehicleConfiguration");
        assert_eq!(e1.payload.as_ref(), b"first");

        let e2 = decode_envelope(&mut buf, DEFAULT_MAX_ENVELOPE)
            .unwrap()
            .unwrap();
        assert_eq!(e2.name.as_str(), "afrl.cmasi.AirVehicleState");
        assert_eq!(e2.payload.as_ref(), b"second");

        assert!(buf.is_empty());
    }

    #[test]
    fn test_declared_length_comes_from_sentinel() {
        // Zero-padded entity id: re-rendering the attributes would come out
        // two bytes short.
        let content = b"a.B$lmcp|a.B||007|0$xyz";
        let mut wire = Vec::new();
        wire.extend_from_slice(b"+=+=+=+=35#@#@#@#@");
        wire.extend_from_slice(content);
        wire.extend_from_slice(format!("!%!%!%!%{}?^?^?^?^", checksum(content)).as_bytes());

        let mut buf = BytesMut::from(wire.as_slice());
        let envelope = decode_envelope(&mut buf, DEFAULT_MAX_ENVELOPE)
            .unwrap()
            .unwrap();

        assert_eq!(envelope.attributes.entity_id, 7);
        assert_eq!(envelope.payload.as_ref(), b"xyz");
        assert_eq!(envelope.declared_length(), 35);
        assert!(buf.is_empty());
    }
}
