//! Canonical object encoding.
//!
//! ```text
//! <kind> SP <decimal payload length> NUL <payload bytes>
//! ```
//!
//! The same bytes are hashed to produce the object id and compressed to
//! produce the loose object file.
//!
//! Decoding locates the payload by the first NUL byte. The header cannot
//! contain a NUL, so the first NUL is always the header terminator no matter
//! what the payload holds. The declared length is then checked against the
//! actual tail length; it is never used to find the payload.

use loam_types::ObjectKind;

use crate::error::{StoreError, StoreResult};

/// Parsed canonical header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Header {
    pub kind: ObjectKind,
    /// Length declared in the header.
    pub declared_len: usize,
    /// Offset of the first payload byte (one past the NUL).
    pub payload_offset: usize,
}

/// Encode an object into its canonical byte layout.
pub fn encode(kind: ObjectKind, payload: &[u8]) -> Vec<u8> {
    let header = kind.header(payload.len());
    let mut out = Vec::with_capacity(header.len() + payload.len());
    out.extend_from_slice(&header);
    out.extend_from_slice(payload);
    out
}

/// Parse the header of a canonical encoding without touching the payload.
pub fn parse_header(bytes: &[u8]) -> StoreResult<Header> {
    let nul = bytes
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| StoreError::MalformedObject("missing NUL header terminator".into()))?;
    let header = &bytes[..nul];

    let space = header
        .iter()
        .position(|&b| b == b' ')
        .ok_or_else(|| StoreError::MalformedObject("header has no kind/length separator".into()))?;
    let (token, len) = (&header[..space], &header[space + 1..]);

    let kind = ObjectKind::from_token(token).ok_or_else(|| {
        StoreError::MalformedObject(format!(
            "unknown object kind {:?}",
            String::from_utf8_lossy(token)
        ))
    })?;

    if len.is_empty() || !len.iter().all(u8::is_ascii_digit) {
        return Err(StoreError::MalformedObject(format!(
            "invalid length field {:?}",
            String::from_utf8_lossy(len)
        )));
    }
    // All ASCII digits, so the only failure left is overflow.
    let declared_len = std::str::from_utf8(len)
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .ok_or_else(|| StoreError::MalformedObject("length field overflows".into()))?;

    Ok(Header {
        kind,
        declared_len,
        payload_offset: nul + 1,
    })
}

/// Decode a canonical encoding into its kind and payload.
///
/// The payload is borrowed from `bytes` verbatim.
pub fn decode(bytes: &[u8]) -> StoreResult<(ObjectKind, &[u8])> {
    let header = parse_header(bytes)?;
    let payload = &bytes[header.payload_offset..];
    if payload.len() != header.declared_len {
        return Err(StoreError::MalformedObject(format!(
            "header declares {} bytes but payload has {}",
            header.declared_len,
            payload.len()
        )));
    }
    Ok((header.kind, payload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn encode_hello_blob() {
        assert_eq!(encode(ObjectKind::Blob, b"hello\n"), b"blob 6\0hello\n".to_vec());
    }

    #[test]
    fn decode_without_nul_is_malformed() {
        let err = decode(b"blob 6 hello").unwrap_err();
        assert!(matches!(err, StoreError::MalformedObject(_)));
    }

    #[test]
    fn decode_empty_input_is_malformed() {
        assert!(matches!(decode(b""), Err(StoreError::MalformedObject(_))));
    }

    #[test]
    fn payload_with_embedded_nul_is_kept_verbatim() {
        let payload = b"\0a\0b\0";
        let bytes = encode(ObjectKind::Blob, payload);
        let (kind, decoded) = decode(&bytes).unwrap();
        assert_eq!(kind, ObjectKind::Blob);
        assert_eq!(decoded, payload);
    }

    #[test]
    fn declared_length_mismatch_rejected() {
        let err = decode(b"blob 5\0hello\n").unwrap_err();
        assert!(matches!(err, StoreError::MalformedObject(msg) if msg.contains("declares 5")));
    }

    #[test]
    fn unknown_kind_rejected() {
        assert!(matches!(
            decode(b"tag 0\0"),
            Err(StoreError::MalformedObject(_))
        ));
    }

    #[test]
    fn bad_length_field_rejected() {
        for bytes in [&b"blob \0"[..], b"blob -1\0", b"blob 1x\0x", b"blob\0"] {
            assert!(
                matches!(decode(bytes), Err(StoreError::MalformedObject(_))),
                "accepted {bytes:?}"
            );
        }
    }

    #[test]
    fn parse_header_reports_offset() {
        let header = parse_header(b"commit 12\0tree abc...").unwrap();
        assert_eq!(header.kind, ObjectKind::Commit);
        assert_eq!(header.declared_len, 12);
        assert_eq!(header.payload_offset, 10);
    }

    fn any_kind() -> impl Strategy<Value = ObjectKind> {
        prop_oneof![
            Just(ObjectKind::Blob),
            Just(ObjectKind::Tree),
            Just(ObjectKind::Commit),
        ]
    }

    proptest! {
        #[test]
        fn decode_inverts_encode(kind in any_kind(), payload in proptest::collection::vec(any::<u8>(), 0..256)) {
            let bytes = encode(kind, &payload);
            let (k, p) = decode(&bytes).unwrap();
            prop_assert_eq!(k, kind);
            prop_assert_eq!(p, payload.as_slice());
        }
    }
}
