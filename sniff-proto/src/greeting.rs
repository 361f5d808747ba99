/// TLS ClientHello greeting parser.
///
/// Parses the first read from a fresh connection far enough to recover the
/// SNI host name. The whole ClientHello must arrive in that read: the record
/// and handshake lengths have to match the buffer exactly.
///
/// TLS record format:
///   ContentType(1) | Version(2) | Length(2) | Fragment...
///
/// Handshake:
///   HandshakeType(1) | Length(3) | ClientHello...
///
/// ClientHello:
///   Version(2) | Random(32) | SessionID(var) | CipherSuites(var) |
///   CompressionMethods(var) | Extensions(var)
use crate::error::ParseError;
use crate::extension::{walk_extension, Step};
use crate::wire::Cursor;

/// Handshake record, TLS 1.0 record-layer version.
pub const TLS_MAGIC: [u8; 3] = [0x16, 0x03, 0x01];
pub const HANDSHAKE_CLIENT_HELLO: u8 = 0x01;

const RECORD_PREFIX_LEN: usize = 5;
const HANDSHAKE_PREFIX_LEN: usize = 4;
/// magic(3) + length(2) + type(1) + length(3) + version(2) + random(32)
pub const RECORD_HEADER_LEN: usize = 43;

/// What the parser learned from a ClientHello.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientHello {
    /// `legacy_version` from the ClientHello body.
    pub version: u16,
    /// SNI host name, if the client sent one.
    pub hostname: Option<String>,
    /// Number of extensions walked.
    pub extensions: usize,
}

/// Parse one complete ClientHello record from `buf`.
pub fn parse_client_hello(buf: &[u8]) -> Result<ClientHello, ParseError> {
    if buf.len() <= RECORD_HEADER_LEN {
        return Err(ParseError::TooShort(buf.len()));
    }

    let mut cur = Cursor::new(buf);

    if cur.take(TLS_MAGIC.len())? != &TLS_MAGIC[..] {
        return Err(ParseError::BadMagic);
    }
    let record_len = cur.u16()? as usize;
    let hs_type = cur.u8()?;
    let hs_len = cur.u24()? as usize;

    if hs_type != HANDSHAKE_CLIENT_HELLO {
        return Err(ParseError::NotClientHello(hs_type));
    }
    if record_len != buf.len() - RECORD_PREFIX_LEN {
        return Err(ParseError::RecordLength {
            declared: record_len,
            actual: buf.len() - RECORD_PREFIX_LEN,
        });
    }
    // record_len >= RECORD_HEADER_LEN - RECORD_PREFIX_LEN here, so no underflow.
    if hs_len != record_len - HANDSHAKE_PREFIX_LEN {
        return Err(ParseError::HandshakeLength {
            declared: hs_len,
            actual: record_len - HANDSHAKE_PREFIX_LEN,
        });
    }

    let version = cur.u16()?;
    cur.skip(32)?; // random

    let session_id = cur.skip_vec_u8()?;
    let cipher_suites = cur.skip_vec_u16()?;
    let compression = cur.skip_vec_u8()?;
    tracing::trace!(session_id, cipher_suites, compression, "skipped ClientHello vectors");

    // Extensions are the last ClientHello field: the block must end exactly
    // where the handshake body does.
    let ext_len = cur.u16()? as usize;
    if ext_len > cur.remaining() {
        return Err(ParseError::ExtensionsOverrun {
            declared: ext_len,
            remaining: cur.remaining(),
        });
    }
    if ext_len < cur.remaining() {
        return Err(ParseError::TrailingBytes {
            declared: ext_len,
            remaining: cur.remaining(),
        });
    }
    let mut exts = cur.sub(ext_len)?;

    let mut hostname = None;
    let mut extensions = 0;
    while let Step::Consumed(_) = walk_extension(&mut exts, &mut hostname)? {
        extensions += 1;
    }

    Ok(ClientHello {
        version,
        hostname,
        extensions,
    })
}
