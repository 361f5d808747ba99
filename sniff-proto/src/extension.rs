/// ClientHello extension walker.
///
/// Extension:
///   Type(2) | Length(2) | Payload(Length)
///
/// server_name payload (type 0x0000, RFC 6066 §3):
///   ServerNameList length(2) | NameType(1) | HostName length(2) | HostName...
///
/// Only a single host_name entry filling the whole list is accepted. The three
/// lengths must agree with each other, which keeps the host slice inside the
/// extension even when every length field is attacker-chosen.
use crate::error::ParseError;
use crate::wire::{u16_be, Cursor};

pub const EXT_SERVER_NAME: u16 = 0x0000;
pub const NAME_TYPE_HOST: u8 = 0x00;

const EXT_HEADER_LEN: usize = 4;
/// list length(2) + name type(1) + host length(2)
const SNI_HEADER_LEN: usize = 5;

/// Outcome of one walker step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// One extension consumed: header plus payload.
    Consumed(usize),
    /// Fewer than 4 bytes left; the extensions block is finished.
    End,
}

/// Interpret the next extension at `cur`.
///
/// On `Consumed(n)` the cursor has advanced by exactly `n`. On error the
/// cursor position is unspecified and the caller must stop.
pub fn walk_extension(
    cur: &mut Cursor<'_>,
    hostname: &mut Option<String>,
) -> Result<Step, ParseError> {
    if cur.remaining() < EXT_HEADER_LEN {
        return Ok(Step::End);
    }

    let ext_type = cur.u16()?;
    let declared = cur.u16()? as usize;

    if declared > cur.remaining() {
        return Err(ParseError::ExtensionOverrun {
            ext_type,
            declared,
            remaining: cur.remaining(),
        });
    }

    let payload = cur.take(declared)?;

    if ext_type == EXT_SERVER_NAME {
        if hostname.is_some() {
            return Err(ParseError::DuplicateSni);
        }
        *hostname = Some(parse_server_name(payload)?);
    }

    Ok(Step::Consumed(declared + EXT_HEADER_LEN))
}

/// Decode a server_name extension payload into its host name.
pub fn parse_server_name(payload: &[u8]) -> Result<String, ParseError> {
    if payload.len() < SNI_HEADER_LEN {
        return Err(ParseError::SniTooShort(payload.len()));
    }

    let list_len = u16_be(&payload[0..2]) as usize;
    let name_type = payload[2];
    let host_len = u16_be(&payload[3..5]) as usize;

    check_server_name_lengths(payload.len(), list_len, host_len)?;
    if name_type != NAME_TYPE_HOST {
        return Err(ParseError::SniNameType(name_type));
    }

    let host = &payload[SNI_HEADER_LEN..SNI_HEADER_LEN + host_len];
    match std::str::from_utf8(host) {
        Ok(s) if !s.is_empty() => Ok(s.to_owned()),
        _ => Err(ParseError::InvalidHostname),
    }
}

/// The list must fill the extension after its own prefix, and the host name
/// must fill the list after the entry header.
fn check_server_name_lengths(
    ext_len: usize,
    list_len: usize,
    host_len: usize,
) -> Result<(), ParseError> {
    let consistent = ext_len >= SNI_HEADER_LEN
        && list_len == ext_len - 2
        && host_len == list_len - 3;

    if consistent {
        Ok(())
    } else {
        Err(ParseError::SniMismatch {
            ext_len,
            list_len,
            host_len,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sni_payload(host: &[u8]) -> Vec<u8> {
        let mut p = Vec::new();
        p.extend_from_slice(&((host.len() + 3) as u16).to_be_bytes());
        p.push(NAME_TYPE_HOST);
        p.extend_from_slice(&(host.len() as u16).to_be_bytes());
        p.extend_from_slice(host);
        p
    }

    fn ext(ext_type: u16, payload: &[u8]) -> Vec<u8> {
        let mut e = Vec::new();
        e.extend_from_slice(&ext_type.to_be_bytes());
        e.extend_from_slice(&(payload.len() as u16).to_be_bytes());
        e.extend_from_slice(payload);
        e
    }

    #[test]
    fn test_short_tail_is_clean_end() {
        for n in 0..4 {
            let buf = vec![0xffu8; n];
            let mut cur = Cursor::new(&buf);
            let mut host = None;
            assert_eq!(walk_extension(&mut cur, &mut host), Ok(Step::End));
            assert!(host.is_none());
        }
    }

    #[test]
    fn test_non_sni_extension_is_skipped() {
        let buf = ext(0x0010, b"\x00\x03\x02h2");
        let mut cur = Cursor::new(&buf);
        let mut host = None;
        assert_eq!(walk_extension(&mut cur, &mut host), Ok(Step::Consumed(buf.len())));
        assert!(cur.is_empty());
        assert!(host.is_none());
    }

    #[test]
    fn test_sni_extracted() {
        let buf = ext(EXT_SERVER_NAME, &sni_payload(b"example.com"));
        let mut cur = Cursor::new(&buf);
        let mut host = None;
        assert_eq!(walk_extension(&mut cur, &mut host), Ok(Step::Consumed(buf.len())));
        assert_eq!(host.as_deref(), Some("example.com"));
    }

    #[test]
    fn test_declared_length_past_end() {
        let mut buf = ext(0x0017, &[0u8; 8]);
        buf.truncate(buf.len() - 1);
        let mut cur = Cursor::new(&buf);
        let mut host = None;
        assert_eq!(
            walk_extension(&mut cur, &mut host),
            Err(ParseError::ExtensionOverrun {
                ext_type: 0x0017,
                declared: 8,
                remaining: 7
            })
        );
    }

    #[test]
    fn test_host_length_larger_than_payload() {
        let mut payload = sni_payload(b"example.com");
        payload[4] += 1;
        assert!(matches!(
            parse_server_name(&payload),
            Err(ParseError::SniMismatch { .. })
        ));
    }

    #[test]
    fn test_list_length_mismatch() {
        let mut payload = sni_payload(b"example.com");
        payload[1] -= 1;
        assert!(matches!(
            parse_server_name(&payload),
            Err(ParseError::SniMismatch { .. })
        ));
    }

    #[test]
    fn test_wrong_name_type() {
        let mut payload = sni_payload(b"example.com");
        payload[2] = 1;
        assert_eq!(parse_server_name(&payload), Err(ParseError::SniNameType(1)));
    }

    #[test]
    fn test_empty_and_binary_hosts_rejected() {
        assert_eq!(parse_server_name(&sni_payload(b"")), Err(ParseError::InvalidHostname));
        assert_eq!(
            parse_server_name(&sni_payload(&[0xff, 0xfe])),
            Err(ParseError::InvalidHostname)
        );
        assert_eq!(parse_server_name(&[0, 1, 0, 0]), Err(ParseError::SniTooShort(4)));
    }

    #[test]
    fn test_second_sni_rejected() {
        let mut buf = ext(EXT_SERVER_NAME, &sni_payload(b"a.example"));
        buf.extend(ext(EXT_SERVER_NAME, &sni_payload(b"b.example")));
        let mut cur = Cursor::new(&buf);
        let mut host = None;
        assert!(matches!(walk_extension(&mut cur, &mut host), Ok(Step::Consumed(_))));
        assert_eq!(walk_extension(&mut cur, &mut host), Err(ParseError::DuplicateSni));
        assert_eq!(host.as_deref(), Some("a.example"));
    }
}
