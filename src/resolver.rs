//! Collector endpoint resolution: `host[:port]` to an IPv4 socket
//! address.

use std::net::{SocketAddr, ToSocketAddrs};

use crate::ExportError;

/// Port used when the collector string carries none.
pub const DEFAULT_PORT: u16 = 2055;

/// Split a collector string at the last `:` into host and port.
///
/// A missing port yields [`DEFAULT_PORT`]. A present port must be a
/// non-zero decimal u16; anything else is an invalid option, matching the
/// CLI validation.
pub fn split_host_port(source: &str) -> Result<(&str, u16), ExportError> {
    match source.rfind(':') {
        None => Ok((source, DEFAULT_PORT)),
        Some(idx) => {
            let host = &source[..idx];
            let port = parse_port(&source[idx + 1..])?;
            Ok((host, port))
        }
    }
}

fn parse_port(text: &str) -> Result<u16, ExportError> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ExportError::InvalidOption);
    }
    match text.parse::<u16>() {
        Ok(port) if port > 0 => Ok(port),
        _ => Err(ExportError::InvalidOption),
    }
}

/// Resolve the collector to the first IPv4 address of the host.
pub fn resolve_collector(source: &str) -> Result<SocketAddr, ExportError> {
    let (host, port) = split_host_port(source)?;

    let addrs = (host, port)
        .to_socket_addrs()
        .map_err(|err| ExportError::Socket(format!("{host}: {err}")))?;

    addrs
        .into_iter()
        .find(SocketAddr::is_ipv4)
        .ok_or_else(|| ExportError::Socket(format!("{host}: no IPv4 address")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn splits_at_the_last_colon() {
        assert_eq!(split_host_port("collector:9995").unwrap(), ("collector", 9995));
        assert_eq!(split_host_port("10.0.0.1:2055").unwrap(), ("10.0.0.1", 2055));
    }

    #[test]
    fn missing_port_defaults_to_2055() {
        assert_eq!(split_host_port("collector").unwrap(), ("collector", DEFAULT_PORT));
    }

    #[test]
    fn zero_and_garbage_ports_are_invalid() {
        for source in ["host:0", "host:", "host:70000", "host:20x5", "host:-1"] {
            assert!(
                matches!(split_host_port(source), Err(ExportError::InvalidOption)),
                "{source} should be rejected"
            );
        }
    }

    #[test]
    fn resolves_literal_ipv4() {
        let addr = resolve_collector("127.0.0.1:2055").unwrap();
        assert_eq!(addr.ip(), Ipv4Addr::LOCALHOST);
        assert_eq!(addr.port(), 2055);
    }

    #[test]
    fn resolves_default_port_for_bare_host() {
        let addr = resolve_collector("127.0.0.1").unwrap();
        assert_eq!(addr.port(), DEFAULT_PORT);
    }
}
