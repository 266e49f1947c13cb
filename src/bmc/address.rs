//! BMC address parsing
//!
//! Addresses come in several shapes: `type://host:port/path`, `type:host`,
//! bare `host` or `host:port`. Everything is normalized to a URL whose scheme
//! names the BMC type, defaulting to `ipmi`.

use crate::error::{Error, Result};
use url::{Host, Url};

/// Scheme assumed when the address carries none
pub const DEFAULT_SCHEME: &str = "ipmi";

/// Parse a BMC address into a URL
pub fn parse_address(address: &str) -> Result<Url> {
    if address.is_empty() {
        return Err(Error::MissingBmcAddress);
    }

    match Url::parse(address) {
        // "type:host" parses with the host as an opaque path
        Ok(url) if url.cannot_be_a_base() => {
            parse_with_context(address, &address.replacen(':', "://", 1))
        }
        Ok(url) => Ok(url),
        Err(err) => {
            // A bare host:port is rejected by the URL parser. Only fall back
            // when it really splits as one.
            if address.contains(':') && split_host_port(address).is_err() {
                return Err(Error::BmcAddressParse {
                    address: address.to_string(),
                    reason: err.to_string(),
                });
            }
            parse_with_context(address, &format!("{DEFAULT_SCHEME}://{address}"))
        }
    }
}

fn parse_with_context(address: &str, candidate: &str) -> Result<Url> {
    Url::parse(candidate).map_err(|err| Error::BmcAddressParse {
        address: address.to_string(),
        reason: err.to_string(),
    })
}

/// Split `host:port`, accepting `[v6addr]:port`.
///
/// The port is not checked for being numeric.
pub fn split_host_port(hostport: &str) -> std::result::Result<(&str, &str), String> {
    let missing_port = || format!("address {hostport}: missing port in address");
    let too_many_colons = || format!("address {hostport}: too many colons in address");

    let Some(last) = hostport.rfind(':') else {
        return Err(missing_port());
    };

    let host = if let Some(rest) = hostport.strip_prefix('[') {
        let Some(end) = rest.find(']') else {
            return Err(format!("address {hostport}: missing ']' in address"));
        };
        // index of ']' in the full string
        let end = end + 1;
        if end + 1 == hostport.len() {
            return Err(missing_port());
        }
        if end + 1 != last {
            return if hostport.as_bytes()[end + 1] == b':' {
                Err(too_many_colons())
            } else {
                Err(missing_port())
            };
        }
        &hostport[1..end]
    } else {
        let host = &hostport[..last];
        if host.contains(':') {
            return Err(too_many_colons());
        }
        host
    };

    if host.contains('[') || host.contains(']') {
        return Err(format!("address {hostport}: unexpected bracket in address"));
    }

    let port = &hostport[last + 1..];
    if port.contains('[') || port.contains(']') {
        return Err(format!("address {hostport}: unexpected bracket in address"));
    }

    Ok((host, port))
}

/// Host without port; IPv6 literals are returned without brackets
pub fn hostname(url: &Url) -> String {
    match url.host() {
        Some(Host::Ipv6(addr)) => addr.to_string(),
        Some(host) => host.to_string(),
        None => String::new(),
    }
}

/// Host with the explicit port, if any; IPv6 literals keep their brackets
pub fn host_port(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    }
}

/// Transport suffix of a `base+transport` scheme
pub fn transport(url: &Url) -> Option<&str> {
    url.scheme().split_once('+').map(|(_, transport)| transport)
}
