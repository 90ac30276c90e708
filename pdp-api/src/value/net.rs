//! Network datatypes: ipAddress and dnsName.

use std::fmt;
use std::net::{IpAddr, Ipv6Addr};

use crate::error::IndeterminateError;

/// A port range suffix: `80`, `80-1023`, `-1023`, `8080-`, or absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PortRange {
    pub lower: Option<u16>,
    pub upper: Option<u16>,
}

impl PortRange {
    pub fn parse(lexical: &str) -> Option<Self> {
        if lexical.is_empty() {
            return None;
        }
        if let Some((lo, hi)) = lexical.split_once('-') {
            let lower = if lo.is_empty() { None } else { Some(lo.parse().ok()?) };
            let upper = if hi.is_empty() { None } else { Some(hi.parse().ok()?) };
            if lower.is_none() && upper.is_none() {
                return None;
            }
            Some(Self { lower, upper })
        } else {
            let port: u16 = lexical.parse().ok()?;
            Some(Self {
                lower: Some(port),
                upper: Some(port),
            })
        }
    }

    pub fn is_unbound(&self) -> bool {
        self.lower.is_none() && self.upper.is_none()
    }
}

impl fmt::Display for PortRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.lower, self.upper) {
            (Some(lo), Some(hi)) if lo == hi => write!(f, "{lo}"),
            (Some(lo), Some(hi)) => write!(f, "{lo}-{hi}"),
            (Some(lo), None) => write!(f, "{lo}-"),
            (None, Some(hi)) => write!(f, "-{hi}"),
            (None, None) => Ok(()),
        }
    }
}

/// An ipAddress value: address, optional mask, optional port range.
/// IPv6 addresses and masks are bracketed in the lexical form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IpAddress {
    pub address: IpAddr,
    pub mask: Option<IpAddr>,
    pub ports: PortRange,
}

impl IpAddress {
    pub fn parse(lexical: &str) -> Result<Self, IndeterminateError> {
        let bad = || IndeterminateError::syntax_error(format!("Invalid ipAddress '{lexical}'"));

        let (address, rest) = take_address(lexical).ok_or_else(bad)?;
        let (mask, rest) = match rest.strip_prefix('/') {
            Some(rest) => {
                let (mask, rest) = take_address(rest).ok_or_else(bad)?;
                if mask.is_ipv4() != address.is_ipv4() {
                    return Err(bad());
                }
                (Some(mask), rest)
            }
            None => (None, rest),
        };
        let ports = match rest.strip_prefix(':') {
            Some(rest) => PortRange::parse(rest).ok_or_else(bad)?,
            None if rest.is_empty() => PortRange::default(),
            None => return Err(bad()),
        };
        Ok(Self {
            address,
            mask,
            ports,
        })
    }
}

/// Consume one address from the front: bracketed IPv6 or dotted IPv4.
fn take_address(s: &str) -> Option<(IpAddr, &str)> {
    if let Some(rest) = s.strip_prefix('[') {
        let end = rest.find(']')?;
        let addr: Ipv6Addr = rest[..end].parse().ok()?;
        Some((IpAddr::V6(addr), &rest[end + 1..]))
    } else {
        let end = s
            .find(|c: char| c != '.' && !c.is_ascii_digit())
            .unwrap_or(s.len());
        let addr: IpAddr = s[..end].parse().ok()?;
        if !addr.is_ipv4() {
            return None;
        }
        Some((addr, &s[end..]))
    }
}

fn write_address(f: &mut fmt::Formatter<'_>, addr: &IpAddr) -> fmt::Result {
    match addr {
        IpAddr::V4(v4) => write!(f, "{v4}"),
        IpAddr::V6(v6) => write!(f, "[{v6}]"),
    }
}

impl fmt::Display for IpAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_address(f, &self.address)?;
        if let Some(mask) = &self.mask {
            f.write_str("/")?;
            write_address(f, mask)?;
        }
        if !self.ports.is_unbound() {
            write!(f, ":{}", self.ports)?;
        }
        Ok(())
    }
}

/// A dnsName value: a hostname (optionally with a leading `*.` wildcard)
/// plus an optional port range. Hostnames compare case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DnsName {
    pub hostname: String,
    pub ports: PortRange,
}

impl DnsName {
    pub fn parse(lexical: &str) -> Result<Self, IndeterminateError> {
        let bad = || IndeterminateError::syntax_error(format!("Invalid dnsName '{lexical}'"));

        let (host, ports) = match lexical.split_once(':') {
            Some((host, range)) => (host, PortRange::parse(range).ok_or_else(bad)?),
            None => (lexical, PortRange::default()),
        };
        if host.is_empty() || !is_valid_hostname(host) {
            return Err(bad());
        }
        Ok(Self {
            hostname: host.to_ascii_lowercase(),
            ports,
        })
    }
}

fn is_valid_hostname(host: &str) -> bool {
    let host = host.strip_prefix("*.").unwrap_or(host);
    if host.is_empty() || host == "*" {
        return host == "*";
    }
    host.split('.').all(|label| {
        !label.is_empty()
            && label
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-')
            && !label.starts_with('-')
            && !label.ends_with('-')
    })
}

impl fmt::Display for DnsName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.hostname)?;
        if !self.ports.is_unbound() {
            write!(f, ":{}", self.ports)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ipv4_round_trip() {
        for lex in [
            "192.168.0.1",
            "10.0.0.0/255.0.0.0",
            "192.168.0.1:80",
            "10.0.0.0/255.0.0.0:1024-",
        ] {
            let ip = IpAddress::parse(lex).unwrap();
            assert_eq!(ip.to_string(), lex);
        }
    }

    #[test]
    fn ipv6_bracketed() {
        let ip = IpAddress::parse("[2001:db8::1]:443").unwrap();
        assert!(matches!(ip.address, IpAddr::V6(_)));
        assert_eq!(ip.ports.lower, Some(443));
        assert_eq!(ip.to_string(), "[2001:db8::1]:443");
    }

    #[test]
    fn ip_rejects_malformed() {
        for lex in ["999.1.1.1", "10.0.0.1/[::1]", "10.0.0.1:port", "[::1", ""] {
            assert!(IpAddress::parse(lex).is_err(), "{lex}");
        }
    }

    #[test]
    fn dns_case_insensitive() {
        let a = DnsName::parse("Server.Example.COM").unwrap();
        let b = DnsName::parse("server.example.com").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn dns_wildcard_and_ports() {
        let d = DnsName::parse("*.example.com:8080-8090").unwrap();
        assert_eq!(d.hostname, "*.example.com");
        assert_eq!(d.ports.upper, Some(8090));
        assert!(DnsName::parse("bad..name").is_err());
        assert!(DnsName::parse("-bad.com").is_err());
    }
}
