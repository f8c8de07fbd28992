//! Structured name datatypes: X.500 names, RFC 822 mailboxes, IP addresses,
//! and DNS names.

use std::fmt;
use std::net::IpAddr;

/// An X.500 directory name as an ordered sequence of RDNs.
///
/// Comparison is case-insensitive on attribute types and case-sensitive on
/// values, after whitespace normalization around `=` and `,`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct X500Name {
    rdns: Vec<(String, String)>,
}

impl X500Name {
    /// Parses a distinguished name such as
    /// `cn=Alice, ou=Research, o=Example, c=US`.
    pub fn parse(input: &str) -> Result<Self, String> {
        if input.trim().is_empty() {
            return Err("x500Name cannot be empty".into());
        }
        let mut rdns = Vec::new();
        for rdn in input.split(',') {
            let (attr, value) = rdn
                .split_once('=')
                .ok_or_else(|| format!("RDN `{rdn}` in `{input}` is missing `=`"))?;
            let attr = attr.trim();
            let value = value.trim();
            if attr.is_empty() || value.is_empty() {
                return Err(format!("RDN `{rdn}` in `{input}` has an empty side"));
            }
            rdns.push((attr.to_ascii_lowercase(), value.to_owned()));
        }
        Ok(Self { rdns })
    }

    /// True when `self` matches the terminal (least-significant) RDN
    /// sequence of `other`, per the `x500Name-match` function.
    #[must_use]
    pub fn is_suffix_of(&self, other: &Self) -> bool {
        if self.rdns.len() > other.rdns.len() {
            return false;
        }
        let offset = other.rdns.len() - self.rdns.len();
        other.rdns[offset..] == self.rdns[..]
    }
}

impl fmt::Display for X500Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (attr, value)) in self.rdns.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{attr}={value}")?;
        }
        Ok(())
    }
}

/// An RFC 822 mailbox name, `local@domain`.
///
/// The local part compares case-sensitively, the domain case-insensitively.
#[derive(Debug, Clone, Eq, Hash, PartialEq)]
pub struct Rfc822Name {
    local: String,
    domain: String,
}

impl Rfc822Name {
    /// Parses `local@domain`. The domain is lower-cased on construction.
    pub fn parse(input: &str) -> Result<Self, String> {
        let (local, domain) = input
            .split_once('@')
            .ok_or_else(|| format!("rfc822Name `{input}` is missing `@`"))?;
        if local.is_empty() || domain.is_empty() || domain.contains('@') {
            return Err(format!("rfc822Name `{input}` is malformed"));
        }
        Ok(Self { local: local.to_owned(), domain: domain.to_ascii_lowercase() })
    }

    /// The case-sensitive local part.
    #[must_use]
    pub fn local(&self) -> &str {
        &self.local
    }

    /// The lower-cased domain part.
    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Implements `rfc822Name-match`: the pattern is either a full mailbox
    /// (`Anne.Smith@sun.com`), a whole domain (`sun.com`), or a subdomain
    /// suffix (`.east.sun.com`).
    #[must_use]
    pub fn matches(&self, pattern: &str) -> bool {
        if let Some((local, domain)) = pattern.split_once('@') {
            return self.local == local && self.domain == domain.to_ascii_lowercase();
        }
        let pattern = pattern.to_ascii_lowercase();
        if let Some(suffix) = pattern.strip_prefix('.') {
            self.domain.ends_with(&format!(".{suffix}")) || self.domain == suffix
        } else {
            self.domain == pattern
        }
    }
}

impl fmt::Display for Rfc822Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.local, self.domain)
    }
}

/// An inclusive port range, possibly open on either end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PortRange {
    lower: Option<u16>,
    upper: Option<u16>,
}

impl PortRange {
    /// The unbounded range.
    #[must_use]
    pub const fn any() -> Self {
        Self { lower: None, upper: None }
    }

    /// Parses `80`, `80-443`, `80-`, or `-443`.
    pub fn parse(input: &str) -> Result<Self, String> {
        let parse_port = |s: &str| {
            s.parse::<u16>().map_err(|_| format!("invalid port `{s}` in range `{input}`"))
        };
        match input.split_once('-') {
            None => {
                let p = parse_port(input)?;
                Ok(Self { lower: Some(p), upper: Some(p) })
            }
            Some((lo, hi)) => {
                let lower = if lo.is_empty() { None } else { Some(parse_port(lo)?) };
                let upper = if hi.is_empty() { None } else { Some(parse_port(hi)?) };
                if let (Some(l), Some(u)) = (lower, upper) {
                    if l > u {
                        return Err(format!("empty port range `{input}`"));
                    }
                }
                Ok(Self { lower, upper })
            }
        }
    }

    /// True when `port` falls inside the range.
    #[must_use]
    pub fn contains(self, port: u16) -> bool {
        self.lower.map_or(true, |p| p <= port) && self.upper.map_or(true, |p| port <= p)
    }

    /// True when the range is unbounded on both ends.
    #[must_use]
    pub const fn is_any(self) -> bool {
        self.lower.is_none() && self.upper.is_none()
    }
}

impl fmt::Display for PortRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.lower, self.upper) {
            (Some(l), Some(u)) if l == u => write!(f, "{l}"),
            (l, u) => {
                if let Some(l) = l {
                    write!(f, "{l}")?;
                }
                f.write_str("-")?;
                if let Some(u) = u {
                    write!(f, "{u}")?;
                }
                Ok(())
            }
        }
    }
}

/// An IP address with optional mask and port range,
/// `address[/mask][:portrange]`. IPv6 addresses are bracketed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IpAddressValue {
    address: IpAddr,
    mask: Option<IpAddr>,
    ports: PortRange,
}

impl IpAddressValue {
    /// Parses the XACML `ipAddress` lexical form. IPv6 addresses and masks
    /// are bracketed: `[2001:db8::1]/[ffff:ffff::]:443`.
    pub fn parse(input: &str) -> Result<Self, String> {
        let bad_addr = || format!("invalid address in ipAddress `{input}`");
        let bad_mask = || format!("invalid mask in ipAddress `{input}`");

        if let Some(rest) = input.strip_prefix('[') {
            let (addr, tail) = rest
                .split_once(']')
                .ok_or_else(|| format!("unterminated `[` in ipAddress `{input}`"))?;
            let address: IpAddr = addr.parse().map_err(|_| bad_addr())?;
            let (mask, tail) = if let Some(m) = tail.strip_prefix("/[") {
                let (mask, t) = m
                    .split_once(']')
                    .ok_or_else(|| format!("unterminated mask `[` in ipAddress `{input}`"))?;
                (Some(mask.parse::<IpAddr>().map_err(|_| bad_mask())?), t)
            } else {
                (None, tail)
            };
            let ports = match tail.strip_prefix(':') {
                Some(p) => PortRange::parse(p)?,
                None if tail.is_empty() => PortRange::any(),
                None => return Err(format!("trailing garbage in ipAddress `{input}`")),
            };
            return Ok(Self { address, mask, ports });
        }

        // IPv4: the final colon separates the port range. A bare IPv6 form
        // without brackets would contain further colons and is rejected by
        // the address parse below.
        let (addr_part, port_part) = match input.rsplit_once(':') {
            Some((a, p)) if !a.contains(':') => (a, Some(p)),
            _ => (input, None),
        };
        let (addr, mask) = match addr_part.split_once('/') {
            None => (addr_part, None),
            Some((a, m)) => (a, Some(m)),
        };
        let address: IpAddr = addr.parse().map_err(|_| bad_addr())?;
        let mask = match mask {
            None => None,
            Some(m) => Some(m.parse::<IpAddr>().map_err(|_| bad_mask())?),
        };
        let ports = match port_part {
            None => PortRange::any(),
            Some(p) => PortRange::parse(p)?,
        };
        Ok(Self { address, mask, ports })
    }

    /// The address component.
    #[must_use]
    pub const fn address(&self) -> IpAddr {
        self.address
    }

    /// The optional mask component.
    #[must_use]
    pub const fn mask(&self) -> Option<IpAddr> {
        self.mask
    }

    /// The port range component.
    #[must_use]
    pub const fn ports(&self) -> PortRange {
        self.ports
    }
}

impl fmt::Display for IpAddressValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.address {
            IpAddr::V4(a) => write!(f, "{a}")?,
            IpAddr::V6(a) => write!(f, "[{a}]")?,
        }
        match self.mask {
            Some(IpAddr::V4(m)) => write!(f, "/{m}")?,
            Some(IpAddr::V6(m)) => write!(f, "/[{m}]")?,
            None => {}
        }
        if !self.ports.is_any() {
            write!(f, ":{}", self.ports)?;
        }
        Ok(())
    }
}

/// A DNS hostname with an optional leading `*.` wildcard and an optional
/// port range, per the XACML `dnsName` datatype.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DnsNameValue {
    name: String,
    wildcard: bool,
    ports: PortRange,
}

impl DnsNameValue {
    /// Parses `host[:portrange]` where `host` may start with `*.`.
    pub fn parse(input: &str) -> Result<Self, String> {
        let (host, ports) = match input.split_once(':') {
            None => (input, PortRange::any()),
            Some((h, p)) => (h, PortRange::parse(p)?),
        };
        let (wildcard, name) = match host.strip_prefix("*.") {
            Some(rest) => (true, rest),
            None => (false, host),
        };
        if name.is_empty()
            || !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
        {
            return Err(format!("invalid dnsName `{input}`"));
        }
        Ok(Self { name: name.to_ascii_lowercase(), wildcard, ports })
    }

    /// The hostname without any wildcard prefix, lower-cased.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.name
    }

    /// True when the name carries a `*.` wildcard prefix.
    #[must_use]
    pub const fn is_wildcard(&self) -> bool {
        self.wildcard
    }

    /// The port range component.
    #[must_use]
    pub const fn ports(&self) -> PortRange {
        self.ports
    }
}

impl fmt::Display for DnsNameValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.wildcard {
            f.write_str("*.")?;
        }
        f.write_str(&self.name)?;
        if !self.ports.is_any() {
            write!(f, ":{}", self.ports)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn x500_suffix_match() {
        let full = X500Name::parse("cn=Alice, ou=Research, o=Example, c=US").unwrap();
        let org = X500Name::parse("O=example, C=us").unwrap();
        // Attribute types compare case-insensitively; values do not.
        assert!(X500Name::parse("o=Example, c=US").unwrap().is_suffix_of(&full));
        assert!(!org.is_suffix_of(&full));
        assert!(!full.is_suffix_of(&X500Name::parse("c=US").unwrap()));
    }

    #[test]
    fn rfc822_match_forms() {
        let name = Rfc822Name::parse("Anne.Smith@East.Sun.COM").unwrap();
        assert!(name.matches("Anne.Smith@east.sun.com"));
        assert!(!name.matches("anne.smith@east.sun.com"));
        assert!(name.matches("east.sun.com"));
        assert!(name.matches(".sun.com"));
        assert!(!name.matches("sun.com"));
    }

    #[test]
    fn port_ranges() {
        assert!(PortRange::parse("80").unwrap().contains(80));
        let r = PortRange::parse("80-443").unwrap();
        assert!(r.contains(80) && r.contains(443) && !r.contains(8080));
        assert!(PortRange::parse("-1024").unwrap().contains(22));
        assert!(PortRange::parse("1024-").unwrap().contains(8080));
        assert!(PortRange::parse("443-80").is_err());
    }

    #[test]
    fn ip_address_forms() {
        let v4 = IpAddressValue::parse("10.0.0.1/255.255.255.0:80-443").unwrap();
        assert_eq!(v4.to_string(), "10.0.0.1/255.255.255.0:80-443");
        let v6 = IpAddressValue::parse("[2001:db8::1]:443").unwrap();
        assert_eq!(v6.to_string(), "[2001:db8::1]:443");
        assert!(IpAddressValue::parse("not-an-ip").is_err());
    }

    #[test]
    fn dns_name_forms() {
        let plain = DnsNameValue::parse("Example.COM").unwrap();
        assert_eq!(plain.host(), "example.com");
        let wild = DnsNameValue::parse("*.example.com:80-").unwrap();
        assert!(wild.is_wildcard());
        assert_eq!(wild.to_string(), "*.example.com:80-");
        assert!(DnsNameValue::parse("bad_host!").is_err());
    }
}
