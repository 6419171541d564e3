
pub mod builder;
pub mod name;
pub mod packer;
pub mod reader;

use std::fmt;

// Message formats

/// Length (in bytes) of a DNS message header.
///
/// A header is comprised of 6 uint16s and no padding.
pub const HEADER_LEN: usize = 12;

/// Query/response flag bit of the header flags word (response = 1).
pub const HEADER_BIT_QR: u16 = 1 << 15;

/// Authoritative-answer flag bit of the header flags word.
pub const HEADER_BIT_AA: u16 = 1 << 10;

/// Top bit of the class word: cache-flush on resource records, unicast-response
/// request on questions.
pub const CLASS_BIT_CACHE_FLUSH: u16 = 0x8000;

// A Type is a type of DNS request and response.
#[derive(Default, Copy, Clone, Debug, PartialEq, Eq)]
pub enum DnsType {
    A = 1,
    Ns = 2,
    Cname = 5,
    Ptr = 12,
    Txt = 16,
    Aaaa = 28,
    Srv = 33,
    Opt = 41,
    Nsec = 47,
    Any = 255,

    #[default]
    Unsupported = 0,
}

impl From<u16> for DnsType {
    fn from(v: u16) -> Self {
        match v {
            1 => DnsType::A,
            2 => DnsType::Ns,
            5 => DnsType::Cname,
            12 => DnsType::Ptr,
            16 => DnsType::Txt,
            28 => DnsType::Aaaa,
            33 => DnsType::Srv,
            41 => DnsType::Opt,
            47 => DnsType::Nsec,
            255 => DnsType::Any,
            _ => DnsType::Unsupported,
        }
    }
}

impl fmt::Display for DnsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            DnsType::A => "A",
            DnsType::Ns => "NS",
            DnsType::Cname => "CNAME",
            DnsType::Ptr => "PTR",
            DnsType::Txt => "TXT",
            DnsType::Aaaa => "AAAA",
            DnsType::Srv => "SRV",
            DnsType::Opt => "OPT",
            DnsType::Nsec => "NSEC",
            DnsType::Any => "ANY",
            _ => "?",
        };
        write!(f, "{s}")
    }
}

/// DNS class of a question or resource record.
///
/// Only `DNSCLASS_INET` is used in practice; `DNSCLASS_ANY` appears in
/// queries to match any class.
#[derive(Default, Copy, Clone, Debug, PartialEq, Eq)]
pub struct DnsClass(pub u16);

/// Internet class (IN) - the standard class for Internet DNS records.
pub const DNSCLASS_INET: DnsClass = DnsClass(1);

/// Any class (*) - matches any class in queries.
pub const DNSCLASS_ANY: DnsClass = DnsClass(255);

impl fmt::Display for DnsClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let other = format!("{}", self.0);
        let s = match *self {
            DNSCLASS_INET => "ClassINET",
            DNSCLASS_ANY => "ClassANY",
            _ => other.as_str(),
        };
        write!(f, "{s}")
    }
}

/// Section of a DNS message a record belongs to.
///
/// The builder requires categories to be appended in header order:
/// question, answer, authority, additional. `None` marks an invalidated
/// response record and is never written to the wire.
#[derive(Default, Copy, Clone, Debug, PartialEq, Eq)]
pub enum Category {
    #[default]
    None,
    Question,
    Answer,
    Authority,
    Additional,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            Category::None => "none",
            Category::Question => "question",
            Category::Answer => "answer",
            Category::Authority => "authority",
            Category::Additional => "additional",
        };
        write!(f, "{s}")
    }
}
