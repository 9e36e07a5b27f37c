/// DNS resource record / query types this server understands structurally.
/// Anything else is carried as `Other(code)` and forwarded/stored opaquely
/// (spec §1: "only query class IN is materially handled; other classes are
/// forwarded verbatim" — the same passthrough posture applies to types we
/// don't special-case).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum DNSResourceType {
    #[default]
    Unknown,
    A,
    NS,
    CNAME,
    SOA,
    PTR,
    MX,
    TXT,
    AAAA,
    SRV,
    OPT,
    TSIG,
    AXFR,
    IXFR,
    ANY,
    Other(u16),
}

impl From<u16> for DNSResourceType {
    fn from(value: u16) -> Self {
        match value {
            1 => DNSResourceType::A,
            2 => DNSResourceType::NS,
            5 => DNSResourceType::CNAME,
            6 => DNSResourceType::SOA,
            12 => DNSResourceType::PTR,
            15 => DNSResourceType::MX,
            16 => DNSResourceType::TXT,
            28 => DNSResourceType::AAAA,
            33 => DNSResourceType::SRV,
            41 => DNSResourceType::OPT,
            250 => DNSResourceType::TSIG,
            252 => DNSResourceType::AXFR,
            254 => DNSResourceType::IXFR,
            255 => DNSResourceType::ANY,
            0 => DNSResourceType::Unknown,
            other => DNSResourceType::Other(other),
        }
    }
}

impl From<DNSResourceType> for u16 {
    fn from(value: DNSResourceType) -> Self {
        match value {
            DNSResourceType::A => 1,
            DNSResourceType::NS => 2,
            DNSResourceType::CNAME => 5,
            DNSResourceType::SOA => 6,
            DNSResourceType::PTR => 12,
            DNSResourceType::MX => 15,
            DNSResourceType::TXT => 16,
            DNSResourceType::AAAA => 28,
            DNSResourceType::SRV => 33,
            DNSResourceType::OPT => 41,
            DNSResourceType::TSIG => 250,
            DNSResourceType::AXFR => 252,
            DNSResourceType::IXFR => 254,
            DNSResourceType::ANY => 255,
            DNSResourceType::Other(code) => code,
            DNSResourceType::Unknown => 0,
        }
    }
}

impl DNSResourceType {
    /// Text form used in the master-file record encoding stored in the cache.
    pub fn as_text(self) -> String {
        match self {
            DNSResourceType::A => "A".to_string(),
            DNSResourceType::NS => "NS".to_string(),
            DNSResourceType::CNAME => "CNAME".to_string(),
            DNSResourceType::SOA => "SOA".to_string(),
            DNSResourceType::PTR => "PTR".to_string(),
            DNSResourceType::MX => "MX".to_string(),
            DNSResourceType::TXT => "TXT".to_string(),
            DNSResourceType::AAAA => "AAAA".to_string(),
            DNSResourceType::SRV => "SRV".to_string(),
            DNSResourceType::OPT => "OPT".to_string(),
            DNSResourceType::TSIG => "TSIG".to_string(),
            DNSResourceType::AXFR => "AXFR".to_string(),
            DNSResourceType::IXFR => "IXFR".to_string(),
            DNSResourceType::ANY => "ANY".to_string(),
            DNSResourceType::Other(code) => format!("TYPE{code}"),
            DNSResourceType::Unknown => "TYPE0".to_string(),
        }
    }

    pub fn from_text(s: &str) -> Self {
        match s {
            "A" => DNSResourceType::A,
            "NS" => DNSResourceType::NS,
            "CNAME" => DNSResourceType::CNAME,
            "SOA" => DNSResourceType::SOA,
            "PTR" => DNSResourceType::PTR,
            "MX" => DNSResourceType::MX,
            "TXT" => DNSResourceType::TXT,
            "AAAA" => DNSResourceType::AAAA,
            "SRV" => DNSResourceType::SRV,
            "OPT" => DNSResourceType::OPT,
            "TSIG" => DNSResourceType::TSIG,
            "AXFR" => DNSResourceType::AXFR,
            "IXFR" => DNSResourceType::IXFR,
            "ANY" => DNSResourceType::ANY,
            other if other.starts_with("TYPE") => other[4..]
                .parse::<u16>()
                .map(DNSResourceType::Other)
                .unwrap_or(DNSResourceType::Unknown),
            _ => DNSResourceType::Unknown,
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum DNSResourceClass {
    #[default]
    Unknown,
    IN,
    CS,
    CH,
    HS,
    Other(u16),
}

impl From<u16> for DNSResourceClass {
    fn from(value: u16) -> Self {
        match value {
            1 => DNSResourceClass::IN,
            2 => DNSResourceClass::CS,
            3 => DNSResourceClass::CH,
            4 => DNSResourceClass::HS,
            0 => DNSResourceClass::Unknown,
            other => DNSResourceClass::Other(other),
        }
    }
}

impl From<DNSResourceClass> for u16 {
    fn from(value: DNSResourceClass) -> Self {
        match value {
            DNSResourceClass::IN => 1,
            DNSResourceClass::CS => 2,
            DNSResourceClass::CH => 3,
            DNSResourceClass::HS => 4,
            DNSResourceClass::Other(code) => code,
            DNSResourceClass::Unknown => 0,
        }
    }
}

/// DNS response codes (RCODEs), RFC 1035 subset plus RFC 2136 UPDATE codes.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ResponseCode {
    NoError = 0,
    FormatError = 1,
    ServerFailure = 2,
    NameError = 3,
    NotImplemented = 4,
    Refused = 5,
    YXDomain = 6,
    YXRRSet = 7,
    NXRRSet = 8,
    NotAuth = 9,
    NotZone = 10,
}

impl ResponseCode {
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => ResponseCode::NoError,
            1 => ResponseCode::FormatError,
            2 => ResponseCode::ServerFailure,
            3 => ResponseCode::NameError,
            4 => ResponseCode::NotImplemented,
            5 => ResponseCode::Refused,
            6 => ResponseCode::YXDomain,
            7 => ResponseCode::YXRRSet,
            8 => ResponseCode::NXRRSet,
            9 => ResponseCode::NotAuth,
            10 => ResponseCode::NotZone,
            _ => ResponseCode::ServerFailure,
        }
    }
}

/// Opcodes this server dispatches on (spec §1: "Opcodes handled: QUERY, UPDATE").
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DnsOpcode {
    Query,
    Update,
    Other(u8),
}

impl From<u8> for DnsOpcode {
    fn from(value: u8) -> Self {
        match value {
            0 => DnsOpcode::Query,
            5 => DnsOpcode::Update,
            other => DnsOpcode::Other(other),
        }
    }
}

impl From<DnsOpcode> for u8 {
    fn from(value: DnsOpcode) -> Self {
        match value {
            DnsOpcode::Query => 0,
            DnsOpcode::Update => 5,
            DnsOpcode::Other(code) => code,
        }
    }
}
