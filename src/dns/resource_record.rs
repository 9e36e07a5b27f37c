use std::net::{Ipv4Addr, Ipv6Addr};

use bitstream_io::{BitRead, BitWrite, BitReader, BitWriter, Endianness};

use super::{
    common::{decode_domain_name_at, display_to_labels, labels_to_display, PacketComponent},
    enums::{DNSResourceClass, DNSResourceType},
    ParseError,
};

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum RData {
    A(Ipv4Addr),
    AAAA(Ipv6Addr),
    NS(String),
    CNAME(String),
    PTR(String),
    MX { preference: u16, exchange: String },
    TXT(Vec<String>),
    SOA {
        mname: String,
        rname: String,
        serial: u32,
        refresh: u32,
        retry: u32,
        expire: u32,
        minimum: u32,
    },
    SRV {
        priority: u16,
        weight: u16,
        port: u16,
        target: String,
    },
    /// Carried opaquely: OPT/DNSSEC/anything else this server doesn't
    /// interpret, matching the EDNS(0)-beyond-passthrough non-goal.
    Unknown(Vec<u8>),
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DNSResourceRecord {
    pub name: String,
    pub rtype: DNSResourceType,
    pub rclass: DNSResourceClass,
    pub ttl: u32,
    pub rdata: RData,
}

pub type DnsAnswer = DNSResourceRecord;
pub type DnsAuthority = DNSResourceRecord;
pub type DnsAdditional = DNSResourceRecord;

impl PacketComponent for DNSResourceRecord {
    fn write<E: Endianness>(
        &self,
        writer: &mut BitWriter<&mut Vec<u8>, E>,
    ) -> Result<(), ParseError> {
        let labels = display_to_labels(&self.name);
        self.write_labels(writer, &labels)?;
        writer.write_var::<u16>(16, self.rtype.into())?;
        writer.write_var::<u16>(16, self.rclass.into())?;
        writer.write_var::<u32>(32, self.ttl)?;

        let rdata_bytes = encode_rdata(&self.rdata);
        writer.write_var::<u16>(16, rdata_bytes.len() as u16)?;
        writer.write_bytes(&rdata_bytes)?;
        Ok(())
    }

    fn read<E: Endianness>(&mut self, reader: &mut BitReader<&[u8], E>) -> Result<(), ParseError> {
        self.read_with_buffer(reader, &[])
    }

    fn read_with_buffer<E: Endianness>(
        &mut self,
        reader: &mut BitReader<&[u8], E>,
        packet_buf: &[u8],
    ) -> Result<(), ParseError> {
        let labels = self.read_labels_with_buffer(reader, Some(packet_buf))?;
        let rtype = DNSResourceType::from(reader.read_var::<u16>(16)?);
        let rclass = DNSResourceClass::from(reader.read_var::<u16>(16)?);
        let ttl = reader.read_var::<u32>(32)?;
        let rdlength = reader.read_var::<u16>(16)?;

        let mut raw = vec![0u8; rdlength as usize];
        reader.read_bytes(&mut raw)?;

        let rdata = decode_rdata(rtype, &raw, packet_buf)?;

        *self = DNSResourceRecord {
            name: labels_to_display(&labels),
            rtype,
            rclass,
            ttl,
            rdata,
        };
        Ok(())
    }
}

fn encode_rdata(rdata: &RData) -> Vec<u8> {
    match rdata {
        RData::A(addr) => addr.octets().to_vec(),
        RData::AAAA(addr) => addr.octets().to_vec(),
        RData::NS(name) | RData::CNAME(name) | RData::PTR(name) => encode_name_uncompressed(name),
        RData::MX {
            preference,
            exchange,
        } => {
            let mut bytes = preference.to_be_bytes().to_vec();
            bytes.extend(encode_name_uncompressed(exchange));
            bytes
        }
        RData::TXT(strings) => {
            let mut bytes = Vec::new();
            for s in strings {
                let s = s.as_bytes();
                let len = s.len().min(255);
                bytes.push(len as u8);
                bytes.extend(&s[..len]);
            }
            bytes
        }
        RData::SOA {
            mname,
            rname,
            serial,
            refresh,
            retry,
            expire,
            minimum,
        } => {
            let mut bytes = encode_name_uncompressed(mname);
            bytes.extend(encode_name_uncompressed(rname));
            bytes.extend(serial.to_be_bytes());
            bytes.extend(refresh.to_be_bytes());
            bytes.extend(retry.to_be_bytes());
            bytes.extend(expire.to_be_bytes());
            bytes.extend(minimum.to_be_bytes());
            bytes
        }
        RData::SRV {
            priority,
            weight,
            port,
            target,
        } => {
            let mut bytes = priority.to_be_bytes().to_vec();
            bytes.extend(weight.to_be_bytes());
            bytes.extend(port.to_be_bytes());
            bytes.extend(encode_name_uncompressed(target));
            bytes
        }
        RData::Unknown(data) => data.clone(),
    }
}

fn encode_name_uncompressed(name: &str) -> Vec<u8> {
    let mut bytes = Vec::new();
    for label in display_to_labels(name) {
        bytes.push(label.len() as u8);
        bytes.extend(label.as_bytes());
    }
    bytes.push(0);
    bytes
}

fn decode_rdata(rtype: DNSResourceType, raw: &[u8], packet_buf: &[u8]) -> Result<RData, ParseError> {
    // Names embedded in RDATA may themselves use compression pointers that
    // refer back into the full packet, so those are decoded against
    // `packet_buf` by locating the name's offset inside `raw`. Since `raw`
    // is a standalone copy we can only follow pointers when `packet_buf`
    // actually contains it (true for any record parsed straight off the
    // wire); records synthesized locally (e.g. hosts-file overlay entries)
    // never contain pointers in the first place.
    let decode_name = |bytes: &[u8]| -> Result<(String, usize), ParseError> {
        if !packet_buf.is_empty() {
            if let Some(offset) = find_subslice(packet_buf, bytes) {
                let (labels, end) = decode_domain_name_at(packet_buf, offset)?;
                return Ok((labels_to_display(&labels), end - offset));
            }
        }
        decode_name_plain(bytes)
    };

    match rtype {
        DNSResourceType::A => {
            if raw.len() != 4 {
                return Err(ParseError::InvalidRData(1));
            }
            Ok(RData::A(Ipv4Addr::new(raw[0], raw[1], raw[2], raw[3])))
        }
        DNSResourceType::AAAA => {
            if raw.len() != 16 {
                return Err(ParseError::InvalidRData(28));
            }
            let mut octets = [0u8; 16];
            octets.copy_from_slice(raw);
            Ok(RData::AAAA(Ipv6Addr::from(octets)))
        }
        DNSResourceType::NS => Ok(RData::NS(decode_name(raw)?.0)),
        DNSResourceType::CNAME => Ok(RData::CNAME(decode_name(raw)?.0)),
        DNSResourceType::PTR => Ok(RData::PTR(decode_name(raw)?.0)),
        DNSResourceType::MX => {
            if raw.len() < 3 {
                return Err(ParseError::InvalidRData(15));
            }
            let preference = u16::from_be_bytes([raw[0], raw[1]]);
            let (exchange, _) = decode_name(&raw[2..])?;
            Ok(RData::MX {
                preference,
                exchange,
            })
        }
        DNSResourceType::TXT => {
            let mut strings = Vec::new();
            let mut idx = 0;
            while idx < raw.len() {
                let len = raw[idx] as usize;
                idx += 1;
                let end = (idx + len).min(raw.len());
                strings.push(String::from_utf8_lossy(&raw[idx..end]).to_string());
                idx = end;
            }
            Ok(RData::TXT(strings))
        }
        DNSResourceType::SOA => {
            let (mname, consumed) = decode_name(raw)?;
            let rest = &raw[consumed..];
            let (rname, consumed2) = decode_name(rest)?;
            let rest = &rest[consumed2..];
            if rest.len() < 20 {
                return Err(ParseError::InvalidRData(6));
            }
            Ok(RData::SOA {
                mname,
                rname,
                serial: u32::from_be_bytes(rest[0..4].try_into().unwrap()),
                refresh: u32::from_be_bytes(rest[4..8].try_into().unwrap()),
                retry: u32::from_be_bytes(rest[8..12].try_into().unwrap()),
                expire: u32::from_be_bytes(rest[12..16].try_into().unwrap()),
                minimum: u32::from_be_bytes(rest[16..20].try_into().unwrap()),
            })
        }
        DNSResourceType::SRV => {
            if raw.len() < 7 {
                return Err(ParseError::InvalidRData(33));
            }
            let priority = u16::from_be_bytes([raw[0], raw[1]]);
            let weight = u16::from_be_bytes([raw[2], raw[3]]);
            let port = u16::from_be_bytes([raw[4], raw[5]]);
            let (target, _) = decode_name(&raw[6..])?;
            Ok(RData::SRV {
                priority,
                weight,
                port,
                target,
            })
        }
        _ => Ok(RData::Unknown(raw.to_vec())),
    }
}

fn decode_name_plain(buf: &[u8]) -> Result<(String, usize), ParseError> {
    let (labels, end) = decode_domain_name_at(buf, 0)?;
    Ok((labels_to_display(&labels), end))
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

impl DNSResourceRecord {
    /// Encode as master-file text form: `name TTL CLASS TYPE rdata`. This is
    /// the on-disk/cache textual encoding referenced in spec §3's cache
    /// entry data model.
    pub fn to_master_text(&self) -> String {
        format!(
            "{} {} IN {} {}",
            self.name,
            self.ttl,
            self.rtype.as_text(),
            rdata_to_text(&self.rdata)
        )
    }

    /// Parse a line produced by `to_master_text`. Corruption (anything that
    /// doesn't parse) is reported via `ParseError::InvalidMasterText`; the
    /// cache treats this as the "RR fails to re-parse" case in spec §4.2
    /// and drops the offending entry.
    pub fn from_master_text(line: &str) -> Result<Self, ParseError> {
        let mut parts = line.splitn(5, ' ');
        let name = parts
            .next()
            .ok_or_else(|| ParseError::InvalidMasterText(line.to_string()))?;
        let ttl: u32 = parts
            .next()
            .ok_or_else(|| ParseError::InvalidMasterText(line.to_string()))?
            .parse()
            .map_err(|_| ParseError::InvalidMasterText(line.to_string()))?;
        let class = parts
            .next()
            .ok_or_else(|| ParseError::InvalidMasterText(line.to_string()))?;
        if class != "IN" {
            return Err(ParseError::InvalidMasterText(line.to_string()));
        }
        let rtype_text = parts
            .next()
            .ok_or_else(|| ParseError::InvalidMasterText(line.to_string()))?;
        let rdata_text = parts
            .next()
            .ok_or_else(|| ParseError::InvalidMasterText(line.to_string()))?;

        let rtype = DNSResourceType::from_text(rtype_text);
        let rdata = rdata_from_text(rtype, rdata_text)
            .ok_or_else(|| ParseError::InvalidMasterText(line.to_string()))?;

        Ok(DNSResourceRecord {
            name: name.to_string(),
            rtype,
            rclass: DNSResourceClass::IN,
            ttl,
            rdata,
        })
    }
}

fn rdata_to_text(rdata: &RData) -> String {
    match rdata {
        RData::A(addr) => addr.to_string(),
        RData::AAAA(addr) => addr.to_string(),
        RData::NS(name) | RData::CNAME(name) | RData::PTR(name) => name.clone(),
        RData::MX {
            preference,
            exchange,
        } => format!("{preference} {exchange}"),
        RData::TXT(strings) => strings.join(" "),
        RData::SOA {
            mname,
            rname,
            serial,
            refresh,
            retry,
            expire,
            minimum,
        } => format!("{mname} {rname} {serial} {refresh} {retry} {expire} {minimum}"),
        RData::SRV {
            priority,
            weight,
            port,
            target,
        } => format!("{priority} {weight} {port} {target}"),
        RData::Unknown(data) => hex::encode(data),
    }
}

fn rdata_from_text(rtype: DNSResourceType, text: &str) -> Option<RData> {
    match rtype {
        DNSResourceType::A => text.parse().ok().map(RData::A),
        DNSResourceType::AAAA => text.parse().ok().map(RData::AAAA),
        DNSResourceType::NS => Some(RData::NS(text.to_string())),
        DNSResourceType::CNAME => Some(RData::CNAME(text.to_string())),
        DNSResourceType::PTR => Some(RData::PTR(text.to_string())),
        DNSResourceType::MX => {
            let mut it = text.splitn(2, ' ');
            let preference = it.next()?.parse().ok()?;
            let exchange = it.next()?.to_string();
            Some(RData::MX {
                preference,
                exchange,
            })
        }
        DNSResourceType::TXT => Some(RData::TXT(
            text.split(' ').map(|s| s.to_string()).collect(),
        )),
        DNSResourceType::SOA => {
            let fields: Vec<&str> = text.split(' ').collect();
            if fields.len() != 7 {
                return None;
            }
            Some(RData::SOA {
                mname: fields[0].to_string(),
                rname: fields[1].to_string(),
                serial: fields[2].parse().ok()?,
                refresh: fields[3].parse().ok()?,
                retry: fields[4].parse().ok()?,
                expire: fields[5].parse().ok()?,
                minimum: fields[6].parse().ok()?,
            })
        }
        DNSResourceType::SRV => {
            let fields: Vec<&str> = text.split(' ').collect();
            if fields.len() != 4 {
                return None;
            }
            Some(RData::SRV {
                priority: fields[0].parse().ok()?,
                weight: fields[1].parse().ok()?,
                port: fields[2].parse().ok()?,
                target: fields[3].to_string(),
            })
        }
        _ => hex::decode(text).ok().map(RData::Unknown),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_record_master_text_roundtrip() {
        let rr = DNSResourceRecord {
            name: "example.com.".to_string(),
            rtype: DNSResourceType::A,
            rclass: DNSResourceClass::IN,
            ttl: 60,
            rdata: RData::A(Ipv4Addr::new(1, 2, 3, 4)),
        };
        let text = rr.to_master_text();
        let parsed = DNSResourceRecord::from_master_text(&text).unwrap();
        assert_eq!(parsed, rr);
    }

    #[test]
    fn corrupt_master_text_is_rejected() {
        assert!(DNSResourceRecord::from_master_text("garbage").is_err());
    }
}
