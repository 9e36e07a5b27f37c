use bitstream_io::{BigEndian, BitReader, BitWriter};

use super::{
    common::PacketComponent,
    header::DNSHeader,
    question::DNSQuestion,
    resource_record::{DnsAdditional, DnsAnswer, DnsAuthority, DNSResourceRecord},
    ParseError,
};

#[derive(Debug, Clone, Default)]
pub struct DNSPacket {
    pub header: DNSHeader,
    pub questions: Vec<DNSQuestion>,
    pub answers: Vec<DnsAnswer>,
    pub authorities: Vec<DnsAuthority>,
    pub additional: Vec<DnsAdditional>,
}

impl DNSPacket {
    pub fn new(header: DNSHeader) -> Self {
        DNSPacket {
            header,
            questions: Vec::new(),
            answers: Vec::new(),
            authorities: Vec::new(),
            additional: Vec::new(),
        }
    }

    fn update_counts(&mut self) {
        self.header.qdcount = self.questions.len() as u16;
        self.header.ancount = self.answers.len() as u16;
        self.header.nscount = self.authorities.len() as u16;
        self.header.arcount = self.additional.len() as u16;
    }

    /// Build the reply skeleton for a request: `qr=1`, preserved id and
    /// question section, `rcode=NOERROR`, no compression (spec §4.1:
    /// "Compress = false").
    pub fn create_response(&self) -> Self {
        let mut header = self.header.clone();
        header.qr = true;
        header.aa = false;
        header.ra = true;
        header.ancount = 0;
        header.nscount = 0;
        header.arcount = 0;

        DNSPacket {
            header,
            questions: self.questions.clone(),
            answers: Vec::new(),
            authorities: Vec::new(),
            additional: Vec::new(),
        }
    }

    pub fn to_wire(&self) -> Result<Vec<u8>, ParseError> {
        let mut packet = self.clone();
        packet.update_counts();

        let mut bytes: Vec<u8> = Vec::new();
        {
            let mut writer = BitWriter::endian(&mut bytes, BigEndian);
            packet.header.write(&mut writer)?;
            for q in &packet.questions {
                q.write(&mut writer)?;
            }
            for rr in &packet.answers {
                rr.write(&mut writer)?;
            }
            for rr in &packet.authorities {
                rr.write(&mut writer)?;
            }
            for rr in &packet.additional {
                rr.write(&mut writer)?;
            }
        }
        Ok(bytes)
    }

    pub fn from_wire(buf: &[u8]) -> Result<Self, ParseError> {
        let mut reader: BitReader<&[u8], BigEndian> = BitReader::endian(buf, BigEndian);

        let mut header = DNSHeader::default();
        header.read(&mut reader)?;

        let mut questions = Vec::with_capacity(header.qdcount as usize);
        for _ in 0..header.qdcount {
            let mut q = DNSQuestion::default();
            q.read_with_buffer(&mut reader, buf)?;
            questions.push(q);
        }

        let mut answers = Vec::with_capacity(header.ancount as usize);
        for _ in 0..header.ancount {
            let mut rr = DNSResourceRecord {
                name: String::new(),
                rtype: Default::default(),
                rclass: Default::default(),
                ttl: 0,
                rdata: super::resource_record::RData::Unknown(Vec::new()),
            };
            rr.read_with_buffer(&mut reader, buf)?;
            answers.push(rr);
        }

        let mut authorities = Vec::with_capacity(header.nscount as usize);
        for _ in 0..header.nscount {
            let mut rr = blank_rr();
            rr.read_with_buffer(&mut reader, buf)?;
            authorities.push(rr);
        }

        let mut additional = Vec::with_capacity(header.arcount as usize);
        for _ in 0..header.arcount {
            let mut rr = blank_rr();
            rr.read_with_buffer(&mut reader, buf)?;
            additional.push(rr);
        }

        Ok(DNSPacket {
            header,
            questions,
            answers,
            authorities,
            additional,
        })
    }
}

fn blank_rr() -> DNSResourceRecord {
    DNSResourceRecord {
        name: String::new(),
        rtype: Default::default(),
        rclass: Default::default(),
        ttl: 0,
        rdata: super::resource_record::RData::Unknown(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::enums::{DNSResourceClass, DNSResourceType};
    use crate::dns::resource_record::RData;
    use std::net::Ipv4Addr;

    #[test]
    fn roundtrip_simple_query_response() {
        let mut header = DNSHeader::default();
        header.id = 0x1234;
        header.rd = true;

        let mut packet = DNSPacket::new(header);
        packet.questions.push(DNSQuestion {
            labels: vec!["example".into(), "com".into()],
            qtype: DNSResourceType::A,
            qclass: DNSResourceClass::IN,
        });

        let wire = packet.to_wire().unwrap();
        let decoded = DNSPacket::from_wire(&wire).unwrap();
        assert_eq!(decoded.header.id, 0x1234);
        assert_eq!(decoded.questions.len(), 1);
        assert_eq!(decoded.questions[0].qtype, DNSResourceType::A);

        let mut response = decoded.create_response();
        response.answers.push(DNSResourceRecord {
            name: "example.com.".to_string(),
            rtype: DNSResourceType::A,
            rclass: DNSResourceClass::IN,
            ttl: 60,
            rdata: RData::A(Ipv4Addr::new(1, 2, 3, 4)),
        });

        let response_wire = response.to_wire().unwrap();
        let decoded_response = DNSPacket::from_wire(&response_wire).unwrap();
        assert!(decoded_response.header.qr);
        assert_eq!(decoded_response.answers.len(), 1);
        assert_eq!(decoded_response.answers[0].rdata, RData::A(Ipv4Addr::new(1, 2, 3, 4)));
    }
}
