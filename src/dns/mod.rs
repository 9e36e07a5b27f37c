pub mod common;
pub mod enums;
pub mod header;
pub mod packet;
pub mod question;
pub mod resource_record;
pub mod tsig;

pub use common::PacketComponent;
pub use enums::{DNSResourceClass, DNSResourceType, DnsOpcode, ResponseCode};
pub use header::DNSHeader;
pub use packet::DNSPacket;
pub use question::DNSQuestion;
pub use resource_record::{DNSResourceRecord, DnsAdditional, DnsAnswer, DnsAuthority, RData};

pub use crate::error::ParseError;
