//! TSIG (RFC 2845) passthrough support: verify an inbound request against a
//! configured key, and sign a reply with the same algorithm.
//!
//! Scope matches spec §4.1/§6: HMAC-MD5 only, 300-second fudge, no key
//! negotiation. A verified request's reply is re-signed; an unverified one
//! is left unsigned and the failure logged (DESIGN.md: TSIG).

use hmac::{Hmac, Mac};
use md5::Md5;

use super::{
    common::display_to_labels,
    enums::{DNSResourceClass, DNSResourceType},
    resource_record::{DNSResourceRecord, RData},
};
use crate::constants::TSIG_FUDGE;

type HmacMd5 = Hmac<Md5>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TsigStatus {
    Ok,
    BadSig,
    BadKey,
}

/// A single configured TSIG key: name plus shared secret bytes.
#[derive(Debug, Clone)]
pub struct TsigKey {
    pub name: String,
    pub secret: Vec<u8>,
}

/// Locate a TSIG record in a packet's additional section (by convention the
/// last record) and verify it against the configured key, returning the
/// verification status and the key name used, or `None` if no TSIG record
/// is present (the ordinary, unsigned case).
pub fn verify(additional: &[DNSResourceRecord], message_without_tsig: &[u8], keys: &[TsigKey]) -> Option<(TsigStatus, String)> {
    let tsig_rr = additional.iter().find(|rr| rr.rtype == DNSResourceType::TSIG)?;
    let mac_from_wire = match &tsig_rr.rdata {
        RData::Unknown(bytes) => bytes.clone(),
        _ => return Some((TsigStatus::BadSig, tsig_rr.name.clone())),
    };

    let key = match keys.iter().find(|k| k.name.eq_ignore_ascii_case(&tsig_rr.name)) {
        Some(k) => k,
        None => return Some((TsigStatus::BadKey, tsig_rr.name.clone())),
    };

    let expected = compute_mac(&key.secret, message_without_tsig);
    if expected == mac_from_wire {
        Some((TsigStatus::Ok, key.name.clone()))
    } else {
        Some((TsigStatus::BadSig, key.name.clone()))
    }
}

/// Append a TSIG record to `additional` signing `message_without_tsig` with
/// `key`, using the fixed HMAC-MD5 algorithm and 300s fudge matching the
/// source's `dns.HmacMD5, 300, time.Now().Unix()` call.
pub fn sign(additional: &mut Vec<DNSResourceRecord>, key: &TsigKey, message_without_tsig: &[u8], now: u64) {
    let mac = compute_mac(&key.secret, message_without_tsig);
    additional.push(DNSResourceRecord {
        name: key.name.clone(),
        rtype: DNSResourceType::TSIG,
        rclass: DNSResourceClass::Other(255), // ANY
        ttl: 0,
        rdata: RData::Unknown(encode_tsig_rdata(&mac, now, TSIG_FUDGE)),
    });
}

fn compute_mac(secret: &[u8], message: &[u8]) -> Vec<u8> {
    let mut mac = HmacMd5::new_from_slice(secret).expect("HMAC accepts any key length");
    mac.update(message);
    mac.finalize().into_bytes().to_vec()
}

/// Minimal TSIG RDATA encoding sufficient for a passthrough responder:
/// algorithm name, 48-bit time signed, 16-bit fudge, MAC size + MAC,
/// original ID, error, other-len. Original ID/error/other-len are zeroed;
/// callers that need the request ID echoed set it via the packet header.
fn encode_tsig_rdata(mac: &[u8], time_signed: u64, fudge: u16) -> Vec<u8> {
    let mut bytes = Vec::new();
    for label in display_to_labels("hmac-md5.sig-alg.reg.int.") {
        bytes.push(label.len() as u8);
        bytes.extend(label.as_bytes());
    }
    bytes.push(0);

    let time_bytes = time_signed.to_be_bytes();
    bytes.extend(&time_bytes[2..8]); // low 48 bits
    bytes.extend(fudge.to_be_bytes());
    bytes.extend((mac.len() as u16).to_be_bytes());
    bytes.extend(mac);
    bytes.extend(0u16.to_be_bytes()); // original ID, filled by caller if needed
    bytes.extend(0u16.to_be_bytes()); // error
    bytes.extend(0u16.to_be_bytes()); // other len
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_then_verify_roundtrip() {
        let key = TsigKey {
            name: "testkey.".to_string(),
            secret: b"supersecret".to_vec(),
        };
        let message = b"pretend-dns-message-bytes";

        let mut additional = Vec::new();
        sign(&mut additional, &key, message, 1_700_000_000);

        let status = verify(&additional, message, &[key]);
        assert_eq!(status.map(|(s, _)| s), Some(TsigStatus::Ok));
    }

    #[test]
    fn unknown_key_is_bad_key() {
        let key = TsigKey {
            name: "testkey.".to_string(),
            secret: b"supersecret".to_vec(),
        };
        let message = b"pretend-dns-message-bytes";
        let mut additional = Vec::new();
        sign(&mut additional, &key, message, 1_700_000_000);

        let status = verify(&additional, message, &[]);
        assert_eq!(status.map(|(s, _)| s), Some(TsigStatus::BadKey));
    }
}
