//! Query handler (C5): per-packet dispatcher — canonicalize + cache probe +
//! negative-cache gate + upstream invoke + writeback.
//!
//! Grounded on `src/server.rs`'s `handle_dns_query_optimized`/
//! `handle_parsed_query` match-based response-code dispatch idiom, and
//! `examples/original_source/dnsutils/dnsserver.go`'s `parseQuery`/
//! `handleDnsRequest` for the exact contract. A panic inside `handle` is
//! caught at the inner `tokio::spawn` boundary in `listener.rs`'s
//! `spawn_handler`, not here: this module is free to assume its own code
//! runs to completion.

use std::sync::Arc;

use tracing::{error, warn};

use crate::cache::key::{canonicalize, reverse_label_key};
use crate::cache::{now_secs, NegativeCache, RecordCache};
use crate::constants::FAIL_TTL;
use crate::dns::enums::{DNSResourceType, DnsOpcode, ResponseCode};
use crate::dns::packet::DNSPacket;
use crate::dns::tsig::{self, TsigKey, TsigStatus};
use crate::upstream;

pub struct HandlerState {
    pub cache: Arc<RecordCache>,
    pub negative: Arc<NegativeCache>,
    pub upstreams: Vec<String>,
    pub tsig_keys: Vec<TsigKey>,
}

/// Handle one inbound datagram, producing the wire bytes of a reply. A
/// request this server can't even parse is dropped rather than answered
/// (spec §4.1, §7): there is no question section to echo back.
pub async fn handle(state: &HandlerState, request_bytes: &[u8]) -> Vec<u8> {
    let request = match DNSPacket::from_wire(request_bytes) {
        Ok(p) => p,
        Err(e) => {
            warn!(error = %e, "failed to parse request, dropping");
            return Vec::new();
        }
    };

    let opcode = DnsOpcode::from(request.header.opcode);

    let mut response = match opcode {
        DnsOpcode::Query => handle_query(state, &request).await,
        DnsOpcode::Update => handle_update(state, &request),
        DnsOpcode::Other(_) => {
            let mut r = request.create_response();
            r.header.rcode = ResponseCode::NotImplemented.to_u8();
            r
        }
    };

    maybe_sign(state, &request, &mut response, request_bytes);

    response.to_wire().unwrap_or_default()
}

async fn handle_query(state: &HandlerState, request: &DNSPacket) -> DNSPacket {
    match request.questions.len() {
        0 => {
            warn!("QUERY with zero questions");
            request.create_response()
        }
        1 => handle_single_question(state, request).await,
        _ => {
            // Multi-question QUERY: forward verbatim, no caching (spec §4.1).
            match upstream::query(request, &state.upstreams).await {
                Ok(upstream_reply) => {
                    let mut reply = request.create_response();
                    reply.answers = upstream_reply.answers;
                    reply
                }
                Err(e) => {
                    warn!(error = %e, "multi-question upstream query failed");
                    request.create_response()
                }
            }
        }
    }
}

async fn handle_single_question(state: &HandlerState, request: &DNSPacket) -> DNSPacket {
    let question = &request.questions[0];
    let name = crate::dns::common::labels_to_display(&question.labels);
    let canonical = canonicalize(&name);
    let key = reverse_label_key(&canonical);

    let mut reply = request.create_response();

    match state.cache.get_with_any_fallback(&key, question.qtype) {
        Ok(Some(rrs)) => {
            reply.answers = rrs;
            return reply;
        }
        Ok(None) => {}
        Err(e) => {
            error!(error = %e, "cache read failed, treating as miss");
        }
    }

    if state.negative.get(&key).is_some() {
        // Suppressed: return NOERROR with an empty answer, not SERVFAIL
        // (DESIGN.md Q2, intentional).
        return reply;
    }

    match upstream::query(request, &state.upstreams).await {
        Ok(upstream_reply) if !upstream_reply.answers.is_empty() => {
            reply.answers = upstream_reply.answers.clone();
            if let Err(e) = state
                .cache
                .update_record(&key, question.qtype, &upstream_reply.answers)
            {
                error!(error = %e, "failed to write back cache entry");
            }
            state.negative.delete(&key);
        }
        _ => {
            state.negative.set(&key, now_secs() + FAIL_TTL);
        }
    }

    reply
}

/// UPDATE opcode: for each question and each RR in the request's authority
/// section, call `update_record(question, [rr])` — one writeback per RR,
/// unfiltered by type (bug-compatible with the original: an RR whose type
/// doesn't match the question's is still stored keyed under the question's
/// type, and when several RRs of the same type appear only the last one
/// survives, since each call overwrites the last). Unauthenticated by
/// design (DESIGN.md Q4); access control is a non-goal.
fn handle_update(state: &HandlerState, request: &DNSPacket) -> DNSPacket {
    warn!("processing unauthenticated UPDATE request");

    for question in &request.questions {
        let name = crate::dns::common::labels_to_display(&question.labels);
        let key = reverse_label_key(&canonicalize(&name));

        for rr in &request.authorities {
            if let Err(e) = state.cache.update_record(&key, question.qtype, &[rr.clone()]) {
                error!(error = %e, "UPDATE writeback failed");
            }
        }
    }

    request.create_response()
}

fn maybe_sign(state: &HandlerState, request: &DNSPacket, response: &mut DNSPacket, request_bytes: &[u8]) {
    if !request.additional.iter().any(|rr| rr.rtype == DNSResourceType::TSIG) {
        return;
    }

    match tsig::verify(&request.additional, request_bytes, &state.tsig_keys) {
        Some((TsigStatus::Ok, key_name)) => {
            if let Some(key) = state.tsig_keys.iter().find(|k| k.name == key_name) {
                let unsigned_wire = response.to_wire().unwrap_or_default();
                tsig::sign(&mut response.additional, key, &unsigned_wire, now_secs());
            }
        }
        Some((status, key_name)) => {
            warn!(?status, key_name, "TSIG verification failed, leaving reply unsigned");
        }
        None => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::enums::{DNSResourceClass, DNSResourceType};
    use crate::dns::header::DNSHeader;
    use crate::dns::question::DNSQuestion;
    use crate::storage::MemoryStore;
    use std::net::Ipv4Addr;

    fn state() -> HandlerState {
        HandlerState {
            cache: Arc::new(RecordCache::new(Arc::new(MemoryStore::new()))),
            negative: Arc::new(NegativeCache::new()),
            upstreams: vec![],
            tsig_keys: vec![],
        }
    }

    fn wire_query(name: &[&str], qtype: DNSResourceType) -> Vec<u8> {
        let mut header = DNSHeader::default();
        header.id = 42;
        header.rd = true;
        let mut packet = DNSPacket::new(header);
        packet.questions.push(DNSQuestion {
            labels: name.iter().map(|s| s.to_string()).collect(),
            qtype,
            qclass: DNSResourceClass::IN,
        });
        packet.to_wire().unwrap()
    }

    #[tokio::test]
    async fn overlay_hit_answers_from_cache_without_upstream() {
        let state = state();
        let mut overlay = std::collections::HashMap::new();
        overlay.insert("x.test".to_string(), Ipv4Addr::new(10, 0, 0, 5));
        state.cache.install_overlay(&overlay).unwrap();

        let reply = handle(&state, &wire_query(&["x", "test"], DNSResourceType::A)).await;
        let decoded = DNSPacket::from_wire(&reply).unwrap();
        assert_eq!(decoded.answers.len(), 1);
        assert!(decoded.header.qr);
    }

    #[tokio::test]
    async fn miss_with_no_upstreams_sets_negative_cache() {
        let state = state();
        let reply = handle(&state, &wire_query(&["nope", "test"], DNSResourceType::A)).await;
        let decoded = DNSPacket::from_wire(&reply).unwrap();
        assert!(decoded.answers.is_empty());

        let key = reverse_label_key(&canonicalize("nope.test."));
        assert!(state.negative.get(&key).is_some());
    }

    #[tokio::test]
    async fn zero_question_query_does_not_panic() {
        let state = state();
        let mut header = DNSHeader::default();
        header.rd = true;
        let packet = DNSPacket::new(header);
        let reply = handle(&state, &packet.to_wire().unwrap()).await;
        let decoded = DNSPacket::from_wire(&reply).unwrap();
        assert!(decoded.header.qr);
    }
}
