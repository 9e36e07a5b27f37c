//! Upstream client (C4): strictly-ordered fallback UDP resolver, grounded on
//! `src/resolver.rs`'s `query_upstream`/`send_udp_query` pattern, simplified
//! to match spec §4.3's deterministic contract — no health tracking, no
//! connection pooling, no DNSSEC DO-flag, no TCP-on-truncation fallback, no
//! retries. Exact algorithm cross-checked against
//! `examples/original_source/dnsutils/dnsserver.go`'s `realQuery`.

use tokio::net::UdpSocket;
use tracing::{debug, warn};

use crate::constants::UPSTREAM_TIMEOUT;
use crate::dns::packet::DNSPacket;
use crate::error::HostwardenError;

/// Query each upstream in order with a 5s timeout; success = transport
/// returned a message AND its Answer section is non-empty. Returns the
/// first successful reply, or an error once every upstream is exhausted.
pub async fn query(message: &DNSPacket, upstreams: &[String]) -> Result<DNSPacket, HostwardenError> {
    let wire = message.to_wire()?;

    for upstream in upstreams {
        match query_one(&wire, upstream).await {
            Ok(reply) if !reply.answers.is_empty() => {
                debug!(upstream, "upstream answered");
                return Ok(reply);
            }
            Ok(_) => {
                warn!(upstream, "upstream returned empty answer, trying next");
            }
            Err(e) => {
                warn!(upstream, error = %e, "upstream query failed, trying next");
            }
        }
    }

    Err(HostwardenError::Upstream(format!(
        "no answer from any of {} upstream(s)",
        upstreams.len()
    )))
}

async fn query_one(wire: &[u8], upstream: &str) -> Result<DNSPacket, HostwardenError> {
    let socket = UdpSocket::bind("0.0.0.0:0")
        .await
        .map_err(HostwardenError::Io)?;
    socket
        .connect(upstream)
        .await
        .map_err(HostwardenError::Io)?;
    socket.send(wire).await.map_err(HostwardenError::Io)?;

    let mut buf = [0u8; 4096];
    let len = tokio::time::timeout(UPSTREAM_TIMEOUT, socket.recv(&mut buf))
        .await
        .map_err(|_| HostwardenError::Upstream(format!("{upstream} timed out")))?
        .map_err(HostwardenError::Io)?;

    DNSPacket::from_wire(&buf[..len]).map_err(HostwardenError::Parse)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::enums::{DNSResourceClass, DNSResourceType};
    use crate::dns::header::DNSHeader;
    use crate::dns::question::DNSQuestion;
    use crate::dns::resource_record::RData;
    use std::net::Ipv4Addr;

    async fn fake_upstream(answer_empty: bool) -> String {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = socket.local_addr().unwrap().to_string();

        tokio::spawn(async move {
            let mut buf = [0u8; 512];
            let (len, peer) = socket.recv_from(&mut buf).await.unwrap();
            let request = DNSPacket::from_wire(&buf[..len]).unwrap();
            let mut response = request.create_response();
            if !answer_empty {
                response.answers.push(crate::dns::resource_record::DNSResourceRecord {
                    name: "x.test.".to_string(),
                    rtype: DNSResourceType::A,
                    rclass: DNSResourceClass::IN,
                    ttl: 60,
                    rdata: RData::A(Ipv4Addr::new(10, 0, 0, 1)),
                });
            }
            let wire = response.to_wire().unwrap();
            socket.send_to(&wire, peer).await.unwrap();
        });

        addr
    }

    fn sample_query() -> DNSPacket {
        let mut header = DNSHeader::default();
        header.id = 1;
        header.rd = true;
        let mut packet = DNSPacket::new(header);
        packet.questions.push(DNSQuestion {
            labels: vec!["x".into(), "test".into()],
            qtype: DNSResourceType::A,
            qclass: DNSResourceClass::IN,
        });
        packet
    }

    #[tokio::test]
    async fn succeeds_on_first_upstream_with_answers() {
        let addr = fake_upstream(false).await;
        let reply = query(&sample_query(), &[addr]).await.unwrap();
        assert_eq!(reply.answers.len(), 1);
    }

    #[tokio::test]
    async fn falls_through_empty_answer_to_next_upstream() {
        let empty_addr = fake_upstream(true).await;
        let good_addr = fake_upstream(false).await;
        let reply = query(&sample_query(), &[empty_addr, good_addr]).await.unwrap();
        assert_eq!(reply.answers.len(), 1);
    }

    #[tokio::test]
    async fn all_upstreams_exhausted_is_an_error() {
        let addr = fake_upstream(true).await;
        let result = query(&sample_query(), &[addr]).await;
        assert!(result.is_err());
    }
}
