//! The client revocation flow and t-of-n OCSP status consensus.
//!
//! Grounded on `client/revoke.py`'s fan-out/aggregate/broadcast shape
//! (same structure as `client/sign.py`'s issuance flow, different message)
//! and `client/is_valid.py`'s revocation-status tallying.

use crate::curve::G2Point;
use crate::error::{CaError, CaResult};
use crate::node::{ApplyRevocationRequest, NodeTransport, OcspRequest, OcspStatus, SignRevokePartialRequest};

fn revoke_message(serial: &str) -> Vec<u8> {
	format!("REVOKE:{serial}").into_bytes()
}

async fn collect_revoke_partials(
	nodes: &[Box<dyn NodeTransport>],
	serial: &str,
	threshold: u32,
) -> Vec<(u32, G2Point)> {
	let mut partials = Vec::new();
	for node in nodes {
		let req = SignRevokePartialRequest { serial: serial.to_string() };
		let call = tokio::time::timeout(crate::issuer::NODE_CALL_DEADLINE, node.sign_revoke_partial(req));
		let Ok(resp) = call.await else { continue };
		if !resp.ok {
			continue;
		}
		let Ok(sig) = G2Point::from_bytes(&resp.partial_sig) else { continue };
		partials.push((resp.node_index, sig));
		if partials.len() as u32 >= threshold {
			break;
		}
	}
	partials
}

fn aggregate(mut partials: Vec<(u32, G2Point)>) -> CaResult<G2Point> {
	partials.sort_by_key(|(index, _)| *index);
	let indices: Vec<u32> = partials.iter().map(|(i, _)| *i).collect();
	let lambdas = crate::shamir::lagrange_at_zero(&indices)?;
	Ok(partials
		.into_iter()
		.zip(lambdas.iter())
		.map(|((_, sig), lambda)| sig * lambda)
		.fold(G2Point::identity(), |acc, term| acc + term))
}

/// Revokes `serial`: fans out to the issuing level's nodes until
/// `threshold` revoke-partials are collected, aggregates, then broadcasts
/// `ApplyRevocation` to *every* node in `all_nodes` (not just the ones
/// that signed). Per-node broadcast failures are non-fatal; a node that
/// missed the broadcast learns later via a repeated one.
pub async fn revoke(
	issuing_nodes: &[Box<dyn NodeTransport>],
	all_nodes: &[Box<dyn NodeTransport>],
	threshold: u32,
	serial: &str,
) -> CaResult<()> {
	let partials = collect_revoke_partials(issuing_nodes, serial, threshold).await;
	if (partials.len() as u32) < threshold {
		return Err(CaError::InsufficientPartials);
	}
	let agg = aggregate(partials)?;

	for node in all_nodes {
		let req = ApplyRevocationRequest { serial: serial.to_string(), threshold_sig: agg.to_bytes().to_vec() };
		let _ = tokio::time::timeout(crate::issuer::NODE_CALL_DEADLINE, node.apply_revocation(req)).await;
	}
	Ok(())
}

/// The *t*-of-*n* OCSP consensus rule: `REVOKED` if at least `threshold`
/// nodes report revoked, `UNKNOWN` if nobody responded, `GOOD` otherwise.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RevocationVerdict {
	Good,
	Revoked,
	Unknown,
}

pub async fn check_revocation_status(
	nodes: &[Box<dyn NodeTransport>],
	serial: &str,
	threshold: u32,
) -> RevocationVerdict {
	let mut responders = 0u32;
	let mut revoked_count = 0u32;
	for node in nodes {
		let req = OcspRequest { serial: serial.to_string() };
		let Ok(resp) = tokio::time::timeout(crate::issuer::NODE_CALL_DEADLINE, node.ocsp(req)).await else {
			continue;
		};
		responders += 1;
		if resp.status == OcspStatus::Revoked {
			revoked_count += 1;
		}
	}

	if responders == 0 {
		RevocationVerdict::Unknown
	} else if revoked_count >= threshold {
		RevocationVerdict::Revoked
	} else {
		RevocationVerdict::Good
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;

	use super::*;
	use crate::curve::{G1Point, Scalar};
	use crate::node::{transport::InProcess, CaNodeService};
	use crate::shamir;

	fn make_committee(n: u32, t: u32) -> Vec<Box<dyn NodeTransport>> {
		let master_sk = Scalar::random(&mut rand::thread_rng());
		let master_pk = G1Point::from_scalar(&master_sk);
		let shares = shamir::split(master_sk, n, t, &mut rand::thread_rng());
		shares
			.into_iter()
			.map(|s| {
				let svc = CaNodeService::new(s.index, s.scalar, 1, t, master_pk);
				Box::new(InProcess(Arc::new(svc))) as Box<dyn NodeTransport>
			})
			.collect()
	}

	#[tokio::test]
	async fn revoke_then_status_is_revoked_by_consensus() {
		let nodes = make_committee(3, 2);
		revoke(&nodes, &nodes, 2, "serial-123").await.unwrap();
		assert_eq!(check_revocation_status(&nodes, "serial-123", 2).await, RevocationVerdict::Revoked);
	}

	#[tokio::test]
	async fn unrevoked_serial_is_good() {
		let nodes = make_committee(3, 2);
		assert_eq!(check_revocation_status(&nodes, "never-revoked", 2).await, RevocationVerdict::Good);
	}

	#[tokio::test]
	async fn no_responders_is_unknown() {
		let nodes: Vec<Box<dyn NodeTransport>> = Vec::new();
		assert_eq!(check_revocation_status(&nodes, "whatever", 2).await, RevocationVerdict::Unknown);
	}

	#[tokio::test]
	async fn minority_revoked_reports_falls_short_of_threshold() {
		// Only one of three nodes has (optimistically) marked the serial
		// revoked locally; the t-of-n rule must not treat that as REVOKED.
		let nodes = make_committee(3, 2);
		nodes[0]
			.sign_revoke_partial(crate::node::SignRevokePartialRequest { serial: "solo".into() })
			.await;
		assert_eq!(check_revocation_status(&nodes, "solo", 2).await, RevocationVerdict::Good);
	}
}
