//! The client issuance flow: build a TBS, fan out to the issuing level's
//! nodes until threshold partials are collected, aggregate, verify, and
//! emit a certificate bundle.
//!
//! Grounded on `client/sign.py`: `request_partials`'s sequential
//! contact-until-threshold loop and `aggregate_threshold`'s Lagrange
//! combination, carried over field-for-field.

use std::time::Duration;

use crate::certificate::{Certificate, SignedCertificate, BLS_PUBKEY_PREFIX};
use crate::curve::G2Point;
use crate::error::{CaError, CaResult};
use crate::node::{NodeTransport, SignPartialRequest};
use crate::shamir;

/// How long the client waits for a single node before treating it as
/// unavailable and moving on, per SPEC_FULL.md §5 ("a few seconds").
pub const NODE_CALL_DEADLINE: Duration = Duration::from_secs(3);

/// Either `BLS-PUBKEY:<hex g1>` for a CA cert, or a pre-built subject-key
/// blob for an end-entity cert (the RSA keypair collaborator's output —
/// out of scope here per SPEC_FULL.md §1).
pub enum SubjectKey {
	Ca(crate::curve::G1Point),
	EndEntity(String),
}

impl SubjectKey {
	fn to_blob(&self) -> CaResult<String> {
		match self {
			SubjectKey::Ca(pk) => Ok(format!("{BLS_PUBKEY_PREFIX}{}", pk.to_hex()?)),
			SubjectKey::EndEntity(blob) => Ok(blob.clone()),
		}
	}
}

/// One second-precision Unix timestamp; kept as a thin wrapper purely so
/// call sites read `now()`/`plus_days` instead of raw `SystemTime` math.
pub fn now() -> i64 {
	std::time::SystemTime::now()
		.duration_since(std::time::UNIX_EPOCH)
		.expect("system clock is before the Unix epoch")
		.as_secs() as i64
}

pub const DEFAULT_VALIDITY: Duration = Duration::from_secs(365 * 24 * 3600);

/// Fans out `tbs` to `nodes` sequentially (contact order = list order),
/// stopping as soon as `threshold` successful partials are collected.
/// Failures (timeout, transport error, `ok=false`) are skipped without
/// retry — matches `request_partials` exactly.
async fn collect_partials(
	nodes: &[Box<dyn NodeTransport>],
	tbs: &[u8],
	threshold: u32,
) -> Vec<(u32, G2Point)> {
	let mut partials = Vec::new();
	for node in nodes {
		let req = SignPartialRequest { tbs_cert: tbs.to_vec(), req_id: uuid::Uuid::new_v4().to_string() };
		let call = tokio::time::timeout(NODE_CALL_DEADLINE, node.sign_partial(req));
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

/// `Σ λ_i(0) · sig_i` over the collected indices, sorted by index first so
/// the aggregate is stable regardless of node response order (SPEC_FULL.md
/// §5, "Sequential fan-out").
fn aggregate(mut partials: Vec<(u32, G2Point)>) -> CaResult<G2Point> {
	partials.sort_by_key(|(index, _)| *index);
	let indices: Vec<u32> = partials.iter().map(|(i, _)| *i).collect();
	let lambdas = shamir::lagrange_at_zero(&indices)?;
	Ok(partials
		.into_iter()
		.zip(lambdas.iter())
		.map(|((_, sig), lambda)| sig * lambda)
		.fold(G2Point::identity(), |acc, term| acc + term))
}

/// Issues one certificate and returns it bundled with `parent_chain`
/// (`[parent, grandparent, ..., root]`, already-signed, in that order —
/// the caller owns loading it from disk for `level > 1`).
pub async fn issue(
	nodes: &[Box<dyn NodeTransport>],
	issuer_level_threshold: u32,
	issuer_master_pk: crate::curve::G1Point,
	level: u32,
	cn: &str,
	subject_key: SubjectKey,
	is_ca: bool,
	parent_chain: Vec<SignedCertificate>,
) -> CaResult<Vec<SignedCertificate>> {
	let issuer_cn = if level == 1 { "self".to_string() } else { format!("Level{}CA", level - 1) };

	let tbs = Certificate {
		serial: uuid::Uuid::new_v4().to_string(),
		subject_cn: cn.to_string(),
		issuer_cn,
		not_before: now(),
		not_after: now() + DEFAULT_VALIDITY.as_secs() as i64,
		subject_pub_blob: subject_key.to_blob()?,
		is_ca,
	};
	let tbs_bytes = tbs.to_tbs_bytes();

	let partials = collect_partials(nodes, &tbs_bytes, issuer_level_threshold).await;
	if (partials.len() as u32) < issuer_level_threshold {
		return Err(CaError::InsufficientPartials);
	}

	let agg = aggregate(partials)?;
	if !crate::curve::verify_pairing(&agg, &tbs_bytes, &issuer_master_pk) {
		return Err(CaError::AggregationFailed);
	}

	let signed = SignedCertificate { tbs, sig: agg };
	let mut bundle = vec![signed];
	bundle.extend(parent_chain);
	Ok(bundle)
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;

	use super::*;
	use crate::curve::{G1Point, Scalar};
	use crate::node::{transport::InProcess, CaNodeService};

	fn make_committee(n: u32, t: u32) -> (Vec<Box<dyn NodeTransport>>, G1Point) {
		let master_sk = Scalar::random(&mut rand::thread_rng());
		let master_pk = G1Point::from_scalar(&master_sk);
		let shares = shamir::split(master_sk, n, t, &mut rand::thread_rng());
		let nodes = shares
			.into_iter()
			.map(|s| {
				let svc = CaNodeService::new(s.index, s.scalar, 1, t, master_pk);
				Box::new(InProcess(Arc::new(svc))) as Box<dyn NodeTransport>
			})
			.collect();
		(nodes, master_pk)
	}

	#[tokio::test]
	async fn issues_a_root_ca_certificate() {
		let (nodes, master_pk) = make_committee(3, 2);
		let bundle = issue(&nodes, 2, master_pk, 1, "Level1CA", SubjectKey::Ca(master_pk), true, vec![])
			.await
			.unwrap();
		assert_eq!(bundle.len(), 1);
		assert!(bundle[0].tbs.is_ca);
		assert_eq!(bundle[0].tbs.issuer_cn, "self");
	}

	#[tokio::test]
	async fn insufficient_partials_when_too_few_nodes_respond() {
		let (nodes, master_pk) = make_committee(3, 2);
		let crippled = vec![nodes.into_iter().next().unwrap()];
		let err = issue(&crippled, 2, master_pk, 1, "Level1CA", SubjectKey::Ca(master_pk), true, vec![])
			.await
			.unwrap_err();
		assert_eq!(err, CaError::InsufficientPartials);
	}
}
