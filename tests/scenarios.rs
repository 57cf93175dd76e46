//! End-to-end scenarios S1–S6 from SPEC_FULL.md §8, driven entirely
//! in-process: one trusted-dealer setup, then issuance/revocation/
//! validation against long-lived `CaNodeService` instances so the
//! revocation-set side effects in §4.4 are actually observable across
//! calls (a real deployment would keep these as separate node
//! processes; the in-process transport is the explicit stand-in per
//! SPEC_FULL.md §1).

use std::sync::Arc;

use threshca::curve::{G1Point, Scalar};
use threshca::error::CaError;
use threshca::issuer::{issue, now, SubjectKey};
use threshca::node::{transport::InProcess, CaNodeService, NodeTransport};
use threshca::revoker::{check_revocation_status, revoke, RevocationVerdict};
use threshca::setup::run_dealer;
use threshca::validator::{validate_chain, verify_signature_chain, verify_validity_window, NodeDirectory};

const NUM_LEVELS: u32 = 3;
const NODES_PER_LEVEL: u32 = 3;
const THRESHOLD: u32 = 2;

struct Committee {
	nodes: Vec<Box<dyn NodeTransport>>,
	master_pk: G1Point,
}

/// One committee per level, all built from a single dealer run so
/// levels 1..=NUM_LEVELS chain correctly.
struct TestWorld {
	committees: Vec<Committee>,
}

impl TestWorld {
	fn new() -> Self {
		let levels = run_dealer(NUM_LEVELS, NODES_PER_LEVEL, THRESHOLD, &mut rand::thread_rng());
		let committees = levels
			.into_iter()
			.map(|level| {
				let nodes = level
					.node_records
					.into_iter()
					.map(|r| {
						let svc = CaNodeService::new(r.node_id, r.share, r.level, r.threshold, r.master_pk);
						Box::new(InProcess(Arc::new(svc))) as Box<dyn NodeTransport>
					})
					.collect();
				Committee { nodes, master_pk: level.master_pk }
			})
			.collect();
		TestWorld { committees }
	}

	fn committee(&self, level: u32) -> &Committee {
		&self.committees[(level - 1) as usize]
	}
}

impl NodeDirectory for TestWorld {
	fn nodes_for_level(&self, level: u32) -> &[Box<dyn NodeTransport>] {
		&self.committee(level).nodes
	}
}

#[tokio::test]
async fn s1_issue_root_ca() {
	let world = TestWorld::new();
	let root_committee = world.committee(1);

	let bundle = issue(
		&root_committee.nodes,
		THRESHOLD,
		root_committee.master_pk,
		1,
		"Level1CA",
		SubjectKey::Ca(root_committee.master_pk),
		true,
		vec![],
	)
	.await
	.unwrap();

	assert_eq!(bundle.len(), 1);
	assert!(validate_chain(&bundle, Some(&root_committee.master_pk), &world, THRESHOLD, now()).await.is_ok());
}

async fn issue_chain(world: &TestWorld) -> Vec<threshca::certificate::SignedCertificate> {
	let level1 = world.committee(1);
	let root_bundle = issue(
		&level1.nodes,
		THRESHOLD,
		level1.master_pk,
		1,
		"Level1CA",
		SubjectKey::Ca(level1.master_pk),
		true,
		vec![],
	)
	.await
	.unwrap();

	let level2 = world.committee(2);
	let intermediate_bundle = issue(
		&level1.nodes,
		THRESHOLD,
		level1.master_pk,
		2,
		"Level2CA",
		SubjectKey::Ca(level2.master_pk),
		true,
		root_bundle,
	)
	.await
	.unwrap();

	issue(
		&level2.nodes,
		THRESHOLD,
		level2.master_pk,
		3,
		"endpoint",
		SubjectKey::EndEntity("RSA-PUBKEY:endpoint".into()),
		false,
		intermediate_bundle,
	)
	.await
	.unwrap()
}

#[tokio::test]
async fn s2_issue_endpoint_through_three_level_chain() {
	let world = TestWorld::new();
	let endpoint_chain = issue_chain(&world).await;

	assert_eq!(endpoint_chain.len(), 3);
	let root_anchor = world.committee(1).master_pk;
	assert!(validate_chain(&endpoint_chain, Some(&root_anchor), &world, THRESHOLD, now()).await.is_ok());
}

#[tokio::test]
async fn s3_revoke_intermediate_invalidates_endpoint_chain() {
	let world = TestWorld::new();
	let endpoint_chain = issue_chain(&world).await;
	let intermediate_serial = endpoint_chain[1].tbs.serial.clone();

	let level1 = world.committee(1);
	revoke(&level1.nodes, &level1.nodes, THRESHOLD, &intermediate_serial).await.unwrap();

	let verdict = check_revocation_status(&level1.nodes, &intermediate_serial, THRESHOLD).await;
	assert_eq!(verdict, RevocationVerdict::Revoked);

	let root_anchor = world.committee(1).master_pk;
	let err = validate_chain(&endpoint_chain, Some(&root_anchor), &world, THRESHOLD, now()).await.unwrap_err();
	assert_eq!(err, CaError::RevokedByCommittee);
}

#[tokio::test]
async fn s4_insufficient_partials_when_two_of_three_nodes_are_down() {
	let world = TestWorld::new();
	let level1 = world.committee(1);

	// Only one of three nodes reachable; threshold is 2.
	let wrapped: Vec<Box<dyn NodeTransport>> =
		level1.nodes.iter().take(1).map(|n| Box::new(PassThrough(n)) as Box<dyn NodeTransport>).collect();

	let err = issue(
		&wrapped,
		THRESHOLD,
		level1.master_pk,
		1,
		"Level1CA",
		SubjectKey::Ca(level1.master_pk),
		true,
		vec![],
	)
	.await
	.unwrap_err();

	assert_eq!(err, CaError::InsufficientPartials);
}

/// Forwards every call to a borrowed node; lets S4 reuse `world`'s real
/// committee nodes while only exposing one of them to the issuer.
struct PassThrough<'a>(&'a Box<dyn NodeTransport>);

#[async_trait::async_trait]
impl<'a> NodeTransport for PassThrough<'a> {
	async fn sign_partial(&self, req: threshca::node::SignPartialRequest) -> threshca::node::PartialSigResponse {
		self.0.sign_partial(req).await
	}
	async fn sign_revoke_partial(
		&self,
		req: threshca::node::SignRevokePartialRequest,
	) -> threshca::node::PartialSigResponse {
		self.0.sign_revoke_partial(req).await
	}
	async fn apply_revocation(
		&self,
		req: threshca::node::ApplyRevocationRequest,
	) -> threshca::node::ApplyRevocationResponse {
		self.0.apply_revocation(req).await
	}
	async fn ocsp(&self, req: threshca::node::OcspRequest) -> threshca::node::OcspResponse {
		self.0.ocsp(req).await
	}
}

#[tokio::test]
async fn s5_tampered_cert_fails_signature_check() {
	let world = TestWorld::new();
	let mut endpoint_chain = issue_chain(&world).await;
	endpoint_chain[0].tbs.subject_cn.push('!');

	let root_anchor = world.committee(1).master_pk;
	let err = verify_signature_chain(&endpoint_chain, Some(&root_anchor)).unwrap_err();
	assert!(matches!(err, CaError::ChainBroken(_)));
}

#[tokio::test]
async fn s6_expired_cert_is_rejected_even_with_valid_signature() {
	let world = TestWorld::new();
	let root_committee = world.committee(1);
	let mut bundle = issue(
		&root_committee.nodes,
		THRESHOLD,
		root_committee.master_pk,
		1,
		"Level1CA",
		SubjectKey::Ca(root_committee.master_pk),
		true,
		vec![],
	)
	.await
	.unwrap();
	bundle[0].tbs.not_after = now() - 1;

	assert!(verify_signature_chain(&bundle, Some(&root_committee.master_pk)).is_ok());
	let err = verify_validity_window(&bundle, now()).unwrap_err();
	assert_eq!(err, CaError::Expired);
}

/// Testable property 5 (SPEC_FULL.md §8): H2 is a pure function of the
/// message, independent of anything else in the system.
#[test]
fn h2_is_deterministic() {
	use threshca::curve::G2Point;
	assert_eq!(G2Point::hash_to_g2(b"same"), G2Point::hash_to_g2(b"same"));
}

/// Testable property 3: a t-1 subset can never satisfy the pairing check.
#[tokio::test]
async fn threshold_minus_one_partials_cannot_forge_a_valid_signature() {
	let sk = Scalar::random(&mut rand::thread_rng());
	let pk = G1Point::from_scalar(&sk);
	let shares = threshca::shamir::split(sk, 3, 2, &mut rand::thread_rng());

	// Only one share: cannot even attempt Lagrange combination meaningfully
	// against a 2-of-3 scheme without a partner index.
	let lone = &shares[0..1];
	let lambdas = threshca::shamir::lagrange_at_zero(&[lone[0].index]).unwrap();
	let msg = b"threshold test message";
	let partial_sig = threshca::curve::G2Point::hash_to_g2(msg) * &lone[0].scalar;
	let bogus_agg = partial_sig * &lambdas[0];

	assert!(!threshca::curve::verify_pairing(&bogus_agg, msg, &pk));
}
