//! The CA node service: holds one Shamir share of a level's master secret,
//! answers `SignPartial`/`SignRevokePartial`/`ApplyRevocation`/`OCSP`, and
//! owns the local revocation set. Purely reactive — never initiates an
//! RPC, never persists, never rate-limits.
//!
//! Grounded on `sharedca/server.py`'s four gRPC handlers, and on the
//! teacher's RPC-surface-as-a-trait pattern (`MultisigClientApi` in
//! `client.rs`) for `NodeTransport`.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::curve::{G1Point, G2Point, Scalar};

/// `GOOD`/`REVOKED` as reported by a single node's local view — not yet
/// the t-of-n consensus verdict (see [`crate::revoker::check_revocation_status`]).
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum OcspStatus {
	Good,
	Revoked,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SignPartialRequest {
	pub tbs_cert: Vec<u8>,
	pub req_id: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SignRevokePartialRequest {
	pub serial: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApplyRevocationRequest {
	pub serial: String,
	pub threshold_sig: Vec<u8>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OcspRequest {
	pub serial: String,
}

/// Response shape shared by `SignPartial` and `SignRevokePartial`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PartialSigResponse {
	pub ok: bool,
	pub msg: String,
	pub partial_sig: Vec<u8>,
	pub node_index: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApplyRevocationResponse {
	pub ok: bool,
	pub msg: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OcspResponse {
	pub status: OcspStatus,
	pub threshold_sig: Vec<u8>,
}

fn revoke_message(serial: &str) -> Vec<u8> {
	format!("REVOKE:{serial}").into_bytes()
}

/// A single CA node's state: its share of one level's master secret, the
/// level's public parameters, and its local revocation set.
pub struct CaNodeService {
	index: u32,
	share: Scalar,
	level: u32,
	threshold: u32,
	master_pk: G1Point,
	revoked: Mutex<HashSet<String>>,
}

impl CaNodeService {
	pub fn new(index: u32, share: Scalar, level: u32, threshold: u32, master_pk: G1Point) -> Self {
		CaNodeService { index, share, level, threshold, master_pk, revoked: Mutex::new(HashSet::new()) }
	}

	pub fn level(&self) -> u32 {
		self.level
	}

	pub fn threshold(&self) -> u32 {
		self.threshold
	}

	#[tracing::instrument(skip(self, tbs_cert), fields(node_index = self.index))]
	pub fn sign_partial(&self, tbs_cert: &[u8], req_id: &str) -> PartialSigResponse {
		let sig = G2Point::hash_to_g2(tbs_cert) * &self.share;
		PartialSigResponse {
			ok: true,
			msg: format!("signed {req_id}"),
			partial_sig: sig.to_bytes().to_vec(),
			node_index: self.index,
		}
	}

	/// Signs `REVOKE:<serial>` and *optimistically* marks `serial` revoked
	/// in this node's local set before the threshold proof exists — see
	/// SPEC_FULL.md §9 on why this is benign under the t-of-n rule.
	#[tracing::instrument(skip(self), fields(node_index = self.index))]
	pub fn sign_revoke_partial(&self, serial: &str) -> PartialSigResponse {
		let sig = G2Point::hash_to_g2(&revoke_message(serial)) * &self.share;
		self.revoked.lock().expect("revocation set mutex poisoned").insert(serial.to_string());
		PartialSigResponse {
			ok: true,
			msg: format!("revoke-signed {serial}"),
			partial_sig: sig.to_bytes().to_vec(),
			node_index: self.index,
		}
	}

	/// Verifies the aggregated threshold signature against this node's
	/// `master_pk` before mutating state. A forged or mismatched signature
	/// never touches the revocation set.
	#[tracing::instrument(skip(self, threshold_sig), fields(node_index = self.index))]
	pub fn apply_revocation(&self, serial: &str, threshold_sig: &[u8]) -> ApplyRevocationResponse {
		let sig = match G2Point::from_bytes(threshold_sig) {
			Ok(sig) => sig,
			Err(e) => return ApplyRevocationResponse { ok: false, msg: e.to_string() },
		};
		if !crate::curve::verify_pairing(&sig, &revoke_message(serial), &self.master_pk) {
			return ApplyRevocationResponse { ok: false, msg: "pairing check failed".into() };
		}
		self.revoked.lock().expect("revocation set mutex poisoned").insert(serial.to_string());
		ApplyRevocationResponse { ok: true, msg: "applied".into() }
	}

	/// Reports this node's local view only; does not consult other nodes.
	pub fn ocsp(&self, serial: &str) -> OcspResponse {
		let revoked = self.revoked.lock().expect("revocation set mutex poisoned").contains(serial);
		OcspResponse {
			status: if revoked { OcspStatus::Revoked } else { OcspStatus::Good },
			threshold_sig: Vec::new(),
		}
	}
}

/// The node RPC surface from SPEC_FULL.md §6, abstracted so a client can
/// drive either the in-process transport below or a real network
/// transport (the explicit out-of-scope collaborator boundary).
#[async_trait]
pub trait NodeTransport: Send + Sync {
	async fn sign_partial(&self, req: SignPartialRequest) -> PartialSigResponse;
	async fn sign_revoke_partial(&self, req: SignRevokePartialRequest) -> PartialSigResponse;
	async fn apply_revocation(&self, req: ApplyRevocationRequest) -> ApplyRevocationResponse;
	async fn ocsp(&self, req: OcspRequest) -> OcspResponse;
}

pub mod transport {
	use std::sync::Arc;

	use async_trait::async_trait;

	use super::*;

	/// Drives a [`CaNodeService`] directly, in the same process — what the
	/// scenario tests and the CLI use. A real deployment swaps this for a
	/// gRPC/QUIC/whatever client implementing the same trait; that wire
	/// framing is explicitly out of scope here (SPEC_FULL.md §1).
	pub struct InProcess(pub Arc<CaNodeService>);

	#[async_trait]
	impl NodeTransport for InProcess {
		async fn sign_partial(&self, req: SignPartialRequest) -> PartialSigResponse {
			self.0.sign_partial(&req.tbs_cert, &req.req_id)
		}

		async fn sign_revoke_partial(&self, req: SignRevokePartialRequest) -> PartialSigResponse {
			self.0.sign_revoke_partial(&req.serial)
		}

		async fn apply_revocation(&self, req: ApplyRevocationRequest) -> ApplyRevocationResponse {
			self.0.apply_revocation(&req.serial, &req.threshold_sig)
		}

		async fn ocsp(&self, req: OcspRequest) -> OcspResponse {
			self.0.ocsp(&req.serial)
		}
	}
}
