//! The chain validator: per-link pairing verification, validity-window
//! checks, and per-non-root-cert revocation consensus.
//!
//! Grounded on `client/is_valid.py`: `verify_chain`'s child-against-parent
//! loop plus root-against-trust-anchor-or-self-signed fallback, and
//! `is_valid_chain`'s three-phase (signatures, dates, revocation) checks.

use crate::certificate::SignedCertificate;
use crate::curve::G1Point;
use crate::error::{CaError, CaResult};
use crate::node::NodeTransport;
use crate::revoker::{check_revocation_status, RevocationVerdict};

/// Looks up the node set for a certificate's issuing level. The spec
/// leaves the mapping from level to node endpoints to a collaborator
/// (its own `LEVEL<ℓ>_NODES` config key); we take it as a plain function
/// so the validator stays decoupled from any particular config source.
pub trait NodeDirectory {
	fn nodes_for_level(&self, level: u32) -> &[Box<dyn NodeTransport>];
}

/// Verifies every `(child, parent)` signature link in `chain`, which must
/// be ordered `[leaf, ..., root]`. The root is checked against
/// `trust_anchor` if supplied, otherwise as self-signed against its own
/// embedded key.
pub fn verify_signature_chain(chain: &[SignedCertificate], trust_anchor: Option<&G1Point>) -> CaResult<()> {
	if chain.is_empty() {
		return Err(CaError::ChainBroken("empty certificate chain".into()));
	}

	for pair in chain.windows(2) {
		let [child, parent] = pair else { unreachable!("windows(2) always yields pairs") };
		let issuer_pk = parent.tbs.subject_bls_pubkey()?;
		if !crate::curve::verify_pairing(&child.sig, &child.tbs.to_tbs_bytes(), &issuer_pk) {
			return Err(CaError::ChainBroken(format!(
				"{} not signed by {}",
				child.tbs.subject_cn, parent.tbs.subject_cn
			)));
		}
	}

	let root = chain.last().expect("checked non-empty above");
	let root_pk = match trust_anchor {
		Some(anchor) => *anchor,
		None => root.tbs.subject_bls_pubkey()?,
	};
	if !crate::curve::verify_pairing(&root.sig, &root.tbs.to_tbs_bytes(), &root_pk) {
		return Err(CaError::ChainBroken("root self-signature invalid".into()));
	}
	Ok(())
}

pub fn verify_validity_window(chain: &[SignedCertificate], now: i64) -> CaResult<()> {
	for cert in chain {
		if !(cert.tbs.not_before <= now && now <= cert.tbs.not_after) {
			return Err(CaError::Expired);
		}
	}
	Ok(())
}

/// Queries revocation status for every non-root certificate against its
/// issuing level's node set. `REVOKED` or `UNKNOWN` invalidates the chain.
pub async fn verify_not_revoked(chain: &[SignedCertificate], directory: &dyn NodeDirectory, threshold: u32) -> CaResult<()> {
	for cert in &chain[..chain.len().saturating_sub(1)] {
		let issuer_level = cert.tbs.issuer_level()?;
		let nodes = directory.nodes_for_level(issuer_level);
		match check_revocation_status(nodes, &cert.tbs.serial, threshold).await {
			RevocationVerdict::Revoked => return Err(CaError::RevokedByCommittee),
			RevocationVerdict::Unknown => return Err(CaError::StatusUnknown),
			RevocationVerdict::Good => {}
		}
	}
	Ok(())
}

/// Runs all three phases in order: signatures, then validity window, then
/// revocation. Matches `is_valid_chain`'s check ordering; any phase's
/// failure is the overall verdict (we stop at the first failing phase
/// rather than collecting every message, since `CaError` already carries
/// a description).
pub async fn validate_chain(
	chain: &[SignedCertificate],
	trust_anchor: Option<&G1Point>,
	directory: &dyn NodeDirectory,
	threshold: u32,
	now: i64,
) -> CaResult<()> {
	verify_signature_chain(chain, trust_anchor)?;
	verify_validity_window(chain, now)?;
	verify_not_revoked(chain, directory, threshold).await
}
