//! The trusted-dealer setup procedure: per-level master key derivation,
//! Shamir split, per-node share records, and the hex trust-anchor file.
//!
//! Grounded on `setup.py` in the original source: `H_to_scalar`,
//! `shamir_split`, and the `node_config/level<L>/node<I>.json` /
//! `level<L>_master_pk.hex` file layout.

pub mod dkg_stub;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::curve::{G1Point, Scalar};
use crate::error::CaResult;
use crate::shamir;

/// Domain-separation prefix fed into the master-secret KDF, concatenated
/// directly with the level number's ASCII decimal rendering (no
/// separator) — matches `setup.py`'s `f"thresh-demo-master-level{level}"`.
const MASTER_SEED_PREFIX: &str = "thresh-demo-master-level";

/// Derives `masterSK_ℓ = SHA-256("thresh-demo-master-level" || ℓ) mod R`.
/// Deterministic by design, for reproducible demo/test setups.
pub fn derive_master_sk(level: u32) -> Scalar {
	use sha2::{Digest, Sha256};
	let seed = format!("{MASTER_SEED_PREFIX}{level}");
	let digest: [u8; 32] = Sha256::digest(seed.as_bytes()).into();
	Scalar::from_sha256_digest_mod_order(digest)
}

/// One node's share of one level's master key, plus the redundant
/// level/threshold/master-PK context the spec's per-node config record
/// carries alongside the share.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeShareRecord {
	pub node_id: u32,
	pub share: Scalar,
	pub level: u32,
	pub threshold: u32,
	#[serde(with = "crate::curve::g1_hex_serde")]
	pub master_pk: G1Point,
}

/// The complete output of running the dealer for one level: the master
/// public key (the level's trust anchor) and every node's share record.
pub struct LevelKeyMaterial {
	pub level: u32,
	pub threshold: u32,
	pub master_pk: G1Point,
	pub node_records: Vec<NodeShareRecord>,
}

/// Runs the dealer for levels `1..=num_levels`, each with `nodes_per_level`
/// shares at the given `threshold`. `masterSK_ℓ` lives only for the
/// duration of [`shamir::split`] and is wiped via `Scalar`'s
/// `ZeroizeOnDrop` the moment this function returns.
pub fn run_dealer(
	num_levels: u32,
	nodes_per_level: u32,
	threshold: u32,
	rng: &mut impl rand::RngCore,
) -> Vec<LevelKeyMaterial> {
	(1..=num_levels)
		.map(|level| {
			let master_sk = derive_master_sk(level);
			let master_pk = G1Point::from_scalar(&master_sk);
			let shares = shamir::split(master_sk, nodes_per_level, threshold, rng);
			let node_records = shares
				.into_iter()
				.map(|s| NodeShareRecord { node_id: s.index, share: s.scalar, level, threshold, master_pk })
				.collect();
			LevelKeyMaterial { level, threshold, master_pk, node_records }
		})
		.collect()
}

pub fn trust_anchor_filename(level: u32) -> String {
	format!("level{level}_master_pk.hex")
}

/// Writes `node_config/level<L>/node<I>.json` for every record, plus
/// `level<L>_master_pk.hex` next to `base_dir`, matching `setup.py`'s
/// output layout one-for-one.
pub fn persist_level(base_dir: &Path, material: &LevelKeyMaterial) -> CaResult<()> {
	std::fs::write(base_dir.join(trust_anchor_filename(material.level)), material.master_pk.to_hex()?)?;

	let level_dir = base_dir.join("node_config").join(format!("level{}", material.level));
	std::fs::create_dir_all(&level_dir)?;
	for record in &material.node_records {
		let path = level_dir.join(format!("node{}.json", record.node_id));
		std::fs::write(path, serde_json::to_string_pretty(record)?)?;
	}
	Ok(())
}
