//! RSA key generation for end-entity subject keys — a deliberately
//! minimal, isolated collaborator (SPEC_FULL.md §1): enough to produce a
//! real subject public-key blob for the end-entity issuance path, not
//! hardened PKI material.

use rsa::pkcs1::EncodeRsaPublicKey;
use rsa::{RsaPrivateKey, RsaPublicKey};

use crate::error::{CaError, CaResult};

pub const RSA_PUBKEY_PREFIX: &str = "RSA-PUBKEY:";

/// Generates a fresh 2048-bit RSA keypair and returns the subject-key
/// blob embedding its PKCS#1 DER public key as hex. The private key is
/// discarded — nothing in this system ever asks an end entity to prove
/// possession of it.
pub fn generate_end_entity_subject_key(rng: &mut (impl rand::RngCore + rand::CryptoRng)) -> CaResult<String> {
	let private_key = RsaPrivateKey::new(rng, 2048).map_err(|e| CaError::ConfigMissing(e.to_string()))?;
	let public_key = RsaPublicKey::from(&private_key);
	let der = public_key.to_pkcs1_der().map_err(|e| CaError::ConfigMissing(e.to_string()))?;
	Ok(format!("{RSA_PUBKEY_PREFIX}{}", hex::encode(der.as_bytes())))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn generates_a_distinct_pubkey_blob_each_time() {
		let a = generate_end_entity_subject_key(&mut rand::thread_rng()).unwrap();
		let b = generate_end_entity_subject_key(&mut rand::thread_rng()).unwrap();
		assert!(a.starts_with(RSA_PUBKEY_PREFIX));
		assert_ne!(a, b);
	}
}
