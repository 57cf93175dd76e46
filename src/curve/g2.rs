use group::{Curve, Group};

use super::scalar::Scalar;
use crate::error::{CaError, CaResult};

/// A point in the G2 subgroup of BLS12-381. Partial and aggregated
/// signatures, and the output of `H2`, live here.
///
/// Wire-encoded as 288 bytes: three 96-byte Fq2 coordinates (x, y, z) in
/// Jacobian form, per the system's wire contract. Every point this system
/// ever encodes is the result of a group operation followed by
/// normalization, so in practice `z` is always the Fq2 encoding of `1` for
/// a finite point, and the all-zero 96 bytes for the point at infinity
/// (the Jacobian convention for the identity). We never produce or accept
/// any other `z` — see DESIGN.md for why a general Jacobian encoder isn't
/// needed here.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct G2Point(bls12_381::G2Projective);

pub const G2_ENCODED_LEN: usize = 288;
const COORD_LEN: usize = 96;

/// Canonical 96-byte encoding of the Fq2 element `1` used as the Jacobian
/// `z` coordinate of every finite point this system encodes.
const Z_ONE: [u8; COORD_LEN] = {
	let mut b = [0u8; COORD_LEN];
	b[COORD_LEN - 1] = 1;
	b
};
const Z_ZERO: [u8; COORD_LEN] = [0u8; COORD_LEN];

impl G2Point {
	pub fn generator() -> Self {
		G2Point(bls12_381::G2Projective::generator())
	}

	pub fn identity() -> Self {
		G2Point(bls12_381::G2Projective::identity())
	}

	pub fn from_scalar(scalar: &Scalar) -> Self {
		G2Point(bls12_381::G2Projective::generator() * scalar.0)
	}

	pub fn is_identity(&self) -> bool {
		bool::from(self.0.is_identity())
	}

	pub(crate) fn affine(&self) -> bls12_381::G2Affine {
		self.0.to_affine()
	}

	pub(crate) fn from_affine(affine: bls12_381::G2Affine) -> Self {
		G2Point(bls12_381::G2Projective::from(affine))
	}

	/// Deterministic hash-to-curve used for both certificate and revocation
	/// messages: `H2(m) = [SHA-256(m) mod R] * G2`. This is *not*
	/// indifferentiable from a random oracle and must never be swapped for a
	/// standards-compliant hash-to-curve (e.g. SSWU) without bumping the wire
	/// version — see spec's design notes.
	pub fn hash_to_g2(msg: &[u8]) -> Self {
		use sha2::{Digest, Sha256};
		let digest: [u8; 32] = Sha256::digest(msg).into();
		let scalar = Scalar::from_sha256_digest_mod_order(digest);
		G2Point::from_scalar(&scalar)
	}

	pub fn to_bytes(&self) -> [u8; G2_ENCODED_LEN] {
		let mut out = [0u8; G2_ENCODED_LEN];
		if self.is_identity() {
			out[2 * COORD_LEN..].copy_from_slice(&Z_ZERO);
			return out;
		}
		let xy = self.affine().to_uncompressed();
		out[..2 * COORD_LEN].copy_from_slice(&xy);
		out[2 * COORD_LEN..].copy_from_slice(&Z_ONE);
		out
	}

	pub fn from_bytes(bytes: &[u8]) -> CaResult<Self> {
		let arr: [u8; G2_ENCODED_LEN] =
			bytes.try_into().map_err(|_| CaError::MalformedPoint)?;
		let z = &arr[2 * COORD_LEN..];
		if z == Z_ZERO {
			return Err(CaError::PointAtInfinity);
		}
		if z != Z_ONE {
			return Err(CaError::MalformedPoint);
		}
		let xy: [u8; 2 * COORD_LEN] = arr[..2 * COORD_LEN].try_into().unwrap();
		let affine: Option<bls12_381::G2Affine> = bls12_381::G2Affine::from_uncompressed(&xy).into();
		let affine = affine.ok_or(CaError::MalformedPoint)?;
		if bool::from(affine.is_identity()) {
			// Would only happen for a maliciously crafted all-flags-set
			// encoding claiming z = 1; treat it the same as any other
			// malformed input rather than silently accepting it as infinity.
			return Err(CaError::MalformedPoint);
		}
		Ok(G2Point::from_affine(affine))
	}

	pub fn to_hex(&self) -> String {
		hex::encode(self.to_bytes())
	}

	pub fn from_hex(s: &str) -> CaResult<Self> {
		let bytes = hex::decode(s.trim()).map_err(|_| CaError::MalformedPoint)?;
		Self::from_bytes(&bytes)
	}
}

impl std::ops::Add for G2Point {
	type Output = G2Point;
	fn add(self, rhs: Self) -> Self::Output {
		G2Point(self.0 + rhs.0)
	}
}

impl std::ops::Mul<&Scalar> for G2Point {
	type Output = G2Point;
	fn mul(self, rhs: &Scalar) -> Self::Output {
		G2Point(self.0 * rhs.0)
	}
}

derive_point_impls!(G2Point);

/// Pairing check `e(sig, G1) == e(H2(msg), pk)`, the verification equation
/// used for both certificate signatures and revocation proofs.
pub fn verify_pairing(sig: &G2Point, msg: &[u8], pk: &super::g1::G1Point) -> bool {
	let h = G2Point::hash_to_g2(msg);
	let lhs = bls12_381::pairing(&super::g1::G1Point::generator().affine(), &sig.affine());
	let rhs = bls12_381::pairing(&pk.affine(), &h.affine());
	lhs == rhs
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn round_trips_through_encoding() {
		let scalar = Scalar::random(&mut rand::thread_rng());
		let point = G2Point::from_scalar(&scalar);
		let bytes = point.to_bytes();
		assert_eq!(bytes.len(), G2_ENCODED_LEN);
		let decoded = G2Point::from_bytes(&bytes).unwrap();
		assert_eq!(point, decoded);
	}

	#[test]
	fn hash_to_g2_is_a_pure_function_of_the_message() {
		assert_eq!(G2Point::hash_to_g2(b"hello"), G2Point::hash_to_g2(b"hello"));
		assert_ne!(G2Point::hash_to_g2(b"hello"), G2Point::hash_to_g2(b"world"));
	}

	#[test]
	fn identity_decodes_as_point_at_infinity_error() {
		let bytes = G2Point::identity().to_bytes();
		assert_eq!(G2Point::from_bytes(&bytes), Err(CaError::PointAtInfinity));
	}

	#[test]
	fn single_party_bls_verifies() {
		let sk = Scalar::random(&mut rand::thread_rng());
		let pk = super::super::g1::G1Point::from_scalar(&sk);
		let msg = b"thresh-ca test message";
		let sig = G2Point::hash_to_g2(msg) * &sk;
		assert!(verify_pairing(&sig, msg, &pk));
		assert!(!verify_pairing(&sig, b"different message", &pk));
	}
}
