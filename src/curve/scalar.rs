use ff::Field;
use zeroize::Zeroize;

use crate::error::{CaError, CaResult};

/// An element of the BLS12-381 scalar field (integers mod the subgroup
/// order `R`). Thin wrapper over `bls12_381::Scalar` so the rest of the
/// crate never imports the underlying curve crate directly, and so we can
/// attach our own zeroize-on-drop behaviour (shares and master secret keys
/// are `Scalar`s and must not linger in memory).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Scalar(#[serde(with = "scalar_serde")] pub(crate) bls12_381::Scalar);

impl Scalar {
	pub fn zero() -> Self {
		Scalar(bls12_381::Scalar::ZERO)
	}

	pub fn one() -> Self {
		Scalar(bls12_381::Scalar::ONE)
	}

	pub fn random(rng: &mut impl rand::RngCore) -> Self {
		Scalar(bls12_381::Scalar::random(rng))
	}

	/// Maps an index (1-based share index, or a small integer like a level
	/// number used as a Lagrange x-coordinate) into the scalar field.
	pub fn from_index(index: u64) -> Self {
		Scalar(bls12_381::Scalar::from(index))
	}

	/// `SHA-256(msg) mod R`, i.e. the integer-scalar half of `H2`. Takes the
	/// raw 32-byte digest (big-endian, as produced by `sha2::Sha256`) and
	/// reduces it modulo the curve order via the wide-reduction routine the
	/// curve crate provides, so the mapping matches the original
	/// `int.from_bytes(sha256(m), "big") % R` construction bit-for-bit.
	pub fn from_sha256_digest_mod_order(digest: [u8; 32]) -> Self {
		let mut wide = [0u8; 64];
		// `from_bytes_wide` takes a little-endian 512-bit integer; our digest
		// is big-endian, so reverse it into the low 32 (LE) bytes and leave
		// the high half zero.
		for (dst, src) in wide[0..32].iter_mut().zip(digest.iter().rev()) {
			*dst = *src;
		}
		Scalar(bls12_381::Scalar::from_bytes_wide(&wide))
	}

	pub fn invert(&self) -> CaResult<Self> {
		Option::<bls12_381::Scalar>::from(self.0.invert())
			.map(Scalar)
			.ok_or(CaError::DegenerateInterpolation)
	}

	pub fn neg(&self) -> Self {
		Scalar(-self.0)
	}

	pub fn is_zero(&self) -> bool {
		bool::from(Field::is_zero(&self.0))
	}
}

impl std::ops::Add<&Scalar> for &Scalar {
	type Output = Scalar;
	fn add(self, rhs: &Scalar) -> Scalar {
		Scalar(self.0 + rhs.0)
	}
}

impl std::ops::Sub<&Scalar> for &Scalar {
	type Output = Scalar;
	fn sub(self, rhs: &Scalar) -> Scalar {
		Scalar(self.0 - rhs.0)
	}
}

impl std::ops::Mul<&Scalar> for &Scalar {
	type Output = Scalar;
	fn mul(self, rhs: &Scalar) -> Scalar {
		Scalar(self.0 * rhs.0)
	}
}

impl Zeroize for Scalar {
	fn zeroize(&mut self) {
		self.0 = bls12_381::Scalar::ZERO;
	}
}

derive_scalar_impls!(Scalar);

mod scalar_serde {
	use serde::{Deserialize, Deserializer, Serialize, Serializer};

	pub fn serialize<S: Serializer>(s: &bls12_381::Scalar, ser: S) -> Result<S::Ok, S::Error> {
		s.to_bytes().serialize(ser)
	}

	pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<bls12_381::Scalar, D::Error> {
		let bytes = <[u8; 32]>::deserialize(de)?;
		Option::from(bls12_381::Scalar::from_bytes(&bytes))
			.ok_or_else(|| serde::de::Error::custom("invalid scalar encoding"))
	}
}

use serde::{Deserialize, Serialize};

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn from_index_zero_is_zero() {
		assert_eq!(Scalar::from_index(0), Scalar::zero());
	}

	#[test]
	fn invert_of_zero_fails() {
		assert!(Scalar::zero().invert().is_err());
	}

	#[test]
	fn hash_to_scalar_is_deterministic() {
		let a = Scalar::from_sha256_digest_mod_order([7u8; 32]);
		let b = Scalar::from_sha256_digest_mod_order([7u8; 32]);
		assert_eq!(a, b);
	}
}
