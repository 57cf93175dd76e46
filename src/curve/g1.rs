use group::{Curve, Group};

use super::scalar::Scalar;
use crate::error::{CaError, CaResult};

/// A point in the G1 subgroup of BLS12-381, used for master public keys and
/// for the fixed G1 generator in the pairing check. Wire-encoded as 96
/// bytes: two 48-byte big-endian affine field elements (x, y).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct G1Point(bls12_381::G1Projective);

pub const G1_ENCODED_LEN: usize = 96;

impl G1Point {
	pub fn generator() -> Self {
		G1Point(bls12_381::G1Projective::generator())
	}

	pub fn identity() -> Self {
		G1Point(bls12_381::G1Projective::identity())
	}

	pub fn from_scalar(scalar: &Scalar) -> Self {
		G1Point(bls12_381::G1Projective::generator() * scalar.0)
	}

	pub fn is_identity(&self) -> bool {
		bool::from(self.0.is_identity())
	}

	pub(crate) fn affine(&self) -> bls12_381::G1Affine {
		self.0.to_affine()
	}

	pub(crate) fn from_affine(affine: bls12_381::G1Affine) -> Self {
		G1Point(bls12_381::G1Projective::from(affine))
	}

	/// Fixed-width 96-byte affine encoding. Fails with `PointAtInfinity` if
	/// called on the identity point — there is no meaningful (x, y) affine
	/// pair for it, matching the source system's convention of never wire
	/// encoding the point at infinity.
	pub fn to_bytes(&self) -> CaResult<[u8; G1_ENCODED_LEN]> {
		if self.is_identity() {
			return Err(CaError::PointAtInfinity);
		}
		Ok(self.affine().to_uncompressed())
	}

	pub fn from_bytes(bytes: &[u8]) -> CaResult<Self> {
		let arr: [u8; G1_ENCODED_LEN] =
			bytes.try_into().map_err(|_| CaError::MalformedPoint)?;
		let affine: Option<bls12_381::G1Affine> = bls12_381::G1Affine::from_uncompressed(&arr).into();
		let affine = affine.ok_or(CaError::MalformedPoint)?;
		if bool::from(affine.is_identity()) {
			return Err(CaError::PointAtInfinity);
		}
		Ok(G1Point::from_affine(affine))
	}

	pub fn to_hex(&self) -> CaResult<String> {
		Ok(hex::encode(self.to_bytes()?))
	}

	pub fn from_hex(s: &str) -> CaResult<Self> {
		let bytes = hex::decode(s.trim()).map_err(|_| CaError::MalformedPoint)?;
		Self::from_bytes(&bytes)
	}
}

impl std::ops::Add for G1Point {
	type Output = G1Point;
	fn add(self, rhs: Self) -> Self::Output {
		G1Point(self.0 + rhs.0)
	}
}

impl std::ops::Mul<&Scalar> for G1Point {
	type Output = G1Point;
	fn mul(self, rhs: &Scalar) -> Self::Output {
		G1Point(self.0 * rhs.0)
	}
}

derive_point_impls!(G1Point);

/// `serde(with = "...")` helper for embedding a `G1Point` as a hex string
/// in config/record structs (e.g. [`crate::setup::NodeShareRecord`]).
pub mod hex_serde {
	use serde::{Deserialize, Deserializer, Serialize, Serializer};

	use super::G1Point;

	pub fn serialize<S: Serializer>(point: &G1Point, ser: S) -> Result<S::Ok, S::Error> {
		point.to_hex().map_err(serde::ser::Error::custom)?.serialize(ser)
	}

	pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<G1Point, D::Error> {
		let s = String::deserialize(de)?;
		G1Point::from_hex(&s).map_err(serde::de::Error::custom)
	}
}
