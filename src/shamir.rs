//! Shamir secret sharing and Lagrange interpolation at zero over the
//! BLS12-381 scalar field. Used once by the setup dealer (to split each
//! level's master secret key) and once by every client (to recombine
//! partial signatures into a threshold signature).
//!
//! Grounded on the teacher's FROST implementation: [`evaluate_polynomial`]
//! below is the same Horner's-rule evaluation as
//! `client/keygen/keygen_detail.rs::evaluate_polynomial`, and
//! [`lagrange_at_zero`] generalizes
//! `client/signing/signing_detail.rs::get_lagrange_coeff` from a single
//! coefficient to the whole basis.

use crate::curve::Scalar;
use crate::error::{CaError, CaResult};

/// One Shamir share: `f(index) = scalar` for the dealer's sharing
/// polynomial `f`, with `f(0)` equal to the shared secret.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Share {
	pub index: u32,
	pub scalar: Scalar,
}

/// Evaluates `f(x) = c0 + c1*x + c2*x^2 + ...` at `x = index`, given the
/// coefficients low-degree first.
fn evaluate_polynomial(coefficients: &[Scalar], index: u32) -> Scalar {
	let x = Scalar::from_index(index as u64);
	coefficients
		.iter()
		.rev()
		.cloned()
		.reduce(|acc, coeff| &(&acc * &x) + &coeff)
		.expect("polynomial always has at least the constant term")
}

/// Samples a degree-`t-1` polynomial with `f(0) = secret` and uniformly
/// random higher coefficients, then returns `(i, f(i))` for `i = 1..=n`.
///
/// `t` must be at least 1 and at most `n`; callers choose `t, n` (the spec
/// places no upper bound beyond the share index fitting in `u32`).
pub fn split(secret: Scalar, n: u32, t: u32, rng: &mut impl rand::RngCore) -> Vec<Share> {
	assert!(t >= 1 && t <= n, "threshold must be between 1 and n");

	let mut coefficients = Vec::with_capacity(t as usize);
	coefficients.push(secret.clone());
	for _ in 1..t {
		coefficients.push(Scalar::random(rng));
	}

	(1..=n)
		.map(|index| Share { index, scalar: evaluate_polynomial(&coefficients, index) })
		.collect()
}

/// Computes the Lagrange basis coefficients `λ_j(0)` for the given set of
/// share indices, in the same order they are given. Any *t*-subset of
/// valid shares of a degree-(t-1) polynomial satisfies
/// `Σ λ_j(0) * f(x_j) = f(0)`.
///
/// Fails with `DegenerateInterpolation` if `indices` contains a duplicate
/// (the corresponding denominator would be zero).
pub fn lagrange_at_zero(indices: &[u32]) -> CaResult<Vec<Scalar>> {
	let mut seen = std::collections::HashSet::new();
	for &i in indices {
		if !seen.insert(i) {
			return Err(CaError::DegenerateInterpolation);
		}
	}

	indices
		.iter()
		.map(|&j| {
			let x_j = Scalar::from_index(j as u64);
			let mut num = Scalar::one();
			let mut den = Scalar::one();
			for &m in indices {
				if m == j {
					continue;
				}
				let x_m = Scalar::from_index(m as u64);
				num = &num * &x_m;
				den = &den * &(&x_m - &x_j);
			}
			let den_inv = den.invert()?;
			Ok(&num * &den_inv)
		})
		.collect()
}

/// Recombines a *t*-subset of Shamir shares into the shared secret,
/// `Σ λ_j(0) * f(x_j)`. Used only by setup-time self-checks and tests —
/// the live protocol recombines signatures, not secrets, via
/// [`crate::curve::G2Point`] scalar multiplication instead of this.
#[cfg(test)]
pub fn reconstruct_secret(shares: &[Share]) -> CaResult<Scalar> {
	let indices: Vec<u32> = shares.iter().map(|s| s.index).collect();
	let lambdas = lagrange_at_zero(&indices)?;
	Ok(shares
		.iter()
		.zip(lambdas.iter())
		.map(|(share, lambda)| lambda * &share.scalar)
		.fold(Scalar::zero(), |acc, term| &acc + &term))
}
