//! Scalar and point arithmetic on BLS12-381, plus the fixed-width wire
//! encodings the rest of the system builds on. This is the one place that
//! imports the `bls12_381` crate directly.

#[macro_use]
mod helpers;

mod g1;
mod g2;
mod scalar;

pub use g1::hex_serde as g1_hex_serde;
pub use g1::{G1Point, G1_ENCODED_LEN};
pub use g2::{verify_pairing, G2Point, G2_ENCODED_LEN};
pub use scalar::Scalar;
