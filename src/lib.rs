//! A distributed threshold Certificate Authority over BLS12-381.
//!
//! Independent CA nodes each hold one Shamir share of a level's master
//! secret key; a certificate is valid only once *t* of *n* nodes have
//! produced a partial BLS signature over its TBS bytes and a client has
//! combined them via Lagrange interpolation at 0. See `SPEC_FULL.md` for
//! the full system design and `DESIGN.md` for how each module here is
//! grounded in prior art.

pub mod certificate;
pub mod curve;
pub mod error;
pub mod issuer;
pub mod node;
pub mod revoker;
pub mod rsakey;
pub mod setup;
pub mod shamir;
pub mod validator;
