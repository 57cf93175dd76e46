use thiserror::Error;

/// Taxonomy of everything that can go wrong in the threshold CA, from curve
/// decoding up through chain validation. Node-side crypto failures are
/// reported as `ok=false` RPC responses and never propagate as a panic;
/// client-side failures abort the calling flow.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaError {
	#[error("fewer than the required threshold of partial signatures were collected")]
	InsufficientPartials,

	#[error("aggregated signature failed the local pairing check")]
	AggregationFailed,

	#[error("point encoding had the wrong length or failed to decode to a curve point")]
	MalformedPoint,

	#[error("point is the identity / point at infinity where a non-identity point was required")]
	PointAtInfinity,

	#[error("Lagrange interpolation indices were not pairwise distinct")]
	DegenerateInterpolation,

	#[error("issuer certificate did not carry a valid BLS-PUBKEY subject field")]
	BadIssuerKey,

	#[error("certificate chain is broken: {0}")]
	ChainBroken(String),

	#[error("certificate is outside its validity window")]
	Expired,

	#[error("certificate has been revoked by the issuing committee")]
	RevokedByCommittee,

	#[error("revocation status could not be determined (no node responded)")]
	StatusUnknown,

	#[error("node was unavailable")]
	NodeUnavailable,

	#[error("required configuration was missing: {0}")]
	ConfigMissing(String),

	#[error("filesystem operation failed: {0}")]
	Io(String),
}

impl From<std::io::Error> for CaError {
	fn from(e: std::io::Error) -> Self {
		CaError::Io(e.to_string())
	}
}

impl From<serde_json::Error> for CaError {
	fn from(e: serde_json::Error) -> Self {
		CaError::Io(e.to_string())
	}
}

pub type CaResult<T> = Result<T, CaError>;
