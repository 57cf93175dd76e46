//! The TBS (to-be-signed) certificate shape and its wire encodings: the
//! `|`-joined TBS byte string and the base64 PEM-style bundle.
//!
//! Grounded on `common/cert.py::to_tbs`/`from_tbs` in the original source
//! for field order and separator choice.

use base64::Engine;

use crate::curve::{G2Point, G2_ENCODED_LEN};
use crate::error::{CaError, CaResult};

const FIELD_SEP: u8 = b'|';
const SIG_SEP: &str = "||SIG||";
const PEM_BEGIN: &str = "-----BEGIN THRESH-CA CERT-----";
const PEM_END: &str = "-----END THRESH-CA CERT-----";

/// The `BLS-PUBKEY:` prefix a CA certificate's `subject_pub_blob` carries
/// in front of its hex-encoded G1 master public key.
pub const BLS_PUBKEY_PREFIX: &str = "BLS-PUBKEY:";

/// The seven TBS fields of a certificate, in wire order. Round-trips
/// bit-exact through [`Certificate::to_tbs_bytes`]/[`Certificate::from_tbs_bytes`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Certificate {
	pub serial: String,
	pub subject_cn: String,
	pub issuer_cn: String,
	pub not_before: i64,
	pub not_after: i64,
	pub subject_pub_blob: String,
	pub is_ca: bool,
}

impl Certificate {
	pub fn to_tbs_bytes(&self) -> Vec<u8> {
		let fields = [
			self.serial.as_str(),
			self.subject_cn.as_str(),
			self.issuer_cn.as_str(),
			&self.not_before.to_string(),
			&self.not_after.to_string(),
			self.subject_pub_blob.as_str(),
			if self.is_ca { "CA" } else { "EE" },
		];
		let mut out = Vec::new();
		for (i, field) in fields.iter().enumerate() {
			if i > 0 {
				out.push(FIELD_SEP);
			}
			out.extend_from_slice(field.as_bytes());
		}
		out
	}

	pub fn from_tbs_bytes(bytes: &[u8]) -> CaResult<Self> {
		let text = std::str::from_utf8(bytes).map_err(|_| CaError::ChainBroken("TBS is not valid UTF-8".into()))?;
		let parts: Vec<&str> = text.splitn(7, '|').collect();
		let [serial, subject_cn, issuer_cn, not_before, not_after, subject_pub_blob, is_ca_flag] =
			<[&str; 7]>::try_from(parts).map_err(|_| CaError::ChainBroken("TBS field count mismatch".into()))?;

		let is_ca = match is_ca_flag {
			"CA" => true,
			"EE" => false,
			_ => return Err(CaError::ChainBroken(format!("unrecognized is_ca literal {is_ca_flag:?}"))),
		};

		Ok(Certificate {
			serial: serial.to_string(),
			subject_cn: subject_cn.to_string(),
			issuer_cn: issuer_cn.to_string(),
			not_before: not_before
				.parse()
				.map_err(|_| CaError::ChainBroken("not_before is not a decimal timestamp".into()))?,
			not_after: not_after
				.parse()
				.map_err(|_| CaError::ChainBroken("not_after is not a decimal timestamp".into()))?,
			subject_pub_blob: subject_pub_blob.to_string(),
			is_ca,
		})
	}

	/// Extracts and decodes the G1 master public key from a CA certificate's
	/// `subject_pub_blob`. Fails with `BadIssuerKey` if this certificate is
	/// not a CA cert or the blob is malformed.
	pub fn subject_bls_pubkey(&self) -> CaResult<crate::curve::G1Point> {
		let hex_part = self.subject_pub_blob.strip_prefix(BLS_PUBKEY_PREFIX).ok_or(CaError::BadIssuerKey)?;
		crate::curve::G1Point::from_hex(hex_part).map_err(|_| CaError::BadIssuerKey)
	}

	/// Extracts the level number from `issuer_cn` via the `Level(\d+)CA`
	/// convention. Returns `ChainBroken` on a malformed CN rather than
	/// panicking, per the Open Question resolution in SPEC_FULL.md.
	pub fn issuer_level(&self) -> CaResult<u32> {
		issuer_cn_to_level(&self.issuer_cn)
	}
}

/// Parses the `Level<N>CA` convention out of an `issuer_cn`. `"self"` (the
/// root's own issuer_cn) has no issuing level and is rejected by the caller
/// before this is ever reached for a root certificate.
pub fn issuer_cn_to_level(issuer_cn: &str) -> CaResult<u32> {
	static PATTERN: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
	let re = PATTERN.get_or_init(|| regex::Regex::new(r"^Level(\d+)CA$").expect("static pattern is valid"));
	let captures = re
		.captures(issuer_cn)
		.ok_or_else(|| CaError::ChainBroken(format!("issuer_cn {issuer_cn:?} does not match Level(\\d+)CA")))?;
	captures[1]
		.parse()
		.map_err(|_| CaError::ChainBroken(format!("issuer_cn {issuer_cn:?} has an unparseable level number")))
}

/// A certificate plus its detached aggregated threshold signature: the unit
/// that actually gets PEM-encoded and chained.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedCertificate {
	pub tbs: Certificate,
	pub sig: G2Point,
}

impl SignedCertificate {
	pub fn to_pem_block(&self) -> String {
		let mut payload = self.tbs.to_tbs_bytes();
		payload.extend_from_slice(SIG_SEP.as_bytes());
		payload.extend_from_slice(&self.sig.to_bytes());
		let encoded = base64::engine::general_purpose::STANDARD.encode(payload);
		format!("{PEM_BEGIN}\n{encoded}\n{PEM_END}")
	}

	pub fn from_pem_block(block: &str) -> CaResult<Self> {
		let inner = block
			.trim()
			.strip_prefix(PEM_BEGIN)
			.and_then(|s| s.strip_suffix(PEM_END))
			.ok_or_else(|| CaError::ChainBroken("missing BEGIN/END markers".into()))?;
		let encoded: String = inner.split_whitespace().collect();
		let payload = base64::engine::general_purpose::STANDARD
			.decode(encoded)
			.map_err(|_| CaError::ChainBroken("bundle is not valid base64".into()))?;

		let sep_pos = find_subslice(&payload, SIG_SEP.as_bytes())
			.ok_or_else(|| CaError::ChainBroken("missing ||SIG|| separator".into()))?;
		let (tbs_bytes, rest) = payload.split_at(sep_pos);
		let sig_bytes = &rest[SIG_SEP.len()..];
		if sig_bytes.len() != G2_ENCODED_LEN {
			return Err(CaError::ChainBroken("signature is not 288 bytes".into()));
		}

		let tbs = Certificate::from_tbs_bytes(tbs_bytes)?;
		let sig = G2Point::from_bytes(sig_bytes).map_err(|_| CaError::ChainBroken("signature does not decode".into()))?;
		Ok(SignedCertificate { tbs, sig })
	}
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
	haystack.windows(needle.len()).position(|window| window == needle)
}

/// A bundle is this certificate's PEM block followed by its parent chain's
/// blocks, in `[leaf, parent, grandparent, ..., root]` order.
pub fn encode_bundle(certs: &[SignedCertificate]) -> String {
	certs.iter().map(SignedCertificate::to_pem_block).collect::<Vec<_>>().join("\n")
}

pub fn decode_bundle(bundle: &str) -> CaResult<Vec<SignedCertificate>> {
	let mut certs = Vec::new();
	let mut rest = bundle;
	while let Some(begin_at) = rest.find(PEM_BEGIN) {
		let end_at = rest[begin_at..]
			.find(PEM_END)
			.ok_or_else(|| CaError::ChainBroken("unterminated PEM block".into()))?
			+ begin_at
			+ PEM_END.len();
		certs.push(SignedCertificate::from_pem_block(&rest[begin_at..end_at])?);
		rest = &rest[end_at..];
	}
	if certs.is_empty() {
		return Err(CaError::ChainBroken("bundle contains no certificates".into()));
	}
	Ok(certs)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::curve::Scalar;

	fn sample_tbs() -> Certificate {
		Certificate {
			serial: "11111111-1111-1111-1111-111111111111".into(),
			subject_cn: "Level1CA".into(),
			issuer_cn: "self".into(),
			not_before: 1_700_000_000,
			not_after: 1_731_536_000,
			subject_pub_blob: format!("{BLS_PUBKEY_PREFIX}{}", "00".repeat(96)),
			is_ca: true,
		}
	}

	#[test]
	fn tbs_round_trips() {
		let cert = sample_tbs();
		let bytes = cert.to_tbs_bytes();
		assert_eq!(Certificate::from_tbs_bytes(&bytes).unwrap(), cert);
	}

	#[test]
	fn is_ca_literal_is_ca_or_ee() {
		let mut cert = sample_tbs();
		assert!(cert.to_tbs_bytes().ends_with(b"CA"));
		cert.is_ca = false;
		assert!(cert.to_tbs_bytes().ends_with(b"EE"));
	}

	#[test]
	fn bundle_round_trips_through_pem() {
		let sk = Scalar::random(&mut rand::thread_rng());
		let tbs = sample_tbs();
		let sig = G2Point::hash_to_g2(&tbs.to_tbs_bytes()) * &sk;
		let signed = SignedCertificate { tbs, sig };

		let bundle = encode_bundle(&[signed.clone()]);
		let decoded = decode_bundle(&bundle).unwrap();
		assert_eq!(decoded, vec![signed]);
	}

	#[test]
	fn issuer_level_parses_level_n_ca() {
		assert_eq!(issuer_cn_to_level("Level2CA").unwrap(), 2);
		assert!(issuer_cn_to_level("self").is_err());
		assert!(issuer_cn_to_level("totally-bogus").is_err());
	}

	#[test]
	fn tampered_tbs_breaks_round_trip_identity() {
		let cert = sample_tbs();
		let mut bytes = cert.to_tbs_bytes();
		let flip_at = bytes.iter().position(|&b| b == FIELD_SEP).unwrap() - 1;
		bytes[flip_at] ^= 0x01;
		let reparsed = Certificate::from_tbs_bytes(&bytes).unwrap();
		assert_ne!(reparsed, cert);
	}
}
