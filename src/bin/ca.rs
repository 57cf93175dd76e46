//! Thin CLI over the `threshca` library. Every subcommand is a short call
//! into library functions — no protocol logic lives here, matching the
//! teacher's convention of keeping binaries as pure wiring.
//!
//! Because the real network transport is out of scope (SPEC_FULL.md §1),
//! each invocation builds its committee fresh from the share records
//! [`threshca::setup::persist_level`] wrote to disk, drives one flow, and
//! exits — so, per SPEC_FULL.md's carried-over Non-goal, a node's
//! revocation set does not survive across separate invocations of this
//! binary any more than it would across a real node restart.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use threshca::curve::G1Point;
use threshca::issuer::SubjectKey;
use threshca::node::{transport::InProcess, CaNodeService, NodeTransport};
use threshca::setup::NodeShareRecord;
use threshca::validator::NodeDirectory;

#[derive(Parser)]
#[command(name = "ca", about = "Distributed threshold CA (demo CLI)")]
struct Cli {
	/// Directory holding node_config/, trust-anchor files, and certs/.
	#[arg(long, env = "CONFIG_PATH", default_value = ".")]
	base_dir: PathBuf,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand)]
enum Command {
	/// Run the trusted-dealer setup for every level.
	Dealer {
		#[arg(long, env = "NUM_LEVELS", default_value_t = 2)]
		num_levels: u32,
		#[arg(long, env = "NODES_PER_LEVEL", default_value_t = 3)]
		nodes_per_level: u32,
		#[arg(long, env = "THRESHOLD", default_value_t = 2)]
		threshold: u32,
	},
	/// Issue a certificate at `level`, signed by that level's committee
	/// (or level 1's own committee, for a root).
	Issue {
		#[arg(long)]
		level: u32,
		#[arg(long)]
		cn: String,
		#[arg(long)]
		is_ca: bool,
		/// Path to a PEM bundle to prepend as the parent chain, if any.
		#[arg(long)]
		parent_bundle: Option<PathBuf>,
	},
	/// Revoke a serial signed by `level`'s committee.
	Revoke {
		#[arg(long)]
		level: u32,
		#[arg(long)]
		serial: String,
	},
	/// Query t-of-n OCSP consensus for a serial at `level`.
	Status {
		#[arg(long)]
		level: u32,
		#[arg(long)]
		serial: String,
	},
	/// Validate a certificate bundle against a trust anchor.
	Validate {
		#[arg(long)]
		cert_path: PathBuf,
		#[arg(long)]
		trust_anchor: PathBuf,
	},
}

/// Rebuilds the in-process committee for `level` from the share records
/// [`threshca::setup::persist_level`] wrote under `node_config/level<L>/`.
fn load_committee(base_dir: &std::path::Path, level: u32) -> anyhow::Result<(Vec<Box<dyn NodeTransport>>, G1Point, u32)> {
	let level_dir = base_dir.join("node_config").join(format!("level{level}"));
	let mut records = Vec::new();
	for entry in std::fs::read_dir(&level_dir).with_context(|| format!("reading {}", level_dir.display()))? {
		let path = entry?.path();
		if path.extension().and_then(|e| e.to_str()) != Some("json") {
			continue;
		}
		let record: NodeShareRecord = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
		records.push(record);
	}
	if records.is_empty() {
		bail!("no node records found under {}", level_dir.display());
	}
	let master_pk = records[0].master_pk;
	let threshold = records[0].threshold;
	let nodes = records
		.into_iter()
		.map(|r| {
			let svc = CaNodeService::new(r.node_id, r.share, r.level, r.threshold, r.master_pk);
			Box::new(InProcess(Arc::new(svc))) as Box<dyn NodeTransport>
		})
		.collect();
	Ok((nodes, master_pk, threshold))
}

fn load_trust_anchor(path: &std::path::Path) -> anyhow::Result<G1Point> {
	let hex = std::fs::read_to_string(path)?;
	Ok(G1Point::from_hex(hex.trim())?)
}

/// A [`NodeDirectory`] backed by the same on-disk share records
/// [`load_committee`] reads, loaded lazily per level as `Validate` walks
/// a certificate chain.
#[derive(Default)]
struct FileNodeDirectory {
	levels: std::collections::HashMap<u32, (Vec<Box<dyn NodeTransport>>, u32)>,
}

impl FileNodeDirectory {
	/// Loads `level`'s committee if not already cached, returning its
	/// threshold.
	fn ensure_level(&mut self, base_dir: &std::path::Path, level: u32) -> anyhow::Result<u32> {
		if let Some((_, threshold)) = self.levels.get(&level) {
			return Ok(*threshold);
		}
		let (nodes, _master_pk, threshold) = load_committee(base_dir, level)?;
		self.levels.insert(level, (nodes, threshold));
		Ok(threshold)
	}
}

impl NodeDirectory for FileNodeDirectory {
	fn nodes_for_level(&self, level: u32) -> &[Box<dyn NodeTransport>] {
		self.levels.get(&level).map(|(nodes, _)| nodes.as_slice()).unwrap_or(&[])
	}
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();
	let cli = Cli::parse();

	match cli.command {
		Command::Dealer { num_levels, nodes_per_level, threshold } => {
			std::fs::create_dir_all(&cli.base_dir)?;
			let levels = threshca::setup::run_dealer(num_levels, nodes_per_level, threshold, &mut rand::thread_rng());
			for level in &levels {
				threshca::setup::persist_level(&cli.base_dir, level)?;
				tracing::info!(ca_level = level.level, "wrote trust anchor and {} node records", level.node_records.len());
			}
		}

		Command::Issue { level, cn, is_ca, parent_bundle } => {
			let issuing_level = if level == 1 { 1 } else { level - 1 };
			let (nodes, master_pk, threshold) = load_committee(&cli.base_dir, issuing_level)?;

			let subject_key = if is_ca {
				let (_, child_pk, _) = load_committee(&cli.base_dir, level)?;
				SubjectKey::Ca(child_pk)
			} else {
				SubjectKey::EndEntity(threshca::rsakey::generate_end_entity_subject_key(&mut rand::thread_rng())?)
			};

			let parent_chain = match parent_bundle {
				Some(path) => threshca::certificate::decode_bundle(&std::fs::read_to_string(path)?)?,
				None => Vec::new(),
			};

			let bundle = threshca::issuer::issue(&nodes, threshold, master_pk, level, &cn, subject_key, is_ca, parent_chain)
				.await?;

			let certs_dir = cli.base_dir.join("certs");
			std::fs::create_dir_all(&certs_dir)?;
			let out_path = certs_dir.join(format!("level{level}_{cn}.pem"));
			std::fs::write(&out_path, threshca::certificate::encode_bundle(&bundle))?;
			println!("wrote {}", out_path.display());
		}

		Command::Revoke { level, serial } => {
			let (nodes, _master_pk, threshold) = load_committee(&cli.base_dir, level)?;
			threshca::revoker::revoke(&nodes, &nodes, threshold, &serial).await?;
			println!("revoked {serial}");
		}

		Command::Status { level, serial } => {
			let (nodes, _master_pk, threshold) = load_committee(&cli.base_dir, level)?;
			let verdict = threshca::revoker::check_revocation_status(&nodes, &serial, threshold).await;
			println!("{verdict:?}");
		}

		Command::Validate { cert_path, trust_anchor } => {
			let bundle = threshca::certificate::decode_bundle(&std::fs::read_to_string(cert_path)?)?;
			let anchor = load_trust_anchor(&trust_anchor)?;

			let mut directory = FileNodeDirectory::default();
			let mut threshold = 1;
			for cert in &bundle[..bundle.len().saturating_sub(1)] {
				let issuer_level = cert.tbs.issuer_level()?;
				threshold = directory.ensure_level(&cli.base_dir, issuer_level)?;
			}

			threshca::validator::validate_chain(&bundle, Some(&anchor), &directory, threshold, threshca::issuer::now()).await?;
			println!("chain OK: signatures, validity window, and revocation status all passed ({} certs)", bundle.len());
		}
	}

	Ok(())
}
