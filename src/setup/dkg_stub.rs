//! An unfinished Feldman-VSS distributed key generation component.
//!
//! Present but deliberately not wired into [`super::run_dealer`] or any
//! binary — mirrors `sharedca/dkg.py` in the original source, which is
//! likewise defined but never imported by `server.py`. Per SPEC_FULL.md
//! §9, swapping this in for the trusted dealer is future work: each node
//! would run one `DkgState`, exchange commitments and shares with its
//! peers, and combine the verified shares into its live `share` instead
//! of receiving one from [`super::persist_level`].

use crate::curve::{G1Point, Scalar};

/// Per-node DKG session state. `finalize` is the only consumer of
/// `received_shares`/`commitments`; nothing outside this module reads it.
pub struct DkgState {
	node_id: u32,
	total_nodes: u32,
	#[allow(dead_code)]
	threshold: u32,
	polynomial: Vec<Scalar>,
	my_commitments: Vec<G1Point>,
	commitments: std::collections::HashMap<u32, Vec<G1Point>>,
	received_shares: std::collections::HashMap<u32, Scalar>,
	complaints: std::collections::HashSet<u32>,
}

impl DkgState {
	pub fn new(node_id: u32, total_nodes: u32, threshold: u32, rng: &mut impl rand::RngCore) -> Self {
		let polynomial: Vec<Scalar> = (0..threshold).map(|_| Scalar::random(rng)).collect();
		let my_commitments = polynomial.iter().map(G1Point::from_scalar).collect();
		let mut commitments = std::collections::HashMap::new();
		commitments.insert(node_id, my_commitments.clone());
		DkgState {
			node_id,
			total_nodes,
			threshold,
			polynomial,
			my_commitments,
			commitments,
			received_shares: std::collections::HashMap::new(),
			complaints: std::collections::HashSet::new(),
		}
	}

	pub fn my_commitments(&self) -> &[G1Point] {
		&self.my_commitments
	}

	/// The share this node owes `to_node`: `f(to_node)`.
	pub fn share_for(&self, to_node: u32) -> Scalar {
		let x = Scalar::from_index(to_node as u64);
		self.polynomial
			.iter()
			.rev()
			.cloned()
			.reduce(|acc, coeff| &(&acc * &x) + &coeff)
			.expect("polynomial always has a constant term")
	}

	pub fn receive_commitments(&mut self, from_node: u32, commitments: Vec<G1Point>) {
		self.commitments.insert(from_node, commitments);
	}

	/// Verifies `share` against `from_node`'s published commitments
	/// (`g^share == Σ_k commits[k]^(j^k)`) before accepting it.
	pub fn receive_share(&mut self, from_node: u32, share: Scalar) {
		let Some(commits) = self.commitments.get(&from_node) else {
			self.complaints.insert(from_node);
			return;
		};
		let lhs = G1Point::from_scalar(&share);
		let j = Scalar::from_index(self.node_id as u64);
		let mut rhs = G1Point::identity();
		let mut j_pow = Scalar::one();
		for commitment in commits {
			rhs = rhs + (*commitment * &j_pow);
			j_pow = &j_pow * &j;
		}
		if lhs == rhs {
			self.received_shares.insert(from_node, share);
		} else {
			self.complaints.insert(from_node);
		}
	}

	/// Combines shares from every node not under complaint into this
	/// node's live share, and the corresponding master public key from
	/// the honest nodes' first commitment.
	pub fn finalize(&mut self) -> (Scalar, G1Point) {
		for i in 1..=self.total_nodes {
			if i != self.node_id && !self.received_shares.contains_key(&i) {
				self.complaints.insert(i);
			}
		}

		let honest: Vec<u32> = (1..=self.total_nodes).filter(|i| !self.complaints.contains(i)).collect();

		let local_sk = honest
			.iter()
			.filter_map(|i| self.received_shares.get(i))
			.fold(Scalar::zero(), |acc, s| &acc + s);

		let master_pk = honest
			.iter()
			.filter_map(|i| self.commitments.get(i).and_then(|c| c.first()))
			.fold(G1Point::identity(), |acc, pk| acc + *pk);

		(local_sk, master_pk)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn two_of_two_honest_nodes_agree_on_master_pk() {
		let mut rng = rand::rngs::mock::StepRng::new(7, 11);
		let mut a = DkgState::new(1, 2, 2, &mut rng);
		let mut b = DkgState::new(2, 2, 2, &mut rng);

		a.receive_commitments(2, b.my_commitments().to_vec());
		b.receive_commitments(1, a.my_commitments().to_vec());

		a.receive_share(2, b.share_for(1));
		b.receive_share(1, a.share_for(2));

		let (_sk_a, pk_a) = a.finalize();
		let (_sk_b, pk_b) = b.finalize();
		assert_eq!(pk_a, pk_b);
	}
}
