use merkle_airdrop_cli::tree::{
    expected_proof_len, next_level, next_level_sequential, PARALLEL_THRESHOLD,
};
use merkle_airdrop_cli::{hash_leaf, keccak256_hash, verify_proof, MerkleTree, Recipient};
use proptest::prelude::*;

fn recipients_strategy(max: usize) -> impl Strategy<Value = Vec<Recipient>> {
    prop::collection::vec((any::<[u8; 32]>(), any::<u64>()), 1..max).prop_map(|entries| {
        entries
            .into_iter()
            .zip(0u64..)
            .map(|((address, amount), index)| Recipient {
                address,
                amount,
                index,
            })
            .collect()
    })
}

fn expected_level_count(n: usize) -> usize {
    n.next_power_of_two().trailing_zeros() as usize + 1
}

#[test]
fn power_of_two_tree_matches_manual_hashing() {
    let leaves: Vec<[u8; 32]> = (0..4u8).map(|b| hash_leaf(&[b; 32], u64::from(b))).collect();
    let tree = MerkleTree::from_leaves(leaves.clone()).unwrap();
    let left = keccak256_hash(leaves[0], leaves[1]);
    let right = keccak256_hash(leaves[2], leaves[3]);
    assert_eq!(tree.root(), keccak256_hash(left, right));
    assert_eq!(tree.proof(3).unwrap(), vec![leaves[2], left]);
}

#[test]
fn wide_tree_parallel_levels_match_sequential() {
    let leaves: Vec<[u8; 32]> = (0..(PARALLEL_THRESHOLD * 2 + 1) as u64)
        .map(|i| hash_leaf(&[(i % 251) as u8; 32], i))
        .collect();
    let tree = MerkleTree::from_leaves(leaves.clone()).unwrap();

    let mut level = leaves;
    while level.len() > 1 {
        let sequential = next_level_sequential(&level);
        assert_eq!(next_level(&level), sequential);
        level = sequential;
    }
    assert_eq!(tree.root(), level[0]);
}

proptest! {
    #[test]
    fn build_is_deterministic(recipients in recipients_strategy(40)) {
        let a = MerkleTree::from_recipients(&recipients).unwrap();
        let b = MerkleTree::from_recipients(&recipients).unwrap();
        prop_assert_eq!(a.root(), b.root());
        for i in 0..recipients.len() {
            prop_assert_eq!(a.proof(i).unwrap(), b.proof(i).unwrap());
        }
    }

    #[test]
    fn every_proof_verifies(recipients in recipients_strategy(40)) {
        let tree = MerkleTree::from_recipients(&recipients).unwrap();
        let root = tree.root();
        for recipient in &recipients {
            let i = recipient.index as usize;
            let proof = tree.proof(i).unwrap();
            prop_assert!(proof.len() <= tree.depth());
            prop_assert_eq!(proof.len(), expected_proof_len(i, recipients.len()).unwrap());
            prop_assert!(verify_proof(&root, &recipient.leaf(), i, recipients.len(), &proof));
        }
    }

    #[test]
    fn level_count_is_log2_ceiling_plus_one(n in 1usize..300) {
        let leaves: Vec<[u8; 32]> = (0..n as u64).map(|i| hash_leaf(&[0u8; 32], i)).collect();
        let tree = MerkleTree::from_leaves(leaves).unwrap();
        prop_assert_eq!(tree.level_count(), expected_level_count(n));
        for pair in tree.levels().windows(2) {
            prop_assert_eq!(pair[1].len(), pair[0].len().div_ceil(2));
        }
    }

    #[test]
    fn mutated_recipient_fails_verification(
        recipients in recipients_strategy(24),
        pick in any::<prop::sample::Index>(),
        byte in 0usize..40,
        flip in 1u8..=255,
    ) {
        let tree = MerkleTree::from_recipients(&recipients).unwrap();
        let original = recipients[pick.index(recipients.len())];
        let i = original.index as usize;
        let proof = tree.proof(i).unwrap();

        let mut mutated = original;
        if byte < 32 {
            mutated.address[byte] ^= flip;
        } else {
            let mut amount = mutated.amount.to_le_bytes();
            amount[byte - 32] ^= flip;
            mutated.amount = u64::from_le_bytes(amount);
        }

        prop_assert!(!verify_proof(&tree.root(), &mutated.leaf(), i, recipients.len(), &proof));
    }

    #[test]
    fn input_order_does_not_change_root(recipients in recipients_strategy(24)) {
        let mut reversed = recipients.clone();
        reversed.reverse();
        let a = MerkleTree::from_recipients(&recipients).unwrap();
        let b = MerkleTree::from_recipients(&reversed).unwrap();
        prop_assert_eq!(a.root(), b.root());
    }
}
