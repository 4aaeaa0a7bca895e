use bitcoin::hashes::{sha256d, Hash};
use byteorder::{ByteOrder, LittleEndian};
use std::error;
use std::fmt;

use crate::blockchain::proto::header::BlockHeader;
use crate::blockchain::proto::tx::RawTx;
use crate::blockchain::proto::varuint::VarUint;
use crate::blockchain::proto::{Hashed, ToRaw};
use crate::common::utils;

/// Marker announcing a merged mining commitment inside a coinbase script.
/// See https://en.bitcoin.it/wiki/Merged_mining_specification
pub const MERGED_MINING_MARKER: [u8; 4] = [0xfa, 0xbe, 0x6d, 0x6d];

/// Upper bound for the chain merkle branch length
pub const MAX_CHAIN_MERKLE_BRANCH: usize = 30;

/// Markerless commitments must start within the first 20 script bytes.
/// 8-12 bytes are enough to encode extraNonce and nBits.
const MAX_LEGACY_ROOT_OFFSET: usize = 20;

/// A transaction with a merkle branch linking it to its containing block
pub struct MerkleTx {
    pub tx: Hashed<RawTx>,
    pub parent_block_hash: sha256d::Hash,
    pub merkle_branch: Vec<sha256d::Hash>,
    pub index: i32,
}

impl MerkleTx {
    /// Wraps a transaction that has not been positioned in a block yet
    pub fn new(tx: RawTx) -> Self {
        Self {
            tx: Hashed::double_sha256(tx),
            parent_block_hash: sha256d::Hash::all_zeros(),
            merkle_branch: Vec::new(),
            index: -1,
        }
    }
}

impl ToRaw for MerkleTx {
    fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = self.tx.value.to_bytes();
        bytes.extend_from_slice(self.parent_block_hash.as_byte_array());
        bytes.extend_from_slice(&VarUint::from(self.merkle_branch.len()).to_bytes());
        for hash in &self.merkle_branch {
            bytes.extend_from_slice(hash.as_byte_array());
        }
        bytes.extend_from_slice(&self.index.to_le_bytes());
        bytes
    }
}

impl fmt::Debug for MerkleTx {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.debug_struct("MerkleTx")
            .field("tx", &self.tx)
            .field("parent_block_hash", &self.parent_block_hash)
            .field("branch_len", &self.merkle_branch.len())
            .field("index", &self.index)
            .finish()
    }
}

/// Proof that work done on a parent chain block commits to an auxiliary
/// block hash. Immutable once constructed, verifiers only read.
pub struct AuxPow {
    pub coinbase_tx: MerkleTx,
    pub chain_merkle_branch: Vec<sha256d::Hash>,
    pub chain_index: i32,
    pub parent_header: BlockHeader,
}

impl AuxPow {
    /// Hash of the parent block header. The caller compares this against
    /// the auxiliary difficulty target, not `check`.
    pub fn parent_block_hash(&self) -> sha256d::Hash {
        self.parent_header.hash()
    }

    /// Decides whether this proof binds the given auxiliary block hash
    /// for the chain identified by `chain_id`.
    pub fn check(&self, aux_block_hash: sha256d::Hash, chain_id: u32) -> Result<(), RejectReason> {
        if self.coinbase_tx.index != 0 {
            return Err(RejectReason::NotCoinbase);
        }

        if self.chain_merkle_branch.len() > MAX_CHAIN_MERKLE_BRANCH {
            return Err(RejectReason::ChainBranchTooLong);
        }

        // Reconstruct the chain merkle root and flip it into the byte order
        // the coinbase script embeds. This is the only reversal site.
        let root =
            utils::check_merkle_branch(aux_block_hash, &self.chain_merkle_branch, self.chain_index);
        let mut root_bytes = root.to_byte_array();
        root_bytes.reverse();

        // The coinbase has to be part of the parent block merkle tree
        let tx_root = utils::check_merkle_branch(
            self.coinbase_tx.tx.hash,
            &self.coinbase_tx.merkle_branch,
            self.coinbase_tx.index,
        );
        if tx_root != self.parent_header.merkle_root {
            return Err(RejectReason::TxMerkleMismatch);
        }

        let script = self
            .coinbase_tx
            .tx
            .value
            .inputs
            .first()
            .map(|input| input.script_sig.as_slice())
            .unwrap_or_default();

        let commitment = match scan_coinbase_script(script, &root_bytes) {
            Ok(commitment) => commitment,
            Err(err) => {
                debug!(target: "auxpow", "coinbase scan failed for chain merkle root {}: {}", root, err);
                return Err(err.into());
            }
        };

        if commitment.tree_size != 1 << self.chain_merkle_branch.len() {
            return Err(RejectReason::SizeMismatch);
        }

        // Choose a pseudo-random slot in the chain merkle tree
        // but have it be fixed for a size/nonce/chain combination.
        //
        // This prevents the same work from being used twice for the
        // same chain while reducing the chance that two chains clash
        // for the same slot.
        let mut rand = commitment.nonce.wrapping_mul(1103515245).wrapping_add(12345);
        rand = rand.wrapping_add(chain_id);
        rand = rand.wrapping_mul(1103515245).wrapping_add(12345);

        if self.chain_index as u32 != rand % commitment.tree_size {
            return Err(RejectReason::WrongIndex);
        }
        Ok(())
    }
}

impl ToRaw for AuxPow {
    fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = self.coinbase_tx.to_bytes();
        bytes.extend_from_slice(&VarUint::from(self.chain_merkle_branch.len()).to_bytes());
        for hash in &self.chain_merkle_branch {
            bytes.extend_from_slice(hash.as_byte_array());
        }
        bytes.extend_from_slice(&self.chain_index.to_le_bytes());
        bytes.extend_from_slice(&self.parent_header.to_bytes());
        bytes
    }
}

impl fmt::Debug for AuxPow {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.debug_struct("AuxPow")
            .field("coinbase_tx", &self.coinbase_tx)
            .field("chain_branch_len", &self.chain_merkle_branch.len())
            .field("chain_index", &self.chain_index)
            .field("parent_header", &self.parent_header)
            .finish()
    }
}

/// The commitment found inside a coinbase script
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoinbaseCommitment {
    pub marker_pos: Option<usize>,
    pub root_pos: usize,
    pub tree_size: u32,
    pub nonce: u32,
}

/// Every way the scanner can fail on a coinbase script
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanError {
    MissingRoot,
    MultipleHeaders,
    HeaderNotAdjacent,
    RootTooLate,
    TruncatedTail,
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        RejectReason::from(*self).fmt(f)
    }
}

impl error::Error for ScanError {}

/// Every reason the verifier may reject a proof
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    NotCoinbase,
    ChainBranchTooLong,
    TxMerkleMismatch,
    MissingRoot,
    MultipleHeaders,
    HeaderNotAdjacent,
    RootTooLate,
    TruncatedTail,
    SizeMismatch,
    WrongIndex,
}

impl From<ScanError> for RejectReason {
    fn from(err: ScanError) -> Self {
        match err {
            ScanError::MissingRoot => RejectReason::MissingRoot,
            ScanError::MultipleHeaders => RejectReason::MultipleHeaders,
            ScanError::HeaderNotAdjacent => RejectReason::HeaderNotAdjacent,
            ScanError::RootTooLate => RejectReason::RootTooLate,
            ScanError::TruncatedTail => RejectReason::TruncatedTail,
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let str = match *self {
            RejectReason::NotCoinbase => "aux pow coinbase is not a generate",
            RejectReason::ChainBranchTooLong => "aux pow chain merkle branch too long",
            RejectReason::TxMerkleMismatch => "aux pow parent merkle root incorrect",
            RejectReason::MissingRoot => "chain merkle root missing in parent coinbase",
            RejectReason::MultipleHeaders => "multiple merged mining markers in parent coinbase",
            RejectReason::HeaderNotAdjacent => {
                "merged mining marker is not just before chain merkle root"
            }
            RejectReason::RootTooLate => "chain merkle root starts too late in parent coinbase",
            RejectReason::TruncatedTail => {
                "chain merkle tree size and nonce missing in parent coinbase"
            }
            RejectReason::SizeMismatch => "chain merkle tree size does not match parent coinbase",
            RejectReason::WrongIndex => "aux pow wrong index in chain merkle tree",
        };
        write!(f, "{}", str)
    }
}

impl error::Error for RejectReason {}

/// Locates the merged mining commitment for `expected_root` inside a
/// coinbase script. `expected_root` has to be in the reversed byte order
/// relative to the hash internals, see `AuxPow::check`.
pub fn scan_coinbase_script(
    script: &[u8],
    expected_root: &[u8; 32],
) -> Result<CoinbaseCommitment, ScanError> {
    let marker_pos = find_subslice(script, &MERGED_MINING_MARKER);
    let root_pos = match find_subslice(script, expected_root) {
        Some(pos) => pos,
        None => return Err(ScanError::MissingRoot),
    };

    match marker_pos {
        Some(pos) => {
            // A single marker instance just before the root pins the
            // commitment down to exactly one per coinbase.
            if find_subslice(&script[pos + 1..], &MERGED_MINING_MARKER).is_some() {
                return Err(ScanError::MultipleHeaders);
            }
            if pos + MERGED_MINING_MARKER.len() != root_pos {
                return Err(ScanError::HeaderNotAdjacent);
            }
        }
        None => {
            // Markerless commitments predate the marker and are only
            // accepted when the root starts early in the script.
            if root_pos >= MAX_LEGACY_ROOT_OFFSET {
                return Err(ScanError::RootTooLate);
            }
        }
    }

    let tail = &script[root_pos + expected_root.len()..];
    if tail.len() < 8 {
        return Err(ScanError::TruncatedTail);
    }
    Ok(CoinbaseCommitment {
        marker_pos,
        root_pos,
        tree_size: LittleEndian::read_u32(&tail[0..4]),
        nonce: LittleEndian::read_u32(&tail[4..8]),
    })
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}
