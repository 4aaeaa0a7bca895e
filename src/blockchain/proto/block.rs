use bitcoin::hashes::sha256d;
use std::fmt;
use std::sync::Arc;

use rayon::iter::{IntoParallelIterator, ParallelIterator};

use crate::blockchain::proto::auxpow::AuxPow;
use crate::blockchain::proto::header::BlockHeader;
use crate::blockchain::proto::tx::RawTx;
use crate::blockchain::proto::varuint::VarUint;
use crate::blockchain::proto::{Hashed, ToRaw};
use crate::common::utils;
use crate::errors::{OpError, OpErrorKind, OpResult};

/// Basic block structure which holds all information.
/// The aux proof is shared, cloning the link never deep copies it.
pub struct Block {
    pub header: BlockHeader,
    pub aux_pow: Option<Arc<AuxPow>>,
    pub txs: Vec<Hashed<RawTx>>,
}

impl Block {
    pub fn new(header: BlockHeader, aux_pow: Option<Arc<AuxPow>>, txs: Vec<RawTx>) -> Block {
        let txs = txs
            .into_par_iter()
            .map(Hashed::double_sha256)
            .collect();
        Block {
            header,
            aux_pow,
            txs,
        }
    }

    pub fn header_hash(&self) -> sha256d::Hash {
        self.header.hash()
    }

    /// Computes merkle root for all containing transactions
    pub fn compute_merkle_root(&self) -> sha256d::Hash {
        let hashes = self
            .txs
            .iter()
            .map(|tx| tx.hash)
            .collect::<Vec<sha256d::Hash>>();
        utils::merkle_root(hashes)
    }

    /// Calculates merkle root and verifies it against the field in BlockHeader
    pub fn verify_merkle_root(&self) -> OpResult<()> {
        let merkle_root = self.compute_merkle_root();

        if merkle_root == self.header.merkle_root {
            Ok(())
        } else {
            let msg = format!(
                "Invalid merkle_root!\n  -> expected: {}\n  -> got: {}\n",
                &self.header.merkle_root, &merkle_root
            );
            Err(OpError::new(OpErrorKind::ValidateError).join_msg(&msg))
        }
    }
}

impl ToRaw for Block {
    fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = self.header.to_bytes();
        if let Some(ref aux_pow) = self.aux_pow {
            bytes.extend_from_slice(&aux_pow.to_bytes());
        }
        bytes.extend_from_slice(&VarUint::from(self.txs.len()).to_bytes());
        for tx in &self.txs {
            bytes.extend_from_slice(&tx.value.to_bytes());
        }
        bytes
    }
}

impl fmt::Debug for Block {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.debug_struct("Block")
            .field("header", &self.header)
            .field("has_aux_pow", &self.aux_pow.is_some())
            .field("tx_count", &self.txs.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::proto::tx::{TxInput, TxOutpoint, TxOutput};
    use bitcoin::hashes::Hash;

    fn dummy_tx(tag: u8) -> RawTx {
        RawTx {
            version: 1,
            inputs: vec![TxInput {
                outpoint: TxOutpoint::null(),
                script_sig: vec![tag],
                seq_no: 0xFFFFFFFF,
            }],
            outputs: vec![TxOutput {
                value: 5_000_000_000,
                script_pubkey: vec![0x51],
            }],
            locktime: 0,
        }
    }

    #[test]
    fn test_verify_merkle_root() {
        let txs = vec![dummy_tx(0), dummy_tx(1)];
        let header = BlockHeader::new(
            1,
            sha256d::Hash::all_zeros(),
            sha256d::Hash::all_zeros(),
            0,
            0x1d00ffff,
            0,
        );
        let mut block = Block::new(header, None, txs);
        assert!(block.verify_merkle_root().is_err());

        block.header.merkle_root = utils::hash_pair(
            block.txs[0].hash.as_byte_array(),
            block.txs[1].hash.as_byte_array(),
        );
        assert!(block.verify_merkle_root().is_ok());
    }
}
