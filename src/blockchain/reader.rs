use std::borrow::BorrowMut;
use std::io;
use std::sync::Arc;

use bitcoin::hashes::{sha256d, Hash};
use byteorder::{LittleEndian, ReadBytesExt};

use crate::blockchain::proto::auxpow::{AuxPow, MerkleTx};
use crate::blockchain::proto::block::Block;
use crate::blockchain::proto::header::BlockHeader;
use crate::blockchain::proto::tx::{RawTx, TxInput, TxOutpoint, TxOutput};
use crate::blockchain::proto::varuint::VarUint;
use crate::blockchain::proto::Hashed;
use crate::errors::OpResult;

/// Trait for structured reading of blockchain data
pub trait BlockchainRead: io::Read {
    fn read_256hash(&mut self) -> OpResult<sha256d::Hash> {
        let mut arr = [0u8; 32];
        self.read_exact(arr.borrow_mut())?;
        Ok(sha256d::Hash::from_byte_array(arr))
    }

    fn read_u8_vec(&mut self, count: u32) -> OpResult<Vec<u8>> {
        let mut arr = vec![0u8; count as usize];
        self.read_exact(arr.borrow_mut())?;
        Ok(arr)
    }

    /// Reads a varint length prefixed sequence of hashes (a merkle branch)
    fn read_hash_vec(&mut self) -> OpResult<Vec<sha256d::Hash>> {
        let count = VarUint::read_from(self)?;
        let mut hashes = Vec::with_capacity(count.value as usize);
        for _ in 0..count.value {
            hashes.push(self.read_256hash()?);
        }
        Ok(hashes)
    }

    /// Whether an aux proof follows the header is signalled by a version
    /// flag bit owned by the embedding chain, so the caller decides.
    fn read_block(&mut self, is_auxpow: bool) -> OpResult<Block> {
        let header = self.read_block_header()?;
        let aux_pow = match is_auxpow {
            true => Some(Arc::new(self.read_aux_pow()?)),
            false => None,
        };
        let tx_count = VarUint::read_from(self)?;
        let txs = self.read_txs(tx_count.value)?;
        Ok(Block::new(header, aux_pow, txs))
    }

    fn read_block_header(&mut self) -> OpResult<BlockHeader> {
        Ok(BlockHeader::new(
            self.read_i32::<LittleEndian>()?,
            self.read_256hash()?,
            self.read_256hash()?,
            self.read_u32::<LittleEndian>()?,
            self.read_u32::<LittleEndian>()?,
            self.read_u32::<LittleEndian>()?,
        ))
    }

    fn read_aux_pow(&mut self) -> OpResult<AuxPow> {
        let coinbase_tx = self.read_merkle_tx()?;
        let chain_merkle_branch = self.read_hash_vec()?;
        let chain_index = self.read_i32::<LittleEndian>()?;
        let parent_header = self.read_block_header()?;
        Ok(AuxPow {
            coinbase_tx,
            chain_merkle_branch,
            chain_index,
            parent_header,
        })
    }

    fn read_merkle_tx(&mut self) -> OpResult<MerkleTx> {
        let tx = Hashed::double_sha256(self.read_tx()?);
        let parent_block_hash = self.read_256hash()?;
        let merkle_branch = self.read_hash_vec()?;
        let index = self.read_i32::<LittleEndian>()?;
        Ok(MerkleTx {
            tx,
            parent_block_hash,
            merkle_branch,
            index,
        })
    }

    fn read_txs(&mut self, tx_count: u64) -> OpResult<Vec<RawTx>> {
        let mut txs = Vec::with_capacity(tx_count as usize);
        for _ in 0..tx_count {
            txs.push(self.read_tx()?);
        }
        Ok(txs)
    }

    fn read_tx(&mut self) -> OpResult<RawTx> {
        let mut flags = 0u8;
        let version = self.read_u32::<LittleEndian>()?;

        // Parse transaction inputs and check if this transaction contains segwit data
        let mut in_count = VarUint::read_from(self)?;
        if in_count.value == 0 {
            flags = self.read_u8()?;
            in_count = VarUint::read_from(self)?
        }
        let inputs = self.read_tx_inputs(in_count.value)?;

        // Parse transaction outputs
        let out_count = VarUint::read_from(self)?;
        let outputs = self.read_tx_outputs(out_count.value)?;

        // Check if the witness flag is present. Witness data does not enter
        // the txid, so it is skipped here.
        if flags & 1 > 0 {
            for _ in 0..in_count.value {
                let item_count = VarUint::read_from(self)?;
                for _ in 0..item_count.value {
                    let witness_len = VarUint::read_from(self)?;
                    let _ = self.read_u8_vec(witness_len.value as u32)?;
                }
            }
        }
        let locktime = self.read_u32::<LittleEndian>()?;
        Ok(RawTx {
            version,
            inputs,
            outputs,
            locktime,
        })
    }

    fn read_tx_outpoint(&mut self) -> OpResult<TxOutpoint> {
        Ok(TxOutpoint::new(
            self.read_256hash()?,
            self.read_u32::<LittleEndian>()?,
        ))
    }

    fn read_tx_inputs(&mut self, input_count: u64) -> OpResult<Vec<TxInput>> {
        let mut inputs = Vec::with_capacity(input_count as usize);
        for _ in 0..input_count {
            let outpoint = self.read_tx_outpoint()?;
            let script_len = VarUint::read_from(self)?;
            let script_sig = self.read_u8_vec(script_len.value as u32)?;
            let seq_no = self.read_u32::<LittleEndian>()?;
            inputs.push(TxInput {
                outpoint,
                script_sig,
                seq_no,
            });
        }
        Ok(inputs)
    }

    fn read_tx_outputs(&mut self, output_count: u64) -> OpResult<Vec<TxOutput>> {
        let mut outputs = Vec::with_capacity(output_count as usize);
        for _ in 0..output_count {
            let value = self.read_u64::<LittleEndian>()?;
            let script_len = VarUint::read_from(self)?;
            let script_pubkey = self.read_u8_vec(script_len.value as u32)?;
            outputs.push(TxOutput {
                value,
                script_pubkey,
            });
        }
        Ok(outputs)
    }
}

/// All types that implement `Read` get methods defined in `BlockchainRead`
/// for free.
impl<R: io::Read + ?Sized> BlockchainRead for R {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::proto::ToRaw;
    use crate::common::utils;
    use std::io::Cursor;

    #[test]
    fn test_parse_genesis_block() {
        /********** Genesis block raw data for reference (Most fields are little endian) ***********
        version            0x01000000
        prev_hash          0x0000000000000000000000000000000000000000000000000000000000000000
        merkle_root        0x3ba3edfd7a7b12b27ac72c3e67768f617fc81bc3888a51323a9fb8aa4b1e5e4a
        timestamp          0x29ab5f49
        bits               0x1d00ffff
        nonce              0x1dac2b7c
        tx_count           0x01
        tx.version         0x01000000
        tx.in_count        0x01
        tx.in.prev_hash    0x0000000000000000000000000000000000000000000000000000000000000000
        tx.in.out_id       0xffffffff
        tx.in.script_len   0x4d
        tx.in.script_sig   0x04ffff001d0104455468652054696d65732030332f4a616e2f32303039204368616e63656c6c6f72206f6e206272696e6b206f66207365636f6e64206261696c6f757420666f722062616e6b73
        tx.in.sequence     0xffffffff
        tx.out_count       0x01
        tx.out.value       0x00f2052a01000000
        tx.out.script_len  0x43
        tx.out.script_pubkey      0x4104678afdb0fe5548271967f1a67130b7105cd6a828e03909a67962e0ea1f61deb649f6bc3f4cef38c4f35504e51ec112de5c384df7ba0b8d578a4c702b6bf11d5fac
        tx.lock_time       0x00000000
        *******************************************************************************************/
        let raw_data = vec![
            0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x3b, 0xa3, 0xed, 0xfd, 0x7a, 0x7b,
            0x12, 0xb2, 0x7a, 0xc7, 0x2c, 0x3e, 0x67, 0x76, 0x8f, 0x61, 0x7f, 0xc8, 0x1b, 0xc3,
            0x88, 0x8a, 0x51, 0x32, 0x3a, 0x9f, 0xb8, 0xaa, 0x4b, 0x1e, 0x5e, 0x4a, 0x29, 0xab,
            0x5f, 0x49, 0xff, 0xff, 0x00, 0x1d, 0x1d, 0xac, 0x2b, 0x7c, 0x01, 0x01, 0x00, 0x00,
            0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xff, 0xff, 0xff, 0xff, 0x4d, 0x04, 0xff, 0xff,
            0x00, 0x1d, 0x01, 0x04, 0x45, 0x54, 0x68, 0x65, 0x20, 0x54, 0x69, 0x6d, 0x65, 0x73,
            0x20, 0x30, 0x33, 0x2f, 0x4a, 0x61, 0x6e, 0x2f, 0x32, 0x30, 0x30, 0x39, 0x20, 0x43,
            0x68, 0x61, 0x6e, 0x63, 0x65, 0x6c, 0x6c, 0x6f, 0x72, 0x20, 0x6f, 0x6e, 0x20, 0x62,
            0x72, 0x69, 0x6e, 0x6b, 0x20, 0x6f, 0x66, 0x20, 0x73, 0x65, 0x63, 0x6f, 0x6e, 0x64,
            0x20, 0x62, 0x61, 0x69, 0x6c, 0x6f, 0x75, 0x74, 0x20, 0x66, 0x6f, 0x72, 0x20, 0x62,
            0x61, 0x6e, 0x6b, 0x73, 0xff, 0xff, 0xff, 0xff, 0x01, 0x00, 0xf2, 0x05, 0x2a, 0x01,
            0x00, 0x00, 0x00, 0x43, 0x41, 0x04, 0x67, 0x8a, 0xfd, 0xb0, 0xfe, 0x55, 0x48, 0x27,
            0x19, 0x67, 0xf1, 0xa6, 0x71, 0x30, 0xb7, 0x10, 0x5c, 0xd6, 0xa8, 0x28, 0xe0, 0x39,
            0x09, 0xa6, 0x79, 0x62, 0xe0, 0xea, 0x1f, 0x61, 0xde, 0xb6, 0x49, 0xf6, 0xbc, 0x3f,
            0x4c, 0xef, 0x38, 0xc4, 0xf3, 0x55, 0x04, 0xe5, 0x1e, 0xc1, 0x12, 0xde, 0x5c, 0x38,
            0x4d, 0xf7, 0xba, 0x0b, 0x8d, 0x57, 0x8a, 0x4c, 0x70, 0x2b, 0x6b, 0xf1, 0x1d, 0x5f,
            0xac, 0x00, 0x00, 0x00, 0x00,
        ];
        let mut reader = Cursor::new(&raw_data);
        let block = reader.read_block(false).unwrap();

        // Block Header
        assert_eq!(0x00000001, block.header.version);
        assert_eq!(
            "0000000000000000000000000000000000000000000000000000000000000000",
            utils::arr_to_hex(block.header.prev_hash.as_byte_array())
        );
        assert_eq!(
            "3ba3edfd7a7b12b27ac72c3e67768f617fc81bc3888a51323a9fb8aa4b1e5e4a",
            utils::arr_to_hex(block.header.merkle_root.as_byte_array())
        );
        assert_eq!(
            "000000000019d6689c085ae165831e934ff763ae46a2a6c172b3f1b60a8ce26f",
            utils::arr_to_hex_swapped(block.header_hash().as_byte_array())
        );
        assert_eq!(1231006505, block.header.timestamp);
        assert_eq!(0x1d00ffff, block.header.bits);
        assert_eq!(2083236893, block.header.nonce);

        // Tx
        assert!(block.aux_pow.is_none());
        assert_eq!(1, block.txs.len());
        assert_eq!(0x00000001, block.txs[0].value.version);
        assert!(block.txs[0].value.is_coinbase());
        assert_eq!(
            "4a5e1e4baab89f3a32518a88c31bc87f618f76673e2cc77ab2127b7afdeda33b",
            utils::arr_to_hex_swapped(block.txs[0].hash.as_byte_array())
        );

        // Tx Inputs
        assert_eq!(1, block.txs[0].value.inputs.len());
        assert_eq!(0xffffffff, block.txs[0].value.inputs[0].outpoint.index);
        assert_eq!("04ffff001d0104455468652054696d65732030332f4a616e2f32303039204368616e63656c6c6f72206f6e206272696e6b206f66207365636f6e64206261696c6f757420666f722062616e6b73",
                                utils::arr_to_hex(&block.txs[0].value.inputs[0].script_sig));
        assert_eq!(0xffffffff, block.txs[0].value.inputs[0].seq_no);

        // Tx Outputs
        assert_eq!(1, block.txs[0].value.outputs.len());
        assert_eq!(5_000_000_000, block.txs[0].value.outputs[0].value);
        assert_eq!(0x00000000, block.txs[0].value.locktime);

        // The merkle root of a single transaction is its own txid
        assert!(block.verify_merkle_root().is_ok());

        // Serialization has to reproduce the input bytes
        assert_eq!(block.to_bytes(), raw_data);
    }

    #[test]
    fn test_parse_segwit_tx() {
        // See: https://en.bitcoin.it/wiki/Weight_units#Weight_for_segwit_transactions
        let raw_data = vec![
            0x01, 0x00, 0x00, 0x00, 0x00, 0x01, 0x01, 0x15, 0xe1, 0x80, 0xdc, 0x28, 0xa2, 0x32,
            0x7e, 0x68, 0x7f, 0xac, 0xc3, 0x3f, 0x10, 0xf2, 0xa2, 0x0d, 0xa7, 0x17, 0xe5, 0x54,
            0x84, 0x06, 0xf7, 0xae, 0x8b, 0x4c, 0x81, 0x10, 0x72, 0xf8, 0x56, 0x03, 0x00, 0x00,
            0x00, 0x17, 0x16, 0x00, 0x14, 0x1d, 0x7c, 0xd6, 0xc7, 0x5c, 0x2e, 0x86, 0xf4, 0xcb,
            0xf9, 0x8e, 0xae, 0xd2, 0x21, 0xb3, 0x0b, 0xd9, 0xa0, 0xb9, 0x28, 0xff, 0xff, 0xff,
            0xff, 0x01, 0x9c, 0xae, 0xf5, 0x05, 0x00, 0x00, 0x00, 0x00, 0x19, 0x76, 0xa9, 0x14,
            0x1d, 0x7c, 0xd6, 0xc7, 0x5c, 0x2e, 0x86, 0xf4, 0xcb, 0xf9, 0x8e, 0xae, 0xd2, 0x21,
            0xb3, 0x0b, 0xd9, 0xa0, 0xb9, 0x28, 0x88, 0xac, 0x02, 0x48, 0x30, 0x45, 0x02, 0x21,
            0x00, 0xf7, 0x64, 0x28, 0x7d, 0x3e, 0x99, 0xb1, 0x47, 0x4d, 0xa9, 0xbe, 0xc7, 0xf7,
            0xed, 0x23, 0x6d, 0x6c, 0x81, 0xe7, 0x93, 0xb2, 0x0c, 0x4b, 0x5a, 0xa1, 0xf3, 0x05,
            0x1b, 0x9a, 0x7d, 0xaa, 0x63, 0x02, 0x20, 0x16, 0xa1, 0x98, 0x03, 0x1d, 0x55, 0x54,
            0xdb, 0xb8, 0x55, 0xbd, 0xbe, 0x85, 0x34, 0x77, 0x6a, 0x4b, 0xe6, 0x95, 0x8b, 0xd8,
            0xd5, 0x30, 0xdc, 0x00, 0x1c, 0x32, 0xb8, 0x28, 0xf6, 0xf0, 0xab, 0x01, 0x21, 0x03,
            0x82, 0x62, 0xa6, 0xc6, 0xce, 0xc9, 0x3c, 0x2d, 0x3e, 0xcd, 0x6c, 0x60, 0x72, 0xef,
            0xea, 0x86, 0xd0, 0x2f, 0xf8, 0xe3, 0x32, 0x8b, 0xbd, 0x02, 0x42, 0xb2, 0x0a, 0xf3,
            0x42, 0x59, 0x90, 0xac, 0x00, 0x00, 0x00, 0x00,
        ];
        let mut reader = Cursor::new(&raw_data);
        let tx = reader.read_tx().unwrap();

        assert_eq!(tx.version, 1);
        assert_eq!(tx.inputs.len(), 1);
        assert_eq!(tx.inputs[0].outpoint.index, 3);
        assert_eq!(tx.inputs[0].script_sig.len(), 23);
        assert_eq!(tx.inputs[0].seq_no, 0xffffffff);
        assert_eq!(tx.outputs.len(), 1);
        assert_eq!(tx.outputs[0].value, 99987100);
        assert_eq!(tx.outputs[0].script_pubkey.len(), 25);
        assert_eq!(tx.locktime, 0);

        // The witness is consumed along the way
        assert_eq!(reader.position() as usize, raw_data.len());
    }

    #[test]
    fn test_aux_pow_round_trip() {
        let coinbase = RawTx {
            version: 1,
            inputs: vec![TxInput {
                outpoint: TxOutpoint::null(),
                script_sig: vec![0x04, 0xff, 0xff, 0x00, 0x1d, 0x51],
                seq_no: 0xFFFFFFFF,
            }],
            outputs: vec![TxOutput {
                value: 5_000_000_000,
                script_pubkey: vec![0x51],
            }],
            locktime: 0,
        };
        let mut coinbase_tx = MerkleTx::new(coinbase);
        coinbase_tx.index = 0;
        coinbase_tx.merkle_branch = vec![sha256d::Hash::hash(b"sibling")];

        let aux_pow = AuxPow {
            coinbase_tx,
            chain_merkle_branch: vec![sha256d::Hash::hash(b"chain")],
            chain_index: 1,
            parent_header: BlockHeader::new(
                1,
                sha256d::Hash::hash(b"prev"),
                sha256d::Hash::hash(b"root"),
                1231006505,
                0x1d00ffff,
                42,
            ),
        };

        let bytes = aux_pow.to_bytes();
        let mut reader = Cursor::new(&bytes);
        let parsed = reader.read_aux_pow().unwrap();

        assert_eq!(parsed.coinbase_tx.tx.hash, aux_pow.coinbase_tx.tx.hash);
        assert_eq!(parsed.coinbase_tx.merkle_branch, aux_pow.coinbase_tx.merkle_branch);
        assert_eq!(parsed.coinbase_tx.index, 0);
        assert_eq!(parsed.chain_merkle_branch, aux_pow.chain_merkle_branch);
        assert_eq!(parsed.chain_index, 1);
        assert_eq!(parsed.parent_block_hash(), aux_pow.parent_header.hash());
        assert_eq!(parsed.to_bytes(), bytes);
    }
}
