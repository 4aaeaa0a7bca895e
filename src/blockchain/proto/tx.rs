use bitcoin::hashes::{sha256d, Hash};
use std::fmt;

use crate::blockchain::proto::varuint::VarUint;
use crate::blockchain::proto::ToRaw;

/// Simple transaction struct.
/// Please note: The txid is not stored here. See Hashed.
pub struct RawTx {
    pub version: u32,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    pub locktime: u32,
}

impl RawTx {
    pub fn is_coinbase(&self) -> bool {
        if self.inputs.len() == 1 {
            let input = &self.inputs[0];
            return input.outpoint.txid == sha256d::Hash::all_zeros()
                && input.outpoint.index == 0xFFFFFFFF;
        }
        false
    }
}

impl ToRaw for RawTx {
    fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(4 + 41 * self.inputs.len() + 9 * self.outputs.len() + 4);
        bytes.extend_from_slice(&self.version.to_le_bytes());
        bytes.extend_from_slice(&VarUint::from(self.inputs.len()).to_bytes());
        for i in &self.inputs {
            bytes.extend_from_slice(&i.to_bytes());
        }
        bytes.extend_from_slice(&VarUint::from(self.outputs.len()).to_bytes());
        for o in &self.outputs {
            bytes.extend_from_slice(&o.to_bytes());
        }
        bytes.extend_from_slice(&self.locktime.to_le_bytes());
        bytes
    }
}

impl fmt::Debug for RawTx {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.debug_struct("Tx")
            .field("version", &self.version)
            .field("in_count", &self.inputs.len())
            .field("out_count", &self.outputs.len())
            .field("locktime", &self.locktime)
            .finish()
    }
}

/// TxOutpoint references an existing transaction output
#[derive(PartialEq, Eq, Hash)]
pub struct TxOutpoint {
    pub txid: sha256d::Hash,
    pub index: u32, // 0-based offset within tx
}

impl TxOutpoint {
    pub fn new(txid: sha256d::Hash, index: u32) -> Self {
        Self { txid, index }
    }

    /// Outpoint of a coinbase input: null txid and maxed out index
    pub fn null() -> Self {
        Self::new(sha256d::Hash::all_zeros(), 0xFFFFFFFF)
    }
}

impl ToRaw for TxOutpoint {
    fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(32 + 4);
        bytes.extend_from_slice(self.txid.as_byte_array());
        bytes.extend_from_slice(&self.index.to_le_bytes());
        bytes
    }
}

impl fmt::Debug for TxOutpoint {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.debug_struct("TxOutpoint")
            .field("txid", &self.txid)
            .field("index", &self.index)
            .finish()
    }
}

/// Holds TxInput informations
pub struct TxInput {
    pub outpoint: TxOutpoint,
    pub script_sig: Vec<u8>,
    pub seq_no: u32,
}

impl ToRaw for TxInput {
    fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(36 + 5 + self.script_sig.len() + 4);
        bytes.extend_from_slice(&self.outpoint.to_bytes());
        bytes.extend_from_slice(&VarUint::from(self.script_sig.len()).to_bytes());
        bytes.extend_from_slice(&self.script_sig);
        bytes.extend_from_slice(&self.seq_no.to_le_bytes());
        bytes
    }
}

impl fmt::Debug for TxInput {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.debug_struct("TxInput")
            .field("outpoint", &self.outpoint)
            .field("script_sig", &self.script_sig)
            .field("seq_no", &self.seq_no)
            .finish()
    }
}

/// Holds TxOutput informations
pub struct TxOutput {
    pub value: u64,
    pub script_pubkey: Vec<u8>,
}

impl ToRaw for TxOutput {
    fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(8 + 5 + self.script_pubkey.len());
        bytes.extend_from_slice(&self.value.to_le_bytes());
        bytes.extend_from_slice(&VarUint::from(self.script_pubkey.len()).to_bytes());
        bytes.extend_from_slice(&self.script_pubkey);
        bytes
    }
}

impl fmt::Debug for TxOutput {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.debug_struct("TxOutput")
            .field("value", &self.value)
            .field("script_pubkey", &crate::common::utils::arr_to_hex(&self.script_pubkey))
            .finish()
    }
}
