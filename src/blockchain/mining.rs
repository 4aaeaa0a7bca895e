use std::cmp;

use crate::blockchain::proto::auxpow::MERGED_MINING_MARKER;
use crate::blockchain::proto::block::Block;
use crate::blockchain::proto::script::{ScriptBuilder, OP_2};
use crate::blockchain::proto::Hashed;
use crate::errors::{OpError, OpErrorKind, OpResult};

/// Assembles a coinbase signature script committing to merged mining work:
/// `[bits] [extra_nonce] [OP_2] [marker || aux_payload]`.
/// OP_2 is a placeholder in case we want versioning later.
pub fn make_coinbase_script(bits: u32, extra_nonce: u32, aux_payload: &[u8]) -> Vec<u8> {
    let mut tagged = Vec::with_capacity(MERGED_MINING_MARKER.len() + aux_payload.len());
    tagged.extend_from_slice(&MERGED_MINING_MARKER);
    tagged.extend_from_slice(aux_payload);

    ScriptBuilder::new()
        .push_int(bits)
        .push_int(extra_nonce)
        .push_opcode(OP_2)
        .push_slice(&tagged)
        .into_bytes()
}

/// Reverses the commitment embedding by removing the marker prefix
pub fn strip_merged_mining_marker(payload: &[u8]) -> OpResult<&[u8]> {
    match payload.strip_prefix(&MERGED_MINING_MARKER[..]) {
        Some(rest) => Ok(rest),
        None => Err(OpError::new(OpErrorKind::ValidateError)
            .join_msg("payload does not start with the merged mining marker")),
    }
}

/// Advances the extra nonce and rebuilds the coinbase for the next hashing
/// attempt. The extra nonce is a small counter; once it reaches the
/// threshold and wall clock time has moved on, time progress refreshes the
/// search space instead of exhausting the counter.
///
/// `median_time_past` and `adjusted_time` come from the caller, chain state
/// and network time are not this module's business. A block without
/// transactions or a coinbase without inputs is a programmer error and
/// panics.
pub fn increment_extra_nonce(
    block: &mut Block,
    median_time_past: u64,
    adjusted_time: u64,
    extra_nonce: &mut u32,
    prev_time: &mut u64,
    aux_payload: &[u8],
) {
    let now = cmp::max(median_time_past + 1, adjusted_time);
    *extra_nonce = extra_nonce.wrapping_add(1);
    if *extra_nonce >= 0x7f && now > *prev_time + 1 {
        *extra_nonce = 1;
        *prev_time = now;
    }

    let mut coinbase = block.txs.remove(0).value;
    coinbase.inputs[0].script_sig =
        make_coinbase_script(block.header.bits, *extra_nonce, aux_payload);
    block.txs.insert(0, Hashed::double_sha256(coinbase));
    block.header.merkle_root = block.compute_merkle_root();
}
