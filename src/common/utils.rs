use bitcoin::hashes::{sha256d, Hash};

/// Simple slice merge
#[inline]
pub fn merge_slices(a: &[u8], b: &[u8]) -> Vec<u8> {
    let mut merged = Vec::with_capacity(a.len() + b.len());
    merged.extend_from_slice(a);
    merged.extend_from_slice(b);
    merged
}

/// Double sha256 over the concatenation of two slices
#[inline]
pub fn hash_pair(a: &[u8], b: &[u8]) -> sha256d::Hash {
    sha256d::Hash::hash(&merge_slices(a, b))
}

/// Calculates the merkle root for the given hashes.
/// If the level length is odd, the last hash is paired with itself.
/// See: https://en.bitcoin.it/wiki/Protocol_documentation#Merkle_Trees
pub fn merkle_root(hashes: Vec<sha256d::Hash>) -> sha256d::Hash {
    match hashes.len() {
        0 => return sha256d::Hash::all_zeros(),
        1 => return hashes[0],
        _ => {}
    }
    let pairs = hashes
        .chunks(2)
        .map(|pair| match *pair {
            [a, b] => hash_pair(a.as_byte_array(), b.as_byte_array()),
            [a] => hash_pair(a.as_byte_array(), a.as_byte_array()),
            _ => unreachable!(),
        })
        .collect();
    merkle_root(pairs)
}

/// Recomputes the merkle root implied by a leaf, its branch and its index
/// within the widest tree level. The low bit of the index selects on which
/// side each sibling is hashed, consumed one bit per branch element.
/// An empty branch returns the leaf unchanged.
pub fn check_merkle_branch(
    leaf: sha256d::Hash,
    branch: &[sha256d::Hash],
    mut index: i32,
) -> sha256d::Hash {
    let mut hash = leaf;
    for sibling in branch {
        hash = if index & 1 == 0 {
            hash_pair(hash.as_byte_array(), sibling.as_byte_array())
        } else {
            hash_pair(sibling.as_byte_array(), hash.as_byte_array())
        };
        index >>= 1;
    }
    hash
}

#[inline]
pub fn arr_to_hex(data: &[u8]) -> String {
    data.iter().map(|b| format!("{:02x}", b)).collect()
}

#[inline]
pub fn arr_to_hex_swapped(data: &[u8]) -> String {
    data.iter().rev().map(|b| format!("{:02x}", b)).collect()
}

pub fn hex_to_vec(hex_str: &str) -> Vec<u8> {
    assert_eq!(hex_str.len() % 2, 0);
    (0..hex_str.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&hex_str[i..i + 2], 16).unwrap())
        .collect()
}

pub fn hex_to_arr32_swapped(hex_str: &str) -> [u8; 32] {
    assert_eq!(hex_str.len(), 64);
    let mut arr = [0u8; 32];
    for (place, element) in arr.iter_mut().zip(hex_to_vec(hex_str).iter().rev()) {
        *place = *element;
    }
    arr
}
