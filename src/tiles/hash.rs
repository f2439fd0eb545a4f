//! Cache-key hashing.
//!
//! Keys are persisted as disk-cache file names, so the derivation has to stay
//! bit-for-bit stable across releases: MurmurHash64A with seed `0xe17a1465`
//! over each identifier's UTF-8 bytes, plus one hash over an 8-byte position
//! buffer (column then row, each a big-endian `i32`), all XORed together.

use crate::tiles::request::{CacheKey, TileRequest};

const SEED: u32 = 0xe17a_1465;
const M: u64 = 0xc6a4_a793_5bd1_e995;
const R: u32 = 47;

/// MurmurHash64A of `data` with the cache seed
pub fn hash64(data: &[u8]) -> u64 {
    murmur64a(data, SEED)
}

/// MurmurHash64A (Austin Appleby), little-endian block reads
pub fn murmur64a(data: &[u8], seed: u32) -> u64 {
    let len = data.len();
    let mut h = (seed as u64) ^ (len as u64).wrapping_mul(M);

    let mut blocks = data.chunks_exact(8);
    for block in &mut blocks {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(block);
        let mut k = u64::from_le_bytes(buf);

        k = k.wrapping_mul(M);
        k ^= k >> R;
        k = k.wrapping_mul(M);

        h ^= k;
        h = h.wrapping_mul(M);
    }

    let tail = blocks.remainder();
    if !tail.is_empty() {
        for (i, byte) in tail.iter().enumerate() {
            h ^= (*byte as u64) << (8 * i);
        }
        h = h.wrapping_mul(M);
    }

    h ^= h >> R;
    h = h.wrapping_mul(M);
    h ^= h >> R;
    h
}

/// Derives the cache key of a tile request
pub fn create_key(request: &TileRequest) -> CacheKey {
    let service = hash64(request.service_identifier.as_bytes());
    let layer = hash64(request.layer_identifier.as_bytes());
    let set = hash64(request.set_identifier.as_bytes());
    let matrix = hash64(request.matrix_identifier.as_bytes());

    let mut position_buf = [0u8; 8];
    position_buf[..4].copy_from_slice(&request.position.col.to_be_bytes());
    position_buf[4..].copy_from_slice(&request.position.row.to_be_bytes());
    let position = hash64(&position_buf);

    CacheKey(service ^ layer ^ set ^ matrix ^ position)
}
