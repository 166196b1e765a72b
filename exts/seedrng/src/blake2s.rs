// Copyright (c) 2022 Huawei Technologies Co.,Ltd. All rights reserved.
//
// sysMaster is licensed under Mulan PSL v2.
// You can use this software according to the terms and conditions of the Mulan
// PSL v2.
// You may obtain a copy of Mulan PSL v2 at:
//         http://license.coscl.org.cn/MulanPSL2
// THIS SOFTWARE IS PROVIDED ON AN "AS IS" BASIS, WITHOUT WARRANTIES OF ANY
// KIND, EITHER EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO
// NON-INFRINGEMENT, MERCHANTABILITY OR FIT FOR A PARTICULAR PURPOSE.
// See the Mulan PSL v2 for more details.

//! BLAKE2s (RFC 7693), unkeyed, used only to mix seed material.
//!
//! The compression schedule is the standard one, so a seed file written by
//! any other seedrng implementation hashes to the same digest here.
use crate::error::*;
use snafu::ensure;

/// Block length in bytes.
pub const BLAKE2S_BLOCK_LEN: usize = 64;
/// Digest length in bytes.
pub const BLAKE2S_HASH_LEN: usize = 32;

const BLAKE2S_IV: [u32; 8] = [
    0x6A09_E667,
    0xBB67_AE85,
    0x3C6E_F372,
    0xA54F_F53A,
    0x510E_527F,
    0x9B05_688C,
    0x1F83_D9AB,
    0x5BE0_CD19,
];

const BLAKE2S_SIGMA: [[usize; 16]; 10] = [
    [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15],
    [14, 10, 4, 8, 9, 15, 13, 6, 1, 12, 0, 2, 11, 7, 5, 3],
    [11, 8, 12, 0, 5, 2, 15, 13, 10, 14, 3, 6, 7, 1, 9, 4],
    [7, 9, 3, 1, 13, 12, 11, 14, 2, 6, 5, 10, 4, 0, 15, 8],
    [9, 0, 5, 7, 2, 4, 10, 15, 14, 1, 11, 12, 6, 8, 3, 13],
    [2, 12, 6, 10, 0, 11, 8, 3, 4, 13, 7, 5, 15, 14, 1, 9],
    [12, 5, 1, 15, 14, 13, 4, 10, 0, 7, 6, 3, 9, 2, 8, 11],
    [13, 11, 7, 14, 12, 1, 3, 9, 5, 0, 15, 4, 8, 6, 2, 10],
    [6, 15, 14, 9, 11, 3, 0, 8, 12, 2, 13, 7, 1, 4, 10, 5],
    [10, 2, 8, 4, 7, 6, 1, 5, 15, 11, 9, 14, 3, 12, 13, 0],
];

/* Working vector indices for the eight G mixes of a round:
 * four columns, then four diagonals. */
const G_LANES: [[usize; 4]; 8] = [
    [0, 4, 8, 12],
    [1, 5, 9, 13],
    [2, 6, 10, 14],
    [3, 7, 11, 15],
    [0, 5, 10, 15],
    [1, 6, 11, 12],
    [2, 7, 8, 13],
    [3, 4, 9, 14],
];

#[inline(always)]
fn g(v: &mut [u32; 16], [a, b, c, d]: [usize; 4], x: u32, y: u32) {
    v[a] = v[a].wrapping_add(v[b]).wrapping_add(x);
    v[d] = (v[d] ^ v[a]).rotate_right(16);
    v[c] = v[c].wrapping_add(v[d]);
    v[b] = (v[b] ^ v[c]).rotate_right(12);
    v[a] = v[a].wrapping_add(v[b]).wrapping_add(y);
    v[d] = (v[d] ^ v[a]).rotate_right(8);
    v[c] = v[c].wrapping_add(v[d]);
    v[b] = (v[b] ^ v[c]).rotate_right(7);
}

/// Incremental BLAKE2s state.
///
/// `finalize` consumes the state, so nothing can be absorbed after the
/// digest has been produced.
#[derive(Clone)]
pub struct Blake2s {
    h: [u32; 8],
    t: [u32; 2],
    f: [u32; 2],
    buf: [u8; BLAKE2S_BLOCK_LEN],
    buflen: usize,
    outlen: usize,
}

impl Blake2s {
    /// Start a hash producing `outlen` bytes, 1 to 32.
    pub fn new(outlen: usize) -> Result<Self> {
        ensure!(
            outlen > 0 && outlen <= BLAKE2S_HASH_LEN,
            InvalidHashLengthSnafu { len: outlen }
        );

        let mut h = BLAKE2S_IV;
        /* digest length, no key, fanout 1, depth 1 */
        h[0] ^= 0x0101_0000 | outlen as u32;

        Ok(Blake2s {
            h,
            t: [0; 2],
            f: [0; 2],
            buf: [0; BLAKE2S_BLOCK_LEN],
            buflen: 0,
            outlen,
        })
    }

    fn increment_counter(&mut self, inc: u32) {
        self.t[0] = self.t[0].wrapping_add(inc);
        self.t[1] = self.t[1].wrapping_add((self.t[0] < inc) as u32);
    }

    fn compress(&mut self, block: &[u8], inc: u32) {
        debug_assert_eq!(block.len(), BLAKE2S_BLOCK_LEN);
        self.increment_counter(inc);

        let mut m = [0u32; 16];
        for (word, bytes) in m.iter_mut().zip(block.chunks_exact(4)) {
            *word = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        }

        let mut v = [0u32; 16];
        v[..8].copy_from_slice(&self.h);
        v[8..12].copy_from_slice(&BLAKE2S_IV[..4]);
        v[12] = BLAKE2S_IV[4] ^ self.t[0];
        v[13] = BLAKE2S_IV[5] ^ self.t[1];
        v[14] = BLAKE2S_IV[6] ^ self.f[0];
        v[15] = BLAKE2S_IV[7] ^ self.f[1];

        for sigma in BLAKE2S_SIGMA.iter() {
            for (i, lanes) in G_LANES.iter().enumerate() {
                g(&mut v, *lanes, m[sigma[2 * i]], m[sigma[2 * i + 1]]);
            }
        }

        for i in 0..8 {
            self.h[i] ^= v[i] ^ v[i + 8];
        }
    }

    /// Absorb `input`.
    ///
    /// The last (possibly full) block always stays buffered, it must be
    /// compressed by `finalize` with the last-block flag set.
    pub fn update(&mut self, mut input: &[u8]) {
        if input.is_empty() {
            return;
        }

        let fill = BLAKE2S_BLOCK_LEN - self.buflen;
        if input.len() > fill {
            self.buf[self.buflen..].copy_from_slice(&input[..fill]);
            let block = self.buf;
            self.compress(&block, BLAKE2S_BLOCK_LEN as u32);
            self.buflen = 0;
            input = &input[fill..];
        }

        while input.len() > BLAKE2S_BLOCK_LEN {
            let (block, rest) = input.split_at(BLAKE2S_BLOCK_LEN);
            self.compress(block, BLAKE2S_BLOCK_LEN as u32);
            input = rest;
        }

        self.buf[self.buflen..self.buflen + input.len()].copy_from_slice(input);
        self.buflen += input.len();
    }

    /// Produce the digest into `out`, which should be `outlen` bytes long.
    /// Only `min(out.len(), outlen)` bytes are written.
    pub fn finalize_into(mut self, out: &mut [u8]) {
        self.f[0] = u32::MAX;
        self.buf[self.buflen..].fill(0);
        let block = self.buf;
        let inc = self.buflen as u32;
        self.compress(&block, inc);

        let mut digest = [0u8; BLAKE2S_HASH_LEN];
        for (bytes, word) in digest.chunks_exact_mut(4).zip(self.h.iter()) {
            bytes.copy_from_slice(&word.to_le_bytes());
        }

        let n = out.len().min(self.outlen);
        out[..n].copy_from_slice(&digest[..n]);
    }

    /// Produce the `outlen`-byte digest.
    pub fn finalize(self) -> Vec<u8> {
        let mut out = vec![0u8; self.outlen];
        self.finalize_into(&mut out);
        out
    }
}
