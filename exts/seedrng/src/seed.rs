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

//! Seed lengths and the fixed-capacity new-seed buffer.
use crate::blake2s::BLAKE2S_HASH_LEN;

/// Largest seed read from or written to a seed file.
pub const MAX_SEED_LEN: usize = 512;
/// Smallest generated seed, one digest worth.
pub const MIN_SEED_LEN: usize = BLAKE2S_HASH_LEN;

/// Length of a generated seed, always within [MIN_SEED_LEN, MAX_SEED_LEN].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedLen(usize);

impl SeedLen {
    /// The minimum length, used when the pool size is unknown.
    pub const MIN: SeedLen = SeedLen(MIN_SEED_LEN);

    /// Clamp an arbitrary byte count into the allowed range.
    pub fn clamp(len: usize) -> SeedLen {
        SeedLen(len.clamp(MIN_SEED_LEN, MAX_SEED_LEN))
    }

    /// Seed length matching a kernel pool of `bits` bits, rounded up to whole
    /// bytes.
    pub fn from_pool_bits(bits: usize) -> SeedLen {
        let bytes = bits / 8 + usize::from(bits % 8 != 0);
        SeedLen::clamp(bytes)
    }

    ///
    pub fn get(self) -> usize {
        self.0
    }

    /// Length in bits, as reported to the user.
    pub fn bits(self) -> usize {
        self.0 * 8
    }
}

/// Buffer holding a freshly generated seed. Its trailing BLAKE2S_HASH_LEN
/// bytes are reserved for the mixing digest.
pub struct SeedBuf {
    buf: [u8; MAX_SEED_LEN],
    len: SeedLen,
}

impl SeedBuf {
    /// Zeroed buffer of `len` bytes.
    pub fn new(len: SeedLen) -> SeedBuf {
        SeedBuf {
            buf: [0; MAX_SEED_LEN],
            len,
        }
    }

    /// Buffer of MIN_SEED_LEN bytes holding `marker`, NUL padded or truncated.
    pub fn marker(marker: &[u8]) -> SeedBuf {
        let mut seed = SeedBuf::new(SeedLen::MIN);
        let n = marker.len().min(MIN_SEED_LEN);
        seed.buf[..n].copy_from_slice(&marker[..n]);
        seed
    }

    ///
    pub fn len(&self) -> SeedLen {
        self.len
    }

    ///
    pub fn as_slice(&self) -> &[u8] {
        &self.buf[..self.len.get()]
    }

    ///
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.buf[..self.len.get()]
    }

    /// The trailing bytes that receive the digest.
    pub fn digest_slot(&mut self) -> &mut [u8] {
        let end = self.len.get();
        &mut self.buf[end - BLAKE2S_HASH_LEN..end]
    }
}
