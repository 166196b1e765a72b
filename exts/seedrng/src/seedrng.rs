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

//! One seeding pass: feed the old seeds to the kernel, then store a new seed
//! that hashes together everything seen so far.
use crate::blake2s::{Blake2s, BLAKE2S_HASH_LEN};
use crate::config::{Config, CREDITABLE_SEED, NON_CREDITABLE_SEED};
use crate::entropy::read_new_seed;
use crate::error::*;
use crate::platform::{Clock, Platform};
use crate::seed::{SeedBuf, SeedLen};
use crate::seed_store::SeedDir;
use bitflags::bitflags;
use snafu::ResultExt;

const SEEDRNG_PREFIX: &[u8] = b"SeedRNG v1 Old+New Prefix";
const SEEDRNG_FAILURE: &[u8] = b"SeedRNG v1 No New Seed Failure";

bitflags! {
    /// Failures collected during a pass. The bits are the exit status.
    pub struct RunStatus: u8 {
        /// not root, or the seed directory could not be locked
        const FATAL = 1 << 0;
        /// seeding from seed.no-credit failed
        const NON_CREDITABLE_SEED = 1 << 1;
        /// seeding from seed.credit failed
        const CREDITABLE_SEED = 1 << 2;
        /// no new random seed could be read
        const NEW_SEED = 1 << 3;
        /// the new seed file could not be opened
        const OPEN_FOR_WRITE = 1 << 4;
        /// the new seed file could not be written
        const WRITE = 1 << 5;
        /// the new seed file could not be made creditable
        const PROMOTE = 1 << 6;
    }
}

/// Hash state primed with the domain prefix and both clocks.
fn start_hash<P: Platform + ?Sized>(platform: &P) -> Result<Blake2s> {
    let mut hash = Blake2s::new(BLAKE2S_HASH_LEN)?;
    hash.update(SEEDRNG_PREFIX);
    hash.update(&platform.clock_snapshot(Clock::Realtime));
    hash.update(&platform.clock_snapshot(Clock::Boottime));
    Ok(hash)
}

fn seed_from_file_if_exists<P: Platform + ?Sized>(
    platform: &P,
    dir: &SeedDir,
    name: &'static str,
    credit: bool,
    hash: &mut Blake2s,
) -> Result<()> {
    let seed = match dir.consume_if_present(name)? {
        Some(seed) => seed,
        None => return Ok(()),
    };

    hash.update(&seed.len().to_ne_bytes());
    hash.update(&seed);

    log::info!(
        "Seeding {} bits {} crediting",
        seed.len() * 8,
        if credit { "and" } else { "without" }
    );
    platform
        .add_entropy(&seed, credit)
        .context(SeedKernelSnafu)
}

fn optimal_seed_len<P: Platform + ?Sized>(platform: &P) -> SeedLen {
    match platform.pool_size_bits().context(PoolSizeSnafu) {
        Ok(bits) => SeedLen::from_pool_bits(bits),
        Err(e) => {
            log::warn!("{}, falling back to {} bits", e, SeedLen::MIN.bits());
            SeedLen::MIN
        }
    }
}

/// New seed of the optimal length, or the failure marker if no random bytes
/// could be had. The flag tells whether the seed is creditable.
fn new_seed<P: Platform + ?Sized>(platform: &P, status: &mut RunStatus) -> (SeedBuf, bool) {
    let mut seed = SeedBuf::new(optimal_seed_len(platform));
    match read_new_seed(platform, seed.as_mut_slice()) {
        Ok(creditable) => (seed, creditable),
        Err(e) => {
            log::error!("{}", e);
            *status |= RunStatus::NEW_SEED;
            (SeedBuf::marker(SEEDRNG_FAILURE), false)
        }
    }
}

/// Run a full seeding pass against `platform`, using the directory and the
/// credit policy of `config`.
pub fn run<P: Platform + ?Sized>(config: &Config, platform: &P) -> RunStatus {
    if !platform.is_privileged() {
        log::error!("This program requires root");
        return RunStatus::FATAL;
    }

    let mut hash = match start_hash(platform) {
        Ok(hash) => hash,
        Err(e) => {
            log::error!("{}", e);
            return RunStatus::FATAL;
        }
    };

    let dir = match SeedDir::open_locked(&config.seed_dir) {
        Ok(dir) => dir,
        Err(e) => {
            log::error!("{}", e);
            return RunStatus::FATAL;
        }
    };

    let mut status = RunStatus::empty();

    if let Err(e) =
        seed_from_file_if_exists(platform, &dir, NON_CREDITABLE_SEED, false, &mut hash)
    {
        log::error!("{}", e);
        status |= RunStatus::NON_CREDITABLE_SEED;
    }

    if config.skip_credit {
        log::debug!("Crediting is disabled, seeding without credit.");
    }
    if let Err(e) = seed_from_file_if_exists(
        platform,
        &dir,
        CREDITABLE_SEED,
        !config.skip_credit,
        &mut hash,
    ) {
        log::error!("{}", e);
        status |= RunStatus::CREDITABLE_SEED;
    }

    let (mut seed, creditable) = new_seed(platform, &mut status);
    hash.update(&seed.len().get().to_ne_bytes());
    hash.update(seed.as_slice());
    hash.finalize_into(seed.digest_slot());

    log::info!(
        "Saving {} bits of {} seed for next boot",
        seed.len().bits(),
        if creditable {
            "creditable"
        } else {
            "non-creditable"
        }
    );

    match dir.persist(NON_CREDITABLE_SEED, seed.as_slice()) {
        Ok(()) => {
            if creditable {
                if let Err(e) = dir.promote(NON_CREDITABLE_SEED, CREDITABLE_SEED) {
                    log::error!("{}", e);
                    status |= RunStatus::PROMOTE;
                }
            }
        }
        Err(e) => {
            log::error!("{}", e);
            status |= match e {
                Error::OpenForWrite { .. } => RunStatus::OPEN_FOR_WRITE,
                _ => RunStatus::WRITE,
            };
        }
    }

    status
}
