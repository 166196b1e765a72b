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

//! Fresh random bytes for the next seed.
use crate::error::*;
use crate::platform::{GetRandomFlags, Platform};
use nix::errno::Errno;
use snafu::ResultExt;

/// Call getrandom until `buf` is full. EINTR is retried, any other error is
/// returned as is.
fn getrandom_full<P: Platform + ?Sized>(
    platform: &P,
    buf: &mut [u8],
    flags: GetRandomFlags,
) -> nix::Result<()> {
    let mut pos = 0;
    while pos < buf.len() {
        match platform.getrandom(&mut buf[pos..], flags) {
            Ok(0) => return Err(Errno::EIO),
            Ok(n) => pos += n,
            Err(Errno::EINTR) => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// Fill `seed` with new random bytes and report whether they may be credited.
///
/// getrandom(GRND_NONBLOCK) succeeding means the kernel RNG is initialized
/// and the bytes are creditable. Without getrandom at all, readiness of
/// /dev/random decides creditability while the bytes come from /dev/urandom.
/// GRND_INSECURE bytes are never creditable. /dev/urandom is the last resort.
pub fn read_new_seed<P: Platform + ?Sized>(platform: &P, seed: &mut [u8]) -> Result<bool> {
    let mut creditable = false;

    match getrandom_full(platform, seed, GetRandomFlags::NonBlock) {
        Ok(()) => return Ok(true),
        Err(Errno::ENOSYS) => {
            log::debug!("getrandom() is not supported, polling /dev/random for readiness.");
            creditable = platform.random_ready().context(RandomSourceSnafu)?;
        }
        Err(e) => {
            log::debug!("getrandom(GRND_NONBLOCK) failed: {}, trying GRND_INSECURE.", e);
            match getrandom_full(platform, seed, GetRandomFlags::Insecure) {
                Ok(()) => return Ok(false),
                Err(e) => log::debug!(
                    "getrandom(GRND_INSECURE) failed: {}, falling back to /dev/urandom.",
                    e
                ),
            }
        }
    }

    platform.read_urandom(seed).context(RandomSourceSnafu)?;
    Ok(creditable)
}
