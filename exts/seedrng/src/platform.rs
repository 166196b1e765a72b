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

//! Kernel facing operations needed by a seeding pass.
//!
//! Everything that talks to the kernel RNG, the clocks or the credentials of
//! the process goes through [`Platform`], so the seeding logic can be driven
//! by a scripted implementation in tests.
use crate::seed::MAX_SEED_LEN;
use basic::error::*;
use nix::{ioctl_write_ptr_bad, request_code_write};
use std::path::Path;

/// Size of a clock snapshot: seconds and nanoseconds as native-endian i64.
pub const CLOCK_SNAPSHOT_LEN: usize = 16;

/// Clocks mixed into the seed hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clock {
    /// wall clock time
    Realtime,
    /// monotonic time including suspend
    Boottime,
}

/// getrandom(2) modes used by the entropy adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GetRandomFlags {
    /// GRND_NONBLOCK: fail with EAGAIN until the RNG is initialized
    NonBlock,
    /// GRND_INSECURE: never block, may return data from an unseeded RNG
    Insecure,
}

/// Entropy credit in bits for a submission of `len` bytes. Either nothing or
/// the whole buffer is credited.
pub fn credit_bits(len: usize, credit: bool) -> i32 {
    if credit {
        (len * 8) as i32
    } else {
        0
    }
}

/// Parse the pool size like strtoul(3): leading blanks are skipped and
/// parsing stops at the first non digit. No digits yield 0.
pub fn parse_pool_size(s: &str) -> usize {
    s.trim_start()
        .bytes()
        .take_while(|b| b.is_ascii_digit())
        .fold(0usize, |acc, b| {
            acc.saturating_mul(10).saturating_add((b - b'0') as usize)
        })
}

/// Operations the seeding pass needs from the operating system.
pub trait Platform {
    /// Whether the process runs with root credentials.
    fn is_privileged(&self) -> bool;

    /// Snapshot of the given clock. A clock that cannot be read yields zeroes.
    fn clock_snapshot(&self, clock: Clock) -> [u8; CLOCK_SNAPSHOT_LEN];

    /// Size of the kernel entropy pool in bits.
    fn pool_size_bits(&self) -> Result<usize>;

    /// A single getrandom(2) call filling at most `buf.len()` bytes.
    fn getrandom(&self, buf: &mut [u8], flags: GetRandomFlags) -> nix::Result<usize>;

    /// Whether /dev/random would hand out data right now, without blocking.
    fn random_ready(&self) -> Result<bool>;

    /// Fill all of `buf` from /dev/urandom. Running short is an error.
    fn read_urandom(&self, buf: &mut [u8]) -> Result<()>;

    /// Mix `seed` into the kernel RNG, crediting it fully or not at all.
    fn add_entropy(&self, seed: &[u8], credit: bool) -> Result<()>;
}

const POOL_SIZE_PATH: &str = "/proc/sys/kernel/random/poolsize";
const DEV_RANDOM: &str = "/dev/random";
const DEV_URANDOM: &str = "/dev/urandom";

/// Layout expected by RNDADDENTROPY: the header is two ints followed by the
/// payload.
#[repr(C)]
pub struct RandPoolInfo {
    entropy_count: libc::c_int,
    buf_size: libc::c_int,
    buf: [u8; MAX_SEED_LEN],
}

/* RNDADDENTROPY is declared as _IOW('R', 0x03, int[2]): the encoded size
 * covers only the header, not the variable length payload. */
ioctl_write_ptr_bad!(
    rndaddentropy,
    request_code_write!(b'R', 0x03, std::mem::size_of::<[libc::c_int; 2]>()),
    RandPoolInfo
);

/// The Linux implementation.
#[derive(Debug, Default)]
pub struct LinuxPlatform;

impl Platform for LinuxPlatform {
    fn is_privileged(&self) -> bool {
        nix::unistd::getuid().is_root()
    }

    fn clock_snapshot(&self, clock: Clock) -> [u8; CLOCK_SNAPSHOT_LEN] {
        use nix::time::{clock_gettime, ClockId};

        let id = match clock {
            Clock::Realtime => ClockId::CLOCK_REALTIME,
            Clock::Boottime => ClockId::CLOCK_BOOTTIME,
        };
        let mut snapshot = [0u8; CLOCK_SNAPSHOT_LEN];
        match clock_gettime(id) {
            Ok(ts) => {
                snapshot[..8].copy_from_slice(&(ts.tv_sec() as i64).to_ne_bytes());
                snapshot[8..].copy_from_slice(&(ts.tv_nsec() as i64).to_ne_bytes());
            }
            Err(e) => log::debug!("Failed to read {:?} clock: {}", clock, e),
        }
        snapshot
    }

    fn pool_size_bits(&self) -> Result<usize> {
        let line = basic::fs::read_first_line(Path::new(POOL_SIZE_PATH))?;
        Ok(parse_pool_size(&line))
    }

    fn getrandom(&self, buf: &mut [u8], flags: GetRandomFlags) -> nix::Result<usize> {
        let flags = match flags {
            GetRandomFlags::NonBlock => libc::GRND_NONBLOCK,
            GetRandomFlags::Insecure => libc::GRND_INSECURE,
        };
        let ret =
            unsafe { libc::getrandom(buf.as_mut_ptr() as *mut libc::c_void, buf.len(), flags) };
        if ret < 0 {
            return Err(nix::errno::Errno::last());
        }
        Ok(ret as usize)
    }

    fn random_ready(&self) -> Result<bool> {
        use nix::poll::{poll, PollFd, PollFlags};
        use std::os::unix::prelude::AsRawFd;

        let file = std::fs::File::open(DEV_RANDOM).context(IoSnafu)?;
        let mut fds = [PollFd::new(file.as_raw_fd(), PollFlags::POLLIN)];
        Ok(matches!(poll(&mut fds, 0), Ok(1)))
    }

    fn read_urandom(&self, buf: &mut [u8]) -> Result<()> {
        let mut file = std::fs::File::open(DEV_URANDOM).context(IoSnafu)?;
        basic::io::loop_read_exact(&mut file, buf)
    }

    fn add_entropy(&self, seed: &[u8], credit: bool) -> Result<()> {
        use std::os::unix::prelude::AsRawFd;

        if seed.len() > MAX_SEED_LEN {
            return Err(Error::Nix {
                source: nix::errno::Errno::EFBIG,
            });
        }

        let mut req = RandPoolInfo {
            entropy_count: credit_bits(seed.len(), credit),
            buf_size: seed.len() as libc::c_int,
            buf: [0; MAX_SEED_LEN],
        };
        req.buf[..seed.len()].copy_from_slice(seed);

        let file = std::fs::File::open(DEV_URANDOM).context(IoSnafu)?;
        unsafe { rndaddentropy(file.as_raw_fd(), &req) }.context(NixSnafu)?;
        Ok(())
    }
}


#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn credit_bits_test() {
        assert_eq!(credit_bits(64, true), 512);
        assert_eq!(credit_bits(512, true), 4096);
        assert_eq!(credit_bits(64, false), 0);
    }

    #[test]
    fn parse_pool_size_test() {
        assert_eq!(parse_pool_size("256\n"), 256);
        assert_eq!(parse_pool_size("  4096"), 4096);
        assert_eq!(parse_pool_size("4096 bits"), 4096);
        assert_eq!(parse_pool_size("garbage"), 0);
        assert_eq!(parse_pool_size(""), 0);
        assert_eq!(
            parse_pool_size("99999999999999999999999999999"),
            usize::MAX
        );
    }

    #[test]
    fn clock_snapshot_test() {
        let platform = LinuxPlatform;
        let a = platform.clock_snapshot(Clock::Boottime);
        let b = platform.clock_snapshot(Clock::Boottime);
        let secs = |s: &[u8; CLOCK_SNAPSHOT_LEN]| {
            i64::from_ne_bytes([s[0], s[1], s[2], s[3], s[4], s[5], s[6], s[7]])
        };
        assert!(secs(&b) >= secs(&a));
        assert_ne!(platform.clock_snapshot(Clock::Realtime), [0u8; 16]);
    }

    #[test]
    fn linux_random_test() {
        let platform = LinuxPlatform;
        let mut buf = [0u8; 64];
        match platform.getrandom(&mut buf, GetRandomFlags::NonBlock) {
            Ok(n) => assert!(n > 0 && n <= 64),
            Err(e) => assert!(matches!(e, nix::errno::Errno::EAGAIN | nix::errno::Errno::ENOSYS)),
        }
        buf.fill(0);
        platform.read_urandom(&mut buf).unwrap();
        assert_ne!(buf, [0u8; 64]);
        assert!(platform.pool_size_bits().unwrap() > 0);
    }

    #[test]
    fn add_entropy_too_big_test() {
        let platform = LinuxPlatform;
        let seed = [0u8; MAX_SEED_LEN + 1];
        assert!(matches!(
            platform.add_entropy(&seed, false),
            Err(Error::Nix {
                source: nix::errno::Errno::EFBIG
            })
        ));
    }
}
