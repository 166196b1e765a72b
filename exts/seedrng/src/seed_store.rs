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

//! The locked seed directory.
use crate::error::*;
use crate::seed::MAX_SEED_LEN;
use basic::io::{loop_read, loop_write};
use nix::{
    errno::Errno,
    fcntl::{flock, renameat, FlockArg, OFlag},
    unistd::{unlinkat, UnlinkatFlags},
};
use snafu::ResultExt;
use std::fs::File;
use std::os::unix::prelude::AsRawFd;
use std::path::Path;

const SEED_DIR_MODE: u32 = 0o700;
const SEED_FILE_MODE: u32 = 0o400;

/// Seed directory held under an exclusive flock(2) for the lifetime of the
/// value. Dropping it closes the descriptor, which releases the lock.
#[derive(Debug)]
pub struct SeedDir {
    dir: File,
}

impl SeedDir {
    /// Create the directory if needed, open it and wait for the lock.
    pub fn open_locked(path: &Path) -> Result<SeedDir> {
        basic::fs::mkdir_exist_ok(path, SEED_DIR_MODE).context(CreateDirSnafu { path })?;

        let dir = basic::fs::open_directory(path).context(LockDirSnafu { path })?;
        flock(dir.as_raw_fd(), FlockArg::LockExclusive)
            .context(basic::NixSnafu)
            .context(LockDirSnafu { path })?;

        log::debug!("Locked seed directory {}", path.display());
        Ok(SeedDir { dir })
    }

    /// Read the seed file `name` and remove it.
    ///
    /// A missing or empty file yields `None`. The file is unlinked and the
    /// directory synced before the content is handed out, so the same seed is
    /// never used twice; if that fails for a non-empty seed, the seed is
    /// withheld.
    pub fn consume_if_present(&self, name: &'static str) -> Result<Option<Vec<u8>>> {
        let mut file = match basic::fs::open_at(&self.dir, name, OFlag::O_RDONLY, 0) {
            Ok(file) => file,
            Err(basic::Error::Nix {
                source: Errno::ENOENT,
            }) => return Ok(None),
            Err(e) => return Err(e).context(OpenSeedSnafu { name }),
        };

        let mut seed = vec![0u8; MAX_SEED_LEN];
        let len = loop_read(&mut file, &mut seed).context(ReadSeedSnafu { name })?;
        seed.truncate(len);
        drop(file);

        let removed = unlinkat(Some(self.dir.as_raw_fd()), name, UnlinkatFlags::NoRemoveDir)
            .context(basic::NixSnafu)
            .and_then(|_| self.dir.sync_all().context(basic::IoSnafu));
        if let Err(e) = removed {
            if len > 0 {
                return Err(e).context(RemoveSeedSnafu { name });
            }
            log::debug!("Failed to remove empty seed file {}: {}", name, e);
        }

        if seed.is_empty() {
            log::debug!("Seed file {} is empty, ignoring.", name);
            return Ok(None);
        }
        Ok(Some(seed))
    }

    /// Write `seed` to `name` with owner read-only permissions and flush it to
    /// stable storage.
    pub fn persist(&self, name: &'static str, seed: &[u8]) -> Result<()> {
        let mut file = basic::fs::open_at(
            &self.dir,
            name,
            OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_TRUNC,
            SEED_FILE_MODE,
        )
        .context(OpenForWriteSnafu { name })?;

        loop_write(&mut file, seed).context(WriteSeedSnafu { name })?;
        file.sync_all()
            .context(basic::IoSnafu)
            .context(WriteSeedSnafu { name })?;
        Ok(())
    }

    /// Atomically rename `from` to `to` inside the directory.
    pub fn promote(&self, from: &str, to: &str) -> Result<()> {
        let fd = self.dir.as_raw_fd();
        renameat(Some(fd), from, Some(fd), to).context(PromoteSnafu)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::platform::fake::{dev_full_writable, is_root};
    use std::fs::Permissions;
    use std::os::unix::prelude::PermissionsExt;

    #[test]
    fn absent_seed_test() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = SeedDir::open_locked(tmp.path()).unwrap();
        assert!(dir.consume_if_present("seed.credit").unwrap().is_none());
    }

    #[test]
    fn consume_once_test() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("seed.no-credit");
        std::fs::write(&path, [9u8; 64]).unwrap();

        let dir = SeedDir::open_locked(tmp.path()).unwrap();
        assert_eq!(
            dir.consume_if_present("seed.no-credit").unwrap(),
            Some(vec![9u8; 64])
        );
        assert!(!path.exists());
        assert!(dir.consume_if_present("seed.no-credit").unwrap().is_none());
    }

    #[test]
    fn empty_seed_test() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("seed.credit");
        std::fs::write(&path, b"").unwrap();

        let dir = SeedDir::open_locked(tmp.path()).unwrap();
        assert!(dir.consume_if_present("seed.credit").unwrap().is_none());
        assert!(!path.exists());
    }

    #[test]
    fn oversized_seed_test() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("seed.credit"), vec![1u8; 600]).unwrap();

        let dir = SeedDir::open_locked(tmp.path()).unwrap();
        let seed = dir.consume_if_present("seed.credit").unwrap().unwrap();
        assert_eq!(seed.len(), MAX_SEED_LEN);
        assert!(!tmp.path().join("seed.credit").exists());
    }

    #[test]
    fn unreadable_seed_test() {
        let tmp = tempfile::tempdir().unwrap();
        /* a directory opens fine but fails with EISDIR on read */
        std::fs::create_dir(tmp.path().join("seed.credit")).unwrap();

        let dir = SeedDir::open_locked(tmp.path()).unwrap();
        assert!(matches!(
            dir.consume_if_present("seed.credit"),
            Err(Error::ReadSeed {
                name: "seed.credit",
                ..
            })
        ));
    }

    #[test]
    fn remove_failure_withholds_seed_test() {
        if is_root() {
            return;
        }
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("seed.credit");
        std::fs::write(&path, [5u8; 64]).unwrap();

        let dir = SeedDir::open_locked(tmp.path()).unwrap();
        std::fs::set_permissions(tmp.path(), Permissions::from_mode(0o500)).unwrap();
        let ret = dir.consume_if_present("seed.credit");
        std::fs::set_permissions(tmp.path(), Permissions::from_mode(0o700)).unwrap();

        assert!(matches!(
            ret,
            Err(Error::RemoveSeed {
                name: "seed.credit",
                source: basic::Error::Nix {
                    source: Errno::EACCES
                },
            })
        ));
        assert_eq!(std::fs::read(&path).unwrap(), vec![5u8; 64]);
    }

    #[test]
    fn remove_failure_of_empty_seed_test() {
        if is_root() {
            return;
        }
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("seed.credit");
        std::fs::write(&path, b"").unwrap();

        let dir = SeedDir::open_locked(tmp.path()).unwrap();
        std::fs::set_permissions(tmp.path(), Permissions::from_mode(0o500)).unwrap();
        let ret = dir.consume_if_present("seed.credit");
        std::fs::set_permissions(tmp.path(), Permissions::from_mode(0o700)).unwrap();

        assert!(ret.unwrap().is_none());
        assert!(path.exists());
    }

    #[test]
    fn persist_write_failure_test() {
        if !dev_full_writable() {
            return;
        }
        let tmp = tempfile::tempdir().unwrap();
        std::os::unix::fs::symlink("/dev/full", tmp.path().join("seed.no-credit")).unwrap();

        let dir = SeedDir::open_locked(tmp.path()).unwrap();
        assert!(matches!(
            dir.persist("seed.no-credit", &[0u8; 32]),
            Err(Error::WriteSeed {
                name: "seed.no-credit",
                ..
            })
        ));
    }

    #[test]
    fn persist_and_promote_test() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = SeedDir::open_locked(tmp.path()).unwrap();

        dir.persist("seed.no-credit", &[3u8; 32]).unwrap();
        let path = tmp.path().join("seed.no-credit");
        assert_eq!(std::fs::read(&path).unwrap(), vec![3u8; 32]);
        assert_eq!(
            std::fs::metadata(&path).unwrap().permissions().mode() & 0o777,
            SEED_FILE_MODE
        );

        dir.promote("seed.no-credit", "seed.credit").unwrap();
        assert!(!path.exists());
        assert_eq!(
            std::fs::read(tmp.path().join("seed.credit")).unwrap(),
            vec![3u8; 32]
        );

        assert!(matches!(
            dir.promote("seed.no-credit", "seed.credit"),
            Err(Error::Promote {
                source: Errno::ENOENT
            })
        ));
    }

    #[test]
    fn persist_into_directory_fails_test() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir(tmp.path().join("seed.no-credit")).unwrap();
        let dir = SeedDir::open_locked(tmp.path()).unwrap();
        assert!(matches!(
            dir.persist("seed.no-credit", &[0u8; 32]),
            Err(Error::OpenForWrite { .. })
        ));
    }

    #[test]
    fn create_dir_test() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("seedrng");
        let dir = SeedDir::open_locked(&path).unwrap();
        assert!(path.is_dir());
        assert_eq!(
            std::fs::metadata(&path).unwrap().permissions().mode() & 0o777,
            SEED_DIR_MODE
        );
        drop(dir);

        assert!(matches!(
            SeedDir::open_locked(&tmp.path().join("a/b")),
            Err(Error::CreateDir { .. })
        ));
    }

    #[test]
    fn not_a_directory_test() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(matches!(
            SeedDir::open_locked(file.path()),
            Err(Error::LockDir { .. })
        ));
    }

    #[test]
    fn exclusive_lock_test() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = SeedDir::open_locked(tmp.path()).unwrap();

        let other = basic::fs::open_directory(tmp.path()).unwrap();
        assert!(flock(other.as_raw_fd(), FlockArg::LockExclusiveNonblock).is_err());

        drop(dir);
        flock(other.as_raw_fd(), FlockArg::LockExclusiveNonblock).unwrap();
    }
}
