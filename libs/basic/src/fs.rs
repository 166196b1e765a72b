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

//! the utils of the file and directory operation
use crate::error::*;
use nix::{
    errno::Errno,
    fcntl::{open, openat, OFlag},
    sys::stat::Mode,
    unistd::mkdir,
};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::os::unix::prelude::{AsRawFd, FromRawFd};
use std::path::Path;

/// read first line from a file
pub fn read_first_line(path: &Path) -> Result<String> {
    let file = File::open(path).context(IoSnafu)?;
    let mut buffer = BufReader::new(file);
    let mut first_line = String::with_capacity(64);
    buffer.read_line(&mut first_line).context(IoSnafu)?;
    Ok(first_line)
}

/// Create the directory with the given mode. An already existing directory
/// is left untouched.
pub fn mkdir_exist_ok(path: &Path, mode: u32) -> Result<()> {
    match mkdir(path, Mode::from_bits_truncate(mode)) {
        Ok(()) | Err(Errno::EEXIST) => Ok(()),
        Err(e) => Err(Error::Nix { source: e }),
    }
}

/// open a directory read-only, suitable for *at() calls, fsync and flock
pub fn open_directory(path: &Path) -> Result<File> {
    let fd = open(
        path,
        OFlag::O_DIRECTORY | OFlag::O_RDONLY | OFlag::O_CLOEXEC,
        Mode::empty(),
    )
    .context(NixSnafu)?;

    Ok(unsafe { File::from_raw_fd(fd) })
}

/// open the file `name` relative to the directory `dir`
pub fn open_at(dir: &File, name: &str, flags: OFlag, mode: u32) -> Result<File> {
    let fd = openat(
        dir.as_raw_fd(),
        name,
        flags | OFlag::O_CLOEXEC,
        Mode::from_bits_truncate(mode),
    )
    .context(NixSnafu)?;

    Ok(unsafe { File::from_raw_fd(fd) })
}
