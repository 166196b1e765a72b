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

//! error definitions
use snafu::prelude::*;
use std::path::PathBuf;

#[allow(missing_docs)]
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("Invalid BLAKE2s output length: {}", len))]
    InvalidHashLength { len: usize },

    #[snafu(display("Unable to create seed directory {}: {}", path.display(), source))]
    CreateDir {
        path: PathBuf,
        source: basic::Error,
    },

    #[snafu(display("Unable to lock seed directory {}: {}", path.display(), source))]
    LockDir {
        path: PathBuf,
        source: basic::Error,
    },

    #[snafu(display("Unable to open seed file {}: {}", name, source))]
    OpenSeed {
        name: &'static str,
        source: basic::Error,
    },

    #[snafu(display("Unable to read seed file {}: {}", name, source))]
    ReadSeed {
        name: &'static str,
        source: basic::Error,
    },

    #[snafu(display(
        "Unable to remove seed {} after reading, so not seeding: {}",
        name,
        source
    ))]
    RemoveSeed {
        name: &'static str,
        source: basic::Error,
    },

    #[snafu(display("Unable to seed: {}", source))]
    SeedKernel { source: basic::Error },

    #[snafu(display("Unable to read new seed: {}", source))]
    RandomSource { source: basic::Error },

    #[snafu(display("Unable to determine pool size: {}", source))]
    PoolSize { source: basic::Error },

    #[snafu(display("Unable to open seed file {} for writing: {}", name, source))]
    OpenForWrite {
        name: &'static str,
        source: basic::Error,
    },

    #[snafu(display("Unable to write seed file {}: {}", name, source))]
    WriteSeed {
        name: &'static str,
        source: basic::Error,
    },

    #[snafu(display("Unable to make new seed creditable: {}", source))]
    Promote { source: nix::Error },
}

///
pub type Result<T, E = Error> = std::result::Result<T, E>;
