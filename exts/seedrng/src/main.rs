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

//! # seedrng
//!
//! Seed the kernel random number generator from seed files kept across
//! boots, and leave a fresh seed behind for the next boot.

use nix::sys::stat::{umask, Mode};
use std::process;

mod blake2s;
mod config;
mod entropy;
mod error;
mod platform;
mod seed;
mod seed_store;
mod seedrng;

use crate::config::Config;
use crate::platform::LinuxPlatform;

fn main() {
    umask(Mode::from_bits_truncate(0o077));

    let config = Config::from_env();
    let targets: Vec<&str> = config.log_targets.iter().map(String::as_str).collect();
    log::init_log("seedrng", config.log_level, &targets);

    let status = seedrng::run(&config, &LinuxPlatform);
    process::exit(status.bits() as i32);
}
