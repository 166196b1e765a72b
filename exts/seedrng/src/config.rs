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

//! Run settings taken from the environment.
use std::path::{Path, PathBuf};

/// Seed that may be credited when it is fed back to the kernel.
pub const CREDITABLE_SEED: &str = "seed.credit";
/// Seed that is fed back to the kernel without credit.
pub const NON_CREDITABLE_SEED: &str = "seed.no-credit";

const LOCALSTATEDIR: &str = match option_env!("SEEDRNG_LOCALSTATEDIR") {
    Some(dir) => dir,
    None => "/var/lib",
};

const ENV_SKIP_CREDIT: &str = "SEEDRNG_SKIP_CREDIT";
const ENV_LOG_LEVEL: &str = "SEEDRNG_LOG_LEVEL";
const ENV_LOG_TARGET: &str = "SEEDRNG_LOG_TARGET";

/// Settings of one seeding pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// directory holding the seed files
    pub seed_dir: PathBuf,
    /// never credit entropy to the kernel
    pub skip_credit: bool,
    pub log_level: log::Level,
    pub log_targets: Vec<String>,
}

/// Only an explicit yes disables crediting, anything else keeps it.
fn parse_skip_credit(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "y"
    )
}

impl Config {
    /// Settings from the process environment.
    pub fn from_env() -> Config {
        Config::from_vars(|key| std::env::var(key).ok())
    }

    /// Settings from an arbitrary variable lookup.
    pub fn from_vars<F>(lookup: F) -> Config
    where
        F: Fn(&str) -> Option<String>,
    {
        let skip_credit = lookup(ENV_SKIP_CREDIT)
            .map(|v| parse_skip_credit(&v))
            .unwrap_or(false);

        let log_level = lookup(ENV_LOG_LEVEL)
            .and_then(|v| v.trim().parse::<log::Level>().ok())
            .unwrap_or(log::Level::Info);

        let log_targets = lookup(ENV_LOG_TARGET)
            .map(|v| {
                v.split(',')
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty())
                    .collect::<Vec<String>>()
            })
            .filter(|targets| !targets.is_empty())
            .unwrap_or_else(|| vec!["console".to_string()]);

        Config {
            seed_dir: Path::new(LOCALSTATEDIR).join("seedrng"),
            skip_credit,
            log_level,
            log_targets,
        }
    }

    /// Same settings, different seed directory.
    pub fn with_seed_dir(mut self, seed_dir: &Path) -> Config {
        self.seed_dir = seed_dir.to_path_buf();
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::from_vars(|_| None)
    }
}
