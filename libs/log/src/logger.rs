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

//!
use log::{Level, Log, Metadata, Record};
use std::{
    fs::{File, OpenOptions},
    io::Write,
    os::unix::net::UnixDatagram,
    sync::Mutex,
};

const SYSLOG_PATH: &str = "/dev/log";
const KMSG_PATH: &str = "/dev/kmsg";
/* LOG_DAEMON */
const FACILITY_DAEMON: u8 = 3 << 3;

/// syslog(3) severity of a log level
fn severity(level: Level) -> u8 {
    match level {
        Level::Error => 3,
        Level::Warn => 4,
        Level::Info => 6,
        Level::Debug | Level::Trace => 7,
    }
}

fn now_str() -> String {
    let time: libc::time_t = unsafe { libc::time(std::ptr::null_mut()) };
    let mut tm: libc::tm = unsafe { std::mem::zeroed() };
    if unsafe { libc::localtime_r(&time, &mut tm) }.is_null() {
        return String::new();
    }
    format!(
        "{:0>4}-{:0>2}-{:0>2} {:0>2}:{:0>2}:{:0>2}",
        tm.tm_year + 1900, /* tm_year is years since 1900 */
        tm.tm_mon + 1,     /* tm_mon is months since Jan: [0, 11] */
        tm.tm_mday,
        tm.tm_hour,
        tm.tm_min,
        tm.tm_sec
    )
}

fn write_msg_common(writer: &mut impl Write, module: &str, msg: &str) {
    let line = format!("{} {} {}\n", now_str(), module, msg);
    if let Err(e) = writer.write_all(line.as_bytes()) {
        eprintln!("Failed to log message: {}", e);
    }
}

/// Errors and warnings go to stderr, everything else to stdout.
struct ConsoleLogger;

impl Log for ConsoleLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        let module_path = record.module_path().unwrap_or("unknown");
        let msg = record.args().to_string();
        if record.level() <= Level::Warn {
            write_msg_common(&mut std::io::stderr(), module_path, &msg);
        } else {
            write_msg_common(&mut std::io::stdout(), module_path, &msg);
        }
    }

    fn flush(&self) {
        let _ = std::io::stdout().flush();
    }
}

/* This is an extremely simple implementation, and only
 * supports the very basic log function. */
struct SysLogger {
    ident: String,
    dgram: UnixDatagram,
}

impl SysLogger {
    fn new(ident: &str) -> Result<Self, std::io::Error> {
        let dgram = UnixDatagram::unbound()?;
        dgram.connect(SYSLOG_PATH)?;
        Ok(Self {
            ident: ident.to_string(),
            dgram,
        })
    }
}

impl Log for SysLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        let msg = format!(
            "<{}>{}[{}]: {}",
            FACILITY_DAEMON | severity(record.level()),
            self.ident,
            std::process::id(),
            record.args()
        );
        if let Err(e) = self.dgram.send(msg.as_bytes()) {
            eprintln!("Failed to send message to syslogger: {}", e);
        }
    }

    fn flush(&self) {}
}

/// Writes to the kernel ring buffer, usable before syslog is up.
struct KmsgLogger {
    ident: String,
    file: Mutex<File>,
}

impl KmsgLogger {
    fn new(ident: &str) -> Result<Self, std::io::Error> {
        Self::with_file(ident, OpenOptions::new().write(true).open(KMSG_PATH)?)
    }

    fn with_file(ident: &str, file: File) -> Result<Self, std::io::Error> {
        Ok(Self {
            ident: ident.to_string(),
            file: Mutex::new(file),
        })
    }
}

impl Log for KmsgLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        let msg = format!(
            "<{}>{}[{}]: {}\n",
            FACILITY_DAEMON | severity(record.level()),
            self.ident,
            std::process::id(),
            record.args()
        );
        let mut file = match self.file.lock() {
            Err(_) => return,
            Ok(v) => v,
        };
        if let Err(e) = file.write_all(msg.as_bytes()) {
            eprintln!("Failed to write message to kmsg: {}", e);
        }
    }

    fn flush(&self) {}
}

/// Collect different kinds of loggers together.
///
/// Include: SysLogger, ConsoleLogger, KmsgLogger
struct CombinedLogger {
    loggers: Vec<Box<dyn Log>>,
}

impl Log for CombinedLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        for logger in &self.loggers {
            logger.log(record);
        }
    }

    fn flush(&self) {
        for logger in &self.loggers {
            logger.flush();
        }
    }
}

fn make_logger(name: &str, target: &str) -> Option<Box<dyn Log>> {
    match target {
        "console" => Some(Box::new(ConsoleLogger)),
        "syslog" => match SysLogger::new(name) {
            Ok(logger) => Some(Box::new(logger)),
            Err(e) => {
                eprintln!("{} failed to create syslogger: {}", name, e);
                None
            }
        },
        "kmsg" => match KmsgLogger::new(name) {
            Ok(logger) => Some(Box::new(logger)),
            Err(e) => {
                eprintln!("{} failed to open {}: {}", name, KMSG_PATH, e);
                None
            }
        },
        _ => {
            eprintln!("{}: log target '{}' is strange, ignoring.", name, target);
            None
        }
    }
}

/// Initialize the global logger instance.
/// Available log `targets` include `console`, `syslog`, `kmsg`.
///
/// Repeated targets take effect only once. Targets that cannot be opened are
/// reported on stderr and skipped.
///
/// # Arguments
///
/// * `name` - The application name, used as syslog/kmsg identifier.
/// * `level` - Log message level.
/// * `targets` - A set of log targets.
pub fn init_log(name: &str, level: Level, targets: &[&str]) {
    let mut seen: Vec<&str> = Vec::new();
    let mut loggers: Vec<Box<dyn Log>> = Vec::new();
    for target in targets {
        if seen.contains(target) {
            continue;
        }
        seen.push(target);
        if let Some(logger) = make_logger(name, target) {
            loggers.push(logger);
        }
    }

    if loggers.is_empty() {
        eprintln!("{}: no available log targets.", name);
    }

    log::set_max_level(level.to_level_filter());
    if let Err(e) = log::set_boxed_logger(Box::new(CombinedLogger { loggers })) {
        eprintln!("{}: failed to set global logger: {}", name, e);
    }
}
