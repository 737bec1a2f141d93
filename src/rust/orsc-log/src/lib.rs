// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use std::sync::{atomic::AtomicBool, atomic::Ordering};

#[doc(hidden)]
pub use log as _log;

#[macro_export]
macro_rules! error {
    ($msg:literal, $($arg:tt)+) => {
        $crate::_log::error!(target: concat!("orsc::", module_path!()), $msg, $($arg)+);
    };
    ($msg:literal) => {
        $crate::_log::error!(target: concat!("orsc::", module_path!()), $msg);
    };
}

#[macro_export]
macro_rules! info {
    ($msg:literal, $($arg:tt)+) => {
        $crate::_log::info!(target: concat!("orsc::", module_path!()), $msg, $($arg)+);
    };
    ($msg:literal) => {
        $crate::_log::info!(target: concat!("orsc::", module_path!()), $msg);
    };
}

#[macro_export]
macro_rules! warn {
    ($msg:literal, $($arg:tt)+) => {
        $crate::_log::warn!(target: concat!("orsc::", module_path!()), $msg, $($arg)+);
    };
    ($msg:literal) => {
        $crate::_log::warn!(target: concat!("orsc::", module_path!()), $msg);
    };
}

#[macro_export]
macro_rules! debug {
    ($msg:literal, $($arg:tt)+) => {
        $crate::_log::debug!(target: concat!("orsc::", module_path!()), $msg, $($arg)+);
    };
    ($msg:literal) => {
        $crate::_log::debug!(target: concat!("orsc::", module_path!()), $msg);
    };
}

/// Log a diagnostic message at debug level if diagnostics logging is enabled.
#[macro_export]
macro_rules! diagnostic {
    ($msg:literal, $($arg:tt)+) => {
        if $crate::is_diagnostics_enabled() {
            $crate::_log::debug!(target: concat!("orsc::", module_path!()), $msg, $($arg)+);
        }
    };
    ($msg:literal) => {
        if $crate::is_diagnostics_enabled() {
            $crate::_log::debug!(target: concat!("orsc::", module_path!()), $msg);
        }
    };
}

static DIAGNOSTICS_ENABLED: AtomicBool = AtomicBool::new(false);

#[inline]
pub fn is_diagnostics_enabled() -> bool {
    DIAGNOSTICS_ENABLED.load(Ordering::Acquire)
}

/// Map the number of `-v` flags to a log level.
///
/// Warnings are always shown, `-v` adds info, `-vv` and above add debug.
pub fn level_from_verbosity(verbose: u8) -> log::LevelFilter {
    match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        _ => log::LevelFilter::Debug,
    }
}

/// Initialize the logging.
///
/// Meant to be called once at the start of the program. Installs `env_logger`
/// writing to stderr, so that reports on stdout stay machine readable.
/// `RUST_LOG` still overrides the level chosen from `verbose`.
/// Diagnostics are enabled from `-vv` on.
pub fn init_logging(verbose: u8) {
    env_logger::builder()
        .format_timestamp(None)
        .format_level(true)
        .format_target(false)
        .filter_level(level_from_verbosity(verbose))
        .parse_default_env()
        .init();
    DIAGNOSTICS_ENABLED.store(verbose >= 2, Ordering::Release);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_from_verbosity() {
        assert_eq!(level_from_verbosity(0), log::LevelFilter::Warn);
        assert_eq!(level_from_verbosity(1), log::LevelFilter::Info);
        assert_eq!(level_from_verbosity(2), log::LevelFilter::Debug);
        assert_eq!(level_from_verbosity(7), log::LevelFilter::Debug);
    }

    #[test]
    fn test_diagnostics_disabled_by_default() {
        assert!(!is_diagnostics_enabled());
    }
}
