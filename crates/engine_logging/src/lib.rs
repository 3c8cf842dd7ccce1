#![deny(missing_docs)]
//! Shared logging utilities for the ToKindle workspace.
//!
//! This crate provides the `engine_*` logging macros used by the engine and
//! app crates, a helper that keeps mailbox addresses out of log files, and a
//! minimal test initializer for the global logger.

/// Logs a trace-level message using the global logging facade.
#[macro_export]
macro_rules! engine_trace {
    ($($arg:tt)*) => {{
        log::trace!($($arg)*);
    }};
}

/// Logs an info-level message using the global logging facade.
#[macro_export]
macro_rules! engine_info {
    ($($arg:tt)*) => {{
        log::info!($($arg)*);
    }};
}

/// Logs a debug-level message using the global logging facade.
#[macro_export]
macro_rules! engine_debug {
    ($($arg:tt)*) => {{
        log::debug!($($arg)*);
    }};
}

/// Logs a warn-level message using the global logging facade.
#[macro_export]
macro_rules! engine_warn {
    ($($arg:tt)*) => {{
        log::warn!($($arg)*);
    }};
}

/// Logs an error-level message using the global logging facade.
#[macro_export]
macro_rules! engine_error {
    ($($arg:tt)*) => {{
        log::error!($($arg)*);
    }};
}

/// Masks the local part of an e-mail address for logging.
///
/// `reader@example.com` becomes `r*****@example.com`. Input without an `@`
/// is masked entirely.
pub fn mask_address(address: &str) -> String {
    match address.split_once('@') {
        Some((local, domain)) => {
            let mut chars = local.chars();
            match chars.next() {
                Some(first) => {
                    let hidden = "*".repeat(chars.count());
                    format!("{first}{hidden}@{domain}")
                }
                None => format!("@{domain}"),
            }
        }
        None => "*".repeat(address.chars().count()),
    }
}

/// Initializes a simple terminal logger for use in tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

    // Use debug level in debug builds, info in release builds.
    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    // Ignore the error if a logger was already set by another test.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}

#[cfg(test)]
mod tests {
    use super::mask_address;

    #[test]
    fn masks_local_part_and_keeps_domain() {
        assert_eq!(mask_address("reader@example.com"), "r*****@example.com");
        assert_eq!(mask_address("a@kindle.com"), "a@kindle.com");
    }

    #[test]
    fn input_without_domain_is_fully_masked() {
        assert_eq!(mask_address("nobody"), "******");
        assert_eq!(mask_address("@host"), "@host");
    }
}
