//! stderr logging for the CLI

use std::io::Write;

use chrono::Local;
use env_logger::Builder;
use log::LevelFilter;

/// Environment variable holding env_logger filter directives
pub const LOG_ENV: &str = "CCW_LOG";

/// Initialize logging to stderr
///
/// `CCW_LOG` wins when set; otherwise ccw's own modules log at debug with
/// `--verbose`, and everything else stays at warn.
pub fn init_logging(verbose: bool, quiet: bool) {
    let mut builder = Builder::new();

    match std::env::var(LOG_ENV) {
        Ok(filters) if !filters.is_empty() => {
            builder.parse_filters(&filters);
        }
        _ => {
            builder.filter_level(default_level(verbose, quiet));
            if verbose {
                builder.filter_module("ccw", LevelFilter::Debug);
                builder.filter_module("ccw_core", LevelFilter::Debug);
            }
        }
    }

    builder.format(|buf, record| {
        writeln!(
            buf,
            "[{} {} {}] {}",
            Local::now().format("%H:%M:%S%.3f"),
            record.level(),
            record.target(),
            record.args()
        )
    });
    builder.target(env_logger::Target::Stderr);

    // A second init (tests) is harmless
    let _ = builder.try_init();
}

fn default_level(verbose: bool, quiet: bool) -> LevelFilter {
    if quiet {
        LevelFilter::Error
    } else if verbose {
        LevelFilter::Info
    } else {
        LevelFilter::Warn
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_level() {
        assert_eq!(default_level(false, false), LevelFilter::Warn);
        assert_eq!(default_level(true, false), LevelFilter::Info);
        assert_eq!(default_level(false, true), LevelFilter::Error);
        assert_eq!(default_level(true, true), LevelFilter::Error);
    }
}
