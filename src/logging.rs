use std::path::Path;
use std::sync::Mutex;

use color_eyre::Result;
use lazy_static::lazy_static;
use tracing::level_filters::LevelFilter;
use tracing_error::ErrorLayer;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config;

lazy_static! {
    pub static ref LOG_ENV: String = format!("{}_LOG_LEVEL", config::PROJECT_NAME.clone());
    pub static ref LOG_FILE: String = format!("{}.log", env!("CARGO_PKG_NAME"));
}

/// mpv shows whatever a script's child process prints, so everything goes to stdout. With a data
/// directory, the same events are also written to a log file in it.
pub fn init(data_dir: Option<&Path>) -> Result<()> {
    let env_filter = EnvFilter::builder().with_default_directive(LevelFilter::INFO.into());
    // If the `RUST_LOG` environment variable is set, use that as the default, otherwise use the
    // value of the `LOG_ENV` environment variable. If the `LOG_ENV` environment variable contains
    // errors, then this will return an error.
    let env_filter = env_filter
        .try_from_env()
        .or_else(|_| env_filter.with_env_var(LOG_ENV.clone()).from_env())?;

    let stdout_subscriber = fmt::layer()
        .with_target(false)
        .without_time()
        .with_writer(std::io::stdout);

    let file_subscriber = match data_dir {
        Some(directory) => {
            std::fs::create_dir_all(directory)?;
            let log_file = std::fs::File::create(directory.join(LOG_FILE.clone()))?;
            Some(
                fmt::layer()
                    .with_file(true)
                    .with_line_number(true)
                    .with_writer(Mutex::new(log_file))
                    .with_target(false)
                    .with_ansi(false),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_subscriber)
        .with(file_subscriber)
        .with(ErrorLayer::default())
        .try_init()?;
    Ok(())
}

/// Similar to the `std::dbg!` macro, but generates `tracing` events rather
/// than printing to stdout.
///
/// By default, the verbosity level for the generated events is `DEBUG`, but
/// this can be customized.
#[macro_export]
macro_rules! trace_dbg {
    (target: $target:expr, level: $level:expr, $ex:expr) => {{
        match $ex {
            value => {
                tracing::event!(target: $target, $level, ?value, stringify!($ex));
                value
            }
        }
    }};
    (level: $level:expr, $ex:expr) => {
        $crate::trace_dbg!(target: module_path!(), level: $level, $ex)
    };
    (target: $target:expr, $ex:expr) => {
        $crate::trace_dbg!(target: $target, level: tracing::Level::DEBUG, $ex)
    };
    ($ex:expr) => {
        $crate::trace_dbg!(level: tracing::Level::DEBUG, $ex)
    };
}
