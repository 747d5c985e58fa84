use clap::Parser;

use crate::config::pathconfig::PathConfig;

#[derive(Parser, Debug)]
#[command(author, version = version(), about)]
pub struct Cli {
    /// Path of mpv's IPC socket, as given to --input-ipc-server. Overrides player.socket.
    pub socket: Option<String>,

    /// Discord application ID the presence is shown under. Overrides presence.client_id.
    pub client_id: Option<String>,

    /// Specifies the *directory* of the config to load. This directory is expected to contain
    /// files like "config.json5".
    #[arg(short, long)]
    pub config: Option<String>,

    /// Specifies the *directory* the log file is written to.
    #[arg(short, long)]
    pub data: Option<String>,

    /// Do not use any config other than the preset. Incompatible with --config.
    #[arg(long, default_value_t = false)]
    pub no_config: bool,

    /// Do not write a log file. Incompatible with --data.
    #[arg(long, default_value_t = false)]
    pub no_data: bool,
}

impl Cli {
    pub fn is_valid(&self) -> Option<String> {
        if self.config.is_some() && self.no_config {
            return Some("Incompatible flags set: --config and --no-config".to_string());
        };
        if self.data.is_some() && self.no_data {
            return Some("Incompatible flags set: --data and --no-data".to_string());
        };
        None
    }
}

const VERSION_MESSAGE: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    "-",
    env!("VERGEN_GIT_DESCRIBE"),
    " (",
    env!("VERGEN_BUILD_DATE"),
    ")"
);

pub fn version() -> String {
    let author = clap::crate_authors!();

    let config_dir_path = PathConfig::get_config_dir().display().to_string();
    let data_dir_path = PathConfig::get_data_dir().display().to_string();

    format!(
        "\
{VERSION_MESSAGE}

Authors: {author}

Config directory: {config_dir_path}
Data directory: {data_dir_path}"
    )
}
