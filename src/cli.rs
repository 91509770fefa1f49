use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// A small, Redis-flavored in-memory key/value server.
#[derive(Parser, Debug)]
#[command(name = "fractonkv", version)]
pub struct Cli {
    /// Address to listen on.
    #[arg(short, long, default_value = "127.0.0.1:6380")]
    pub listen: String,

    /// Logging profile: `prod` for JSON, `dev` for pretty-printed.
    #[arg(long, value_enum, default_value = "dev")]
    pub log_level: LogLevel,

    /// Shared connection password. Defaults to the reference secret.
    #[arg(long, default_value = "secret")]
    pub password: String,

    /// Path to the append-only recovery log.
    #[arg(long, default_value = "fractonkv.reclog")]
    pub log_file: PathBuf,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Prod,
    Dev,
}
