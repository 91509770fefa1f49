use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use fractonkv_core::bootstrap::BootstrapConfig;

use crate::cli::{Cli, LogLevel};

/// Process configuration assembled from the CLI flags. There is no
/// file-based layer to merge here — unlike a multi-tenant proxy, this
/// server has nothing to layer config from beyond its own flags.
pub struct Config {
    pub listen_addr: SocketAddr,
    pub log_level: LogLevel,
    pub password: Arc<[u8]>,
    pub reclog_path: PathBuf,
}

impl Config {
    pub fn from_cli(cli: Cli) -> Result<Self, std::net::AddrParseError> {
        Ok(Self {
            listen_addr: cli.listen.parse()?,
            log_level: cli.log_level,
            password: Arc::from(cli.password.into_bytes().into_boxed_slice()),
            reclog_path: cli.log_file,
        })
    }

    pub fn bootstrap_config(&self) -> BootstrapConfig {
        BootstrapConfig { password: Arc::clone(&self.password), reclog_path: self.reclog_path.clone() }
    }
}
