pub mod server;

use crate::cli::globals::AuthConfig;

#[derive(Debug)]
pub enum Action {
    Server {
        port: u16,
        dsn: String,
        config: AuthConfig,
    },
}
