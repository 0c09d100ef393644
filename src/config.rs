//! Process configuration: host/port for the websocket listener. CLI flags
//! take priority over the `HOST`/`PORT` environment variables.

use std::net::SocketAddr;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(version, about = "Collaborative plain-text editing server")]
pub struct Config {
    /// Address to bind the websocket listener on.
    #[arg(long, env = "HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to bind the websocket listener on.
    #[arg(long, env = "PORT", default_value_t = 8080)]
    pub port: u16,
}

impl Config {
    pub fn addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}
