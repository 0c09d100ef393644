use std::sync::Arc;

use clap::Parser;
use log::info;
use tokio::net::TcpListener;

use collab_text_server::config::Config;
use collab_text_server::connection;
use collab_text_server::hub::Hub;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_default_env().init();

    let config = Config::parse();
    let addr = config.addr()?;

    let hub = Arc::new(Hub::new());
    let listener = TcpListener::bind(addr).await?;

    info!("listening on {addr}");

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer) = accepted?;
                let hub = Arc::clone(&hub);
                tokio::spawn(async move {
                    connection::handle_connection(stream, peer, hub).await;
                });
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
                break;
            }
        }
    }

    Ok(())
}
