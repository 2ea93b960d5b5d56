use std::{env, io};

use log::info;
use tokio::{net::TcpListener, signal};

use coordinator::Rendezvous;

const DEFAULT_HOST: &str = "127.0.0.1";

#[tokio::main]
async fn main() -> io::Result<()> {
    env_logger::init();

    let world_size: usize = env::var("WORLD_SIZE")
        .map_err(io::Error::other)?
        .parse()
        .map_err(io::Error::other)?;

    let addr = format!(
        "{}:{}",
        env::var("HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string()),
        env::var("PORT").map_err(io::Error::other)?,
    );

    let list = TcpListener::bind(&addr).await?;
    info!("listening at {addr} for {world_size} trainers");

    let mut service = Rendezvous::new(world_size);
    for _ in 0..world_size {
        let (stream, peer) = list.accept().await?;
        let (rx, tx) = stream.into_split();
        let (rx, tx) = comms::channel(rx, tx);
        info!("trainer connected from {peer}");
        service.spawn(rx, tx);
    }

    tokio::select! {
        ret = service.run() => {
            ret?;
            info!("all trainers finished, shutting down");
        }
        _ = signal::ctrl_c() => {
            info!("received SIGTERM");
        }
    }

    Ok(())
}
