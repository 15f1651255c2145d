//! Listens on port 2525 and prints every message it receives.

use std::process;

use localmail::relay::RelayServer;
use tokio::sync::mpsc;

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Result<T> = std::result::Result<T, Error>;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::init();

    if let Err(err) = run().await {
        eprintln!("Error: {}", err);
        process::exit(1);
    }
}

async fn run() -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let relay = RelayServer::new(tx).bind().await?;
    println!("Server listening on {}", relay.local_addr()?);

    let mut server = tokio::spawn(relay.serve());
    loop {
        tokio::select! {
            result = &mut server => {
                result??;
                return Ok(());
            }
            Some(mail) = rx.recv() => {
                println!("Received email:\n{}\n", mail);
            }
        }
    }
}
