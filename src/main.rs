use std::process;

use localmail::prompt::{ConsolePrompt, Draft};
use localmail::Session;

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
    let message = Draft::collect(&mut ConsolePrompt::stdio())?.into_message();
    log::debug!("composed message for {}", message.recipient());

    // A refused or failed send has already been reported on stdout.
    Session::new()
        .send_message(&message, &mut std::io::stdout())
        .await?;

    Ok(())
}
