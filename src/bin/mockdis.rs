use clap::Parser;
use mockdis::{Client, Cmd, Config, Error, Store};
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info};

#[tokio::main]
async fn main() -> Result<(), Error> {
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| debug!("Failed to initialize global tracing: {}", e));

    let config = Config::parse();
    let mut client = Client::with_store(Store::with_config(config));
    info!("Reading commands from stdin");

    let mut lines = BufReader::new(io::stdin()).lines();
    let mut stdout = io::stdout();

    while let Some(line) = lines.next_line().await? {
        let cmd = Cmd::from(line.as_str());
        if cmd.is_empty() {
            continue;
        }

        let reply = match client.call(cmd) {
            Ok(frame) => frame.to_string(),
            Err(err) => format!("(error) {}", err),
        };
        stdout.write_all(format!("{}\n", reply).as_bytes()).await?;

        while let Some(message) = client.try_next_message() {
            stdout
                .write_all(format!("{}\n", message.into_frame()).as_bytes())
                .await?;
        }
        stdout.flush().await?;
    }

    info!("End of input");
    Ok(())
}
