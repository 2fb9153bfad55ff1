//! gossip-client: send one request to a local gossiper.

use anyhow::{Context, Result, bail};
use clap::Parser;
use gossip_core::NodeName;
use gossip_core::protocol::ClientMessage;
use std::net::{Ipv4Addr, SocketAddr};
use tokio::net::UdpSocket;

#[derive(Parser, Debug)]
#[command(name = "gossip-client")]
#[command(about = "Send a request to a local gossiper")]
struct Args {
    /// Client port of the gossiper
    #[arg(long, default_value_t = 8080)]
    ui_port: u16,

    /// Message text
    #[arg(long)]
    msg: Option<String>,

    /// Destination node of a private message or download
    #[arg(long)]
    dest: Option<String>,

    /// File to share, or name to save a download under
    #[arg(long)]
    file: Option<String>,

    /// Metafile hash to download (hex)
    #[arg(long)]
    request: Option<String>,

    /// Comma separated search keywords
    #[arg(long)]
    keywords: Option<String>,

    /// Search budget
    #[arg(long)]
    budget: Option<u64>,
}

fn build_message(args: Args) -> Result<ClientMessage> {
    let destination = args
        .dest
        .as_deref()
        .map(str::parse::<NodeName>)
        .transpose()
        .context("Invalid --dest")?;
    let request = args
        .request
        .as_deref()
        .map(hex::decode)
        .transpose()
        .context("--request must be a hex string")?;
    let keywords = args
        .keywords
        .map(|k| k.split(',').map(str::to_string).collect::<Vec<_>>());

    if request.is_some() && destination.is_none() {
        bail!("--request needs --dest");
    }
    if request.is_some() && args.file.is_none() {
        bail!("--request needs --file to save the download under");
    }
    if args.budget.is_some() && keywords.is_none() {
        bail!("--budget only applies to --keywords");
    }
    if destination.is_some() && args.msg.is_none() && request.is_none() {
        bail!("--dest needs --msg or --request");
    }

    let message = ClientMessage {
        text: args.msg,
        destination,
        file: args.file,
        request,
        keywords,
        budget: args.budget,
    };
    if message.intent().is_none() {
        bail!("Nothing to send: give --msg, --file, --request or --keywords");
    }
    Ok(message)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let target = SocketAddr::from((Ipv4Addr::LOCALHOST, args.ui_port));
    let message = build_message(args)?;

    let socket = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).await?;
    socket
        .send_to(&message.encode()?, target)
        .await
        .with_context(|| format!("Failed to reach gossiper on {}", target))?;
    Ok(())
}
