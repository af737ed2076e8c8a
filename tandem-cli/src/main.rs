use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use tandem_client::backend::WebrtcPeer;
use tandem_client::signaling::SignalingConnection;
use tandem_client::{Session, SessionConfig, SessionUpdate};
use tandem_core::{ParticipantId, ServerMessage};
use tokio::sync::mpsc;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tandem")]
#[command(about = "Talk to a tandem signaling relay")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct Target {
    #[arg(long, default_value = "ws://127.0.0.1:3000/ws")]
    url: String,

    #[arg(long)]
    identity: String,

    #[arg(long)]
    room: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Join a room and print every frame the relay sends.
    Probe {
        #[command(flatten)]
        target: Target,
    },
    /// Join a room and negotiate a data-only connection with `to`.
    Call {
        #[command(flatten)]
        target: Target,

        #[arg(long)]
        to: String,

        /// Wait for the remote side's offer instead of sending one.
        #[arg(long)]
        answer: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    match Cli::parse().command {
        Commands::Probe { target } => probe(target).await,
        Commands::Call { target, to, answer } => call(target, to, answer).await,
    }
}

async fn join(target: &Target) -> Result<SignalingConnection> {
    let mut conn = SignalingConnection::connect(&target.url)
        .await
        .with_context(|| format!("Failed to connect to {}", target.url))?;
    println!(
        "{} {} as {}",
        "Connected".green().bold(),
        target.url,
        conn.handle().to_string().dimmed()
    );

    let members = conn
        .join(target.identity.as_str(), target.room.as_str())
        .await
        .context("Join failed")?;
    println!("{} room {}", "Joined".green().bold(), target.room.cyan());
    for member in members {
        println!("   {} {}", "member".dimmed(), member.identity);
    }
    Ok(conn)
}

async fn probe(target: Target) -> Result<()> {
    let mut conn = join(&target).await?;

    loop {
        tokio::select! {
            msg = conn.recv() => {
                let Some(msg) = msg else {
                    println!("{}", "Relay closed the connection".red());
                    break;
                };
                print_frame(&msg);
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    conn.close();
    Ok(())
}

async fn call(target: Target, to: String, answer: bool) -> Result<()> {
    let conn = join(&target).await?;
    let config = SessionConfig {
        local: ParticipantId::from(target.identity.as_str()),
        remote: ParticipantId::from(to.as_str()),
        ice_servers: conn.ice_servers().to_vec(),
    };

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let peer = WebrtcPeer::new(&config.ice_servers, events_tx)
        .await
        .context("Failed to create peer connection")?;
    // Without a channel or track the offer carries no media section.
    peer.inner()
        .create_data_channel("tandem", None)
        .await
        .context("Failed to create data channel")?;

    let (sink, mut frames) = conn.split();
    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
    let (session, mut handle) = Session::new(peer, &config, sink, events_rx, inbound_rx);
    println!(
        "{} with {} as {:?}",
        "Session".green().bold(),
        config.remote,
        session.negotiator().role()
    );
    let task = tokio::spawn(session.run());

    tokio::spawn(async move {
        while let Some(msg) = frames.recv().await {
            print_frame(&msg);
            if inbound_tx.send(msg).is_err() {
                break;
            }
        }
    });

    if !answer {
        handle.call()?;
    }

    loop {
        tokio::select! {
            update = handle.next_update() => match update {
                Some(SessionUpdate::Established) => {
                    println!("{}", "Negotiation complete".green().bold());
                }
                Some(SessionUpdate::Failed(reason)) => {
                    println!("{} {}", "Negotiation failed:".red().bold(), reason);
                }
                Some(SessionUpdate::Closed) | None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                let _ = handle.close();
                break;
            }
        }
    }

    task.await.context("Session task panicked")?;
    Ok(())
}

fn print_frame(msg: &ServerMessage) {
    match msg {
        ServerMessage::UserJoined { identity, handle } => {
            println!("{} {} ({})", "+".green(), identity, handle.to_string().dimmed())
        }
        ServerMessage::UserLeft { identity, .. } => println!("{} {}", "-".red(), identity),
        ServerMessage::CallOffer { from, .. } => println!("{} call-offer from {}", "<".cyan(), from),
        ServerMessage::CallAnswer { from, .. } => {
            println!("{} call-answer from {}", "<".cyan(), from)
        }
        ServerMessage::RenegotiateOffer { from, .. } => {
            println!("{} renegotiate-offer from {}", "<".cyan(), from)
        }
        ServerMessage::RenegotiateAnswer { from, .. } => {
            println!("{} renegotiate-answer from {}", "<".cyan(), from)
        }
        ServerMessage::IceCandidate { from, candidate } => {
            debug!("Candidate from {}: {}", from, candidate.candidate)
        }
        ServerMessage::TargetUnreachable { to } => {
            println!("{} {} is not reachable", "!".yellow(), to)
        }
        ServerMessage::Error { reason } => println!("{} {}", "error:".red().bold(), reason),
        other => println!("{} {:?}", "<".dimmed(), other),
    }
}
