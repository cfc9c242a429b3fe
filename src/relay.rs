//! Plain TCP email relay.
//!
//! A client connects, writes `subject<<<SEPARATOR>>>body<<<SEPARATOR>>>recipient`
//! and reads back a one-line status. One request per connection.

use anyhow::Result;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

use crate::tools::Mailer;

pub const SEPARATOR: &str = "<<<SEPARATOR>>>";
pub const DEFAULT_RELAY_ADDR: &str = "127.0.0.1:65432";

const MAX_REQUEST_BYTES: usize = 1024;

const REPLY_SENT: &str = "Success: Email sent.";
const REPLY_FAILED: &str = "Error: Failed to send email.";
const REPLY_INVALID: &str = "Error: Invalid data format.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayRequest {
    pub subject: String,
    pub body: String,
    pub recipient: String,
}

/// Split a raw request into its three fields.
///
/// Anything after the second separator belongs to the recipient, so extra
/// separators never produce a fourth field.
pub fn parse_relay_message(raw: &str) -> Option<RelayRequest> {
    let mut parts = raw.splitn(3, SEPARATOR);
    let subject = parts.next()?;
    let body = parts.next()?;
    let recipient = parts.next()?;

    Some(RelayRequest {
        subject: subject.to_string(),
        body: body.to_string(),
        recipient: recipient.to_string(),
    })
}

/// Accept connections forever, each on its own task.
pub async fn serve(listener: TcpListener, mailer: Mailer) -> Result<()> {
    info!("Email relay listening on {}", listener.local_addr()?);

    loop {
        let (stream, peer) = listener.accept().await?;
        debug!(%peer, "Relay connection accepted");

        let mailer = mailer.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, mailer).await {
                warn!(%peer, error = %e, "Relay connection failed");
            }
        });
    }
}

async fn handle_connection(mut stream: TcpStream, mailer: Mailer) -> Result<()> {
    let mut buf = [0u8; MAX_REQUEST_BYTES];
    let n = stream.read(&mut buf).await?;
    if n == 0 {
        return Ok(());
    }

    let raw = String::from_utf8_lossy(&buf[..n]);
    let reply = match parse_relay_message(&raw) {
        Some(request) => {
            info!(
                recipient = %request.recipient,
                subject = %request.subject,
                "Relaying email"
            );
            match mailer
                .send(&request.recipient, &request.subject, &request.body)
                .await
            {
                Ok(()) => REPLY_SENT,
                Err(_) => REPLY_FAILED,
            }
        }
        None => REPLY_INVALID,
    };

    stream.write_all(reply.as_bytes()).await?;
    stream.shutdown().await?;
    Ok(())
}
