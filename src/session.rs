//! One submission to the relay: connect, send, report, close.
//!
//! Only failures of the send step are caught and reported as an
//! [`Outcome`]. Failing to reach the relay at all is a [`ConnectError`] and
//! is left to the caller.

use std::fmt::Display;
use std::io::{self, Write};

use log::{debug, warn};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::{Error, SmtpResult};
use crate::message::EmailMessage;
use crate::net::{Connector, TcpConnector};
use crate::response::Response;
use crate::smtp_client::{SmtpClient, SmtpTransport};
use crate::types::{Envelope, SendableEmail};

/// Printed once the relay accepted the connection
pub const STARTING: &str = "starting send";
/// Printed when the relay accepted the message
pub const SENT: &str = "Email sent successfully!";
/// Prefix of the line printed when the send step failed
pub const FAILED: &str = "Failed to send email:";

/// Result of the send step
#[derive(Debug)]
pub enum Outcome {
    /// The relay queued the message
    Sent(Response),
    /// The relay refused the envelope or the message, or the connection
    /// dropped while sending
    Failed(Error),
}

impl Outcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, Outcome::Sent(_))
    }

    /// The send error, if the send step failed
    pub fn error(&self) -> Option<&Error> {
        match self {
            Outcome::Sent(_) => None,
            Outcome::Failed(err) => Some(err),
        }
    }
}

/// The relay could not be reached, or refused the connection with its
/// greeting.
#[derive(thiserror::Error, Debug)]
#[error("connection to {server} failed: {source}")]
pub struct ConnectError {
    server: String,
    #[source]
    source: Error,
}

impl ConnectError {
    fn new<E: Into<Error>>(server: &str, source: E) -> ConnectError {
        ConnectError {
            server: server.to_string(),
            source: source.into(),
        }
    }

    /// The relay address that was tried
    pub fn server(&self) -> &str {
        &self.server
    }

    /// The underlying failure
    pub fn error(&self) -> &Error {
        &self.source
    }
}

/// Sends single messages, one connection each
#[derive(Debug, Clone, Default)]
pub struct Session<C: Connector = TcpConnector> {
    connector: C,
    client: SmtpClient,
}

impl Session<TcpConnector> {
    /// Session for the relay on `localhost:2525`
    pub fn new() -> Self {
        Session::default()
    }
}

impl<C: Connector> Session<C> {
    pub fn with_connector(connector: C) -> Self {
        Session {
            connector,
            client: SmtpClient::default(),
        }
    }

    /// Replaces the client configuration
    pub fn client(self, client: SmtpClient) -> Self {
        Session { client, ..self }
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Opens a connection, sends `message` from `sender` to `recipient`, and
    /// closes the connection again.
    ///
    /// Status lines go to `out`. A failed send is reported there and returned
    /// as `Outcome::Failed`; only connection failures are returned as errors.
    pub async fn send<W: Write>(
        &self,
        sender: &str,
        recipient: &str,
        message: &str,
        out: &mut W,
    ) -> Result<Outcome, ConnectError> {
        let server = self.connector.server();

        let stream = self
            .connector
            .connect()
            .await
            .map_err(|err| ConnectError::new(server, err))?;
        let mut transport = SmtpTransport::new(self.client.clone(), stream)
            .await
            .map_err(|err| ConnectError::new(server, err))?;
        debug!("connection established to {}", server);

        report(out, STARTING);
        let outcome = match transmit(&mut transport, sender, recipient, message).await {
            Ok(response) => {
                report(out, SENT);
                Outcome::Sent(response)
            }
            Err(err) => {
                report(out, format!("{} {}", FAILED, err));
                Outcome::Failed(err)
            }
        };

        if let Err(err) = transport.close().await {
            warn!("closing connection to {} failed: {}", server, err);
        }

        Ok(outcome)
    }

    /// Sends a composed message, using its `From` and `To` as the envelope.
    pub async fn send_message<W: Write>(
        &self,
        message: &EmailMessage,
        out: &mut W,
    ) -> Result<Outcome, ConnectError> {
        self.send(
            message.sender(),
            message.recipient(),
            &message.formatted(),
            out,
        )
        .await
    }
}

/// Sends through the relay on `localhost:2525`, reporting on standard output.
pub async fn send(sender: &str, recipient: &str, message: &str) -> Result<Outcome, ConnectError> {
    Session::new()
        .send(sender, recipient, message, &mut io::stdout())
        .await
}

async fn transmit<S>(
    transport: &mut SmtpTransport<S>,
    sender: &str,
    recipient: &str,
    message: &str,
) -> SmtpResult
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let envelope = Envelope::single(sender, recipient)?;
    transport
        .send(&SendableEmail::new(envelope, message))
        .await
}

fn report<W: Write, L: Display>(out: &mut W, line: L) {
    if let Err(err) = writeln!(out, "{}", line).and_then(|_| out.flush()) {
        warn!("could not print status: {}", err);
    }
}
