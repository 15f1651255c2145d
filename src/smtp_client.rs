use std::time::Duration;

use log::debug;
use tokio::io::{AsyncRead as Read, AsyncWrite as Write};

use crate::commands::*;
use crate::error::{Error, SmtpResult};
use crate::extension::{ClientId, Extension, MailBodyParameter, MailParameter, ServerInfo};
use crate::stream::SmtpStream;
use crate::SendableEmail;

/// Contains client configuration
#[derive(Debug, Clone)]
pub struct SmtpClient {
    /// Name sent during EHLO
    hello_name: ClientId,
    /// Enable UTF8 mailboxes in envelope or headers
    smtp_utf8: bool,
    /// Limit for every network operation, none by default
    timeout: Option<Duration>,
}

impl Default for SmtpClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for the SMTP `SmtpTransport`
impl SmtpClient {
    /// Creates a new SMTP client.
    ///
    /// It does not connect to the server, but only creates the `SmtpTransport`.
    ///
    /// Defaults are:
    ///
    /// * No authentication
    /// * SMTPUTF8 used when an address needs it and the server supports it
    /// * No timeout
    pub fn new() -> Self {
        SmtpClient {
            smtp_utf8: true,
            hello_name: Default::default(),
            timeout: None,
        }
    }

    /// Enable SMTPUTF8 if the server supports it
    pub fn smtp_utf8(self, enabled: bool) -> SmtpClient {
        Self {
            smtp_utf8: enabled,
            ..self
        }
    }

    /// Set the name used during EHLO
    pub fn hello_name(self, name: ClientId) -> SmtpClient {
        Self {
            hello_name: name,
            ..self
        }
    }

    /// Set the timeout duration
    pub fn timeout(self, timeout: Option<Duration>) -> SmtpClient {
        Self { timeout, ..self }
    }
}

macro_rules! try_smtp (
    ($err: expr, $client: ident) => ({
        match $err {
            Ok(val) => val,
            Err(err) => {
                if err.response().is_some() {
                    $client.abort_transaction().await;
                }
                return Err(From::from(err))
            },
        }
    })
);

/// Structure that implements the high level SMTP client
#[derive(Debug)]
pub struct SmtpTransport<S: Read + Write + Unpin> {
    /// Information about the server
    /// Value is None before HELO/EHLO
    server_info: Option<ServerInfo>,
    /// Information about the client
    client_info: SmtpClient,
    /// Low level client
    stream: SmtpStream<S>,
}

impl<S: Read + Write + Unpin> SmtpTransport<S> {
    /// Creates a new SMTP transport over a connected stream and reads the
    /// server greeting.
    pub async fn new(builder: SmtpClient, stream: S) -> Result<Self, Error> {
        let mut stream = SmtpStream::new(stream);
        stream.set_timeout(builder.timeout);
        let greeting = stream.read_response().await?;
        debug!("greeting: {}", greeting);

        Ok(SmtpTransport {
            server_info: None,
            client_info: builder,
            stream,
        })
    }

    /// Information gathered by EHLO/HELO, if it was sent already
    pub fn server_info(&self) -> Option<&ServerInfo> {
        self.server_info.as_ref()
    }

    /// The underlying connection
    pub fn get_ref(&self) -> &S {
        self.stream.get_ref()
    }

    /// Identifies the client with EHLO, falling back to HELO when the
    /// server refuses EHLO.
    pub async fn hello(&mut self) -> Result<&ServerInfo, Error> {
        let client_id = self.client_info.hello_name.clone();
        let response = match self.stream.command(EhloCommand::new(client_id.clone())).await {
            Ok(response) => response,
            Err(err) if err.response().is_some() => {
                debug!("EHLO refused ({}), trying HELO", err);
                self.stream.command(HeloCommand::new(client_id)).await?
            }
            Err(err) => return Err(err),
        };
        let server_info = ServerInfo::from_response(&response)?;

        // Print server information
        debug!("server {}", server_info);

        Ok(&*self.server_info.insert(server_info))
    }

    fn supports_feature(&self, keyword: Extension) -> bool {
        self.server_info
            .as_ref()
            .map(|info| info.supports_feature(keyword))
            .unwrap_or_default()
    }

    /// Abandons the current mail transaction after the server refused part
    /// of it. The outcome of RSET itself does not matter.
    async fn abort_transaction(&mut self) {
        if let Err(err) = self.stream.command(RsetCommand).await {
            debug!("RSET failed: {}", err);
        }
    }

    /// Sends an email.
    pub async fn send(&mut self, email: &SendableEmail) -> SmtpResult {
        if self.server_info.is_none() {
            self.hello().await?;
        }

        let size = email.size();
        if let Some(max_size) = self.server_info.as_ref().and_then(|info| info.max_size) {
            if size > max_size {
                return Err(Error::Client(
                    "message is larger than the relay accepts",
                ));
            }
        }

        // Mail
        let mut mail_options = vec![];

        if self.supports_feature(Extension::Size) {
            mail_options.push(MailParameter::Size(size));
        }

        if email.is_eight_bit() && self.supports_feature(Extension::EightBitMime) {
            mail_options.push(MailParameter::Body(MailBodyParameter::EightBitMime));
        }

        if email.envelope().has_utf8_address() {
            if !(self.client_info.smtp_utf8 && self.supports_feature(Extension::SmtpUtfEight)) {
                return Err(Error::Client(
                    "non-ASCII address requires SMTPUTF8, which is not available",
                ));
            }
            mail_options.push(MailParameter::SmtpUtfEight);
        }

        try_smtp!(
            self.stream
                .command(MailCommand::new(
                    email.envelope().from().cloned(),
                    mail_options,
                ))
                .await,
            self
        );

        // Recipient
        for to_address in email.envelope().to() {
            try_smtp!(
                self.stream
                    .command(RcptCommand::new(to_address.clone()))
                    .await,
                self
            );
            // Log the rcpt command
            debug!("to=<{}>", to_address);
        }

        // Data
        try_smtp!(self.stream.command(DataCommand).await, self);

        // Message content
        let result = try_smtp!(self.stream.message(email.message()).await, self);

        // Log the message
        debug!(
            "status=sent ({})",
            result.first_line().unwrap_or("no response")
        );

        Ok(result)
    }

    /// Closes the SMTP transaction if possible.
    pub async fn quit(&mut self) -> Result<(), Error> {
        self.stream.command(QuitCommand).await?;

        Ok(())
    }

    /// Sends QUIT and shuts the connection down. The shutdown happens even
    /// when QUIT fails; the first error is returned.
    pub async fn close(mut self) -> Result<(), Error> {
        let quit = self.quit().await;
        let shutdown = self.stream.shutdown().await;
        quit.and(shutdown)
    }
}
