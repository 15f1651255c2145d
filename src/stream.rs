use std::fmt::Display;
use std::future::Future;
use std::string::String;
use std::time::Duration;

use log::debug;
use tokio::io::{
    AsyncBufReadExt, AsyncRead as Read, AsyncWrite as Write, AsyncWriteExt, BufReader,
};

use crate::codec::ClientCodec;
use crate::error::{Error, SmtpResult};
use crate::response::parse_response;

/// SMTP stream.
#[derive(Debug)]
pub struct SmtpStream<S: Read + Write + Unpin> {
    /// Inner stream.
    inner: BufReader<S>,
    /// Limit for each write and each reply, if any.
    timeout: Option<Duration>,
}

impl<S: Read + Write + Unpin> SmtpStream<S> {
    /// Creates new SMTP stream.
    pub fn new(stream: S) -> Self {
        Self {
            inner: BufReader::new(stream),
            timeout: None,
        }
    }

    /// Sets the timeout applied to every network operation.
    pub fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout;
    }

    /// Returns a reference to the inner stream.
    pub fn get_ref(&self) -> &S {
        self.inner.get_ref()
    }

    /// Send the given SMTP command to the server.
    pub async fn command(&mut self, command: impl Display) -> SmtpResult {
        self.send_command(command).await?;
        self.read_response().await
    }

    /// Sends the given SMTP command to the server without waiting for response.
    pub async fn send_command(&mut self, command: impl Display) -> Result<(), Error> {
        self.write(command.to_string().as_bytes()).await?;
        Ok(())
    }

    /// Writes the given data to the server.
    async fn write(&mut self, string: &[u8]) -> Result<(), Error> {
        let timeout = self.timeout;
        with_timeout(timeout, self.write_bytes(string)).await?;

        debug!(
            ">> {}",
            escape_crlf(String::from_utf8_lossy(string).as_ref())
        );
        Ok(())
    }

    async fn write_bytes(&mut self, string: &[u8]) -> Result<(), Error> {
        let stream = self.inner.get_mut();
        stream.write_all(string).await?;
        stream.flush().await?;
        Ok(())
    }

    /// Read an SMTP response from the wire.
    pub async fn read_response(&mut self) -> SmtpResult {
        let timeout = self.timeout;
        with_timeout(timeout, self.read_reply()).await
    }

    async fn read_reply(&mut self) -> SmtpResult {
        let reader = &mut self.inner;
        let mut buffer = String::with_capacity(100);

        loop {
            let read = reader.read_line(&mut buffer).await?;
            if read == 0 {
                break;
            }
            debug!("<< {}", escape_crlf(&buffer));
            match parse_response(&buffer) {
                Ok((_remaining, response)) => {
                    if response.is_positive() {
                        return Ok(response);
                    }

                    return Err(response.into());
                }
                Err(nom::Err::Failure(e)) => {
                    return Err(Error::Parsing(e.code));
                }
                Err(nom::Err::Incomplete(_)) => { /* read more */ }
                Err(nom::Err::Error(e)) => {
                    return Err(Error::Parsing(e.code));
                }
            }
        }

        Err(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "connection closed by relay",
        )
        .into())
    }

    /// Sends the message content, terminated by `<CRLF>.<CRLF>`.
    pub(crate) async fn message(&mut self, message: &[u8]) -> SmtpResult {
        let timeout = self.timeout;
        with_timeout(timeout, self.write_message(message)).await?;
        debug!(">> <{} bytes of message content>", message.len());

        self.read_response().await
    }

    async fn write_message(&mut self, message: &[u8]) -> Result<(), Error> {
        let mut codec = ClientCodec::new();
        let stream = self.inner.get_mut();

        codec.encode(message, &mut *stream).await?;
        codec.encode(&[], &mut *stream).await?;
        stream.flush().await?;
        Ok(())
    }

    /// Shuts down the write half of the connection.
    pub async fn shutdown(&mut self) -> Result<(), Error> {
        self.inner.get_mut().shutdown().await?;
        Ok(())
    }
}

/// Runs `f`, failing with `Error::Timeout` if a limit is set and exceeded.
async fn with_timeout<T, F>(timeout: Option<Duration>, f: F) -> Result<T, Error>
where
    F: Future<Output = Result<T, Error>>,
{
    match timeout {
        Some(duration) => tokio::time::timeout(duration, f).await?,
        None => f.await,
    }
}

/// Returns the string replacing all the CRLF with "\<CRLF\>"
/// Used for debug displays
pub(crate) fn escape_crlf(string: &str) -> String {
    string.replace("\r\n", "<CRLF>")
}
