//! Opening connections to the relay

use async_trait::async_trait;
use log::debug;
use tokio::io::{AsyncRead as Read, AsyncWrite as Write};
use tokio::net::TcpStream;

use std::io;

/// Host of the local relay
pub const RELAY_HOST: &str = "localhost";
/// Port of the local relay
pub const RELAY_PORT: u16 = 2525;

/// A trait for the concept of opening a stream
#[async_trait]
pub trait Connector: Send + Sync {
    /// The connection handed to the SMTP client
    type Stream: Read + Write + Unpin + Send;

    /// Opens a new connection to the relay
    async fn connect(&self) -> io::Result<Self::Stream>;

    /// Human readable relay address, for logs
    fn server(&self) -> &str;
}

/// Plain TCP connections, no TLS
#[derive(Clone, Debug)]
pub struct TcpConnector {
    addr: String,
}

impl Default for TcpConnector {
    fn default() -> Self {
        TcpConnector::new(format!("{}:{}", RELAY_HOST, RELAY_PORT))
    }
}

impl TcpConnector {
    /// Connector for the given `host:port`
    pub fn new<A: Into<String>>(addr: A) -> TcpConnector {
        TcpConnector { addr: addr.into() }
    }
}

#[async_trait]
impl Connector for TcpConnector {
    type Stream = TcpStream;

    async fn connect(&self) -> io::Result<TcpStream> {
        debug!("connecting to {}", self.addr);
        let stream = TcpStream::connect(self.addr.as_str()).await?;
        stream.set_nodelay(true)?;
        Ok(stream)
    }

    fn server(&self) -> &str {
        &self.addr
    }
}
