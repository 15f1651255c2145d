#![allow(missing_docs)]

//! In-memory relay connections for tests.

use std::io::{self, Cursor};
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use async_trait::async_trait;
use pin_project::pin_project;
use tokio::io::{AsyncRead as Read, AsyncWrite as Write, ReadBuf};

use crate::net::Connector;

pub type MockCursor = Cursor<Vec<u8>>;

/// A stream that replays scripted relay replies and records what the
/// client wrote. Clones share the written bytes and the shutdown count.
#[pin_project]
#[derive(Clone, Debug, Default)]
pub struct MockStream {
    #[pin]
    reader: MockCursor,
    writer: Arc<Mutex<Vec<u8>>>,
    shutdowns: Arc<AtomicUsize>,
}

impl MockStream {
    pub fn new() -> MockStream {
        MockStream::default()
    }

    /// A stream whose peer will send `vec`, then end of file
    pub fn with_vec(vec: Vec<u8>) -> MockStream {
        MockStream {
            reader: MockCursor::new(vec),
            ..MockStream::default()
        }
    }

    /// Everything written so far
    pub fn written(&self) -> Vec<u8> {
        self.writer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Everything written so far, lossily decoded
    pub fn written_string(&self) -> String {
        String::from_utf8_lossy(&self.written()).into_owned()
    }

    /// How many times the write half was shut down
    pub fn shutdowns(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }
}

impl Read for MockStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.project();
        let _: Pin<&mut _> = this.reader;
        this.reader.poll_read(cx, buf)
    }
}

impl Write for MockStream {
    fn poll_write(self: Pin<&mut Self>, _cx: &mut Context, buf: &[u8]) -> Poll<io::Result<usize>> {
        self.writer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context) -> Poll<io::Result<()>> {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
        Poll::Ready(Ok(()))
    }
}

/// Hands out a fresh `MockStream` with the same scripted replies on every
/// connect, and keeps each one for inspection.
#[derive(Clone, Debug, Default)]
pub struct MockConnector {
    replies: Vec<u8>,
    refuse: bool,
    streams: Arc<Mutex<Vec<MockStream>>>,
}

impl MockConnector {
    pub fn new<T: AsRef<[u8]>>(replies: T) -> MockConnector {
        MockConnector {
            replies: replies.as_ref().to_vec(),
            ..MockConnector::default()
        }
    }

    /// A connector for a relay that is not listening
    pub fn refusing() -> MockConnector {
        MockConnector {
            refuse: true,
            ..MockConnector::default()
        }
    }

    /// Every stream opened so far, oldest first
    pub fn streams(&self) -> Vec<MockStream> {
        self.streams
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn opens(&self) -> usize {
        self.streams().len()
    }
}

#[async_trait]
impl Connector for MockConnector {
    type Stream = MockStream;

    async fn connect(&self) -> io::Result<MockStream> {
        if self.refuse {
            return Err(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "connection refused",
            ));
        }
        let stream = MockStream::with_vec(self.replies.clone());
        self.streams
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(stream.clone());
        Ok(stream)
    }

    fn server(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn write_take_test() {
        let mut mock = MockStream::new();
        // write to mock stream
        mock.write_all(&[1, 2, 3]).await.unwrap();
        assert_eq!(mock.written(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn read_with_vec_test() {
        let mut mock = MockStream::with_vec(vec![4, 5]);
        let mut vec = Vec::new();
        mock.read_to_end(&mut vec).await.unwrap();
        assert_eq!(vec, vec![4, 5]);
    }

    #[tokio::test]
    async fn shared_state_test() {
        let mock = MockStream::new();
        let mut clone = mock.clone();
        clone.write_all(b"QUIT\r\n").await.unwrap();
        clone.shutdown().await.unwrap();

        assert_eq!(mock.written_string(), "QUIT\r\n");
        assert_eq!(mock.shutdowns(), 1);
    }

    #[tokio::test]
    async fn connector_test() {
        let connector = MockConnector::new("220 ready\r\n");
        let mut first = connector.connect().await.unwrap();
        let _second = connector.connect().await.unwrap();

        let mut greeting = String::new();
        first.read_to_string(&mut greeting).await.unwrap();
        assert_eq!(greeting, "220 ready\r\n");
        assert_eq!(connector.opens(), 2);

        let refused = MockConnector::refusing().connect().await;
        assert_eq!(
            refused.map(|_| ()).unwrap_err().kind(),
            io::ErrorKind::ConnectionRefused
        );
    }
}
