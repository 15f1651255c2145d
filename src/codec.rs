use std::io;

use tokio::io::{AsyncWrite as Write, AsyncWriteExt};

/// The codec used for transparency
///
/// Turns message text into DATA payload: line breaks become CRLF, lines
/// starting with a dot get it doubled, and an empty frame ends the payload.
#[derive(Default, Clone, Copy, Debug)]
pub struct ClientCodec {
    /// Something other than a line break was written last
    mid_line: bool,
    /// The last byte seen was a CR, already written out as CRLF
    after_cr: bool,
}

impl ClientCodec {
    /// Creates a new client codec
    pub fn new() -> Self {
        ClientCodec::default()
    }
}

impl ClientCodec {
    /// Adds transparency and normalizes line endings.
    ///
    /// An empty `frame` writes the `<CRLF>.<CRLF>` terminator and resets the
    /// codec.
    pub async fn encode<W: Write + Unpin>(&mut self, frame: &[u8], mut buf: W) -> io::Result<()> {
        if frame.is_empty() {
            if self.mid_line {
                buf.write_all(b"\r\n.\r\n").await?;
            } else {
                buf.write_all(b".\r\n").await?;
            }
            *self = ClientCodec::default();
            return Ok(());
        }

        let mut out = Vec::with_capacity(frame.len() + 16);
        for &byte in frame {
            if self.after_cr {
                self.after_cr = false;
                if byte == b'\n' {
                    continue;
                }
            }
            match byte {
                b'\r' => {
                    out.extend_from_slice(b"\r\n");
                    self.after_cr = true;
                    self.mid_line = false;
                }
                b'\n' => {
                    out.extend_from_slice(b"\r\n");
                    self.mid_line = false;
                }
                b'.' if !self.mid_line => {
                    out.extend_from_slice(b"..");
                    self.mid_line = true;
                }
                _ => {
                    out.push(byte);
                    self.mid_line = true;
                }
            }
        }
        buf.write_all(&out).await
    }
}

/// Size of `message` as announced with `SIZE`: line breaks counted as CRLF
/// and the last line terminated. Dot-stuffing is not counted.
pub fn message_size(message: &[u8]) -> usize {
    let mut size = 0;
    let mut after_cr = false;
    let mut mid_line = false;
    for &byte in message {
        match byte {
            b'\n' if after_cr => {}
            b'\r' | b'\n' => {
                size += 2;
                mid_line = false;
            }
            _ => {
                size += 1;
                mid_line = true;
            }
        }
        after_cr = byte == b'\r';
    }
    if mid_line {
        size += 2;
    }
    size
}
