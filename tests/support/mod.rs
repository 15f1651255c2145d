//! A scripted SMTP relay on an ephemeral local port.

#![allow(dead_code)]

use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use localmail::TcpConnector;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

pub const ACCEPT_RECIPIENT: &str = "250 2.1.5 Ok\r\n";
pub const REFUSE_RECIPIENT: &str = "550 5.1.1 Recipient address rejected: User unknown\r\n";

#[derive(Debug, Default)]
struct State {
    accepted: AtomicUsize,
    closed: AtomicUsize,
    commands: Mutex<Vec<String>>,
    messages: Mutex<Vec<String>>,
}

/// Replies to every command with a fixed answer, except `RCPT`, whose reply
/// is chosen by the test.
#[derive(Debug, Clone)]
pub struct FakeRelay {
    addr: SocketAddr,
    rcpt_reply: &'static str,
    state: Arc<State>,
}

impl FakeRelay {
    /// A relay that accepts every message
    pub async fn accepting() -> FakeRelay {
        FakeRelay::start(ACCEPT_RECIPIENT).await
    }

    /// A relay that refuses every recipient
    pub async fn refusing_recipients() -> FakeRelay {
        FakeRelay::start(REFUSE_RECIPIENT).await
    }

    async fn start(rcpt_reply: &'static str) -> FakeRelay {
        FakeRelay::start_on("127.0.0.1:0", rcpt_reply).await.unwrap()
    }

    /// A relay on a fixed address. Fails when the address is taken.
    pub async fn start_on(addr: &str, rcpt_reply: &'static str) -> io::Result<FakeRelay> {
        let listener = TcpListener::bind(addr).await?;
        let relay = FakeRelay {
            addr: listener.local_addr()?,
            rcpt_reply,
            state: Arc::default(),
        };

        let server = relay.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                server.state.accepted.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(server.clone().serve(stream));
            }
        });

        Ok(relay)
    }

    async fn serve(self, stream: TcpStream) {
        let mut stream = BufReader::new(stream);
        stream
            .get_mut()
            .write_all(b"220 fake.relay ESMTP\r\n")
            .await
            .unwrap();

        let mut line = String::new();
        loop {
            line.clear();
            match stream.read_line(&mut line).await {
                Ok(0) | Err(_) => break,
                Ok(_) => {}
            }
            let command = line.trim_end().to_string();
            self.state.commands.lock().unwrap().push(command.clone());

            let verb = command
                .split(|c: char| c == ' ' || c == ':')
                .next()
                .unwrap_or_default()
                .to_ascii_uppercase();
            let reply = match verb.as_str() {
                "EHLO" => "250-fake.relay\r\n250-8BITMIME\r\n250 SIZE 10240\r\n",
                "HELO" | "MAIL" | "RSET" => "250 2.0.0 Ok\r\n",
                "RCPT" => self.rcpt_reply,
                "DATA" => "354 End data with <CR><LF>.<CR><LF>\r\n",
                "QUIT" => "221 2.0.0 Bye\r\n",
                _ => "502 5.5.2 Error: command not recognized\r\n",
            };
            if stream.get_mut().write_all(reply.as_bytes()).await.is_err() {
                break;
            }

            if verb == "DATA" {
                let mut message = String::new();
                loop {
                    line.clear();
                    match stream.read_line(&mut line).await {
                        Ok(0) | Err(_) => break,
                        Ok(_) if line == ".\r\n" => break,
                        Ok(_) => message.push_str(&line),
                    }
                }
                self.state.messages.lock().unwrap().push(message);
                if stream
                    .get_mut()
                    .write_all(b"250 2.0.0 Ok: queued\r\n")
                    .await
                    .is_err()
                {
                    break;
                }
            }
        }

        self.state.closed.fetch_add(1, Ordering::SeqCst);
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn connector(&self) -> TcpConnector {
        TcpConnector::new(self.addr.to_string())
    }

    pub fn accepted(&self) -> usize {
        self.state.accepted.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.state.closed.load(Ordering::SeqCst)
    }

    /// Every command line received, over all connections
    pub fn commands(&self) -> Vec<String> {
        self.state.commands.lock().unwrap().clone()
    }

    /// Every message body received, with CRLF line endings
    pub fn messages(&self) -> Vec<String> {
        self.state.messages.lock().unwrap().clone()
    }

    /// Waits until the relay has seen `count` connections end.
    pub async fn wait_closed(&self, count: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.closed() < count {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("connections were not closed");
    }
}
