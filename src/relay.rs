//! The receiving end: a small SMTP relay for local testing.
//!
//! It listens on port 2525, accepts any envelope, and hands every complete
//! message to a channel. Nothing is stored or forwarded.

use std::fmt::{self, Display, Formatter};
use std::io;
use std::mem;
use std::net::SocketAddr;

use log::{debug, info, warn};
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncRead as Read, AsyncWrite as Write, AsyncWriteExt,
    BufReader,
};
use tokio::net::TcpListener;
use tokio::sync::mpsc::UnboundedSender;

use crate::extension::ClientId;
use crate::net::RELAY_PORT;
use crate::response::{Category, Code, Detail, Response, Severity};
use crate::stream::escape_crlf;

/// Largest message accepted, announced with `SIZE`
pub const DEFAULT_MAX_SIZE: usize = 10 * 1024 * 1024;

const READY: Code = Code {
    severity: Severity::PositiveCompletion,
    category: Category::Connections,
    detail: Detail::Zero,
};
const CLOSING: Code = Code {
    severity: Severity::PositiveCompletion,
    category: Category::Connections,
    detail: Detail::One,
};
const OK: Code = Code {
    severity: Severity::PositiveCompletion,
    category: Category::MailSystem,
    detail: Detail::Zero,
};
const START_INPUT: Code = Code {
    severity: Severity::PositiveIntermediate,
    category: Category::MailSystem,
    detail: Detail::Four,
};
const UNRECOGNIZED: Code = Code {
    severity: Severity::PermanentNegativeCompletion,
    category: Category::Syntax,
    detail: Detail::Two,
};
const BAD_SEQUENCE: Code = Code {
    severity: Severity::PermanentNegativeCompletion,
    category: Category::Syntax,
    detail: Detail::Three,
};
const BAD_PARAMETERS: Code = Code {
    severity: Severity::PermanentNegativeCompletion,
    category: Category::Syntax,
    detail: Detail::One,
};
const TOO_LARGE: Code = Code {
    severity: Severity::PermanentNegativeCompletion,
    category: Category::MailSystem,
    detail: Detail::Two,
};

fn reply<T: Into<String>>(code: Code, text: T) -> Response {
    Response::new(code, vec![text.into()])
}

/// A message accepted by the relay
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct ReceivedMail {
    /// Reverse path, empty for `MAIL FROM:<>`
    pub from: String,
    /// Forward paths, in the order given
    pub to: Vec<String>,
    /// Message content with the transparency dots removed and `\n` line
    /// breaks
    pub body: String,
}

impl Display for ReceivedMail {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(
            f,
            "From: {}\nTo: {}\nBody:\n{}",
            self.from,
            self.to.join(", "),
            self.body
        )
    }
}

/// Client commands the relay understands
#[derive(PartialEq, Eq, Debug)]
enum Command {
    Hello { extended: bool },
    Mail(String),
    Rcpt(String),
    Data,
    Rset,
    Noop,
    Quit,
    BadParameters,
    Unknown,
}

impl Command {
    fn parse(line: &str) -> Command {
        let line = line.trim_end_matches(|c| c == '\r' || c == '\n');
        let (verb, args) = match line.find(' ') {
            Some(space) => (&line[..space], &line[space + 1..]),
            None => (line, ""),
        };

        match verb.to_ascii_uppercase().as_str() {
            "EHLO" => Command::Hello { extended: true },
            "HELO" => Command::Hello { extended: false },
            "MAIL" => path(args, "FROM:").map_or(Command::BadParameters, Command::Mail),
            "RCPT" => match path(args, "TO:") {
                Some(to) if !to.is_empty() => Command::Rcpt(to),
                _ => Command::BadParameters,
            },
            "DATA" => Command::Data,
            "RSET" => Command::Rset,
            "NOOP" => Command::Noop,
            "QUIT" => Command::Quit,
            _ => Command::Unknown,
        }
    }
}

/// Extracts the `<path>` following `prefix`, ignoring any parameters.
fn path(args: &str, prefix: &str) -> Option<String> {
    let head = args.get(..prefix.len())?;
    if !head.eq_ignore_ascii_case(prefix) {
        return None;
    }
    let path = args[prefix.len()..]
        .trim_start()
        .split(' ')
        .next()
        .unwrap_or_default();
    let path = path.strip_prefix('<')?.strip_suffix('>')?;
    Some(path.to_string())
}

/// What the connection does after a command
#[derive(Debug)]
enum Step {
    Reply(Response),
    ReadData(Response),
    Close(Response),
}

/// Relay settings shared by all connections
#[derive(Clone, Debug)]
pub struct RelayConfig {
    /// Name given in the greeting and the EHLO reply
    name: String,
    /// Largest accepted message in bytes
    max_size: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        RelayConfig {
            name: ClientId::default().to_string(),
            max_size: DEFAULT_MAX_SIZE,
        }
    }
}

impl RelayConfig {
    pub fn name<T: Into<String>>(self, name: T) -> RelayConfig {
        RelayConfig {
            name: name.into(),
            ..self
        }
    }

    pub fn max_size(self, max_size: usize) -> RelayConfig {
        RelayConfig { max_size, ..self }
    }
}

/// Protocol state of one connection
#[derive(Debug)]
struct RelaySession<'a> {
    config: &'a RelayConfig,
    from: Option<String>,
    to: Vec<String>,
}

impl<'a> RelaySession<'a> {
    fn new(config: &'a RelayConfig) -> Self {
        RelaySession {
            config,
            from: None,
            to: Vec::new(),
        }
    }

    fn greeting(&self) -> Response {
        reply(READY, format!("{} ESMTP localmail relay", self.config.name))
    }

    fn reset(&mut self) {
        self.from = None;
        self.to.clear();
    }

    fn command(&mut self, line: &str) -> Step {
        let response = match Command::parse(line) {
            Command::Hello { extended: true } => {
                self.reset();
                Response::new(
                    OK,
                    vec![
                        self.config.name.clone(),
                        "8BITMIME".to_string(),
                        format!("SIZE {}", self.config.max_size),
                    ],
                )
            }
            Command::Hello { extended: false } => {
                self.reset();
                reply(OK, self.config.name.clone())
            }
            Command::Mail(_) if self.from.is_some() => {
                reply(BAD_SEQUENCE, "5.5.1 Error: nested MAIL command")
            }
            Command::Mail(from) => {
                self.from = Some(from);
                reply(OK, "2.1.0 Ok")
            }
            Command::Rcpt(_) if self.from.is_none() => {
                reply(BAD_SEQUENCE, "5.5.1 Error: need MAIL command")
            }
            Command::Rcpt(to) => {
                self.to.push(to);
                reply(OK, "2.1.5 Ok")
            }
            Command::Data if self.to.is_empty() => {
                reply(BAD_SEQUENCE, "5.5.1 Error: need RCPT command")
            }
            Command::Data => {
                return Step::ReadData(reply(START_INPUT, "End data with <CR><LF>.<CR><LF>"))
            }
            Command::Rset => {
                self.reset();
                reply(OK, "2.0.0 Ok")
            }
            Command::Noop => reply(OK, "2.0.0 Ok"),
            Command::Quit => return Step::Close(reply(CLOSING, "2.0.0 Bye")),
            Command::BadParameters => reply(BAD_PARAMETERS, "5.5.4 Syntax error in parameters"),
            Command::Unknown => reply(UNRECOGNIZED, "5.5.2 Error: command not recognized"),
        };
        Step::Reply(response)
    }

    /// Ends the transaction with the received content.
    fn message(&mut self, body: String, size: usize) -> (Response, Option<ReceivedMail>) {
        let from = self.from.take().unwrap_or_default();
        let to = mem::take(&mut self.to);

        if size > self.config.max_size {
            return (
                reply(TOO_LARGE, "5.3.4 Message size exceeds fixed limit"),
                None,
            );
        }
        (
            reply(OK, "2.0.0 Ok: queued"),
            Some(ReceivedMail { from, to, body }),
        )
    }
}

async fn write_reply<W: Write + Unpin>(writer: &mut W, response: &Response) -> io::Result<()> {
    let wire = response.to_wire();
    writer.write_all(wire.as_bytes()).await?;
    writer.flush().await?;

    debug!(">> {}", escape_crlf(&wire));
    Ok(())
}

/// Reads message content up to the `.` line. Returns the content and its
/// size on the wire; lines past `max_size` are counted but not kept.
async fn read_data<R: AsyncBufRead + Unpin>(
    reader: &mut R,
    max_size: usize,
) -> io::Result<(String, usize)> {
    let mut lines = Vec::new();
    let mut size = 0;
    let mut line = Vec::with_capacity(80);

    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line).await? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed during DATA",
            ));
        }

        let mut text = String::from_utf8_lossy(&line).into_owned();
        if text.ends_with('\n') {
            text.pop();
            if text.ends_with('\r') {
                text.pop();
            }
        }
        if text == "." {
            break;
        }

        size += text.len() + 2;
        if size <= max_size {
            if text.starts_with('.') {
                text.remove(0);
            }
            lines.push(text);
        }
    }

    Ok((lines.join("\n"), size))
}

/// Speaks SMTP with one client until it quits or disconnects. Every accepted
/// message is sent to `mailbox`.
pub async fn handle_connection<S: Read + Write + Unpin>(
    stream: S,
    config: &RelayConfig,
    mailbox: &UnboundedSender<ReceivedMail>,
) -> io::Result<()> {
    let mut stream = BufReader::new(stream);
    let mut session = RelaySession::new(config);
    write_reply(stream.get_mut(), &session.greeting()).await?;

    let mut line = Vec::with_capacity(80);
    loop {
        line.clear();
        if stream.read_until(b'\n', &mut line).await? == 0 {
            debug!("client disconnected");
            return Ok(());
        }
        let command = String::from_utf8_lossy(&line).into_owned();
        debug!("<< {}", escape_crlf(&command));

        match session.command(&command) {
            Step::Reply(response) => write_reply(stream.get_mut(), &response).await?,
            Step::ReadData(response) => {
                write_reply(stream.get_mut(), &response).await?;
                let (body, size) = read_data(&mut stream, config.max_size).await?;
                debug!("<< <{} bytes of message content>", size);

                let (response, mail) = session.message(body, size);
                write_reply(stream.get_mut(), &response).await?;
                if let Some(mail) = mail {
                    info!("accepted message from <{}> to {:?}", mail.from, mail.to);
                    if mailbox.send(mail).is_err() {
                        warn!("received message dropped, nobody is reading the mailbox");
                    }
                }
            }
            Step::Close(response) => {
                write_reply(stream.get_mut(), &response).await?;
                break;
            }
        }
    }

    stream.get_mut().shutdown().await
}

/// Relay listening address and settings
#[derive(Debug)]
pub struct RelayServer {
    address: SocketAddr,
    config: RelayConfig,
    mailbox: UnboundedSender<ReceivedMail>,
}

impl RelayServer {
    /// Relay on `0.0.0.0:2525` delivering to `mailbox`
    pub fn new(mailbox: UnboundedSender<ReceivedMail>) -> Self {
        RelayServer {
            address: ([0, 0, 0, 0], RELAY_PORT).into(),
            config: RelayConfig::default(),
            mailbox,
        }
    }

    pub fn with_address(self, address: SocketAddr) -> Self {
        RelayServer { address, ..self }
    }

    pub fn with_config(self, config: RelayConfig) -> Self {
        RelayServer { config, ..self }
    }

    /// Binds the listening socket.
    pub async fn bind(self) -> io::Result<Relay> {
        let listener = TcpListener::bind(self.address).await?;
        Ok(Relay {
            listener,
            config: self.config,
            mailbox: self.mailbox,
        })
    }
}

/// A bound relay, ready to serve
#[derive(Debug)]
pub struct Relay {
    listener: TcpListener,
    config: RelayConfig,
    mailbox: UnboundedSender<ReceivedMail>,
}

impl Relay {
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts connections until accepting fails. Each connection is served
    /// on its own task.
    pub async fn serve(self) -> io::Result<()> {
        info!("relay ready on {}", self.local_addr()?);

        loop {
            let (socket, peer) = self.listener.accept().await?;
            debug!("connection from {}", peer);

            let config = self.config.clone();
            let mailbox = self.mailbox.clone();
            tokio::spawn(async move {
                if let Err(err) = handle_connection(socket, &config, &mailbox).await {
                    warn!("connection from {} failed: {}", peer, err);
                }
            });
        }
    }
}
