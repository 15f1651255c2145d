//! Localmail composes a plain-text email and hands it to an SMTP relay
//! listening on `localhost:2525`.
//!
//! The relay is reached over plain TCP, without TLS or authentication.
//! Every send opens its own connection and closes it again.
//!
//! ```rust,no_run
//! use localmail::{EmailMessage, Session};
//!
//! # async fn run() -> Result<(), localmail::ConnectError> {
//! let message = EmailMessage::build("a@x.com", "b@y.com", "Hi", "Hello there");
//! let outcome = Session::new()
//!     .send_message(&message, &mut std::io::stdout())
//!     .await?;
//! assert!(outcome.is_sent());
//! # Ok(())
//! # }
//! ```

#![deny(
    missing_copy_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code,
    unstable_features,
    unused_import_braces,
    missing_debug_implementations,
    clippy::unwrap_used
)]

mod codec;
pub mod commands;
pub mod error;
pub mod extension;
mod message;
pub mod mock;
pub mod net;
pub mod prompt;
pub mod relay;
pub mod response;
pub mod session;
mod smtp_client;
mod stream;
mod types;

pub use crate::codec::ClientCodec;
pub use crate::error::{AddressError, Error, SmtpResult};
pub use crate::message::EmailMessage;
pub use crate::net::{Connector, TcpConnector};
pub use crate::relay::{ReceivedMail, Relay, RelayConfig, RelayServer};
pub use crate::session::{send, ConnectError, Outcome, Session};
pub use crate::smtp_client::{SmtpClient, SmtpTransport};
pub use crate::stream::SmtpStream;
pub use types::*;
