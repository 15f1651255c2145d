//! Plain-text message composition.
//!
//! The builder performs no validation: whatever the operator typed ends up in
//! the headers and the body verbatim.

use std::fmt::{self, Display, Formatter};

use crate::error::EmailResult;
use crate::types::{Envelope, SendableEmail};

/// A plain-text email with `Subject`, `From` and `To` headers
#[derive(PartialEq, Eq, Clone, Debug, Default)]
pub struct EmailMessage {
    sender: String,
    recipient: String,
    subject: String,
    body: String,
}

impl EmailMessage {
    /// Builds a message from raw strings.
    pub fn build<S, R, T, B>(sender: S, recipient: R, subject: T, body: B) -> EmailMessage
    where
        S: Into<String>,
        R: Into<String>,
        T: Into<String>,
        B: Into<String>,
    {
        EmailMessage {
            sender: sender.into(),
            recipient: recipient.into(),
            subject: subject.into(),
            body: body.into(),
        }
    }

    pub fn sender(&self) -> &str {
        &self.sender
    }

    pub fn recipient(&self) -> &str {
        &self.recipient
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    /// Serialized message text: headers, a blank line, then the body.
    pub fn formatted(&self) -> String {
        self.to_string()
    }

    /// Envelope addressed from the `From` header to the `To` header.
    pub fn envelope(&self) -> EmailResult<Envelope> {
        Envelope::single(&self.sender, &self.recipient)
    }

    /// Pairs the serialized message with its envelope.
    pub fn into_sendable(self) -> EmailResult<SendableEmail> {
        let envelope = self.envelope()?;
        Ok(SendableEmail::new(envelope, self.formatted()))
    }
}

impl Display for EmailMessage {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(
            f,
            "Subject: {}\nFrom: {}\nTo: {}\n\n{}",
            self.subject, self.sender, self.recipient, self.body
        )
    }
}
