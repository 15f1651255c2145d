use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use crate::codec::message_size;
use crate::error::{AddressError, EmailResult};

/// Email address
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Takes an address as typed, either a bare mailbox or the
    /// `Name <mailbox>` form. Only the mailbox is kept.
    pub fn new(address: String) -> EmailResult<EmailAddress> {
        let address = address.trim();
        // Only refuse what could break out of the command line. Actual email
        // validation should be done by the server.
        if address.chars().any(char::is_control) {
            return Err(AddressError::InvalidEmailAddress);
        }

        let mailbox = match address.rfind('<') {
            Some(start) => {
                let rest = &address[start + 1..];
                match rest.find('>') {
                    Some(end) => &rest[..end],
                    None => return Err(AddressError::InvalidEmailAddress),
                }
            }
            None => address,
        };
        if mailbox.contains('>') {
            return Err(AddressError::InvalidEmailAddress);
        }

        Ok(EmailAddress(mailbox.trim().to_string()))
    }

    /// The empty address, used as the null reverse-path `<>`
    pub fn is_null(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether the address needs the SMTPUTF8 extension
    pub fn is_ascii(&self) -> bool {
        self.0.is_ascii()
    }
}

impl FromStr for EmailAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EmailAddress::new(s.to_string())
    }
}

impl Display for EmailAddress {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for EmailAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Simple email envelope representation
///
/// We only accept mailboxes, and do not support source routes (as per RFC).
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Envelope {
    /// The envelope recipients' addresses
    ///
    /// This can not be empty.
    forward_path: Vec<EmailAddress>,
    /// The envelope sender address
    reverse_path: Option<EmailAddress>,
}

impl Envelope {
    /// Creates a new envelope, which may fail if `to` is empty.
    pub fn new(from: Option<EmailAddress>, to: Vec<EmailAddress>) -> EmailResult<Envelope> {
        if to.is_empty() {
            return Err(AddressError::MissingTo);
        }
        Ok(Envelope {
            forward_path: to,
            reverse_path: from.filter(|address| !address.is_null()),
        })
    }

    /// Envelope for a single recipient, built from raw console input.
    pub fn single(from: &str, to: &str) -> EmailResult<Envelope> {
        Envelope::new(Some(from.parse()?), vec![to.parse()?])
    }

    /// Destination addresses of the envelope
    pub fn to(&self) -> &[EmailAddress] {
        self.forward_path.as_slice()
    }

    /// Source address of the envelope
    pub fn from(&self) -> Option<&EmailAddress> {
        self.reverse_path.as_ref()
    }

    /// Whether any address needs SMTPUTF8
    pub fn has_utf8_address(&self) -> bool {
        self.reverse_path
            .iter()
            .chain(self.forward_path.iter())
            .any(|address| !address.is_ascii())
    }
}

/// Sendable email structure
#[derive(Clone, Debug)]
pub struct SendableEmail {
    envelope: Envelope,
    message: Vec<u8>,
}

impl SendableEmail {
    pub fn new<T: AsRef<[u8]>>(envelope: Envelope, message: T) -> SendableEmail {
        SendableEmail {
            envelope,
            message: message.as_ref().to_vec(),
        }
    }

    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    pub fn message(&self) -> &[u8] {
        &self.message
    }

    /// Size of the content on the wire, as announced with `SIZE`
    pub fn size(&self) -> usize {
        message_size(&self.message)
    }

    /// Whether the content uses bytes outside of 7-bit ASCII
    pub fn is_eight_bit(&self) -> bool {
        !self.message.is_ascii()
    }
}
