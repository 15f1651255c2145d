//! ESMTP features

use std::collections::HashSet;
use std::fmt::{self, Display, Formatter};
use std::net::{Ipv4Addr, Ipv6Addr};

use crate::error::Error;
use crate::response::Response;

/// Default client id
const DEFAULT_DOMAIN_CLIENT_ID: &str = "localhost";

/// Client identifier, the parameter to `EHLO`
#[derive(PartialEq, Eq, Clone, Debug)]
pub enum ClientId {
    /// A fully-qualified domain name
    Domain(String),
    /// An IPv4 address
    Ipv4(Ipv4Addr),
    /// An IPv6 address
    Ipv6(Ipv6Addr),
}

impl Default for ClientId {
    fn default() -> Self {
        // https://tools.ietf.org/html/rfc5321#section-4.1.4
        // The SMTP client MUST, if possible, ensure that the domain parameter
        // to the EHLO command is a primary host name as specified for this
        // command in Section 2.3.5.
        hostname::get()
            .ok()
            .and_then(|name| name.into_string().ok())
            .filter(|name| !name.is_empty())
            .map(ClientId::Domain)
            .unwrap_or_else(|| ClientId::new(DEFAULT_DOMAIN_CLIENT_ID.to_string()))
    }
}

impl Display for ClientId {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match *self {
            ClientId::Domain(ref value) => f.write_str(value),
            ClientId::Ipv4(ref value) => write!(f, "[{}]", value),
            ClientId::Ipv6(ref value) => write!(f, "[IPv6:{}]", value),
        }
    }
}

impl ClientId {
    /// Creates a new `ClientId` from a fully qualified domain name
    pub fn new(domain: String) -> ClientId {
        ClientId::Domain(domain)
    }
}

/// Supported ESMTP keywords
#[derive(PartialEq, Eq, Hash, Copy, Clone, Debug)]
pub enum Extension {
    /// 8BITMIME keyword
    ///
    /// RFC 6152: https://tools.ietf.org/html/rfc6152
    EightBitMime,
    /// SMTPUTF8 keyword
    ///
    /// RFC 6531: https://tools.ietf.org/html/rfc6531
    SmtpUtfEight,
    /// SIZE keyword
    ///
    /// RFC 1870: https://tools.ietf.org/html/rfc1870
    Size,
}

impl Display for Extension {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match *self {
            Extension::EightBitMime => f.write_str("8BITMIME"),
            Extension::SmtpUtfEight => f.write_str("SMTPUTF8"),
            Extension::Size => f.write_str("SIZE"),
        }
    }
}

/// Contains information about an SMTP server
#[derive(Clone, Debug, Eq, PartialEq, Default)]
pub struct ServerInfo {
    /// Server name
    ///
    /// The name given in the server banner
    pub name: String,
    /// ESMTP features supported by the server
    ///
    /// It contains the features supported by the server and known by the `Extension` module.
    pub features: HashSet<Extension>,
    /// Maximum message size announced with `SIZE`, if any
    pub max_size: Option<usize>,
}

impl Display for ServerInfo {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(
            f,
            "{} with {}",
            self.name,
            if self.features.is_empty() {
                "no supported features".to_string()
            } else {
                format!("{:?}", self.features)
            }
        )
    }
}

impl ServerInfo {
    /// Parses a EHLO (or HELO) response to create a `ServerInfo`
    pub fn from_response(response: &Response) -> Result<ServerInfo, Error> {
        let name = match response.first_word() {
            Some(name) => name,
            None => return Err(Error::ResponseParsing("Could not read server name")),
        };

        let mut features: HashSet<Extension> = HashSet::new();
        let mut max_size = None;

        for line in response.message.as_slice().iter().skip(1) {
            let mut split = line.split_whitespace();
            match split.next().map(str::to_ascii_uppercase).as_deref() {
                Some("8BITMIME") => {
                    features.insert(Extension::EightBitMime);
                }
                Some("SMTPUTF8") => {
                    features.insert(Extension::SmtpUtfEight);
                }
                Some("SIZE") => {
                    features.insert(Extension::Size);
                    // A limit of zero means no fixed maximum
                    max_size = split
                        .next()
                        .and_then(|value| value.parse::<usize>().ok())
                        .filter(|&value| value > 0);
                }
                _ => (),
            };
        }

        Ok(ServerInfo {
            name: name.to_string(),
            features,
            max_size,
        })
    }

    /// Checks if the server supports an ESMTP feature
    pub fn supports_feature(&self, keyword: Extension) -> bool {
        self.features.contains(&keyword)
    }
}

/// A `MAIL FROM` extension parameter
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum MailParameter {
    /// `BODY` parameter
    Body(MailBodyParameter),
    /// `SIZE` parameter
    Size(usize),
    /// `SMTPUTF8` parameter
    SmtpUtfEight,
}

impl Display for MailParameter {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match *self {
            MailParameter::Body(ref value) => write!(f, "BODY={}", value),
            MailParameter::Size(size) => write!(f, "SIZE={}", size),
            MailParameter::SmtpUtfEight => f.write_str("SMTPUTF8"),
        }
    }
}

/// Values for the `BODY` parameter to `MAIL FROM`
#[derive(PartialEq, Eq, Clone, Debug, Copy)]
pub enum MailBodyParameter {
    /// `8BITMIME`
    EightBitMime,
}

impl Display for MailBodyParameter {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match *self {
            MailBodyParameter::EightBitMime => f.write_str("8BITMIME"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::response::parse;

    #[test]
    fn test_clientid_fmt() {
        assert_eq!(
            format!("{}", ClientId::new("test".to_string())),
            "test".to_string()
        );
        assert_eq!(
            format!("{}", ClientId::Ipv4(Ipv4Addr::new(127, 0, 0, 1))),
            "[127.0.0.1]"
        );
        assert!(!ClientId::default().to_string().is_empty());
    }

    #[test]
    fn test_extension_fmt() {
        assert_eq!(format!("{}", Extension::EightBitMime), "8BITMIME");
        assert_eq!(format!("{}", Extension::Size), "SIZE");
    }

    #[test]
    fn test_mail_parameter_fmt() {
        let size = MailParameter::Size(56);
        let parameters = [
            size,
            MailParameter::Body(MailBodyParameter::EightBitMime),
            MailParameter::SmtpUtfEight,
        ];

        assert_eq!(size.to_string(), "SIZE=56");
        assert_eq!(
            parameters
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>(),
            vec!["SIZE=56", "BODY=8BITMIME", "SMTPUTF8"]
        );
    }

    #[test]
    fn test_serverinfo() {
        let response =
            parse("250-relay.local\r\n250-8BITMIME\r\n250-SIZE 1024\r\n250 PIPELINING\r\n")
                .unwrap();
        let server_info = ServerInfo::from_response(&response).unwrap();

        assert_eq!(server_info.name, "relay.local");
        assert!(server_info.supports_feature(Extension::EightBitMime));
        assert!(server_info.supports_feature(Extension::Size));
        assert!(!server_info.supports_feature(Extension::SmtpUtfEight));
        assert_eq!(server_info.max_size, Some(1024));
    }

    #[test]
    fn test_serverinfo_helo() {
        let response = parse("250 relay.local Hello\r\n").unwrap();
        let server_info = ServerInfo::from_response(&response).unwrap();

        assert_eq!(server_info.name, "relay.local");
        assert!(server_info.features.is_empty());
        assert_eq!(
            format!("{}", server_info),
            "relay.local with no supported features"
        );
    }

    #[test]
    fn test_serverinfo_unlimited_size() {
        let response = parse("250-relay.local\r\n250-size 0\r\n250 smtputf8\r\n").unwrap();
        let server_info = ServerInfo::from_response(&response).unwrap();

        assert!(server_info.supports_feature(Extension::Size));
        assert!(server_info.supports_feature(Extension::SmtpUtfEight));
        assert_eq!(server_info.max_size, None);
    }

    #[test]
    fn test_serverinfo_without_name() {
        let response = parse("250\r\n").unwrap();
        assert!(ServerInfo::from_response(&response).is_err());
    }
}
