//! Console input for composing a message.

use std::io::{self, BufRead, Write};

use crate::message::EmailMessage;

pub const SENDER_PROMPT: &str = "Enter sender email: ";
pub const RECIPIENT_PROMPT: &str = "Enter recipient email: ";
pub const SUBJECT_PROMPT: &str = "Enter email subject: ";
pub const BODY_PROMPT: &str = "Enter email message: ";

/// Source of answers to questions asked of the user
pub trait Prompt {
    /// Asks `question` and returns the answer without its line terminator.
    fn ask(&mut self, question: &str) -> io::Result<String>;
}

/// Asks on a writer and reads the answers line by line from a reader.
#[derive(Debug)]
pub struct ConsolePrompt<R: BufRead, W: Write> {
    input: R,
    output: W,
}

impl ConsolePrompt<io::StdinLock<'static>, io::Stdout> {
    /// Prompt on the process terminal
    pub fn stdio() -> Self {
        ConsolePrompt::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> ConsolePrompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        ConsolePrompt { input, output }
    }

    pub fn into_inner(self) -> (R, W) {
        (self.input, self.output)
    }
}

impl<R: BufRead, W: Write> Prompt for ConsolePrompt<R, W> {
    fn ask(&mut self, question: &str) -> io::Result<String> {
        self.output.write_all(question.as_bytes())?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "input closed before an answer was given",
            ));
        }
        if line.ends_with('\n') {
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
        }
        Ok(line)
    }
}

/// The four answers needed to build a message
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Draft {
    pub sender: String,
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

impl Draft {
    /// Asks for sender, recipient, subject and body, in that order.
    pub fn collect<P: Prompt>(prompt: &mut P) -> io::Result<Draft> {
        Ok(Draft {
            sender: prompt.ask(SENDER_PROMPT)?,
            recipient: prompt.ask(RECIPIENT_PROMPT)?,
            subject: prompt.ask(SUBJECT_PROMPT)?,
            body: prompt.ask(BODY_PROMPT)?,
        })
    }

    pub fn into_message(self) -> EmailMessage {
        EmailMessage::build(self.sender, self.recipient, self.subject, self.body)
    }
}

impl From<Draft> for EmailMessage {
    fn from(draft: Draft) -> EmailMessage {
        draft.into_message()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use std::io::Cursor;

    fn console(input: &str) -> ConsolePrompt<Cursor<Vec<u8>>, Vec<u8>> {
        ConsolePrompt::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    #[test]
    fn test_ask() {
        let mut prompt = console("a@x.com\r\nb@y.com\nlast");
        assert_eq!(prompt.ask("first? ").unwrap(), "a@x.com");
        assert_eq!(prompt.ask("second? ").unwrap(), "b@y.com");
        assert_eq!(prompt.ask("third? ").unwrap(), "last");

        let (_, output) = prompt.into_inner();
        assert_eq!(String::from_utf8(output).unwrap(), "first? second? third? ");
    }

    #[test]
    fn test_ask_keeps_spaces() {
        let mut prompt = console("  padded \n\n");
        assert_eq!(prompt.ask("").unwrap(), "  padded ");
        assert_eq!(prompt.ask("").unwrap(), "");
    }

    #[test]
    fn test_ask_eof() {
        let err = console("").ask("anyone? ").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_collect() {
        let mut prompt = console("a@x.com\nb@y.com\nHi\nHello there\n");
        let draft = Draft::collect(&mut prompt).unwrap();
        assert_eq!(
            draft,
            Draft {
                sender: "a@x.com".to_string(),
                recipient: "b@y.com".to_string(),
                subject: "Hi".to_string(),
                body: "Hello there".to_string(),
            }
        );

        let (_, output) = prompt.into_inner();
        assert_eq!(
            String::from_utf8(output).unwrap(),
            "Enter sender email: Enter recipient email: \
             Enter email subject: Enter email message: "
        );

        let message: EmailMessage = draft.into();
        assert_eq!(
            message.formatted(),
            "Subject: Hi\nFrom: a@x.com\nTo: b@y.com\n\nHello there"
        );
    }

    #[test]
    fn test_collect_short_input() {
        let mut prompt = console("a@x.com\nb@y.com\n");
        let err = Draft::collect(&mut prompt).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }
}
