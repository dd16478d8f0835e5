use std::io::{self, Write};
use thiserror::Error;

use super::Message;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Failed to write message: {0}")]
    Io(#[from] io::Error),
}

/// Delivers composed messages.
///
/// Mail transport lives outside talkbot; implement this to hand messages to
/// whatever sends them.
pub trait Dispatcher {
    fn dispatch(&mut self, recipients: &[String], message: &Message) -> Result<(), DispatchError>;
}

/// Writes messages as RFC 822-style text, one after another.
///
/// Suitable for piping into `sendmail -t` or for dry runs.
pub struct StdoutDispatcher<W: Write = io::Stdout> {
    out: W,
}

impl<W: Write> StdoutDispatcher<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Dispatcher for StdoutDispatcher<W> {
    fn dispatch(&mut self, recipients: &[String], message: &Message) -> Result<(), DispatchError> {
        if recipients.is_empty() {
            tracing::warn!(subject = %message.subject, "Message has no recipients");
        }
        writeln!(self.out, "To: {}", recipients.join(", "))?;
        writeln!(self.out, "Subject: {}", message.subject)?;
        writeln!(self.out)?;
        write!(self.out, "{}", message.body)?;
        if !message.body.ends_with('\n') {
            writeln!(self.out)?;
        }
        self.out.flush()?;
        Ok(())
    }
}
