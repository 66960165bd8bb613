//! Console stand-in for the chat platform.
//!
//! Every member has a chat with its own copy id sequence. Sends, retractions
//! and notices are written as one line each to the configured writer.

use async_trait::async_trait;
use parking_lot::Mutex;
use relay_core::ports::{Notifier, OutboundPayload, SystemNotice, Transport, TransportError};
use shared_types::{CopyId, RecipientId};
use std::collections::{HashMap, HashSet};
use std::io::Write;

#[derive(Default)]
struct Chat {
    last_copy: i64,
    live: HashSet<CopyId>,
}

impl Chat {
    fn post(&mut self) -> CopyId {
        self.last_copy += 1;
        let copy = CopyId(self.last_copy);
        self.live.insert(copy);
        copy
    }
}

/// Transport and notifier printing to a writer.
pub struct ConsoleTransport {
    out: Mutex<Box<dyn Write + Send>>,
    chats: Mutex<HashMap<RecipientId, Chat>>,
}

impl ConsoleTransport {
    /// Print to standard output.
    pub fn stdout() -> Self {
        Self::with_writer(std::io::stdout())
    }

    pub fn with_writer(writer: impl Write + Send + 'static) -> Self {
        Self {
            out: Mutex::new(Box::new(writer)),
            chats: Mutex::new(HashMap::new()),
        }
    }

    /// Post a message a member typed into their own chat.
    pub fn post_origin(&self, sender: RecipientId) -> CopyId {
        self.chats.lock().entry(sender).or_default().post()
    }

    /// Whether `copy` is still visible in `recipient`'s chat.
    pub fn holds(&self, recipient: RecipientId, copy: CopyId) -> bool {
        self.chats
            .lock()
            .get(&recipient)
            .is_some_and(|chat| chat.live.contains(&copy))
    }

    fn emit(&self, line: &str) -> Result<(), TransportError> {
        let stamp = chrono::Local::now().format("%H:%M:%S");
        let mut out = self.out.lock();
        writeln!(out, "[{stamp}] {line}")
            .and_then(|()| out.flush())
            .map_err(|e| TransportError::Failed(e.to_string()))
    }
}

fn reply_marker(reply_to: Option<CopyId>) -> String {
    reply_to.map(|copy| format!(" (re #{copy})")).unwrap_or_default()
}

#[async_trait]
impl Transport for ConsoleTransport {
    async fn send(
        &self,
        recipient: RecipientId,
        payload: OutboundPayload,
    ) -> Result<CopyId, TransportError> {
        let copy = self.chats.lock().entry(recipient).or_default().post();
        let body = if payload.text.is_empty() {
            format!("<{}>", payload.content)
        } else {
            payload.text
        };
        let forwarded = if payload.forwarded { " [fwd]" } else { "" };
        self.emit(&format!(
            "-> {recipient} #{copy}{}{forwarded}: {body}",
            reply_marker(payload.reply_to)
        ))?;
        Ok(copy)
    }

    async fn retract(&self, recipient: RecipientId, copy: CopyId) -> Result<(), TransportError> {
        let removed = self
            .chats
            .lock()
            .get_mut(&recipient)
            .is_some_and(|chat| chat.live.remove(&copy));
        if !removed {
            return Err(TransportError::Failed(format!(
                "message #{copy} not found in chat {recipient}"
            )));
        }
        self.emit(&format!("xx {recipient} #{copy} deleted"))
    }
}

#[async_trait]
impl Notifier for ConsoleTransport {
    async fn notify(
        &self,
        recipient: RecipientId,
        notice: SystemNotice,
        reply_to: Option<CopyId>,
    ) -> Result<(), TransportError> {
        self.emit(&format!("!! {recipient}{}: {notice}", reply_marker(reply_to)))
    }
}
