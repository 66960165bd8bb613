//! Formatter that relays content as received.

use shared_types::{CopyId, InboundMessage, RecipientId};

use crate::ports::outbound::{MessageFormatter, OutboundPayload};

/// Copies the inbound content into the payload and attaches the reply target.
#[derive(Clone, Copy, Debug, Default)]
pub struct PlainFormatter;

impl MessageFormatter for PlainFormatter {
    fn format(
        &self,
        message: &InboundMessage,
        _recipient: RecipientId,
        reply_to: Option<CopyId>,
    ) -> OutboundPayload {
        OutboundPayload {
            content: message.content,
            text: message.text.clone(),
            file: message.file.clone(),
            forwarded: message.forwarded,
            reply_to,
        }
    }
}
