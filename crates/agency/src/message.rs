//! Customer inquiries addressed to an agency.

use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use setu_core::{Aggregate, AggregateRoot, DomainError, MessageId, ProductId, UserId};
use setu_events::Event;

/// Inbox state. `replied` wins over `read`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Unread,
    Read,
    Replied,
}

impl FromStr for MessageStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unread" => Ok(MessageStatus::Unread),
            "read" => Ok(MessageStatus::Read),
            "replied" => Ok(MessageStatus::Replied),
            other => Err(DomainError::invalid_status(format!("unknown message status '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    id: MessageId,
    product: Option<ProductId>,
    customer: UserId,
    customer_name: String,
    customer_email: String,
    agency: UserId,
    subject: String,
    body: String,
    status: MessageStatus,
    reply: Option<String>,
    replied_at: Option<DateTime<Utc>>,
    created_at: Option<DateTime<Utc>>,
    version: u64,
    #[serde(skip)]
    created: bool,
}

impl Message {
    pub fn empty(id: MessageId) -> Self {
        Self {
            id,
            product: None,
            customer: UserId::from_uuid(Uuid::nil()),
            customer_name: String::new(),
            customer_email: String::new(),
            agency: UserId::from_uuid(Uuid::nil()),
            subject: String::new(),
            body: String::new(),
            status: MessageStatus::Unread,
            reply: None,
            replied_at: None,
            created_at: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> MessageId {
        self.id
    }

    pub fn customer(&self) -> UserId {
        self.customer
    }

    pub fn agency(&self) -> UserId {
        self.agency
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn status(&self) -> MessageStatus {
        self.status
    }

    pub fn reply(&self) -> Option<&str> {
        self.reply.as_deref()
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn is_created(&self) -> bool {
        self.created
    }
}

impl AggregateRoot for Message {
    type Id = MessageId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendMessage {
    pub message_id: MessageId,
    pub product: Option<ProductId>,
    pub customer: UserId,
    pub customer_name: String,
    pub customer_email: String,
    pub agency: UserId,
    pub subject: String,
    pub body: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkMessageRead {
    pub message_id: MessageId,
    pub agency: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyToMessage {
    pub message_id: MessageId,
    pub agency: UserId,
    pub reply: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteMessage {
    pub message_id: MessageId,
    pub agency: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageCommand {
    Send(SendMessage),
    MarkRead(MarkMessageRead),
    Reply(ReplyToMessage),
    Delete(DeleteMessage),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageSent {
    pub message_id: MessageId,
    pub product: Option<ProductId>,
    pub customer: UserId,
    pub customer_name: String,
    pub customer_email: String,
    pub agency: UserId,
    pub subject: String,
    pub body: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRead {
    pub message_id: MessageId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageReplied {
    pub message_id: MessageId,
    pub reply: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageDeleted {
    pub message_id: MessageId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageEvent {
    Sent(MessageSent),
    Read(MessageRead),
    Replied(MessageReplied),
    Deleted(MessageDeleted),
}

impl Event for MessageEvent {
    fn event_type(&self) -> &'static str {
        match self {
            MessageEvent::Sent(_) => "agency.message.sent",
            MessageEvent::Read(_) => "agency.message.read",
            MessageEvent::Replied(_) => "agency.message.replied",
            MessageEvent::Deleted(_) => "agency.message.deleted",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            MessageEvent::Sent(e) => e.occurred_at,
            MessageEvent::Read(e) => e.occurred_at,
            MessageEvent::Replied(e) => e.occurred_at,
            MessageEvent::Deleted(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Message {
    type Command = MessageCommand;
    type Event = MessageEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            MessageEvent::Sent(e) => {
                self.id = e.message_id;
                self.product = e.product;
                self.customer = e.customer;
                self.customer_name = e.customer_name.clone();
                self.customer_email = e.customer_email.clone();
                self.agency = e.agency;
                self.subject = e.subject.clone();
                self.body = e.body.clone();
                self.status = MessageStatus::Unread;
                self.created_at = Some(e.occurred_at);
                self.created = true;
            }
            MessageEvent::Read(_) => self.status = MessageStatus::Read,
            MessageEvent::Replied(e) => {
                self.status = MessageStatus::Replied;
                self.reply = Some(e.reply.clone());
                self.replied_at = Some(e.occurred_at);
            }
            // The store drops the document; nothing left to evolve.
            MessageEvent::Deleted(_) => {}
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            MessageCommand::Send(cmd) => self.handle_send(cmd),
            MessageCommand::MarkRead(cmd) => self.handle_mark_read(cmd),
            MessageCommand::Reply(cmd) => self.handle_reply(cmd),
            MessageCommand::Delete(cmd) => self.handle_delete(cmd),
        }
    }
}

impl Message {
    fn ensure_addressed_to(&self, message_id: MessageId, agency: UserId) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found("message"));
        }
        if self.id != message_id {
            return Err(DomainError::invariant("message_id mismatch"));
        }
        if self.agency != agency {
            return Err(DomainError::forbidden("message is addressed to another agency"));
        }
        Ok(())
    }

    fn handle_send(&self, cmd: &SendMessage) -> Result<Vec<MessageEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("message already exists"));
        }
        let subject = cmd.subject.trim();
        let body = cmd.body.trim();
        if subject.is_empty() {
            return Err(DomainError::invalid_request("subject is required"));
        }
        if body.is_empty() {
            return Err(DomainError::invalid_request("message is required"));
        }

        Ok(vec![MessageEvent::Sent(MessageSent {
            message_id: cmd.message_id,
            product: cmd.product,
            customer: cmd.customer,
            customer_name: cmd.customer_name.clone(),
            customer_email: cmd.customer_email.clone(),
            agency: cmd.agency,
            subject: subject.to_string(),
            body: body.to_string(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_mark_read(&self, cmd: &MarkMessageRead) -> Result<Vec<MessageEvent>, DomainError> {
        self.ensure_addressed_to(cmd.message_id, cmd.agency)?;

        if self.status != MessageStatus::Unread {
            return Ok(vec![]);
        }
        Ok(vec![MessageEvent::Read(MessageRead {
            message_id: cmd.message_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_reply(&self, cmd: &ReplyToMessage) -> Result<Vec<MessageEvent>, DomainError> {
        self.ensure_addressed_to(cmd.message_id, cmd.agency)?;

        let reply = cmd.reply.trim();
        if reply.is_empty() {
            return Err(DomainError::invalid_request("reply cannot be empty"));
        }
        Ok(vec![MessageEvent::Replied(MessageReplied {
            message_id: cmd.message_id,
            reply: reply.to_string(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_delete(&self, cmd: &DeleteMessage) -> Result<Vec<MessageEvent>, DomainError> {
        self.ensure_addressed_to(cmd.message_id, cmd.agency)?;

        Ok(vec![MessageEvent::Deleted(MessageDeleted {
            message_id: cmd.message_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}
