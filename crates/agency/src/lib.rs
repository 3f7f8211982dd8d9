//! Agency-facing aggregates: verification paperwork and customer inquiries.

pub mod document;
pub mod message;

pub use document::{
    DocumentCommand, DocumentEvent, DocumentFiles, DocumentStatus, DocumentsApproved,
    DocumentsRejected, DocumentsSubmitted, ReviewDecision, ReviewDocuments, SubmitDocuments,
    VerificationDocument,
};
pub use message::{
    DeleteMessage, MarkMessageRead, Message, MessageCommand, MessageDeleted, MessageEvent,
    MessageRead, MessageReplied, MessageSent, MessageStatus, ReplyToMessage, SendMessage,
};
