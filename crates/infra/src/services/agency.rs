//! Agency verification paperwork and the customer inquiry inbox.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use setu_agency::{
    DeleteMessage, DocumentCommand, DocumentFiles, DocumentStatus, MarkMessageRead, Message,
    MessageCommand, MessageStatus, ReplyToMessage, ReviewDecision, ReviewDocuments, SendMessage,
    SubmitDocuments, VerificationDocument,
};
use setu_auth::{Caller, Role};
use setu_core::{DocumentId, DomainError, MessageId, ProductId, UserId};
use setu_events::{EventBus, EventEnvelope};

use super::{ServiceContext, newest_first};
use crate::command_dispatcher::{Tracked, UnitOfWork};
use crate::error::ServiceResult;
use crate::store::MarketStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub agency: UserId,
    #[serde(default)]
    pub product: Option<ProductId>,
    pub subject: String,
    pub body: String,
}

/// `status` is `"none"` until the agency has submitted anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationStatus {
    pub is_verified: bool,
    pub status: String,
}

pub struct AgencyService<S, B> {
    ctx: ServiceContext<S, B>,
}

impl<S, B> AgencyService<S, B> {
    pub fn new(ctx: ServiceContext<S, B>) -> Self {
        Self { ctx }
    }
}

impl<S, B> AgencyService<S, B>
where
    S: MarketStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    /// Create the agency's bundle, or replace it and send it back to review.
    pub fn submit_documents(
        &self,
        caller: &Caller,
        files: DocumentFiles,
    ) -> ServiceResult<VerificationDocument> {
        self.ctx.authorize_write(caller, &[Role::Agency])?;
        let mut document = match self.ctx.store().document_for_agency(caller.user_id)? {
            Some(existing) => Tracked::loaded(existing),
            None => Tracked::fresh(VerificationDocument::empty(DocumentId::new())),
        };
        let document_id = document.get().id_typed();

        let mut work = UnitOfWork::new();
        work.execute(
            &mut document,
            &DocumentCommand::Submit(SubmitDocuments {
                document_id,
                agency: caller.user_id,
                agency_name: caller.name.clone(),
                agency_email: caller.email.clone(),
                files,
                occurred_at: Utc::now(),
            }),
        )?;
        work.put(&document);
        self.ctx.commit(work)?;

        tracing::info!(document_id = %document_id, agency = %caller.user_id, "verification documents submitted");
        Ok(document.into_inner())
    }

    pub fn review_documents(
        &self,
        caller: &Caller,
        document_id: DocumentId,
        decision: &str,
        reason: Option<String>,
    ) -> ServiceResult<VerificationDocument> {
        self.ctx.authorize_write(caller, &[Role::Admin])?;
        let decision: ReviewDecision = decision.parse()?;
        let mut document = self
            .ctx
            .store()
            .document(document_id)?
            .map(Tracked::loaded)
            .ok_or_else(|| DomainError::not_found("documents"))?;

        let mut work = UnitOfWork::new();
        work.execute(
            &mut document,
            &DocumentCommand::Review(ReviewDocuments {
                document_id,
                reviewer: caller.user_id,
                decision,
                reason,
                occurred_at: Utc::now(),
            }),
        )?;
        work.put(&document);
        self.ctx.commit(work)?;

        let document = document.into_inner();
        tracing::info!(
            document_id = %document_id,
            agency = %document.agency(),
            status = document.status().as_str(),
            "verification documents reviewed"
        );
        Ok(document)
    }

    pub fn my_documents(&self, agency: UserId) -> ServiceResult<Option<VerificationDocument>> {
        Ok(self.ctx.store().document_for_agency(agency)?)
    }

    pub fn verification_status(&self, agency: UserId) -> ServiceResult<VerificationStatus> {
        Ok(match self.my_documents(agency)? {
            Some(doc) => VerificationStatus {
                is_verified: doc.is_approved(),
                status: doc.status().as_str().to_string(),
            },
            None => VerificationStatus {
                is_verified: false,
                status: "none".to_string(),
            },
        })
    }

    pub fn pending_documents(&self) -> ServiceResult<Vec<VerificationDocument>> {
        self.documents(&|d| d.status() == DocumentStatus::Pending)
    }

    pub fn all_documents(&self) -> ServiceResult<Vec<VerificationDocument>> {
        self.documents(&|_| true)
    }

    pub fn send_message(&self, caller: &Caller, request: SendMessageRequest) -> ServiceResult<Message> {
        self.ctx.authorize_write(caller, &[Role::Customer])?;
        let message_id = MessageId::new();
        let mut message = Tracked::fresh(Message::empty(message_id));

        let mut work = UnitOfWork::new();
        work.execute(
            &mut message,
            &MessageCommand::Send(SendMessage {
                message_id,
                product: request.product,
                customer: caller.user_id,
                customer_name: caller.name.clone(),
                customer_email: caller.email.clone(),
                agency: request.agency,
                subject: request.subject,
                body: request.body,
                occurred_at: Utc::now(),
            }),
        )?;
        work.put(&message);
        self.ctx.commit(work)?;

        tracing::info!(message_id = %message_id, customer = %caller.user_id, agency = %request.agency, "message sent");
        Ok(message.into_inner())
    }

    pub fn agency_messages(
        &self,
        agency: UserId,
        status: Option<MessageStatus>,
    ) -> ServiceResult<Vec<Message>> {
        self.messages(&|m| m.agency() == agency && status.is_none_or(|s| m.status() == s))
    }

    pub fn customer_messages(&self, customer: UserId) -> ServiceResult<Vec<Message>> {
        self.messages(&|m| m.customer() == customer)
    }

    pub fn unread_count(&self, agency: UserId) -> ServiceResult<usize> {
        Ok(self
            .ctx
            .store()
            .find_messages(&|m| m.agency() == agency && m.status() == MessageStatus::Unread)?
            .len())
    }

    pub fn mark_read(&self, caller: &Caller, message_id: MessageId) -> ServiceResult<Message> {
        self.ctx.authorize_write(caller, &[Role::Agency])?;
        let mut message = self.load_message(message_id)?;

        let mut work = UnitOfWork::new();
        work.execute(
            &mut message,
            &MessageCommand::MarkRead(MarkMessageRead {
                message_id,
                agency: caller.user_id,
                occurred_at: Utc::now(),
            }),
        )?;
        work.put(&message);
        self.ctx.commit(work)?;
        Ok(message.into_inner())
    }

    pub fn reply(&self, caller: &Caller, message_id: MessageId, reply: &str) -> ServiceResult<Message> {
        self.ctx.authorize_write(caller, &[Role::Agency])?;
        let mut message = self.load_message(message_id)?;

        let mut work = UnitOfWork::new();
        work.execute(
            &mut message,
            &MessageCommand::Reply(ReplyToMessage {
                message_id,
                agency: caller.user_id,
                reply: reply.to_string(),
                occurred_at: Utc::now(),
            }),
        )?;
        work.put(&message);
        self.ctx.commit(work)?;

        tracing::info!(message_id = %message_id, agency = %caller.user_id, "message replied");
        Ok(message.into_inner())
    }

    pub fn delete_message(&self, caller: &Caller, message_id: MessageId) -> ServiceResult<()> {
        self.ctx.authorize_write(caller, &[Role::Agency])?;
        let mut message = self.load_message(message_id)?;

        let mut work = UnitOfWork::new();
        work.execute(
            &mut message,
            &MessageCommand::Delete(DeleteMessage {
                message_id,
                agency: caller.user_id,
                occurred_at: Utc::now(),
            }),
        )?;
        work.delete(&message);
        self.ctx.commit(work)?;
        Ok(())
    }

    fn documents(
        &self,
        filter: &dyn Fn(&VerificationDocument) -> bool,
    ) -> ServiceResult<Vec<VerificationDocument>> {
        let mut documents = self.ctx.store().find_documents(filter)?;
        newest_first(&mut documents, |d| (d.uploaded_at(), d.id_typed()));
        Ok(documents)
    }

    fn messages(&self, filter: &dyn Fn(&Message) -> bool) -> ServiceResult<Vec<Message>> {
        let mut messages = self.ctx.store().find_messages(filter)?;
        newest_first(&mut messages, |m| (m.created_at(), m.id_typed()));
        Ok(messages)
    }

    fn load_message(&self, message_id: MessageId) -> ServiceResult<Tracked<Message>> {
        self.ctx
            .store()
            .message(message_id)?
            .map(Tracked::loaded)
            .ok_or_else(|| DomainError::not_found("message").into())
    }
}
