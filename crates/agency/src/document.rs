//! Agency verification bundle.
//!
//! Exactly one bundle per agency; the store enforces that. Files are opaque
//! references produced by whatever handles uploads.

use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use setu_core::{Aggregate, AggregateRoot, DocumentId, DomainError, UserId};
use setu_events::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Pending,
    Approved,
    Rejected,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Pending => "pending",
            DocumentStatus::Approved => "approved",
            DocumentStatus::Rejected => "rejected",
        }
    }
}

/// Admin verdict on a bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewDecision {
    Approved,
    Rejected,
}

impl FromStr for ReviewDecision {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "approved" => Ok(ReviewDecision::Approved),
            "rejected" => Ok(ReviewDecision::Rejected),
            other => Err(DomainError::invalid_status(format!(
                "review decision must be approved or rejected, got '{other}'"
            ))),
        }
    }
}

/// The three required file references.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentFiles {
    pub business_license: String,
    pub tax_certificate: String,
    pub authorization_letter: String,
}

impl DocumentFiles {
    fn validated(&self) -> Result<DocumentFiles, DomainError> {
        let pick = |v: &str| {
            let t = v.trim();
            (!t.is_empty()).then(|| t.to_string())
        };
        match (
            pick(&self.business_license),
            pick(&self.tax_certificate),
            pick(&self.authorization_letter),
        ) {
            (Some(business_license), Some(tax_certificate), Some(authorization_letter)) => {
                Ok(DocumentFiles {
                    business_license,
                    tax_certificate,
                    authorization_letter,
                })
            }
            _ => Err(DomainError::invalid_request("all documents are required")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationDocument {
    id: DocumentId,
    agency: UserId,
    agency_name: String,
    agency_email: String,
    #[serde(flatten)]
    files: DocumentFiles,
    status: DocumentStatus,
    uploaded_at: Option<DateTime<Utc>>,
    reviewed_at: Option<DateTime<Utc>>,
    reviewed_by: Option<UserId>,
    rejection_reason: Option<String>,
    version: u64,
    #[serde(skip)]
    created: bool,
}

impl VerificationDocument {
    pub fn empty(id: DocumentId) -> Self {
        Self {
            id,
            agency: UserId::from_uuid(Uuid::nil()),
            agency_name: String::new(),
            agency_email: String::new(),
            files: DocumentFiles::default(),
            status: DocumentStatus::Pending,
            uploaded_at: None,
            reviewed_at: None,
            reviewed_by: None,
            rejection_reason: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> DocumentId {
        self.id
    }

    pub fn agency(&self) -> UserId {
        self.agency
    }

    pub fn files(&self) -> &DocumentFiles {
        &self.files
    }

    pub fn status(&self) -> DocumentStatus {
        self.status
    }

    pub fn is_approved(&self) -> bool {
        self.created && self.status == DocumentStatus::Approved
    }

    pub fn uploaded_at(&self) -> Option<DateTime<Utc>> {
        self.uploaded_at
    }

    pub fn reviewed_by(&self) -> Option<UserId> {
        self.reviewed_by
    }

    pub fn rejection_reason(&self) -> Option<&str> {
        self.rejection_reason.as_deref()
    }

    pub fn is_created(&self) -> bool {
        self.created
    }
}

impl AggregateRoot for VerificationDocument {
    type Id = DocumentId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Create the bundle, or replace its files and send it back to review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitDocuments {
    pub document_id: DocumentId,
    pub agency: UserId,
    pub agency_name: String,
    pub agency_email: String,
    pub files: DocumentFiles,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewDocuments {
    pub document_id: DocumentId,
    pub reviewer: UserId,
    pub decision: ReviewDecision,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentCommand {
    Submit(SubmitDocuments),
    Review(ReviewDocuments),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentsSubmitted {
    pub document_id: DocumentId,
    pub agency: UserId,
    pub agency_name: String,
    pub agency_email: String,
    pub files: DocumentFiles,
    pub resubmission: bool,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentsApproved {
    pub document_id: DocumentId,
    pub reviewer: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentsRejected {
    pub document_id: DocumentId,
    pub reviewer: UserId,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentEvent {
    Submitted(DocumentsSubmitted),
    Approved(DocumentsApproved),
    Rejected(DocumentsRejected),
}

impl Event for DocumentEvent {
    fn event_type(&self) -> &'static str {
        match self {
            DocumentEvent::Submitted(_) => "agency.documents.submitted",
            DocumentEvent::Approved(_) => "agency.documents.approved",
            DocumentEvent::Rejected(_) => "agency.documents.rejected",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            DocumentEvent::Submitted(e) => e.occurred_at,
            DocumentEvent::Approved(e) => e.occurred_at,
            DocumentEvent::Rejected(e) => e.occurred_at,
        }
    }
}

impl Aggregate for VerificationDocument {
    type Command = DocumentCommand;
    type Event = DocumentEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            DocumentEvent::Submitted(e) => {
                self.id = e.document_id;
                self.agency = e.agency;
                if !e.resubmission {
                    self.agency_name = e.agency_name.clone();
                    self.agency_email = e.agency_email.clone();
                }
                self.files = e.files.clone();
                self.status = DocumentStatus::Pending;
                self.uploaded_at = Some(e.occurred_at);
                self.reviewed_at = None;
                self.reviewed_by = None;
                self.rejection_reason = None;
                self.created = true;
            }
            DocumentEvent::Approved(e) => {
                self.status = DocumentStatus::Approved;
                self.reviewed_at = Some(e.occurred_at);
                self.reviewed_by = Some(e.reviewer);
                self.rejection_reason = None;
            }
            DocumentEvent::Rejected(e) => {
                self.status = DocumentStatus::Rejected;
                self.reviewed_at = Some(e.occurred_at);
                self.reviewed_by = Some(e.reviewer);
                self.rejection_reason = Some(e.reason.clone());
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            DocumentCommand::Submit(cmd) => self.handle_submit(cmd),
            DocumentCommand::Review(cmd) => self.handle_review(cmd),
        }
    }
}

impl VerificationDocument {
    fn handle_submit(&self, cmd: &SubmitDocuments) -> Result<Vec<DocumentEvent>, DomainError> {
        if self.created {
            if self.id != cmd.document_id {
                return Err(DomainError::invariant("document_id mismatch"));
            }
            if self.agency != cmd.agency {
                return Err(DomainError::forbidden("documents belong to another agency"));
            }
        }
        let files = cmd.files.validated()?;

        Ok(vec![DocumentEvent::Submitted(DocumentsSubmitted {
            document_id: cmd.document_id,
            agency: cmd.agency,
            agency_name: cmd.agency_name.clone(),
            agency_email: cmd.agency_email.clone(),
            files,
            resubmission: self.created,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_review(&self, cmd: &ReviewDocuments) -> Result<Vec<DocumentEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found("documents"));
        }
        if self.id != cmd.document_id {
            return Err(DomainError::invariant("document_id mismatch"));
        }

        match cmd.decision {
            ReviewDecision::Approved => Ok(vec![DocumentEvent::Approved(DocumentsApproved {
                document_id: cmd.document_id,
                reviewer: cmd.reviewer,
                occurred_at: cmd.occurred_at,
            })]),
            ReviewDecision::Rejected => {
                let reason = cmd
                    .reason
                    .as_deref()
                    .map(str::trim)
                    .filter(|r| !r.is_empty())
                    .ok_or_else(|| DomainError::invalid_request("rejection reason is required"))?;
                Ok(vec![DocumentEvent::Rejected(DocumentsRejected {
                    document_id: cmd.document_id,
                    reviewer: cmd.reviewer,
                    reason: reason.to_string(),
                    occurred_at: cmd.occurred_at,
                })])
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn files() -> DocumentFiles {
        DocumentFiles {
            business_license: "license.pdf".to_string(),
            tax_certificate: "tax.pdf".to_string(),
            authorization_letter: "auth.pdf".to_string(),
        }
    }

    fn submit(
        doc: &mut VerificationDocument,
        agency: UserId,
        files: DocumentFiles,
    ) -> Result<Vec<DocumentEvent>, DomainError> {
        let document_id = doc.id_typed();
        doc.execute(&DocumentCommand::Submit(SubmitDocuments {
            document_id,
            agency,
            agency_name: "Customs Pune".to_string(),
            agency_email: "customs@example.gov".to_string(),
            files,
            occurred_at: Utc::now(),
        }))
    }

    fn review(
        doc: &VerificationDocument,
        decision: ReviewDecision,
        reason: Option<&str>,
    ) -> Result<Vec<DocumentEvent>, DomainError> {
        doc.handle(&DocumentCommand::Review(ReviewDocuments {
            document_id: doc.id_typed(),
            reviewer: UserId::new(),
            decision,
            reason: reason.map(str::to_string),
            occurred_at: Utc::now(),
        }))
    }

    #[test]
    fn all_three_files_are_required() {
        let mut doc = VerificationDocument::empty(DocumentId::new());
        let missing = DocumentFiles {
            tax_certificate: "  ".to_string(),
            ..files()
        };
        match submit(&mut doc, UserId::new(), missing) {
            Err(DomainError::InvalidRequest(_)) => {}
            other => panic!("Expected InvalidRequest, got {other:?}"),
        }
        assert!(!doc.is_created());
    }

    #[test]
    fn rejection_needs_reason_and_resubmission_resets() {
        let agency = UserId::new();
        let mut doc = VerificationDocument::empty(DocumentId::new());
        submit(&mut doc, agency, files()).unwrap();
        assert_eq!(doc.status(), DocumentStatus::Pending);

        match review(&doc, ReviewDecision::Rejected, Some(" ")) {
            Err(DomainError::InvalidRequest(_)) => {}
            other => panic!("Expected InvalidRequest, got {other:?}"),
        }

        for e in &review(&doc, ReviewDecision::Rejected, Some("blurry scan")).unwrap() {
            doc.apply(e);
        }
        assert_eq!(doc.status(), DocumentStatus::Rejected);
        assert_eq!(doc.rejection_reason(), Some("blurry scan"));

        submit(&mut doc, agency, files()).unwrap();
        assert_eq!(doc.status(), DocumentStatus::Pending);
        assert_eq!(doc.rejection_reason(), None);
        assert_eq!(doc.reviewed_by(), None);
        assert_eq!(doc.version(), 3);
    }

    #[test]
    fn approval_marks_verified() {
        let mut doc = VerificationDocument::empty(DocumentId::new());
        submit(&mut doc, UserId::new(), files()).unwrap();
        for e in &review(&doc, ReviewDecision::Approved, None).unwrap() {
            doc.apply(e);
        }
        assert!(doc.is_approved());
        assert!(doc.reviewed_by().is_some());
    }

    #[test]
    fn other_agency_cannot_resubmit() {
        let mut doc = VerificationDocument::empty(DocumentId::new());
        submit(&mut doc, UserId::new(), files()).unwrap();
        match submit(&mut doc, UserId::new(), files()) {
            Err(DomainError::Forbidden(_)) => {}
            other => panic!("Expected Forbidden, got {other:?}"),
        }
    }

    #[test]
    fn decision_parsing() {
        assert_eq!("Approved".parse::<ReviewDecision>().unwrap(), ReviewDecision::Approved);
        match "maybe".parse::<ReviewDecision>() {
            Err(DomainError::InvalidStatus(_)) => {}
            other => panic!("Expected InvalidStatus, got {other:?}"),
        }
    }

    #[test]
    fn review_of_missing_bundle_is_not_found() {
        let doc = VerificationDocument::empty(DocumentId::new());
        assert_eq!(
            review(&doc, ReviewDecision::Approved, None).unwrap_err(),
            DomainError::not_found("documents")
        );
    }
}
