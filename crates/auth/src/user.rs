//! User account aggregate.
//!
//! Credentials arrive already hashed; hashing and token issuing belong to the
//! identity provider, not to this crate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use setu_core::{Aggregate, AggregateRoot, DomainError, UserId};
use setu_events::Event;

use crate::Role;

/// User account status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    #[default]
    Active,
    Suspended,
}

/// User aggregate.
///
/// # Invariants
/// - Email is stored trimmed and lowercased; uniqueness is enforced by the store.
/// - Role never changes after registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub credential_hash: String,
    pub role: Role,
    pub status: UserStatus,
    pub created_at: Option<DateTime<Utc>>,
    pub version: u64,
    #[serde(skip_serializing)]
    pub created: bool,
}

impl User {
    pub fn empty(id: UserId) -> Self {
        Self {
            id,
            name: String::new(),
            email: String::new(),
            credential_hash: String::new(),
            role: Role::Customer,
            status: UserStatus::Active,
            created_at: None,
            version: 0,
            created: false,
        }
    }

    pub fn is_suspended(&self) -> bool {
        self.status == UserStatus::Suspended
    }
}

impl AggregateRoot for User {
    type Id = UserId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterUser {
    pub user_id: UserId,
    pub name: String,
    pub email: String,
    pub credential_hash: String,
    pub role: Role,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuspendUser {
    pub user_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactivateUser {
    pub user_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserCommand {
    Register(RegisterUser),
    Suspend(SuspendUser),
    Reactivate(ReactivateUser),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRegistered {
    pub user_id: UserId,
    pub name: String,
    pub email: String,
    pub credential_hash: String,
    pub role: Role,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSuspended {
    pub user_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserReactivated {
    pub user_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserEvent {
    Registered(UserRegistered),
    Suspended(UserSuspended),
    Reactivated(UserReactivated),
}

impl Event for UserEvent {
    fn event_type(&self) -> &'static str {
        match self {
            UserEvent::Registered(_) => "auth.user.registered",
            UserEvent::Suspended(_) => "auth.user.suspended",
            UserEvent::Reactivated(_) => "auth.user.reactivated",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            UserEvent::Registered(e) => e.occurred_at,
            UserEvent::Suspended(e) => e.occurred_at,
            UserEvent::Reactivated(e) => e.occurred_at,
        }
    }
}

impl Aggregate for User {
    type Command = UserCommand;
    type Event = UserEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            UserEvent::Registered(e) => {
                self.id = e.user_id;
                self.name = e.name.clone();
                self.email = e.email.clone();
                self.credential_hash = e.credential_hash.clone();
                self.role = e.role;
                self.status = UserStatus::Active;
                self.created_at = Some(e.occurred_at);
                self.created = true;
            }
            UserEvent::Suspended(_) => self.status = UserStatus::Suspended,
            UserEvent::Reactivated(_) => self.status = UserStatus::Active,
        }
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            UserCommand::Register(cmd) => self.handle_register(cmd),
            UserCommand::Suspend(cmd) => self.handle_suspend(cmd),
            UserCommand::Reactivate(cmd) => self.handle_reactivate(cmd),
        }
    }
}

impl User {
    fn ensure_exists(&self, user_id: UserId) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found("user"));
        }
        if self.id != user_id {
            return Err(DomainError::invariant("user_id mismatch"));
        }
        Ok(())
    }

    fn handle_register(&self, cmd: &RegisterUser) -> Result<Vec<UserEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("user already exists"));
        }

        let email = cmd.email.trim().to_lowercase();
        if email.is_empty() || !email.contains('@') {
            return Err(DomainError::invalid_request("invalid email format"));
        }
        if cmd.name.trim().is_empty() {
            return Err(DomainError::invalid_request("name cannot be empty"));
        }
        if cmd.credential_hash.is_empty() {
            return Err(DomainError::invalid_request("credential is required"));
        }

        Ok(vec![UserEvent::Registered(UserRegistered {
            user_id: cmd.user_id,
            name: cmd.name.trim().to_string(),
            email,
            credential_hash: cmd.credential_hash.clone(),
            role: cmd.role,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_suspend(&self, cmd: &SuspendUser) -> Result<Vec<UserEvent>, DomainError> {
        self.ensure_exists(cmd.user_id)?;

        if self.status == UserStatus::Suspended {
            return Err(DomainError::invalid_transition("user already suspended"));
        }

        Ok(vec![UserEvent::Suspended(UserSuspended {
            user_id: cmd.user_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_reactivate(&self, cmd: &ReactivateUser) -> Result<Vec<UserEvent>, DomainError> {
        self.ensure_exists(cmd.user_id)?;

        if self.status == UserStatus::Active {
            return Err(DomainError::invalid_transition("user already active"));
        }

        Ok(vec![UserEvent::Reactivated(UserReactivated {
            user_id: cmd.user_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}
