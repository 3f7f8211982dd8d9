//! User directory: registration, lookup and admin suspension.
//!
//! Credentials arrive hashed by the identity provider.

use chrono::Utc;
use serde_json::Value as JsonValue;

use setu_auth::{Caller, ReactivateUser, RegisterUser, Role, SuspendUser, User, UserCommand};
use setu_core::{DomainError, UserId};
use setu_events::{EventBus, EventEnvelope};

use super::{ServiceContext, newest_first};
use crate::command_dispatcher::{Tracked, UnitOfWork};
use crate::error::ServiceResult;
use crate::store::MarketStore;

pub struct UserDirectory<S, B> {
    ctx: ServiceContext<S, B>,
}

impl<S, B> UserDirectory<S, B> {
    pub fn new(ctx: ServiceContext<S, B>) -> Self {
        Self { ctx }
    }
}

impl<S, B> UserDirectory<S, B>
where
    S: MarketStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    pub fn register(
        &self,
        name: &str,
        email: &str,
        credential_hash: &str,
        role: Role,
    ) -> ServiceResult<User> {
        let normalized = email.trim().to_lowercase();
        if !self
            .ctx
            .store()
            .find_users(&|u| u.email == normalized)?
            .is_empty()
        {
            return Err(DomainError::conflict("email already registered").into());
        }

        let user_id = UserId::new();
        let mut user = Tracked::fresh(User::empty(user_id));
        let mut work = UnitOfWork::new();
        work.execute(
            &mut user,
            &UserCommand::Register(RegisterUser {
                user_id,
                name: name.to_string(),
                email: email.to_string(),
                credential_hash: credential_hash.to_string(),
                role,
                occurred_at: Utc::now(),
            }),
        )?;
        work.put(&user);
        self.ctx.commit(work)?;

        tracing::info!(user_id = %user_id, role = %role, "user registered");
        Ok(user.into_inner())
    }

    pub fn suspend(&self, caller: &Caller, user_id: UserId) -> ServiceResult<User> {
        self.ctx.authorize_write(caller, &[Role::Admin])?;
        self.run(
            user_id,
            UserCommand::Suspend(SuspendUser {
                user_id,
                occurred_at: Utc::now(),
            }),
        )
    }

    pub fn reactivate(&self, caller: &Caller, user_id: UserId) -> ServiceResult<User> {
        self.ctx.authorize_write(caller, &[Role::Admin])?;
        self.run(
            user_id,
            UserCommand::Reactivate(ReactivateUser {
                user_id,
                occurred_at: Utc::now(),
            }),
        )
    }

    pub fn get(&self, user_id: UserId) -> ServiceResult<User> {
        self.ctx
            .store()
            .user(user_id)?
            .ok_or_else(|| DomainError::not_found("user").into())
    }

    pub fn list(&self, role: Option<Role>) -> ServiceResult<Vec<User>> {
        let mut users = self
            .ctx
            .store()
            .find_users(&|u| role.is_none_or(|r| u.role == r))?;
        newest_first(&mut users, |u| (u.created_at, u.id));
        Ok(users)
    }

    fn run(&self, user_id: UserId, command: UserCommand) -> ServiceResult<User> {
        let mut user = Tracked::loaded(self.get(user_id)?);
        let mut work = UnitOfWork::new();
        work.execute(&mut user, &command)?;
        work.put(&user);
        self.ctx.commit(work)?;

        let user = user.into_inner();
        tracing::info!(user_id = %user_id, suspended = user.is_suspended(), "user status changed");
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use setu_events::InMemoryEventBus;

    use super::*;
    use crate::command_dispatcher::CommandDispatcher;
    use crate::config::EngineConfig;
    use crate::error::ServiceError;
    use crate::store::InMemoryMarketStore;

    type Bus = Arc<InMemoryEventBus<EventEnvelope<JsonValue>>>;

    fn directory() -> UserDirectory<Arc<InMemoryMarketStore>, Bus> {
        let ctx = ServiceContext::new(
            Arc::new(CommandDispatcher::new(
                Arc::new(InMemoryMarketStore::new()),
                Arc::new(InMemoryEventBus::new()),
            )),
            Arc::new(EngineConfig::default()),
        );
        UserDirectory::new(ctx)
    }

    fn admin() -> Caller {
        Caller::new(UserId::new(), Role::Admin, "Admin", "admin@example.com")
    }

    #[test]
    fn emails_are_unique_case_insensitively() {
        let dir = directory();
        dir.register("Meera", "meera@example.com", "hash", Role::Customer)
            .unwrap();
        let err = dir
            .register("Meera Two", " MEERA@example.com ", "hash", Role::Customer)
            .unwrap_err();
        assert!(err.is_conflict());
    }

    #[test]
    fn admin_suspends_and_reactivates() {
        let dir = directory();
        let user = dir
            .register("Vikram", "vikram@example.com", "hash", Role::Agency)
            .unwrap();

        assert!(dir.suspend(&admin(), user.id).unwrap().is_suspended());
        assert!(matches!(
            dir.suspend(&admin(), user.id),
            Err(ServiceError::Domain(DomainError::InvalidTransition(_)))
        ));
        assert!(!dir.reactivate(&admin(), user.id).unwrap().is_suspended());
    }

    #[test]
    fn only_admins_suspend() {
        let dir = directory();
        let user = dir
            .register("Vikram", "vikram@example.com", "hash", Role::Agency)
            .unwrap();
        let customer = Caller::new(UserId::new(), Role::Customer, "C", "c@example.com");
        assert!(matches!(
            dir.suspend(&customer, user.id),
            Err(ServiceError::Domain(DomainError::Forbidden(_)))
        ));
    }

    #[test]
    fn list_filters_by_role() {
        let dir = directory();
        dir.register("A", "a@example.com", "hash", Role::Agency).unwrap();
        dir.register("B", "b@example.com", "hash", Role::Customer).unwrap();
        assert_eq!(dir.list(None).unwrap().len(), 2);
        assert_eq!(dir.list(Some(Role::Agency)).unwrap().len(), 1);
        assert!(matches!(
            dir.get(UserId::new()),
            Err(ServiceError::Domain(DomainError::NotFound(_)))
        ));
    }
}
