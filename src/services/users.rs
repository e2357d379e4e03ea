//! Librarian-side user management

use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        borrow::BorrowRecord,
        user::{CreateUser, Role, UpdateUser, User, UserChanges},
    },
    repository::Repository,
};

use super::{auth::hash_password, circulation::CirculationService};

fn user_not_found() -> AppError {
    AppError::NotFound("user not found".to_string())
}

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
    circulation: CirculationService,
}

impl UsersService {
    pub fn new(repository: Repository, circulation: CirculationService) -> Self {
        Self {
            repository,
            circulation,
        }
    }

    /// All users, or only the active / inactive ones
    pub async fn list_users(&self, active: Option<bool>) -> AppResult<Vec<User>> {
        self.repository.users.list(active).await
    }

    /// Member lookup; librarians are not exposed here
    pub async fn get_user(&self, id: Uuid) -> AppResult<User> {
        match self.repository.users.find_by_id(id).await? {
            Some(user) if user.role == Role::Member => Ok(user),
            _ => Err(user_not_found()),
        }
    }

    pub async fn add_user(&self, request: CreateUser) -> AppResult<User> {
        request
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        let user = User::new(
            request.username,
            hash_password(&request.password)?,
            Role::Member,
            Utc::now(),
        );
        self.repository.users.insert(&user).await?;

        tracing::info!(user_id = %user.id, "member added");
        Ok(user)
    }

    /// Partial update. Deactivation goes through the same gate as
    /// [`Self::deactivate_user`] and a librarian keeps its role.
    pub async fn update_user(&self, id: Uuid, request: UpdateUser) -> AppResult<User> {
        request
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        let current = self
            .repository
            .users
            .find_by_id(id)
            .await?
            .ok_or_else(user_not_found)?;

        if current.role == Role::Librarian && request.role.map_or(false, |r| r != Role::Librarian) {
            return Err(AppError::Authorization(
                "Cannot change the role of a librarian".to_string(),
            ));
        }

        // Checked before any write so a taken name cannot leave a half-applied update
        if let Some(ref username) = request.username {
            if let Some(other) = self.repository.users.find_by_username(username).await? {
                if other.id != id {
                    return Err(AppError::Conflict("this user already exists".to_string()));
                }
            }
        }

        let password_hash = match request.password {
            Some(ref password) => Some(hash_password(password)?),
            None => None,
        };

        if request.is_active == Some(false) {
            self.circulation.deactivate_member(id).await?;
        }

        let changes = UserChanges {
            username: request.username,
            password_hash,
            role: request.role,
            is_active: request.is_active.filter(|active| *active),
        };

        let user = self
            .repository
            .users
            .update(id, &changes, Utc::now())
            .await?
            .ok_or_else(user_not_found)?;

        tracing::info!(user_id = %user.id, "user updated");
        Ok(user)
    }

    pub async fn deactivate_user(&self, id: Uuid) -> AppResult<()> {
        self.circulation.deactivate_member(id).await
    }

    pub async fn delete_user(&self, id: Uuid) -> AppResult<()> {
        self.circulation.remove_member(id).await
    }

    /// Every borrow record of the user, oldest first
    pub async fn history(&self, id: Uuid) -> AppResult<Vec<BorrowRecord>> {
        self.repository.borrows.list_for_user(id).await
    }
}
