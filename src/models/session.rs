//! Session claims and authentication payloads

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use super::identity::{IdentityView, Role};
use crate::error::AppError;

/// What a session token stands for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionClaims {
    #[serde(skip)]
    pub token: String,
    /// Identity id
    pub sub: String,
    pub role: Role,
    pub expires_at: DateTime<Utc>,
}

impl SessionClaims {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    // Authorization checks
    pub fn require_staff(&self) -> Result<(), AppError> {
        if self.role.is_staff() {
            Ok(())
        } else {
            Err(AppError::Authorization("Staff account required".to_string()))
        }
    }

    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Authorization("Administrator account required".to_string()))
        }
    }

    /// Staff see every student; a student only sees themself
    pub fn can_view_student(&self, student_id: &str) -> bool {
        self.role.is_staff() || self.sub == student_id
    }

    pub fn require_view_student(&self, student_id: &str) -> Result<(), AppError> {
        if self.can_view_student(student_id) {
            Ok(())
        } else {
            Err(AppError::Authorization("Not allowed to view this student".to_string()))
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "username is required"))]
    pub username: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: IdentityView,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    #[validate(length(min = 4, message = "new password must be at least 4 characters"))]
    pub new_password: String,
}
