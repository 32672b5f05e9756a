//! Authenticated identities

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::person::{StaffAccount, StaffRole, StaffView, Student, StudentView};

/// Role of an authenticated identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Teacher,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Teacher => "teacher",
            Role::Admin => "admin",
        }
    }

    pub fn is_staff(&self) -> bool {
        matches!(self, Role::Teacher | Role::Admin)
    }
}

impl From<StaffRole> for Role {
    fn from(role: StaffRole) -> Self {
        match role {
            StaffRole::Teacher => Role::Teacher,
            StaffRole::Admin => Role::Admin,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Any account that can log in
#[derive(Debug, Clone)]
pub enum Identity {
    Student(Student),
    Teacher(StaffAccount),
    Admin(StaffAccount),
}

impl Identity {
    pub fn from_staff(account: StaffAccount) -> Self {
        match account.role {
            StaffRole::Teacher => Identity::Teacher(account),
            StaffRole::Admin => Identity::Admin(account),
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Identity::Student(s) => &s.id,
            Identity::Teacher(a) | Identity::Admin(a) => &a.id,
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Identity::Student(_) => Role::Student,
            Identity::Teacher(_) => Role::Teacher,
            Identity::Admin(_) => Role::Admin,
        }
    }

    pub fn class_ids(&self) -> &[String] {
        match self {
            Identity::Student(s) => &s.class_ids,
            Identity::Teacher(a) | Identity::Admin(a) => &a.class_ids,
        }
    }

    pub fn password_hash(&self) -> &str {
        match self {
            Identity::Student(s) => &s.password_hash,
            Identity::Teacher(a) | Identity::Admin(a) => &a.password_hash,
        }
    }

    pub fn must_change_password(&self) -> bool {
        match self {
            Identity::Student(s) => s.must_change_password,
            Identity::Teacher(a) | Identity::Admin(a) => a.must_change_password,
        }
    }
}

/// Shape returned by `/auth/me` and login
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IdentityView {
    pub id: String,
    pub role: Role,
    pub name: String,
    pub username: String,
    pub must_change_password: bool,
    pub class_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grade: Option<String>,
}

impl From<&Identity> for IdentityView {
    fn from(identity: &Identity) -> Self {
        match identity {
            Identity::Student(s) => {
                let view = StudentView::from(s);
                Self {
                    id: view.id,
                    role: Role::Student,
                    name: view.name,
                    username: view.username,
                    must_change_password: view.must_change_password,
                    class_ids: view.class_ids,
                    grade: Some(view.grade),
                }
            }
            Identity::Teacher(a) | Identity::Admin(a) => {
                let view = StaffView::from(a);
                Self {
                    id: view.id,
                    role: view.role.into(),
                    name: view.name,
                    username: view.username,
                    must_change_password: view.must_change_password,
                    class_ids: view.class_ids,
                    grade: None,
                }
            }
        }
    }
}
