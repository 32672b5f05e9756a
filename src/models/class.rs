//! Class and folder models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// A school class. Membership is mirrored in the members' `class_ids`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Class {
    pub id: String,
    /// Unique, compared case-insensitively
    pub name: String,
    #[serde(default)]
    pub teacher_ids: Vec<String>,
    #[serde(default)]
    pub student_ids: Vec<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Class {
    pub fn new(name: &str) -> Self {
        Self {
            id: super::new_id(),
            name: name.trim().to_string(),
            teacher_ids: Vec::new(),
            student_ids: Vec::new(),
            created_at: Some(Utc::now()),
        }
    }
}

/// Categorization of books; no lending semantics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub exam_list: bool,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateClass {
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaveFolder {
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    pub description: Option<String>,
    pub color: Option<String>,
    pub exam_list: Option<bool>,
}
