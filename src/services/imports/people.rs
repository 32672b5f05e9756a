//! Student and teacher import: match on username, merge, link classes

use chrono::Utc;

use super::{columns::*, mark, ImportService};
use crate::{
    error::{AppError, AppResult},
    models::{
        import_report::ImportRowResult, new_id, HistoryKind, ImportAction, ImportReport,
        LibraryDocument, NewHistoryEntry, RowMap, StaffAccount, StaffRole, Student,
    },
    normalize::parse_multi_value_field,
    services::{
        assign,
        auth::{generate_password, hash_password},
    },
};

/// Which account namespace an import targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersonKind {
    Student,
    Teacher,
}

impl PersonKind {
    fn label(&self) -> &'static str {
        match self {
            PersonKind::Student => "Student",
            PersonKind::Teacher => "Teacher",
        }
    }

    fn history_kind(&self) -> HistoryKind {
        match self {
            PersonKind::Student => HistoryKind::StudentsImported,
            PersonKind::Teacher => HistoryKind::TeachersImported,
        }
    }
}

#[derive(Debug)]
struct PersonRow {
    name: String,
    username: String,
    password: Option<String>,
    classes: Vec<String>,
    grade: String,
}

impl PersonRow {
    fn parse(columns: &Columns) -> Result<Self, String> {
        let name = columns.text(NAME);
        let username = columns.text(USERNAME);
        let classes = columns
            .get(CLASS)
            .map(parse_multi_value_field)
            .unwrap_or_default();

        let mut missing = Vec::new();
        if name.is_empty() {
            missing.push("name");
        }
        if username.is_empty() {
            missing.push("username");
        }
        if classes.is_empty() {
            missing.push("class");
        }
        if !missing.is_empty() {
            return Err(format!("missing {}", missing.join(", ")));
        }

        let password = Some(columns.text(PASSWORD)).filter(|p| !p.is_empty());
        Ok(Self {
            name,
            username,
            password,
            classes,
            grade: columns.text(GRADE),
        })
    }
}

/// Outcome of one person row before it is turned into a report line
struct Reconciled {
    action: ImportAction,
    id: String,
    changed: Vec<String>,
    password: Option<String>,
}

impl ImportService {
    /// Reconcile student rows by username
    pub async fn import_students(&self, rows: Vec<RowMap>) -> AppResult<ImportReport> {
        self.import_people(rows, PersonKind::Student).await
    }

    /// Reconcile teacher rows by username
    pub async fn import_teachers(&self, rows: Vec<RowMap>) -> AppResult<ImportReport> {
        self.import_people(rows, PersonKind::Teacher).await
    }

    async fn import_people(&self, rows: Vec<RowMap>, kind: PersonKind) -> AppResult<ImportReport> {
        if rows.is_empty() {
            return Err(AppError::Validation("No rows to import".to_string()));
        }

        let mut tx = self.repository.begin().await?;
        let mut report = ImportReport::default();
        let mut password_changed = Vec::new();

        for (index, raw) in rows.iter().enumerate() {
            let row_number = index + 1;
            let row = match PersonRow::parse(&Columns::new(raw)) {
                Ok(row) => row,
                Err(reason) => {
                    report.skip(row_number, reason);
                    continue;
                }
            };

            match reconcile_person(tx.doc_mut(), &row, kind) {
                Ok(outcome) => {
                    if outcome.action == ImportAction::Updated && outcome.password.is_some() {
                        password_changed.push(outcome.id.clone());
                    }
                    report.record(ImportRowResult {
                        row: row_number,
                        action: outcome.action,
                        ids: vec![outcome.id],
                        label: row.name,
                        changed_fields: outcome.changed,
                        username: Some(row.username),
                        password: outcome.password,
                        warnings: Vec::new(),
                    });
                }
                Err(e) => report.skip(row_number, e.reason()),
            }
        }

        if !report.has_changes() {
            tracing::info!(
                "{} import changed nothing ({} skipped)",
                kind.label(),
                report.skipped.len()
            );
            return Ok(report);
        }

        let message = format!(
            "{} import: {} created, {} updated, {} unchanged, {} skipped",
            kind.label(),
            report.created,
            report.updated,
            report.unchanged,
            report.skipped.len()
        );
        tx.doc_mut()
            .append_history(NewHistoryEntry::new(kind.history_kind(), message.clone()));
        tx.commit().await?;

        for id in &password_changed {
            self.sessions.revoke_identity(id);
        }
        tracing::info!("{}", message);
        Ok(report)
    }
}

/// Apply one validated row. Every check runs before the first mutation.
fn reconcile_person(doc: &mut LibraryDocument, row: &PersonRow, kind: PersonKind) -> AppResult<Reconciled> {
    let existing = match kind {
        PersonKind::Student => {
            if doc.find_staff_by_username(&row.username).is_some() {
                None
            } else {
                Some(doc.find_student_by_username(&row.username).map(|s| s.id.clone()))
            }
        }
        PersonKind::Teacher => {
            if doc.find_student_by_username(&row.username).is_some() {
                None
            } else {
                match doc.find_staff_by_username(&row.username) {
                    Some(account) if account.role == StaffRole::Admin => None,
                    Some(account) => Some(Some(account.id.clone())),
                    None => Some(None),
                }
            }
        }
    };
    let Some(existing) = existing else {
        return Err(AppError::Conflict("username already in use".to_string()));
    };

    let mut changed = Vec::new();
    let (id, action, password) = match existing {
        Some(id) => {
            let password = row.password.clone();
            match kind {
                PersonKind::Student => {
                    let student = doc.student_mut(&id)?;
                    mark(&mut changed, "name", assign(&mut student.name, row.name.clone()));
                    if !row.grade.is_empty() {
                        mark(&mut changed, "grade", assign(&mut student.grade, row.grade.clone()));
                    }
                    if let Some(plain) = &password {
                        student.password_hash = hash_password(plain);
                        student.must_change_password = true;
                        mark(&mut changed, "password", true);
                    }
                }
                PersonKind::Teacher => {
                    let teacher = doc.staff_member_mut(&id)?;
                    mark(&mut changed, "name", assign(&mut teacher.name, row.name.clone()));
                    if let Some(plain) = &password {
                        teacher.password_hash = hash_password(plain);
                        teacher.must_change_password = true;
                        mark(&mut changed, "password", true);
                    }
                }
            }
            (id, ImportAction::Updated, password)
        }
        None => {
            let plain = row.password.clone().unwrap_or_else(generate_password);
            let id = new_id();
            match kind {
                PersonKind::Student => doc.students.push(Student {
                    id: id.clone(),
                    name: row.name.clone(),
                    grade: row.grade.clone(),
                    username: row.username.clone(),
                    password_hash: hash_password(&plain),
                    must_change_password: true,
                    class_ids: Vec::new(),
                    borrowed_books: Vec::new(),
                    created_at: Some(Utc::now()),
                }),
                PersonKind::Teacher => doc.staff.push(StaffAccount {
                    id: id.clone(),
                    role: StaffRole::Teacher,
                    name: row.name.clone(),
                    username: row.username.clone(),
                    password_hash: hash_password(&plain),
                    must_change_password: true,
                    class_ids: Vec::new(),
                    created_at: Some(Utc::now()),
                }),
            }
            (id, ImportAction::Created, Some(plain))
        }
    };

    for class_name in &row.classes {
        let (class_id, _) = doc.get_or_create_class(class_name)?;
        let linked = match kind {
            PersonKind::Student => doc.link_student(&class_id, &id)?,
            PersonKind::Teacher => doc.link_teacher(&class_id, &id)?,
        };
        mark(&mut changed, "classes", linked);
    }

    let action = match action {
        ImportAction::Updated if changed.is_empty() => ImportAction::Unchanged,
        ImportAction::Created => {
            changed.clear();
            ImportAction::Created
        }
        other => other,
    };
    Ok(Reconciled {
        action,
        id,
        changed,
        password,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::Identity,
        repository::MemoryStore,
        services::{
            auth::{verify_password, SessionRegistry},
            isbn::{IsbnLookupSettings, IsbnService},
        },
        test_support::{class, repository, staff, student},
    };
    use serde_json::json;
    use std::{sync::Arc, time::Duration};

    fn importer(doc: LibraryDocument) -> (ImportService, Arc<MemoryStore>, SessionRegistry) {
        let (repo, store) = repository(doc);
        let isbn = IsbnService::new(
            Vec::new(),
            IsbnLookupSettings {
                enabled: false,
                ttl: Duration::from_secs(60),
                source_timeout: Duration::from_secs(1),
            },
        );
        let sessions = SessionRegistry::new(1);
        (
            ImportService::new(repo, isbn, sessions.clone(), false),
            store,
            sessions,
        )
    }

    fn person(name: &str, username: &str, classes: &str) -> RowMap {
        let mut row = RowMap::new();
        row.insert("Naam".into(), json!(name));
        row.insert("Gebruikersnaam".into(), json!(username));
        row.insert("Klas".into(), json!(classes));
        row
    }

    #[tokio::test]
    async fn test_students_are_created_with_generated_passwords_and_classes() {
        let (service, store, _) = importer(LibraryDocument::default());

        let report = service
            .import_students(vec![
                person("Eva de Wit", "eva", "1A; 2b"),
                person("Tim Smit", "tim", "1a"),
            ])
            .await
            .unwrap();

        assert_eq!(report.created, 2);
        let doc = store.current();
        assert_eq!(doc.classes.len(), 2);
        assert!(doc.class_links_consistent());
        let class_1a = doc.class_by_name("1a").unwrap();
        assert_eq!(class_1a.student_ids.len(), 2);

        let eva = &report.details[0];
        assert_eq!(eva.username.as_deref(), Some("eva"));
        let password = eva.password.as_deref().unwrap();
        let stored = doc.find_student_by_username("eva").unwrap();
        assert!(verify_password(password, &stored.password_hash));
        assert!(stored.must_change_password);
        assert_eq!(stored.class_ids.len(), 2);
        assert_eq!(doc.history.len(), 1);
        assert_eq!(doc.history[0].kind, HistoryKind::StudentsImported);
    }

    #[tokio::test]
    async fn test_reimport_is_unchanged_and_not_saved() {
        let (service, store, _) = importer(LibraryDocument::default());
        let rows = vec![person("Eva de Wit", "eva", "1A")];
        service.import_students(rows.clone()).await.unwrap();
        let saves = store.save_count();

        let report = service.import_students(rows).await.unwrap();
        assert_eq!((report.created, report.updated, report.unchanged), (0, 0, 1));
        assert!(report.details[0].password.is_none());
        assert_eq!(store.save_count(), saves);
    }

    #[tokio::test]
    async fn test_rows_missing_fields_or_classes_are_skipped() {
        let (service, store, _) = importer(LibraryDocument::default());
        let report = service
            .import_students(vec![person("Eva", "", "1A"), person("Tim", "tim", " ; ")])
            .await
            .unwrap();

        assert_eq!(report.created, 0);
        assert_eq!(report.skipped[0].reason, "missing username");
        assert_eq!(report.skipped[1].reason, "missing class");
        assert_eq!(store.save_count(), 0);
    }

    #[tokio::test]
    async fn test_username_collision_across_namespaces_is_skipped() {
        let doc = LibraryDocument {
            students: vec![student("Eva", "eva")],
            staff: vec![
                staff("Juf Ans", "ans", StaffRole::Teacher),
                staff("Beheer", "beheer", StaffRole::Admin),
            ],
            ..Default::default()
        };
        let original_hash = doc.staff[0].password_hash.clone();
        let (service, store, _) = importer(doc);

        let students = service
            .import_students(vec![person("Ans", "ANS", "1A")])
            .await
            .unwrap();
        assert_eq!(students.skipped[0].reason, "username already in use");

        let teachers = service
            .import_teachers(vec![person("Eva", "eva", "1A"), person("Beheer", "beheer", "1A")])
            .await
            .unwrap();
        assert_eq!(teachers.skipped.len(), 2);

        let doc = store.current();
        assert_eq!(doc.staff[0].password_hash, original_hash);
        assert!(doc.classes.is_empty());
    }

    #[tokio::test]
    async fn test_supplied_password_is_rehashed_and_revokes_sessions() {
        let mut teacher = staff("Juf Ans", "ans", StaffRole::Teacher);
        let mut existing = class("3C");
        teacher.class_ids.push(existing.id.clone());
        existing.teacher_ids.push(teacher.id.clone());
        let teacher_id = teacher.id.clone();
        let (service, store, sessions) = importer(LibraryDocument {
            staff: vec![teacher.clone()],
            classes: vec![existing],
            ..Default::default()
        });
        let claims = sessions.create(&Identity::from_staff(teacher));

        let mut row = person("Juf Ans", "ans", "4d");
        row.insert("Wachtwoord".into(), json!("nieuw123"));
        let report = service.import_teachers(vec![row]).await.unwrap();

        assert_eq!(report.updated, 1);
        assert_eq!(report.details[0].changed_fields, vec!["password", "classes"]);
        assert_eq!(report.details[0].password.as_deref(), Some("nieuw123"));
        assert!(sessions.get(&claims.token).is_none());

        let doc = store.current();
        let stored = doc.staff_member(&teacher_id).unwrap();
        assert!(verify_password("nieuw123", &stored.password_hash));
        assert!(stored.must_change_password);
        // import links are additive
        assert_eq!(stored.class_ids.len(), 2);
        assert!(doc.class_links_consistent());
        assert_eq!(doc.history[0].kind, HistoryKind::TeachersImported);
    }
}
