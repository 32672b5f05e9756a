//! Student and staff account management

use chrono::{Local, Utc};
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        person::{
            CreateStaff, CreateStudent, CreatedAccount, StaffView, StudentDetails, StudentView,
            UpdateStudent,
        },
        new_id, HistoryKind, NewHistoryEntry, StaffAccount, StaffRole, Student,
    },
    repository::Repository,
    services::{
        assign,
        auth::{generate_password, hash_password, SessionRegistry},
    },
};

#[derive(Clone)]
pub struct PeopleService {
    repository: Repository,
    sessions: SessionRegistry,
}

/// Supplied password, or a generated one that must be reported back
fn initial_password(supplied: Option<String>) -> (String, Option<String>) {
    match supplied.map(|p| p.trim().to_string()).filter(|p| !p.is_empty()) {
        Some(password) => (hash_password(&password), None),
        None => {
            let generated = generate_password();
            (hash_password(&generated), Some(generated))
        }
    }
}

impl PeopleService {
    pub fn new(repository: Repository, sessions: SessionRegistry) -> Self {
        Self {
            repository,
            sessions,
        }
    }

    /// Students ordered by name, optionally only those of one class
    pub async fn list_students(&self, class_id: Option<&str>) -> AppResult<Vec<StudentView>> {
        let doc = self.repository.snapshot().await?;
        let mut students: Vec<StudentView> = doc
            .students
            .iter()
            .filter(|s| class_id.map_or(true, |id| s.class_ids.iter().any(|c| c == id)))
            .map(StudentView::from)
            .collect();
        students.sort_by_key(|s| s.name.to_lowercase());
        Ok(students)
    }

    pub async fn get_student(&self, id: &str) -> AppResult<StudentDetails> {
        let doc = self.repository.snapshot().await?;
        let student = StudentView::from(doc.student(id)?);
        let loans = doc.student_loans(id, Local::now().date_naive())?;
        Ok(StudentDetails { student, loans })
    }

    pub async fn create_student(&self, request: CreateStudent) -> AppResult<CreatedAccount<StudentView>> {
        request.validate()?;
        let username = request.username.trim().to_string();
        let (password_hash, generated_password) = initial_password(request.password);

        let mut tx = self.repository.begin().await?;
        if tx.doc().username_taken(&username, None) {
            return Err(AppError::Conflict(format!("Username {} is already in use", username)));
        }
        for class_id in &request.class_ids {
            tx.doc().class(class_id)?;
        }

        let student = Student {
            id: new_id(),
            name: request.name.trim().to_string(),
            grade: request.grade.unwrap_or_default().trim().to_string(),
            username,
            password_hash,
            must_change_password: true,
            class_ids: Vec::new(),
            borrowed_books: Vec::new(),
            created_at: Some(Utc::now()),
        };
        let id = student.id.clone();
        let name = student.name.clone();

        let doc = tx.doc_mut();
        doc.students.push(student);
        for class_id in &request.class_ids {
            doc.link_student(class_id, &id)?;
        }
        doc.append_history(
            NewHistoryEntry::new(HistoryKind::StudentCreated, format!("Student {} created", name))
                .student(&id),
        );
        let doc = tx.commit().await?;

        tracing::info!("Created student {} ({})", name, id);
        Ok(CreatedAccount {
            account: StudentView::from(doc.student(&id)?),
            generated_password,
        })
    }

    pub async fn update_student(&self, id: &str, request: UpdateStudent) -> AppResult<StudentView> {
        let mut tx = self.repository.begin().await?;
        let mut student = tx.doc().student(id)?.clone();
        let mut changed = false;
        let mut password_set = false;

        if let Some(username) = request.username.map(|u| u.trim().to_string()) {
            if username.is_empty() {
                return Err(AppError::Validation("Username must not be empty".to_string()));
            }
            if tx.doc().username_taken(&username, Some(id)) {
                return Err(AppError::Conflict(format!("Username {} is already in use", username)));
            }
            changed |= assign(&mut student.username, username);
        }
        if let Some(name) = request.name.map(|n| n.trim().to_string()) {
            if name.is_empty() {
                return Err(AppError::Validation("Name must not be empty".to_string()));
            }
            changed |= assign(&mut student.name, name);
        }
        if let Some(grade) = request.grade {
            changed |= assign(&mut student.grade, grade.trim().to_string());
        }
        if let Some(password) = request.password.filter(|p| !p.trim().is_empty()) {
            student.password_hash = hash_password(password.trim());
            student.must_change_password = true;
            changed = true;
            password_set = true;
        }

        if !changed {
            return Ok(StudentView::from(&student));
        }

        let view = StudentView::from(&student);
        let name = student.name.clone();
        *tx.doc_mut().student_mut(id)? = student;
        tx.doc_mut().append_history(
            NewHistoryEntry::new(HistoryKind::StudentUpdated, format!("Student {} updated", name))
                .student(id),
        );
        tx.commit().await?;

        if password_set {
            self.sessions.revoke_identity(id);
        }
        Ok(view)
    }

    /// Delete a student; borrowed copies return to the shelf
    pub async fn delete_student(&self, id: &str) -> AppResult<()> {
        let mut tx = self.repository.begin().await?;
        let student = tx.doc_mut().remove_student(id)?;
        if !student.borrowed_books.is_empty() {
            tracing::warn!(
                "Deleted student {} with {} open loan(s)",
                id,
                student.borrowed_books.len()
            );
        }
        tx.doc_mut().append_history(
            NewHistoryEntry::new(
                HistoryKind::StudentDeleted,
                format!("Student {} deleted", student.name),
            )
            .student(id),
        );
        tx.commit().await?;

        self.sessions.revoke_identity(id);
        tracing::info!("Deleted student {}", id);
        Ok(())
    }

    pub async fn list_staff(&self) -> AppResult<Vec<StaffView>> {
        let doc = self.repository.snapshot().await?;
        let mut staff: Vec<StaffView> = doc.staff.iter().map(StaffView::from).collect();
        staff.sort_by_key(|s| s.name.to_lowercase());
        Ok(staff)
    }

    /// Create a teacher or administrator
    pub async fn create_staff(&self, request: CreateStaff) -> AppResult<CreatedAccount<StaffView>> {
        request.validate()?;
        let username = request.username.trim().to_string();
        let (password_hash, generated_password) = initial_password(request.password);

        let mut tx = self.repository.begin().await?;
        if tx.doc().username_taken(&username, None) {
            return Err(AppError::Conflict(format!("Username {} is already in use", username)));
        }
        if request.role == StaffRole::Admin && !request.class_ids.is_empty() {
            return Err(AppError::Validation("Administrators are not linked to classes".to_string()));
        }
        for class_id in &request.class_ids {
            tx.doc().class(class_id)?;
        }

        let account = StaffAccount {
            id: new_id(),
            role: request.role,
            name: request.name.trim().to_string(),
            username,
            password_hash,
            must_change_password: true,
            class_ids: Vec::new(),
            created_at: Some(Utc::now()),
        };
        let id = account.id.clone();
        let name = account.name.clone();

        let doc = tx.doc_mut();
        doc.staff.push(account);
        for class_id in &request.class_ids {
            doc.link_teacher(class_id, &id)?;
        }
        doc.append_history(
            NewHistoryEntry::new(
                HistoryKind::TeacherCreated,
                format!("{} {} created", request.role.as_str(), name),
            )
            .teacher(&id),
        );
        let doc = tx.commit().await?;

        tracing::info!("Created {} {} ({})", request.role.as_str(), name, id);
        Ok(CreatedAccount {
            account: StaffView::from(doc.staff_member(&id)?),
            generated_password,
        })
    }

    /// Delete a staff account. The caller cannot delete themself, and the last
    /// administrator stays.
    pub async fn delete_staff(&self, id: &str, caller_id: &str) -> AppResult<()> {
        if id == caller_id {
            return Err(AppError::StateConflict("You cannot delete your own account".to_string()));
        }

        let mut tx = self.repository.begin().await?;
        let account = tx.doc().staff_member(id)?;
        if account.role == StaffRole::Admin
            && tx.doc().staff.iter().filter(|s| s.role == StaffRole::Admin).count() <= 1
        {
            return Err(AppError::StateConflict(
                "The last administrator cannot be deleted".to_string(),
            ));
        }

        let account = tx.doc_mut().remove_staff(id)?;
        tx.doc_mut().append_history(
            NewHistoryEntry::new(
                HistoryKind::TeacherDeleted,
                format!("{} {} deleted", account.role.as_str(), account.name),
            )
            .teacher(id),
        );
        tx.commit().await?;

        self.sessions.revoke_identity(id);
        tracing::info!("Deleted staff account {}", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{Identity, LibraryDocument},
        services::auth::verify_password,
        test_support::{book, class, repository, staff},
    };

    fn service(doc: LibraryDocument) -> (PeopleService, std::sync::Arc<crate::repository::MemoryStore>) {
        let (repo, store) = repository(doc);
        (PeopleService::new(repo, SessionRegistry::new(1)), store)
    }

    #[tokio::test]
    async fn test_create_student_links_classes_and_generates_password() {
        let c = class("Groep 8");
        let class_id = c.id.clone();
        let (people, store) = service(LibraryDocument {
            classes: vec![c],
            ..Default::default()
        });

        let created = people
            .create_student(CreateStudent {
                name: " Sanne ".to_string(),
                username: "sanne".to_string(),
                class_ids: vec![class_id.clone()],
                ..Default::default()
            })
            .await
            .unwrap();
        let password = created.generated_password.unwrap();
        assert_eq!(created.account.name, "Sanne");
        assert_eq!(created.account.class_ids, vec![class_id.clone()]);

        let doc = store.current();
        assert!(doc.class_links_consistent());
        assert_eq!(doc.class(&class_id).unwrap().student_ids.len(), 1);
        let stored = doc.find_student_by_username("SANNE").unwrap();
        assert!(verify_password(&password, &stored.password_hash));
        assert_ne!(stored.password_hash, password);
    }

    #[tokio::test]
    async fn test_usernames_are_unique_across_namespaces() {
        let (people, _) = service(LibraryDocument {
            staff: vec![staff("Meester Jan", "jan", StaffRole::Teacher)],
            ..Default::default()
        });

        let err = people
            .create_student(CreateStudent {
                name: "Jan".to_string(),
                username: "JAN".to_string(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_password_update_revokes_sessions() {
        let (people, store) = service(LibraryDocument::default());
        let created = people
            .create_student(CreateStudent {
                name: "Sanne".to_string(),
                username: "sanne".to_string(),
                password: Some("eerste".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(created.generated_password.is_none());
        let id = created.account.id;

        let identity = Identity::Student(store.current().student(&id).unwrap().clone());
        let session = people.sessions.create(&identity);

        people
            .update_student(
                &id,
                UpdateStudent {
                    password: Some("tweede".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(people.sessions.get(&session.token).is_none());
        let stored = store.current().student(&id).unwrap().clone();
        assert!(verify_password("tweede", &stored.password_hash));
        assert!(stored.must_change_password);
    }

    #[tokio::test]
    async fn test_delete_student_releases_books() {
        let c = class("Groep 5");
        let b = book("555", "Kikker");
        let (class_id, book_id) = (c.id.clone(), b.id.clone());
        let (people, store) = service(LibraryDocument {
            classes: vec![c],
            books: vec![b],
            ..Default::default()
        });
        let id = people
            .create_student(CreateStudent {
                name: "Daan".to_string(),
                username: "daan".to_string(),
                class_ids: vec![class_id.clone()],
                ..Default::default()
            })
            .await
            .unwrap()
            .account
            .id;

        let mut tx = people.repository.begin().await.unwrap();
        tx.doc_mut().check_out(&book_id, &id, None).unwrap();
        tx.commit().await.unwrap();

        people.delete_student(&id).await.unwrap();
        let doc = store.current();
        assert!(doc.book(&book_id).unwrap().is_available());
        assert!(doc.class(&class_id).unwrap().student_ids.is_empty());
        assert!(doc.class_links_consistent());
    }

    #[tokio::test]
    async fn test_last_admin_and_self_deletion_are_refused() {
        let admin = staff("Beheer", "beheer", StaffRole::Admin);
        let teacher = staff("Juf Ans", "ans", StaffRole::Teacher);
        let (admin_id, teacher_id) = (admin.id.clone(), teacher.id.clone());
        let (people, store) = service(LibraryDocument {
            staff: vec![admin, teacher],
            ..Default::default()
        });

        let err = people.delete_staff(&admin_id, &admin_id).await.unwrap_err();
        assert!(matches!(err, AppError::StateConflict(_)));
        let err = people.delete_staff(&admin_id, &teacher_id).await.unwrap_err();
        assert!(matches!(err, AppError::StateConflict(_)));

        people.delete_staff(&teacher_id, &admin_id).await.unwrap();
        assert_eq!(store.current().staff.len(), 1);
    }
}
