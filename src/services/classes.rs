//! Class management. Every membership change updates both sides.

use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{class::CreateClass, Class, HistoryKind, NewHistoryEntry},
    repository::Repository,
};

#[derive(Clone)]
pub struct ClassesService {
    repository: Repository,
}

/// Which side of a membership to change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Member {
    Student,
    Teacher,
}

impl ClassesService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn list(&self) -> AppResult<Vec<Class>> {
        let doc = self.repository.snapshot().await?;
        let mut classes = doc.classes;
        classes.sort_by_key(|c| c.name.to_lowercase());
        Ok(classes)
    }

    pub async fn get(&self, id: &str) -> AppResult<Class> {
        let doc = self.repository.snapshot().await?;
        doc.class(id).cloned()
    }

    pub async fn create(&self, request: CreateClass) -> AppResult<Class> {
        request.validate()?;
        let name = request.name.trim();

        let mut tx = self.repository.begin().await?;
        if tx.doc().class_by_name(name).is_some() {
            return Err(AppError::Conflict(format!("Class {} already exists", name)));
        }
        let (id, _) = tx.doc_mut().get_or_create_class(name)?;
        tx.doc_mut().append_history(
            NewHistoryEntry::new(HistoryKind::ClassCreated, format!("Class {} created", name))
                .class(&id),
        );
        let doc = tx.commit().await?;
        doc.class(&id).cloned()
    }

    pub async fn rename(&self, id: &str, request: CreateClass) -> AppResult<Class> {
        request.validate()?;
        let name = request.name.trim().to_string();

        let mut tx = self.repository.begin().await?;
        if let Some(existing) = tx.doc().class_by_name(&name) {
            if existing.id != id {
                return Err(AppError::Conflict(format!("Class {} already exists", name)));
            }
        }

        let class = tx.doc_mut().class_mut(id)?;
        if class.name == name {
            return Ok(class.clone());
        }
        let old = std::mem::replace(&mut class.name, name);
        let class = class.clone();
        tx.doc_mut().append_history(
            NewHistoryEntry::new(
                HistoryKind::ClassUpdated,
                format!("Class {} renamed to {}", old, class.name),
            )
            .class(id),
        );
        tx.commit().await?;
        Ok(class)
    }

    pub async fn delete(&self, id: &str) -> AppResult<()> {
        let mut tx = self.repository.begin().await?;
        let class = tx.doc_mut().remove_class(id)?;
        tx.doc_mut().append_history(
            NewHistoryEntry::new(HistoryKind::ClassDeleted, format!("Class {} deleted", class.name))
                .class(id),
        );
        tx.commit().await?;

        tracing::info!("Deleted class {} ({})", class.name, id);
        Ok(())
    }

    /// Add a student or teacher to a class
    pub async fn add_member(&self, class_id: &str, member: Member, member_id: &str) -> AppResult<Class> {
        self.change_membership(class_id, member, member_id, true).await
    }

    pub async fn remove_member(&self, class_id: &str, member: Member, member_id: &str) -> AppResult<Class> {
        self.change_membership(class_id, member, member_id, false).await
    }

    async fn change_membership(
        &self,
        class_id: &str,
        member: Member,
        member_id: &str,
        add: bool,
    ) -> AppResult<Class> {
        let mut tx = self.repository.begin().await?;
        let doc = tx.doc_mut();
        let changed = match (member, add) {
            (Member::Student, true) => doc.link_student(class_id, member_id)?,
            (Member::Student, false) => doc.unlink_student(class_id, member_id)?,
            (Member::Teacher, true) => doc.link_teacher(class_id, member_id)?,
            (Member::Teacher, false) => doc.unlink_teacher(class_id, member_id)?,
        };
        let class = doc.class(class_id)?.clone();
        if !changed {
            return Ok(class);
        }

        let verb = if add { "added to" } else { "removed from" };
        let (entry, who) = match member {
            Member::Student => (
                NewHistoryEntry::new(HistoryKind::ClassUpdated, String::new()).student(member_id),
                doc.student(member_id)?.name.clone(),
            ),
            Member::Teacher => (
                NewHistoryEntry::new(HistoryKind::ClassUpdated, String::new()).teacher(member_id),
                doc.staff_member(member_id)?.name.clone(),
            ),
        };
        doc.append_history(NewHistoryEntry {
            message: format!("{} {} class {}", who, verb, class.name),
            ..entry.class(class_id)
        });
        tx.commit().await?;

        tracing::debug!("{:?} {} {} class {}", member, member_id, verb, class_id);
        Ok(class)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{LibraryDocument, StaffRole},
        test_support::{repository, staff, student},
    };

    #[tokio::test]
    async fn test_class_names_are_unique_case_insensitive() {
        let (repo, _) = repository(LibraryDocument::default());
        let classes = ClassesService::new(repo);

        let c = classes.create(CreateClass { name: "Groep 7".to_string() }).await.unwrap();
        assert!(c.student_ids.is_empty() && c.teacher_ids.is_empty());

        let err = classes
            .create(CreateClass { name: " groep 7 ".to_string() })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let other = classes.create(CreateClass { name: "Groep 8".to_string() }).await.unwrap();
        let err = classes
            .rename(&other.id, CreateClass { name: "GROEP 7".to_string() })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        let renamed = classes
            .rename(&other.id, CreateClass { name: "Groep 8b".to_string() })
            .await
            .unwrap();
        assert_eq!(renamed.name, "Groep 8b");
    }

    #[tokio::test]
    async fn test_membership_stays_bidirectional() {
        let s = student("Sanne", "sanne");
        let t = staff("Juf Ans", "ans", StaffRole::Teacher);
        let admin = staff("Beheer", "beheer", StaffRole::Admin);
        let (sid, tid, aid) = (s.id.clone(), t.id.clone(), admin.id.clone());
        let (repo, store) = repository(LibraryDocument {
            students: vec![s],
            staff: vec![t, admin],
            ..Default::default()
        });
        let classes = ClassesService::new(repo);
        let c = classes.create(CreateClass { name: "Groep 6".to_string() }).await.unwrap();

        classes.add_member(&c.id, Member::Student, &sid).await.unwrap();
        classes.add_member(&c.id, Member::Teacher, &tid).await.unwrap();
        let again = classes.add_member(&c.id, Member::Student, &sid).await.unwrap();
        assert_eq!(again.student_ids, vec![sid.clone()]);

        let err = classes.add_member(&c.id, Member::Teacher, &aid).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let doc = store.current();
        assert!(doc.class_links_consistent());
        assert_eq!(doc.student(&sid).unwrap().class_ids, vec![c.id.clone()]);
        assert_eq!(doc.staff_member(&tid).unwrap().class_ids, vec![c.id.clone()]);

        classes.remove_member(&c.id, Member::Student, &sid).await.unwrap();
        classes.delete(&c.id).await.unwrap();
        let doc = store.current();
        assert!(doc.class_links_consistent());
        assert!(doc.staff_member(&tid).unwrap().class_ids.is_empty());
        assert!(doc.student(&sid).unwrap().class_ids.is_empty());
    }
}
