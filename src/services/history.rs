//! History ledger queries scoped by role

use crate::{
    error::AppResult,
    models::{
        history::{HistoryQuery, PublicHistoryItem},
        session::SessionClaims,
        HistoryEntry, NewHistoryEntry, Role,
    },
    repository::Repository,
};

const DEFAULT_LIMIT: usize = 50;

#[derive(Clone)]
pub struct HistoryService {
    repository: Repository,
}

impl HistoryService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Record an event on its own
    pub async fn append(&self, entry: NewHistoryEntry) -> AppResult<HistoryEntry> {
        let mut tx = self.repository.begin().await?;
        let appended = tx.doc_mut().append_history(entry).clone();
        tx.commit().await?;
        Ok(appended)
    }

    /// History visible to the caller, narrowed by the query filters
    pub async fn query(&self, claims: &SessionClaims, query: &HistoryQuery) -> AppResult<Vec<HistoryEntry>> {
        let doc = self.repository.snapshot().await?;
        let limit = query.limit.unwrap_or(DEFAULT_LIMIT);

        let visible: Vec<&HistoryEntry> = match claims.role {
            Role::Admin => doc.history.iter().collect(),
            Role::Teacher => doc.history_for_teacher(&claims.sub),
            Role::Student => doc.history_for_student(&claims.sub).collect(),
        };

        let class_students = query
            .class_id
            .as_ref()
            .map(|id| doc.students_in_classes(std::slice::from_ref(id)));

        Ok(visible
            .into_iter()
            .filter(|h| match &query.student_id {
                Some(id) => h.student_id.as_ref() == Some(id),
                None => true,
            })
            .filter(|h| match (&query.class_id, &class_students) {
                (Some(class_id), Some(students)) => {
                    h.class_id.as_ref() == Some(class_id)
                        || h.student_id
                            .as_deref()
                            .map_or(false, |id| students.contains(id))
                }
                _ => true,
            })
            .take(limit)
            .cloned()
            .collect())
    }

    /// Personal loan history of one student
    pub async fn for_student(&self, student_id: &str, limit: Option<usize>) -> AppResult<Vec<HistoryEntry>> {
        let doc = self.repository.snapshot().await?;
        doc.student(student_id)?;
        Ok(doc
            .history_for_student(student_id)
            .take(limit.unwrap_or(DEFAULT_LIMIT))
            .cloned()
            .collect())
    }

    pub async fn public_feed(&self, limit: Option<usize>) -> AppResult<Vec<PublicHistoryItem>> {
        let doc = self.repository.snapshot().await?;
        Ok(doc.public_history(limit.unwrap_or(DEFAULT_LIMIT)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{HistoryKind, LibraryDocument},
        test_support::{repository, student},
    };
    use chrono::Utc;

    fn claims(sub: &str, role: Role) -> SessionClaims {
        SessionClaims {
            token: "t".to_string(),
            sub: sub.to_string(),
            role,
            expires_at: Utc::now() + chrono::Duration::hours(1),
        }
    }

    #[tokio::test]
    async fn test_students_only_see_their_own_entries() {
        let a = student("Sanne", "sanne");
        let b = student("Daan", "daan");
        let (a_id, b_id) = (a.id.clone(), b.id.clone());
        let (repo, _) = repository(LibraryDocument {
            students: vec![a, b],
            ..Default::default()
        });
        let service = HistoryService::new(repo);

        for (id, title) in [(&a_id, "Een"), (&b_id, "Twee"), (&a_id, "Drie")] {
            service
                .append(
                    NewHistoryEntry::new(HistoryKind::CheckOut, title)
                        .book("x", title)
                        .student(id),
                )
                .await
                .unwrap();
        }

        let own = service
            .query(&claims(&a_id, Role::Student), &HistoryQuery::default())
            .await
            .unwrap();
        assert_eq!(own.len(), 2);
        assert_eq!(own[0].message, "Drie");

        // a student filter cannot widen a student's view
        let query = HistoryQuery {
            student_id: Some(b_id.clone()),
            ..Default::default()
        };
        assert!(service
            .query(&claims(&a_id, Role::Student), &query)
            .await
            .unwrap()
            .is_empty());

        let all = service
            .query(&claims("admin", Role::Admin), &HistoryQuery { limit: Some(2), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(all.len(), 2);

        let feed = service.public_feed(None).await.unwrap();
        let titles: Vec<&str> = feed.iter().map(|f| f.title.as_str()).collect();
        assert_eq!(titles, vec!["Drie", "Twee", "Een"]);

        assert_eq!(service.for_student(&b_id, None).await.unwrap().len(), 1);
        assert!(service.for_student("missing", None).await.is_err());
    }
}
