//! Bounded history ledger stored in the document

use chrono::Utc;
use std::collections::HashSet;

use crate::models::{
    history::PublicHistoryItem, new_id, HistoryEntry, HistoryKind, LibraryDocument,
    NewHistoryEntry,
};

/// Maximum number of retained entries; older ones are dropped
pub const HISTORY_LIMIT: usize = 200;

impl LibraryDocument {
    /// Prepend an entry and drop anything beyond [`HISTORY_LIMIT`]
    pub fn append_history(&mut self, entry: NewHistoryEntry) -> &HistoryEntry {
        let entry = HistoryEntry {
            id: new_id(),
            kind: entry.kind,
            timestamp: Utc::now(),
            book_id: entry.book_id,
            book_title: entry.book_title,
            student_id: entry.student_id,
            class_id: entry.class_id,
            teacher_id: entry.teacher_id,
            message: entry.message,
        };
        self.history.insert(0, entry);
        self.history.truncate(HISTORY_LIMIT);
        &self.history[0]
    }

    pub fn history_for_student<'a>(&'a self, student_id: &'a str) -> impl Iterator<Item = &'a HistoryEntry> {
        self.history
            .iter()
            .filter(move |h| h.student_id.as_deref() == Some(student_id))
    }

    /// Ids of the students in any of the given classes
    pub fn students_in_classes(&self, class_ids: &[String]) -> HashSet<&str> {
        self.classes
            .iter()
            .filter(|c| class_ids.contains(&c.id))
            .flat_map(|c| c.student_ids.iter().map(String::as_str))
            .collect()
    }

    /// Entries about students taught by the teacher
    pub fn history_for_teacher(&self, teacher_id: &str) -> Vec<&HistoryEntry> {
        let class_ids = self
            .staff_member(teacher_id)
            .map(|t| t.class_ids.clone())
            .unwrap_or_default();
        let students = self.students_in_classes(&class_ids);
        self.history
            .iter()
            .filter(|h| {
                h.student_id
                    .as_deref()
                    .map_or(false, |id| students.contains(id))
            })
            .collect()
    }

    /// Anonymized check-out feed
    pub fn public_history(&self, limit: usize) -> Vec<PublicHistoryItem> {
        self.history
            .iter()
            .filter(|h| h.kind == HistoryKind::CheckOut)
            .filter_map(|h| {
                Some(PublicHistoryItem {
                    title: h.book_title.clone()?,
                    timestamp: h.timestamp,
                })
            })
            .take(limit)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::HistoryKind;

    #[test]
    fn test_history_is_capped_and_newest_first() {
        let mut doc = LibraryDocument::default();
        for i in 0..450 {
            doc.append_history(NewHistoryEntry::new(HistoryKind::CheckOut, format!("event {}", i)));
            assert!(doc.history.len() <= HISTORY_LIMIT);
        }

        assert_eq!(doc.history.len(), HISTORY_LIMIT);
        assert_eq!(doc.history[0].message, "event 449");
        assert_eq!(doc.history[HISTORY_LIMIT - 1].message, "event 250");
        assert!(doc
            .history
            .windows(2)
            .all(|pair| pair[0].timestamp >= pair[1].timestamp));
    }

    #[test]
    fn test_teacher_sees_only_own_classes() {
        use crate::{models::StaffRole, test_support};

        let mut doc = LibraryDocument::default();
        let teacher = test_support::staff("Juf Ans", "ans", StaffRole::Teacher);
        let mine = test_support::student("Sanne", "sanne");
        let other = test_support::student("Daan", "daan");
        let class = test_support::class("Groep 7");
        let (teacher_id, class_id) = (teacher.id.clone(), class.id.clone());
        let (mine_id, other_id) = (mine.id.clone(), other.id.clone());
        doc.staff.push(teacher);
        doc.students.push(mine);
        doc.students.push(other);
        doc.classes.push(class);
        doc.link_student(&class_id, &mine_id).unwrap();
        doc.link_teacher(&class_id, &teacher_id).unwrap();

        doc.append_history(
            NewHistoryEntry::new(HistoryKind::CheckOut, "mine")
                .book("b1", "De reis")
                .student(&mine_id),
        );
        doc.append_history(
            NewHistoryEntry::new(HistoryKind::CheckOut, "other")
                .book("b2", "Het bos")
                .student(&other_id),
        );
        doc.append_history(NewHistoryEntry::new(HistoryKind::BooksImported, "import"));

        let visible: Vec<&str> = doc
            .history_for_teacher(&teacher_id)
            .iter()
            .map(|h| h.message.as_str())
            .collect();
        assert_eq!(visible, vec!["mine"]);
        assert_eq!(doc.history_for_student(&other_id).count(), 1);

        let feed = doc.public_history(10);
        assert_eq!(feed.len(), 2);
        assert_eq!(feed[0].title, "Het bos");
    }
}
