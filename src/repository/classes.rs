//! Class membership over the library document.
//!
//! Every helper here updates both sides of a membership: the class lists and
//! the member's `class_ids`.

use crate::{
    error::{AppError, AppResult},
    models::{Class, LibraryDocument},
    normalize::same_key,
};

fn push_unique(ids: &mut Vec<String>, id: &str) -> bool {
    if ids.iter().any(|existing| existing == id) {
        false
    } else {
        ids.push(id.to_string());
        true
    }
}

fn remove_id(ids: &mut Vec<String>, id: &str) -> bool {
    let before = ids.len();
    ids.retain(|existing| existing != id);
    ids.len() != before
}

impl LibraryDocument {
    pub fn class(&self, id: &str) -> AppResult<&Class> {
        self.classes
            .iter()
            .find(|c| c.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Class with id {} not found", id)))
    }

    pub fn class_mut(&mut self, id: &str) -> AppResult<&mut Class> {
        self.classes
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Class with id {} not found", id)))
    }

    /// Case-insensitive lookup by name
    pub fn class_by_name(&self, name: &str) -> Option<&Class> {
        self.classes.iter().find(|c| same_key(&c.name, name))
    }

    /// Resolve a class by name, creating it when absent. Returns `(id, created)`.
    pub fn get_or_create_class(&mut self, name: &str) -> AppResult<(String, bool)> {
        if name.trim().is_empty() {
            return Err(AppError::Validation("Class name is required".to_string()));
        }
        if let Some(existing) = self.class_by_name(name) {
            return Ok((existing.id.clone(), false));
        }
        let class = Class::new(name);
        let id = class.id.clone();
        tracing::info!("Created class {} ({})", class.name, id);
        self.classes.push(class);
        Ok((id, true))
    }

    /// Link a student and a class. Returns whether anything changed.
    pub fn link_student(&mut self, class_id: &str, student_id: &str) -> AppResult<bool> {
        self.class(class_id)?;
        self.student(student_id)?;

        let class_changed = push_unique(&mut self.class_mut(class_id)?.student_ids, student_id);
        let student_changed = push_unique(&mut self.student_mut(student_id)?.class_ids, class_id);
        Ok(class_changed || student_changed)
    }

    pub fn unlink_student(&mut self, class_id: &str, student_id: &str) -> AppResult<bool> {
        self.class(class_id)?;
        self.student(student_id)?;

        let class_changed = remove_id(&mut self.class_mut(class_id)?.student_ids, student_id);
        let student_changed = remove_id(&mut self.student_mut(student_id)?.class_ids, class_id);
        Ok(class_changed || student_changed)
    }

    pub fn link_teacher(&mut self, class_id: &str, teacher_id: &str) -> AppResult<bool> {
        self.class(class_id)?;
        self.teacher(teacher_id)?;

        let class_changed = push_unique(&mut self.class_mut(class_id)?.teacher_ids, teacher_id);
        let teacher_changed = push_unique(&mut self.staff_member_mut(teacher_id)?.class_ids, class_id);
        Ok(class_changed || teacher_changed)
    }

    pub fn unlink_teacher(&mut self, class_id: &str, teacher_id: &str) -> AppResult<bool> {
        self.class(class_id)?;
        self.teacher(teacher_id)?;

        let class_changed = remove_id(&mut self.class_mut(class_id)?.teacher_ids, teacher_id);
        let teacher_changed = remove_id(&mut self.staff_member_mut(teacher_id)?.class_ids, class_id);
        Ok(class_changed || teacher_changed)
    }

    /// Delete a class and detach every member
    pub fn remove_class(&mut self, id: &str) -> AppResult<Class> {
        let index = self
            .classes
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Class with id {} not found", id)))?;
        let class = self.classes.remove(index);

        for student in &mut self.students {
            remove_id(&mut student.class_ids, id);
        }
        for account in &mut self.staff {
            remove_id(&mut account.class_ids, id);
        }
        Ok(class)
    }

    /// Check that every class/member reference is mirrored on the other side
    pub fn class_links_consistent(&self) -> bool {
        let classes_agree = self.classes.iter().all(|class| {
            class.student_ids.iter().all(|sid| {
                self.students
                    .iter()
                    .any(|s| &s.id == sid && s.class_ids.contains(&class.id))
            }) && class.teacher_ids.iter().all(|tid| {
                self.staff
                    .iter()
                    .any(|t| &t.id == tid && t.class_ids.contains(&class.id))
            })
        });
        let students_agree = self.students.iter().all(|s| {
            s.class_ids.iter().all(|cid| {
                self.classes
                    .iter()
                    .any(|c| &c.id == cid && c.student_ids.contains(&s.id))
            })
        });
        let staff_agree = self.staff.iter().all(|t| {
            t.class_ids.iter().all(|cid| {
                self.classes
                    .iter()
                    .any(|c| &c.id == cid && c.teacher_ids.contains(&t.id))
            })
        });
        classes_agree && students_agree && staff_agree
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{StaffAccount, StaffRole, Student};

    fn student(id: &str) -> Student {
        Student {
            id: id.to_string(),
            name: id.to_string(),
            grade: String::new(),
            username: id.to_string(),
            password_hash: String::new(),
            must_change_password: false,
            class_ids: Vec::new(),
            borrowed_books: Vec::new(),
            created_at: None,
        }
    }

    fn teacher(id: &str) -> StaffAccount {
        StaffAccount {
            id: id.to_string(),
            role: StaffRole::Teacher,
            name: id.to_string(),
            username: id.to_string(),
            password_hash: String::new(),
            must_change_password: false,
            class_ids: Vec::new(),
            created_at: None,
        }
    }

    #[test]
    fn test_get_or_create_class_is_case_insensitive() {
        let mut doc = LibraryDocument::default();
        let (first, created) = doc.get_or_create_class("3 Havo B").unwrap();
        assert!(created);
        let (second, created) = doc.get_or_create_class("  3 havo b ").unwrap();
        assert!(!created);
        assert_eq!(first, second);
        assert_eq!(doc.classes.len(), 1);
        assert!(doc.get_or_create_class("  ").is_err());
    }

    #[test]
    fn test_links_stay_bidirectional() {
        let mut doc = LibraryDocument::default();
        doc.students.push(student("s1"));
        doc.students.push(student("s2"));
        doc.staff.push(teacher("t1"));
        let (c1, _) = doc.get_or_create_class("1A").unwrap();
        let (c2, _) = doc.get_or_create_class("1B").unwrap();

        assert!(doc.link_student(&c1, "s1").unwrap());
        assert!(!doc.link_student(&c1, "s1").unwrap());
        assert!(doc.link_student(&c2, "s1").unwrap());
        assert!(doc.link_student(&c2, "s2").unwrap());
        assert!(doc.link_teacher(&c1, "t1").unwrap());
        assert!(doc.class_links_consistent());

        assert!(doc.unlink_student(&c2, "s1").unwrap());
        assert!(doc.class_links_consistent());
        assert_eq!(doc.student("s1").unwrap().class_ids, vec![c1.clone()]);

        doc.remove_class(&c1).unwrap();
        assert!(doc.class_links_consistent());
        assert!(doc.student("s1").unwrap().class_ids.is_empty());
        assert!(doc.teacher("t1").unwrap().class_ids.is_empty());

        doc.remove_student("s2").unwrap();
        assert!(doc.class_links_consistent());
        assert!(doc.class(&c2).unwrap().student_ids.is_empty());
    }

    #[test]
    fn test_link_unknown_member_changes_nothing() {
        let mut doc = LibraryDocument::default();
        let (c1, _) = doc.get_or_create_class("2C").unwrap();
        assert!(matches!(doc.link_student(&c1, "ghost"), Err(AppError::NotFound(_))));
        assert!(doc.class(&c1).unwrap().student_ids.is_empty());
    }
}
