//! Student and staff lookups over the library document

use crate::{
    error::{AppError, AppResult},
    models::{Identity, LibraryDocument, StaffAccount, StaffRole, Student},
    normalize::same_key,
};

impl LibraryDocument {
    pub fn student(&self, id: &str) -> AppResult<&Student> {
        self.students
            .iter()
            .find(|s| s.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Student with id {} not found", id)))
    }

    pub fn student_mut(&mut self, id: &str) -> AppResult<&mut Student> {
        self.students
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Student with id {} not found", id)))
    }

    pub fn staff_member(&self, id: &str) -> AppResult<&StaffAccount> {
        self.staff
            .iter()
            .find(|s| s.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Staff account with id {} not found", id)))
    }

    pub fn staff_member_mut(&mut self, id: &str) -> AppResult<&mut StaffAccount> {
        self.staff
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Staff account with id {} not found", id)))
    }

    /// Teacher by ID; admins are not teachers
    pub fn teacher(&self, id: &str) -> AppResult<&StaffAccount> {
        self.staff
            .iter()
            .find(|s| s.id == id && s.role == StaffRole::Teacher)
            .ok_or_else(|| AppError::NotFound(format!("Teacher with id {} not found", id)))
    }

    pub fn find_student_by_username(&self, username: &str) -> Option<&Student> {
        self.students.iter().find(|s| same_key(&s.username, username))
    }

    pub fn find_staff_by_username(&self, username: &str) -> Option<&StaffAccount> {
        self.staff.iter().find(|s| same_key(&s.username, username))
    }

    /// Usernames are unique across students and staff
    pub fn username_taken(&self, username: &str, except_id: Option<&str>) -> bool {
        let other = |id: &str| except_id != Some(id);
        self.find_student_by_username(username).map_or(false, |s| other(&s.id))
            || self.find_staff_by_username(username).map_or(false, |s| other(&s.id))
    }

    pub fn identity_by_username(&self, username: &str) -> Option<Identity> {
        self.find_student_by_username(username)
            .cloned()
            .map(Identity::Student)
            .or_else(|| {
                self.find_staff_by_username(username)
                    .cloned()
                    .map(Identity::from_staff)
            })
    }

    pub fn identity(&self, id: &str) -> Option<Identity> {
        self.student(id)
            .ok()
            .cloned()
            .map(Identity::Student)
            .or_else(|| self.staff_member(id).ok().cloned().map(Identity::from_staff))
    }

    /// Delete a student, returning their copies to the shelf and leaving every class
    pub fn remove_student(&mut self, id: &str) -> AppResult<Student> {
        let index = self
            .students
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Student with id {} not found", id)))?;
        let student = self.students.remove(index);

        for book in &mut self.books {
            if book.borrowed_by.as_deref() == Some(id) {
                book.mark_available();
            }
        }
        for class in &mut self.classes {
            class.student_ids.retain(|s| s != id);
        }
        Ok(student)
    }

    /// Delete a staff account and its class links
    pub fn remove_staff(&mut self, id: &str) -> AppResult<StaffAccount> {
        let index = self
            .staff
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Staff account with id {} not found", id)))?;
        let account = self.staff.remove(index);

        for class in &mut self.classes {
            class.teacher_ids.retain(|t| t != id);
        }
        Ok(account)
    }

    pub fn has_admin(&self) -> bool {
        self.staff.iter().any(|s| s.role == StaffRole::Admin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;

    #[test]
    fn test_username_lookup_folds_non_ascii_case() {
        let doc = LibraryDocument {
            students: vec![test_support::student("Özlem", "özlem")],
            staff: vec![test_support::staff("Émile", "émile", StaffRole::Teacher)],
            ..Default::default()
        };

        assert!(doc.find_student_by_username(" ÖZLEM ").is_some());
        assert!(doc.find_staff_by_username("ÉMILE").is_some());
        assert!(doc.username_taken("Özlem", None));
        assert!(doc.find_student_by_username("ozlem").is_none());
    }
}
