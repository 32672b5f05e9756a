//! Lending state machine over the library document

use chrono::{NaiveDate, Utc};

use crate::{
    error::{AppError, AppResult},
    models::{
        loan::OverdueLoan, person::StudentLoan, BarcodeGroup, Book, HistoryKind, LibraryDocument,
        LoanRecord, NewHistoryEntry,
    },
    normalize::{fold_key, normalize_barcode, same_key},
};


impl LibraryDocument {
    /// available -> borrowed
    pub fn check_out(
        &mut self,
        book_id: &str,
        student_id: &str,
        due_date: Option<NaiveDate>,
    ) -> AppResult<()> {
        let student = self.student(student_id)?;
        let book = self.book(book_id)?;

        if !book.is_available() {
            return Err(AppError::StateConflict(format!(
                "Book \"{}\" is already borrowed",
                book.title
            )));
        }
        if student.holds(book_id) {
            return Err(AppError::StateConflict(format!(
                "Student {} already has a loan record for this copy",
                student.name
            )));
        }

        let student_name = student.name.clone();
        let title = book.title.clone();

        self.book_mut(book_id)?.mark_borrowed(student_id, due_date);
        self.student_mut(student_id)?.borrowed_books.push(LoanRecord {
            book_id: book_id.to_string(),
            borrowed_at: Utc::now(),
        });
        self.append_history(
            NewHistoryEntry::new(
                HistoryKind::CheckOut,
                format!("{} borrowed \"{}\"", student_name, title),
            )
            .book(book_id, &title)
            .student(student_id),
        );
        Ok(())
    }

    /// borrowed -> available
    pub fn check_in(&mut self, book_id: &str, student_id: &str) -> AppResult<()> {
        let student = self.student(student_id)?;
        let book = self.book(book_id)?;

        if book.is_available() {
            return Err(AppError::StateConflict(format!(
                "Book \"{}\" is not borrowed",
                book.title
            )));
        }
        if !student.holds(book_id) {
            return Err(AppError::StateConflict(format!(
                "Student {} did not borrow this copy",
                student.name
            )));
        }

        let student_name = student.name.clone();
        let title = book.title.clone();

        self.book_mut(book_id)?.mark_available();
        self.student_mut(student_id)?
            .borrowed_books
            .retain(|loan| loan.book_id != book_id);
        self.append_history(
            NewHistoryEntry::new(
                HistoryKind::CheckIn,
                format!("{} returned \"{}\"", student_name, title),
            )
            .book(book_id, &title)
            .student(student_id),
        );
        Ok(())
    }

    /// Copies sharing a barcode, partitioned by title in catalogue order
    pub fn barcode_groups(&self, barcode: &str) -> Vec<BarcodeGroup> {
        let mut groups: Vec<(String, Vec<&Book>)> = Vec::new();
        for book in self.books_by_barcode(barcode) {
            let key = fold_key(&book.title);
            match groups.iter_mut().find(|(k, _)| *k == key) {
                Some((_, copies)) => copies.push(book),
                None => groups.push((key, vec![book])),
            }
        }

        groups
            .into_iter()
            .map(|(_, copies)| {
                let available_copies = copies.iter().filter(|b| b.is_available()).count();
                let representative = copies
                    .iter()
                    .find(|b| b.is_available())
                    .unwrap_or(&copies[0]);
                BarcodeGroup {
                    title: copies[0].title.clone(),
                    author: copies[0].author.clone(),
                    total_copies: copies.len(),
                    available_copies,
                    borrowed: copies.len() - available_copies,
                    representative_id: representative.id.clone(),
                    copy_ids: copies.iter().map(|b| b.id.clone()).collect(),
                }
            })
            .collect()
    }

    /// Pick the group an action by barcode refers to
    pub fn select_barcode_group(&self, barcode: &str, title: Option<&str>) -> AppResult<BarcodeGroup> {
        let mut groups = self.barcode_groups(barcode);
        if groups.is_empty() {
            return Err(AppError::NotFound(format!("No book with barcode {}", barcode)));
        }

        match title.map(str::trim).filter(|t| !t.is_empty()) {
            Some(title) => groups
                .into_iter()
                .find(|g| same_key(&g.title, title))
                .ok_or_else(|| {
                    AppError::NotFound(format!("No book titled \"{}\" with barcode {}", title, barcode))
                }),
            None if groups.len() > 1 => Err(AppError::AmbiguousBarcode {
                barcode: normalize_barcode(barcode),
                titles: groups.into_iter().map(|g| g.title).collect(),
            }),
            None => Ok(groups.remove(0)),
        }
    }

    /// Available copy of the addressed group
    pub fn copy_for_check_out(&self, barcode: &str, title: Option<&str>) -> AppResult<String> {
        let group = self.select_barcode_group(barcode, title)?;
        group
            .copy_ids
            .iter()
            .find(|id| self.book(id).map_or(false, |b| b.is_available()))
            .cloned()
            .ok_or_else(|| {
                AppError::StateConflict(format!("No available copy of \"{}\"", group.title))
            })
    }

    /// Copy with this barcode currently held by the student
    pub fn copy_for_check_in(
        &self,
        barcode: &str,
        title: Option<&str>,
        student_id: &str,
    ) -> AppResult<String> {
        let student = self.student(student_id)?;
        let title = title.map(str::trim).filter(|t| !t.is_empty());

        let held: Vec<&Book> = self
            .books_by_barcode(barcode)
            .into_iter()
            .filter(|b| !b.is_available() && student.holds(&b.id))
            .filter(|b| title.map_or(true, |t| same_key(&b.title, t)))
            .collect();

        let Some(first) = held.first() else {
            return Err(AppError::StateConflict(format!(
                "Student {} holds no copy with barcode {}",
                student.name, barcode
            )));
        };

        let mut titles: Vec<String> = Vec::new();
        for book in &held {
            if !titles.iter().any(|t| same_key(t, &book.title)) {
                titles.push(book.title.clone());
            }
        }
        if titles.len() > 1 {
            return Err(AppError::AmbiguousBarcode {
                barcode: normalize_barcode(barcode),
                titles,
            });
        }
        Ok(first.id.clone())
    }

    /// Current loans of a student, resolved against the catalogue
    pub fn student_loans(&self, student_id: &str, today: NaiveDate) -> AppResult<Vec<StudentLoan>> {
        let student = self.student(student_id)?;
        Ok(student
            .borrowed_books
            .iter()
            .filter_map(|loan| {
                let book = self.book(&loan.book_id).ok()?;
                Some(StudentLoan {
                    book_id: book.id.clone(),
                    title: book.title.clone(),
                    author: book.author.clone(),
                    barcode: book.barcode.clone(),
                    borrowed_at: loan.borrowed_at,
                    due_date: book.due_date,
                    overdue: book.is_overdue(today),
                })
            })
            .collect())
    }

    pub fn overdue_loans(&self, today: NaiveDate) -> Vec<OverdueLoan> {
        self.books
            .iter()
            .filter(|b| b.is_overdue(today))
            .filter_map(|book| {
                let student_id = book.borrowed_by.clone()?;
                let student_name = self
                    .student(&student_id)
                    .map(|s| s.name.clone())
                    .unwrap_or_default();
                Some(OverdueLoan {
                    book_id: book.id.clone(),
                    title: book.title.clone(),
                    barcode: book.barcode.clone(),
                    student_id,
                    student_name,
                    due_date: book.due_date?,
                })
            })
            .collect()
    }
}
