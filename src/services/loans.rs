//! Lending engine: check-out, check-in and barcode grouping

use chrono::{Local, NaiveDate};

use crate::{
    error::AppResult,
    models::{
        loan::{LoanOutcome, OverdueLoan},
        person::{StudentLoan, StudentView},
        BarcodeLookup, LibraryDocument,
    },
    normalize::normalize_barcode,
    repository::Repository,
};

#[derive(Clone)]
pub struct LoansService {
    repository: Repository,
}

fn outcome(doc: &LibraryDocument, book_id: &str, student_id: &str) -> AppResult<LoanOutcome> {
    Ok(LoanOutcome {
        book: doc.book(book_id)?.clone(),
        student: StudentView::from(doc.student(student_id)?),
    })
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

impl LoansService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Lend a copy to a student
    pub async fn check_out(
        &self,
        book_id: &str,
        student_id: &str,
        due_date: Option<NaiveDate>,
    ) -> AppResult<LoanOutcome> {
        let mut tx = self.repository.begin().await?;
        tx.doc_mut().check_out(book_id, student_id, due_date)?;
        let doc = tx.commit().await?;

        tracing::info!("Book {} checked out to student {}", book_id, student_id);
        outcome(&doc, book_id, student_id)
    }

    /// Take a copy back from a student
    pub async fn check_in(&self, book_id: &str, student_id: &str) -> AppResult<LoanOutcome> {
        let mut tx = self.repository.begin().await?;
        tx.doc_mut().check_in(book_id, student_id)?;
        let doc = tx.commit().await?;

        tracing::info!("Book {} checked in from student {}", book_id, student_id);
        outcome(&doc, book_id, student_id)
    }

    pub async fn check_out_by_barcode(
        &self,
        barcode: &str,
        title: Option<&str>,
        student_id: &str,
        due_date: Option<NaiveDate>,
    ) -> AppResult<LoanOutcome> {
        let mut tx = self.repository.begin().await?;
        let book_id = tx.doc().copy_for_check_out(barcode, title)?;
        tx.doc_mut().check_out(&book_id, student_id, due_date)?;
        let doc = tx.commit().await?;

        tracing::info!(
            "Barcode {} resolved to copy {}, checked out to student {}",
            barcode,
            book_id,
            student_id
        );
        outcome(&doc, &book_id, student_id)
    }

    pub async fn check_in_by_barcode(
        &self,
        barcode: &str,
        title: Option<&str>,
        student_id: &str,
    ) -> AppResult<LoanOutcome> {
        let mut tx = self.repository.begin().await?;
        let book_id = tx.doc().copy_for_check_in(barcode, title, student_id)?;
        tx.doc_mut().check_in(&book_id, student_id)?;
        let doc = tx.commit().await?;

        tracing::info!(
            "Barcode {} resolved to copy {}, checked in from student {}",
            barcode,
            book_id,
            student_id
        );
        outcome(&doc, &book_id, student_id)
    }

    /// Group the copies under a barcode by title, optionally narrowed to one title
    pub async fn lookup_by_barcode(&self, barcode: &str, title: Option<&str>) -> AppResult<BarcodeLookup> {
        let doc = self.repository.snapshot().await?;
        let groups = match title.map(str::trim).filter(|t| !t.is_empty()) {
            Some(_) => vec![doc.select_barcode_group(barcode, title)?],
            None => doc.barcode_groups(barcode),
        };

        Ok(BarcodeLookup {
            barcode: normalize_barcode(barcode),
            groups,
        })
    }

    /// Loans of one student with overdue flags
    pub async fn student_loans(&self, student_id: &str) -> AppResult<Vec<StudentLoan>> {
        let doc = self.repository.snapshot().await?;
        doc.student_loans(student_id, today())
    }

    pub async fn overdue(&self) -> AppResult<Vec<OverdueLoan>> {
        let doc = self.repository.snapshot().await?;
        Ok(doc.overdue_loans(today()))
    }
}
