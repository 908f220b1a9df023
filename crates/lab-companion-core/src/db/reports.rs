//! Report database operations.

use rusqlite::{params, OptionalExtension};

use super::{constraint_context, Database, DbError, DbResult};
use crate::models::{Gender, Report};

const REPORT_COLUMNS: &str = "id, user_id, original_filename, content_type, file_sha256, \
     uploaded_at, raw_text, parsed_success, notes, patient_gender, patient_age";

impl Database {
    /// Insert a new report. The owning user must exist.
    pub fn insert_report(&self, report: &Report) -> DbResult<()> {
        let sql = format!(
            "INSERT INTO reports ({REPORT_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
        );
        self.conn
            .execute(
                &sql,
                params![
                    report.id,
                    report.user_id,
                    report.original_filename,
                    report.content_type,
                    report.file_sha256,
                    report.uploaded_at,
                    report.raw_text,
                    report.parsed_success,
                    report.notes,
                    report.patient_gender.map(|g| g.as_str()),
                    report.patient_age,
                ],
            )
            .map_err(|e| constraint_context(e, &format!("report {}", report.id)))?;
        Ok(())
    }

    /// Record the processing outcome of a report.
    pub fn update_report_outcome(
        &self,
        report_id: &str,
        raw_text: Option<&str>,
        parsed_success: bool,
        notes: Option<&str>,
    ) -> DbResult<()> {
        let rows = self.conn.execute(
            "UPDATE reports SET raw_text = ?2, parsed_success = ?3, notes = ?4 WHERE id = ?1",
            params![report_id, raw_text, parsed_success, notes],
        )?;
        if rows == 0 {
            return Err(DbError::NotFound(format!("report '{report_id}'")));
        }
        Ok(())
    }

    /// Get a report by ID.
    pub fn get_report(&self, id: &str) -> DbResult<Option<Report>> {
        let sql = format!("SELECT {REPORT_COLUMNS} FROM reports WHERE id = ?");
        let row = self
            .conn
            .query_row(&sql, [id], ReportRow::from_row)
            .optional()?;
        row.map(Report::try_from).transpose()
    }

    /// A user's reports, newest first.
    pub fn list_reports_for_user(
        &self,
        user_id: &str,
        skip: usize,
        limit: usize,
    ) -> DbResult<Vec<Report>> {
        let sql = format!(
            "SELECT {REPORT_COLUMNS} FROM reports WHERE user_id = ? \
             ORDER BY uploaded_at DESC, rowid DESC LIMIT ? OFFSET ?"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params![user_id, limit as i64, skip as i64],
            ReportRow::from_row,
        )?;

        let mut reports = Vec::new();
        for row in rows {
            reports.push(row?.try_into()?);
        }
        Ok(reports)
    }

    /// ID of an earlier report by the same user with identical file contents.
    pub fn find_duplicate_upload(
        &self,
        user_id: &str,
        file_sha256: &str,
        exclude_report_id: &str,
    ) -> DbResult<Option<String>> {
        self.conn
            .query_row(
                r#"
                SELECT id FROM reports
                WHERE user_id = ?1 AND file_sha256 = ?2 AND id != ?3
                ORDER BY uploaded_at
                LIMIT 1
                "#,
                params![user_id, file_sha256, exclude_report_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(Into::into)
    }
}

/// Intermediate row struct for database mapping.
struct ReportRow {
    id: String,
    user_id: String,
    original_filename: String,
    content_type: String,
    file_sha256: Option<String>,
    uploaded_at: String,
    raw_text: Option<String>,
    parsed_success: bool,
    notes: Option<String>,
    patient_gender: Option<String>,
    patient_age: Option<u32>,
}

impl ReportRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            original_filename: row.get(2)?,
            content_type: row.get(3)?,
            file_sha256: row.get(4)?,
            uploaded_at: row.get(5)?,
            raw_text: row.get(6)?,
            parsed_success: row.get(7)?,
            notes: row.get(8)?,
            patient_gender: row.get(9)?,
            patient_age: row.get(10)?,
        })
    }
}

impl TryFrom<ReportRow> for Report {
    type Error = DbError;

    fn try_from(row: ReportRow) -> Result<Self, Self::Error> {
        let patient_gender = row
            .patient_gender
            .map(|g| g.parse::<Gender>())
            .transpose()
            .map_err(|e| DbError::InvalidData(e.to_string()))?;

        Ok(Report {
            id: row.id,
            user_id: row.user_id,
            original_filename: row.original_filename,
            content_type: row.content_type,
            file_sha256: row.file_sha256,
            uploaded_at: row.uploaded_at,
            raw_text: row.raw_text,
            parsed_success: row.parsed_success,
            notes: row.notes,
            patient_gender,
            patient_age: row.patient_age,
        })
    }
}
