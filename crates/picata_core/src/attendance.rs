//! crates/picata_core/src/attendance.rs
//!
//! Per-quiz attendance: one status per enrolled student, tabulated and
//! serialized to the CSV export.

use chrono::NaiveDate;
use std::collections::HashMap;

use crate::domain::{AttendanceRecord, AttendanceStatus, Student};

pub const CSV_HEADER: &str = "Student Name,Status";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AttendanceError {
    #[error("Student {0} is not enrolled in this course")]
    UnknownStudent(u64),
    #[error("Malformed attendance CSV: {0}")]
    MalformedCsv(String),
}

/// The attendance being collected for one roster.
///
/// Every student starts out Absent; only an explicit mark changes that.
#[derive(Debug, Clone)]
pub struct AttendanceSheet {
    roster: Vec<Student>,
    marks: HashMap<u64, AttendanceStatus>,
}

impl AttendanceSheet {
    pub fn new(roster: Vec<Student>) -> Self {
        Self {
            roster,
            marks: HashMap::new(),
        }
    }

    pub fn mark(&mut self, student_id: u64, status: AttendanceStatus) -> Result<(), AttendanceError> {
        if !self.roster.iter().any(|s| s.id == student_id) {
            return Err(AttendanceError::UnknownStudent(student_id));
        }
        self.marks.insert(student_id, status);
        Ok(())
    }

    pub fn status_of(&self, student_id: u64) -> AttendanceStatus {
        self.marks.get(&student_id).copied().unwrap_or_default()
    }

    /// One row per student, in roster order.
    pub fn rows(&self) -> Vec<AttendanceRecord> {
        self.roster
            .iter()
            .map(|student| AttendanceRecord {
                student_name: student.name.clone(),
                status: self.status_of(student.id),
            })
            .collect()
    }

    pub fn present_count(&self) -> usize {
        self.roster
            .iter()
            .filter(|s| self.status_of(s.id) == AttendanceStatus::Here)
            .count()
    }

    pub fn to_csv(&self) -> String {
        render_csv(&self.rows())
    }
}

fn escape_csv_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

pub fn render_csv(rows: &[AttendanceRecord]) -> String {
    let mut csv = String::from(CSV_HEADER);
    csv.push('\n');
    for row in rows {
        csv.push_str(&escape_csv_field(&row.student_name));
        csv.push(',');
        csv.push_str(row.status.as_str());
        csv.push('\n');
    }
    csv
}

/// Splits CSV text into records of fields, honouring quoted fields.
fn split_records(text: &str) -> Result<Vec<Vec<String>>, AttendanceError> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    field.push('"');
                    chars.next();
                }
                '"' => in_quotes = false,
                _ => field.push(c),
            }
            continue;
        }
        match c {
            '"' if field.is_empty() => in_quotes = true,
            ',' => record.push(std::mem::take(&mut field)),
            '\r' => {}
            '\n' => {
                record.push(std::mem::take(&mut field));
                records.push(std::mem::take(&mut record));
            }
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err(AttendanceError::MalformedCsv("unterminated quoted field".to_string()));
    }
    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push(record);
    }
    Ok(records)
}

/// Reads an attendance export back into its rows.
pub fn parse_csv(text: &str) -> Result<Vec<AttendanceRecord>, AttendanceError> {
    let mut records = split_records(text)?.into_iter();

    match records.next() {
        Some(header) if header.join(",") == CSV_HEADER => {}
        other => {
            return Err(AttendanceError::MalformedCsv(format!(
                "expected header '{}', found {:?}",
                CSV_HEADER, other
            )))
        }
    }

    records
        .enumerate()
        .map(|(i, fields)| match fields.as_slice() {
            [name, status] => {
                let status = AttendanceStatus::parse(status).ok_or_else(|| {
                    AttendanceError::MalformedCsv(format!("row {}: unknown status '{}'", i + 1, status))
                })?;
                Ok(AttendanceRecord {
                    student_name: name.clone(),
                    status,
                })
            }
            _ => Err(AttendanceError::MalformedCsv(format!(
                "row {}: expected 2 fields, found {}",
                i + 1,
                fields.len()
            ))),
        })
        .collect()
}

/// `<Course>_<Quiz>_attendance_<YYYY-MM-DD>.csv` with spaces turned into underscores.
///
/// Path separators become `-` so the export always lands in its directory. Double
/// quotes become `'` and control characters are dropped, which keeps the name
/// usable inside a quoted `Content-Disposition` filename.
pub fn export_file_name(course_name: &str, quiz_title: &str, date: NaiveDate) -> String {
    format!(
        "{}_{}_attendance_{}.csv",
        course_name,
        quiz_title,
        date.format("%Y-%m-%d")
    )
    .chars()
    .filter(|c| !c.is_control())
    .map(|c| match c {
        ' ' => '_',
        '/' | '\\' => '-',
        '"' => '\'',
        other => other,
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster() -> Vec<Student> {
        vec![
            Student { id: 1, name: "Alice".into() },
            Student { id: 2, name: "Bob".into() },
            Student { id: 3, name: "Carol".into() },
        ]
    }

    #[test]
    fn unmarked_students_default_to_absent() {
        let mut sheet = AttendanceSheet::new(roster());
        sheet.mark(1, AttendanceStatus::Here).unwrap();
        sheet.mark(3, AttendanceStatus::Here).unwrap();

        let rows = sheet.rows();
        assert_eq!(rows.len(), 3);
        assert_eq!(sheet.present_count(), 2);
        assert_eq!(rows[1].student_name, "Bob");
        assert_eq!(rows[1].status, AttendanceStatus::Absent);
    }

    #[test]
    fn csv_export_reads_back_identically() {
        let mut sheet = AttendanceSheet::new(roster());
        sheet.mark(1, AttendanceStatus::Here).unwrap();
        sheet.mark(3, AttendanceStatus::Here).unwrap();

        let csv = sheet.to_csv();
        assert!(csv.starts_with("Student Name,Status\n"));

        let parsed = parse_csv(&csv).unwrap();
        assert_eq!(parsed, sheet.rows());
        let here = parsed.iter().filter(|r| r.status == AttendanceStatus::Here).count();
        assert_eq!(here, sheet.present_count());
    }

    #[test]
    fn names_with_commas_and_quotes_are_quoted() {
        let mut sheet = AttendanceSheet::new(vec![
            Student { id: 7, name: "Doe, Jane".into() },
            Student { id: 8, name: "Sam \"Sammy\" Lee".into() },
        ]);
        sheet.mark(8, AttendanceStatus::Here).unwrap();

        let csv = sheet.to_csv();
        assert!(csv.contains("\"Doe, Jane\",Absent\n"));
        assert!(csv.contains("\"Sam \"\"Sammy\"\" Lee\",Here\n"));
        assert_eq!(parse_csv(&csv).unwrap(), sheet.rows());
    }

    #[test]
    fn marking_an_unenrolled_student_fails() {
        let mut sheet = AttendanceSheet::new(roster());
        assert_eq!(
            sheet.mark(42, AttendanceStatus::Here),
            Err(AttendanceError::UnknownStudent(42))
        );
        assert_eq!(sheet.present_count(), 0);
    }

    #[test]
    fn remarking_overrides_previous_status() {
        let mut sheet = AttendanceSheet::new(roster());
        sheet.mark(2, AttendanceStatus::Here).unwrap();
        sheet.mark(2, AttendanceStatus::Absent).unwrap();
        assert_eq!(sheet.present_count(), 0);
    }

    #[test]
    fn file_name_uses_underscores_and_iso_date() {
        let date = NaiveDate::from_ymd_opt(2024, 10, 3).unwrap();
        assert_eq!(
            export_file_name("Discrete Math 101", "Quiz 1", date),
            "Discrete_Math_101_Quiz_1_attendance_2024-10-03.csv"
        );
        assert_eq!(
            export_file_name("CS/ALG", "Week 2", date),
            "CS-ALG_Week_2_attendance_2024-10-03.csv"
        );
    }

    #[test]
    fn file_name_has_no_quotes_or_control_characters() {
        let date = NaiveDate::from_ymd_opt(2024, 10, 3).unwrap();
        let name = export_file_name("Logic \"Honors\"", "Quiz\t1\r\n", date);
        assert_eq!(name, "Logic_'Honors'_Quiz1_attendance_2024-10-03.csv");
        assert!(!name.contains('"'));
        assert!(!name.chars().any(char::is_control));
    }

    #[test]
    fn parse_rejects_wrong_header() {
        assert!(matches!(
            parse_csv("Name,State\nAlice,Here\n"),
            Err(AttendanceError::MalformedCsv(_))
        ));
    }
}
