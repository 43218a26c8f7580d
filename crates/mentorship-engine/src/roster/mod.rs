//! CSV snapshots of students and staff for seeding a directory outside the HTTP path.
//!
//! Student files carry `id,student_code,name,department,semester,risk_level,categories` where
//! `categories` is `name:weight` pairs joined by `;`. Staff files carry
//! `id,name,role,department,specializations,max_capacity` with `;`-separated specializations.

mod parser;

use std::io::Read;
use std::path::Path;

use tracing::info;

use crate::matching::domain::{StaffMember, Student};
use crate::matching::memory::InMemoryDirectory;

use parser::{ParseError, RowError};

#[derive(Debug)]
pub enum RosterImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    InvalidRow { line: usize, message: String },
}

impl std::fmt::Display for RosterImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RosterImportError::Io(err) => write!(f, "failed to read roster file: {}", err),
            RosterImportError::Csv(err) => write!(f, "invalid roster CSV data: {}", err),
            RosterImportError::InvalidRow { line, message } => {
                write!(f, "roster line {}: {}", line, message)
            }
        }
    }
}

impl std::error::Error for RosterImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RosterImportError::Io(err) => Some(err),
            RosterImportError::Csv(err) => Some(err),
            RosterImportError::InvalidRow { .. } => None,
        }
    }
}

impl From<std::io::Error> for RosterImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for RosterImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

impl From<ParseError> for RosterImportError {
    fn from(err: ParseError) -> Self {
        match err {
            ParseError::Csv(err) => Self::Csv(err),
            ParseError::Row(RowError { line, message }) => Self::InvalidRow { line, message },
        }
    }
}

pub struct RosterImporter;

impl RosterImporter {
    pub fn students_from_path<P: AsRef<Path>>(path: P) -> Result<Vec<Student>, RosterImportError> {
        let file = std::fs::File::open(path)?;
        Self::students_from_reader(file)
    }

    pub fn students_from_reader<R: Read>(reader: R) -> Result<Vec<Student>, RosterImportError> {
        Ok(parser::parse_students(reader)?)
    }

    pub fn staff_from_path<P: AsRef<Path>>(path: P) -> Result<Vec<StaffMember>, RosterImportError> {
        let file = std::fs::File::open(path)?;
        Self::staff_from_reader(file)
    }

    pub fn staff_from_reader<R: Read>(reader: R) -> Result<Vec<StaffMember>, RosterImportError> {
        Ok(parser::parse_staff(reader)?)
    }

    /// Loads both files into a fresh directory with no assignments.
    pub fn directory_from_paths<P: AsRef<Path>, Q: AsRef<Path>>(
        students: P,
        staff: Q,
    ) -> Result<InMemoryDirectory, RosterImportError> {
        let students = Self::students_from_path(students)?;
        let staff = Self::staff_from_path(staff)?;
        info!(
            students = students.len(),
            staff = staff.len(),
            "roster loaded"
        );
        Ok(InMemoryDirectory::new(students, staff))
    }
}
