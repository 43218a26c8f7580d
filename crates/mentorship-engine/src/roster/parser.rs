use serde::{Deserialize, Deserializer};
use std::collections::HashSet;
use std::io::Read;

use crate::matching::domain::{
    CategoryWeight, RiskLevel, StaffId, StaffMember, StaffRole, Student, StudentId,
};

/// A row that deserialized but failed validation. `line` counts the header as line 1.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RowError {
    pub(crate) line: usize,
    pub(crate) message: String,
}

#[derive(Debug)]
pub(crate) enum ParseError {
    Csv(csv::Error),
    Row(RowError),
}

impl From<csv::Error> for ParseError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

fn row_error(line: usize, message: impl Into<String>) -> ParseError {
    ParseError::Row(RowError {
        line,
        message: message.into(),
    })
}

fn reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader)
}

pub(crate) fn parse_students<R: Read>(input: R) -> Result<Vec<Student>, ParseError> {
    let mut csv_reader = reader(input);
    let mut seen = HashSet::new();
    let mut students = Vec::new();

    for (index, record) in csv_reader.deserialize::<StudentRow>().enumerate() {
        let line = index + 2;
        let row = record?;

        if !seen.insert(row.id.clone()) {
            return Err(row_error(line, format!("duplicate student id '{}'", row.id)));
        }

        let risk_level = RiskLevel::from_label(&row.risk_level).ok_or_else(|| {
            row_error(line, format!("unknown risk level '{}'", row.risk_level))
        })?;
        let semester = match row.semester.as_deref() {
            None => None,
            Some(raw) => Some(
                raw.parse::<u8>()
                    .map_err(|_| row_error(line, format!("semester '{raw}' is not a number")))?,
            ),
        };
        let categories = match row.categories.as_deref() {
            None => Vec::new(),
            Some(raw) => parse_categories(raw).map_err(|message| row_error(line, message))?,
        };

        students.push(Student {
            id: StudentId(row.id),
            student_code: row.student_code,
            name: row.name,
            department: row.department,
            semester,
            risk_level,
            categories,
        });
    }

    Ok(students)
}

pub(crate) fn parse_staff<R: Read>(input: R) -> Result<Vec<StaffMember>, ParseError> {
    let mut csv_reader = reader(input);
    let mut seen = HashSet::new();
    let mut staff = Vec::new();

    for (index, record) in csv_reader.deserialize::<StaffRow>().enumerate() {
        let line = index + 2;
        let row = record?;

        if !seen.insert(row.id.clone()) {
            return Err(row_error(line, format!("duplicate staff id '{}'", row.id)));
        }

        let role = StaffRole::from_label(&row.role)
            .ok_or_else(|| row_error(line, format!("unknown staff role '{}'", row.role)))?;
        let specializations = row
            .specializations
            .as_deref()
            .map(split_list)
            .unwrap_or_default();

        staff.push(StaffMember {
            id: StaffId(row.id),
            name: row.name,
            role,
            department: row.department,
            specializations,
            max_capacity: row.max_capacity,
        });
    }

    Ok(staff)
}

#[derive(Debug, Deserialize)]
struct StudentRow {
    id: String,
    student_code: String,
    name: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    department: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    semester: Option<String>,
    risk_level: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    categories: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StaffRow {
    id: String,
    name: String,
    role: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    department: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    specializations: Option<String>,
    max_capacity: u32,
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(';')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parses `name:weight` pairs separated by `;`, e.g. `mental_health:0.6;financial_stress:0.4`.
fn parse_categories(value: &str) -> Result<Vec<CategoryWeight>, String> {
    split_list(value)
        .into_iter()
        .map(|entry| {
            let (name, weight) = entry
                .split_once(':')
                .ok_or_else(|| format!("category '{entry}' is missing a weight"))?;
            let weight = weight
                .trim()
                .parse::<f32>()
                .ok()
                .filter(|weight| weight.is_finite() && *weight >= 0.0)
                .ok_or_else(|| format!("category '{entry}' has an invalid weight"))?;
            Ok(CategoryWeight::new(name.trim(), weight))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_parse_weighted_pairs() {
        let parsed = parse_categories(" mental_health:0.6 ; academic_struggles:0.4;").expect("parses");
        assert_eq!(
            parsed,
            vec![
                CategoryWeight::new("mental_health", 0.6),
                CategoryWeight::new("academic_struggles", 0.4),
            ]
        );
    }

    #[test]
    fn categories_without_weight_are_rejected() {
        let err = parse_categories("mental_health").expect_err("weight required");
        assert!(err.contains("missing a weight"));

        let err = parse_categories("mental_health:-1").expect_err("negative rejected");
        assert!(err.contains("invalid weight"));
    }

    #[test]
    fn blank_optional_columns_become_none() {
        let csv = "id,student_code,name,department,semester,risk_level,categories\n\
                   s1,CS-1,Asha Patel,,,low,\n";
        let students = parse_students(csv.as_bytes()).expect("parses");
        assert_eq!(students[0].department, None);
        assert_eq!(students[0].semester, None);
        assert!(students[0].categories.is_empty());
    }
}
