use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

use crate::parser::ParseError;

pub const ADDRESS_NOT_FOUND: &str = "Address not found";
pub const DATE_NOT_FOUND: &str = "None";

pub const COLUMNS: [&str; 6] = [
    "Doctor",
    "Area",
    "Appointment_Link",
    "Address",
    "Office_Appointment_Date",
    "Phone_Appointment_Date",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AppointmentRecord {
    pub doctor: String,
    pub area: String,
    #[serde(rename = "Appointment_Link")]
    pub appointment_link: String,
    pub address: String,
    #[serde(rename = "Office_Appointment_Date")]
    pub office_appointment_date: String,
    #[serde(rename = "Phone_Appointment_Date")]
    pub phone_appointment_date: String,
}

impl AppointmentRecord {
    pub fn cells(&self) -> [&str; 6] {
        [
            self.doctor.as_str(),
            self.area.as_str(),
            self.appointment_link.as_str(),
            self.address.as_str(),
            self.office_appointment_date.as_str(),
            self.phone_appointment_date.as_str(),
        ]
    }
}

/// An appointment block that was left out of the table because a required field is missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("Page {page}, appointment block {block}: missing required field '{field}'")]
pub struct ExtractionError {
    pub page: u32,
    pub block: usize,
    pub field: String,
}

impl ExtractionError {
    pub fn new(page: u32, error: ParseError) -> Self {
        match error {
            ParseError::MissingField { block, field } => Self {
                page,
                block,
                field: field.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultTable {
    pub scraped_at: DateTime<Local>,
    pub records: Vec<AppointmentRecord>,
    pub skipped: Vec<ExtractionError>,
}

impl ResultTable {
    pub fn new(records: Vec<AppointmentRecord>, skipped: Vec<ExtractionError>) -> Self {
        Self {
            scraped_at: Local::now(),
            records,
            skipped,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn column_widths(&self) -> [usize; 6] {
        let mut widths = COLUMNS.map(|c| c.chars().count());
        for record in &self.records {
            for (width, cell) in widths.iter_mut().zip(record.cells()) {
                *width = (*width).max(single_line(cell).chars().count());
            }
        }
        widths
    }
}

/// Table cells are one line each; multi-line values are joined with spaces.
fn single_line(cell: &str) -> String {
    cell.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn write_row(
    f: &mut std::fmt::Formatter<'_>,
    cells: [&str; 6],
    widths: &[usize; 6],
) -> std::fmt::Result {
    write!(f, "│")?;
    for (cell, width) in cells.iter().zip(widths) {
        let cell = single_line(cell);
        let pad = width - cell.chars().count();
        write!(f, " {}{} │", cell, " ".repeat(pad))?;
    }
    writeln!(f)
}

fn write_rule(
    f: &mut std::fmt::Formatter<'_>,
    widths: &[usize; 6],
    (left, mid, right): (&str, &str, &str),
) -> std::fmt::Result {
    let segments: Vec<String> = widths.iter().map(|w| "─".repeat(w + 2)).collect();
    writeln!(f, "{}{}{}", left, segments.join(mid), right)
}

impl Display for ResultTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let widths = self.column_widths();

        write_rule(f, &widths, ("┌", "┬", "┐"))?;
        write_row(f, COLUMNS, &widths)?;
        write_rule(f, &widths, ("├", "┼", "┤"))?;
        for record in &self.records {
            write_row(f, record.cells(), &widths)?;
        }
        write_rule(f, &widths, ("└", "┴", "┘"))?;

        writeln!(
            f,
            "{} record(s), scraped at {}",
            self.records.len(),
            self.scraped_at.format("%Y-%m-%d %H:%M:%S")
        )?;

        if !self.skipped.is_empty() {
            writeln!(f, "\nSkipped {} appointment block(s):", self.skipped.len())?;
            for skipped in &self.skipped {
                writeln!(f, "  - {}", skipped)?;
            }
        }
        Ok(())
    }
}
