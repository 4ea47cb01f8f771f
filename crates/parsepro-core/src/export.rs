use thiserror::Error;

use crate::ingest::CandidateRecord;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("CSV serialization failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("CSV flush failed: {0}")]
    Flush(String),
}

pub type ExportResult<T> = Result<T, ExportError>;

/// Download name the collaborator should serve the export under.
pub const EXPORT_FILENAME: &str = "resume_data.csv";

/// Separator used to join list-valued fields into one cell.
pub const LIST_SEPARATOR: &str = ", ";

/// Fixed column order of the export. Consumers parse against this header;
/// it never changes per request.
pub const EXPORT_COLUMNS: [&str; 15] = [
    "name",
    "education",
    "email",
    "contact_no",
    "cgpa",
    "skills",
    "certification",
    "project1_name",
    "project1_description",
    "project2_name",
    "project2_description",
    "project3_name",
    "project3_description",
    "project4_name",
    "project4_description",
];

/// Serialize records into a CSV byte stream in the fixed column order.
/// An empty slice produces a header-only export, never an error.
pub fn export_csv(records: &[CandidateRecord]) -> ExportResult<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer.write_record(EXPORT_COLUMNS)?;

    for record in records {
        let cgpa = record.cgpa.map(|v| v.to_string()).unwrap_or_default();

        let mut row = vec![
            record.name.clone(),
            record.education.clone(),
            record.email.clone(),
            record.contact_no.clone(),
            cgpa,
            record.skills.join(LIST_SEPARATOR),
            record.certification.join(LIST_SEPARATOR),
        ];
        for slot in &record.projects {
            row.push(slot.name.clone());
            row.push(slot.description.clone());
        }

        writer.write_record(&row)?;
    }

    writer
        .into_inner()
        .map_err(|e| ExportError::Flush(e.to_string()))
}
