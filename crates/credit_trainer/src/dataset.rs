//! Record files: CSV tables with a header row and single-applicant JSON.

use krishi_credit_core::FarmerRecord;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::info;

use crate::errors::DatasetError;

/// Read every record from a headed CSV file. Label columns are optional.
pub fn read_records_csv(path: &Path) -> Result<Vec<FarmerRecord>, DatasetError> {
    let mut reader = csv::Reader::from_path(path)?;
    let records = reader
        .deserialize()
        .collect::<Result<Vec<FarmerRecord>, csv::Error>>()?;

    if records.is_empty() {
        return Err(DatasetError::Invalid(format!(
            "{} contains no records",
            path.display()
        )));
    }

    info!(path = %path.display(), rows = records.len(), "records loaded");
    Ok(records)
}

/// Write records with a header row, creating parent directories as needed
pub fn write_records_csv(path: &Path, records: &[FarmerRecord]) -> Result<(), DatasetError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut writer = csv::Writer::from_path(path)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;

    info!(path = %path.display(), rows = records.len(), "records written");
    Ok(())
}

/// Read one applicant from a JSON object of field → value
pub fn read_applicant_json(path: &Path) -> Result<FarmerRecord, DatasetError> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}
