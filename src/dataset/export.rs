//! CSV and JSON serialization of a dataset.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::Dataset;
use crate::models::{ListingRecord, COLUMNS};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("unexpected CSV header: {0}")]
    Header(String),
}

/// Output format for an export.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
}

impl ExportFormat {
    /// Guess the format from a file extension; anything unknown is CSV.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Csv,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.extension())
    }
}

impl Dataset {
    /// Serialize in the given format.
    pub fn export(&self, format: ExportFormat) -> Result<Vec<u8>, ExportError> {
        match format {
            ExportFormat::Csv => self.to_csv(),
            ExportFormat::Json => self.to_json(),
        }
    }

    /// Header row followed by one row per record. The header is written even
    /// when there are no records.
    pub fn to_csv(&self) -> Result<Vec<u8>, ExportError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(COLUMNS)?;
        for record in self.iter() {
            writer.write_record(record.values())?;
        }
        writer
            .into_inner()
            .map_err(|e| ExportError::Io(e.into_error()))
    }

    /// Read back a CSV export.
    pub fn from_csv(data: &[u8]) -> Result<Self, ExportError> {
        let mut reader = csv::Reader::from_reader(data);

        let headers = reader.headers()?;
        if !headers.iter().eq(COLUMNS.iter().copied()) {
            return Err(ExportError::Header(
                headers.iter().collect::<Vec<_>>().join(","),
            ));
        }

        let records = reader
            .deserialize::<ListingRecord>()
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(records))
    }

    /// Pretty-printed JSON array of objects keyed by column name.
    pub fn to_json(&self) -> Result<Vec<u8>, ExportError> {
        Ok(serde_json::to_vec_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NOT_AVAILABLE;

    fn sample() -> Dataset {
        Dataset::new(vec![
            ListingRecord::builder()
                .address(Some("123 Main St, Charlotte, NC".to_string()))
                .price(Some("$300,000".to_string()))
                .url(Some("/p/1".to_string()))
                .bedrooms(Some("3 bds".to_string()))
                .bathrooms(Some("2 ba".to_string()))
                .square_footage(Some("1,500 sqft".to_string()))
                .build(),
            ListingRecord::builder()
                .address(Some(r#"The "Old Mill" Lofts"#.to_string()))
                .build(),
        ])
    }

    #[test]
    fn test_csv_header_and_quoting() {
        let csv = String::from_utf8(sample().to_csv().unwrap()).unwrap();
        let mut lines = csv.lines();

        assert_eq!(
            lines.next(),
            Some("Address,Price,Listing URL,Bedrooms,Bathrooms,Square Footage")
        );
        assert_eq!(
            lines.next(),
            Some(r#""123 Main St, Charlotte, NC","$300,000",/p/1,3 bds,2 ba,"1,500 sqft""#)
        );
        assert_eq!(
            lines.next(),
            Some(r#""The ""Old Mill"" Lofts",N/A,N/A,N/A,N/A,N/A"#)
        );
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn test_csv_round_trip() {
        let dataset = sample();
        let restored = Dataset::from_csv(&dataset.to_csv().unwrap()).unwrap();
        assert_eq!(restored, dataset);
        assert_eq!(restored.records()[1].price(), NOT_AVAILABLE);
    }

    #[test]
    fn test_empty_dataset_still_has_header() {
        let csv = Dataset::default().to_csv().unwrap();
        assert_eq!(
            String::from_utf8(csv).unwrap(),
            "Address,Price,Listing URL,Bedrooms,Bathrooms,Square Footage\n"
        );
    }

    #[test]
    fn test_from_csv_rejects_foreign_header() {
        let result = Dataset::from_csv(b"name,value\na,b\n");
        assert!(matches!(result, Err(ExportError::Header(_))));
    }

    #[test]
    fn test_json_uses_column_names() {
        let json: serde_json::Value =
            serde_json::from_slice(&sample().to_json().unwrap()).unwrap();
        assert_eq!(json[0]["Address"], "123 Main St, Charlotte, NC");
        assert_eq!(json[0]["Listing URL"], "/p/1");
        assert_eq!(json[1]["Square Footage"], "N/A");
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(ExportFormat::from_path(Path::new("out.json")), ExportFormat::Json);
        assert_eq!(ExportFormat::from_path(Path::new("out.csv")), ExportFormat::Csv);
        assert_eq!(ExportFormat::from_path(Path::new("out")), ExportFormat::Csv);
    }
}
