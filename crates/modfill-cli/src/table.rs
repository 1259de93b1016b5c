use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

pub const HEADERS: [&str; 17] = [
    "file root",
    "scan number",
    "scan time",
    "ion injection time",
    "total ion current",
    "maximum precursor intensity",
    "relative intensity",
    "precursor m/z",
    "precursor charge",
    "precursor mass delta",
    "mass delta difference",
    "localization scores",
    "confidence",
    "type",
    "modification",
    "usi",
    "comments",
];

/// One row of an MS2 QC table. Values are kept as text so that untouched
/// rows are written back exactly as read.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct Ms2Row {
    #[serde(rename = "file root", default)]
    pub file_root: String,
    #[serde(rename = "scan number")]
    pub scan_number: String,
    #[serde(rename = "scan time", default)]
    pub scan_time: String,
    #[serde(rename = "ion injection time", alias = "injection time", default)]
    pub ion_injection_time: String,
    #[serde(rename = "total ion current", default)]
    pub total_ion_current: String,
    #[serde(rename = "maximum precursor intensity", default)]
    pub maximum_precursor_intensity: String,
    #[serde(rename = "relative intensity", default)]
    pub relative_intensity: String,
    #[serde(rename = "precursor m/z", default)]
    pub precursor_mz: String,
    #[serde(rename = "precursor charge")]
    pub precursor_charge: String,
    #[serde(rename = "precursor mass delta")]
    pub precursor_mass_delta: String,
    #[serde(rename = "mass delta difference", default)]
    pub mass_delta_difference: String,
    #[serde(rename = "localization scores", default)]
    pub localization_scores: String,
    #[serde(default)]
    pub confidence: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub modification: String,
    #[serde(default)]
    pub usi: String,
    #[serde(default)]
    pub comments: String,
}

impl Ms2Row {
    /// Rows confirmed by a person are never overwritten
    pub fn is_open(&self) -> bool {
        self.confidence.is_empty() || self.confidence == "predicted"
    }

    fn is_blank(&self) -> bool {
        self.scan_number.is_empty()
            && self.precursor_charge.is_empty()
            && self.precursor_mass_delta.is_empty()
    }
}

pub fn read_table<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<Ms2Row>> {
    let path = path.as_ref();
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .from_path(path)
        .with_context(|| format!("Failed to open MS2 table `{}`", path.display()))?;

    let mut rows = Vec::new();
    for (idx, row) in reader.deserialize::<Ms2Row>().enumerate() {
        let row = row.with_context(|| format!("Malformed row {} in `{}`", idx + 1, path.display()))?;
        if !row.is_blank() {
            rows.push(row);
        }
    }
    Ok(rows)
}
