use crate::runner::Runner;
use crate::table::{Ms2Row, HEADERS};

pub fn serialize_row(row: &Ms2Row) -> csv::ByteRecord {
    let mut record = csv::ByteRecord::new();
    record.push_field(row.file_root.as_bytes());
    // normalize the scan number when it parses, e.g. " 0042" -> "42"
    match row.scan_number.trim().parse::<usize>() {
        Ok(scan) => record.push_field(itoa::Buffer::new().format(scan).as_bytes()),
        Err(_) => record.push_field(row.scan_number.as_bytes()),
    }
    record.push_field(row.scan_time.as_bytes());
    record.push_field(row.ion_injection_time.as_bytes());
    record.push_field(row.total_ion_current.as_bytes());
    record.push_field(row.maximum_precursor_intensity.as_bytes());
    record.push_field(row.relative_intensity.as_bytes());
    record.push_field(row.precursor_mz.as_bytes());
    record.push_field(row.precursor_charge.as_bytes());
    record.push_field(row.precursor_mass_delta.as_bytes());
    record.push_field(row.mass_delta_difference.as_bytes());
    record.push_field(row.localization_scores.as_bytes());
    record.push_field(row.confidence.as_bytes());
    record.push_field(row.kind.as_bytes());
    record.push_field(row.modification.as_bytes());
    record.push_field(row.usi.as_bytes());
    record.push_field(row.comments.as_bytes());
    record
}

impl Runner {
    fn make_path<S: AsRef<str>>(&self, file_name: S) -> std::path::PathBuf {
        self.parameters.output_directory.join(file_name.as_ref())
    }

    /// Resolved parameters and output locations
    pub fn write_parameters(&mut self) -> anyhow::Result<String> {
        let path = self.make_path("results.json");
        self.parameters.output_paths.push(path.display().to_string());
        let bytes = serde_json::to_vec_pretty(&self.parameters)?;
        std::fs::write(&path, bytes)?;
        Ok(path.display().to_string())
    }

    pub fn write_table(&self, rows: &[Ms2Row]) -> anyhow::Result<String> {
        let path = self.make_path("autofilled_ms2_table.csv");

        let mut wtr = csv::WriterBuilder::new().from_writer(vec![]);
        wtr.write_byte_record(&csv::ByteRecord::from(HEADERS.to_vec()))?;
        for row in rows {
            wtr.write_byte_record(&serialize_row(row))?;
        }

        wtr.flush()?;
        let bytes = wtr.into_inner()?;
        std::fs::write(&path, bytes)?;
        Ok(path.display().to_string())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn column_order() {
        let row = Ms2Row {
            scan_number: "0042".into(),
            precursor_charge: "2".into(),
            precursor_mass_delta: "0.984016".into(),
            confidence: "predicted".into(),
            kind: "synthesis error".into(),
            comments: "a, b".into(),
            ..Default::default()
        };
        let record = serialize_row(&row);
        assert_eq!(record.len(), HEADERS.len());
        assert_eq!(&record[1], b"42");
        assert_eq!(&record[9], b"0.984016");
        assert_eq!(&record[12], b"predicted");
        assert_eq!(&record[13], b"synthesis error");
        assert_eq!(&record[16], b"a, b");
    }
}
