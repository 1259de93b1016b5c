use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{ensure, Context};
use clap::ArgMatches;
use modfill_core::resolver::{Builder, Parameters};
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
/// Actual run parameters - may include overrides or default values not set by user
pub struct Search {
    pub version: String,
    pub sequence: String,
    pub table: String,
    pub spectra: String,
    pub unimod: Option<String>,
    pub resolver: Parameters,
    pub fragment_tolerance: f64,
    pub pxd: u32,
    pub ms_run: String,
    /// Scan to report ion by ion
    pub scan: Option<usize>,
    pub output_paths: Vec<String>,

    #[serde(skip_serializing)]
    pub output_directory: PathBuf,
}

#[derive(Deserialize, Default)]
/// Input parameters deserialized from JSON file
pub struct Input {
    pub sequence: Option<String>,
    pub table: Option<String>,
    pub spectra: Option<String>,
    pub unimod: Option<String>,
    pub resolver: Option<Builder>,
    pub modifications_file: Option<String>,
    pub fragment_tolerance: Option<f64>,
    pub pxd: Option<u32>,
    pub ms_run: Option<String>,
    pub scan: Option<usize>,
    pub output_directory: Option<String>,
}

#[derive(Deserialize)]
struct FixedModificationRow {
    modification: String,
    #[serde(rename = "mass delta")]
    mass_delta: f64,
}

/// Read a `modification,mass delta` CSV table
pub fn read_modifications_file(path: &str) -> anyhow::Result<HashMap<String, f64>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open modifications file `{path}`"))?;
    let mut output = HashMap::new();
    for row in reader.deserialize::<FixedModificationRow>() {
        let row = row.with_context(|| format!("Malformed row in `{path}`"))?;
        output.insert(row.modification, row.mass_delta);
    }
    Ok(output)
}

impl Input {
    pub fn from_arguments(matches: ArgMatches) -> anyhow::Result<Self> {
        let path = matches
            .get_one::<String>("parameters")
            .expect("required parameters");
        let mut input = Input::load(path)
            .with_context(|| format!("Failed to read parameters from `{path}`"))?;

        // Handle JSON configuration overrides
        if let Some(output_directory) = matches.get_one::<String>("output_directory") {
            log::trace!("overriding `output_directory` parameter.");
            input.output_directory = Some(output_directory.into());
        }
        if let Some(sequence) = matches.get_one::<String>("sequence") {
            log::trace!("overriding `sequence` parameter.");
            input.sequence = Some(sequence.into());
        }
        if let Some(table) = matches.get_one::<String>("table") {
            log::trace!("overriding `table` parameter.");
            input.table = Some(table.into());
        }
        if let Some(spectra) = matches.get_one::<String>("spectra") {
            log::trace!("overriding `spectra` parameter.");
            input.spectra = Some(spectra.into());
        }
        if let Some(unimod) = matches.get_one::<String>("unimod") {
            log::trace!("overriding `unimod` parameter.");
            input.unimod = Some(unimod.into());
        }
        if let Some(scan) = matches.get_one::<usize>("scan") {
            log::trace!("overriding `scan` parameter.");
            input.scan = Some(*scan);
        }

        Ok(input)
    }

    pub fn load<S: AsRef<str>>(path: S) -> anyhow::Result<Self> {
        modfill_core::read_json(path).map_err(anyhow::Error::from)
    }

    pub fn build(self) -> anyhow::Result<Search> {
        ensure!(
            self.sequence.is_some(),
            "`sequence` must be set. For more information try '--help'"
        );
        ensure!(
            self.table.is_some(),
            "`table` must be set. For more information try '--help'"
        );
        ensure!(
            self.spectra.is_some(),
            "`spectra` must be set. For more information try '--help'"
        );

        let mut builder = self.resolver.unwrap_or_default();
        if let Some(path) = &self.modifications_file {
            if builder.fixed_modifications.is_some() {
                log::warn!("`modifications_file` replaces `resolver.fixed_modifications`");
            }
            builder.fixed_modifications = Some(read_modifications_file(path)?);
        }

        let fragment_tolerance = self.fragment_tolerance.unwrap_or(0.002).abs();
        if fragment_tolerance >= 0.5 {
            log::warn!(
                "fragment_tolerance {} is close to the integer bucket width; matches may be missed",
                fragment_tolerance
            );
        }

        let output_directory = match self.output_directory {
            Some(path) => {
                let path = PathBuf::from(path);
                std::fs::create_dir_all(&path)?;
                path
            }
            None => std::env::current_dir()?,
        };

        Ok(Search {
            version: clap::crate_version!().into(),
            sequence: self.sequence.unwrap_or_default(),
            table: self.table.unwrap_or_default(),
            spectra: self.spectra.unwrap_or_default(),
            unimod: self.unimod,
            resolver: builder.make_parameters(),
            fragment_tolerance,
            pxd: self.pxd.unwrap_or(0),
            ms_run: self.ms_run.unwrap_or_default(),
            scan: self.scan,
            output_paths: Vec::new(),
            output_directory,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults() -> anyhow::Result<()> {
        let input: Input = serde_json::from_str(
            r#"{
                "sequence": "AQDSQVLEEER[R tag]",
                "table": "ms2.csv",
                "spectra": "spectra.json",
                "resolver": { "target_mass": 657.3140 }
            }"#,
        )?;
        let search = input.build()?;
        assert_eq!(search.fragment_tolerance, 0.002);
        assert_eq!(search.resolver.tolerance, 0.002);
        assert_eq!(search.resolver.max_subset_size, 5);
        assert_eq!(search.resolver.target_mass, Some(657.3140));
        assert_eq!(search.resolver.fixed_modifications.len(), 13);
        assert_eq!(search.pxd, 0);
        assert!(search.unimod.is_none());
        Ok(())
    }

    #[test]
    fn required_fields() {
        let input: Input = serde_json::from_str(r#"{ "sequence": "PEPTIDE" }"#).unwrap();
        let err = input.build().err().unwrap();
        assert!(err.to_string().contains("`table` must be set"));
    }

    #[test]
    fn modifications_file() -> anyhow::Result<()> {
        let path = std::env::temp_dir().join("modfill-cli-modifications.csv");
        std::fs::write(&path, "modification,mass delta\nR tag,10.008269\nSodium,21.981943\n")?;
        let input = Input {
            sequence: Some("PEPTIDE".into()),
            table: Some("ms2.csv".into()),
            spectra: Some("spectra.json".into()),
            modifications_file: Some(path.to_string_lossy().into_owned()),
            ..Default::default()
        };
        let search = input.build()?;
        let fixed = &search.resolver.fixed_modifications;
        assert_eq!(fixed.len(), 2);
        assert_eq!(fixed.get("Sodium"), Some(21.981943));
        Ok(())
    }
}
