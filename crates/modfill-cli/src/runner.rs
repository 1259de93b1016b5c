use super::input::Search;
use super::table::{read_table, Ms2Row};
use anyhow::Context;
use fnv::FnvHashMap;
use log::info;
use modfill_core::localize::Localizer;
use modfill_core::peptide::ModifiedSequence;
use modfill_core::resolver::{MassDeltaCandidate, Resolution, Resolver};
use modfill_core::spectrum::{IndexedSpectrum, RawSpectrum};
use modfill_core::unimod::UnimodIndex;
use modfill_core::usi::Usi;
use std::time::{Duration, Instant};

pub struct Runner {
    pub parameters: Search,
    pub unimod: Option<UnimodIndex>,
    pub sequence: ModifiedSequence,
    pub spectra: FnvHashMap<usize, RawSpectrum>,
    start: Instant,
}

/// Why a single row could not be annotated
#[derive(Debug, PartialEq)]
pub enum RowError {
    InvalidNumber(&'static str, String),
    MissingSpectrum(usize),
}

impl std::fmt::Display for RowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RowError::InvalidNumber(column, value) => {
                write!(f, "invalid value `{}` in column `{}`", value, column)
            }
            RowError::MissingSpectrum(scan) => write!(f, "no spectrum for scan {}", scan),
        }
    }
}

impl std::error::Error for RowError {}

#[derive(Debug, PartialEq)]
pub enum Outcome {
    Predicted,
    Unresolved,
    Confirmed,
}

/// Fields written back to a row once it has been annotated
#[derive(Debug, PartialEq)]
pub struct Annotation {
    pub scan: usize,
    pub sequence: ModifiedSequence,
    pub modification: String,
    pub kind: Option<&'static str>,
    pub mass_delta_difference: String,
    pub localization_scores: String,
    pub usi: String,
}

#[derive(Default, Debug)]
pub struct Summary {
    pub predicted: usize,
    pub unresolved: usize,
    pub confirmed: usize,
    pub failed: usize,
    pub resolve_time: Duration,
    pub localize_time: Duration,
}

/// Row type implied by a candidate, if any
pub fn classify(candidate: &MassDeltaCandidate) -> Option<&'static str> {
    match candidate {
        MassDeltaCandidate::Missing(_)
        | MassDeltaCandidate::Extra(_)
        | MassDeltaCandidate::Dipeptide => Some("synthesis error"),
        MassDeltaCandidate::Named { name, .. } if name.contains("Cation:") => Some("cation"),
        MassDeltaCandidate::Named { .. } => None,
    }
}

fn parse_field<T: std::str::FromStr>(column: &'static str, value: &str) -> Result<T, RowError> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| RowError::InvalidNumber(column, value.into()))
}

impl Runner {
    pub fn new(parameters: Search) -> anyhow::Result<Self> {
        let start = Instant::now();

        let unimod = match &parameters.unimod {
            Some(source) => {
                let index = load_unimod(source)
                    .with_context(|| format!("Failed to load Unimod from `{}`", source))?;
                info!("loaded {} Unimod entries in {:#?}", index.len(), start.elapsed());
                Some(index)
            }
            None => {
                log::warn!("no Unimod source configured - mass lookups use the fixed table only");
                None
            }
        };

        let sequence = parameters
            .sequence
            .parse::<ModifiedSequence>()
            .with_context(|| format!("Failed to parse sequence `{}`", parameters.sequence))?;

        let raw: Vec<RawSpectrum> = modfill_core::read_json(&parameters.spectra)
            .with_context(|| format!("Failed to read spectra from `{}`", parameters.spectra))?;
        let mut spectra = FnvHashMap::default();
        for spectrum in raw {
            if let Some(previous) = spectra.insert(spectrum.scan, spectrum) {
                log::warn!("duplicate spectrum for scan {}, keeping the last", previous.scan);
            }
        }
        info!("loaded {} spectra", spectra.len());

        Ok(Self {
            parameters,
            unimod,
            sequence,
            spectra,
            start,
        })
    }

    fn spectrum(&self, scan: usize) -> Result<IndexedSpectrum, RowError> {
        self.spectra
            .get(&scan)
            .map(IndexedSpectrum::new)
            .ok_or(RowError::MissingSpectrum(scan))
    }

    /// Localize a resolved candidate and build the fields for its row
    pub fn annotate(
        &self,
        row: &Ms2Row,
        resolution: &Resolution,
        localizer: &Localizer,
    ) -> Result<Annotation, RowError> {
        let scan: usize = parse_field("scan number", &row.scan_number)?;
        let charge: u8 = parse_field("precursor charge", &row.precursor_charge)?;

        let (sequence, scores) = match &resolution.candidate {
            MassDeltaCandidate::Missing(lost) => {
                let spectrum = self.spectrum(scan)?;
                match localizer.localize_missing(&self.sequence, lost, &spectrum) {
                    Some(result) => (result.sequence, result.trace.to_string()),
                    None => (self.sequence.clone(), String::new()),
                }
            }
            MassDeltaCandidate::Extra(gained) => {
                (self.sequence.with_prefix_residues(gained), String::new())
            }
            MassDeltaCandidate::Dipeptide => (self.sequence.clone(), String::new()),
            MassDeltaCandidate::Named { mass, .. } if *mass == 0.0 => {
                (self.sequence.clone(), String::new())
            }
            MassDeltaCandidate::Named { name, .. } => {
                let spectrum = self.spectrum(scan)?;
                match localizer.localize(&self.sequence, name, &spectrum) {
                    Some(result) => (result.sequence, result.trace.to_string()),
                    None => (self.sequence.clone(), String::new()),
                }
            }
        };

        let usi = Usi {
            dataset: self.parameters.pxd,
            ms_run: &self.parameters.ms_run,
            scan,
            sequence: &sequence,
            charge,
        }
        .to_string();

        Ok(Annotation {
            scan,
            sequence,
            modification: resolution.candidate.to_string(),
            kind: classify(&resolution.candidate),
            mass_delta_difference: format!("{:.4}", resolution.residual),
            localization_scores: scores,
            usi,
        })
    }

    /// Fill in every open row. Per-row failures are logged and leave the row
    /// as it was read.
    pub fn process(&self, rows: &mut [Ms2Row]) -> Summary {
        let resolver = Resolver::new(&self.parameters.resolver, self.unimod.as_ref());
        let localizer = Localizer::new(
            self.parameters.fragment_tolerance,
            self.unimod.as_ref(),
            &self.parameters.resolver.fixed_modifications,
        );

        let mut summary = Summary::default();
        for (idx, row) in rows.iter_mut().enumerate() {
            if idx > 0 && idx % 1000 == 0 {
                info!("- processed {} rows", idx);
            }
            match self.process_row(row, &resolver, &localizer, &mut summary) {
                Ok(Outcome::Predicted) => summary.predicted += 1,
                Ok(Outcome::Unresolved) => summary.unresolved += 1,
                Ok(Outcome::Confirmed) => summary.confirmed += 1,
                Err(e) => {
                    log::error!("skipping scan `{}`: {}", row.scan_number, e);
                    summary.failed += 1;
                }
            }
        }
        summary
    }

    fn process_row(
        &self,
        row: &mut Ms2Row,
        resolver: &Resolver,
        localizer: &Localizer,
        summary: &mut Summary,
    ) -> Result<Outcome, RowError> {
        if !row.is_open() {
            return Ok(Outcome::Confirmed);
        }
        let delta: f64 = parse_field("precursor mass delta", &row.precursor_mass_delta)?;

        let start = Instant::now();
        let resolution = resolver.resolve(delta, &self.sequence);
        summary.resolve_time += start.elapsed();

        let resolution = match resolution {
            Some(resolution) => resolution,
            None => {
                log::trace!("scan `{}`: no candidate for {}", row.scan_number, delta);
                row.modification.clear();
                return Ok(Outcome::Unresolved);
            }
        };

        let start = Instant::now();
        let annotation = self.annotate(row, &resolution, localizer)?;
        summary.localize_time += start.elapsed();

        log::trace!("scan `{}`: {}", row.scan_number, annotation.usi);
        if self.parameters.scan == Some(annotation.scan) {
            for line in self.scan_report(&resolution, &annotation, localizer) {
                info!("{}", line);
            }
        }
        row.modification = annotation.modification;
        row.mass_delta_difference = annotation.mass_delta_difference;
        row.localization_scores = annotation.localization_scores;
        row.usi = annotation.usi;
        row.confidence = "predicted".into();
        if let Some(kind) = annotation.kind {
            row.kind = kind.into();
        }
        Ok(Outcome::Predicted)
    }

    /// Resolution, placement scores and fragment ion matches of one
    /// annotated scan
    pub fn scan_report(
        &self,
        resolution: &Resolution,
        annotation: &Annotation,
        localizer: &Localizer,
    ) -> Vec<String> {
        let scan = annotation.scan;
        let mut lines = vec![
            format!(
                "scan {}: {} ({:.4} Da, residual {:.4})",
                scan, resolution.candidate, resolution.mass, resolution.residual
            ),
            format!("scan {}: {}", scan, annotation.usi),
        ];
        if !annotation.localization_scores.is_empty() {
            lines.push(format!("scan {}: scores {}", scan, annotation.localization_scores));
        }
        match self.spectrum(scan) {
            Ok(spectrum) => lines.extend(
                localizer
                    .ion_matches(&annotation.sequence, &spectrum)
                    .into_iter()
                    .map(|ion| format!("scan {}: {}", scan, ion)),
            ),
            Err(e) => lines.push(format!("scan {}: {}", scan, e)),
        }
        lines
    }

    pub fn run(mut self) -> anyhow::Result<String> {
        let mut rows = read_table(&self.parameters.table)?;
        info!("read {} rows from {}", rows.len(), self.parameters.table);

        let summary = self.process(&mut rows);
        info!(
            "- predicted: {}, unresolved: {}, confirmed: {}, failed: {}",
            summary.predicted, summary.unresolved, summary.confirmed, summary.failed
        );
        info!(
            "- resolve: {:8} ms, localize: {:8} ms",
            summary.resolve_time.as_millis(),
            summary.localize_time.as_millis()
        );

        let path = self.write_table(&rows)?;
        self.parameters.output_paths.push(path.clone());
        info!("wrote {}", path);
        info!("wrote {}", self.write_parameters()?);
        info!("finished in {}s", self.start.elapsed().as_secs());
        Ok(path)
    }
}

fn load_unimod(source: &str) -> Result<UnimodIndex, modfill_core::Error> {
    if source.starts_with("http://") || source.starts_with("https://") {
        #[cfg(feature = "http")]
        return Ok(UnimodIndex::from_url(source)?);

        #[cfg(not(feature = "http"))]
        return Err(modfill_core::Error::IO(std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            "fetching Unimod over HTTP requires the `http` feature",
        )));
    }
    Ok(UnimodIndex::from_path(source)?)
}

#[cfg(test)]
mod test {
    use super::*;
    use modfill_core::peptide::Residue;

    #[test]
    fn row_types() {
        assert_eq!(
            classify(&MassDeltaCandidate::Missing(vec![Residue::new(b'Q')])),
            Some("synthesis error")
        );
        assert_eq!(classify(&MassDeltaCandidate::Dipeptide), Some("synthesis error"));
        assert_eq!(
            classify(&MassDeltaCandidate::Named {
                name: "Cation:Na".into(),
                mass: 21.981943
            }),
            Some("cation")
        );
        assert_eq!(
            classify(&MassDeltaCandidate::Named {
                name: "Oxidation".into(),
                mass: 15.994915
            }),
            None
        );
    }

    #[test]
    fn numeric_fields() {
        assert_eq!(parse_field::<u8>("precursor charge", " 2 "), Ok(2));
        assert_eq!(
            parse_field::<usize>("scan number", "abc"),
            Err(RowError::InvalidNumber("scan number", "abc".into()))
        );
    }
}
