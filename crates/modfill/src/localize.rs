use std::collections::BTreeSet;
use std::fmt::Display;

use crate::ion_series::{FragmentIons, Kind};
use crate::modification::{AllowedSite, FixedModifications, LabelMasses, ModificationMass};
use crate::peptide::{ModifiedSequence, Residue};
use crate::spectrum::{IndexedSpectrum, Peak};
use crate::unimod::UnimodIndex;

/// Score of one candidate modification position
#[derive(Clone, Debug, PartialEq)]
pub struct PositionScore {
    /// 0 is the N-terminus, `i` is the `i`-th residue (1-based)
    pub position: usize,
    pub residue: Option<u8>,
    /// Whether Unimod lists this position as an allowed site. `None` when
    /// the modification declares no sites.
    pub plausible: Option<bool>,
    pub score: f64,
}

impl Display for PositionScore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(plausible) = self.plausible {
            let label = match self.residue {
                Some(r) => (r as char).to_string(),
                None => "NH2".to_string(),
            };
            match plausible {
                true => write!(f, "{}-", label)?,
                false => write!(f, "{}-", label.to_lowercase())?,
            }
        }
        write!(f, "{:.2}", self.score)
    }
}

/// Score of one candidate set of removed residues
#[derive(Clone, Debug, PartialEq)]
pub struct RemovalScore {
    /// Sorted indices into the original sequence
    pub removed: Vec<usize>,
    /// Original sequence with `_` in place of each removed residue
    pub display: String,
    pub score: f64,
}

impl Display for RemovalScore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{:.2}", self.display, self.score)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Trace {
    Positions(Vec<PositionScore>),
    Removals(Vec<RemovalScore>),
}

fn join<T: Display>(f: &mut std::fmt::Formatter<'_>, items: &[T]) -> std::fmt::Result {
    for (idx, item) in items.iter().enumerate() {
        if idx > 0 {
            f.write_str(",")?;
        }
        item.fmt(f)?;
    }
    Ok(())
}

impl Display for Trace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Trace::Positions(scores) => join(f, scores),
            Trace::Removals(scores) => join(f, scores),
        }
    }
}

/// A theoretical fragment and the peak it matched
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct IonMatch {
    pub kind: Kind,
    /// Number of residues in the fragment
    pub length: usize,
    pub mz: f64,
    pub peak: Option<Peak>,
}

impl Display for IonMatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.kind {
            Kind::B => 'b',
            Kind::Y => 'y',
        };
        write!(f, "{}{} {:.4}", kind, self.length, self.mz)?;
        if let Some(peak) = self.peak {
            write!(f, " ~ {:.4} ({})", peak.mz, peak.intensity)?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct LocalizationResult {
    pub sequence: ModifiedSequence,
    pub score: f64,
    pub trace: Trace,
}

/// Composite 0-10 score: half from the intensity of matched peaks relative to
/// the base peak, half from the fraction of the `2 * length - 2` fragment ions
/// that matched. The intensity term is dropped when nothing matched.
pub fn composite_score(
    match_count: usize,
    matched_intensity: f64,
    max_intensity: f64,
    length: usize,
) -> f64 {
    if length < 2 {
        return 0.0;
    }
    let coverage = 5.0 * match_count as f64 / (2 * length - 2) as f64;
    if match_count == 0 || max_intensity <= 0.0 {
        return coverage;
    }
    5.0 * matched_intensity / (match_count as f64 * max_intensity) + coverage
}

fn plausible(sites: &BTreeSet<AllowedSite>, position: usize, sequence: &ModifiedSequence) -> bool {
    let n = sequence.len();
    if position == 0 {
        return sites.iter().any(AllowedSite::is_nterm);
    }
    let aa = sequence.residues[position - 1].code;
    sites.iter().any(|site| match *site {
        AllowedSite::Residue(r) => r == aa,
        AllowedSite::PeptideN(Some(r)) | AllowedSite::ProteinN(Some(r)) => {
            position == 1 && r == aa
        }
        AllowedSite::PeptideC(r) | AllowedSite::ProteinC(r) => {
            position == n && r.map_or(true, |r| r == aa)
        }
        AllowedSite::PeptideN(None) | AllowedSite::ProteinN(None) => false,
    })
}

/// Every way of choosing one distinct index per list, as sorted index sets
/// with set-equal choices removed
fn removal_sets(lists: &[Vec<usize>]) -> Vec<Vec<usize>> {
    fn walk(
        lists: &[Vec<usize>],
        current: &mut Vec<usize>,
        seen: &mut BTreeSet<Vec<usize>>,
        output: &mut Vec<Vec<usize>>,
    ) {
        let Some((head, tail)) = lists.split_first() else {
            let mut key = current.clone();
            key.sort_unstable();
            if seen.insert(key.clone()) {
                output.push(key);
            }
            return;
        };
        for &idx in head {
            if current.contains(&idx) {
                continue;
            }
            current.push(idx);
            walk(tail, current, seen, output);
            current.pop();
        }
    }

    let mut output = Vec::new();
    walk(
        lists,
        &mut Vec::with_capacity(lists.len()),
        &mut BTreeSet::new(),
        &mut output,
    );
    output
}

/// Scores modification placements against an observed spectrum
pub struct Localizer<'a> {
    /// Fragment m/z tolerance in Da
    pub tolerance: f64,
    pub unimod: Option<&'a UnimodIndex>,
    pub fixed: &'a FixedModifications,
}

impl<'a> Localizer<'a> {
    pub fn new(
        tolerance: f64,
        unimod: Option<&'a UnimodIndex>,
        fixed: &'a FixedModifications,
    ) -> Self {
        Self {
            tolerance,
            unimod,
            fixed,
        }
    }

    fn masses(&self) -> LabelMasses<'a> {
        LabelMasses::new(self.unimod, self.fixed)
    }

    /// Every b and y ion of `sequence` with the closest peak in tolerance
    pub fn ion_matches(
        &self,
        sequence: &ModifiedSequence,
        spectrum: &IndexedSpectrum,
    ) -> Vec<IonMatch> {
        let ions = FragmentIons::new(sequence, &self.masses());
        let b = ions.b.iter().map(|&mz| (Kind::B, mz));
        let y = ions.y.iter().map(|&mz| (Kind::Y, mz));
        b.enumerate()
            .chain(y.enumerate())
            .map(|(idx, (kind, mz))| IonMatch {
                kind,
                length: idx + 1,
                mz,
                peak: spectrum.matches(mz, self.tolerance).copied(),
            })
            .collect()
    }

    /// Match each theoretical ion to at most one peak, then score
    fn score<I>(&self, ions: I, spectrum: &IndexedSpectrum, length: usize) -> f64
    where
        I: Iterator<Item = f64>,
    {
        let mut match_count = 0;
        let mut matched_intensity = 0.0;
        for mz in ions {
            if let Some(peak) = spectrum.matches(mz, self.tolerance) {
                log::trace!("matched {:.4} to peak {:.4} ({})", mz, peak.mz, peak.intensity);
                match_count += 1;
                matched_intensity += peak.intensity;
            }
        }
        composite_score(match_count, matched_intensity, spectrum.max_intensity, length)
    }

    /// Try `modification` at every position from the N-terminus through the
    /// last residue. The highest score wins; ties keep the earliest position.
    pub fn localize(
        &self,
        sequence: &ModifiedSequence,
        modification: &str,
        spectrum: &IndexedSpectrum,
    ) -> Option<LocalizationResult> {
        let masses = self.masses();
        let n = sequence.len();
        let base = FragmentIons::new(sequence, &masses);
        let mod_mass = masses.mass_or_zero(modification);
        let sites = self.unimod.and_then(|index| index.allowed_sites(modification));

        let mut trace = Vec::with_capacity(n + 1);
        let mut best: Option<(f64, ModifiedSequence)> = None;
        for position in 0..=n {
            let Some(candidate) = sequence.with_modification(position, modification) else {
                continue;
            };

            // A fragment carries the modification only if it spans `position`
            let b = base
                .b
                .iter()
                .enumerate()
                .map(|(idx, &b)| if idx + 1 >= position { b + mod_mass } else { b });
            let y = base
                .y
                .iter()
                .enumerate()
                .map(|(idx, &y)| if n - idx <= position { y + mod_mass } else { y });
            let score = self.score(b.chain(y), spectrum, n);

            trace.push(PositionScore {
                position,
                residue: position.checked_sub(1).map(|i| sequence.residues[i].code),
                plausible: sites.map(|sites| plausible(sites, position, sequence)),
                score,
            });
            if best.as_ref().map_or(true, |(s, _)| score > *s) {
                best = Some((score, candidate));
            }
        }

        best.map(|(score, sequence)| LocalizationResult {
            sequence,
            score,
            trace: Trace::Positions(trace),
        })
    }

    /// Decide which occurrences of the `lost` residues were dropped. Coverage
    /// is measured against the length of the full `sequence`.
    pub fn localize_missing(
        &self,
        sequence: &ModifiedSequence,
        lost: &[Residue],
        spectrum: &IndexedSpectrum,
    ) -> Option<LocalizationResult> {
        let masses = self.masses();
        let n = sequence.len();

        let lists = lost
            .iter()
            .map(|residue| {
                sequence
                    .residues
                    .iter()
                    .enumerate()
                    .filter(|(_, r)| *r == residue)
                    .map(|(idx, _)| idx)
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>();

        let mut trace = Vec::new();
        let mut best: Option<(f64, ModifiedSequence)> = None;
        for removed in removal_sets(&lists) {
            if removed.len() >= n {
                continue;
            }
            let candidate = sequence.without_residues(&removed);
            let ions = FragmentIons::new(&candidate, &masses);
            let score = self.score(ions.pairs().flat_map(|(b, y)| [b, y]), spectrum, n);

            let mut display = match removed.contains(&0) {
                true => String::new(),
                false => sequence.nterm.iter().map(|l| format!("[{}]", l)).collect(),
            };
            for (idx, residue) in sequence.residues.iter().enumerate() {
                match removed.contains(&idx) {
                    true => display.push('_'),
                    false => display.push_str(&residue.to_string()),
                }
            }

            trace.push(RemovalScore {
                removed,
                display,
                score,
            });
            if best.as_ref().map_or(true, |(s, _)| score > *s) {
                best = Some((score, candidate));
            }
        }

        if best.is_none() {
            log::debug!("{} does not contain every residue of {:?}", sequence, lost);
        }
        best.map(|(score, sequence)| LocalizationResult {
            sequence,
            score,
            trace: Trace::Removals(trace),
        })
    }
}
