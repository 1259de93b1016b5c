//! Explain an observed precursor mass delta.
//!
//! Strategies are tried in priority order: an undetected dipeptide, a gain or
//! loss of residues drawn from the peptide itself, the closest entry of the
//! fixed modification table, and finally a Unimod mass lookup.

use std::collections::{BTreeMap, HashMap};
use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::mass::H2O;
use crate::modification::{validate_fixed, FixedModifications, LabelMasses};
use crate::peptide::{ModifiedSequence, Residue};
use crate::unimod::UnimodIndex;

#[derive(Clone, Debug, PartialEq)]
pub enum MassDeltaCandidate {
    Dipeptide,
    Missing(Vec<Residue>),
    Extra(Vec<Residue>),
    Named { name: String, mass: f64 },
}

fn write_residues(f: &mut std::fmt::Formatter<'_>, residues: &[Residue]) -> std::fmt::Result {
    for residue in residues {
        residue.fmt(f)?;
    }
    Ok(())
}

impl Display for MassDeltaCandidate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MassDeltaCandidate::Dipeptide => f.write_str("dipeptide"),
            MassDeltaCandidate::Missing(residues) => {
                f.write_str("missing ")?;
                write_residues(f, residues)
            }
            MassDeltaCandidate::Extra(residues) => {
                f.write_str("extra ")?;
                write_residues(f, residues)
            }
            MassDeltaCandidate::Named { name, .. } => f.write_str(name),
        }
    }
}

/// Winning candidate for a mass delta
#[derive(Clone, Debug, PartialEq)]
pub struct Resolution {
    pub candidate: MassDeltaCandidate,
    /// Signed mass the candidate accounts for
    pub mass: f64,
    /// `mass - observed_delta`
    pub residual: f64,
}

impl Resolution {
    fn new(candidate: MassDeltaCandidate, mass: f64, observed_delta: f64) -> Self {
        Self {
            candidate,
            mass,
            residual: mass - observed_delta,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Parameters {
    /// Absolute tolerance in Da
    pub tolerance: f64,
    pub max_subset_size: usize,
    /// Expected mass of the intact peptide. When unset the dipeptide test is
    /// made against the observed delta itself.
    pub target_mass: Option<f64>,
    pub fixed_modifications: FixedModifications,
}

#[derive(Default, Debug, Deserialize)]
pub struct Builder {
    pub tolerance: Option<f64>,
    pub max_subset_size: Option<usize>,
    pub target_mass: Option<f64>,
    pub fixed_modifications: Option<HashMap<String, f64>>,
}

impl Builder {
    pub fn make_parameters(self) -> Parameters {
        let tolerance = self.tolerance.unwrap_or(0.002).abs();
        if tolerance >= 0.5 {
            log::warn!(
                "mass delta tolerance {} is close to the integer bucket width; lookups may miss",
                tolerance
            );
        }
        let max_subset_size = self.max_subset_size.unwrap_or(5);
        if max_subset_size > 5 {
            log::warn!(
                "max_subset_size {} will make residue subset search slow",
                max_subset_size
            );
        }

        Parameters {
            tolerance,
            max_subset_size,
            target_mass: self.target_mass,
            fixed_modifications: validate_fixed(self.fixed_modifications),
        }
    }
}

/// Every distinct multiset of `k` residues drawn from the sequence, bounded
/// by each residue's multiplicity. Subsets are sorted, and returned in
/// lexicographic order.
pub fn residue_subsets(sequence: &ModifiedSequence, k: usize) -> Vec<Vec<Residue>> {
    let mut counts: BTreeMap<&Residue, usize> = BTreeMap::new();
    for residue in &sequence.residues {
        *counts.entry(residue).or_default() += 1;
    }
    let counts = counts.into_iter().collect::<Vec<_>>();

    let mut output = Vec::new();
    let mut current = Vec::with_capacity(k);
    choose(&counts, 0, k, &mut current, &mut output);
    output
}

fn choose(
    counts: &[(&Residue, usize)],
    idx: usize,
    remaining: usize,
    current: &mut Vec<Residue>,
    output: &mut Vec<Vec<Residue>>,
) {
    if remaining == 0 {
        output.push(current.clone());
        return;
    }
    let Some(&(residue, count)) = counts.get(idx) else {
        return;
    };

    // More copies of a smaller residue sort first
    for take in (0..=count.min(remaining)).rev() {
        current.extend(std::iter::repeat(residue).take(take).cloned());
        choose(counts, idx + 1, remaining - take, current, output);
        current.truncate(current.len() - take);
    }
}

pub struct Resolver<'a> {
    pub parameters: &'a Parameters,
    pub unimod: Option<&'a UnimodIndex>,
}

impl<'a> Resolver<'a> {
    pub fn new(parameters: &'a Parameters, unimod: Option<&'a UnimodIndex>) -> Self {
        Self { parameters, unimod }
    }

    fn dipeptide(&self, observed_delta: f64) -> Option<Resolution> {
        let reference = self.parameters.target_mass.unwrap_or(observed_delta);
        let mass = 2.0 * reference - H2O;
        ((mass - observed_delta).abs() <= self.parameters.tolerance)
            .then(|| Resolution::new(MassDeltaCandidate::Dipeptide, mass, observed_delta))
    }

    /// Closest gain or loss of residues within tolerance. A later subset only
    /// displaces the current best if it is strictly closer.
    fn residue_subset(&self, observed_delta: f64, sequence: &ModifiedSequence) -> Option<Resolution> {
        let masses = LabelMasses::new(self.unimod, &self.parameters.fixed_modifications);
        let mut lowest = self.parameters.tolerance;
        let mut best: Option<Resolution> = None;

        for k in 1..=self.parameters.max_subset_size {
            for subset in residue_subsets(sequence, k) {
                let mass = subset.iter().map(|r| r.mass(&masses)).sum::<f64>();

                let missing = (observed_delta + mass).abs();
                let extra = (observed_delta - mass).abs();
                if missing <= lowest && (best.is_none() || missing < lowest) {
                    lowest = missing;
                    best = Some(Resolution::new(
                        MassDeltaCandidate::Missing(subset.clone()),
                        -mass,
                        observed_delta,
                    ));
                }
                if extra <= lowest && (best.is_none() || extra < lowest) {
                    lowest = extra;
                    best = Some(Resolution::new(
                        MassDeltaCandidate::Extra(subset),
                        mass,
                        observed_delta,
                    ));
                }
            }
        }
        best
    }

    fn fixed(&self, observed_delta: f64) -> Option<Resolution> {
        let (name, mass) = self.parameters.fixed_modifications.closest(observed_delta)?;
        ((observed_delta - mass).abs() <= self.parameters.tolerance).then(|| {
            Resolution::new(
                MassDeltaCandidate::Named {
                    name: name.to_string(),
                    mass,
                },
                mass,
                observed_delta,
            )
        })
    }

    fn unimod(&self, observed_delta: f64) -> Option<Resolution> {
        let entry = self
            .unimod?
            .find_by_mass(observed_delta, self.parameters.tolerance)?;
        Some(Resolution::new(
            MassDeltaCandidate::Named {
                name: entry.name.clone(),
                mass: entry.monoisotopic,
            },
            entry.monoisotopic,
            observed_delta,
        ))
    }

    /// Propose the best explanation for `observed_delta`, or `None` if no
    /// strategy produces a candidate within tolerance
    pub fn resolve(&self, observed_delta: f64, sequence: &ModifiedSequence) -> Option<Resolution> {
        if let Some(dipeptide) = self.dipeptide(observed_delta) {
            return Some(dipeptide);
        }

        let resolution = match (
            self.residue_subset(observed_delta, sequence),
            self.fixed(observed_delta),
        ) {
            (Some(subset), Some(fixed)) => match fixed.residual.abs() <= subset.residual.abs() {
                true => Some(fixed),
                false => Some(subset),
            },
            (subset, fixed) => fixed.or(subset),
        };

        let resolution = resolution.or_else(|| self.unimod(observed_delta));
        if resolution.is_none() {
            log::debug!(
                "no candidate within {} Da of mass delta {}",
                self.parameters.tolerance,
                observed_delta
            );
        }
        resolution
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::mass::VALID_AA;
    use quickcheck::TestResult;
    use quickcheck_macros::quickcheck;
    use std::collections::BTreeSet;

    fn parameters() -> Parameters {
        Builder::default().make_parameters()
    }

    #[test]
    fn deamidation_from_fixed_table() {
        let parameters = parameters();
        let resolver = Resolver::new(&parameters, None);
        let sequence = "AQDSQVLEEER[R tag]".parse().unwrap();
        let resolution = resolver.resolve(0.984016, &sequence).unwrap();
        assert_eq!(resolution.candidate.to_string(), "Deamidation");
        assert!(resolution.residual.abs() < 1e-9);
    }

    #[test]
    fn dipeptide_with_target_mass() {
        let parameters = Builder {
            target_mass: Some(657.3140),
            ..Default::default()
        }
        .make_parameters();
        let resolver = Resolver::new(&parameters, None);
        let sequence = "AQDSQVLEEER[R tag]".parse().unwrap();
        let resolution = resolver
            .resolve(2.0 * 657.3140 - 18.0106, &sequence)
            .unwrap();
        assert_eq!(resolution.candidate, MassDeltaCandidate::Dipeptide);
        assert!(resolution.residual.abs() < 0.002);
    }

    #[test]
    fn dipeptide_without_target_mass() {
        let parameters = parameters();
        let resolver = Resolver::new(&parameters, None);
        let sequence = "PEPTIDE".parse().unwrap();
        // 2d - water == d only when d is the water mass itself
        let resolution = resolver.resolve(18.0106, &sequence).unwrap();
        assert_eq!(resolution.candidate, MassDeltaCandidate::Dipeptide);
    }

    #[test]
    fn missing_and_extra_residues() {
        let parameters = parameters();
        let resolver = Resolver::new(&parameters, None);
        let sequence: ModifiedSequence = "AQDSQVLEEER[R tag]".parse().unwrap();

        let resolution = resolver.resolve(-(128.0586 + 99.0684), &sequence).unwrap();
        assert_eq!(resolution.candidate.to_string(), "missing QV");
        assert!((resolution.mass + 227.127).abs() < 1e-6);

        let resolution = resolver.resolve(156.1011 + 10.008269, &sequence).unwrap();
        assert_eq!(resolution.candidate.to_string(), "extra R[R tag]");
        assert!(resolution.residual.abs() < 1e-6);
    }

    #[test]
    fn earliest_of_equal_subsets_is_kept() {
        let parameters = parameters();
        let resolver = Resolver::new(&parameters, None);
        // Q has the same 4-decimal mass as A + G
        let sequence = "AGQ".parse().unwrap();
        let resolution = resolver.resolve(-128.0586, &sequence).unwrap();
        assert_eq!(resolution.candidate.to_string(), "missing Q");
    }

    #[test]
    fn closer_candidate_wins_tie_break() {
        let parameters = Builder {
            tolerance: Some(0.05),
            fixed_modifications: Some([("Heavy G".to_string(), 57.05)].into()),
            ..Default::default()
        }
        .make_parameters();
        let resolver = Resolver::new(&parameters, None);
        let sequence = "PEPGIDE".parse().unwrap();

        // extra G is 0.0015 away, the fixed entry 0.027
        let resolution = resolver.resolve(57.023, &sequence).unwrap();
        assert_eq!(resolution.candidate.to_string(), "extra G");

        // now the fixed entry is closer
        let resolution = resolver.resolve(57.045, &sequence).unwrap();
        assert_eq!(resolution.candidate.to_string(), "Heavy G");
        assert!((resolution.residual - 0.005).abs() < 1e-9);
    }

    #[test]
    fn nothing_found() {
        let parameters = parameters();
        let resolver = Resolver::new(&parameters, None);
        let sequence = "PEPTIDE".parse().unwrap();
        assert_eq!(resolver.resolve(3.3333, &sequence), None);
    }

    #[test]
    fn subset_order() {
        let sequence = "KAKA".parse().unwrap();
        let subsets = residue_subsets(&sequence, 2)
            .into_iter()
            .map(|s| s.iter().map(|r| r.code as char).collect::<String>())
            .collect::<Vec<_>>();
        assert_eq!(subsets, vec!["AA", "AK", "KK"]);
        assert!(residue_subsets(&sequence, 5).is_empty());
    }

    fn combinations(n: usize, k: usize) -> Vec<Vec<usize>> {
        if k == 0 {
            return vec![vec![]];
        }
        if n < k {
            return vec![];
        }
        let mut out = combinations(n - 1, k);
        for mut c in combinations(n - 1, k - 1) {
            c.push(n - 1);
            out.push(c);
        }
        out
    }

    #[quickcheck]
    fn subsets_unique_and_exhaustive(residues: Vec<u8>, k: u8) -> TestResult {
        if residues.is_empty() || residues.len() > 10 {
            return TestResult::discard();
        }
        let k = 1 + (k as usize % 5);
        // small alphabet so that repeats are common
        let s = residues
            .iter()
            .map(|aa| VALID_AA[*aa as usize % 4] as char)
            .collect::<String>();
        let sequence: ModifiedSequence = match s.parse() {
            Ok(seq) => seq,
            Err(_) => return TestResult::failed(),
        };

        let subsets = residue_subsets(&sequence, k);
        let unique = subsets.iter().cloned().collect::<BTreeSet<_>>();
        if unique.len() != subsets.len() {
            return TestResult::failed();
        }

        let expected = combinations(sequence.len(), k)
            .into_iter()
            .map(|idx| {
                let mut subset = idx
                    .into_iter()
                    .map(|i| sequence.residues[i].clone())
                    .collect::<Vec<_>>();
                subset.sort();
                subset
            })
            .collect::<BTreeSet<_>>();

        TestResult::from_bool(unique == expected && subsets.iter().all(|s| s.len() == k))
    }
}
