use std::collections::HashMap;

use serde::Serialize;

use crate::mass::label_shift;
use crate::unimod::UnimodIndex;

/// Where a modification may attach to a peptide
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AllowedSite {
    PeptideN(Option<u8>),
    PeptideC(Option<u8>),
    ProteinN(Option<u8>),
    ProteinC(Option<u8>),
    Residue(u8),
}

impl AllowedSite {
    pub fn is_nterm(&self) -> bool {
        matches!(self, AllowedSite::PeptideN(_) | AllowedSite::ProteinN(_))
    }
}

/// Compiled-in table of frequently observed synthesis artifacts and tags
pub const FIXED_MODIFICATIONS: [(&str, f64); 13] = [
    ("No modification", 0.0),
    ("R tag", 10.008269),
    ("Formyl", 27.994915),
    ("Deamidation", 0.984016),
    ("Acetald +26", 26.1565),
    ("Acetald +28", 28.0313),
    ("Amidation", -0.984016),
    ("Methyl", 14.01565),
    ("Oxidation", 15.994915),
    ("Propionamide", 71.037114),
    ("Butene", 56.06253364),
    ("Carboxy", 43.989829),
    ("Dehydration", -18.010565),
];

/// Named modifications consulted by the resolver before falling back to Unimod
#[derive(Clone, Debug, PartialEq)]
pub struct FixedModifications {
    entries: Vec<(String, f64)>,
}

impl Serialize for FixedModifications {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_map(self.iter())
    }
}

impl Default for FixedModifications {
    fn default() -> Self {
        Self {
            entries: FIXED_MODIFICATIONS
                .iter()
                .map(|(name, mass)| (name.to_string(), *mass))
                .collect(),
        }
    }
}

impl FromIterator<(String, f64)> for FixedModifications {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl FixedModifications {
    pub fn get(&self, name: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, mass)| *mass)
    }

    /// The entry whose mass is closest to `delta`. Earlier entries win ties.
    pub fn closest(&self, delta: f64) -> Option<(&str, f64)> {
        let mut best: Option<(&str, f64)> = None;
        for (name, mass) in &self.entries {
            match best {
                Some((_, m)) if (delta - m).abs() <= (delta - mass).abs() => {}
                _ => best = Some((name.as_str(), *mass)),
            }
        }
        best
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(n, m)| (n.as_str(), *m))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Validate user-supplied fixed modifications. Entries are ordered by name so
/// that tie-breaking in [`FixedModifications::closest`] is reproducible.
pub fn validate_fixed(input: Option<HashMap<String, f64>>) -> FixedModifications {
    let input = match input {
        Some(input) => input,
        None => return FixedModifications::default(),
    };

    let mut entries = Vec::with_capacity(input.len());
    for (name, mass) in input {
        if name.trim().is_empty() {
            log::error!("Skipping fixed modification: empty name");
        } else if !mass.is_finite() {
            log::error!("Skipping fixed modification {}: invalid mass {}", name, mass);
        } else {
            entries.push((name, mass));
        }
    }
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    if entries.is_empty() {
        log::warn!("No valid fixed modifications supplied, using the built-in table");
        return FixedModifications::default();
    }
    FixedModifications { entries }
}

/// Something that can turn a bracketed label into a mass delta
pub trait ModificationMass {
    fn modification_mass(&self, label: &str) -> Option<f64>;

    /// Mass of a label, or zero if it cannot be resolved
    fn mass_or_zero(&self, label: &str) -> f64 {
        match self.modification_mass(label) {
            Some(mass) => mass,
            None => {
                log::debug!("unresolved modification `{}`, assuming 0 Da", label);
                0.0
            }
        }
    }
}

/// Resolves labels against Unimod names, isotope labels, the fixed table and
/// finally signed numeric literals such as `+15.9949`.
#[derive(Copy, Clone)]
pub struct LabelMasses<'a> {
    pub unimod: Option<&'a UnimodIndex>,
    pub fixed: &'a FixedModifications,
}

impl<'a> LabelMasses<'a> {
    pub fn new(unimod: Option<&'a UnimodIndex>, fixed: &'a FixedModifications) -> Self {
        Self { unimod, fixed }
    }
}

impl<'a> ModificationMass for LabelMasses<'a> {
    fn modification_mass(&self, label: &str) -> Option<f64> {
        self.unimod
            .and_then(|index| index.find_by_name(label))
            .or_else(|| label_shift(label))
            .or_else(|| self.fixed.get(label))
            .or_else(|| numeric_delta(label))
    }
}

fn numeric_delta(label: &str) -> Option<f64> {
    if !label.starts_with(['+', '-']) {
        return None;
    }
    label.parse::<f64>().ok().filter(|m| m.is_finite())
}
