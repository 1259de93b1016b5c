//! Index over the Unimod modification ontology, loaded from its OBO dump

use std::collections::BTreeSet;
use std::path::Path;

use fnv::FnvHashMap;

use crate::mass::VALID_AA;
use crate::modification::AllowedSite;

pub const UNIMOD_URL: &str = "https://proteomecentral.proteomexchange.org/extern/CVs/unimod.obo";

#[derive(Debug)]
pub enum UnimodError {
    IO(std::io::Error),
    #[cfg(feature = "http")]
    Http(reqwest::Error),
    /// The source parsed, but contained no term with both a name and a mass
    Empty,
}

impl std::fmt::Display for UnimodError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnimodError::IO(e) => write!(f, "UnimodError: {}", e),
            #[cfg(feature = "http")]
            UnimodError::Http(e) => write!(f, "UnimodError: {}", e),
            UnimodError::Empty => f.write_str("UnimodError: no usable [Term] stanzas"),
        }
    }
}

impl std::error::Error for UnimodError {}

impl From<std::io::Error> for UnimodError {
    fn from(e: std::io::Error) -> Self {
        UnimodError::IO(e)
    }
}

#[cfg(feature = "http")]
impl From<reqwest::Error> for UnimodError {
    fn from(e: reqwest::Error) -> Self {
        UnimodError::Http(e)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct UnimodEntry {
    /// Accession, e.g. `UNIMOD:1`
    pub id: String,
    pub name: String,
    /// Monoisotopic mass delta
    pub monoisotopic: f64,
    pub sites: BTreeSet<AllowedSite>,
}

/// Fields collected from a single `[Term]` stanza
#[derive(Default)]
struct Stanza {
    id: Option<String>,
    name: Option<String>,
    mass: Option<f64>,
    sites: FnvHashMap<u32, String>,
    positions: FnvHashMap<u32, String>,
}

impl Stanza {
    fn tag(&mut self, key: &str, value: &str) {
        match key {
            "id" => self.id = Some(value.to_string()),
            "name" => self.name = Some(value.to_string()),
            "xref" => self.xref(value),
            _ => {}
        }
    }

    fn xref(&mut self, value: &str) {
        let (key, value) = match value.split_once(' ') {
            Some((k, v)) => (k, v.trim().trim_matches('"')),
            None => return,
        };

        if key == "delta_mono_mass" {
            match value.parse::<f64>() {
                Ok(mass) if mass.is_finite() => self.mass = Some(mass),
                _ => log::trace!("ignoring unparseable delta_mono_mass `{}`", value),
            }
            return;
        }

        let spec = match key.strip_prefix("spec_") {
            Some(spec) => spec,
            None => return,
        };
        if let Some(n) = spec.strip_suffix("_site").and_then(|n| n.parse().ok()) {
            self.sites.insert(n, value.to_string());
        } else if let Some(n) = spec.strip_suffix("_position").and_then(|n| n.parse().ok()) {
            self.positions.insert(n, value.to_string());
        }
    }

    fn finish(self) -> Option<UnimodEntry> {
        let name = self.name?;
        let monoisotopic = self.mass?;
        let sites = self
            .sites
            .iter()
            .filter_map(|(n, site)| classify_site(site, self.positions.get(n)?))
            .collect();

        Some(UnimodEntry {
            id: self.id.unwrap_or_default(),
            name,
            monoisotopic,
            sites,
        })
    }
}

/// Map a Unimod `(site, position)` pair to an attachment point
fn classify_site(site: &str, position: &str) -> Option<AllowedSite> {
    let residue = match site.as_bytes() {
        [aa] if VALID_AA.contains(aa) => Some(*aa),
        _ if site == "N-term" || site == "C-term" => None,
        _ => return None,
    };

    match (site, position, residue) {
        (_, "Anywhere", Some(aa)) => Some(AllowedSite::Residue(aa)),
        ("N-term", "Any N-term", None) | (_, "Any N-term", Some(_)) => {
            Some(AllowedSite::PeptideN(residue))
        }
        ("N-term", "Protein N-term", None) | (_, "Protein N-term", Some(_)) => {
            Some(AllowedSite::ProteinN(residue))
        }
        ("C-term", "Any C-term", None) | (_, "Any C-term", Some(_)) => {
            Some(AllowedSite::PeptideC(residue))
        }
        ("C-term", "Protein C-term", None) | (_, "Protein C-term", Some(_)) => {
            Some(AllowedSite::ProteinC(residue))
        }
        _ => None,
    }
}

/// Read-only Unimod lookup tables, bucketed by integer mass and by the first
/// character of each name.
#[derive(Clone, Debug, Default)]
pub struct UnimodIndex {
    entries: Vec<UnimodEntry>,
    by_mass: FnvHashMap<i64, Vec<usize>>,
    by_initial: FnvHashMap<char, Vec<usize>>,
}

impl UnimodIndex {
    pub fn parse(contents: &str) -> Result<Self, UnimodError> {
        let mut entries = Vec::new();
        let mut current: Option<Stanza> = None;

        for line in contents.lines() {
            let line = line.trim();
            if line.starts_with('[') && line.ends_with(']') {
                if let Some(entry) = current.take().and_then(Stanza::finish) {
                    entries.push(entry);
                }
                if line == "[Term]" {
                    current = Some(Stanza::default());
                }
                continue;
            }

            // Header lines and non-term stanzas are skipped
            if let Some(stanza) = current.as_mut() {
                if let Some((key, value)) = line.split_once(':') {
                    stanza.tag(key.trim(), value.trim());
                }
            }
        }
        if let Some(entry) = current.and_then(Stanza::finish) {
            entries.push(entry);
        }

        if entries.is_empty() {
            return Err(UnimodError::Empty);
        }
        Ok(Self::from_entries(entries))
    }

    pub fn from_entries(entries: Vec<UnimodEntry>) -> Self {
        let mut by_mass: FnvHashMap<i64, Vec<usize>> = FnvHashMap::default();
        let mut by_initial: FnvHashMap<char, Vec<usize>> = FnvHashMap::default();
        for (idx, entry) in entries.iter().enumerate() {
            by_mass
                .entry(entry.monoisotopic.floor() as i64)
                .or_default()
                .push(idx);
            if let Some(ch) = entry.name.chars().next() {
                by_initial.entry(ch).or_default().push(idx);
            }
        }

        Self {
            entries,
            by_mass,
            by_initial,
        }
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, UnimodError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Fetch and parse the ontology from `url`. There is no retry: any
    /// failure is returned to the caller.
    #[cfg(feature = "http")]
    pub fn from_url(url: &str) -> Result<Self, UnimodError> {
        let contents = reqwest::blocking::get(url)?.error_for_status()?.text()?;
        Self::parse(&contents)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &UnimodEntry> {
        self.entries.iter()
    }

    /// First entry, in load order, of the bucket `floor(delta)` that lies
    /// within `tolerance` of `delta`.
    ///
    /// Adjacent buckets are not searched, so a delta within `tolerance` of an
    /// integer boundary can miss an entry on the other side of it.
    pub fn find_by_mass(&self, delta: f64, tolerance: f64) -> Option<&UnimodEntry> {
        self.by_mass
            .get(&(delta.floor() as i64))?
            .iter()
            .map(|&idx| &self.entries[idx])
            .find(|entry| (entry.monoisotopic - delta).abs() <= tolerance)
    }

    pub fn get(&self, name: &str) -> Option<&UnimodEntry> {
        let initial = name.chars().next()?;
        self.by_initial
            .get(&initial)?
            .iter()
            .map(|&idx| &self.entries[idx])
            .find(|entry| entry.name == name)
    }

    /// Mass delta of the entry named exactly `name`
    pub fn find_by_name(&self, name: &str) -> Option<f64> {
        self.get(name).map(|entry| entry.monoisotopic)
    }

    /// Declared attachment sites. `None` if the entry is unknown or declares
    /// no sites at all.
    pub fn allowed_sites(&self, name: &str) -> Option<&BTreeSet<AllowedSite>> {
        self.get(name)
            .map(|entry| &entry.sites)
            .filter(|sites| !sites.is_empty())
    }
}
