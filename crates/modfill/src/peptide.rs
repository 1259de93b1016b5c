use std::{fmt::Display, str::FromStr};

use crate::mass::{Mass, VALID_AA};
use crate::modification::ModificationMass;

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Residue {
    pub code: u8,
    /// Bracketed labels following the residue, in order of appearance
    pub modifications: Vec<String>,
}

impl Residue {
    pub fn new(code: u8) -> Self {
        Self {
            code,
            modifications: Vec::new(),
        }
    }

    /// Residue mass plus the mass of every attached label
    pub fn mass<M: ModificationMass>(&self, masses: &M) -> f64 {
        self.code.monoisotopic()
            + self
                .modifications
                .iter()
                .map(|label| masses.mass_or_zero(label))
                .sum::<f64>()
    }
}

impl Display for Residue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code as char)?;
        for label in &self.modifications {
            write!(f, "[{}]", label)?;
        }
        Ok(())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ParseError {
    Empty,
    /// Position of the bracket that has no partner
    UnbalancedBracket(usize),
    NestedBracket(usize),
    UnknownResidue(char, usize),
    UnexpectedCharacter(char, usize),
}

impl Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::Empty => f.write_str("ParseError: sequence contains no residues"),
            ParseError::UnbalancedBracket(at) => {
                write!(f, "ParseError: unbalanced bracket at position {}", at)
            }
            ParseError::NestedBracket(at) => {
                write!(f, "ParseError: nested bracket at position {}", at)
            }
            ParseError::UnknownResidue(c, at) => {
                write!(f, "ParseError: unknown residue '{}' at position {}", c, at)
            }
            ParseError::UnexpectedCharacter(c, at) => {
                write!(f, "ParseError: unexpected character '{}' at position {}", c, at)
            }
        }
    }
}

impl std::error::Error for ParseError {}

/// A peptide with bracketed modification labels, e.g. `AQDSQVLEEER[R tag]`
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ModifiedSequence {
    /// Labels written before the first residue. They are carried by the
    /// N-terminal fragment ions.
    pub nterm: Vec<String>,
    pub residues: Vec<Residue>,
}

impl ModifiedSequence {
    pub fn parse(s: &str) -> Result<Self, ParseError> {
        let mut nterm = Vec::new();
        let mut residues: Vec<Residue> = Vec::new();
        let mut open: Option<usize> = None;
        let mut label = String::new();

        for (idx, ch) in s.chars().enumerate() {
            match (ch, open) {
                ('[', Some(_)) => return Err(ParseError::NestedBracket(idx)),
                ('[', None) => open = Some(idx),
                (']', None) => return Err(ParseError::UnbalancedBracket(idx)),
                (']', Some(_)) => {
                    let text = std::mem::take(&mut label);
                    match residues.last_mut() {
                        Some(residue) => residue.modifications.push(text),
                        None => nterm.push(text),
                    }
                    open = None;
                }
                (_, Some(_)) => label.push(ch),
                (_, None) if ch.is_ascii_uppercase() => {
                    if !VALID_AA.contains(&(ch as u8)) {
                        return Err(ParseError::UnknownResidue(ch, idx));
                    }
                    residues.push(Residue::new(ch as u8));
                }
                (_, None) => return Err(ParseError::UnexpectedCharacter(ch, idx)),
            }
        }

        if let Some(idx) = open {
            return Err(ParseError::UnbalancedBracket(idx));
        }
        if residues.is_empty() {
            return Err(ParseError::Empty);
        }
        Ok(Self { nterm, residues })
    }

    pub fn len(&self) -> usize {
        self.residues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.residues.is_empty()
    }

    /// Unmodified residue letters
    pub fn stripped(&self) -> String {
        self.residues.iter().map(|r| r.code as char).collect()
    }

    /// All labels in order of appearance, N-terminal prefix first
    pub fn modifications(&self) -> Vec<String> {
        self.nterm
            .iter()
            .chain(self.residues.iter().flat_map(|r| r.modifications.iter()))
            .cloned()
            .collect()
    }

    /// Mass of the N-terminal prefix labels
    pub fn nterm_mass<M: ModificationMass>(&self, masses: &M) -> f64 {
        self.nterm.iter().map(|label| masses.mass_or_zero(label)).sum()
    }

    /// A copy with `label` inserted at `position`: 0 is the N-terminus and
    /// `i` attaches to residue `i - 1`.
    pub fn with_modification(&self, position: usize, label: &str) -> Option<Self> {
        let mut derived = self.clone();
        match position {
            0 => derived.nterm.insert(0, label.to_string()),
            i => derived
                .residues
                .get_mut(i - 1)?
                .modifications
                .push(label.to_string()),
        }
        Some(derived)
    }

    /// A copy with the residues at `indices` removed. Removing the first
    /// residue also removes the N-terminal prefix.
    pub fn without_residues(&self, indices: &[usize]) -> Self {
        let nterm = match indices.contains(&0) {
            true => Vec::new(),
            false => self.nterm.clone(),
        };
        let residues = self
            .residues
            .iter()
            .enumerate()
            .filter(|(idx, _)| !indices.contains(idx))
            .map(|(_, r)| r.clone())
            .collect();
        Self { nterm, residues }
    }

    /// A copy with `gained` residues placed ahead of the first residue, in
    /// the order given: gaining `[G, K]` yields `GK...`, not `KG...`.
    pub fn with_prefix_residues(&self, gained: &[Residue]) -> Self {
        Self {
            nterm: self.nterm.clone(),
            residues: gained.iter().chain(self.residues.iter()).cloned().collect(),
        }
    }
}

impl FromStr for ModifiedSequence {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModifiedSequence::parse(s)
    }
}

impl Display for ModifiedSequence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for label in &self.nterm {
            write!(f, "[{}]", label)?;
        }
        for residue in &self.residues {
            residue.fmt(f)?;
        }
        Ok(())
    }
}

/// Contents of every bracketed span, in order
pub fn extract_modifications(s: &str) -> Result<Vec<String>, ParseError> {
    ModifiedSequence::parse(s).map(|seq| seq.modifications())
}

/// Residue letters with all brackets removed
pub fn strip_modifications(s: &str) -> Result<String, ParseError> {
    ModifiedSequence::parse(s).map(|seq| seq.stripped())
}

#[cfg(test)]
mod test {
    use super::*;
    use quickcheck::TestResult;
    use quickcheck_macros::quickcheck;

    #[test]
    fn parse_tagged_sequence() {
        let seq = ModifiedSequence::parse("AQDSQVLEEER[Label:13C(6)15N(4)]").unwrap();
        assert_eq!(seq.len(), 11);
        assert!(seq.nterm.is_empty());
        assert_eq!(seq.residues[10].code, b'R');
        assert_eq!(
            seq.residues[10].modifications,
            vec!["Label:13C(6)15N(4)".to_string()]
        );
        assert_eq!(seq.stripped(), "AQDSQVLEEER");
    }

    #[test]
    fn prefix_attaches_to_nterm() {
        let seq: ModifiedSequence = "[Acetyl]PEPT[Phospho]IDE".parse().unwrap();
        assert_eq!(seq.nterm, vec!["Acetyl".to_string()]);
        assert_eq!(seq.residues[3].modifications, vec!["Phospho".to_string()]);
        assert_eq!(
            extract_modifications("[Acetyl]PEPT[Phospho]IDE").unwrap(),
            vec!["Acetyl".to_string(), "Phospho".to_string()]
        );
        assert_eq!(
            strip_modifications("[Acetyl]PEPT[Phospho]IDE").unwrap(),
            "PEPTIDE"
        );
    }

    #[test]
    fn parse_errors() {
        assert_eq!(
            ModifiedSequence::parse("PEP[Oxidation"),
            Err(ParseError::UnbalancedBracket(3))
        );
        assert_eq!(
            ModifiedSequence::parse("PEP]"),
            Err(ParseError::UnbalancedBracket(3))
        );
        assert_eq!(
            ModifiedSequence::parse("PE[a[b]]P"),
            Err(ParseError::NestedBracket(4))
        );
        assert_eq!(
            ModifiedSequence::parse("PEPZ"),
            Err(ParseError::UnknownResidue('Z', 3))
        );
        assert_eq!(
            ModifiedSequence::parse("pep"),
            Err(ParseError::UnexpectedCharacter('p', 0))
        );
        assert_eq!(ModifiedSequence::parse(""), Err(ParseError::Empty));
        assert_eq!(ModifiedSequence::parse("[Acetyl]"), Err(ParseError::Empty));
    }

    #[test]
    fn derived_sequences() {
        let seq: ModifiedSequence = "[Acetyl]PEPTIDE".parse().unwrap();
        assert_eq!(
            seq.with_modification(0, "Formyl").unwrap().to_string(),
            "[Formyl][Acetyl]PEPTIDE"
        );
        assert_eq!(
            seq.with_modification(3, "Oxidation").unwrap().to_string(),
            "[Acetyl]PEP[Oxidation]TIDE"
        );
        assert_eq!(
            seq.with_modification(7, "Amidated").unwrap().to_string(),
            "[Acetyl]PEPTIDE[Amidated]"
        );
        assert!(seq.with_modification(8, "Amidated").is_none());

        assert_eq!(seq.without_residues(&[2, 4]).to_string(), "[Acetyl]PETDE");
        assert_eq!(seq.without_residues(&[0]).to_string(), "EPTIDE");

        let gained = [Residue::new(b'G'), Residue::new(b'K')];
        assert_eq!(
            seq.with_prefix_residues(&gained).to_string(),
            "[Acetyl]GKPEPTIDE"
        );
        // Derivation never touches the original
        assert_eq!(seq.to_string(), "[Acetyl]PEPTIDE");
    }

    #[test]
    fn gained_residues_keep_order() {
        let seq: ModifiedSequence = "PEPTIDE".parse().unwrap();
        let gained = [Residue::new(b'G'), Residue::new(b'K'), Residue::new(b'A')];
        assert_eq!(seq.with_prefix_residues(&gained).to_string(), "GKAPEPTIDE");
        assert_eq!(seq.with_prefix_residues(&[]), seq);
    }

    const LABELS: [&str; 5] = [
        "Oxidation",
        "+15.9949",
        "Label:13C(6)15N(4)",
        "R tag",
        "Acetald +26",
    ];

    #[quickcheck]
    fn display_round_trip(residues: Vec<(u8, u8)>, prefix: Option<u8>) -> TestResult {
        if residues.is_empty() {
            return TestResult::discard();
        }
        let mut s = String::new();
        if let Some(p) = prefix {
            s.push_str(&format!("[{}]", LABELS[p as usize % LABELS.len()]));
        }
        for (aa, label) in residues {
            s.push(VALID_AA[aa as usize % VALID_AA.len()] as char);
            if label % 3 == 0 {
                s.push_str(&format!("[{}]", LABELS[label as usize % LABELS.len()]));
            }
        }
        match ModifiedSequence::parse(&s) {
            Ok(seq) => TestResult::from_bool(seq.to_string() == s),
            Err(_) => TestResult::failed(),
        }
    }
}
