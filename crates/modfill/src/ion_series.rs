use crate::mass::{round4, H2O, PROTON};
use crate::modification::ModificationMass;
use crate::peptide::ModifiedSequence;

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd)]
pub enum Kind {
    B,
    Y,
}

/// Theoretical B/Y ion
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Ion {
    pub kind: Kind,
    /// Singly protonated fragment m/z, rounded to 4 decimal places
    pub mz: f64,
}

/// Residue masses of a sequence with every attached label already resolved
#[derive(Clone, Debug, PartialEq)]
pub struct ResidueMasses {
    /// Mass carried by the N-terminal prefix labels
    pub nterm: f64,
    pub residues: Vec<f64>,
}

impl ResidueMasses {
    pub fn new<M: ModificationMass>(sequence: &ModifiedSequence, masses: &M) -> Self {
        Self {
            nterm: sequence.nterm_mass(masses),
            residues: sequence.residues.iter().map(|r| r.mass(masses)).collect(),
        }
    }

    /// Neutral monoisotopic mass of the full peptide
    pub fn monoisotopic(&self) -> f64 {
        self.nterm + self.residues.iter().sum::<f64>() + H2O
    }
}

/// Generate B/Y ions for a sequence. B ions run N to C (b1, b2, ...), Y ions
/// run C to N (y1, y2, ...); both stop one residue short of the full peptide.
pub struct IonSeries<'p> {
    pub kind: Kind,
    cumulative_mass: f64,
    masses: &'p ResidueMasses,
    idx: usize,
}

impl<'p> IonSeries<'p> {
    pub fn new(masses: &'p ResidueMasses, kind: Kind) -> Self {
        let cumulative_mass = match kind {
            Kind::B => PROTON + masses.nterm,
            Kind::Y => PROTON + H2O,
        };
        Self {
            kind,
            cumulative_mass,
            masses,
            idx: 0,
        }
    }
}

impl<'p> Iterator for IonSeries<'p> {
    type Item = Ion;

    fn next(&mut self) -> Option<Self::Item> {
        let len = self.masses.residues.len();
        if self.idx + 1 >= len {
            return None;
        }
        let offset = match self.kind {
            Kind::B => self.idx,
            Kind::Y => len - 1 - self.idx,
        };
        self.cumulative_mass += self.masses.residues[offset];
        self.idx += 1;

        Some(Ion {
            kind: self.kind,
            mz: round4(self.cumulative_mass),
        })
    }
}

/// Complete b1..b(n-1) and y1..y(n-1) ladders for one sequence
#[derive(Clone, Debug, PartialEq)]
pub struct FragmentIons {
    pub b: Vec<f64>,
    pub y: Vec<f64>,
}

impl FragmentIons {
    pub fn new<M: ModificationMass>(sequence: &ModifiedSequence, masses: &M) -> Self {
        Self::from_residue_masses(&ResidueMasses::new(sequence, masses))
    }

    pub fn from_residue_masses(masses: &ResidueMasses) -> Self {
        Self {
            b: IonSeries::new(masses, Kind::B).map(|ion| ion.mz).collect(),
            y: IonSeries::new(masses, Kind::Y).map(|ion| ion.mz).collect(),
        }
    }

    /// `(b[i], y[i])` rows, i.e. b(i+1) alongside y(i+1)
    pub fn pairs(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.b.iter().copied().zip(self.y.iter().copied())
    }

    pub fn len(&self) -> usize {
        self.b.len()
    }

    pub fn is_empty(&self) -> bool {
        self.b.is_empty()
    }
}

/// Neutral monoisotopic mass of a modified peptide
pub fn peptide_mass<M: ModificationMass>(sequence: &ModifiedSequence, masses: &M) -> f64 {
    ResidueMasses::new(sequence, masses).monoisotopic()
}

pub fn b_y_ions<M: ModificationMass>(sequence: &ModifiedSequence, masses: &M) -> Vec<(f64, f64)> {
    FragmentIons::new(sequence, masses).pairs().collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::mass::VALID_AA;
    use crate::modification::{FixedModifications, LabelMasses};
    use quickcheck::TestResult;
    use quickcheck_macros::quickcheck;

    fn check_within(observed: &[f64], expected: &[f64]) {
        assert_eq!(expected.len(), observed.len());
        assert!(
            expected
                .iter()
                .zip(observed.iter())
                .all(|(a, b)| (a - b).abs() < 0.005),
            "{:?}",
            expected
                .iter()
                .zip(observed.iter())
                .map(|(a, b)| a - b)
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn peptide_ladders() {
        let fixed = FixedModifications::default();
        let masses = LabelMasses::new(None, &fixed);
        let ions = FragmentIons::new(&"PEPTIDE".parse().unwrap(), &masses);

        let expected_b = [98.0600, 227.1026, 324.155, 425.2030, 538.287, 653.314];
        let expected_y = [148.0604, 263.0874, 376.171, 477.219, 574.2719, 703.314];
        check_within(&ions.b, &expected_b);
        check_within(&ions.y, &expected_y);
    }

    #[test]
    fn nterm_label_shifts_b_ions_only() {
        let fixed = FixedModifications::default();
        let masses = LabelMasses::new(None, &fixed);
        let plain = FragmentIons::new(&"PEPTIDE".parse().unwrap(), &masses);
        let tagged = FragmentIons::new(&"[Formyl]PEPTIDE".parse().unwrap(), &masses);

        let expected_b = plain.b.iter().map(|b| b + 27.994915).collect::<Vec<_>>();
        check_within(&tagged.b, &expected_b);
        check_within(&tagged.y, &plain.y);
    }

    #[test]
    fn internal_label() {
        let fixed = FixedModifications::default();
        let masses = LabelMasses::new(None, &fixed);
        let plain = FragmentIons::new(&"PEPTIDE".parse().unwrap(), &masses);
        let ions = FragmentIons::new(&"PEPTI[+29.0]DE".parse().unwrap(), &masses);

        // b5 onwards and y3 onwards contain the isoleucine
        for (idx, (b, y)) in ions.pairs().enumerate() {
            let b_shift = if idx >= 4 { 29.0 } else { 0.0 };
            let y_shift = if idx >= 2 { 29.0 } else { 0.0 };
            assert!((b - plain.b[idx] - b_shift).abs() < 1e-3);
            assert!((y - plain.y[idx] - y_shift).abs() < 1e-3);
        }
    }

    #[test]
    fn tagged_arginine() {
        let fixed = FixedModifications::default();
        let masses = LabelMasses::new(None, &fixed);
        let pairs = b_y_ions(&"AQDSQVLEEER[R tag]".parse().unwrap(), &masses);
        assert_eq!(pairs.len(), 10);
        // y1 is the tagged arginine
        let y1 = PROTON + H2O + 156.1011 + 10.008269;
        assert!((pairs[0].1 - y1).abs() < 1e-4, "{:?}", pairs[0]);
        assert!((pairs[0].0 - (PROTON + 71.0371)).abs() < 1e-4);
    }

    #[test]
    fn neutral_mass() {
        let fixed = FixedModifications::default();
        let masses = LabelMasses::new(None, &fixed);
        let mass = peptide_mass(&"[Formyl]PEPTIDE".parse().unwrap(), &masses);
        assert!((mass - (799.3600 + 27.994915)).abs() < 1e-3, "{}", mass);
    }

    #[test]
    fn single_residue_has_no_fragments() {
        let fixed = FixedModifications::default();
        let masses = LabelMasses::new(None, &fixed);
        assert!(b_y_ions(&"K".parse().unwrap(), &masses).is_empty());
    }

    #[quickcheck]
    fn complementary_ions(residues: Vec<u8>) -> TestResult {
        if residues.len() < 2 {
            return TestResult::discard();
        }
        let s = residues
            .iter()
            .map(|aa| VALID_AA[*aa as usize % VALID_AA.len()] as char)
            .collect::<String>();
        let sequence: ModifiedSequence = match s.parse() {
            Ok(seq) => seq,
            Err(_) => return TestResult::failed(),
        };

        let fixed = FixedModifications::default();
        let masses = LabelMasses::new(None, &fixed);
        let total = peptide_mass(&sequence, &masses) + 2.0 * PROTON;
        let ions = FragmentIons::new(&sequence, &masses);
        let n = sequence.len();

        if ions.b.len() != n - 1 || ions.y.len() != n - 1 {
            return TestResult::failed();
        }
        TestResult::from_bool(
            (0..n - 1).all(|i| (ions.b[i] + ions.y[n - 2 - i] - total).abs() < 2e-4),
        )
    }
}
