use std::fmt::Display;

use crate::peptide::ModifiedSequence;

/// Universal Spectrum Identifier for a scan in a ProteomeXchange dataset,
/// e.g. `mzspec:PXD999007:run:scan:4343:PEPTIDE/2`
#[derive(Clone, Debug, PartialEq)]
pub struct Usi<'a> {
    /// Numeric part of the PXD accession
    pub dataset: u32,
    pub ms_run: &'a str,
    pub scan: usize,
    pub sequence: &'a ModifiedSequence,
    pub charge: u8,
}

impl<'a> Display for Usi<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "mzspec:PXD{:06}:{}:scan:{}:{}/{}",
            self.dataset, self.ms_run, self.scan, self.sequence, self.charge
        )
    }
}
