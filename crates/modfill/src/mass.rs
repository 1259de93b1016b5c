use std::{str::FromStr, sync::OnceLock};

use regex::Regex;

pub const H2O: f64 = 18.010565;
pub const PROTON: f64 = 1.007276;

pub const VALID_AA: [u8; 20] = [
    b'A', b'C', b'D', b'E', b'F', b'G', b'H', b'I', b'K', b'L', b'M', b'N', b'P', b'Q', b'R', b'S',
    b'T', b'V', b'W', b'Y',
];

pub trait Mass {
    fn monoisotopic(&self) -> f64;
}

impl Mass for u8 {
    fn monoisotopic(&self) -> f64 {
        match self {
            b'A' => 71.0371,
            b'R' => 156.1011,
            b'N' => 114.0429,
            b'D' => 115.0269,
            b'C' => 103.0092,
            b'E' => 129.0426,
            b'Q' => 128.0586,
            b'G' => 57.0215,
            b'H' => 137.0589,
            b'I' => 113.0841,
            b'L' => 113.0841,
            b'K' => 128.0950,
            b'M' => 131.0405,
            b'F' => 147.0684,
            b'P' => 97.0528,
            b'S' => 87.0320,
            b'T' => 101.0477,
            b'W' => 186.0793,
            b'Y' => 163.0633,
            b'V' => 99.0684,
            _ => unreachable!("BUG: invalid amino acid {}", *self as char),
        }
    }
}

/// Stable isotopes that can appear in a `Label:` annotation, e.g.
/// `Label:13C(6)15N(4)`
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Isotope {
    C13,
    N15,
    O18,
    H2,
}

impl Isotope {
    /// Mass shift of a single heavy atom relative to the light isotope
    pub fn shift(&self) -> f64 {
        match self {
            Isotope::C13 => 1.0033548,
            Isotope::N15 => 0.9970349,
            Isotope::O18 => 2.0042464,
            Isotope::H2 => 1.0062767,
        }
    }
}

impl FromStr for Isotope {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "13C" => Ok(Isotope::C13),
            "15N" => Ok(Isotope::N15),
            "18O" => Ok(Isotope::O18),
            "2H" => Ok(Isotope::H2),
            _ => Err(()),
        }
    }
}

fn label_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+[A-Z])\((\d+)\)").expect("This is valid regex"))
}

/// Sum of `count × shift` over every `Iso(count)` term of an isotope label.
///
/// The optional `Label:` prefix is ignored. Returns `None` unless the whole
/// label consists of recognized isotope terms.
pub fn label_shift(label: &str) -> Option<f64> {
    let body = label.strip_prefix("Label:").unwrap_or(label);
    if body.is_empty() {
        return None;
    }

    let mut consumed = 0;
    let mut shift = 0.0;
    for cap in label_regex().captures_iter(body) {
        let whole = cap.get(0)?;
        if whole.start() != consumed {
            return None;
        }
        consumed = whole.end();

        let isotope = cap[1].parse::<Isotope>().ok()?;
        let count = cap[2].parse::<u32>().ok()?;
        shift += isotope.shift() * count as f64;
    }

    (consumed == body.len()).then_some(shift)
}

/// Round to 4 decimal places, the precision of the residue table
pub fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}
