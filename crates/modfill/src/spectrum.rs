use std::ops::Range;

use fnv::FnvHashMap;
use serde::{Deserialize, Serialize};

/// An MS2 scan as delivered by the spectrum source
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSpectrum {
    pub scan: usize,
    #[serde(default)]
    pub precursor_mz: f64,
    #[serde(default)]
    pub precursor_charge: u8,
    pub mz: Vec<f64>,
    pub intensity: Vec<f64>,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Peak {
    pub mz: f64,
    pub intensity: f64,
}

/// Peaks sorted by m/z, with an index from integer m/z to the range of
/// peaks whose m/z floors to that integer.
#[derive(Clone, Debug)]
pub struct IndexedSpectrum {
    pub scan: usize,
    pub max_intensity: f64,
    peaks: Vec<Peak>,
    buckets: FnvHashMap<i64, Range<usize>>,
}

impl IndexedSpectrum {
    pub fn new(spectrum: &RawSpectrum) -> Self {
        if spectrum.mz.len() != spectrum.intensity.len() {
            log::warn!(
                "scan {}: {} m/z values but {} intensities, extra values ignored",
                spectrum.scan,
                spectrum.mz.len(),
                spectrum.intensity.len()
            );
        }
        let peaks = spectrum
            .mz
            .iter()
            .zip(spectrum.intensity.iter())
            .map(|(&mz, &intensity)| Peak { mz, intensity });
        Self::from_peaks(spectrum.scan, peaks)
    }

    pub fn from_peaks<I: IntoIterator<Item = Peak>>(scan: usize, peaks: I) -> Self {
        let mut peaks = peaks
            .into_iter()
            .filter(|peak| peak.mz.is_finite() && peak.intensity.is_finite())
            .collect::<Vec<_>>();
        peaks.sort_by(|a, b| a.mz.total_cmp(&b.mz));

        let mut buckets: FnvHashMap<i64, Range<usize>> = FnvHashMap::default();
        let mut start = 0;
        while start < peaks.len() {
            let bucket = peaks[start].mz.floor() as i64;
            let end = start
                + peaks[start..]
                    .iter()
                    .take_while(|peak| peak.mz.floor() as i64 == bucket)
                    .count();
            buckets.insert(bucket, start..end);
            start = end;
        }

        let max_intensity = peaks.iter().map(|p| p.intensity).fold(0.0, f64::max);

        Self {
            scan,
            max_intensity,
            peaks,
            buckets,
        }
    }

    pub fn peaks(&self) -> &[Peak] {
        &self.peaks
    }

    pub fn is_empty(&self) -> bool {
        self.peaks.is_empty()
    }

    /// Peaks whose m/z floors to `bucket`
    pub fn bucket(&self, bucket: i64) -> &[Peak] {
        match self.buckets.get(&bucket) {
            Some(range) => &self.peaks[range.clone()],
            None => &[],
        }
    }

    /// Closest peak within `tolerance` (Da) of `mz`, searching only the
    /// bucket that `mz` floors to
    pub fn matches(&self, mz: f64, tolerance: f64) -> Option<&Peak> {
        let mut best_peak = None;
        let mut min_eps = f64::MAX;
        for peak in self.bucket(mz.floor() as i64) {
            let eps = (peak.mz - mz).abs();
            if eps <= tolerance && eps < min_eps {
                min_eps = eps;
                best_peak = Some(peak);
            }
        }
        best_peak
    }
}
