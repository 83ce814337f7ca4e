//! Domain records loaded into datasets

use std::num::NonZeroU8;

use serde::{Deserialize, Serialize};

use crate::dataset::Record;
use crate::grid::BinSize;
use crate::point::Coordinates;

/// Mass of a proton in daltons
pub const PROTON_MASS: f64 = 1.00727646688;

/// m/z of an ion with the given neutral mass and charge
pub fn mz_from_neutral_mass(neutral_mass: f64, charge: NonZeroU8) -> f64 {
    let z = f64::from(charge.get());
    (neutral_mass + z * PROTON_MASS) / z
}

/// A peptide-spectrum identification from an MS/MS search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeptideId {
    pub peptide: String,
    pub precursor_neutral_mass: f64,
    pub charge: NonZeroU8,
    /// Seconds
    pub retention_time: f64,
    pub probability: f64,
}

impl PeptideId {
    pub fn new(
        peptide: impl Into<String>,
        precursor_neutral_mass: f64,
        charge: NonZeroU8,
        retention_time: f64,
        probability: f64,
    ) -> Self {
        Self {
            peptide: peptide.into(),
            precursor_neutral_mass,
            charge,
            retention_time,
            probability,
        }
    }

    pub fn is_confident(&self, min_probability: f64) -> bool {
        self.probability > min_probability
    }
}

impl Coordinates for PeptideId {
    fn mz(&self) -> f64 {
        mz_from_neutral_mass(self.precursor_neutral_mass, self.charge)
    }

    fn rt(&self) -> f64 {
        self.retention_time
    }
}

impl Record for PeptideId {
    const BIN_SIZE: BinSize = BinSize::TIGHT;

    fn map_rt<F: Fn(f64) -> f64>(&mut self, f: F) {
        self.retention_time = f(self.retention_time);
    }
}

/// An MS1 feature: an isotope envelope traced over an elution window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub id: String,
    pub mz: f64,
    pub charge: u8,
    pub retention_time: f64,
    pub retention_time_min: f64,
    pub retention_time_max: f64,
    pub intensity: f64,
    /// Sequence assigned from MS/MS, if any
    #[serde(default)]
    pub ms2: Option<String>,
}

impl Coordinates for Feature {
    fn mz(&self) -> f64 {
        self.mz
    }

    fn rt(&self) -> f64 {
        self.retention_time
    }

    fn rt_min(&self) -> f64 {
        self.retention_time_min
    }

    fn rt_max(&self) -> f64 {
        self.retention_time_max
    }
}

impl Record for Feature {
    const BIN_SIZE: BinSize = BinSize::LENIENT;

    fn map_rt<F: Fn(f64) -> f64>(&mut self, f: F) {
        self.retention_time = f(self.retention_time);
        self.retention_time_min = f(self.retention_time_min);
        self.retention_time_max = f(self.retention_time_max);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn charge(z: u8) -> NonZeroU8 {
        NonZeroU8::new(z).unwrap()
    }

    #[test]
    fn test_mz_from_neutral_mass() {
        assert_relative_eq!(mz_from_neutral_mass(1000.0, charge(1)), 1001.00727646688, epsilon = 1e-9);
        assert_relative_eq!(mz_from_neutral_mass(1000.0, charge(2)), 501.00727646688, epsilon = 1e-9);
    }

    #[test]
    fn test_peptide_coordinates_are_derived() {
        let mut pid = PeptideId::new("PEPTIDE", 798.36, charge(2), 1200.0, 0.95);
        let before = pid.point();
        pid.precursor_neutral_mass += 2.0;
        assert_relative_eq!(pid.mz() - before.mz, 1.0, epsilon = 1e-9);
        assert_eq!(pid.rt(), 1200.0);
        assert_eq!(pid.rt_min(), 1200.0);
    }

    #[test]
    fn test_confidence_filter() {
        let pid = PeptideId::new("PEPTIDE", 798.36, charge(2), 1200.0, 0.9);
        assert!(!pid.is_confident(0.9));
        assert!(pid.is_confident(0.5));
    }

    #[test]
    fn test_feature_window() {
        let feature = Feature {
            id: "f1".to_string(),
            mz: 400.2,
            charge: 2,
            retention_time: 300.0,
            retention_time_min: 280.0,
            retention_time_max: 330.0,
            intensity: 1e6,
            ms2: None,
        };
        assert_eq!(feature.rt_min(), 280.0);
        assert_eq!(feature.rt_max(), 330.0);
        assert_eq!(Feature::BIN_SIZE, BinSize::LENIENT);
        assert_eq!(PeptideId::BIN_SIZE, BinSize::TIGHT);
    }

    #[test]
    fn test_map_rt_moves_whole_window() {
        let mut feature = Feature {
            id: "f2".to_string(),
            mz: 600.0,
            charge: 3,
            retention_time: 100.0,
            retention_time_min: 90.0,
            retention_time_max: 120.0,
            intensity: 1.0,
            ms2: Some("PEPTIDE".to_string()),
        };
        feature.map_rt(|rt| 2.0 * rt);
        assert_eq!(
            (feature.rt_min(), feature.rt(), feature.rt_max()),
            (180.0, 200.0, 240.0)
        );

        let mut pid = PeptideId::new("PEPTIDE", 798.36, charge(2), 1200.0, 0.95);
        let mz = pid.mz();
        pid.map_rt(|rt| rt - 200.0);
        assert_eq!(pid.rt(), 1000.0);
        assert_eq!(pid.mz(), mz);
    }
}
