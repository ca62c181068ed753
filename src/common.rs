use std::ops::RangeInclusive;

/// Number of assign/update iterations of one pass.
pub const ITERATIONS: u16 = 10;
/// Seed spacing is never smaller than this, whatever the host asks for.
pub const MIN_STEP: usize = 2;
pub const DEFAULT_CELL_SIZE: i32 = 30;
pub const DEFAULT_COMPACTNESS: f64 = 20.0;
/// Range offered to the user in the property panel.
pub const CELL_SIZE_RANGE: RangeInclusive<i32> = 5..=200;
/// Range offered to the user in the property panel.
pub const COMPACTNESS_RANGE: RangeInclusive<f64> = 0.1..=100.0;
/// Smallest change of compactness which counts as a modification.
pub const COMPACTNESS_EPSILON: f64 = 1e-6;

/// Main config for the processing.
///
/// The values are supplied by the host (user editable properties), there is nothing read from
/// files or environment.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// Grid spacing of initial cluster seeds (_S_). It's reused as the fixed search radius of
    /// the assignment step, so the search window of every cluster is _2S x 2S_.
    ///
    /// Values below 2 are clamped in `Config::step()`.
    pub cell_size: i32,
    /// Weight (_m_) of the spatial distance against the color distance.
    /// Higher means more compact superpixels -> this is about trading color accuracy for locality.
    pub compactness: f64,
    /// How many iterations is done. Fixed to `ITERATIONS` by the filter.
    pub max_iterations: u16,
}
impl Default for Config {
    fn default() -> Self {
        Self {
            cell_size: DEFAULT_CELL_SIZE,
            compactness: DEFAULT_COMPACTNESS,
            max_iterations: ITERATIONS,
        }
    }
}

/// A property value changed by the user, as reported by the host.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PropertyChange {
    CellSize(i32),
    Compactness(f64),
}

impl Config {
    pub fn new(cell_size: i32, compactness: f64) -> Self {
        Self {
            cell_size,
            compactness,
            ..Self::default()
        }
    }

    /// Seed spacing actually used.
    pub fn step(&self) -> usize {
        (self.cell_size.max(0) as usize).max(MIN_STEP)
    }

    /// Progress units of one pass: setup + iterations + render.
    pub fn progress_total(&self) -> u32 {
        self.max_iterations as u32 + 2
    }

    /// Applies a property change. Returns `true` when the value really changed, which means the
    /// running pass has to be restarted.
    pub fn apply(&mut self, change: PropertyChange) -> bool {
        match change {
            PropertyChange::CellSize(value) => {
                if self.cell_size == value {
                    return false;
                }
                self.cell_size = value;
            }
            PropertyChange::Compactness(value) => {
                if (self.compactness - value).abs() <= COMPACTNESS_EPSILON {
                    return false;
                }
                self.compactness = value;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_test() {
        let config = Config::default();
        assert_eq!(config.cell_size, 30);
        assert_eq!(config.compactness, 20.0);
        assert_eq!(config.step(), 30);
        assert_eq!(config.progress_total(), 12);
        assert!(CELL_SIZE_RANGE.contains(&config.cell_size));
        assert!(COMPACTNESS_RANGE.contains(&config.compactness));
    }

    #[test]
    fn step_clamp_test() {
        assert_eq!(Config::new(1, 10.0).step(), 2);
        assert_eq!(Config::new(0, 10.0).step(), 2);
        assert_eq!(Config::new(-7, 10.0).step(), 2);
        assert_eq!(Config::new(2, 10.0).step(), 2);
        assert_eq!(Config::new(3, 10.0).step(), 3);
    }

    #[test]
    fn property_change_test() {
        let mut config = Config::default();
        assert!(!config.apply(PropertyChange::CellSize(30)));
        assert!(config.apply(PropertyChange::CellSize(31)));
        assert_eq!(config.cell_size, 31);
        assert!(!config.apply(PropertyChange::Compactness(20.0 + 1e-7)));
        assert_eq!(config.compactness, 20.0);
        assert!(config.apply(PropertyChange::Compactness(20.5)));
        assert_eq!(config.compactness, 20.5);
    }
}
