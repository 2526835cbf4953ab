//! Coordinate types for farm plots and geographic locations.

use serde::{Deserialize, Serialize};

/// Position of a plot on a player's farm grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridPosition {
    /// Row index (0-based)
    pub row: u16,
    /// Column index (0-based)
    pub col: u16,
}

impl GridPosition {
    /// Creates a new grid position.
    #[must_use]
    pub const fn new(row: u16, col: u16) -> Self {
        Self { row, col }
    }

    /// Checks whether this position lies inside a grid of the given size.
    #[must_use]
    pub const fn within(self, rows: u16, cols: u16) -> bool {
        self.row < rows && self.col < cols
    }
}

impl std::fmt::Display for GridPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Geographic location of a farm, used to look up environmental data.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Latitude in degrees (-90 to 90)
    pub latitude: f64,
    /// Longitude in degrees (-180 to 180)
    pub longitude: f64,
}

impl Location {
    /// Creates a new location.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Checks that both coordinates are finite and in range.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    /// Broad climate region derived from latitude.
    #[must_use]
    pub fn climate_region(&self) -> ClimateRegion {
        let abs_lat = self.latitude.abs();
        if abs_lat >= 66.5 {
            ClimateRegion::Polar
        } else if abs_lat >= 23.5 {
            ClimateRegion::Temperate
        } else {
            ClimateRegion::Tropical
        }
    }
}

/// Climate region bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClimateRegion {
    /// Between the tropics
    Tropical,
    /// Mid latitudes
    Temperate,
    /// Beyond the polar circles
    Polar,
}
