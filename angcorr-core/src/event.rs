//! Coincidence hit types produced by event preprocessing.
//!
//! The preprocessor hands over per-event lists of hits already filtered
//! by multiplicity and minimum energy; the analysis layer only needs
//! energies, 3D positions (for pairwise opening angles), timestamps,
//! and detector channels.

use serde::{Deserialize, Serialize};

/// 3D position of a detector crystal, in millimeters from the target.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// X coordinate.
    pub x: f64,
    /// Y coordinate.
    pub y: f64,
    /// Z coordinate.
    pub z: f64,
}

impl Position {
    /// Creates a new position.
    #[inline]
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Vector magnitude.
    #[inline]
    pub fn norm(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Dot product with another position vector.
    #[inline]
    pub fn dot(&self, other: &Self) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }
}

/// Opening angle between two position vectors, in degrees.
///
/// Returns a value in [0, 180]; the cosine is clamped so numerical
/// noise on collinear vectors cannot push it outside the domain of
/// `acos`.
pub fn angle_between(a: &Position, b: &Position) -> f64 {
    let norms = a.norm() * b.norm();
    if norms == 0.0 {
        return 0.0;
    }
    let cos = (a.dot(b) / norms).clamp(-1.0, 1.0);
    cos.acos().to_degrees()
}

/// A single suppressed detector hit inside a coincidence event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoincidenceHit {
    /// Calibrated gamma energy in keV.
    pub energy_kev: f64,
    /// Crystal position.
    pub position: Position,
    /// Timestamp in nanoseconds.
    pub time_ns: f64,
    /// Detector channel number.
    pub detector: u16,
}

impl CoincidenceHit {
    /// Creates a new hit.
    pub fn new(energy_kev: f64, position: Position, time_ns: f64, detector: u16) -> Self {
        Self {
            energy_kev,
            position,
            time_ns,
            detector,
        }
    }
}
