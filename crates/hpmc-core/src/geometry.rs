//! Periodic simulation box, particle poses and random orientation draws.

use std::f64::consts::PI;

use nalgebra::{Quaternion, UnitQuaternion, Vector3};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::errors::{ErrorInfo, HpmcError};

/// Spatial dimensionality of a simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Dimensions {
    /// Planar system; particles live in the `z = 0` plane.
    Two,
    /// Bulk system.
    Three,
}

impl Dimensions {
    /// Returns the dimensionality as an integer.
    pub fn as_usize(self) -> usize {
        match self {
            Dimensions::Two => 2,
            Dimensions::Three => 3,
        }
    }

    /// Returns the dimensionality as a float for use in formulas.
    pub fn as_f64(self) -> f64 {
        self.as_usize() as f64
    }
}

impl TryFrom<u8> for Dimensions {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            2 => Ok(Dimensions::Two),
            3 => Ok(Dimensions::Three),
            other => Err(format!("dimensions must be 2 or 3, got {other}")),
        }
    }
}

impl From<Dimensions> for u8 {
    fn from(value: Dimensions) -> Self {
        value.as_usize() as u8
    }
}

/// Position and orientation of a particle in the lab frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    /// Centre of the particle.
    pub position: Vector3<f64>,
    /// Rotation from the particle frame into the lab frame.
    pub orientation: UnitQuaternion<f64>,
}

impl Pose {
    /// Creates a pose from its parts.
    pub fn new(position: Vector3<f64>, orientation: UnitQuaternion<f64>) -> Self {
        Self {
            position,
            orientation,
        }
    }

    /// Pose at the origin with the identity orientation.
    pub fn identity() -> Self {
        Self::new(Vector3::zeros(), UnitQuaternion::identity())
    }

    /// Returns the same orientation translated to `position`.
    pub fn moved_to(&self, position: Vector3<f64>) -> Self {
        Self::new(position, self.orientation)
    }
}

/// Draws an orientation uniformly from the rotation group matching `dims`.
///
/// In 3D this is Shoemake's uniform unit quaternion; in 2D it is a uniform
/// rotation about the `z` axis.
pub fn random_orientation<R: Rng + ?Sized>(dims: Dimensions, rng: &mut R) -> UnitQuaternion<f64> {
    match dims {
        Dimensions::Two => {
            let theta = rng.gen::<f64>() * 2.0 * PI;
            UnitQuaternion::from_axis_angle(&Vector3::z_axis(), theta)
        }
        Dimensions::Three => {
            let u1: f64 = rng.gen();
            let u2: f64 = rng.gen();
            let u3: f64 = rng.gen();
            let a = (1.0 - u1).sqrt();
            let b = u1.sqrt();
            let quat = Quaternion::new(
                b * (2.0 * PI * u3).cos(),
                a * (2.0 * PI * u2).sin(),
                a * (2.0 * PI * u2).cos(),
                b * (2.0 * PI * u3).sin(),
            );
            UnitQuaternion::from_quaternion(quat)
        }
    }
}

/// Triclinic periodic simulation box centred on the origin.
///
/// Lattice vectors follow the usual tilt-factor convention:
/// `a1 = (Lx, 0, 0)`, `a2 = (xy Ly, Ly, 0)`, `a3 = (xz Lz, yz Lz, Lz)`.
/// In 2D the third vector is ignored for wrapping and the volume is an area.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimBox {
    /// Box length along x.
    pub lx: f64,
    /// Box length along y.
    pub ly: f64,
    /// Box length along z (ignored in 2D).
    #[serde(default = "default_lz")]
    pub lz: f64,
    /// Tilt factor of a2 along x.
    #[serde(default)]
    pub xy: f64,
    /// Tilt factor of a3 along x.
    #[serde(default)]
    pub xz: f64,
    /// Tilt factor of a3 along y.
    #[serde(default)]
    pub yz: f64,
    /// Dimensionality of the box.
    pub dimensions: Dimensions,
}

fn default_lz() -> f64 {
    1.0
}

impl SimBox {
    /// Creates and validates a triclinic box.
    pub fn new(
        lengths: [f64; 3],
        tilts: [f64; 3],
        dimensions: Dimensions,
    ) -> Result<Self, HpmcError> {
        let lz = match dimensions {
            Dimensions::Two => 1.0,
            Dimensions::Three => lengths[2],
        };
        let sim_box = Self {
            lx: lengths[0],
            ly: lengths[1],
            lz,
            xy: tilts[0],
            xz: tilts[1],
            yz: tilts[2],
            dimensions,
        };
        sim_box.validate()?;
        Ok(sim_box)
    }

    /// Cubic 3D box with edge `length`.
    pub fn cube(length: f64) -> Result<Self, HpmcError> {
        Self::new([length; 3], [0.0; 3], Dimensions::Three)
    }

    /// Square 2D box with edge `length`.
    pub fn square(length: f64) -> Result<Self, HpmcError> {
        Self::new([length, length, 1.0], [0.0; 3], Dimensions::Two)
    }

    /// Checks that the lengths are finite and positive.
    pub fn validate(&self) -> Result<(), HpmcError> {
        let lengths = [self.lx, self.ly, self.lz];
        if lengths.iter().any(|l| !l.is_finite() || *l <= 0.0) {
            return Err(HpmcError::Configuration(
                ErrorInfo::new("invalid-box", "box lengths must be finite and positive")
                    .with_context("lx", self.lx)
                    .with_context("ly", self.ly)
                    .with_context("lz", self.lz),
            ));
        }
        if self.dimensions == Dimensions::Two && (self.xz != 0.0 || self.yz != 0.0) {
            return Err(HpmcError::configuration(
                "invalid-box",
                "2D boxes cannot tilt out of plane",
            ));
        }
        Ok(())
    }

    /// Box volume (area in 2D).
    pub fn volume(&self) -> f64 {
        match self.dimensions {
            Dimensions::Two => self.lx * self.ly,
            Dimensions::Three => self.lx * self.ly * self.lz,
        }
    }

    /// Lattice vectors `a1`, `a2`, `a3`.
    pub fn lattice_vectors(&self) -> [Vector3<f64>; 3] {
        let a3 = match self.dimensions {
            Dimensions::Two => Vector3::z(),
            Dimensions::Three => Vector3::new(self.xz * self.lz, self.yz * self.lz, self.lz),
        };
        [
            Vector3::new(self.lx, 0.0, 0.0),
            Vector3::new(self.xy * self.ly, self.ly, 0.0),
            a3,
        ]
    }

    /// Maps a fractional coordinate in `[-0.5, 0.5)^d` to a position.
    pub fn from_fractional(&self, fraction: &Vector3<f64>) -> Vector3<f64> {
        let [a1, a2, a3] = self.lattice_vectors();
        let z = match self.dimensions {
            Dimensions::Two => 0.0,
            Dimensions::Three => fraction.z,
        };
        a1 * fraction.x + a2 * fraction.y + a3 * z
    }

    /// Draws a position uniformly inside the box.
    pub fn random_position<R: Rng + ?Sized>(&self, rng: &mut R) -> Vector3<f64> {
        let fraction = Vector3::new(
            rng.gen::<f64>() - 0.5,
            rng.gen::<f64>() - 0.5,
            rng.gen::<f64>() - 0.5,
        );
        self.from_fractional(&fraction)
    }

    /// Wraps a separation vector onto its nearest periodic replica.
    pub fn minimum_image(&self, delta: &Vector3<f64>) -> Vector3<f64> {
        let [a1, a2, a3] = self.lattice_vectors();
        let mut v = *delta;
        if self.dimensions == Dimensions::Three {
            v -= a3 * (v.z / self.lz).round();
        }
        v -= a2 * (v.y / self.ly).round();
        v -= a1 * (v.x / self.lx).round();
        v
    }

    /// Maps a position into the primary box `[-L/2, L/2)` along each
    /// periodic direction.
    pub fn wrap(&self, position: &Vector3<f64>) -> Vector3<f64> {
        self.minimum_image(position)
    }

    /// Distances between opposite lattice planes along each box direction.
    pub fn nearest_plane_distances(&self) -> Vector3<f64> {
        let [a1, a2, a3] = self.lattice_vectors();
        let volume = a1.dot(&a2.cross(&a3)).abs();
        Vector3::new(
            volume / a2.cross(&a3).norm(),
            volume / a3.cross(&a1).norm(),
            volume / a1.cross(&a2).norm(),
        )
    }

    /// Lattice translations that can bring a replica within `cutoff`.
    ///
    /// Separations are assumed to come from two positions inside the primary
    /// box, so one extra shell is included in every periodic direction. The
    /// zero translation is always the first entry.
    pub fn image_offsets(&self, cutoff: f64) -> Vec<Vector3<f64>> {
        let [a1, a2, a3] = self.lattice_vectors();
        let planes = self.nearest_plane_distances();
        let shells = |spacing: f64| -> i64 { (cutoff / spacing).ceil().max(0.0) as i64 + 1 };
        let nx = shells(planes.x);
        let ny = shells(planes.y);
        let nz = match self.dimensions {
            Dimensions::Two => 0,
            Dimensions::Three => shells(planes.z),
        };
        let mut offsets = vec![Vector3::zeros()];
        for i in -nx..=nx {
            for j in -ny..=ny {
                for k in -nz..=nz {
                    if i == 0 && j == 0 && k == 0 {
                        continue;
                    }
                    offsets.push(a1 * i as f64 + a2 * j as f64 + a3 * k as f64);
                }
            }
        }
        offsets
    }
}
