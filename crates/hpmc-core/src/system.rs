use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

use crate::errors::{ErrorInfo, HpmcError};
use crate::geometry::SimBox;
use crate::shape::Shape;
use crate::{ConfigurationProvider, ShapeCommit};

/// Symmetric table deciding which pairs of particle types interact.
///
/// Every pair interacts until it is explicitly excluded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionMatrix {
    n_types: usize,
    entries: Vec<bool>,
}

impl InteractionMatrix {
    /// Creates a matrix over `n_types` types where every pair interacts.
    pub fn all_interacting(n_types: usize) -> Self {
        Self {
            n_types,
            entries: vec![true; n_types * n_types],
        }
    }

    /// Number of types covered by the matrix.
    pub fn n_types(&self) -> usize {
        self.n_types
    }

    /// Sets whether `a` and `b` interact, keeping the table symmetric.
    pub fn set(&mut self, a: usize, b: usize, interacts: bool) -> Result<(), HpmcError> {
        if a >= self.n_types || b >= self.n_types {
            return Err(HpmcError::Configuration(
                ErrorInfo::new("unknown-type", "interaction entry references an unknown type")
                    .with_context("a", a)
                    .with_context("b", b)
                    .with_context("n_types", self.n_types),
            ));
        }
        self.entries[a * self.n_types + b] = interacts;
        self.entries[b * self.n_types + a] = interacts;
        Ok(())
    }

    /// Returns whether `a` and `b` interact. Unknown types never interact.
    pub fn interacts(&self, a: usize, b: usize) -> bool {
        if a >= self.n_types || b >= self.n_types {
            return false;
        }
        self.entries[a * self.n_types + b]
    }

    fn grow(&mut self, n_types: usize) {
        let mut grown = Self::all_interacting(n_types);
        for a in 0..self.n_types {
            for b in 0..self.n_types {
                grown.entries[a * n_types + b] = self.entries[a * self.n_types + b];
            }
        }
        *self = grown;
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Particle {
    position: Vector3<f64>,
    orientation: UnitQuaternion<f64>,
    type_id: usize,
}

/// Owned particle configuration with a per-type shape table.
#[derive(Debug, Clone)]
pub struct SystemState {
    sim_box: SimBox,
    type_names: Vec<String>,
    shapes: Vec<Option<Shape>>,
    particles: Vec<Particle>,
    interactions: InteractionMatrix,
}

impl SystemState {
    /// Creates an empty system in `sim_box` with the given type names.
    pub fn new<S: Into<String>>(
        sim_box: SimBox,
        type_names: impl IntoIterator<Item = S>,
    ) -> Result<Self, HpmcError> {
        sim_box.validate()?;
        let type_names: Vec<String> = type_names.into_iter().map(Into::into).collect();
        let n_types = type_names.len();
        Ok(Self {
            sim_box,
            type_names,
            shapes: vec![None; n_types],
            particles: Vec::new(),
            interactions: InteractionMatrix::all_interacting(n_types),
        })
    }

    /// Registers a new particle type and returns its id.
    pub fn add_type(&mut self, name: impl Into<String>) -> usize {
        self.type_names.push(name.into());
        self.shapes.push(None);
        self.interactions.grow(self.type_names.len());
        self.type_names.len() - 1
    }

    /// Adds a particle and returns its index.
    ///
    /// The position is wrapped into the primary box, since image searches
    /// only reach one shell beyond it.
    pub fn add_particle(
        &mut self,
        type_id: usize,
        position: Vector3<f64>,
        orientation: UnitQuaternion<f64>,
    ) -> Result<usize, HpmcError> {
        self.check_type(type_id)?;
        if position.iter().any(|x| !x.is_finite()) {
            return Err(HpmcError::Configuration(
                ErrorInfo::new("invalid-position", "particle positions must be finite")
                    .with_context("x", position.x)
                    .with_context("y", position.y)
                    .with_context("z", position.z),
            ));
        }
        self.particles.push(Particle {
            position: self.sim_box.wrap(&position),
            orientation,
            type_id,
        });
        Ok(self.particles.len() - 1)
    }

    /// Assigns the shape of `type_id` after validating it against the box.
    pub fn set_shape(&mut self, type_id: usize, shape: Shape) -> Result<(), HpmcError> {
        self.check_type(type_id)?;
        shape.validate(self.sim_box.dimensions)?;
        self.shapes[type_id] = Some(shape);
        Ok(())
    }

    /// Builder-style variant of [`SystemState::set_shape`].
    pub fn with_shape(mut self, type_id: usize, shape: Shape) -> Result<Self, HpmcError> {
        self.set_shape(type_id, shape)?;
        Ok(self)
    }

    /// Looks up a type id by name.
    pub fn type_id(&self, name: &str) -> Option<usize> {
        self.type_names.iter().position(|n| n == name)
    }

    /// Mutable access to the interaction matrix.
    pub fn interaction_matrix_mut(&mut self) -> &mut InteractionMatrix {
        &mut self.interactions
    }

    /// Read access to the interaction matrix.
    pub fn interaction_matrix(&self) -> &InteractionMatrix {
        &self.interactions
    }

    fn check_type(&self, type_id: usize) -> Result<(), HpmcError> {
        if type_id >= self.type_names.len() {
            return Err(HpmcError::Configuration(
                ErrorInfo::new("unknown-type", "particle type id is out of range")
                    .with_context("type_id", type_id)
                    .with_context("n_types", self.type_names.len()),
            ));
        }
        Ok(())
    }
}

impl ConfigurationProvider for SystemState {
    fn sim_box(&self) -> &SimBox {
        &self.sim_box
    }

    fn particle_count(&self) -> usize {
        self.particles.len()
    }

    fn type_count(&self) -> usize {
        self.type_names.len()
    }

    fn position(&self, index: usize) -> Vector3<f64> {
        self.particles[index].position
    }

    fn orientation(&self, index: usize) -> UnitQuaternion<f64> {
        self.particles[index].orientation
    }

    fn type_of(&self, index: usize) -> usize {
        self.particles[index].type_id
    }

    fn type_name(&self, type_id: usize) -> Option<&str> {
        self.type_names.get(type_id).map(String::as_str)
    }

    fn shape(&self, type_id: usize) -> Option<&Shape> {
        self.shapes.get(type_id).and_then(Option::as_ref)
    }

    fn interacts(&self, a: usize, b: usize) -> bool {
        self.interactions.interacts(a, b)
    }
}

impl ShapeCommit for SystemState {
    fn commit_shape(&mut self, type_id: usize, shape: Shape) -> Result<(), HpmcError> {
        self.set_shape(type_id, shape)
    }
}
