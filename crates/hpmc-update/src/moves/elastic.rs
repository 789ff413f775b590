use std::collections::BTreeMap;

use hpmc_core::{ConfigurationProvider, Dimensions, ErrorInfo, HpmcError, RngHandle, Shape};
use nalgebra::{Matrix3, Vector3};

use super::{
    check_probability, uniform_unit_vector, unsupported_kind, MoveContext, Proposal,
    ProposalState, ShapeMove,
};
use crate::variant::Variant;

/// Elastic energy `k v_ref |eps|_F^2` of the deformation gradient `f`,
/// with the small-strain tensor `eps = (f + f^T) / 2 - I`.
pub fn strain_energy(f: &Matrix3<f64>, stiffness: f64, reference_volume: f64) -> f64 {
    let strain = (f + f.transpose()) * 0.5 - Matrix3::identity();
    stiffness * reference_volume * strain.norm_squared()
}

#[derive(Debug, Clone)]
struct Reference {
    shape: Shape,
    volume: f64,
}

/// Volume-preserving deformation of a reference shape under an elastic penalty.
///
/// The move tracks one deformation gradient `F` per type, starting at the
/// identity on attach. The reference is the shape a type has at attach unless
/// [`ElasticMove::with_reference_shape`] names another one, in which case the
/// first accepted move replaces the type's shape with a deformed reference. A proposal left-multiplies `F` by either a
/// volume-preserving stretch along a random axis or a simple shear, so
/// `det F` stays one. The Boltzmann factor of the strain energy change, scaled
/// by the number of particles of the type, enters the acceptance test.
#[derive(Debug, Clone)]
pub struct ElasticMove {
    stiffness: Variant,
    move_probability: f64,
    stretch_fraction: f64,
    reference_overrides: BTreeMap<String, Shape>,
    references: Vec<Reference>,
    deformations: Vec<Matrix3<f64>>,
}

impl ElasticMove {
    /// Creates an elastic move with a time-dependent stiffness.
    pub fn new(stiffness: Variant, move_probability: f64) -> Result<Self, HpmcError> {
        check_probability("move_probability", move_probability)?;
        stiffness.validate()?;
        Ok(Self {
            stiffness,
            move_probability,
            stretch_fraction: 0.5,
            reference_overrides: BTreeMap::new(),
            references: Vec::new(),
            deformations: Vec::new(),
        })
    }

    /// Sets the fraction of proposals that are stretches rather than shears.
    pub fn with_stretch_fraction(mut self, fraction: f64) -> Result<Self, HpmcError> {
        check_probability("stretch_fraction", fraction)?;
        self.stretch_fraction = fraction;
        Ok(self)
    }

    /// Uses `shape` instead of the attach-time shape as the reference of the
    /// type called `type_name`.
    pub fn with_reference_shape(
        mut self,
        type_name: impl Into<String>,
        shape: Shape,
    ) -> Result<Self, HpmcError> {
        let type_name = type_name.into();
        if !matches!(shape, Shape::Ellipsoid { .. } | Shape::ConvexPolyhedron { .. }) {
            return Err(HpmcError::UnsupportedCombination(
                ErrorInfo::new(
                    "unsupported-move",
                    "elastic reference shapes must be ellipsoids or convex polyhedra",
                )
                .with_context("type", &type_name)
                .with_context("kind", shape.kind().as_str()),
            ));
        }
        shape.validate(Dimensions::Three)?;
        self.reference_overrides.insert(type_name, shape);
        Ok(self)
    }

    /// Stiffness schedule.
    pub fn stiffness(&self) -> &Variant {
        &self.stiffness
    }

    /// Current deformation gradient of `type_id`, available after attach.
    pub fn deformation(&self, type_id: usize) -> Option<&Matrix3<f64>> {
        self.deformations.get(type_id)
    }

    /// Reference shape of `type_id`, resolved at attach.
    pub fn reference_shape(&self, type_id: usize) -> Option<&Shape> {
        self.references.get(type_id).map(|r| &r.shape)
    }

    /// Strain energy of `type_id` at `timestep`.
    pub fn energy(&self, type_id: usize, timestep: u64) -> Option<f64> {
        let reference = self.references.get(type_id)?;
        let f = self.deformations.get(type_id)?;
        Some(strain_energy(
            f,
            self.stiffness.value(timestep),
            reference.volume,
        ))
    }

    fn draw_transform(&self, shape: &Shape, step: f64, rng: &mut RngHandle) -> Matrix3<f64> {
        if let Shape::Ellipsoid { .. } = shape {
            let axis = (rng.uniform() * 3.0).floor().min(2.0) as usize;
            let lambda = rng.uniform_in(-step, step).exp();
            let mut t = Matrix3::identity() * lambda.powf(-0.5);
            t[(axis, axis)] = lambda;
            return t;
        }
        if rng.uniform() < self.stretch_fraction {
            let u: Vector3<f64> = uniform_unit_vector(rng);
            let lambda = rng.uniform_in(-step, step).exp();
            let projector = u * u.transpose();
            projector * lambda + (Matrix3::identity() - projector) * lambda.powf(-0.5)
        } else {
            let i = (rng.uniform() * 3.0).floor().min(2.0) as usize;
            let offset = 1 + (rng.uniform() * 2.0).floor().min(1.0) as usize;
            let j = (i + offset) % 3;
            let mut t = Matrix3::identity();
            t[(i, j)] = rng.uniform_in(-step, step);
            t
        }
    }
}

fn deform(reference: &Shape, f: &Matrix3<f64>) -> Option<Shape> {
    match reference {
        Shape::Ellipsoid { a, b, c } => Some(Shape::Ellipsoid {
            a: a * f[(0, 0)],
            b: b * f[(1, 1)],
            c: c * f[(2, 2)],
        }),
        Shape::ConvexPolyhedron { vertices } => Some(Shape::ConvexPolyhedron {
            vertices: vertices.iter().map(|v| f * v).collect(),
        }),
        _ => None,
    }
}

impl ShapeMove for ElasticMove {
    fn name(&self) -> &'static str {
        "elastic"
    }

    fn move_probability(&self) -> f64 {
        self.move_probability
    }

    fn attach(&mut self, system: &dyn ConfigurationProvider) -> Result<(), HpmcError> {
        let dims = system.dimensions();
        if dims != Dimensions::Three {
            return Err(HpmcError::UnsupportedCombination(
                ErrorInfo::new("unsupported-move", "elastic moves require a 3D box")
                    .with_context("strategy", self.name())
                    .with_context("dimensions", dims.as_usize()),
            ));
        }
        let mut references = Vec::with_capacity(system.type_count());
        for type_id in 0..system.type_count() {
            let shape = system.require_shape(type_id)?;
            if !matches!(shape, Shape::Ellipsoid { .. } | Shape::ConvexPolyhedron { .. }) {
                return Err(unsupported_kind(self.name(), type_id, shape));
            }
            let reference = system
                .type_name(type_id)
                .and_then(|name| self.reference_overrides.get(name))
                .unwrap_or(shape);
            if reference.kind() != shape.kind() {
                return Err(HpmcError::Configuration(
                    ErrorInfo::new(
                        "reference-mismatch",
                        "reference shape must have the same kind as the type's shape",
                    )
                    .with_context("type_id", type_id)
                    .with_context("shape", shape.kind().as_str())
                    .with_context("reference", reference.kind().as_str()),
                ));
            }
            references.push(Reference {
                shape: reference.clone(),
                volume: reference.volume(dims)?,
            });
        }
        self.deformations = vec![Matrix3::identity(); references.len()];
        self.references = references;
        Ok(())
    }

    fn propose(
        &self,
        context: &MoveContext<'_>,
        current: &Shape,
        rng: &mut RngHandle,
    ) -> Result<Proposal, HpmcError> {
        let (reference, f) = match (
            self.references.get(context.type_id),
            self.deformations.get(context.type_id),
        ) {
            (Some(reference), Some(f)) => (reference, f),
            _ => {
                return Err(HpmcError::configuration(
                    "not-attached",
                    "elastic move is not attached",
                ))
            }
        };

        let transform = self.draw_transform(&reference.shape, context.step_size, rng);
        let proposed_f = transform * f;
        let shape = deform(&reference.shape, &proposed_f)
            .ok_or_else(|| unsupported_kind(self.name(), context.type_id, current))?;

        let k = self.stiffness.value(context.timestep);
        let delta = strain_energy(&proposed_f, k, reference.volume)
            - strain_energy(f, k, reference.volume);
        Ok(Proposal {
            shape,
            ln_proposal_ratio: 0.0,
            ln_boltzmann: -(context.population as f64) * delta,
            state: ProposalState::Deformation(proposed_f),
        })
    }

    fn commit(&mut self, type_id: usize, state: ProposalState) {
        if let (ProposalState::Deformation(f), Some(slot)) =
            (state, self.deformations.get_mut(type_id))
        {
            *slot = f;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_carries_no_energy() {
        assert_eq!(strain_energy(&Matrix3::identity(), 100.0, 1.0), 0.0);
    }

    #[test]
    fn pure_shear_energy_matches_closed_form() {
        let mut f = Matrix3::identity();
        f[(0, 1)] = 0.2;
        // eps has 0.1 in the two off-diagonal slots
        let energy = strain_energy(&f, 3.0, 2.0);
        assert!((energy - 3.0 * 2.0 * 0.02).abs() < 1e-12);
    }

    #[test]
    fn drawn_transforms_preserve_volume() {
        let mv = ElasticMove::new(Variant::constant(1.0), 1.0).unwrap();
        let mut rng = RngHandle::from_seed(9);
        let cube = Shape::cube(1.0);
        let ellipsoid = Shape::Ellipsoid { a: 1.0, b: 0.5, c: 0.5 };
        for _ in 0..200 {
            for shape in [&cube, &ellipsoid] {
                let t = mv.draw_transform(shape, 0.3, &mut rng);
                assert!((t.determinant() - 1.0).abs() < 1e-12);
            }
        }
    }
}
