use std::collections::BTreeMap;

use hpmc_core::hull::polyhedron_volume;
use hpmc_core::{ConfigurationProvider, Dimensions, ErrorInfo, HpmcError, RngHandle, Shape};
use nalgebra::{Vector2, Vector3};

use super::{
    check_probability, uniform_in_ball, unsupported_kind, MoveContext, Proposal, ProposalState,
    ShapeMove,
};

/// Perturbs the vertices of convex polyhedra (polygons in 2D) at fixed volume.
///
/// Every vertex is displaced uniformly inside a ball of radius `step_size`;
/// the hull is then rescaled back to the type's target volume and recentred
/// on its vertex mean. The uniform rescale by `s` contributes the Jacobian
/// `d n ln s` to the proposal ratio.
#[derive(Debug, Clone)]
pub struct VertexMove {
    move_probability: f64,
    volume: BTreeMap<String, f64>,
    targets: Vec<f64>,
}

impl VertexMove {
    /// Creates a vertex move attempted with `move_probability`.
    pub fn new(move_probability: f64) -> Result<Self, HpmcError> {
        check_probability("move_probability", move_probability)?;
        Ok(Self {
            move_probability,
            volume: BTreeMap::new(),
            targets: Vec::new(),
        })
    }

    /// Sets the volume a type is held at; defaults to its volume at attach time.
    pub fn with_volume(
        mut self,
        type_name: impl Into<String>,
        volume: f64,
    ) -> Result<Self, HpmcError> {
        if !(volume.is_finite() && volume > 0.0) {
            return Err(HpmcError::Configuration(
                ErrorInfo::new("invalid-volume", "target volume must be positive")
                    .with_context("volume", volume),
            ));
        }
        self.volume.insert(type_name.into(), volume);
        Ok(self)
    }

    /// Target volume of `type_id`, available after attach.
    pub fn target_volume(&self, type_id: usize) -> Option<f64> {
        self.targets.get(type_id).copied()
    }
}

fn hull_volume(vertices: &[Vector3<f64>], dims: Dimensions) -> Result<f64, HpmcError> {
    match dims {
        Dimensions::Three => polyhedron_volume(vertices),
        Dimensions::Two => {
            let planar: Vec<Vector2<f64>> = vertices.iter().map(|v| v.xy()).collect();
            Shape::ConvexPolygon { vertices: planar }.volume(Dimensions::Two)
        }
    }
}

fn lift(shape: &Shape) -> Option<Vec<Vector3<f64>>> {
    match shape {
        Shape::ConvexPolyhedron { vertices } => Some(vertices.clone()),
        Shape::ConvexPolygon { vertices } => {
            Some(vertices.iter().map(|v| Vector3::new(v.x, v.y, 0.0)).collect())
        }
        _ => None,
    }
}

impl ShapeMove for VertexMove {
    fn name(&self) -> &'static str {
        "vertex"
    }

    fn move_probability(&self) -> f64 {
        self.move_probability
    }

    fn attach(&mut self, system: &dyn ConfigurationProvider) -> Result<(), HpmcError> {
        let dims = system.dimensions();
        let mut targets = Vec::with_capacity(system.type_count());
        for type_id in 0..system.type_count() {
            let shape = system.require_shape(type_id)?;
            let supported = matches!(
                (shape, dims),
                (Shape::ConvexPolyhedron { .. }, Dimensions::Three)
                    | (Shape::ConvexPolygon { .. }, Dimensions::Two)
            );
            if !supported {
                return Err(unsupported_kind(self.name(), type_id, shape));
            }
            let configured = system
                .type_name(type_id)
                .and_then(|name| self.volume.get(name))
                .copied();
            let target = match configured {
                Some(volume) => volume,
                None => shape.volume(dims)?,
            };
            targets.push(target);
        }
        self.targets = targets;
        Ok(())
    }

    fn propose(
        &self,
        context: &MoveContext<'_>,
        current: &Shape,
        rng: &mut RngHandle,
    ) -> Result<Proposal, HpmcError> {
        let dims = context.dimensions;
        let target = self
            .target_volume(context.type_id)
            .ok_or_else(|| HpmcError::configuration("not-attached", "vertex move is not attached"))?;
        let mut vertices =
            lift(current).ok_or_else(|| unsupported_kind(self.name(), context.type_id, current))?;

        for vertex in vertices.iter_mut() {
            *vertex += uniform_in_ball(dims, context.step_size, rng);
        }
        let volume = hull_volume(&vertices, dims)?;
        let scale = (target / volume).powf(1.0 / dims.as_f64());
        let n = vertices.len();
        let centre = vertices.iter().sum::<Vector3<f64>>() / n as f64;
        for vertex in vertices.iter_mut() {
            *vertex = (*vertex - centre) * scale;
        }

        let shape = match dims {
            Dimensions::Three => Shape::ConvexPolyhedron { vertices },
            Dimensions::Two => Shape::ConvexPolygon {
                vertices: vertices.iter().map(|v| v.xy()).collect(),
            },
        };
        Ok(Proposal {
            shape,
            ln_proposal_ratio: dims.as_f64() * n as f64 * scale.ln(),
            ln_boltzmann: 0.0,
            state: ProposalState::Stateless,
        })
    }

    fn commit(&mut self, _type_id: usize, _state: ProposalState) {}
}
