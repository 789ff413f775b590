use std::fmt;
use std::sync::Arc;

use hpmc_core::{ConfigurationProvider, Dimensions, ErrorInfo, HpmcError, RngHandle, Shape};

use super::{check_probability, MoveContext, Proposal, ProposalState, ShapeMove};

/// Maps `(type_id, parameters)` to a shape. Parameters live in `[0, 1]`.
pub type ShapeCallback = Arc<dyn Fn(usize, &[f64]) -> Shape + Send + Sync>;

/// Random walk in a user-defined parameter space.
///
/// Each parameter takes a uniform step inside the window
/// `[-min(step, p), min(step, 1 - p)]`, so it never leaves the unit
/// interval. The windows at the old and new points generally differ in width
/// and the ratio of the widths enters the acceptance test.
#[derive(Clone)]
pub struct ShapeSpaceMove {
    callback: ShapeCallback,
    params: Vec<Vec<f64>>,
    move_probability: f64,
}

impl fmt::Debug for ShapeSpaceMove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShapeSpaceMove")
            .field("params", &self.params)
            .field("move_probability", &self.move_probability)
            .finish_non_exhaustive()
    }
}

impl ShapeSpaceMove {
    /// Creates a move from a callback and the initial parameters of each type.
    pub fn new(
        callback: ShapeCallback,
        params: Vec<Vec<f64>>,
        move_probability: f64,
    ) -> Result<Self, HpmcError> {
        check_probability("move_probability", move_probability)?;
        for (type_id, values) in params.iter().enumerate() {
            if values.iter().any(|p| !(0.0..=1.0).contains(p)) {
                return Err(HpmcError::Configuration(
                    ErrorInfo::new("invalid-parameters", "shape parameters must lie in [0, 1]")
                        .with_context("type_id", type_id),
                ));
            }
        }
        Ok(Self {
            callback,
            params,
            move_probability,
        })
    }

    /// Current parameters of `type_id`.
    pub fn params(&self, type_id: usize) -> Option<&[f64]> {
        self.params.get(type_id).map(Vec::as_slice)
    }

    fn evaluate(
        &self,
        type_id: usize,
        params: &[f64],
        expected: &Shape,
        dims: Dimensions,
    ) -> Result<Shape, HpmcError> {
        let shape = (self.callback)(type_id, params);
        let violation = |message: &str| {
            HpmcError::CallbackContract(
                ErrorInfo::new("callback-shape", message.to_string())
                    .with_context("type_id", type_id)
                    .with_context("expected", expected.kind().as_str())
                    .with_context("returned", shape.kind().as_str()),
            )
        };
        if shape.kind() != expected.kind() {
            return Err(violation("callback changed the shape kind"));
        }
        if shape.validate(dims).is_err() {
            return Err(violation("callback returned an invalid shape"));
        }
        Ok(shape)
    }
}

fn window(p: f64, step: f64) -> (f64, f64) {
    (-step.min(p), step.min(1.0 - p))
}

impl ShapeMove for ShapeSpaceMove {
    fn name(&self) -> &'static str {
        "shape_space"
    }

    fn move_probability(&self) -> f64 {
        self.move_probability
    }

    fn attach(&mut self, system: &dyn ConfigurationProvider) -> Result<(), HpmcError> {
        if self.params.len() != system.type_count() {
            return Err(HpmcError::Configuration(
                ErrorInfo::new(
                    "invalid-parameters",
                    "one parameter vector is required per particle type",
                )
                .with_context("params", self.params.len())
                .with_context("types", system.type_count()),
            ));
        }
        let dims = system.dimensions();
        for type_id in 0..system.type_count() {
            let current = system.require_shape(type_id)?;
            self.evaluate(type_id, &self.params[type_id], current, dims)?;
        }
        Ok(())
    }

    fn propose(
        &self,
        context: &MoveContext<'_>,
        current: &Shape,
        rng: &mut RngHandle,
    ) -> Result<Proposal, HpmcError> {
        let params = self
            .params(context.type_id)
            .ok_or_else(|| HpmcError::configuration("not-attached", "no parameters for the type"))?;
        let step = context.step_size;

        let mut proposed = Vec::with_capacity(params.len());
        let mut ln_ratio = 0.0;
        for &p in params {
            let (lo, hi) = window(p, step);
            let next = (p + rng.uniform_in(lo, hi)).clamp(0.0, 1.0);
            let (back_lo, back_hi) = window(next, step);
            let forward = hi - lo;
            let reverse = back_hi - back_lo;
            if forward > 0.0 && reverse > 0.0 {
                ln_ratio += (forward / reverse).ln();
            }
            proposed.push(next);
        }

        let shape = self.evaluate(context.type_id, &proposed, current, context.dimensions)?;
        Ok(Proposal {
            shape,
            ln_proposal_ratio: ln_ratio,
            ln_boltzmann: 0.0,
            state: ProposalState::Parameters(proposed),
        })
    }

    fn commit(&mut self, type_id: usize, state: ProposalState) {
        if let (ProposalState::Parameters(values), Some(slot)) =
            (state, self.params.get_mut(type_id))
        {
            *slot = values;
        }
    }
}
