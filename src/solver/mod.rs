//! Evaluation of the model equations and the algebraic loops embedded in them.
//!
//! The generated model code is handed over as closures. A [`ModelFunction`] is an ordered list of
//! explicit equation blocks and [`AlgebraicSystem`]s; linear systems are solved with a dense LU
//! decomposition, nonlinear ones with Newton's method on top of the same workspace.

mod lapack;
mod newton;

use itertools::Itertools;

use crate::{
    directory::Slot,
    instance::ModelContext,
    logger::LogCategory,
    values::Values,
    Error, OmsiError, OmsiRes, OmsiStatus,
};

pub use lapack::RESIDUAL_TOLERANCE;
pub use newton::MAX_ITERATIONS;

/// Evaluates the residual `f(x)` of an algebraic system into the last argument.
///
/// `x` holds the iteration variables, every other value is read from [`Values`].
pub type ResidualFn =
    Box<dyn Fn(&[f64], &Values, &mut [f64]) -> Result<OmsiRes, OmsiError> + Send + Sync>;

/// Evaluates the directional derivative `J(x) * seed` of the residual into the last argument.
pub type JacobianFn =
    Box<dyn Fn(&[f64], &[f64], &Values, &mut [f64]) -> Result<OmsiRes, OmsiError> + Send + Sync>;

/// Explicit equations of the model, writing their results into [`Values`].
pub type EquationFn = Box<dyn Fn(&mut Values) -> Result<OmsiRes, OmsiError> + Send + Sync>;

/// Evaluates the zero-crossing (event indicator) functions of the model.
pub type ZeroCrossingFn =
    Box<dyn Fn(&Values, &mut [f64]) -> Result<OmsiRes, OmsiError> + Send + Sync>;

/// An algebraic loop `f(x) = 0` of the model.
pub struct AlgebraicSystem {
    id: usize,
    is_linear: bool,
    /// Real slots receiving the solution, one per iteration variable
    output_indices: Vec<usize>,
    zerocrossing_indices: Vec<usize>,
    residual: ResidualFn,
    jacobian: Option<JacobianFn>,
}

impl AlgebraicSystem {
    fn new<F>(id: usize, is_linear: bool, output_indices: Vec<usize>, residual: F) -> Self
    where
        F: Fn(&[f64], &Values, &mut [f64]) -> Result<OmsiRes, OmsiError> + Send + Sync + 'static,
    {
        Self {
            id,
            is_linear,
            output_indices,
            zerocrossing_indices: Vec::new(),
            residual: Box::new(residual),
            jacobian: None,
        }
    }

    /// A linear system `A * x = b` given as residual `f(x) = A * x - b`.
    pub fn linear<F>(id: usize, output_indices: Vec<usize>, residual: F) -> Self
    where
        F: Fn(&[f64], &Values, &mut [f64]) -> Result<OmsiRes, OmsiError> + Send + Sync + 'static,
    {
        Self::new(id, true, output_indices, residual)
    }

    /// A nonlinear system, solved starting from the current values of its outputs.
    pub fn nonlinear<F>(id: usize, output_indices: Vec<usize>, residual: F) -> Self
    where
        F: Fn(&[f64], &Values, &mut [f64]) -> Result<OmsiRes, OmsiError> + Send + Sync + 'static,
    {
        Self::new(id, false, output_indices, residual)
    }

    /// Use an analytic directional derivative instead of finite differences of the residual.
    pub fn with_jacobian<F>(mut self, jacobian: F) -> Self
    where
        F: Fn(&[f64], &[f64], &Values, &mut [f64]) -> Result<OmsiRes, OmsiError>
            + Send
            + Sync
            + 'static,
    {
        self.jacobian = Some(Box::new(jacobian));
        self
    }

    pub fn with_zerocrossing_indices(mut self, indices: Vec<usize>) -> Self {
        self.zerocrossing_indices = indices;
        self
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// Number of iteration variables
    pub fn dim(&self) -> usize {
        self.output_indices.len()
    }

    pub fn is_linear(&self) -> bool {
        self.is_linear
    }

    pub fn output_indices(&self) -> &[usize] {
        &self.output_indices
    }

    pub fn zerocrossing_indices(&self) -> &[usize] {
        &self.zerocrossing_indices
    }

    /// Solve the system and write the solution into `values`.
    ///
    /// The outputs are only written when a solution is accepted. Taking `&mut self` keeps a single
    /// solve of a system in flight.
    pub fn solve(
        &mut self,
        values: &mut Values,
        context: &ModelContext,
        tolerance: f64,
    ) -> Result<OmsiRes, Error> {
        if self.dim() == 0 {
            return Ok(OmsiRes::OK);
        }
        let result = if self.is_linear {
            lapack::solve(self, values, context)
        } else {
            newton::solve(self, values, context, tolerance)
        };

        if let Err(err) = &result {
            let category = match err {
                Error::Numeric { .. } => LogCategory::SingularLinearSystems,
                _ if self.is_linear => LogCategory::LinearSystems,
                _ => LogCategory::NonlinearSystems,
            };
            context.log(
                err.status(),
                category,
                format_args!("Solving algebraic system {} failed: {err}", self.id),
            );
        }
        result
    }

    fn residual(&self, x: &[f64], values: &Values, out: &mut [f64]) -> Result<OmsiRes, Error> {
        Ok((self.residual)(x, values, out)?)
    }

    /// Write the solution `x` into the output slots, all or nothing.
    fn scatter(&self, x: &[f64], values: &mut Values) -> Result<(), Error> {
        for &index in &self.output_indices {
            values.check::<f64>(Slot::Direct(index))?;
        }
        for (&index, &x) in self.output_indices.iter().zip(x) {
            values.set(Slot::Direct(index), x)?;
        }
        Ok(())
    }
}

enum Block {
    Equations(EquationFn),
    AlgebraicSystem(AlgebraicSystem),
}

/// An ordered sequence of equation blocks and algebraic systems.
#[derive(Default)]
pub struct ModelFunction {
    blocks: Vec<Block>,
}

impl ModelFunction {
    pub fn with_equations<F>(mut self, equations: F) -> Self
    where
        F: Fn(&mut Values) -> Result<OmsiRes, OmsiError> + Send + Sync + 'static,
    {
        self.blocks.push(Block::Equations(Box::new(equations)));
        self
    }

    pub fn with_algebraic_system(mut self, system: AlgebraicSystem) -> Self {
        self.blocks.push(Block::AlgebraicSystem(system));
        self
    }

    pub fn algebraic_systems(&self) -> impl Iterator<Item = &AlgebraicSystem> {
        self.blocks.iter().filter_map(|block| match block {
            Block::AlgebraicSystem(system) => Some(system),
            Block::Equations(_) => None,
        })
    }

    /// Evaluate all blocks in order. Stops at the first failing block.
    ///
    /// Returns [`OmsiRes::Warning`] if any block did, for example a linear system whose solution
    /// was rejected as inaccurate.
    pub fn evaluate(
        &mut self,
        values: &mut Values,
        context: &ModelContext,
        tolerance: f64,
    ) -> Result<OmsiRes, Error> {
        let mut status = OmsiRes::OK;
        for block in &mut self.blocks {
            let res = match block {
                Block::Equations(equations) => equations(values)?,
                Block::AlgebraicSystem(system) => system.solve(values, context, tolerance)?,
            };
            status = status.max(res);
        }
        Ok(status)
    }
}

/// The generated code of a model.
#[derive(Default)]
pub struct ModelFunctions {
    /// Evaluated once when leaving initialization mode
    pub initialization: ModelFunction,
    /// Evaluated whenever values are requested after inputs changed
    pub simulation: ModelFunction,
    pub zero_crossings: Option<ZeroCrossingFn>,
}

impl ModelFunctions {
    pub fn with_zero_crossings<F>(mut self, zero_crossings: F) -> Self
    where
        F: Fn(&Values, &mut [f64]) -> Result<OmsiRes, OmsiError> + Send + Sync + 'static,
    {
        self.zero_crossings = Some(Box::new(zero_crossings));
        self
    }
}

/// Dump a column-major `n x n` matrix and right hand side under [`LogCategory::LinearSystems`].
fn log_system(context: &ModelContext, id: usize, n: usize, a: &[f64], b: &[f64]) {
    if !context.logging_on(LogCategory::LinearSystems) {
        return;
    }
    for i in 0..n {
        let row = (0..n).map(|j| a[i + j * n]).join(", ");
        context.log(
            OmsiStatus::OK,
            LogCategory::LinearSystems,
            format_args!("System {id} row {i}: [{row}] | {}", b[i]),
        );
    }
}
