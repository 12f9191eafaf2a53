use omsi_lapack::ddot;

use super::{lapack::LapackWorkspace, AlgebraicSystem};
use crate::{
    directory::Slot, instance::ModelContext, logger::LogCategory, values::Values, Error, OmsiRes,
    OmsiStatus,
};

/// Newton iterations before giving up on a nonlinear system.
pub const MAX_ITERATIONS: usize = 100;

/// Solve a nonlinear system with Newton's method, starting from the current output values.
///
/// Converged when `|f(x)|^2 < tolerance^2`. The outputs are only written on convergence. A
/// singular Jacobian ends the iteration like exhausting [`MAX_ITERATIONS`] does, with
/// [`Error::NoConvergence`].
pub(super) fn solve(
    system: &AlgebraicSystem,
    values: &mut Values,
    context: &ModelContext,
    tolerance: f64,
) -> Result<OmsiRes, Error> {
    let mut ws = LapackWorkspace::new(system.dim(), context.allocator())?;
    for (x, &index) in ws.x.iter_mut().zip(system.output_indices()) {
        *x = values.get::<f64>(Slot::Direct(index))?;
    }

    let mut status = OmsiRes::OK;
    for iteration in 0..MAX_ITERATIONS {
        status = status.max(ws.evaluate(system, values)?);
        let norm = ddot(ws.n, &ws.b, 1, &ws.b, 1);
        if norm < tolerance * tolerance {
            system.scatter(&ws.x, values)?;
            context.log(
                OmsiStatus::OK,
                LogCategory::NonlinearSystems,
                format_args!(
                    "Nonlinear system {} converged after {iteration} iterations, |f(x)|^2 = {norm:e}",
                    system.id
                ),
            );
            return Ok(status);
        }

        status = status.max(ws.assemble_jacobian(system, values, f64::EPSILON.sqrt())?);
        // a flat spot of f stops the iteration, the instance itself stays intact
        ws.solve_step(system).map_err(|err| match err {
            Error::Numeric { source, .. } => {
                log::debug!("Nonlinear system {}: singular Jacobian: {source}", system.id);
                Error::NoConvergence {
                    system: system.id,
                    iterations: iteration + 1,
                }
            }
            err => err,
        })?;
        for (x, dx) in ws.x.iter_mut().zip(ws.b.iter()) {
            *x += dx;
        }
    }

    Err(Error::NoConvergence {
        system: system.id,
        iterations: MAX_ITERATIONS,
    })
}
