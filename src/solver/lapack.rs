use omsi_lapack::{ddot, dgesv};

use super::{log_system, AlgebraicSystem};
use crate::{
    instance::ModelContext,
    logger::LogCategory,
    memory::{Buffer, SharedAllocator},
    values::Values,
    Error, OmsiRes, OmsiStatus,
};

/// A solution is accepted if the squared norm of its residual is below this bound.
pub const RESIDUAL_TOLERANCE: f64 = 1e-4;

/// Transient buffers for one solve of an `n`-dimensional system, released on drop.
pub(super) struct LapackWorkspace {
    pub n: usize,
    /// Column-major system matrix, overwritten by its LU factors
    pub a: Buffer<f64>,
    /// Residual at `x`, then the right hand side, then the solution
    pub b: Buffer<f64>,
    pub ipiv: Buffer<i32>,
    /// Expansion point
    pub x: Buffer<f64>,
    pub probe: Buffer<f64>,
    pub column: Buffer<f64>,
}

impl LapackWorkspace {
    pub fn new(n: usize, allocator: &SharedAllocator) -> Result<Self, Error> {
        Ok(Self {
            n,
            a: Buffer::filled(allocator, n * n, 0.0)?,
            b: Buffer::filled(allocator, n, 0.0)?,
            ipiv: Buffer::filled(allocator, n, 0)?,
            x: Buffer::filled(allocator, n, 0.0)?,
            probe: Buffer::filled(allocator, n, 0.0)?,
            column: Buffer::filled(allocator, n, 0.0)?,
        })
    }

    /// Evaluate `b = f(x)`.
    pub fn evaluate(
        &mut self,
        system: &AlgebraicSystem,
        values: &Values,
    ) -> Result<OmsiRes, Error> {
        system.residual(&self.x, values, &mut self.b)
    }

    /// Assemble the Jacobian at `x` column by column, with `b` holding `f(x)`.
    ///
    /// Without an analytic Jacobian the columns are forward differences
    /// `(f(x + h * e_j) - f(x)) / h` with `h = relative_step * max(|x_j|, 1)`. For a linear system
    /// expanded at zero and `relative_step = 1` this is exactly `A * e_j`.
    pub fn assemble_jacobian(
        &mut self,
        system: &AlgebraicSystem,
        values: &Values,
        relative_step: f64,
    ) -> Result<OmsiRes, Error> {
        let n = self.n;
        let mut status = OmsiRes::OK;

        for j in 0..n {
            let res = if let Some(jacobian) = &system.jacobian {
                self.probe.fill(0.0);
                self.probe[j] = 1.0;
                jacobian(&self.x, &self.probe, values, &mut self.column)?
            } else {
                let h = relative_step * self.x[j].abs().max(1.0);
                self.probe.copy_from_slice(&self.x);
                self.probe[j] += h;
                let res = system.residual(&self.probe, values, &mut self.column)?;
                for (c, f) in self.column.iter_mut().zip(self.b.iter()) {
                    *c = (*c - f) / h;
                }
                res
            };
            status = status.max(res);
            self.a[j * n..(j + 1) * n].copy_from_slice(&self.column);
        }

        Ok(status)
    }

    /// Solve `A * dx = -b` in place: `b` holds `dx` afterwards.
    pub fn solve_step(&mut self, system: &AlgebraicSystem) -> Result<(), Error> {
        let n = self.n;
        self.b.iter_mut().for_each(|b| *b = -*b);
        dgesv(n, 1, &mut self.a, n, &mut self.ipiv, &mut self.b, n).map_err(|source| {
            Error::Numeric {
                system: system.id,
                source,
            }
        })
    }

    /// Squared norm of `f(x)` for `x` in `b`, evaluated into `column`, and the status of the
    /// evaluation.
    pub fn residual_norm(
        &mut self,
        system: &AlgebraicSystem,
        values: &Values,
    ) -> Result<(f64, OmsiRes), Error> {
        let res = system.residual(&self.b, values, &mut self.column)?;
        Ok((ddot(self.n, &self.column, 1, &self.column, 1), res))
    }
}

/// Solve a linear system `f(x) = A * x - b = 0`.
///
/// `b = -f(0)` and `A` is assembled by probing `f` with unit vectors. The solution is accepted if
/// `|f(x)|^2 < RESIDUAL_TOLERANCE`; otherwise a warning is returned and `values` are left as they
/// were. A singular matrix is an [`Error::Numeric`].
pub(super) fn solve(
    system: &AlgebraicSystem,
    values: &mut Values,
    context: &ModelContext,
) -> Result<OmsiRes, Error> {
    let mut ws = LapackWorkspace::new(system.dim(), context.allocator())?;

    // expand at x = 0
    let mut status = ws.evaluate(system, values)?;
    status = status.max(ws.assemble_jacobian(system, values, 1.0)?);
    log_system(context, system.id, ws.n, &ws.a, &ws.b);

    ws.solve_step(system)?;

    let (residual, res) = ws.residual_norm(system, values)?;
    status = status.max(res);
    if residual < RESIDUAL_TOLERANCE {
        system.scatter(&ws.b, values)?;
        log::trace!(
            "Linear system {} solved, |f(x)|^2 = {residual:e}",
            system.id
        );
        Ok(status)
    } else {
        context.log(
            OmsiStatus::Warning,
            LogCategory::LinearSystems,
            format_args!(
                "Solution of linear system {} rejected: |f(x)|^2 = {residual:e} exceeds {RESIDUAL_TOLERANCE:e}",
                system.id
            ),
        );
        Ok(OmsiRes::Warning)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use assert_approx_eq::assert_approx_eq;

    use crate::{
        instance::{CallbackFunctions, ModelContext},
        memory::{Allocator, HeapAllocator},
        model_data::ModelDataBuilder,
        solver::AlgebraicSystem,
        values::ValueStore,
        Error, OmsiRes, OmsiStatus,
    };

    #[derive(Default)]
    struct Counting {
        live: AtomicUsize,
    }

    impl Allocator for Counting {
        fn allocate(&self, count: usize, size: usize) -> Option<std::ptr::NonNull<u8>> {
            self.live.fetch_add(1, Ordering::SeqCst);
            HeapAllocator.allocate(count, size)
        }

        unsafe fn free(&self, ptr: std::ptr::NonNull<u8>) {
            self.live.fetch_sub(1, Ordering::SeqCst);
            HeapAllocator.free(ptr)
        }
    }

    fn setup() -> (Arc<Counting>, ModelContext, ValueStore) {
        let counting = Arc::new(Counting::default());
        let context = ModelContext::new(
            "solver",
            true,
            CallbackFunctions {
                allocator: counting.clone(),
                ..Default::default()
            },
        );
        let model = ModelDataBuilder::new("Loop", "{guid}")
            .real("y", 7.0)
            .real("z", 7.0)
            .build()
            .unwrap();
        let mut store = ValueStore::allocate(&model.counts, context.allocator()).unwrap();
        store.initialize(&model).unwrap();
        (counting, context, store)
    }

    #[test_log::test]
    fn solves_two_by_two() {
        let (counting, context, mut store) = setup();
        let live = counting.live.load(Ordering::SeqCst);

        let mut system = AlgebraicSystem::linear(0, vec![0, 1], |x, _, res| {
            res[0] = 2.0 * x[0] + 3.0 * x[1] - 8.0;
            res[1] = 3.0 * x[0] + 0.5 * x[1] - 4.0;
            Ok(OmsiRes::OK)
        });
        let res = system.solve(store.current_mut(), &context, 1e-5).unwrap();

        assert_eq!(res, OmsiRes::OK);
        assert_approx_eq!(store.current().reals()[0], 1.0);
        assert_approx_eq!(store.current().reals()[1], 2.0);
        assert_eq!(counting.live.load(Ordering::SeqCst), live);
    }

    #[test_log::test]
    fn analytic_jacobian() {
        let (_, context, mut store) = setup();

        let mut system = AlgebraicSystem::linear(1, vec![1, 0], |x, _, res| {
            res[0] = 4.0 * x[0] - 2.0;
            res[1] = x[0] + x[1] - 3.0;
            Ok(OmsiRes::OK)
        })
        .with_jacobian(|_, seed, _, column| {
            column[0] = 4.0 * seed[0];
            column[1] = seed[0] + seed[1];
            Ok(OmsiRes::OK)
        });
        system.solve(store.current_mut(), &context, 1e-5).unwrap();

        // x = [0.5, 2.5] scattered into z and y
        assert_approx_eq!(store.current().reals()[1], 0.5);
        assert_approx_eq!(store.current().reals()[0], 2.5);
    }

    #[test_log::test]
    fn warning_at_solution_is_kept() {
        let (_, context, mut store) = setup();

        // the model only warns when evaluated at the solution x = 2
        let mut system = AlgebraicSystem::linear(5, vec![0], |x, _, res| {
            res[0] = 2.0 * x[0] - 4.0;
            if x[0] == 2.0 {
                Ok(OmsiRes::Warning)
            } else {
                Ok(OmsiRes::OK)
            }
        });
        let res = system.solve(store.current_mut(), &context, 1e-5).unwrap();

        assert_eq!(res, OmsiRes::Warning);
        assert_eq!(store.current().reals(), &[2.0, 7.0]);
    }

    #[test_log::test]
    fn singular_system_is_fatal() {
        let (counting, context, mut store) = setup();
        let live = counting.live.load(Ordering::SeqCst);

        let mut system = AlgebraicSystem::linear(2, vec![0, 1], |x, _, res| {
            res[0] = x[0] + 2.0 * x[1] - 1.0;
            res[1] = 2.0 * x[0] + 4.0 * x[1] - 1.0;
            Ok(OmsiRes::OK)
        });
        let err = system.solve(store.current_mut(), &context, 1e-5).unwrap_err();

        assert!(matches!(err, Error::Numeric { system: 2, .. }));
        assert_eq!(err.status(), OmsiStatus::Fatal);
        assert_eq!(store.current().reals(), &[7.0, 7.0]);
        assert_eq!(counting.live.load(Ordering::SeqCst), live);
    }

    #[test_log::test]
    fn inaccurate_solution_is_rejected() {
        let (_, context, mut store) = setup();

        // not linear: the probed model predicts x = 4, where f(4) = 12
        let mut system = AlgebraicSystem::linear(3, vec![0], |x, _, res| {
            res[0] = x[0] * x[0] - 4.0;
            Ok(OmsiRes::OK)
        });
        let res = system.solve(store.current_mut(), &context, 1e-5).unwrap();

        assert_eq!(res, OmsiRes::Warning);
        assert_eq!(store.current().reals(), &[7.0, 7.0]);
    }

    #[test_log::test]
    fn model_errors_propagate() {
        let (counting, context, mut store) = setup();
        let live = counting.live.load(Ordering::SeqCst);

        let mut system = AlgebraicSystem::linear(4, vec![0, 1], |_, _, _| {
            Err(crate::OmsiError::Error)
        });
        let err = system.solve(store.current_mut(), &context, 1e-5).unwrap_err();

        assert!(matches!(err, Error::Model(crate::OmsiError::Error)));
        assert_eq!(counting.live.load(Ordering::SeqCst), live);
    }
}
