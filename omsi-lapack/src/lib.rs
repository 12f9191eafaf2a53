//! Dense linear algebra routines following the LAPACK/BLAS calling conventions.
//!
//! Matrices are stored in column-major order: element `(i, j)` of a matrix with leading dimension
//! `lda` lives at `a[i + j * lda]`. Pivot indices are 1-based, exactly as returned by LAPACK, so
//! that diagnostics line up with the reference implementation.
//!
//! Only the routines needed by the OMSI algebraic-loop solver are provided:
//! * [`dgetrf`]: LU factorization with partial (row) pivoting
//! * [`dgetrs`]: solve using an existing factorization
//! * [`dgesv`]: factor and solve in one call
//! * [`ddot`]: dot product with strides
#![deny(clippy::all)]

/// Failure reported by a LAPACK routine.
///
/// The variants mirror the sign convention of the LAPACK `INFO` output argument, see
/// [`LapackError::info`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LapackError {
    /// `INFO = -i`: the i-th argument had an illegal value.
    #[error("the {0}-th argument had an illegal value")]
    IllegalArgument(i32),
    /// `INFO = i`: `U(i,i)` is exactly zero. The factorization has been completed, but the factor
    /// `U` is exactly singular, so the solution could not be computed.
    #[error("U({0},{0}) is exactly zero, the factor U is singular")]
    Singular(i32),
}

impl LapackError {
    /// The raw LAPACK `INFO` value: negative for illegal arguments, positive for singularity.
    pub fn info(&self) -> i32 {
        match self {
            LapackError::IllegalArgument(i) => -i,
            LapackError::Singular(i) => *i,
        }
    }
}

/// Computes an LU factorization of the `n x n` matrix `a` using partial pivoting with row
/// interchanges.
///
/// On return `a` holds the factors `L` and `U` from `P*A = L*U`; the unit diagonal of `L` is not
/// stored. `ipiv[i]` (1-based) is the row interchanged with row `i`.
///
/// As in LAPACK, a zero pivot does not stop the factorization. The first zero pivot found is
/// reported as [`LapackError::Singular`] after the factorization is complete.
pub fn dgetrf(n: usize, a: &mut [f64], lda: usize, ipiv: &mut [i32]) -> Result<(), LapackError> {
    if lda < n.max(1) {
        return Err(LapackError::IllegalArgument(4));
    }
    if a.len() < lda * n {
        return Err(LapackError::IllegalArgument(3));
    }
    if ipiv.len() < n {
        return Err(LapackError::IllegalArgument(5));
    }

    let mut info = 0;

    for j in 0..n {
        // find the pivot with the largest magnitude in column j
        let mut p = j;
        let mut max = a[j + j * lda].abs();
        for i in (j + 1)..n {
            let v = a[i + j * lda].abs();
            if v > max {
                max = v;
                p = i;
            }
        }
        ipiv[j] = (p + 1) as i32;

        if a[p + j * lda] != 0.0 {
            if p != j {
                for k in 0..n {
                    a.swap(j + k * lda, p + k * lda);
                }
            }
            let pivot = a[j + j * lda];
            for i in (j + 1)..n {
                a[i + j * lda] /= pivot;
            }
        } else if info == 0 {
            info = (j + 1) as i32;
        }

        // rank-1 update of the trailing submatrix
        for k in (j + 1)..n {
            let u = a[j + k * lda];
            if u != 0.0 {
                for i in (j + 1)..n {
                    a[i + k * lda] -= a[i + j * lda] * u;
                }
            }
        }
    }

    if info > 0 {
        log::trace!("dgetrf: zero pivot at U({info},{info})");
        Err(LapackError::Singular(info))
    } else {
        Ok(())
    }
}

/// Solves `A * X = B` with the LU factorization computed by [`dgetrf`].
///
/// `b` holds `nrhs` right-hand sides of length `n` with leading dimension `ldb` and is
/// overwritten with the solution.
pub fn dgetrs(
    n: usize,
    nrhs: usize,
    a: &[f64],
    lda: usize,
    ipiv: &[i32],
    b: &mut [f64],
    ldb: usize,
) -> Result<(), LapackError> {
    if lda < n.max(1) {
        return Err(LapackError::IllegalArgument(5));
    }
    if a.len() < lda * n {
        return Err(LapackError::IllegalArgument(4));
    }
    if ipiv.len() < n {
        return Err(LapackError::IllegalArgument(6));
    }
    if ldb < n.max(1) {
        return Err(LapackError::IllegalArgument(8));
    }
    if b.len() < ldb * nrhs {
        return Err(LapackError::IllegalArgument(7));
    }

    for r in 0..nrhs {
        let x = &mut b[r * ldb..r * ldb + n];

        for (i, &p) in ipiv.iter().take(n).enumerate() {
            let p = (p - 1) as usize;
            if p != i {
                x.swap(i, p);
            }
        }

        // L * y = P * b, L has unit diagonal
        for j in 0..n {
            let xj = x[j];
            if xj != 0.0 {
                for i in (j + 1)..n {
                    x[i] -= xj * a[i + j * lda];
                }
            }
        }

        // U * x = y
        for j in (0..n).rev() {
            if x[j] != 0.0 {
                x[j] /= a[j + j * lda];
                let xj = x[j];
                for i in 0..j {
                    x[i] -= xj * a[i + j * lda];
                }
            }
        }
    }

    Ok(())
}

/// Computes the solution to a system of linear equations `A * X = B`.
///
/// The LU decomposition with partial pivoting and row interchanges is used to factor `A`, the
/// factored form is then used to solve the system. On success `a` holds the factors, `ipiv` the
/// pivot indices and `b` the solution. On [`LapackError::Singular`] no solution is computed and
/// `b` is left unchanged.
pub fn dgesv(
    n: usize,
    nrhs: usize,
    a: &mut [f64],
    lda: usize,
    ipiv: &mut [i32],
    b: &mut [f64],
    ldb: usize,
) -> Result<(), LapackError> {
    if lda < n.max(1) {
        return Err(LapackError::IllegalArgument(4));
    }
    if ldb < n.max(1) {
        return Err(LapackError::IllegalArgument(7));
    }
    if b.len() < ldb * nrhs {
        return Err(LapackError::IllegalArgument(6));
    }

    dgetrf(n, a, lda, ipiv)?;
    dgetrs(n, nrhs, a, lda, ipiv, b, ldb).map_err(|err| match err {
        // dgetrs numbering differs by one after the TRANS argument
        LapackError::IllegalArgument(i) if i > 3 => LapackError::IllegalArgument(i - 1),
        err => err,
    })
}

/// Forms the dot product of two vectors of length `n` with strides `incx` and `incy`.
///
/// A stride of zero, like `n == 0`, yields `0.0`.
pub fn ddot(n: usize, x: &[f64], incx: usize, y: &[f64], incy: usize) -> f64 {
    if n == 0 || incx == 0 || incy == 0 {
        return 0.0;
    }
    x.iter()
        .step_by(incx)
        .zip(y.iter().step_by(incy))
        .take(n)
        .map(|(x, y)| x * y)
        .sum()
}
