//! Fixed-size linear algebra
//!
//! The filter works on a 4-state / 2-measurement system and the solver on
//! 2x2 normal equations, so all operations use const-generic arrays on the
//! stack. No heap allocation, `no_std` compatible.
//!
//! ## Numerical Safeguards
//!
//! - `make_symmetric` after every covariance update
//! - `cholesky` doubles as the positive-definiteness test
//! - `invert` uses partial pivoting and reports singular input

/// Matrix type using const generics
pub type Matrix<const R: usize, const C: usize> = [[f64; C]; R];

/// Square matrix type
pub type SquareMatrix<const N: usize> = Matrix<N, N>;

/// Vector type
pub type Vector<const N: usize> = [f64; N];

/// Pivot magnitude below which a matrix is treated as singular
const SINGULAR_PIVOT: f64 = 1e-12;

/// Identity matrix
pub fn identity<const N: usize>() -> SquareMatrix<N> {
    let mut m = [[0.0; N]; N];
    for (i, row) in m.iter_mut().enumerate() {
        row[i] = 1.0;
    }
    m
}

/// Matrix multiplication: C = A × B
///
/// Dimensions: A[R×K] × B[K×C] = C[R×C]
pub fn multiply<const R: usize, const K: usize, const C: usize>(
    a: &Matrix<R, K>,
    b: &Matrix<K, C>,
) -> Matrix<R, C> {
    let mut result = [[0.0; C]; R];
    for i in 0..R {
        for j in 0..C {
            for k in 0..K {
                result[i][j] += a[i][k] * b[k][j];
            }
        }
    }
    result
}

/// Matrix transpose: B = Aᵀ
pub fn transpose<const R: usize, const C: usize>(a: &Matrix<R, C>) -> Matrix<C, R> {
    let mut result = [[0.0; R]; C];
    for i in 0..R {
        for j in 0..C {
            result[j][i] = a[i][j];
        }
    }
    result
}

/// Matrix addition: C = A + B
pub fn add<const R: usize, const C: usize>(a: &Matrix<R, C>, b: &Matrix<R, C>) -> Matrix<R, C> {
    let mut result = *a;
    for i in 0..R {
        for j in 0..C {
            result[i][j] += b[i][j];
        }
    }
    result
}

/// Scale every element
pub fn scale<const R: usize, const C: usize>(a: &Matrix<R, C>, factor: f64) -> Matrix<R, C> {
    let mut result = *a;
    for row in result.iter_mut() {
        for value in row.iter_mut() {
            *value *= factor;
        }
    }
    result
}

/// Make matrix symmetric: A = (A + Aᵀ) / 2
///
/// Critical for keeping covariance matrices positive semi-definite
pub fn make_symmetric<const N: usize>(matrix: &mut SquareMatrix<N>) {
    for i in 0..N {
        for j in i + 1..N {
            let avg = (matrix[i][j] + matrix[j][i]) * 0.5;
            matrix[i][j] = avg;
            matrix[j][i] = avg;
        }
    }
}

/// Matrix-vector multiplication: y = A × x
pub fn matvec<const R: usize, const C: usize>(matrix: &Matrix<R, C>, vector: &Vector<C>) -> Vector<R> {
    let mut result = [0.0; R];
    for i in 0..R {
        for j in 0..C {
            result[i] += matrix[i][j] * vector[j];
        }
    }
    result
}

/// Quadratic form xᵀ·A·x
pub fn quadratic_form<const N: usize>(a: &SquareMatrix<N>, x: &Vector<N>) -> f64 {
    let ax = matvec(a, x);
    x.iter().zip(ax.iter()).map(|(xi, axi)| xi * axi).sum()
}

/// Cholesky decomposition: A = L × Lᵀ
///
/// ## Algorithm
///
/// For each element:
/// - Diagonal: L[j,j] = sqrt(A[j,j] - Σ(L[j,k]²))
/// - Below diagonal: L[i,j] = (A[i,j] - Σ(L[i,k]×L[j,k])) / L[j,j]
///
/// Returns `None` if the matrix is not positive definite
pub fn cholesky<const N: usize>(a: &SquareMatrix<N>) -> Option<SquareMatrix<N>> {
    let mut l = [[0.0; N]; N];

    for j in 0..N {
        let mut sum = 0.0;
        for k in 0..j {
            sum += l[j][k] * l[j][k];
        }

        let diag_val = a[j][j] - sum;
        if !(diag_val > 0.0) {
            return None;
        }
        l[j][j] = libm::sqrt(diag_val);

        for i in (j + 1)..N {
            let mut sum = 0.0;
            for k in 0..j {
                sum += l[i][k] * l[j][k];
            }
            l[i][j] = (a[i][j] - sum) / l[j][j];
        }
    }

    Some(l)
}

/// Positive semi-definiteness test
///
/// Symmetric matrices only. Adds `tolerance` to the diagonal and attempts a
/// Cholesky factorization, which succeeds exactly when every eigenvalue is
/// above `-tolerance`.
pub fn is_positive_semidefinite<const N: usize>(a: &SquareMatrix<N>, tolerance: f64) -> bool {
    let mut shifted = *a;
    for (i, row) in shifted.iter_mut().enumerate() {
        if !row.iter().all(|v| v.is_finite()) {
            return false;
        }
        row[i] += tolerance;
    }
    cholesky(&shifted).is_some()
}

/// Matrix inversion using Gauss-Jordan elimination with partial pivoting
///
/// Prefer `solve_cholesky` for symmetric positive definite systems; this is
/// used for the small innovation covariance only.
///
/// Returns `None` if the matrix is singular
pub fn invert<const N: usize>(a: &SquareMatrix<N>) -> Option<SquareMatrix<N>> {
    let mut work = *a;
    let mut inv = identity::<N>();

    for k in 0..N {
        let mut max_row = k;
        let mut max_val = libm::fabs(work[k][k]);
        for (i, row) in work.iter().enumerate().skip(k + 1) {
            let candidate = libm::fabs(row[k]);
            if candidate > max_val {
                max_val = candidate;
                max_row = i;
            }
        }

        if !(max_val > SINGULAR_PIVOT) {
            return None;
        }

        if max_row != k {
            work.swap(k, max_row);
            inv.swap(k, max_row);
        }

        let pivot = work[k][k];
        for j in 0..N {
            work[k][j] /= pivot;
            inv[k][j] /= pivot;
        }

        for i in 0..N {
            if i != k {
                let factor = work[i][k];
                for j in 0..N {
                    work[i][j] -= factor * work[k][j];
                    inv[i][j] -= factor * inv[k][j];
                }
            }
        }
    }

    Some(inv)
}

/// Solve A×x = b given the Cholesky factor L of A
///
/// More numerically stable than computing A⁻¹×b
pub fn solve_cholesky<const N: usize>(l: &SquareMatrix<N>, b: &Vector<N>) -> Vector<N> {
    // Forward substitution: L×y = b
    let mut y = [0.0; N];
    for i in 0..N {
        let mut sum = 0.0;
        for j in 0..i {
            sum += l[i][j] * y[j];
        }
        y[i] = (b[i] - sum) / l[i][i];
    }

    // Back substitution: Lᵀ×x = y
    let mut x = [0.0; N];
    for i in (0..N).rev() {
        let mut sum = 0.0;
        for j in (i + 1)..N {
            sum += l[j][i] * x[j];
        }
        x[i] = (y[i] - sum) / l[i][i];
    }
    x
}
