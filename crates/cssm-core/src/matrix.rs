//! Dense complex matrices for array processing.
//!
//! A simple row-major `CMatrix` with the handful of operations the CSSM
//! pipeline needs: products, Hermitian transpose, accumulation, Gauss-Jordan
//! inversion and Hermitian diagnostics. Sizes are M×M with M the number of
//! sensors, so everything is straightforward O(M³) code.
//!
//! ## Example
//!
//! ```rust
//! use cssm_core::matrix::CMatrix;
//! use num_complex::Complex64;
//!
//! let a = CMatrix::from_data(2, 2, vec![
//!     Complex64::new(2.0, 0.0), Complex64::new(0.0, 1.0),
//!     Complex64::new(0.0, -1.0), Complex64::new(2.0, 0.0),
//! ]);
//! let inv = a.inverse().unwrap();
//! let eye = a.multiply(&inv);
//! assert!((eye.get(0, 0).re - 1.0).abs() < 1e-12);
//! assert!(a.is_hermitian(0.0));
//! ```

use num_complex::Complex64;

/// Pivot magnitude below which a matrix is treated as singular.
pub const SINGULAR_PIVOT: f64 = 1e-12;

/// Row-major dense matrix of `Complex64` values.
#[derive(Debug, Clone, PartialEq)]
pub struct CMatrix {
    rows: usize,
    cols: usize,
    data: Vec<Complex64>,
}

impl CMatrix {
    /// Create a zero-initialized matrix.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![Complex64::new(0.0, 0.0); rows * cols],
        }
    }

    /// Create a matrix from existing data (row-major order).
    ///
    /// # Panics
    /// Panics if `data.len() != rows * cols`.
    pub fn from_data(rows: usize, cols: usize, data: Vec<Complex64>) -> Self {
        assert_eq!(
            data.len(),
            rows * cols,
            "data length {} != rows*cols {}",
            data.len(),
            rows * cols
        );
        Self { rows, cols, data }
    }

    /// Build a matrix whose columns are the given vectors.
    ///
    /// # Panics
    /// Panics if the columns do not all have length `rows`.
    pub fn from_columns(rows: usize, columns: &[&[Complex64]]) -> Self {
        let mut m = Self::zeros(rows, columns.len());
        for (c, col) in columns.iter().enumerate() {
            assert_eq!(col.len(), rows, "column {} has length {}", c, col.len());
            for (r, &v) in col.iter().enumerate() {
                m.set(r, c, v);
            }
        }
        m
    }

    /// Create an *n*-by-*n* identity matrix.
    pub fn identity(n: usize) -> Self {
        let mut m = Self::zeros(n, n);
        for i in 0..n {
            m.set(i, i, Complex64::new(1.0, 0.0));
        }
        m
    }

    /// Rank-one outer product `x · x^H`.
    pub fn outer(x: &[Complex64]) -> Self {
        let n = x.len();
        let mut m = Self::zeros(n, n);
        for i in 0..n {
            for j in 0..n {
                m.set(i, j, x[i] * x[j].conj());
            }
        }
        m
    }

    /// Get element at (r, c).
    #[inline]
    pub fn get(&self, r: usize, c: usize) -> Complex64 {
        self.data[r * self.cols + c]
    }

    /// Set element at (r, c).
    #[inline]
    pub fn set(&mut self, r: usize, c: usize, val: Complex64) {
        self.data[r * self.cols + c] = val;
    }

    /// Number of rows.
    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn is_square(&self) -> bool {
        self.rows == self.cols
    }

    /// Raw row-major storage.
    pub fn as_slice(&self) -> &[Complex64] {
        &self.data
    }

    /// Copy of column `c`.
    pub fn column(&self, c: usize) -> Vec<Complex64> {
        (0..self.rows).map(|r| self.get(r, c)).collect()
    }

    /// Conjugate (Hermitian) transpose.
    pub fn hermitian(&self) -> Self {
        let mut t = Self::zeros(self.cols, self.rows);
        for r in 0..self.rows {
            for c in 0..self.cols {
                t.set(c, r, self.get(r, c).conj());
            }
        }
        t
    }

    /// Matrix multiplication `self * other`.
    ///
    /// # Panics
    /// Panics if `self.cols != other.rows`.
    pub fn multiply(&self, other: &CMatrix) -> CMatrix {
        assert_eq!(
            self.cols, other.rows,
            "incompatible dimensions: {}x{} * {}x{}",
            self.rows, self.cols, other.rows, other.cols
        );
        let mut out = CMatrix::zeros(self.rows, other.cols);
        for i in 0..self.rows {
            for j in 0..other.cols {
                let mut s = Complex64::new(0.0, 0.0);
                for k in 0..self.cols {
                    s += self.get(i, k) * other.get(k, j);
                }
                out.set(i, j, s);
            }
        }
        out
    }

    /// Sandwich product `self · inner · self^H`.
    pub fn congruence(&self, inner: &CMatrix) -> CMatrix {
        self.multiply(inner).multiply(&self.hermitian())
    }

    /// Quadratic form `x^H · self · x`.
    pub fn quadratic_form(&self, x: &[Complex64]) -> Complex64 {
        assert_eq!(self.cols, x.len(), "vector length mismatch");
        let mut acc = Complex64::new(0.0, 0.0);
        for i in 0..self.rows {
            let mut row = Complex64::new(0.0, 0.0);
            for j in 0..self.cols {
                row += self.get(i, j) * x[j];
            }
            acc += x[i].conj() * row;
        }
        acc
    }

    /// Element-wise `self += other`.
    ///
    /// # Panics
    /// Panics on shape mismatch.
    pub fn add_assign(&mut self, other: &CMatrix) {
        assert_eq!(
            (self.rows, self.cols),
            (other.rows, other.cols),
            "shape mismatch in add_assign"
        );
        for (a, b) in self.data.iter_mut().zip(other.data.iter()) {
            *a += b;
        }
    }

    /// Multiply every element by a real scalar.
    pub fn scale(&mut self, s: f64) {
        for v in self.data.iter_mut() {
            *v *= s;
        }
    }

    /// Hermitian part `(A + A^H) / 2`.
    pub fn hermitian_part(&self) -> CMatrix {
        let mut out = self.hermitian();
        out.add_assign(self);
        out.scale(0.5);
        out
    }

    /// Check `|a_ij - conj(a_ji)| <= tol` for all entries.
    pub fn is_hermitian(&self, tol: f64) -> bool {
        if !self.is_square() {
            return false;
        }
        for i in 0..self.rows {
            for j in i..self.cols {
                if (self.get(i, j) - self.get(j, i).conj()).norm() > tol {
                    return false;
                }
            }
        }
        true
    }

    /// Sum of the diagonal.
    pub fn trace(&self) -> Complex64 {
        (0..self.rows.min(self.cols)).map(|i| self.get(i, i)).sum()
    }

    /// Frobenius norm.
    pub fn frobenius_norm(&self) -> f64 {
        self.data.iter().map(|v| v.norm_sqr()).sum::<f64>().sqrt()
    }

    /// `true` if every element is finite.
    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|v| v.re.is_finite() && v.im.is_finite())
    }

    /// Inverse via Gauss-Jordan elimination with partial pivoting.
    ///
    /// Returns `None` when a pivot falls below [`SINGULAR_PIVOT`] or the
    /// matrix is not square.
    pub fn inverse(&self) -> Option<CMatrix> {
        if !self.is_square() {
            return None;
        }
        let n = self.rows;
        let w = 2 * n;
        let mut aug = vec![Complex64::new(0.0, 0.0); n * w];

        // Build augmented matrix [A | I]
        for i in 0..n {
            for j in 0..n {
                aug[i * w + j] = self.get(i, j);
            }
            aug[i * w + n + i] = Complex64::new(1.0, 0.0);
        }

        for col in 0..n {
            let mut max_val = 0.0f64;
            let mut max_row = col;
            for row in col..n {
                let val = aug[row * w + col].norm();
                if val > max_val {
                    max_val = val;
                    max_row = row;
                }
            }

            if !(max_val >= SINGULAR_PIVOT) {
                return None;
            }

            if max_row != col {
                for j in 0..w {
                    aug.swap(col * w + j, max_row * w + j);
                }
            }

            let pivot = aug[col * w + col];
            for j in 0..w {
                aug[col * w + j] /= pivot;
            }

            for row in 0..n {
                if row != col {
                    let factor = aug[row * w + col];
                    for j in 0..w {
                        let val = aug[col * w + j];
                        aug[row * w + j] -= factor * val;
                    }
                }
            }
        }

        let mut result = CMatrix::zeros(n, n);
        for i in 0..n {
            for j in 0..n {
                result.set(i, j, aug[i * w + n + j]);
            }
        }
        Some(result)
    }
}
