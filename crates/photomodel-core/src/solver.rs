use crate::error::SolveError;
use crate::linalg::{Mat3, Vec3};

/// Pivots smaller than this fraction of their row's largest coefficient are
/// singular.
const SINGULAR_EPSILON: f64 = 1e-12;

/// Solves `a * x = b` by Gauss-Jordan elimination.
///
/// A vanishing leading entry is swapped with the next row that has a usable
/// one (row 1 before row 2), each column is cleared from the other two
/// equations, and every equation is finally divided by its own diagonal.
/// Pivots are judged against the scale of the equation they came from, so
/// rows of very different magnitude do not hide each other.
pub fn solve3(a: &Mat3, b: &Vec3) -> Result<Vec3, SolveError> {
    if a.iter().chain(b.iter()).any(|v| !v.is_finite()) {
        return Err(SolveError::NonFinite);
    }

    let mut scale = Vec3::from_fn(|row, _| a.row(row).amax());
    if scale.iter().any(|&s| s == 0.0) {
        return Err(SolveError::Singular);
    }

    let mut m = *a;
    let mut rhs = *b;
    let usable = |m: &Mat3, scale: &Vec3, row: usize, col: usize| {
        m[(row, col)].abs() > scale[row] * SINGULAR_EPSILON
    };

    for col in 0..3 {
        if !usable(&m, &scale, col, col) {
            let swap = (col + 1..3).find(|&row| usable(&m, &scale, row, col));
            match swap {
                Some(row) => {
                    m.swap_rows(col, row);
                    rhs.swap_rows(col, row);
                    scale.swap_rows(col, row);
                }
                None => return Err(SolveError::Singular),
            }
        }

        let pivot = m[(col, col)];
        for row in 0..3 {
            if row == col {
                continue;
            }
            let factor = m[(row, col)] / pivot;
            if factor == 0.0 {
                continue;
            }
            for k in 0..3 {
                m[(row, k)] -= factor * m[(col, k)];
            }
            rhs[row] -= factor * rhs[col];
        }
    }

    let x = Vec3::new(
        rhs[0] / m[(0, 0)],
        rhs[1] / m[(1, 1)],
        rhs[2] / m[(2, 2)],
    );
    if x.iter().all(|v| v.is_finite()) {
        Ok(x)
    } else {
        Err(SolveError::NonFinite)
    }
}
