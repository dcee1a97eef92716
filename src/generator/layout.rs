//! Context block assembly.
//!
//! ```text
//! keys   = [k0, k1, k2]
//! values = [v0, v1, v2]
//! ctx    = [k0, v0, k1, v1, k2, v2]
//! ```

use crate::error::{MqarError, Result};
use ndarray::{s, Array2};

/// Interleave `keys` and `values` into a `(N, 2K)` context block.
///
/// Keys fill the even columns, values the odd ones, row order preserved.
pub fn assemble_context(keys: &Array2<i64>, values: &Array2<i64>) -> Result<Array2<i64>> {
    if keys.dim() != values.dim() {
        return Err(MqarError::ShapeMismatch {
            what: "values vs keys",
            expected: keys.dim(),
            actual: values.dim(),
        });
    }

    let (num_examples, num_pairs) = keys.dim();
    let mut context = Array2::<i64>::zeros((num_examples, num_pairs * 2));
    context.slice_mut(s![.., 0..;2]).assign(keys);
    context.slice_mut(s![.., 1..;2]).assign(values);

    Ok(context)
}
