//! Point-level linear operator interface.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::map::Map;
use crate::multivector::MultiVector;
use crate::scalar::Scalar;

/// Which operator `apply` uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TransposeMode {
    /// `Op(A) = A`
    #[default]
    NoTrans,
    /// `Op(A) = A^T`
    Trans,
    /// `Op(A) = A^H`
    ConjTrans,
}

impl TransposeMode {
    #[inline]
    pub fn is_transpose(&self) -> bool {
        !matches!(self, TransposeMode::NoTrans)
    }
}

/// `Y := beta * Y + alpha * Op(A) * X` over point-level multivectors.
pub trait Operator<T: Scalar> {
    /// Map of the entries of `X`.
    fn domain_map(&self) -> &Arc<Map>;

    /// Map of the entries of `Y`.
    fn range_map(&self) -> &Arc<Map>;

    fn apply(
        &self,
        x: &MultiVector<T>,
        y: &mut MultiVector<T>,
        mode: TransposeMode,
        alpha: T,
        beta: T,
    ) -> Result<()>;

    /// Whether `apply` accepts [`TransposeMode::Trans`] and
    /// [`TransposeMode::ConjTrans`].
    fn has_transpose_apply(&self) -> bool {
        false
    }
}
