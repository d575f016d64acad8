//! blockcrs - block-structured compressed sparse row matrices
//!
//! Every stored entry of a [`BlockCrsMatrix`] is a dense `B x B` block, one
//! per pair of mesh points coupled by the sparsity graph. This is the usual
//! representation of systems with `B` degrees of freedom per mesh point.
//!
//! # Architecture
//!
//! ```text
//! Structure:  Map, CrsGraph (fill-complete, shared via Arc)
//! Values:     BlockStorage -> LittleBlock / LittleVector views
//!             OffsetResolver (column index -> structural offset)
//! Multiply:   BlockCrsMatrix::apply_block
//!               import X (domain -> column map)   BlockTransfer
//!               local kernel over rows            RowBackend (serial / rayon)
//!               export Y (row -> range map)       BlockTransfer
//! ```
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use blockcrs::{BlockCrsMatrix, BlockMultiVector, CrsGraph, Map, TransposeMode};
//!
//! // One block row coupling mesh points 0 and 1, block size 2.
//! let rows = Arc::new(Map::contiguous(1));
//! let cols = Arc::new(Map::contiguous(2));
//! let mut graph = CrsGraph::from_local_rows(rows.clone(), cols.clone(), &[vec![0, 1]]).unwrap();
//! graph.fill_complete(cols.clone(), rows.clone()).unwrap();
//!
//! let mut a = BlockCrsMatrix::<f64>::new(Arc::new(graph), 2).unwrap();
//! let found = a.replace_local_values(0, &[0, 1], &[1.0, 0.0, 0.0, 1.0, 2.0, 0.0, 0.0, 2.0]);
//! assert_eq!(found, 2);
//!
//! let mut x = BlockMultiVector::new(cols, 2, 1);
//! x.put_scalar(1.0);
//! let mut y = BlockMultiVector::new(rows, 2, 1);
//! a.apply_block(&x, &mut y, TransposeMode::NoTrans, 1.0, 0.0).unwrap();
//! assert_eq!(y.multivector().data(), &[3.0, 3.0]);
//! ```

mod apply;
pub mod backend;
pub mod block_multivector;
pub mod config;
pub mod dist_object;
pub mod error;
pub mod graph;
pub mod layout;
pub mod little_block;
pub mod map;
pub mod matrix;
pub mod multivector;
pub mod offsets;
pub mod operator;
pub mod random;
pub mod row;
pub mod scalar;
pub mod storage;
pub mod transfer;

#[cfg(feature = "parallel")]
pub use backend::RayonBackend;
pub use backend::{RowBackend, SerialBackend};
pub use block_multivector::BlockMultiVector;
pub use config::{BlockCrsConfig, BlockCrsConfigBuilder, ExecutionPolicy};
pub use dist_object::{CombineMode, DistObject, MigrationSupport, supports_migration};
pub use error::{BlockCrsError, Result};
pub use graph::CrsGraph;
pub use layout::BlockLayout;
pub use little_block::{LittleBlock, LittleBlockMut, LittleVector, LittleVectorMut, block_gemv_accumulate};
pub use map::Map;
pub use matrix::BlockCrsMatrix;
pub use multivector::MultiVector;
pub use offsets::OffsetResolver;
pub use operator::{Operator, TransposeMode};
pub use random::RandomUniform;
pub use row::{BlockRowMut, BlockRowView};
pub use scalar::{Scalar, c64};
pub use storage::BlockStorage;
pub use transfer::{BlockTransfer, Distributor, LocalDistributor, SerialTransfer, TransferPlan, transfer};
