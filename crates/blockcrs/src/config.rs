//! Construction options for block matrices.

use serde::{Deserialize, Serialize};

use crate::error::{BlockCrsError, Result};
use crate::layout::BlockLayout;

/// How the local apply kernel schedules its rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionPolicy {
    /// Always run rows on the calling thread.
    Serial,
    /// Always run rows on the rayon pool (serial without the `parallel` feature).
    Parallel,
    /// Go parallel once the matrix has at least `min_parallel_rows` rows.
    Auto { min_parallel_rows: usize },
}

impl Default for ExecutionPolicy {
    fn default() -> Self {
        ExecutionPolicy::Auto {
            min_parallel_rows: 1024,
        }
    }
}

impl ExecutionPolicy {
    /// Whether `num_rows` rows should be processed in parallel.
    pub fn use_parallel(&self, num_rows: usize) -> bool {
        let wanted = match *self {
            ExecutionPolicy::Serial => false,
            ExecutionPolicy::Parallel => true,
            ExecutionPolicy::Auto { min_parallel_rows } => num_rows >= min_parallel_rows,
        };
        wanted && cfg!(feature = "parallel")
    }
}

/// Options for [`BlockCrsMatrix`](crate::BlockCrsMatrix) construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockCrsConfig {
    /// Row stride of a block; `None` means no padding.
    pub column_padding: Option<usize>,
    /// Store blocks row-major (true) or column-major (false).
    pub row_major: bool,
    /// Row scheduling for `apply_block`.
    pub execution: ExecutionPolicy,
}

impl Default for BlockCrsConfig {
    fn default() -> Self {
        Self {
            column_padding: None,
            row_major: true,
            execution: ExecutionPolicy::default(),
        }
    }
}

impl BlockCrsConfig {
    /// Create a builder.
    pub fn builder() -> BlockCrsConfigBuilder {
        BlockCrsConfigBuilder::default()
    }

    /// Check the options against a block size.
    ///
    /// # Errors
    ///
    /// Returns `InvalidColumnPadding` if the padding is below `block_size`.
    pub fn validate(&self, block_size: usize) -> Result<()> {
        match self.column_padding {
            Some(padding) if padding < block_size => Err(BlockCrsError::InvalidColumnPadding {
                padding,
                block_size,
            }),
            _ => Ok(()),
        }
    }

    /// Block layout implied by these options.
    pub fn layout(&self, block_size: usize) -> Result<BlockLayout> {
        self.validate(block_size)?;
        Ok(BlockLayout::new(
            block_size,
            self.column_padding.unwrap_or(block_size),
            self.row_major,
        ))
    }
}

/// Builder for [`BlockCrsConfig`].
#[derive(Default)]
pub struct BlockCrsConfigBuilder {
    config: BlockCrsConfig,
}

impl BlockCrsConfigBuilder {
    pub fn column_padding(mut self, padding: usize) -> Self {
        self.config.column_padding = Some(padding);
        self
    }

    pub fn row_major(mut self, row_major: bool) -> Self {
        self.config.row_major = row_major;
        self
    }

    pub fn execution(mut self, execution: ExecutionPolicy) -> Self {
        self.config.execution = execution;
        self
    }

    pub fn build(self) -> BlockCrsConfig {
        self.config
    }
}
