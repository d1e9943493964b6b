use crate::backend::SelectError;

// ---------------------------------------------------------------------------
// TranspositionMode
// ---------------------------------------------------------------------------

/// How the selector treats nodes whose position fingerprint already exists
/// elsewhere in the tree.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TranspositionMode {
    /// Ignore transpositions entirely.
    None,
    /// Link duplicates to their root and copy children lazily on the second
    /// visit.
    SingleNodeDeferredCopy,
    /// Deferred copy plus cluster arbitration: value borrowing, abandon, and
    /// master swap between equal members.
    SharedSubtree,
}

// ---------------------------------------------------------------------------
// SelectConfig
// ---------------------------------------------------------------------------

/// Selector configuration — immutable, shareable across worker threads.
#[derive(Clone, Debug)]
pub struct SelectConfig {
    pub transposition_mode: TranspositionMode,
    /// Hand sub-descents to the worker pool.
    pub select_parallel_enabled: bool,
    /// Minimum sub-target that justifies a dispatch.
    pub select_parallel_threshold: u32,
    /// Depth to which the surrounding search preloads the tree around the
    /// root; only the leaf-list reservation sizing cares here.
    pub root_preload_depth: u32,
    pub max_preload_nodes_per_batch: usize,
    /// Over-reserve the leaf list to absorb transposition growth.
    pub padded_batch_sizing: bool,
    pub padded_extra_nodes_base: usize,
    pub padded_extra_nodes_multiplier: f32,
    /// Scales the exploration term; forwarded verbatim to the PUCT scorer.
    pub cpuct_multiplier: f32,
}

impl Default for SelectConfig {
    fn default() -> Self {
        Self {
            transposition_mode: TranspositionMode::SingleNodeDeferredCopy,
            select_parallel_enabled: true,
            select_parallel_threshold: 8,
            root_preload_depth: 2,
            max_preload_nodes_per_batch: 256,
            padded_batch_sizing: false,
            padded_extra_nodes_base: 5,
            padded_extra_nodes_multiplier: 0.03,
            cpuct_multiplier: 1.0,
        }
    }
}

impl SelectConfig {
    pub fn validated(self) -> Result<Self, SelectError> {
        if self.select_parallel_threshold == 0 {
            return Err(SelectError::InvalidConfig {
                msg: "select_parallel_threshold must be >= 1",
            });
        }
        if !(self.cpuct_multiplier.is_finite() && self.cpuct_multiplier > 0.0) {
            return Err(SelectError::InvalidConfig {
                msg: "cpuct_multiplier must be finite and > 0",
            });
        }
        if !(self.padded_extra_nodes_multiplier.is_finite()
            && self.padded_extra_nodes_multiplier >= 0.0)
        {
            return Err(SelectError::InvalidConfig {
                msg: "padded_extra_nodes_multiplier must be finite and >= 0",
            });
        }
        Ok(self)
    }

    /// Capacity to reserve for the batchlet's leaf list.
    pub fn leaf_capacity_hint(&self, target: u32) -> usize {
        let mut hint = target as usize;
        if self.padded_batch_sizing {
            hint += self.padded_extra_nodes_base
                + (target as f32 * self.padded_extra_nodes_multiplier).ceil() as usize;
        }
        if self.root_preload_depth > 0 {
            hint = hint.max(self.max_preload_nodes_per_batch);
        }
        hint
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
