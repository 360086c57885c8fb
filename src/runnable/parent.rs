// src/runnable/parent.rs

use std::fmt::Debug;

/// The suite a runnable belongs to.
///
/// Only two things are asked of it: whether it is pending as a whole, and
/// its own title path. Suite trees, sequencing and pass/fail bookkeeping
/// live behind this trait, outside the engine.
pub trait Parent: Send + Sync + Debug {
    fn is_pending(&self) -> bool;
    fn title_path(&self) -> Vec<String>;
}
