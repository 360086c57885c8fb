use std::sync::atomic::{AtomicBool, Ordering};

use hookrun::runnable::Parent;

/// In-memory stand-in for a suite.
///
/// The pending flag can be flipped after tests were attached, which is how
/// a real suite behaves when it gets `.skip`ped late.
#[derive(Debug, Default)]
pub struct FakeSuite {
    titles: Vec<String>,
    pending: AtomicBool,
}

impl FakeSuite {
    pub fn new(titles: &[&str]) -> Self {
        Self {
            titles: titles.iter().map(|t| t.to_string()).collect(),
            pending: AtomicBool::new(false),
        }
    }

    pub fn pending(titles: &[&str]) -> Self {
        let suite = Self::new(titles);
        suite.set_pending(true);
        suite
    }

    pub fn set_pending(&self, pending: bool) {
        self.pending.store(pending, Ordering::SeqCst);
    }
}

impl Parent for FakeSuite {
    fn is_pending(&self) -> bool {
        self.pending.load(Ordering::SeqCst)
    }

    fn title_path(&self) -> Vec<String> {
        self.titles.clone()
    }
}
