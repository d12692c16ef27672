pub mod clock;
mod engine;
pub mod error;
mod ledger;
mod router;
mod stats;
mod sync;

pub use engine::Engine;
pub use ledger::Ledger;
pub use router::{respond, Reply};
pub use stats::Stats;
pub use sync::{Authored, Registered};

/// Everything the quiz service needs: the store it reads and writes, and the clock it measures
/// deadlines with. Both are injected by the process entry point.
pub struct App<S, C> {
    store: S,
    clock: C,
}

impl<S, C> App<S, C> {
    pub const fn new(store: S, clock: C) -> Self {
        Self { store, clock }
    }

    pub const fn engine(&self) -> Engine<'_, S, C> {
        Engine { store: &self.store, clock: &self.clock }
    }

    pub const fn ledger(&self) -> Ledger<'_, S, C> {
        Ledger { store: &self.store, clock: &self.clock }
    }

    pub const fn stats(&self) -> Stats<'_, S> {
        Stats { store: &self.store }
    }
}
