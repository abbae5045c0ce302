//! Signal bindings - Drive ops from spark-signals.
//!
//! A binding is an effect that reads a signal and stages the value into the
//! root's inbox. Nothing is applied until the root flushes, so a burst of
//! signal writes collapses into one host mutation:
//!
//! ```ignore
//! let title = signal("Draft".to_string());
//! root.bind_signal(root.op(heading, OpKey::Attr("title"))?, title.clone())?;
//!
//! title.set("Final".to_string());
//! root.flush();
//! ```
//!
//! The effect stops when the leaf owning the op is destroyed.

use std::rc::Rc;

use spark_signals::{effect, Signal};

use crate::error::{ForestError, Result};
use crate::host::HostSurface;
use crate::pipeline::Root;
use crate::types::{OpId, OpValue};

impl<H: HostSurface> Root<H> {
    /// Stage every value `source` takes into `op`.
    pub fn bind_signal<T>(&mut self, op: OpId, source: Signal<T>) -> Result<()>
    where
        T: Clone + PartialEq + Into<OpValue> + 'static,
    {
        let block = self.plan.op(op).ok_or(ForestError::StaleOp(op))?.target.block();
        let owner = self
            .blocks
            .get(block)
            .and_then(|b| b.owner)
            .ok_or(ForestError::StaleOp(op))?;
        let inbox = Rc::clone(&self.inbox);

        let stop = effect(move || {
            let value: OpValue = source.get().into();
            inbox.borrow_mut().push_back((op, value));
        });

        if let Some(entry) = self.bindings.entry(owner) {
            entry.or_default().push(Box::new(stop));
        }
        log::trace!(target: "forest::plan", "bound {op:?} to a signal");
        Ok(())
    }
}
