//! Event channel with deferred dispatch.
//!
//! `launch` only queues a payload. Payloads are delivered to watchers when the
//! owner drains the channel, which the root does after a flush has committed
//! its structural ops.

use std::collections::VecDeque;
use std::rc::Rc;

/// Subscription handle returned by [`EventChannel::watch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WatchId(u64);

pub struct EventChannel<T> {
    name: &'static str,
    watchers: Vec<(WatchId, Rc<dyn Fn(&T)>)>,
    pending: VecDeque<T>,
    next_id: u64,
}

impl<T> EventChannel<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            watchers: Vec::new(),
            pending: VecDeque::new(),
            next_id: 0,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Subscribe to every dispatched payload.
    pub fn watch(&mut self, f: impl Fn(&T) + 'static) -> WatchId {
        let id = WatchId(self.next_id);
        self.next_id += 1;
        self.watchers.push((id, Rc::new(f)));
        id
    }

    pub fn unwatch(&mut self, id: WatchId) {
        self.watchers.retain(|(watch, _)| *watch != id);
    }

    /// Queue a payload for the next dispatch.
    pub fn launch(&mut self, payload: T) {
        self.pending.push_back(payload);
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn take_pending(&mut self) -> Vec<T> {
        self.pending.drain(..).collect()
    }

    /// Deliver one payload to every watcher, in subscription order.
    pub fn notify(&self, payload: &T) {
        for (_, watcher) in &self.watchers {
            watcher(payload);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn test_launch_is_deferred() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = seen.clone();

        let mut channel = EventChannel::new("test");
        channel.watch(move |v: &u32| seen_clone.borrow_mut().push(*v));

        channel.launch(1);
        channel.launch(2);
        assert!(seen.borrow().is_empty());
        assert_eq!(channel.pending_len(), 2);

        for payload in channel.take_pending() {
            channel.notify(&payload);
        }
        assert_eq!(*seen.borrow(), vec![1, 2]);
        assert_eq!(channel.pending_len(), 0);
    }

    #[test]
    fn test_unwatch() {
        let count = Rc::new(RefCell::new(0));
        let count_clone = count.clone();

        let mut channel = EventChannel::new("test");
        let id = channel.watch(move |_: &()| *count_clone.borrow_mut() += 1);
        channel.notify(&());
        channel.unwatch(id);
        channel.notify(&());

        assert_eq!(*count.borrow(), 1);
    }
}
