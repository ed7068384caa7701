//! A priority queue of plans sorted by time.
//!
//! `Context` keeps the simulated days and the end-of-run summary here, each a callback
//! `FnOnce(&mut Context)` due at a given time. Same-time plans run in phase order, then in the
//! order they were added.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use log::trace;

/// A plan that holds data of type `T` intended to be used at `time`.
pub struct Plan<T> {
    pub time: f64,
    pub data: T,
}

pub struct Queue<T, P: Ord> {
    queue: BinaryHeap<Entry<T, P>>,
    plan_counter: u64,
}

impl<T, P: Ord> Queue<T, P> {
    #[must_use]
    pub fn new() -> Queue<T, P> {
        Queue {
            queue: BinaryHeap::new(),
            plan_counter: 0,
        }
    }

    pub fn add_plan(&mut self, time: f64, data: T, priority: P) {
        trace!("adding plan {} at {time}", self.plan_counter);
        self.queue.push(Entry {
            time,
            priority,
            sequence: self.plan_counter,
            data,
        });
        self.plan_counter += 1;
    }

    /// Removes and returns the earliest plan.
    pub fn get_next_plan(&mut self) -> Option<Plan<T>> {
        self.queue.pop().map(|entry| Plan {
            time: entry.time,
            data: entry.data,
        })
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }
}

impl<T, P: Ord> Default for Queue<T, P> {
    fn default() -> Self {
        Self::new()
    }
}

struct Entry<T, P: Ord> {
    time: f64,
    priority: P,
    sequence: u64,
    data: T,
}

impl<T, P: Ord> PartialEq for Entry<T, P> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<T, P: Ord> Eq for Entry<T, P> {}

impl<T, P: Ord> PartialOrd for Entry<T, P> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Reversed so that the max-heap pops the earliest entry. The payload takes no part.
impl<T, P: Ord> Ord for Entry<T, P> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.time
            .total_cmp(&other.time)
            .then_with(|| self.priority.cmp(&other.priority))
            .then_with(|| self.sequence.cmp(&other.sequence))
            .reverse()
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::Queue;

    fn drain<T, P: Ord>(plan_queue: &mut Queue<T, P>) -> Vec<(f64, T)> {
        std::iter::from_fn(|| plan_queue.get_next_plan())
            .map(|plan| (plan.time, plan.data))
            .collect()
    }

    #[test]
    fn empty_queue() {
        let mut plan_queue = Queue::<(), ()>::new();
        assert!(plan_queue.get_next_plan().is_none());
    }

    #[test]
    fn plans_come_out_in_time_order() {
        let mut plan_queue = Queue::new();
        plan_queue.add_plan(3.0, "day three", ());
        plan_queue.add_plan(1.0, "day one", ());
        plan_queue.add_plan(2.0, "day two", ());
        assert_eq!(
            drain(&mut plan_queue),
            vec![(1.0, "day one"), (2.0, "day two"), (3.0, "day three")]
        );
    }

    #[test]
    fn ties_break_on_priority_then_insertion() {
        let mut plan_queue = Queue::new();
        plan_queue.add_plan(1.0, "summary", 2);
        plan_queue.add_plan(1.0, "first day plan", 1);
        plan_queue.add_plan(1.0, "second day plan", 1);
        plan_queue.add_plan(1.0, "setup", 0);
        let order: Vec<&str> = drain(&mut plan_queue).into_iter().map(|(_, d)| d).collect();
        assert_eq!(order, vec!["setup", "first day plan", "second day plan", "summary"]);
    }

    #[test]
    fn clear_drops_everything() {
        let mut plan_queue = Queue::new();
        plan_queue.add_plan(1.0, 1, ());
        plan_queue.add_plan(2.0, 2, ());
        plan_queue.clear();
        assert!(plan_queue.get_next_plan().is_none());
    }
}
