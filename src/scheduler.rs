use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use crate::types::EntityId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Job {
    Move(EntityId),
    SpawnGhost,
    SpawnFruit,
    SpeedUp,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct Entry {
    due_ms: u64,
    seq: u64,
    job: Job,
    token: u64,
}

/// Single cooperative scheduler for every entity and level timer. Each job
/// has at most one live entry; scheduling a job again replaces the pending
/// entry, and cancelled entries are dropped lazily when popped.
#[derive(Clone, Debug, Default)]
pub struct Scheduler {
    queue: BinaryHeap<Reverse<Entry>>,
    live: HashMap<Job, u64>,
    next_seq: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, job: Job, due_ms: u64) {
        self.next_seq += 1;
        let token = self.next_seq;
        self.live.insert(job, token);
        self.queue.push(Reverse(Entry {
            due_ms,
            seq: self.next_seq,
            job,
            token,
        }));
    }

    pub fn cancel(&mut self, job: Job) -> bool {
        self.live.remove(&job).is_some()
    }

    pub fn is_scheduled(&self, job: Job) -> bool {
        self.live.contains_key(&job)
    }

    pub fn clear(&mut self) {
        self.queue.clear();
        self.live.clear();
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    pub fn next_due(&mut self) -> Option<u64> {
        self.drop_stale();
        self.queue.peek().map(|Reverse(entry)| entry.due_ms)
    }

    pub fn pop_due(&mut self, now_ms: u64) -> Option<(u64, Job)> {
        self.drop_stale();
        let Reverse(entry) = self.queue.peek()?;
        if entry.due_ms > now_ms {
            return None;
        }
        let Reverse(entry) = self.queue.pop()?;
        self.live.remove(&entry.job);
        Some((entry.due_ms, entry.job))
    }

    fn drop_stale(&mut self) {
        while let Some(Reverse(entry)) = self.queue.peek() {
            if self.live.get(&entry.job) == Some(&entry.token) {
                break;
            }
            self.queue.pop();
        }
    }
}
