// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Background saving of region sets.
//!
//! Saves run on one worker thread, in submission order, so pointer input
//! never waits on the disk. Outcomes come back over a channel and are
//! polled once per frame.

use super::store::AnnotationStore;
use crate::error::AnnoError;
use crate::models::region_set::{RegionSet, Task};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;

struct SaveJob {
    file_id: String,
    task: Task,
    set: RegionSet,
}

/// Result of one save request.
#[derive(Debug)]
pub struct SaveOutcome {
    pub file_id: String,
    pub task: Task,
    pub result: Result<(), AnnoError>,
}

pub struct PersistenceQueue {
    jobs: Sender<SaveJob>,
    outcomes: Receiver<SaveOutcome>,
    in_flight: usize,
}

impl PersistenceQueue {
    pub fn new(store: Arc<dyn AnnotationStore>) -> Self {
        let (jobs, job_rx) = channel::<SaveJob>();
        let (outcome_tx, outcomes) = channel();

        std::thread::spawn(move || {
            for job in job_rx {
                let result = store.save_region_set(&job.file_id, job.task, &job.set);
                let _ = outcome_tx.send(SaveOutcome {
                    file_id: job.file_id,
                    task: job.task,
                    result,
                });
            }
        });

        Self {
            jobs,
            outcomes,
            in_flight: 0,
        }
    }

    /// Queue a save. Never blocks.
    pub fn save(&mut self, file_id: &str, task: Task, set: RegionSet) {
        let job = SaveJob {
            file_id: file_id.to_string(),
            task,
            set,
        };
        if self.jobs.send(job).is_err() {
            log::error!("Persistence worker is gone; dropped save for {}", file_id);
            return;
        }
        self.in_flight += 1;
    }

    /// Outcomes that arrived since the last poll.
    pub fn poll(&mut self) -> Vec<SaveOutcome> {
        let done: Vec<SaveOutcome> = self.outcomes.try_iter().collect();
        self.in_flight = self.in_flight.saturating_sub(done.len());
        done
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Block until every queued save reported back.
    #[cfg(test)]
    pub fn wait(&mut self, timeout: std::time::Duration) -> Vec<SaveOutcome> {
        let mut done = Vec::new();
        while self.in_flight > 0 {
            match self.outcomes.recv_timeout(timeout) {
                Ok(outcome) => {
                    self.in_flight -= 1;
                    done.push(outcome);
                }
                Err(_) => break,
            }
        }
        done
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::error::AnnoResult;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory store recording every save; optionally fails loads or saves.
    #[derive(Default)]
    pub struct MemoryStore {
        pub records: Mutex<HashMap<(String, Task), RegionSet>>,
        pub fail_loads: bool,
        pub fail_saves: bool,
        pub saves: Mutex<usize>,
    }

    impl MemoryStore {
        pub fn failing() -> Self {
            Self {
                fail_saves: true,
                ..Self::default()
            }
        }

        pub fn failing_loads() -> Self {
            Self {
                fail_loads: true,
                ..Self::default()
            }
        }

        pub fn get(&self, file_id: &str, task: Task) -> Option<RegionSet> {
            self.records.lock().unwrap().get(&(file_id.to_string(), task)).cloned()
        }
    }

    impl AnnotationStore for MemoryStore {
        fn load_region_set(&self, file_id: &str, task: Task) -> AnnoResult<Option<RegionSet>> {
            if self.fail_loads {
                return Err(AnnoError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, "truncated record")));
            }
            Ok(self.get(file_id, task))
        }

        fn save_region_set(&self, file_id: &str, task: Task, set: &RegionSet) -> AnnoResult<()> {
            *self.saves.lock().unwrap() += 1;
            if self.fail_saves {
                return Err(AnnoError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk full")));
            }
            self.records
                .lock()
                .unwrap()
                .insert((file_id.to_string(), task), set.clone());
            Ok(())
        }
    }
}
