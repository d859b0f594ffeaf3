use std::sync::{Arc, Mutex};

/// The event interface every dispatch scenario uses. `Send + Sync` as
/// supertraits so the trait object satisfies global storage.
pub trait Probe: Send + Sync {
    fn hit(&self, event: u32);
}

pub type Log = Arc<Mutex<Vec<(&'static str, u32)>>>;

pub fn new_log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn names(log: &Log) -> Vec<&'static str> {
    log.lock().unwrap().iter().map(|(name, _)| *name).collect()
}

/// A handler that records every event it sees.
pub struct Recorder {
    pub name: &'static str,
    pub log: Log,
}

impl Recorder {
    pub fn new(name: &'static str, log: &Log) -> Arc<Self> {
        Arc::new(Recorder {
            name,
            log: log.clone(),
        })
    }
}

impl Probe for Recorder {
    fn hit(&self, event: u32) {
        self.log.lock().unwrap().push((self.name, event));
    }
}
