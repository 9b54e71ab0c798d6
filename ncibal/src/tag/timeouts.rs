// ncibal/src/tag/timeouts.rs

use log::warn;

use crate::config::TagTimeouts;
use crate::types::Technology;

/// Per-technology transceive timeouts, resettable to the configured
/// defaults.
#[derive(Debug, Clone)]
pub struct TimeoutTable {
    defaults: TagTimeouts,
    values: [u64; Technology::TABLE_SIZE],
}

fn slot(tech: Technology) -> Option<usize> {
    let code = tech.code();
    if code >= 1 && code as usize <= Technology::TABLE_SIZE {
        Some(code as usize - 1)
    } else {
        None
    }
}

impl TimeoutTable {
    pub fn new(defaults: TagTimeouts) -> Self {
        let mut table = Self {
            defaults,
            values: [0; Technology::TABLE_SIZE],
        };
        table.reset();
        table
    }

    /// Timeout for `tech`; unknown technologies get the default wait.
    pub fn get(&self, tech: Technology) -> u64 {
        match slot(tech) {
            Some(i) => self.values[i],
            None => {
                warn!("no timeout entry for {:?}", tech);
                self.defaults.default_ms
            }
        }
    }

    pub fn set(&mut self, tech: Technology, timeout_ms: u64) -> bool {
        match slot(tech) {
            Some(i) => {
                self.values[i] = timeout_ms;
                true
            }
            None => false,
        }
    }

    pub fn reset(&mut self) {
        for code in 1..=Technology::TABLE_SIZE as i32 {
            let tech = Technology::from_code(code);
            self.values[code as usize - 1] = self.defaults.for_technology(tech);
        }
    }
}
