/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Time-ordered release of CC instances.
//!
//! The CC source is read ahead of the WC stream. [`StreamMerger::catch_up`]
//! releases, in stream order, every CC instance strictly earlier than a WC
//! timestamp. The first instance that is not earlier goes back onto the
//! backlog and is the first one examined on the next call, so repeated calls
//! with the same timestamp release nothing.

use alloc::boxed::Box;
use alloc::collections::VecDeque;

use log::warn;

use crate::instance::{Instance, Timestamp};
use crate::source::InstanceSource;

/// CC source plus the backlog of instances read but not yet usable.
#[derive(Debug)]
pub struct StreamMerger {
    source: Box<dyn InstanceSource>,
    backlog: VecDeque<Instance>,
}

impl StreamMerger {
    /// Merger reading from `source`.
    pub fn new(source: Box<dyn InstanceSource>) -> Self {
        Self { source, backlog: VecDeque::new() }
    }

    /// Rewind the source and drop the backlog.
    pub fn restart(&mut self) {
        self.source.restart();
        self.backlog.clear();
    }

    /// The CC source.
    pub fn source(&self) -> &dyn InstanceSource {
        self.source.as_ref()
    }

    /// The CC source, for header changes.
    pub fn source_mut(&mut self) -> &mut Box<dyn InstanceSource> {
        &mut self.source
    }

    /// Instances read ahead but not yet released.
    pub fn backlog_len(&self) -> usize {
        self.backlog.len()
    }

    /// Hand every CC instance strictly before `until` to `train`, oldest first.
    ///
    /// Returns the number of instances released. An instance without a
    /// timestamp is discarded with a warning.
    pub fn catch_up(&mut self, until: Timestamp, mut train: impl FnMut(Instance)) -> usize {
        let mut released = 0;
        while let Some(front) = self.backlog.front() {
            match front.timestamp() {
                Ok(t) if !t.is_before(until) => return released,
                Ok(_) => {
                    if let Some(instance) = self.backlog.pop_front() {
                        train(instance);
                        released += 1;
                    }
                }
                Err(e) => {
                    warn!("catch-up: backlog instance discarded: {}", e);
                    self.backlog.pop_front();
                }
            }
        }
        while self.source.has_next() {
            let Some(instance) = self.source.next() else {
                break;
            };
            match instance.timestamp() {
                Ok(t) if t.is_before(until) => {
                    train(instance);
                    released += 1;
                }
                Ok(_) => {
                    self.backlog.push_back(instance);
                    break;
                }
                Err(e) => warn!("catch-up: CC instance discarded: {}", e),
            }
        }
        released
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::Schema;
    use crate::source::VecSource;
    use alloc::vec;
    use alloc::vec::Vec;

    /// CC rows `[x, y, timestamp]`.
    fn merger(times: &[f64]) -> StreamMerger {
        let header = Schema::numeric("cc", 3, 1).unwrap();
        let rows = times.iter().enumerate().map(|(i, &t)| vec![i as f64, 0.0, t]).collect();
        StreamMerger::new(Box::new(VecSource::new(header, rows).unwrap()))
    }

    fn drain(m: &mut StreamMerger, t: f64) -> Vec<f64> {
        let mut out = Vec::new();
        m.catch_up(Timestamp::from_seconds(t), |i| out.push(i.value(0)));
        out
    }

    #[test]
    fn test_releases_strictly_earlier_only() {
        let mut m = merger(&[1.0, 2.0, 3.0, 3.0, 5.0]);
        assert_eq!(drain(&mut m, 3.0), vec![0.0, 1.0]);
        assert_eq!(m.backlog_len(), 1);
        assert_eq!(drain(&mut m, 4.0), vec![2.0, 3.0]);
        assert_eq!(m.backlog_len(), 1);
        assert_eq!(drain(&mut m, 100.0), vec![4.0]);
        assert_eq!(m.backlog_len(), 0);
    }

    #[test]
    fn test_repeated_call_releases_nothing() {
        let mut m = merger(&[1.0, 2.0, 9.0]);
        assert_eq!(drain(&mut m, 5.0).len(), 2);
        assert!(drain(&mut m, 5.0).is_empty());
        assert_eq!(m.backlog_len(), 1);
    }

    #[test]
    fn test_fractional_seconds_tie() {
        let mut m = merger(&[4.9, 5.1]);
        assert_eq!(drain(&mut m, 5.8), vec![0.0]);
        assert_eq!(m.backlog_len(), 1);
    }

    #[test]
    fn test_exhausted_source_ends_quietly() {
        let mut m = merger(&[]);
        assert!(drain(&mut m, 10.0).is_empty());
        assert_eq!(m.backlog_len(), 0);
    }

    #[test]
    fn test_held_back_instance_released_once() {
        let mut m = merger(&[1.0, 6.0, 7.0]);
        let mut seen = Vec::new();
        let n = m.catch_up(Timestamp::from_seconds(5.0), |i| seen.push(i.value(0)));
        assert_eq!(n, 1);
        assert_eq!(m.backlog_len(), 1);
        let n = m.catch_up(Timestamp::from_seconds(7.0), |i| seen.push(i.value(0)));
        assert_eq!(n, 1);
        let n = m.catch_up(Timestamp::from_seconds(8.0), |i| seen.push(i.value(0)));
        assert_eq!(n, 1);
        assert_eq!(seen, vec![0.0, 1.0, 2.0]);
        assert_eq!(m.backlog_len(), 0);
    }

    #[test]
    fn test_single_attribute_rows_are_timestamped() {
        let header = Schema::numeric("cc", 1, 0).unwrap();
        let mut m = StreamMerger::new(Box::new(VecSource::new(header, vec![vec![2.0], vec![4.0]]).unwrap()));
        let mut seen = Vec::new();
        assert_eq!(m.catch_up(Timestamp::from_seconds(3.0), |i| seen.push(i.value(0))), 1);
        assert_eq!(seen, vec![2.0]);
        assert_eq!(m.backlog_len(), 1);
    }

    #[test]
    fn test_restart_rereads_from_start() {
        let mut m = merger(&[1.0, 8.0]);
        drain(&mut m, 5.0);
        m.restart();
        assert_eq!(m.backlog_len(), 0);
        assert_eq!(drain(&mut m, 5.0), vec![0.0]);
    }
}
