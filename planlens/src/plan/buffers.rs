// Copyright (c) 2024-2025 PlanLens Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Buffer access counters
//!
//! Three pools (shared, local, temp) with four sub-counters each. The server
//! reports them inclusively: a step's counters already contain its children.

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign};

/// The twelve buffer sub-counters of one step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BufferCounters {
    #[serde(rename = "Shared Hit Blocks", default, deserialize_with = "crate::plan::raw::lenient_counter")]
    pub shared_hit: u64,
    #[serde(rename = "Shared Read Blocks", default, deserialize_with = "crate::plan::raw::lenient_counter")]
    pub shared_read: u64,
    #[serde(rename = "Shared Dirtied Blocks", default, deserialize_with = "crate::plan::raw::lenient_counter")]
    pub shared_dirtied: u64,
    #[serde(rename = "Shared Written Blocks", default, deserialize_with = "crate::plan::raw::lenient_counter")]
    pub shared_written: u64,
    #[serde(rename = "Local Hit Blocks", default, deserialize_with = "crate::plan::raw::lenient_counter")]
    pub local_hit: u64,
    #[serde(rename = "Local Read Blocks", default, deserialize_with = "crate::plan::raw::lenient_counter")]
    pub local_read: u64,
    #[serde(rename = "Local Dirtied Blocks", default, deserialize_with = "crate::plan::raw::lenient_counter")]
    pub local_dirtied: u64,
    #[serde(rename = "Local Written Blocks", default, deserialize_with = "crate::plan::raw::lenient_counter")]
    pub local_written: u64,
    #[serde(rename = "Temp Hit Blocks", default, deserialize_with = "crate::plan::raw::lenient_counter")]
    pub temp_hit: u64,
    #[serde(rename = "Temp Read Blocks", default, deserialize_with = "crate::plan::raw::lenient_counter")]
    pub temp_read: u64,
    #[serde(rename = "Temp Dirtied Blocks", default, deserialize_with = "crate::plan::raw::lenient_counter")]
    pub temp_dirtied: u64,
    #[serde(rename = "Temp Written Blocks", default, deserialize_with = "crate::plan::raw::lenient_counter")]
    pub temp_written: u64,
}

/// Identifies one of the three buffer pools
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferPool {
    Shared,
    Local,
    Temp,
}

impl BufferCounters {
    /// Per-counter `max(self - other, 0)`
    pub fn saturating_sub(&self, other: &BufferCounters) -> BufferCounters {
        BufferCounters {
            shared_hit: self.shared_hit.saturating_sub(other.shared_hit),
            shared_read: self.shared_read.saturating_sub(other.shared_read),
            shared_dirtied: self.shared_dirtied.saturating_sub(other.shared_dirtied),
            shared_written: self.shared_written.saturating_sub(other.shared_written),
            local_hit: self.local_hit.saturating_sub(other.local_hit),
            local_read: self.local_read.saturating_sub(other.local_read),
            local_dirtied: self.local_dirtied.saturating_sub(other.local_dirtied),
            local_written: self.local_written.saturating_sub(other.local_written),
            temp_hit: self.temp_hit.saturating_sub(other.temp_hit),
            temp_read: self.temp_read.saturating_sub(other.temp_read),
            temp_dirtied: self.temp_dirtied.saturating_sub(other.temp_dirtied),
            temp_written: self.temp_written.saturating_sub(other.temp_written),
        }
    }

    /// Sum of hit/read/dirtied/written for one pool, saturating at `u64::MAX`
    pub fn pool_total(&self, pool: BufferPool) -> u64 {
        self.pool(pool)
            .into_iter()
            .fold(0u64, |acc, count| acc.saturating_add(count))
    }

    /// `[hit, read, dirtied, written]` for one pool
    pub fn pool(&self, pool: BufferPool) -> [u64; 4] {
        match pool {
            BufferPool::Shared => [
                self.shared_hit,
                self.shared_read,
                self.shared_dirtied,
                self.shared_written,
            ],
            BufferPool::Local => [
                self.local_hit,
                self.local_read,
                self.local_dirtied,
                self.local_written,
            ],
            BufferPool::Temp => [
                self.temp_hit,
                self.temp_read,
                self.temp_dirtied,
                self.temp_written,
            ],
        }
    }

    pub fn total(&self) -> u64 {
        self.pool_total(BufferPool::Shared)
            .saturating_add(self.pool_total(BufferPool::Local))
            .saturating_add(self.pool_total(BufferPool::Temp))
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

impl Add for BufferCounters {
    type Output = BufferCounters;

    fn add(mut self, rhs: BufferCounters) -> BufferCounters {
        self += rhs;
        self
    }
}

// Sums saturate at `u64::MAX`
impl AddAssign for BufferCounters {
    fn add_assign(&mut self, rhs: BufferCounters) {
        self.shared_hit = self.shared_hit.saturating_add(rhs.shared_hit);
        self.shared_read = self.shared_read.saturating_add(rhs.shared_read);
        self.shared_dirtied = self.shared_dirtied.saturating_add(rhs.shared_dirtied);
        self.shared_written = self.shared_written.saturating_add(rhs.shared_written);
        self.local_hit = self.local_hit.saturating_add(rhs.local_hit);
        self.local_read = self.local_read.saturating_add(rhs.local_read);
        self.local_dirtied = self.local_dirtied.saturating_add(rhs.local_dirtied);
        self.local_written = self.local_written.saturating_add(rhs.local_written);
        self.temp_hit = self.temp_hit.saturating_add(rhs.temp_hit);
        self.temp_read = self.temp_read.saturating_add(rhs.temp_read);
        self.temp_dirtied = self.temp_dirtied.saturating_add(rhs.temp_dirtied);
        self.temp_written = self.temp_written.saturating_add(rhs.temp_written);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_saturating_sub_floors_each_counter() {
        let parent = BufferCounters {
            shared_hit: 5,
            shared_read: 1,
            temp_read: 2,
            ..Default::default()
        };
        let children = BufferCounters {
            shared_hit: 2,
            shared_read: 3,
            temp_read: 1,
            ..Default::default()
        };

        let exclusive = parent.saturating_sub(&children);
        assert_eq!(exclusive.shared_hit, 3);
        assert_eq!(exclusive.shared_read, 0);
        assert_eq!(exclusive.temp_read, 1);
    }

    #[test]
    fn test_pool_totals() {
        let counters = BufferCounters {
            shared_hit: 1,
            shared_read: 2,
            shared_dirtied: 3,
            shared_written: 4,
            local_hit: 5,
            temp_written: 6,
            ..Default::default()
        };

        assert_eq!(counters.pool_total(BufferPool::Shared), 10);
        assert_eq!(counters.pool_total(BufferPool::Local), 5);
        assert_eq!(counters.pool_total(BufferPool::Temp), 6);
        assert_eq!(counters.total(), 21);
        assert_eq!((counters + counters).total(), 42);
    }

    #[test]
    fn test_sums_saturate_at_max() {
        let huge = BufferCounters {
            shared_hit: 10_000_000_000_000_000_000,
            ..Default::default()
        };
        assert_eq!((huge + huge).shared_hit, u64::MAX);

        let full = BufferCounters {
            shared_hit: u64::MAX,
            shared_read: 5,
            temp_written: 1,
            ..Default::default()
        };
        assert_eq!(full.pool_total(BufferPool::Shared), u64::MAX);
        assert_eq!(full.total(), u64::MAX);
        assert!(!full.is_empty());
    }
}
