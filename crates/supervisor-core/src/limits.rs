// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Environment and resource-limit descriptors. Both are immutable once a
//! job is constructed — they are applied once, during the fork/exec
//! pipeline's child-side setup.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A private or peer-contributed environment variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvItem {
    pub key: String,
    pub value: String,
}

/// Resource ids from the fixed resource-limit table (`SoftResourceLimits` /
/// `HardResourceLimits` keys in the submission payload).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ResourceId {
    Cpu,
    FileSize,
    Data,
    StackSize,
    CoreSize,
    ResidentSetSize,
    MemoryLock,
    NumberOfProcesses,
    NumberOfFiles,
}

crate::simple_display! {
    ResourceId {
        Cpu => "cpu",
        FileSize => "file-size",
        Data => "data",
        StackSize => "stack",
        CoreSize => "core",
        ResidentSetSize => "rss",
        MemoryLock => "memlock",
        NumberOfProcesses => "nproc",
        NumberOfFiles => "nofile",
    }
}

/// A single resource id's soft and/or hard rlimit. `None` means "leave
/// that half of the pair at its inherited value".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitItem {
    pub resource: ResourceId,
    pub soft: Option<u64>,
    pub hard: Option<u64>,
}

/// A map from private env key to value, plus the subset contributed to
/// peer jobs (launchd's `UserEnvironmentVariables`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentSet {
    pub private: BTreeMap<String, String>,
    pub contributed: BTreeMap<String, String>,
}

impl EnvironmentSet {
    /// Build the final child environment per §6: peer-contributed vars
    /// first (earlier-defined wins among peers, i.e. first insertion is
    /// kept), then this job's private vars, with private overriding.
    pub fn resolve(&self, peer_contributed: &[BTreeMap<String, String>]) -> BTreeMap<String, String> {
        let mut out = BTreeMap::new();
        for peer in peer_contributed {
            for (k, v) in peer {
                out.entry(k.clone()).or_insert_with(|| v.clone());
            }
        }
        for (k, v) in &self.private {
            out.insert(k.clone(), v.clone());
        }
        out
    }
}

#[cfg(test)]
#[path = "limits_tests.rs"]
mod tests;
