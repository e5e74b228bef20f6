// Copyright 2025 AgentReplay (https://github.com/agentreplay)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Hook registry: named, insertion-ordered hook sequences.

use dashmap::DashMap;

use crate::hook::{Hook, HookKind};

/// One registered hook: a callable, its kind, and the name it was
/// registered under. Immutable once created; removed as a unit.
pub struct HookEntry<P, R> {
    name: String,
    hook: Hook<P, R>,
}

impl<P, R> HookEntry<P, R> {
    pub(crate) fn new(name: impl Into<String>, hook: Hook<P, R>) -> Self {
        Self {
            name: name.into(),
            hook,
        }
    }

    /// Name this entry is registered under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Kind of the contained hook.
    pub fn kind(&self) -> HookKind {
        self.hook.kind()
    }

    /// The contained hook.
    pub fn hook(&self) -> &Hook<P, R> {
        &self.hook
    }
}

impl<P, R> Clone for HookEntry<P, R> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            hook: self.hook.clone(),
        }
    }
}

/// Mapping from operation name to its insertion-ordered hook entries.
///
/// A name with zero entries is indistinguishable from an absent name: both
/// mean "no hooks, invoke the operation directly". Lookups return cloned
/// snapshots, so a composed callable is never affected by mutation that
/// happens after it was built; mutations are visible to whatever composes
/// next.
pub struct HookRegistry<P, R> {
    entries: DashMap<String, Vec<HookEntry<P, R>>>,
}

impl<P, R> Default for HookRegistry<P, R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P, R> HookRegistry<P, R> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Append a hook under `name`, creating the sequence if absent.
    ///
    /// No de-duplication: registering the same handle again produces a
    /// distinct entry.
    pub fn add_hook(&self, name: impl Into<String>, hook: Hook<P, R>) {
        let name = name.into();
        let entry = HookEntry::new(name.clone(), hook);
        self.entries.entry(name).or_default().push(entry);
    }

    /// Remove the first entry under `name` holding the same callable as
    /// `hook`. Returns whether an entry was removed; an absent name or an
    /// unknown callable is a no-op.
    pub fn remove_hook(&self, name: &str, hook: &Hook<P, R>) -> bool {
        let removed = match self.entries.get_mut(name) {
            Some(mut entries) => match entries.iter().position(|e| e.hook.same_callable(hook)) {
                Some(position) => {
                    entries.remove(position);
                    true
                }
                None => false,
            },
            None => false,
        };
        if removed {
            // Drop the name once its sequence is empty; re-checked under
            // the entry lock in case an add raced us.
            self.entries.remove_if(name, |_, entries| entries.is_empty());
        }
        removed
    }

    /// Delete every entry for `name`.
    pub fn remove_name(&self, name: &str) {
        self.entries.remove(name);
    }

    /// Delete every entry for every name.
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Snapshot of the entries for `name`, in registration order. Empty if
    /// the name is absent.
    pub fn hooks_for_name(&self, name: &str) -> Vec<HookEntry<P, R>> {
        self.entries
            .get(name)
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    /// Names that currently have at least one entry.
    pub fn names(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|entry| !entry.value().is_empty())
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Number of entries registered under `name`.
    pub fn count_for(&self, name: &str) -> usize {
        self.entries.get(name).map(|entries| entries.len()).unwrap_or(0)
    }

    /// Total number of entries across all names.
    pub fn hook_count(&self) -> usize {
        self.entries.iter().map(|entry| entry.value().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.hook_count() == 0
    }
}
