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

//! The consumer-facing hook collection.

use std::sync::Arc;

use crate::compose::{compose, compose_chain};
use crate::error::HookError;
use crate::hook::{AfterHook, AsyncOperation, BeforeHook, ErrorHook, Hook, Operation, WrapHook};
use crate::registry::HookRegistry;

/// A named collection of hooks and the engine that runs them around
/// operations.
///
/// Each collection owns its own registry; construct as many as needed and
/// let whoever constructed one decide how long it lives. Registration and
/// removal take `&self` and may race invocation from other tasks: an
/// in-flight invocation keeps the hook lists it snapshotted when it
/// composed, and the next invocation sees the mutation.
///
/// Registration methods hand back the tagged [`Hook`] handle; keep it if
/// the hook should be removable later, drop it otherwise.
pub struct HookCollection<P, R> {
    registry: HookRegistry<P, R>,
}

impl<P, R> Default for HookCollection<P, R>
where
    P: Send + Sync + 'static,
    R: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<P, R> HookCollection<P, R>
where
    P: Send + Sync + 'static,
    R: Send + Sync + 'static,
{
    /// Create a collection with an empty registry.
    pub fn new() -> Self {
        Self {
            registry: HookRegistry::new(),
        }
    }

    /// The underlying registry, for lookups and introspection.
    pub fn registry(&self) -> &HookRegistry<P, R> {
        &self.registry
    }

    /// Register a hook that runs before the operation.
    pub fn before<H>(&self, name: &str, hook: H) -> Hook<P, R>
    where
        H: BeforeHook<P> + 'static,
    {
        self.add_hook(name, Hook::Before(Arc::new(hook)))
    }

    /// Register a hook that observes the operation's result.
    pub fn after<H>(&self, name: &str, hook: H) -> Hook<P, R>
    where
        H: AfterHook<P, R> + 'static,
    {
        self.add_hook(name, Hook::After(Arc::new(hook)))
    }

    /// Register a hook that is offered failures.
    pub fn error<H>(&self, name: &str, hook: H) -> Hook<P, R>
    where
        H: ErrorHook<P, R> + 'static,
    {
        self.add_hook(name, Hook::Error(Arc::new(hook)))
    }

    /// Register a hook that replaces the operation at composition time.
    pub fn wrap<H>(&self, name: &str, hook: H) -> Hook<P, R>
    where
        H: WrapHook<P, R> + 'static,
    {
        self.add_hook(name, Hook::Wrap(Arc::new(hook)))
    }

    /// Register an already-tagged hook and hand back its handle.
    ///
    /// Re-registering a handle produces a distinct entry, so the same hook
    /// can run more than once per invocation.
    pub fn add_hook(&self, name: &str, hook: Hook<P, R>) -> Hook<P, R> {
        self.registry.add_hook(name, hook.clone());
        hook
    }

    /// Remove the first entry under `name` holding the handle's callable.
    /// Returns whether anything was removed; no match is a no-op.
    pub fn remove(&self, name: &str, hook: &Hook<P, R>) -> bool {
        self.registry.remove_hook(name, hook)
    }

    /// Remove every hook registered under `name`.
    pub fn remove_name(&self, name: &str) {
        self.registry.remove_name(name);
    }

    /// Remove every hook under every name.
    pub fn clear(&self) {
        self.registry.clear();
    }

    /// Compose `name`'s hooks around `operation` and run the result on
    /// `payload` immediately.
    ///
    /// With no hooks registered under `name` this is a plain call to
    /// `operation`. A blank name is rejected as malformed before any hook
    /// runs.
    pub async fn invoke<O>(&self, name: &str, operation: O, payload: P) -> anyhow::Result<R>
    where
        O: Operation<P, R> + 'static,
    {
        self.invoke_chain(&[name], operation, payload).await
    }

    /// Compose hooks for each of `names` around `operation` (first name
    /// outermost) and run the result on `payload` immediately.
    ///
    /// Fails with [`HookError::EmptyNameList`] or [`HookError::BlankName`]
    /// before any hook runs.
    pub async fn invoke_chain<O>(
        &self,
        names: &[&str],
        operation: O,
        payload: P,
    ) -> anyhow::Result<R>
    where
        O: Operation<P, R> + 'static,
    {
        let composed = self.composed_chain(names, operation)?;
        composed.call(&payload).await
    }

    /// Build the composed callable for `name` without invoking it.
    ///
    /// The callable captures the hook lists as they are right now; later
    /// registration changes do not reach it. Invoke it as often as needed.
    pub fn composed<O>(&self, name: &str, operation: O) -> AsyncOperation<P, R>
    where
        O: Operation<P, R> + 'static,
    {
        compose(&self.registry.hooks_for_name(name), Arc::new(operation))
    }

    /// Build the composed callable for several names without invoking it,
    /// first name outermost.
    ///
    /// Fails with [`HookError::EmptyNameList`] or [`HookError::BlankName`];
    /// name validation happens here so a malformed invocation never runs a
    /// hook.
    pub fn composed_chain<O>(
        &self,
        names: &[&str],
        operation: O,
    ) -> Result<AsyncOperation<P, R>, HookError>
    where
        O: Operation<P, R> + 'static,
    {
        if names.is_empty() {
            return Err(HookError::EmptyNameList);
        }
        if names.iter().any(|name| name.trim().is_empty()) {
            return Err(HookError::BlankName);
        }
        Ok(compose_chain(&self.registry, names, Arc::new(operation)))
    }
}
