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

//! Hook kinds, the callable traits behind each kind, and closure adapters.

use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::HookError;

/// When and how a hook participates in an invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HookKind {
    /// Runs before the operation, for side effect; a failure aborts the run.
    Before,
    /// Runs after a successful operation, observing its result.
    After,
    /// Runs when the operation or another hook failed; may recover.
    Error,
    /// Replaces the operation with a transformed one at composition time.
    Wrap,
}

impl HookKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            HookKind::Before => "before",
            HookKind::After => "after",
            HookKind::Error => "error",
            HookKind::Wrap => "wrap",
        }
    }
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HookKind {
    type Err = HookError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "before" => Ok(HookKind::Before),
            "after" => Ok(HookKind::After),
            "error" => Ok(HookKind::Error),
            "wrap" => Ok(HookKind::Wrap),
            other => Err(HookError::UnknownKind(other.to_string())),
        }
    }
}

/// The asynchronous callable a hook set composes around.
///
/// The engine treats implementations as opaque: an invocation calls `call`
/// exactly once and never inspects the payload or the result. Composed
/// callables produced by the engine implement this trait too, which is what
/// lets hook sets for several names nest.
#[async_trait]
pub trait Operation<P, R>: Send + Sync {
    async fn call(&self, payload: &P) -> anyhow::Result<R>;
}

/// Shared handle to an operation, as consumed and produced by composition.
pub type AsyncOperation<P, R> = Arc<dyn Operation<P, R>>;

/// Trait for hooks that run before the operation.
#[async_trait]
pub trait BeforeHook<P>: Send + Sync {
    /// Runs for side effect only; the return value carries success or
    /// failure, nothing else.
    async fn run(&self, payload: &P) -> anyhow::Result<()>;
}

/// Trait for hooks that observe a successful result.
#[async_trait]
pub trait AfterHook<P, R>: Send + Sync {
    /// Runs for side effect only; the invocation's result stays whatever
    /// the operation produced.
    async fn run(&self, result: &R, payload: &P) -> anyhow::Result<()>;
}

/// Trait for hooks that are offered a failure.
#[async_trait]
pub trait ErrorHook<P, R>: Send + Sync {
    /// Returning `Ok` absorbs the failure and supplies the invocation's
    /// result instead; returning `Err` passes the decision to the next
    /// error hook in registration order.
    async fn recover(&self, error: &anyhow::Error, payload: &P) -> anyhow::Result<R>;
}

/// Trait for hooks that replace the operation wholesale.
pub trait WrapHook<P, R>: Send + Sync {
    /// Produces a replacement for `inner`. Applied once, at composition
    /// time; the replacement must call `inner` itself if the original
    /// behavior should still run.
    fn wrap(&self, inner: AsyncOperation<P, R>) -> AsyncOperation<P, R>;
}

/// Shared handle to a before hook.
pub type AsyncBeforeHook<P> = Arc<dyn BeforeHook<P>>;
/// Shared handle to an after hook.
pub type AsyncAfterHook<P, R> = Arc<dyn AfterHook<P, R>>;
/// Shared handle to an error hook.
pub type AsyncErrorHook<P, R> = Arc<dyn ErrorHook<P, R>>;
/// Shared handle to a wrap hook.
pub type SharedWrapHook<P, R> = Arc<dyn WrapHook<P, R>>;

/// A hook callable tagged with its kind.
///
/// This is both what the registry stores and what registration hands back.
/// Removal compares the contained `Arc` by pointer identity, so keep the
/// returned value around if the hook should be removable later; two
/// separately constructed hooks never compare equal, even when built from
/// the same closure.
pub enum Hook<P, R> {
    Before(AsyncBeforeHook<P>),
    After(AsyncAfterHook<P, R>),
    Error(AsyncErrorHook<P, R>),
    Wrap(SharedWrapHook<P, R>),
}

impl<P, R> Hook<P, R> {
    pub fn kind(&self) -> HookKind {
        match self {
            Hook::Before(_) => HookKind::Before,
            Hook::After(_) => HookKind::After,
            Hook::Error(_) => HookKind::Error,
            Hook::Wrap(_) => HookKind::Wrap,
        }
    }

    /// Whether both values hold the same underlying callable.
    pub fn same_callable(&self, other: &Hook<P, R>) -> bool {
        fn thin_eq<T: ?Sized>(a: &Arc<T>, b: &Arc<T>) -> bool {
            // Compare data pointers only; vtable pointers are not stable
            // across codegen units.
            std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
        }
        match (self, other) {
            (Hook::Before(a), Hook::Before(b)) => thin_eq(a, b),
            (Hook::After(a), Hook::After(b)) => thin_eq(a, b),
            (Hook::Error(a), Hook::Error(b)) => thin_eq(a, b),
            (Hook::Wrap(a), Hook::Wrap(b)) => thin_eq(a, b),
            _ => false,
        }
    }
}

impl<P, R> Clone for Hook<P, R> {
    fn clone(&self) -> Self {
        match self {
            Hook::Before(hook) => Hook::Before(hook.clone()),
            Hook::After(hook) => Hook::After(hook.clone()),
            Hook::Error(hook) => Hook::Error(hook.clone()),
            Hook::Wrap(hook) => Hook::Wrap(hook.clone()),
        }
    }
}

impl<P, R> fmt::Debug for Hook<P, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Hook").field(&self.kind()).finish()
    }
}

/// Adapts a closure into an [`Operation`].
///
/// The closure receives an owned clone of the payload, which keeps it free
/// of lifetime bookkeeping; implement [`Operation`] directly for payloads
/// that must not be cloned.
pub struct OpFn<F> {
    f: F,
}

impl<F> OpFn<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<P, R, F, Fut> Operation<P, R> for OpFn<F>
where
    P: Clone + Send + Sync,
    R: Send,
    F: Fn(P) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<R>> + Send,
{
    async fn call(&self, payload: &P) -> anyhow::Result<R> {
        (self.f)(payload.clone()).await
    }
}

/// Adapts a synchronous closure into a [`BeforeHook`].
pub struct BeforeFn<F> {
    f: F,
}

impl<F> BeforeFn<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<P, F> BeforeHook<P> for BeforeFn<F>
where
    P: Sync,
    F: Fn(&P) -> anyhow::Result<()> + Send + Sync,
{
    async fn run(&self, payload: &P) -> anyhow::Result<()> {
        (self.f)(payload)
    }
}

/// Adapts a synchronous closure into an [`AfterHook`].
pub struct AfterFn<F> {
    f: F,
}

impl<F> AfterFn<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<P, R, F> AfterHook<P, R> for AfterFn<F>
where
    P: Sync,
    R: Sync,
    F: Fn(&R, &P) -> anyhow::Result<()> + Send + Sync,
{
    async fn run(&self, result: &R, payload: &P) -> anyhow::Result<()> {
        (self.f)(result, payload)
    }
}

/// Adapts a synchronous closure into an [`ErrorHook`].
pub struct ErrorFn<F> {
    f: F,
}

impl<F> ErrorFn<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<P, R, F> ErrorHook<P, R> for ErrorFn<F>
where
    P: Sync,
    R: Send,
    F: Fn(&anyhow::Error, &P) -> anyhow::Result<R> + Send + Sync,
{
    async fn recover(&self, error: &anyhow::Error, payload: &P) -> anyhow::Result<R> {
        (self.f)(error, payload)
    }
}

/// Adapts a closure into a [`WrapHook`].
pub struct WrapFn<F> {
    f: F,
}

impl<F> WrapFn<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<P, R, F> WrapHook<P, R> for WrapFn<F>
where
    F: Fn(AsyncOperation<P, R>) -> AsyncOperation<P, R> + Send + Sync,
{
    fn wrap(&self, inner: AsyncOperation<P, R>) -> AsyncOperation<P, R> {
        (self.f)(inner)
    }
}
