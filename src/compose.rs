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

//! Composition of hook entries around a base operation.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, trace};

use crate::hook::{
    AsyncAfterHook, AsyncBeforeHook, AsyncErrorHook, AsyncOperation, Hook, Operation,
    SharedWrapHook,
};
use crate::registry::{HookEntry, HookRegistry};

/// Compose the hooks in `entries` around `base`.
///
/// Wrap hooks are applied first, in registration order, so the first
/// registered wrap sits innermost and the last outermost. Before, after and
/// error hooks then sequence around the wrapped operation: every before
/// hook in registration order, the wrapped operation, every after hook in
/// registration order, each step awaited before the next starts. After
/// hooks therefore observe the wrap-transformed result.
///
/// A failure in any of those steps (a before hook, the wrapped operation,
/// or an after hook) is offered to the error hooks in registration order.
/// The first error hook to return `Ok` supplies the
/// invocation's result; when every error hook fails, or none is registered,
/// the original failure propagates to the caller unchanged.
///
/// Composition reads only the given snapshot: the returned callable is
/// unaffected by later registry mutation, and building another callable
/// never affects this one. An empty snapshot composes to `base` itself.
pub fn compose<P, R>(
    entries: &[HookEntry<P, R>],
    base: AsyncOperation<P, R>,
) -> AsyncOperation<P, R>
where
    P: Send + Sync + 'static,
    R: Send + Sync + 'static,
{
    if entries.is_empty() {
        return base;
    }

    let mut wraps: Vec<SharedWrapHook<P, R>> = Vec::new();
    let mut before: Vec<AsyncBeforeHook<P>> = Vec::new();
    let mut after: Vec<AsyncAfterHook<P, R>> = Vec::new();
    let mut error: Vec<AsyncErrorHook<P, R>> = Vec::new();
    for entry in entries {
        match entry.hook() {
            Hook::Wrap(hook) => wraps.push(hook.clone()),
            Hook::Before(hook) => before.push(hook.clone()),
            Hook::After(hook) => after.push(hook.clone()),
            Hook::Error(hook) => error.push(hook.clone()),
        }
    }

    let name = entries[0].name().to_string();
    debug!(
        name = %name,
        wraps = wraps.len(),
        before = before.len(),
        after = after.len(),
        error = error.len(),
        "composing hooks around operation"
    );

    let mut inner = base;
    for wrap in &wraps {
        inner = wrap.wrap(inner);
    }

    if before.is_empty() && after.is_empty() && error.is_empty() {
        return inner;
    }

    Arc::new(Sequenced {
        name,
        before,
        after,
        error,
        inner,
    })
}

/// Compose hooks for several names around `base`, first name outermost.
///
/// Built by folding [`compose`] right to left, so the last name's hooks sit
/// closest to the operation: the first name's before hooks run first, and
/// its after and error hooks run last. A single name is the degenerate
/// case.
pub fn compose_chain<P, R>(
    registry: &HookRegistry<P, R>,
    names: &[&str],
    base: AsyncOperation<P, R>,
) -> AsyncOperation<P, R>
where
    P: Send + Sync + 'static,
    R: Send + Sync + 'static,
{
    names
        .iter()
        .rev()
        .fold(base, |operation, name| {
            compose(&registry.hooks_for_name(name), operation)
        })
}

/// The before/after/error sequencing layer produced by [`compose`].
struct Sequenced<P, R> {
    name: String,
    before: Vec<AsyncBeforeHook<P>>,
    after: Vec<AsyncAfterHook<P, R>>,
    error: Vec<AsyncErrorHook<P, R>>,
    inner: AsyncOperation<P, R>,
}

impl<P, R> Sequenced<P, R>
where
    P: Send + Sync,
    R: Send + Sync,
{
    /// Before hooks, the wrapped operation, then after hooks. A failing
    /// before hook means the operation never runs; a failing after hook
    /// means the ones behind it never run.
    async fn attempt(&self, payload: &P) -> anyhow::Result<R> {
        for hook in &self.before {
            hook.run(payload).await?;
        }
        let result = self.inner.call(payload).await?;
        for hook in &self.after {
            hook.run(&result, payload).await?;
        }
        Ok(result)
    }

    /// Offer `failure` to each error hook in registration order. The first
    /// hook to return `Ok` decides the outcome; when every hook fails, the
    /// original failure is returned, not the last hook's.
    async fn recover(&self, failure: anyhow::Error, payload: &P) -> anyhow::Result<R> {
        if self.error.is_empty() {
            return Err(failure);
        }
        for (index, hook) in self.error.iter().enumerate() {
            match hook.recover(&failure, payload).await {
                Ok(result) => {
                    trace!(name = %self.name, index, "error hook absorbed failure");
                    return Ok(result);
                }
                Err(hook_failure) => {
                    debug!(
                        name = %self.name,
                        index,
                        error = %hook_failure,
                        "error hook failed, trying next"
                    );
                }
            }
        }
        Err(failure)
    }
}

#[async_trait]
impl<P, R> Operation<P, R> for Sequenced<P, R>
where
    P: Send + Sync,
    R: Send + Sync,
{
    async fn call(&self, payload: &P) -> anyhow::Result<R> {
        match self.attempt(payload).await {
            Ok(result) => Ok(result),
            Err(failure) => self.recover(failure, payload).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hook::{AfterFn, BeforeFn, BeforeHook, ErrorFn, OpFn, WrapFn};
    use anyhow::anyhow;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    type Log = Arc<Mutex<Vec<String>>>;

    fn log() -> Log {
        Arc::new(Mutex::new(Vec::new()))
    }

    fn base_op(log: &Log) -> AsyncOperation<u32, String> {
        let log = log.clone();
        Arc::new(OpFn::new(move |payload: u32| {
            let log = log.clone();
            async move {
                log.lock().push(format!("op({payload})"));
                Ok(format!("result-{payload}"))
            }
        }))
    }

    fn logging_before(log: &Log, label: &'static str) -> Hook<u32, String> {
        let log = log.clone();
        Hook::Before(Arc::new(BeforeFn::new(move |_: &u32| {
            log.lock().push(label.to_string());
            Ok(())
        })))
    }

    fn logging_after(log: &Log, label: &'static str) -> Hook<u32, String> {
        let log = log.clone();
        Hook::After(Arc::new(AfterFn::new(move |result: &String, _: &u32| {
            log.lock().push(format!("{label}:{result}"));
            Ok(())
        })))
    }

    fn suffixing_wrap(suffix: &'static str) -> Hook<u32, String> {
        Hook::Wrap(Arc::new(WrapFn::new(
            move |inner: AsyncOperation<u32, String>| -> AsyncOperation<u32, String> {
                Arc::new(OpFn::new(move |payload: u32| {
                    let inner = inner.clone();
                    async move {
                        let result = inner.call(&payload).await?;
                        Ok(format!("{result}-{suffix}"))
                    }
                }))
            },
        )))
    }

    /// A before hook that yields to the runtime before logging, so an
    /// engine that did not await each hook would interleave the labels.
    struct SleepyBefore {
        log: Log,
        label: &'static str,
    }

    #[async_trait]
    impl BeforeHook<u32> for SleepyBefore {
        async fn run(&self, _payload: &u32) -> anyhow::Result<()> {
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.log.lock().push(self.label.to_string());
            Ok(())
        }
    }

    fn registry() -> HookRegistry<u32, String> {
        HookRegistry::new()
    }

    #[tokio::test]
    async fn empty_entries_compose_to_the_base_operation() {
        let log = log();
        let composed = compose(&[], base_op(&log));
        let result = composed.call(&7).await.unwrap();
        assert_eq!(result, "result-7");
        assert_eq!(log.lock().as_slice(), ["op(7)"]);
    }

    #[tokio::test]
    async fn failures_pass_through_untouched_without_hooks() {
        let base: AsyncOperation<u32, String> =
            Arc::new(OpFn::new(|_: u32| async move { Err::<String, _>(anyhow!("boom")) }));
        let composed = compose(&[], base);
        let err = composed.call(&7).await.unwrap_err();
        assert_eq!(err.to_string(), "boom");
    }

    #[tokio::test]
    async fn before_hooks_run_in_order_and_each_completes_first() {
        let log = log();
        let reg = registry();
        reg.add_hook(
            "save",
            Hook::Before(Arc::new(SleepyBefore {
                log: log.clone(),
                label: "b1",
            })),
        );
        reg.add_hook("save", logging_before(&log, "b2"));

        let composed = compose(&reg.hooks_for_name("save"), base_op(&log));
        composed.call(&1).await.unwrap();
        assert_eq!(log.lock().as_slice(), ["b1", "b2", "op(1)"]);
    }

    #[tokio::test]
    async fn failing_before_hook_skips_the_operation() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = calls.clone();
        let base: AsyncOperation<u32, String> = Arc::new(OpFn::new(move |_: u32| {
            let counted = counted.clone();
            async move {
                counted.fetch_add(1, Ordering::SeqCst);
                Ok("never".to_string())
            }
        }));

        let reg = registry();
        reg.add_hook(
            "save",
            Hook::Before(Arc::new(BeforeFn::new(|_: &u32| Err(anyhow!("denied"))))),
        );

        let composed = compose(&reg.hooks_for_name("save"), base);
        let err = composed.call(&1).await.unwrap_err();
        assert_eq!(err.to_string(), "denied");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn after_hooks_observe_the_result_in_order() {
        let log = log();
        let reg = registry();
        reg.add_hook("save", logging_after(&log, "a1"));
        reg.add_hook("save", logging_after(&log, "a2"));

        let composed = compose(&reg.hooks_for_name("save"), base_op(&log));
        let result = composed.call(&3).await.unwrap();
        assert_eq!(result, "result-3");
        assert_eq!(log.lock().as_slice(), ["op(3)", "a1:result-3", "a2:result-3"]);
    }

    #[tokio::test]
    async fn failing_after_hook_stops_later_after_hooks() {
        let log = log();
        let reg = registry();
        reg.add_hook(
            "save",
            Hook::After(Arc::new(AfterFn::new(|_: &String, _: &u32| {
                Err(anyhow!("audit failed"))
            }))),
        );
        reg.add_hook("save", logging_after(&log, "a2"));

        let composed = compose(&reg.hooks_for_name("save"), base_op(&log));
        let err = composed.call(&3).await.unwrap_err();
        assert_eq!(err.to_string(), "audit failed");
        assert_eq!(log.lock().as_slice(), ["op(3)"]);
    }

    #[tokio::test]
    async fn wrap_hooks_nest_first_registered_innermost() {
        let log = log();
        let reg = registry();
        reg.add_hook("save", suffixing_wrap("w1"));
        reg.add_hook("save", suffixing_wrap("w2"));

        let composed = compose(&reg.hooks_for_name("save"), base_op(&log));
        let result = composed.call(&5).await.unwrap();
        assert_eq!(result, "result-5-w1-w2");
    }

    #[tokio::test]
    async fn after_hooks_see_the_wrap_transformed_result() {
        let log = log();
        let reg = registry();
        reg.add_hook("save", suffixing_wrap("wrapped"));
        reg.add_hook("save", logging_after(&log, "a"));

        let composed = compose(&reg.hooks_for_name("save"), base_op(&log));
        let result = composed.call(&2).await.unwrap();
        assert_eq!(result, "result-2-wrapped");
        assert_eq!(log.lock().as_slice(), ["op(2)", "a:result-2-wrapped"]);
    }

    #[tokio::test]
    async fn error_hook_fallback_replaces_a_failure() {
        let base: AsyncOperation<u32, String> =
            Arc::new(OpFn::new(|_: u32| async move { Err::<String, _>(anyhow!("boom")) }));
        let reg = registry();
        reg.add_hook(
            "save",
            Hook::Error(Arc::new(ErrorFn::new(|error: &anyhow::Error, _: &u32| {
                Ok(format!("recovered from {error}"))
            }))),
        );

        let composed = compose(&reg.hooks_for_name("save"), base);
        let result = composed.call(&1).await.unwrap();
        assert_eq!(result, "recovered from boom");
    }

    #[tokio::test]
    async fn error_hooks_are_tried_in_order_until_one_recovers() {
        let log = log();
        let base: AsyncOperation<u32, String> =
            Arc::new(OpFn::new(|_: u32| async move { Err::<String, _>(anyhow!("boom")) }));
        let reg = registry();
        let seen = log.clone();
        reg.add_hook(
            "save",
            Hook::Error(Arc::new(ErrorFn::new(
                move |error: &anyhow::Error, _: &u32| {
                    seen.lock().push(format!("e1:{error}"));
                    Err::<String, _>(anyhow!("still broken"))
                },
            ))),
        );
        let seen = log.clone();
        reg.add_hook(
            "save",
            Hook::Error(Arc::new(ErrorFn::new(
                move |error: &anyhow::Error, _: &u32| {
                    seen.lock().push(format!("e2:{error}"));
                    Ok("rescued".to_string())
                },
            ))),
        );

        let composed = compose(&reg.hooks_for_name("save"), base);
        let result = composed.call(&1).await.unwrap();
        assert_eq!(result, "rescued");
        // Both hooks were offered the original failure.
        assert_eq!(log.lock().as_slice(), ["e1:boom", "e2:boom"]);
    }

    #[tokio::test]
    async fn original_failure_survives_when_every_error_hook_fails() {
        let base: AsyncOperation<u32, String> =
            Arc::new(OpFn::new(|_: u32| async move { Err::<String, _>(anyhow!("boom")) }));
        let reg = registry();
        reg.add_hook(
            "save",
            Hook::Error(Arc::new(ErrorFn::new(|_: &anyhow::Error, _: &u32| {
                Err::<String, _>(anyhow!("first hook broke"))
            }))),
        );
        reg.add_hook(
            "save",
            Hook::Error(Arc::new(ErrorFn::new(|_: &anyhow::Error, _: &u32| {
                Err::<String, _>(anyhow!("second hook broke"))
            }))),
        );

        let composed = compose(&reg.hooks_for_name("save"), base);
        let err = composed.call(&1).await.unwrap_err();
        assert_eq!(err.to_string(), "boom");
    }

    #[tokio::test]
    async fn failing_before_hook_is_routed_to_error_hooks() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = calls.clone();
        let base: AsyncOperation<u32, String> = Arc::new(OpFn::new(move |_: u32| {
            let counted = counted.clone();
            async move {
                counted.fetch_add(1, Ordering::SeqCst);
                Ok("never".to_string())
            }
        }));

        let reg = registry();
        reg.add_hook(
            "save",
            Hook::Before(Arc::new(BeforeFn::new(|_: &u32| Err(anyhow!("denied"))))),
        );
        reg.add_hook(
            "save",
            Hook::Error(Arc::new(ErrorFn::new(|error: &anyhow::Error, _: &u32| {
                Ok(format!("fallback after {error}"))
            }))),
        );

        let composed = compose(&reg.hooks_for_name("save"), base);
        let result = composed.call(&1).await.unwrap();
        assert_eq!(result, "fallback after denied");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn chain_runs_first_name_outermost() {
        let log = log();
        let reg = registry();
        reg.add_hook("outer", logging_before(&log, "before-outer"));
        reg.add_hook("outer", logging_after(&log, "after-outer"));
        reg.add_hook("inner", logging_before(&log, "before-inner"));
        reg.add_hook("inner", logging_after(&log, "after-inner"));

        let composed = compose_chain(&reg, &["outer", "inner"], base_op(&log));
        composed.call(&9).await.unwrap();
        assert_eq!(
            log.lock().as_slice(),
            [
                "before-outer",
                "before-inner",
                "op(9)",
                "after-inner:result-9",
                "after-outer:result-9"
            ]
        );
    }

    #[tokio::test]
    async fn outer_error_hooks_catch_inner_failures() {
        let base: AsyncOperation<u32, String> =
            Arc::new(OpFn::new(|_: u32| async move { Err::<String, _>(anyhow!("boom")) }));
        let reg = registry();
        reg.add_hook(
            "outer",
            Hook::Error(Arc::new(ErrorFn::new(|error: &anyhow::Error, _: &u32| {
                Ok(format!("outer saved {error}"))
            }))),
        );
        reg.add_hook(
            "inner",
            Hook::Before(Arc::new(BeforeFn::new(|_: &u32| Ok(())))),
        );

        let composed = compose_chain(&reg, &["outer", "inner"], base);
        let result = composed.call(&1).await.unwrap();
        assert_eq!(result, "outer saved boom");
    }
}
