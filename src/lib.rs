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

//! Composable hook chains around asynchronous operations.
//!
//! Attach auxiliary behavior to an operation by name: checks that run
//! before it, observers of its result, recovery when it fails, or a
//! wholesale replacement. Invocation produces one composed callable with a
//! fixed execution order. The engine sequences everything; it never
//! schedules, retries, or parallelizes the operation itself.
//!
//! # Architecture
//!
//! - [`HookKind`] / [`Hook`]: the four hook kinds and the tagged callable
//!   the registry stores (also the handle for identity-based removal).
//! - [`HookRegistry`]: maps operation names to insertion-ordered hook
//!   entries, safe to mutate while invocations are in flight.
//! - [`compose`] / [`compose_chain`]: pure functions from a hook snapshot
//!   and a base operation to a composed callable; wrap hooks nest first
//!   (first registered innermost), then before/after/error hooks sequence
//!   around the wrapped operation. Multi-name composition folds right to
//!   left so the first name's hooks sit outermost.
//! - [`HookCollection`]: the consumer surface: registration by kind,
//!   removal, immediate invocation, deferred composition.
//!
//! Failures produced by hooks or operations travel as `anyhow::Error` and
//! reach the caller unchanged unless an error hook absorbs them. When an
//! error hook itself fails, the engine moves on to the next one; once all
//! of them have failed, the original failure is what the caller sees.
//!
//! # Example
//!
//! ```rust,ignore
//! use hookchain::{BeforeFn, ErrorFn, HookCollection, OpFn};
//!
//! let hooks: HookCollection<Request, Response> = HookCollection::new();
//!
//! hooks.before("save", BeforeFn::new(|request: &Request| request.validate()));
//! hooks.error("save", ErrorFn::new(|_err, _request| Ok(Response::cached())));
//!
//! let response = hooks
//!     .invoke(
//!         "save",
//!         OpFn::new(|request: Request| async move { store.save(request).await }),
//!         request,
//!     )
//!     .await?;
//! ```

pub mod collection;
pub mod compose;
pub mod error;
pub mod hook;
pub mod registry;

// Re-exports
pub use collection::HookCollection;
pub use compose::{compose, compose_chain};
pub use error::HookError;
pub use hook::{
    AfterFn, AfterHook, AsyncAfterHook, AsyncBeforeHook, AsyncErrorHook, AsyncOperation, BeforeFn,
    BeforeHook, ErrorFn, ErrorHook, Hook, HookKind, OpFn, Operation, SharedWrapHook, WrapFn,
    WrapHook,
};
pub use registry::{HookEntry, HookRegistry};
