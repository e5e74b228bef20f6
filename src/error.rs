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

//! Engine error types

use thiserror::Error;

/// Errors raised by the engine itself.
///
/// Failures produced by hooks or by the base operation are not represented
/// here: those travel through an invocation as `anyhow::Error` values and
/// reach the caller unchanged. A `HookError` is only ever the engine
/// rejecting an invocation or a kind string before any hook has run.
#[derive(Debug, Error)]
pub enum HookError {
    /// An invocation was given an empty list of hook names.
    #[error("cannot invoke with an empty name list")]
    EmptyNameList,

    /// An invocation was given a blank hook name.
    #[error("hook name must not be blank")]
    BlankName,

    /// A kind string did not name one of the four hook kinds.
    #[error("unknown hook kind: {0}")]
    UnknownKind(String),
}
