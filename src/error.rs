//
// Copyright (C) 2022 CUAVA, The University of Sydney
//
// Licensed under the Apache License, Version 2.0 (the "License")
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Domain-level errors.
//!
//! Only configuration-time failures (duplicate id, unknown reference,
//! malformed table, capacity exceeded) are returned as `Result`s. Runtime
//! faults are surfaced as channel values and flags, never as an error
//! return — see `actuation` and `function` for that path.

use failure::Fail;

#[derive(Debug, Fail, Clone, Copy, PartialEq, Eq)]
pub enum PmuError {
    #[fail(display = "duplicate channel id {}", _0)]
    DuplicateChannelId(u16),
    #[fail(display = "channel id {} out of range", _0)]
    ChannelIdOutOfRange(u16),
    #[fail(display = "channel {} not found", _0)]
    ChannelNotFound(u16),
    #[fail(display = "function table is full")]
    FunctionTableFull,
    #[fail(display = "function id {} out of range", _0)]
    FunctionIdOutOfRange(u8),
    #[fail(display = "duplicate function id {}", _0)]
    DuplicateFunctionId(u8),
    #[fail(display = "malformed table: axis not monotonically increasing")]
    NonMonotonicAxis,
    #[fail(display = "output descriptor references unknown channel {}", _0)]
    UnknownChannelReference(u16),
    #[fail(display = "output descriptor has no merged pins")]
    NoMergedPins,
    #[fail(display = "output descriptor has too many merged pins")]
    TooManyMergedPins,
    #[fail(display = "capacity exceeded")]
    CapacityExceeded,
    #[fail(display = "event queue full")]
    EventQueueFull,
    #[fail(display = "malformed channel table blob")]
    MalformedConfigBlob,
}

pub type PmuResult<T> = Result<T, PmuError>;

/// Rejection reasons for `ChannelStore::set_value`, per §4.1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelWriteError {
    NotOutput,
    Disabled,
    NotFound,
}
