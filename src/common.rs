// Copyright 2019 Dmitry Tantsur <dtantsur@protonmail.com>
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Reusable JSON structures and protocol bits.

use serde::Serialize;

/// A reference to a resource by either its ID or name.
///
/// Serialized as `{"id": "..."}` or `{"name": "..."}`.
#[derive(Clone, Debug, Serialize, PartialEq, Eq, Hash)]
pub enum IdOrName {
    /// Resource ID.
    #[serde(rename = "id")]
    Id(String),
    /// Resource name.
    #[serde(rename = "name")]
    Name(String),
}

impl IdOrName {
    /// Create an ID.
    #[inline]
    pub fn from_id<T: Into<String>>(value: T) -> IdOrName {
        IdOrName::Id(value.into())
    }

    /// Create a name.
    #[inline]
    pub fn from_name<T: Into<String>>(value: T) -> IdOrName {
        IdOrName::Name(value.into())
    }
}
