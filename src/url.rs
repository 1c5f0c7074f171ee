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

//! Handy primitives for working with URLs.

use reqwest::Url;

use super::{Error, ErrorKind};

fn not_a_base(url: &Url) -> Error {
    Error::new(
        ErrorKind::InvalidInput,
        format!("URL {} cannot be used as a base", url),
    )
}

/// Ensure the URL can have path segments appended.
#[inline]
pub fn check_base(url: &Url) -> Result<(), Error> {
    if url.cannot_be_a_base() {
        Err(not_a_base(url))
    } else {
        Ok(())
    }
}

#[inline]
#[allow(unused_results)]
pub fn extend<I>(mut url: Url, segments: I) -> Result<Url, Error>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    check_base(&url)?;
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    Ok(url)
}

/// Append a slash-separated path to the URL.
#[inline]
pub fn extend_path(url: Url, path: &str) -> Result<Url, Error> {
    extend(url, path.split('/').filter(|x| !x.is_empty()))
}
