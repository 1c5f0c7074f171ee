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

//! A stream of resources.

use std::fmt::Debug;

use async_stream::try_stream;
use futures::pin_mut;
use futures::stream::{Stream, TryStreamExt};
use log::trace;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::client::AuthenticatedClient;
use super::request::{self, RequestDescriptor};
use super::Error;

/// A single resource.
///
/// Implement it for resources that are returned by collections supporting `limit` and `marker`
/// query parameters. The ID of the last resource on a page serves as a marker for the next one.
pub trait PaginatedResource {
    /// Type of an ID.
    type Id: Debug + Serialize + Send;

    /// Root type of the listing.
    type Root: DeserializeOwned + Send;

    /// Retrieve a copy of the ID.
    fn resource_id(&self) -> Self::Id;
}

#[derive(Serialize)]
struct Query<T: Serialize + Send> {
    #[serde(skip_serializing_if = "Option::is_none")]
    limit: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    marker: Option<T>,
}

#[derive(Debug)]
struct Pager {
    client: AuthenticatedClient,
    request: RequestDescriptor,
}

impl Pager {
    fn next_request<Q: Serialize>(&self, query: &Q) -> Result<RequestDescriptor, Error> {
        let mut url = self.request.url().clone();
        let existing: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(k, _)| k != "limit" && k != "marker")
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        url.set_query(None);
        if !existing.is_empty() {
            let _ = url.query_pairs_mut().extend_pairs(existing);
        }
        self.request.clone().with_url(url).with_query(query)
    }

    async fn fetch_next<Q, T>(&self, query: Q) -> Result<T, Error>
    where
        Q: Serialize + Send,
        T: DeserializeOwned + Send,
    {
        let request = self.next_request(&query)?;
        trace!("Fetching the next page from {}", request.url());
        request::to_json(self.client.execute_unchecked(&request).await?).await
    }
}

fn chunks<T>(
    pager: Pager,
    limit: Option<usize>,
    starting_with: Option<T::Id>,
) -> impl Stream<Item = Result<Vec<T>, Error>>
where
    T: PaginatedResource + Unpin,
    T::Root: Into<Vec<T>>,
{
    let mut marker = starting_with;

    try_stream! {
        loop {
            let result: T::Root = pager.fetch_next(Query { limit, marker: marker.take() }).await?;
            let items = result.into();
            if let Some(new_m) = items.last() {
                marker = Some(new_m.resource_id());
                yield items;
            } else {
                break
            }
        }
    }
}

/// Creates a paginated resource stream.
pub(crate) fn paginated<T>(
    client: AuthenticatedClient,
    request: RequestDescriptor,
    limit: Option<usize>,
    starting_with: Option<T::Id>,
) -> impl Stream<Item = Result<T, Error>>
where
    T: PaginatedResource + Unpin,
    T::Root: Into<Vec<T>>,
{
    try_stream! {
        let iter = chunks(Pager { client, request }, limit, starting_with);
        pin_mut!(iter);
        while let Some(chunk) = iter.try_next().await? {
            for item in chunk {
                yield item;
            }
        }
    }
}
