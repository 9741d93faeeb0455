//! Paginated collection fetch
//!
//! Every page request is submitted up front and paced by the collection
//! [`Throttle`]. Pages complete in any order; the fetch is done when the
//! number of resolved pages reaches the page count.

use super::{CollectionError, ItemEntry, metadata_file_name};
use crate::api::{CollectionApi, RemoteItem};
use core_logic::{RetryConfig, Throttle, with_retry};
use core_logic::{NetworkError, PROGRESS_TARGET};
use futures::stream::{FuturesUnordered, StreamExt};
use tracing::{debug, info};

/// Items requested per page
pub const PAGE_SIZE: u64 = 100;

/// Upper bound on the up-front item buffer
const MAX_PREALLOCATED_ITEMS: u64 = 10_000;

fn item_capacity(total: u64) -> usize {
    total.min(MAX_PREALLOCATED_ITEMS) as usize
}

/// Number of pages needed to cover `total` items
pub fn page_count(total: u64) -> u64 {
    total.div_ceil(PAGE_SIZE)
}

/// Fetches the item count of a collection.
///
/// A zero or unparsable count is [`CollectionError::NoItems`]; any other
/// failure (unknown collection, unreachable API) is [`CollectionError::Network`].
/// Both stop the run before any page is requested.
pub async fn count_items(
    api: &dyn CollectionApi,
    throttle: &Throttle,
    collection: &str,
) -> Result<u64, CollectionError> {
    let no_items = || CollectionError::NoItems {
        collection: collection.to_string(),
    };

    match throttle.call(|| api.collection_count(collection)).await {
        Ok(0) => Err(no_items()),
        Ok(total) => Ok(total),
        Err(e) => match e.downcast_ref::<NetworkError>() {
            Some(err @ NetworkError::InvalidResponse { .. }) => {
                debug!("Unparsable item count from {}", err.endpoint());
                Err(no_items())
            }
            _ => Err(CollectionError::Network(e)),
        },
    }
}

fn to_entries(items: Vec<RemoteItem>) -> impl Iterator<Item = ItemEntry> {
    items.into_iter().filter_map(|item| {
        let Some(owner) = item.owner else {
            debug!("Skipping {} without a single owner", item.identifier);
            return None;
        };
        let metadata_file_name = metadata_file_name(item.attributes.as_deref());
        Some(ItemEntry {
            owner,
            identifier: item.identifier,
            metadata_file_name,
        })
    })
}

/// Fetches all `total` items of `collection`, `PAGE_SIZE` at a time.
///
/// Each page is retried per `retry`; a page that still fails aborts the
/// whole fetch, so an incomplete snapshot is never produced.
pub async fn fetch_collection_items(
    api: &dyn CollectionApi,
    throttle: &Throttle,
    retry: &RetryConfig,
    collection: &str,
    total: u64,
) -> Result<Vec<ItemEntry>, CollectionError> {
    if total == 0 {
        return Err(CollectionError::NoItems {
            collection: collection.to_string(),
        });
    }

    let pages = page_count(total);
    let fetch_page = throttle.wrap(|from: u64| api.collection_page(collection, from, PAGE_SIZE));
    let fetch_page = &fetch_page;

    let mut pending: FuturesUnordered<_> = (0..pages)
        .map(|index| async move {
            let from = index * PAGE_SIZE;
            let label = format!("Fetching page {} of {}", index + 1, collection);
            let result = with_retry(retry.clone(), &label, || fetch_page.call(from)).await;
            (index, result)
        })
        .collect();

    let mut entries = Vec::with_capacity(item_capacity(total));
    let mut resolved = 0u64;

    while let Some((index, result)) = pending.next().await {
        let items = result.map_err(|e| CollectionError::PageFailed {
            collection: collection.to_string(),
            index,
            reason: format!("{:#}", e),
        })?;

        entries.extend(to_entries(items));
        resolved += 1;
        debug!("Page {} resolved ({}/{})", index, resolved, pages);

        if resolved == pages {
            break;
        }
    }

    info!(
        target: PROGRESS_TARGET,
        "Fetched {} items from {} pages of {}", entries.len(), resolved, collection
    );
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_count() {
        assert_eq!(page_count(0), 0);
        assert_eq!(page_count(1), 1);
        assert_eq!(page_count(100), 1);
        assert_eq!(page_count(101), 2);
        assert_eq!(page_count(1050), 11);
    }

    #[test]
    fn test_item_capacity_is_bounded() {
        assert_eq!(item_capacity(1050), 1050);
        assert_eq!(item_capacity(u64::MAX), 10_000);
    }
}
