//! Render queue construction.

use std::path::Path;
use tracing::debug;

use vproxy_models::{MediaItem, RenderJob};

/// Build the FIFO job list for `items`, in the given order.
///
/// Items that already have a proxy file on disk are skipped, so starting a
/// session again over the same selection queues nothing new.
pub fn select_jobs<'a, I>(items: I, proxies_dir: &Path) -> Vec<RenderJob>
where
    I: IntoIterator<Item = &'a MediaItem>,
{
    items
        .into_iter()
        .filter(|item| {
            if item.has_valid_proxy() {
                debug!("Skipping {}: proxy exists", item.name);
                return false;
            }
            true
        })
        .map(|item| RenderJob::for_item(item.clone(), proxies_dir))
        .collect()
}
