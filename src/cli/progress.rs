//! Progress bars fed by engine progress events.

use crate::dns::{BulkProgress, BulkProgressCallback};
use crate::scanner::{ProgressCallback, ProgressEvent};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;

const TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}";

fn new_bar(total: u64, enabled: bool) -> ProgressBar {
    if !enabled {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(total);
    if let Ok(style) = ProgressStyle::default_bar().template(TEMPLATE) {
        bar.set_style(style.progress_chars("=>-"));
    }
    bar
}

/// A bar for a scan together with the callback that advances it.
pub fn scan_bar(total: usize, enabled: bool) -> (ProgressBar, ProgressCallback) {
    let bar = new_bar(total as u64, enabled);
    let handle = bar.clone();
    let callback: ProgressCallback = Arc::new(move |event: ProgressEvent| {
        handle.set_length(event.total as u64);
        handle.set_position(event.processed as u64);
        match event.batch {
            Some((batch, batches)) => {
                handle.set_message(format!("batch {}/{}, {} found", batch, batches, event.found))
            }
            None => handle.set_message(format!("{} found", event.found)),
        }
    });
    (bar, callback)
}

/// A bar for a bulk run together with the callback that advances it.
pub fn bulk_bar(total: usize, enabled: bool) -> (ProgressBar, BulkProgressCallback) {
    let bar = new_bar(total as u64, enabled);
    let handle = bar.clone();
    let callback: BulkProgressCallback = Arc::new(move |event: &BulkProgress| {
        handle.set_position(event.current as u64);
        let mark = if event.success { "ok" } else { "failed" };
        handle.set_message(format!("{} {}", event.domain, mark));
    });
    (bar, callback)
}
