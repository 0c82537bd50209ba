//! Featured tag rotation.

use std::sync::Arc;

use geomancy_storefront::cycler::{TagCycler, TagListener};
use tokio::sync::mpsc;

/// Print `count` featured tags at the cycler's pace.
#[allow(clippy::print_stdout)]
pub async fn cycle(count: usize) {
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let listener: TagListener = Arc::new(move |tag: &str| {
        let _ = tx.send(tag.to_string());
    });

    let handle = TagCycler::default().start(listener);
    for _ in 0..count {
        let Some(tag) = rx.recv().await else { break };
        println!("{tag}");
    }
    handle.cancel();
}
