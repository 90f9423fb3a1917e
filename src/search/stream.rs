//! Streaming fetcher over a scroll cursor
//!
//! One producer task walks the cursor and feeds hits into a bounded channel.
//! A pool of worker tasks applies the transform and forwards results to a
//! collector. All tasks live in one [`JoinSet`]: the first failure aborts the
//! rest, and dropping the returned future aborts everything as well.

use super::transform::Transform;
use crate::backend::{Backend, Hit, ScrollRequest};
use crate::error::{Error, Result};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, Mutex};
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, info, warn};

/// Fetch every hit matching `request` and transform it on `workers` tasks
///
/// Output order is not guaranteed to follow cursor order.
pub async fn fetch_all<T>(
    backend: Arc<dyn Backend>,
    request: ScrollRequest,
    transform: Arc<dyn Transform<T>>,
    workers: usize,
) -> Result<Vec<T>>
where
    T: Send + 'static,
{
    let start = Instant::now();
    let workers = workers.max(1);
    let capacity = request.size.max(1);

    let (hit_tx, hit_rx) = mpsc::channel::<Hit>(capacity);
    let hit_rx = Arc::new(Mutex::new(hit_rx));
    let (doc_tx, mut doc_rx) = mpsc::channel::<T>(capacity);

    let mut tasks = JoinSet::new();
    tasks.spawn(produce(backend, request, hit_tx));
    for worker in 0..workers {
        tasks.spawn(consume(
            worker,
            Arc::clone(&hit_rx),
            doc_tx.clone(),
            Arc::clone(&transform),
        ));
    }
    drop(doc_tx);

    let mut docs = Vec::new();
    loop {
        tokio::select! {
            Some(doc) = doc_rx.recv() => docs.push(doc),
            Some(joined) = tasks.join_next() => {
                if let Err(e) = flatten(joined) {
                    warn!("Stream aborted after {} docs: {}", docs.len(), e);
                    tasks.abort_all();
                    return Err(e);
                }
            }
            else => break,
        }
    }

    info!(
        "Streamed {} docs with {} workers in {:?}",
        docs.len(),
        workers,
        start.elapsed()
    );
    Ok(docs)
}

fn flatten(joined: std::result::Result<Result<()>, JoinError>) -> Result<()> {
    match joined {
        Ok(result) => result,
        Err(e) => Err(Error::Worker(e.to_string())),
    }
}

/// Walk the cursor until an empty page
async fn produce(
    backend: Arc<dyn Backend>,
    request: ScrollRequest,
    hits: mpsc::Sender<Hit>,
) -> Result<()> {
    let mut page = backend
        .scroll_start(&request)
        .await
        .map_err(|e| Error::backend("scroll", e))?;
    let mut pages = 1usize;

    loop {
        if page.is_exhausted() {
            debug!("{} cursor exhausted after {} pages", backend.name(), pages);
            return Ok(());
        }
        for hit in page.hits {
            if hits.send(hit).await.is_err() {
                // every worker is gone, nothing left to feed
                return Ok(());
            }
        }
        let Some(scroll_id) = page.scroll_id else {
            return Ok(());
        };
        page = backend
            .scroll_next(&scroll_id, &request.keep_alive)
            .await
            .map_err(|e| Error::backend("scroll", e))?;
        pages += 1;
    }
}

async fn consume<T>(
    worker: usize,
    hits: Arc<Mutex<mpsc::Receiver<Hit>>>,
    docs: mpsc::Sender<T>,
    transform: Arc<dyn Transform<T>>,
) -> Result<()>
where
    T: Send + 'static,
{
    let mut handled = 0usize;
    loop {
        let next = hits.lock().await.recv().await;
        let Some(hit) = next else {
            debug!("Stream worker {} done after {} hits", worker, handled);
            return Ok(());
        };
        let doc = transform.transform(&hit).map_err(Error::Transform)?;
        if docs.send(doc).await.is_err() {
            return Ok(());
        }
        handled += 1;
    }
}
