use futures::stream::{self, StreamExt};
use std::future::Future;

/// Default number of concurrent per-interface collections on one host.
pub const INTERFACE_POOL_SIZE: usize = 5;

/// Default number of hosts contacted concurrently during fleet runs.
pub const HOST_POOL_SIZE: usize = 32;

/// Run `f` over `items` with at most `concurrency` futures in flight.
///
/// Results come back in completion order; callers sort afterwards.
pub async fn run_bounded<I, T, F, Fut>(items: I, concurrency: usize, f: F) -> Vec<T>
where
    I: IntoIterator,
    F: FnMut(I::Item) -> Fut,
    Fut: Future<Output = T>,
{
    stream::iter(items)
        .map(f)
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await
}
