use super::*;

#[test]
fn pending_until_resolved() {
    let (promise, mut future) = tile_channel();
    assert!(!future.is_ready());
    assert!(future.try_get().is_none());
    assert!(!future.is_ready());

    promise.resolve(Ok(TileOutput::Empty));
    assert!(future.is_ready());
    assert!(matches!(future.try_get(), Some(Ok(TileOutput::Empty))));
    assert!(future.try_get().is_none());
}

#[test]
fn dropped_promise_resolves_with_error() {
    let (promise, future) = tile_channel();
    drop(promise);
    assert!(matches!(future.wait(), Err(TilefieldError::Render(_))));
}

#[test]
fn resolved_future_is_immediately_ready() {
    let mut f = TileFuture::resolved(Err(TilefieldError::QueueFull(3)));
    assert!(f.is_ready());
    assert!(matches!(f.try_get(), Some(Err(TilefieldError::QueueFull(3)))));
}

#[test]
fn wait_timeout_reports_pending_then_value() {
    let (promise, mut future) = tile_channel();
    assert!(future.wait_timeout(Duration::from_millis(5)).is_none());

    let t = std::thread::spawn(move || promise.resolve(Ok(TileOutput::Empty)));
    let got = future.wait_timeout(Duration::from_secs(5));
    t.join().unwrap();
    assert!(matches!(got, Some(Ok(TileOutput::Empty))));
    assert!(future.wait_timeout(Duration::from_millis(1)).is_none());
}

#[test]
fn promise_outlives_dropped_future() {
    let (promise, future) = tile_channel();
    drop(future);
    promise.resolve(Ok(TileOutput::Empty));
}
