use super::*;

type Log = Arc<Mutex<Vec<(u32, Instant)>>>;

const INTERVAL: Duration = Duration::from_millis(1_000);

fn recording_throttler() -> (Throttler<u32, u32>, Log) {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&log);
    let throttler = Throttler::new(INTERVAL, move |n: u32| {
        let sink = Arc::clone(&sink);
        async move {
            sink.lock().push((n, Instant::now()));
            n * 10
        }
    });
    (throttler, log)
}

#[tokio::test(start_paused = true)]
async fn trailing_execution_uses_latest_arguments() {
    let (throttler, log) = recording_throttler();
    let start = Instant::now();

    assert_eq!(throttler.submit("card:u1", 1).await, 10);

    tokio::time::advance(INTERVAL.mul_f64(0.3)).await;
    let second = throttler.submit("card:u1", 2);
    tokio::pin!(second);
    assert!(futures::poll!(&mut second).is_pending());
    assert!(throttler.is_queued("card:u1"));

    tokio::time::advance(INTERVAL.mul_f64(0.3)).await;
    let third = throttler.submit("card:u1", 3);
    tokio::pin!(third);
    assert!(futures::poll!(&mut third).is_pending());

    let (a, b) = tokio::join!(second, third);
    assert_eq!((a, b), (30, 30));

    let log = log.lock().clone();
    assert_eq!(log.len(), 2);
    assert_eq!(log[0], (1, start));
    assert_eq!(log[1].0, 3);
    assert_eq!(log[1].1 - start, INTERVAL);
    assert!(!throttler.is_queued("card:u1"));
}

#[tokio::test(start_paused = true)]
async fn executes_immediately_once_interval_elapsed() {
    let (throttler, log) = recording_throttler();
    throttler.submit("k", 1).await;
    tokio::time::advance(INTERVAL).await;
    assert_eq!(throttler.submit("k", 2).await, 20);
    assert_eq!(log.lock().len(), 2);
    assert!(!throttler.is_queued("k"));
}

#[tokio::test(start_paused = true)]
async fn keys_are_independent() {
    let (throttler, log) = recording_throttler();
    assert_eq!(throttler.submit("a", 1).await, 10);
    assert_eq!(throttler.submit("b", 2).await, 20);
    assert_eq!(log.lock().len(), 2);
    assert_eq!(throttler.key_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn run_now_bypasses_state() {
    let (throttler, log) = recording_throttler();
    let start = Instant::now();
    throttler.submit("k", 1).await;
    assert_eq!(throttler.run_now(7).await, 70);
    assert!(!throttler.is_queued("k"));
    let log = log.lock().clone();
    assert_eq!(log, vec![(1, start), (7, start)]);
}

#[tokio::test(start_paused = true)]
async fn trailing_fires_even_when_callers_drop() {
    let (throttler, log) = recording_throttler();
    throttler.submit("k", 1).await;
    {
        let queued = throttler.submit("k", 2);
        tokio::pin!(queued);
        assert!(futures::poll!(&mut queued).is_pending());
    }
    tokio::time::sleep(INTERVAL * 2).await;
    let values: Vec<u32> = log.lock().iter().map(|(n, _)| *n).collect();
    assert_eq!(values, vec![1, 2]);
}
