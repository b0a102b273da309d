//! Integration tests for toast expiry
//!
//! All tests run on a paused clock and advance it explicitly.

use std::time::Duration;
use toasts::{NewToast, ToastKind, ToastProvider};

/// Macro for verbose test output
macro_rules! verbose_println {
    ($($arg:tt)*) => {
        if std::env::var("TEST_VERBOSE").is_ok() {
            println!($($arg)*);
        }
    };
}

async fn advance_ms(ms: u64) {
    tokio::time::advance(Duration::from_millis(ms)).await;
    tokio::task::yield_now().await;
    tokio::task::yield_now().await;
}

#[tokio::test(start_paused = true)]
async fn test_saved_toast_expires_at_default_duration() {
    let provider = ToastProvider::current();
    let queue = provider.queue();

    let id = queue.add_toast(NewToast::new(ToastKind::Success, "Saved"));
    verbose_println!("Enqueued toast {}", id);

    advance_ms(4999).await;
    assert!(queue.get(&id).is_some(), "toast removed too early");

    advance_ms(1).await;
    assert!(queue.get(&id).is_none(), "toast should expire at 5000ms");
    assert_eq!(queue.pending_timers(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_convenience_default_durations() {
    let provider = ToastProvider::current();
    let queue = provider.queue();

    let cases = [
        (queue.success("x", None), 5000u64),
        (queue.info("x", None), 5000),
        (queue.warning("x", None, None), 6000),
        (queue.error("x", None, None), 7000),
    ];

    for (id, expected) in &cases {
        let toast = queue.get(id).expect("toast present");
        assert_eq!(toast.duration_ms(), *expected);
    }

    let mut elapsed = 0u64;
    for checkpoint in [4999u64, 5000, 5999, 6000, 6999, 7000] {
        advance_ms(checkpoint - elapsed).await;
        elapsed = checkpoint;

        for (id, expected) in &cases {
            let present = queue.get(id).is_some();
            verbose_println!("t={}ms id={} expected={} present={}", elapsed, id, expected, present);
            assert_eq!(
                present,
                elapsed < *expected,
                "toast with duration {} at t={}",
                expected,
                elapsed
            );
        }
    }

    assert!(queue.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_early_remove_prevents_double_expiry() {
    let provider = ToastProvider::current();
    let queue = provider.queue();

    let first = queue.add_toast(NewToast::new(ToastKind::Info, "first").duration_ms(1000));
    let second = queue.add_toast(NewToast::new(ToastKind::Info, "second").duration_ms(3000));

    advance_ms(400).await;
    queue.remove_toast(&first);
    assert!(queue.get(&first).is_none());
    assert_eq!(queue.pending_timers(), 1);

    // Removing again and letting the original deadline pass must be harmless
    queue.remove_toast(&first);
    advance_ms(2000).await;

    assert_eq!(queue.len(), 1);
    assert!(queue.get(&second).is_some());

    advance_ms(600).await;
    assert!(queue.is_empty());
    assert_eq!(queue.pending_timers(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_collection_keeps_insertion_order() {
    let provider = ToastProvider::current();
    let queue = provider.queue();

    queue.info("one", None);
    queue.warning("two", Some("details".to_string()), None);
    queue.error("three", None, None);

    let titles: Vec<String> = queue.toasts().iter().map(|t| t.title().to_string()).collect();
    assert_eq!(titles, vec!["one", "two", "three"]);
}

#[test]
fn test_enqueue_from_plain_thread() {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_time()
        .build()
        .unwrap();

    let provider = ToastProvider::new(runtime.handle().clone());
    let queue = provider.queue();

    let worker_queue = queue.clone();
    let id = std::thread::spawn(move || {
        worker_queue.add_toast(NewToast::new(ToastKind::Info, "from thread").duration_ms(20))
    })
    .join()
    .unwrap();

    assert!(queue.get(&id).is_some());

    let deadline = std::time::Instant::now() + Duration::from_secs(2);
    while queue.get(&id).is_some() && std::time::Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(5));
    }
    assert!(queue.get(&id).is_none(), "toast should expire on the runtime");
}
