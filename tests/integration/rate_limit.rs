use std::time::Duration;

use sketchboard::rate_limit::{CursorLimiter, MutingLimiter, TokenBucket};

// --- TokenBucket ---

#[test]
fn test_bucket_allows_burst_then_rejects() {
    let mut bucket = TokenBucket::new(20.0, 5.0);
    for _ in 0..5 {
        assert!(bucket.try_consume(1.0));
    }
    assert!(!bucket.try_consume(1.0));
}

#[test]
fn test_bucket_refills_over_time() {
    let mut bucket = TokenBucket::new(20.0, 5.0);
    while bucket.try_consume(1.0) {}

    // 20 tokens/sec: 120ms buys roughly 2.4 tokens.
    std::thread::sleep(Duration::from_millis(120));
    assert!(bucket.try_consume(1.0));
    assert!(bucket.try_consume(1.0));
}

#[test]
fn test_bucket_caps_at_burst() {
    let mut bucket = TokenBucket::new(1000.0, 3.0);
    std::thread::sleep(Duration::from_millis(50));
    // Even after ample refill time, only `burst` tokens are available.
    assert!(bucket.try_consume(3.0));
    assert!(bucket.available() < 1.0);
    assert!(!bucket.try_consume(1.0));
}

// --- MutingLimiter ---

#[test]
fn test_mute_after_consecutive_violations() {
    let mut limiter = MutingLimiter::new(20.0, 2.0);
    assert!(limiter.try_consume(1.0));
    assert!(limiter.try_consume(1.0));
    assert!(!limiter.is_muted());

    // Three consecutive rejections trip the mute.
    assert!(!limiter.try_consume(1.0));
    assert!(!limiter.try_consume(1.0));
    assert!(!limiter.try_consume(1.0));
    assert!(limiter.is_muted());

    // While muted, even a refilled bucket is not consulted.
    std::thread::sleep(Duration::from_millis(120));
    assert!(!limiter.try_consume(1.0));
}

#[test]
fn test_successful_consume_resets_violations() {
    let mut limiter = MutingLimiter::new(50.0, 1.0);
    assert!(limiter.try_consume(1.0));

    // Two violations, then a refill lets one through; the violation count
    // starts over instead of accumulating toward a mute.
    assert!(!limiter.try_consume(1.0));
    assert!(!limiter.try_consume(1.0));
    std::thread::sleep(Duration::from_millis(40));
    assert!(limiter.try_consume(1.0));
    assert!(!limiter.is_muted());

    assert!(!limiter.try_consume(1.0));
    assert!(!limiter.is_muted());
}

// --- CursorLimiter ---

#[test]
fn test_users_have_independent_buckets() {
    let limiter = CursorLimiter::new(20.0, 5.0);

    for _ in 0..5 {
        assert!(limiter.check("room-1", "alice"));
    }
    assert!(!limiter.check("room-1", "alice"));

    // Bob's bucket is untouched by alice draining hers.
    assert!(limiter.check("room-1", "bob"));
    // Same user in a different room is a separate bucket too.
    assert!(limiter.check("room-2", "alice"));
}

#[test]
fn test_remove_drops_bucket_state() {
    let limiter = CursorLimiter::new(20.0, 5.0);

    for _ in 0..5 {
        limiter.check("room-1", "alice");
    }
    assert!(!limiter.check("room-1", "alice"));
    assert_eq!(limiter.tracked_users(), 1);

    limiter.remove("room-1", "alice");
    assert_eq!(limiter.tracked_users(), 0);

    // A fresh bucket after reconnect starts full.
    assert!(limiter.check("room-1", "alice"));
}
