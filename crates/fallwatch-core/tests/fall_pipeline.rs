mod common;

use common::{machine, still};
use fallwatch_core::{
    extract, FallReading, FallStatus, RawSample, Window, ACTIVITY_THRESHOLD, BUFFER_SIZE,
    FEATURE_COUNT,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_sample(rng: &mut StdRng) -> RawSample {
    RawSample::new(
        [rng.gen_range(-2.0..2.0), rng.gen_range(-2.0..2.0), rng.gen_range(-2.0..2.0)],
        [rng.gen_range(-5.0..5.0), rng.gen_range(-5.0..5.0), rng.gen_range(-5.0..5.0)],
    )
}

#[test]
fn warm_up_is_waiting_with_zero_probability() {
    let (mut m, classifier, _) = machine(&[(true, 0.99)]);
    for _ in 0..BUFFER_SIZE - 1 {
        assert_eq!(m.on_sample(still()), FallReading::new(FallStatus::Waiting, 0.0));
    }
    assert_eq!(classifier.calls(), 0);
}

#[test]
fn zero_window_classified_once_with_zero_features() {
    let (mut m, classifier, _) = machine(&[]);
    let zero = RawSample::default();
    for i in 1..=BUFFER_SIZE {
        let r = m.on_sample(zero);
        if i < BUFFER_SIZE {
            assert_eq!(r.status, FallStatus::Waiting);
        } else {
            assert_eq!(r.status, FallStatus::Safe);
        }
    }
    let seen = classifier.seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].as_slice(), &[0.0; FEATURE_COUNT][..]);
}

#[test]
fn classification_uses_most_recent_window_after_eviction() {
    let mut rng = StdRng::seed_from_u64(7);
    let (mut m, classifier, _) = machine(&[]);
    let extra = 137;
    let samples: Vec<RawSample> =
        (0..BUFFER_SIZE + extra).map(|_| random_sample(&mut rng)).collect();
    for s in &samples {
        m.on_sample(*s);
    }
    assert_eq!(m.buffered(), BUFFER_SIZE);
    let seen = classifier.seen.lock().unwrap();
    assert_eq!(seen.len(), extra + 1);
    let expected = extract(&Window::from_rows(&samples[extra..]));
    assert_eq!(*seen.last().unwrap(), expected);
    // first evaluation saw exactly the first full window
    assert_eq!(seen[0], extract(&Window::from_rows(&samples[..BUFFER_SIZE])));
}

#[test]
fn extraction_is_deterministic_and_side_effect_free() {
    let mut rng = StdRng::seed_from_u64(42);
    let (mut m, _, _) = machine(&[(true, 0.8)]);
    let rows: Vec<RawSample> = (0..BUFFER_SIZE).map(|_| random_sample(&mut rng)).collect();
    for s in &rows {
        m.on_sample(*s);
    }
    let stamped = m.last_fall_at();
    let w = Window::from_rows(&rows);
    let a = extract(&w);
    let b = extract(&w);
    assert_eq!(a, b);
    assert_eq!(m.last_fall_at(), stamped);
    assert_eq!(m.buffered(), BUFFER_SIZE);
}

#[test]
fn fall_is_held_for_thirty_seconds_without_movement() {
    let (mut m, _, clock) = machine(&[(true, 0.91)]);
    for _ in 0..BUFFER_SIZE - 1 {
        m.on_sample(still());
    }
    let r = m.on_sample(still());
    assert_eq!(r, FallReading::new(FallStatus::Fall, 0.91));

    for t in [1.0, 10.0, 20.0, 29.0, 29.99] {
        clock.set(t);
        // classifier now says no fall and the window is calm
        assert_eq!(m.on_sample(still()), FallReading::new(FallStatus::Fall, 0.0), "t={}", t);
    }
    clock.set(30.0);
    assert_eq!(m.on_sample(still()), FallReading::new(FallStatus::Safe, 0.0));
    clock.set(45.0);
    assert_eq!(m.on_sample(still()).status, FallStatus::Safe);
}

#[test]
fn movement_at_ten_seconds_recovers_and_clears_hold() {
    let (mut m, _, clock) = machine(&[(true, 0.9)]);
    for _ in 0..BUFFER_SIZE {
        m.on_sample(still());
    }
    assert!(m.last_fall_at().is_some());

    clock.set(5.0);
    assert_eq!(m.on_sample(still()).status, FallStatus::Fall);

    clock.set(10.0);
    // one strong jolt among 399 unit-magnitude rows: std ~0.45
    let jolt = RawSample::new([0.0, 0.0, 10.0], [1.0, 1.0, 1.0]);
    assert_eq!(m.on_sample(jolt), FallReading::new(FallStatus::Recovered, 0.0));
    assert_eq!(m.last_fall_at(), None);

    clock.set(11.0);
    assert_eq!(m.on_sample(still()), FallReading::new(FallStatus::Safe, 0.0));
}

#[test]
fn small_movement_does_not_recover() {
    let (mut m, _, clock) = machine(&[(true, 0.9)]);
    for _ in 0..BUFFER_SIZE {
        m.on_sample(still());
    }
    clock.set(3.0);
    // |1.5 - 1| * sqrt(399) / 400 ~ 0.025, below the threshold
    let nudge = RawSample::new([0.0, 0.0, 1.5], [0.0; 3]);
    let window_std = 0.5 * (399.0f64).sqrt() / 400.0;
    assert!(window_std < ACTIVITY_THRESHOLD);
    assert_eq!(m.on_sample(nudge).status, FallStatus::Fall);
    assert!(m.last_fall_at().is_some());
}
