use super::*;

#[test]
fn never_fired_is_immediately_due() {
    let interval = StartInterval::new(60);
    assert!(interval.is_due(0));
}

#[test]
fn is_due_respects_period() {
    let mut interval = StartInterval::new(60);
    interval.record_fire(1_000);
    assert!(!interval.is_due(1_000 + 59_000));
    assert!(interval.is_due(1_000 + 60_000));
}
