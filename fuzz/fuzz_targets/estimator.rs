#![no_main]

use libfuzzer_sys::fuzz_target;
use seen_sketch::CardinalityEstimator;
use wyhash::wyhash;

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }

    let split_index = wyhash(data, 0) as usize % data.len();
    let (first_half, second_half) = data.split_at(split_index);

    let mut estimator1: CardinalityEstimator = CardinalityEstimator::with_precision(8).unwrap();
    for chunk in first_half.chunks(4) {
        estimator1.add(chunk);
        assert!(estimator1.estimate() > 0.0);
        assert!(estimator1.size_of() > 0);
    }

    let mut estimator2: CardinalityEstimator = CardinalityEstimator::with_precision(8).unwrap();
    for chunk in second_half.chunks(4) {
        estimator2.add(chunk);
        assert!(estimator2.estimate() > 0.0);
    }

    // re-adding never moves the estimate
    let estimate = estimator2.estimate();
    for chunk in second_half.chunks(4) {
        estimator2.add(chunk);
    }
    assert_eq!(estimator2.estimate(), estimate);

    let before = estimator1.registers().to_vec();
    estimator1.merge(&estimator2).unwrap();
    for ((merged, lhs), rhs) in estimator1
        .registers()
        .iter()
        .zip(&before)
        .zip(estimator2.registers())
    {
        assert_eq!(*merged, (*lhs).max(*rhs));
    }
});
