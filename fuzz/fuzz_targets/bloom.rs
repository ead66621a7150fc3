#![no_main]

use libfuzzer_sys::fuzz_target;
use seen_sketch::BloomFilter;
use wyhash::wyhash;

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }

    let size = wyhash(data, 0) % 4096 + 1;
    let num_hashes = (wyhash(data, 1) % 8 + 1) as u32;
    let mut filter = BloomFilter::new(size, num_hashes).unwrap();

    let chunks: Vec<&[u8]> = data.chunks(4).collect();
    for (i, chunk) in chunks.iter().enumerate() {
        filter.add(chunk);
        assert!(filter.bits_used() <= filter.size());
        assert!(chunks[..=i].iter().all(|seen| filter.contains(seen)));
    }

    let before = filter.clone();
    for chunk in &chunks {
        filter.add(chunk);
    }
    assert_eq!(filter, before);
});
