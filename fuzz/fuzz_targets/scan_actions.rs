#![no_main]

use libfuzzer_sys::fuzz_target;
use wire::{count_actions, split_actions};

fuzz_target!(|data: &[u8]| {
    match (count_actions(data), split_actions(data)) {
        (Ok(count), Ok(records)) => {
            assert_eq!(count, records.len());
            // Accepted records partition the buffer with no gaps.
            let mut offset = 0;
            for raw in &records {
                assert_eq!(raw.offset, offset);
                assert_eq!(raw.data.len(), raw.header.declared_len());
                offset += raw.data.len();
            }
            assert_eq!(offset, data.len());
        }
        (Err(count_err), Err(split_err)) => assert_eq!(count_err, split_err),
        (count, split) => panic!("count {count:?} disagrees with split {split:?}"),
    }
});
