#![no_main]

use codec::{pack_actions, release_all, unpack_actions, ExperimenterRegistry};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut registry = ExperimenterRegistry::new();
    gmpls::register(&mut registry).unwrap();

    match unpack_actions(data, Some(&registry)) {
        Ok(actions) => {
            // Decoding canonicalizes pad bytes, so re-encoding and decoding
            // again must be a fixed point even when the input was not.
            let bytes = pack_actions(&actions, Some(&registry)).unwrap();
            assert_eq!(wire::count_actions(&bytes).unwrap(), actions.len());
            let second = unpack_actions(&bytes, Some(&registry)).unwrap();
            assert_eq!(second, actions);
            release_all(second, Some(&registry));
            release_all(actions, Some(&registry));
        }
        Err(err) => {
            // Failures must stay inside the closed protocol error set.
            if let Some(code) = err.error_code() {
                let (class, code) = code.to_pair();
                assert_eq!(class, 2);
                assert!(code <= 3);
            }
        }
    }
});
