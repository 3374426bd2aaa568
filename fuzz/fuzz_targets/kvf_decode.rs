//! Key-value form decoder fuzzer
//!
//! Arbitrary bytes must never panic the decoder. Whatever it accepts must
//! re-encode, and decoding that encoding must give the same fields back.

#![no_main]

use courier_proto::kvf;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(fields) = kvf::decode(data) else {
        return;
    };

    // Decoded keys never hold ':' or '\n' and values never hold '\n'.
    let encoded = kvf::encode(&fields).expect("decoded fields must re-encode");
    let again = kvf::decode(encoded.as_bytes()).expect("encoding must decode");
    assert_eq!(again, fields);
});
