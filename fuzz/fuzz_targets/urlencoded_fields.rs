//! Urlencoded field parser fuzzer
//!
//! Parses arbitrary query strings. Accepted input must survive a trip
//! through `to_urlencoded` and through a recipient URL's query.

#![no_main]

use courier_proto::MessageFields;
use libfuzzer_sys::fuzz_target;
use url::Url;

fuzz_target!(|data: &[u8]| {
    let input = String::from_utf8_lossy(data);
    let Ok(fields) = MessageFields::from_urlencoded(&input) else {
        return;
    };

    let body = fields.to_urlencoded();
    assert_eq!(MessageFields::from_urlencoded(&body).expect("own encoding must parse"), fields);

    let base = Url::parse("https://op.example/server").expect("static URL");
    let url = fields.append_to_url(&base);
    assert_eq!(MessageFields::from_url_query(&url).expect("query must parse"), fields);
});
