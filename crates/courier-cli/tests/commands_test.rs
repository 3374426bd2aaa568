//! Output of the CLI commands, captured into buffers.

use courier_cli::{decode_kvf, encode, size};
use insta::assert_snapshot;
use url::Url;

fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
    items.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect()
}

fn output(run: impl FnOnce(&mut Vec<u8>)) -> String {
    let mut out = Vec::new();
    run(&mut out);
    String::from_utf8(out).unwrap()
}

fn recipient() -> Url {
    Url::parse("https://op.example/server").unwrap()
}

#[test]
fn encode_small_message_as_redirect() {
    let text = output(|out| {
        encode(out, &recipient(), None, pairs(&[("mode", "checkid_setup"), ("realm", "https://rp.example/")]))
            .unwrap();
    });

    assert_snapshot!(text, @r"
route: redirect (wire size 45, threshold 2048)
status: 302
Location: https://op.example/server?mode=checkid_setup&realm=https%3A%2F%2Frp.example%2F
Cache-Control: no-cache, no-store
");
}

#[test]
fn encode_above_threshold_prints_the_form() {
    let text = output(|out| {
        encode(out, &recipient(), Some(10), pairs(&[("mode", "checkid_setup")])).unwrap();
    });

    assert_snapshot!(text, @r#"
route: form post (wire size 19, threshold 10)
status: 200
Content-Type: text/html; charset=utf-8
Cache-Control: no-cache, no-store
Pragma: no-cache

<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8" />
<title>Please wait while you are redirected</title>
</head>
<body onload="document.getElementById('courier_submit').disabled = true; document.getElementById('courier_form').submit();">
<form id="courier_form" action="https://op.example/server" method="post" enctype="application/x-www-form-urlencoded" onsubmit="document.getElementById('courier_submit').disabled = true;">
	<input type="hidden" name="mode" value="checkid_setup" />
	<noscript><p>Scripts are disabled. Press the button to continue.</p></noscript>
	<input id="courier_submit" type="submit" value="Continue" />
</form>
</body>
</html>
"#);
}

#[test]
fn decode_kvf_prints_urlencoded_fields() {
    let text = output(|out| {
        decode_kvf(out, b"mode:id_res\nclaimed_id:https://me.example/\n").unwrap();
    });

    assert_eq!(text, "mode=id_res&claimed_id=https%3A%2F%2Fme.example%2F\n");
}

#[test]
fn decode_kvf_reports_bad_lines() {
    let err = decode_kvf(&mut Vec::new(), b"mode:id_res\nbroken\n").unwrap_err();
    assert!(err.to_string().contains('2'));
}

#[test]
fn size_counts_two_bytes_per_pair() {
    let text = output(|out| size(out, pairs(&[("mode", "id_res"), ("ns", "")])).unwrap());
    assert_eq!(text, "16\n");
}
