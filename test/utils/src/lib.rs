#![deny(clippy::implicit_return)]
#![allow(clippy::needless_return)]

/// Builds a single `data:` line the way `streamGenerateContent?alt=sse`
/// delivers one chunk of model output.
pub fn sse_chunk(text: &str) -> String {
    let escaped = text
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n");

    return format!(
        r#"data: {{"candidates": [{{"content": {{"parts": [{{"text": "{escaped}"}}], "role": "model"}}, "index": 0}}]}}"#
    );
}

/// A complete SSE response body streaming the given fragments, including the
/// blank separator lines the API emits between events.
pub fn sse_body(fragments: &[&str]) -> String {
    return fragments
        .iter()
        .map(|fragment| {
            return format!("{}\r\n\r\n", sse_chunk(fragment));
        })
        .collect::<Vec<String>>()
        .join("");
}

pub fn multiline_reply_fixture() -> &'static str {
    return r#"
Sure! Here are a few ideas for the weekend:

- Take a long walk somewhere you have never been before.
- Cook something new.

Have fun!
"#
    .trim();
}
