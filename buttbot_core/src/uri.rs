// Absolute URI detection and link escaping.
//
// URIs are never mutated (mangling a link is not funny, just broken), and in
// the final output every URI token is wrapped in `<...>` so chat clients do
// not unfurl a preview for it.
//
// `is_absolute_uri` asks the `url` crate whether the token parses as an
// absolute URL, not whether it "looks like a web link": `mailto:x@y.z` and
// even `note:` qualify, `www.example.com` does not. Tokens carrying anything
// outside printable ASCII are rejected before parsing, since `Url::parse`
// would otherwise trim whitespace and accept internationalized hosts.

use url::Url;

/// Whether `token` is a syntactically valid absolute URI.
pub fn is_absolute_uri(token: &str) -> bool {
    !token.is_empty() && token.bytes().all(|b| b.is_ascii_graphic()) && Url::parse(token).is_ok()
}

/// Wrap every URI token of a single-space-separated line in angle brackets.
pub fn escape_links(line: &str) -> String {
    line.split(' ')
        .map(|token| {
            if is_absolute_uri(token) {
                format!("<{token}>")
            } else {
                token.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
