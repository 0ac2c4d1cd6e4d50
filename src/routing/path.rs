//! Path composition.
//!
//! Every downstream pattern and every upstream URL the gateway builds goes
//! through [`join`], so the junction rules here apply to all routes.

/// Join two path fragments with exactly one `/` between them.
///
/// - Slashes at the junction collapse to a single separator.
/// - A missing separator is inserted.
/// - An empty side is the identity: `join("", "/x") == "/x"`.
///
/// Works on plain paths as well as absolute URLs
/// (`join("http://host:80/", "/v1") == "http://host:80/v1"`).
pub fn join(base: &str, suffix: &str) -> String {
    if base.is_empty() {
        return suffix.to_string();
    }
    if suffix.is_empty() {
        return base.to_string();
    }

    let head = base.trim_end_matches('/');
    let tail = suffix.trim_start_matches('/');

    let mut joined = String::with_capacity(head.len() + tail.len() + 1);
    joined.push_str(head);
    joined.push('/');
    joined.push_str(tail);
    joined
}
