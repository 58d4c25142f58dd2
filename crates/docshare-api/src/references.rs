//! Rewriting of `((blockId "text"))` block references into share links.

use std::collections::HashMap;
use std::sync::LazyLock;

use docshare_types::BlockReference;
use regex::{Captures, Regex};

/// Preview text longer than this many characters is cut and suffixed with `...`.
const PREVIEW_CHARS: usize = 30;

const PLACEHOLDER: &str = "[引用]";
const LINK_PLACEHOLDER: &str = "引用";

static BLOCK_REF_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\(\(([0-9]{14,}-[0-9a-z]{7,})(?:\s+["']([^"']+)["'])?\)\)"#).unwrap()
});

/// Parse the stored reference list. Empty, blank or malformed input yields
/// `None` so the caller serves the content untouched.
pub fn parse_references(raw: Option<&str>) -> Option<Vec<BlockReference>> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    serde_json::from_str::<Vec<BlockReference>>(raw)
        .ok()
        .filter(|refs| !refs.is_empty())
}

/// Replace every block reference in `content`.
///
/// `find_block_share` maps a block id to the id of the owner's share of that
/// block, if one exists. It is only consulted for ids present in `refs`.
pub fn rewrite_block_references<F>(
    content: &str,
    refs: &[BlockReference],
    base_url: &str,
    mut find_block_share: F,
) -> String
where
    F: FnMut(&str) -> Option<String>,
{
    let index: HashMap<&str, &BlockReference> =
        refs.iter().map(|r| (r.block_id.as_str(), r)).collect();

    BLOCK_REF_REGEX
        .replace_all(content, |caps: &Captures| {
            let block_id = &caps[1];
            let display_text = caps.get(2).map_or("", |m| m.as_str());

            let Some(reference) = index.get(block_id) else {
                return non_empty(display_text).unwrap_or(PLACEHOLDER).to_string();
            };

            let Some(block_share_id) = find_block_share(block_id) else {
                return match non_empty(display_text) {
                    Some(text) => text.to_string(),
                    None => preview(&reference.content).unwrap_or_else(|| PLACEHOLDER.to_string()),
                };
            };

            let text = non_empty(display_text)
                .map(str::to_string)
                .or_else(|| {
                    reference
                        .display_text
                        .as_deref()
                        .and_then(non_empty)
                        .map(str::to_string)
                })
                .or_else(|| preview(&reference.content))
                .unwrap_or_else(|| LINK_PLACEHOLDER.to_string());

            format!("[{}]({}/s/{})", text, base_url, block_share_id)
        })
        .into_owned()
}

fn non_empty(s: &str) -> Option<&str> {
    (!s.is_empty()).then_some(s)
}

/// First [`PREVIEW_CHARS`] characters of `content`, with `...` when cut.
/// Cuts on character boundaries, never inside a code point.
fn preview(content: &str) -> Option<String> {
    if content.is_empty() {
        return None;
    }
    match content.char_indices().nth(PREVIEW_CHARS) {
        Some((cut, _)) => Some(format!("{}...", &content[..cut])),
        None => Some(content.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLOCK: &str = "20240101010101-abcdefg";
    const BASE: &str = "https://share.example";

    fn reference(content: &str, display_text: Option<&str>) -> BlockReference {
        BlockReference {
            block_id: BLOCK.to_string(),
            content: content.to_string(),
            display_text: display_text.map(str::to_string),
            ref_count: None,
        }
    }

    fn shared(_: &str) -> Option<String> {
        Some("sb".to_string())
    }

    fn unshared(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn links_to_block_share_using_content_preview() {
        let refs = [reference("hello world body", Some(""))];
        let out = rewrite_block_references(&format!("see (({BLOCK}))."), &refs, BASE, shared);
        assert_eq!(out, "see [hello world body](https://share.example/s/sb).");
    }

    #[test]
    fn inline_text_when_block_not_shared() {
        let refs = [reference("hello world body", None)];
        let out = rewrite_block_references(&format!("(({BLOCK}))"), &refs, BASE, unshared);
        assert_eq!(out, "hello world body");
    }

    #[test]
    fn quoted_text_takes_precedence() {
        let refs = [reference("body", Some("stored"))];
        let double = format!(r#"(({BLOCK} "quoted"))"#);
        let single = format!("(({BLOCK} 'quoted'))");
        assert_eq!(
            rewrite_block_references(&double, &refs, BASE, shared),
            "[quoted](https://share.example/s/sb)"
        );
        assert_eq!(rewrite_block_references(&single, &refs, BASE, unshared), "quoted");
    }

    #[test]
    fn stored_display_text_beats_preview() {
        let refs = [reference("body", Some("stored"))];
        let out = rewrite_block_references(&format!("(({BLOCK}))"), &refs, BASE, shared);
        assert_eq!(out, "[stored](https://share.example/s/sb)");
    }

    #[test]
    fn unknown_block_uses_placeholder() {
        let refs = [reference("body", None)];
        let other = "20240202020202-zzzzzzz";
        let out = rewrite_block_references(
            &format!("a (({other})) b (({other} \"named\"))"),
            &refs,
            BASE,
            |_| panic!("lookup must not run for unknown blocks"),
        );
        assert_eq!(out, "a [引用] b named");
    }

    #[test]
    fn empty_reference_content_falls_back() {
        let refs = [reference("", None)];
        let token = format!("(({BLOCK}))");
        assert_eq!(rewrite_block_references(&token, &refs, BASE, unshared), "[引用]");
        assert_eq!(
            rewrite_block_references(&token, &refs, BASE, shared),
            "[引用](https://share.example/s/sb)"
        );
    }

    #[test]
    fn long_preview_is_cut_at_thirty_chars() {
        let long = "abcdefghijklmnopqrstuvwxyz0123456789";
        let refs = [reference(long, None)];
        let out = rewrite_block_references(&format!("(({BLOCK}))"), &refs, BASE, unshared);
        assert_eq!(out, "abcdefghijklmnopqrstuvwxyz0123...");
    }

    #[test]
    fn preview_never_splits_multibyte_chars() {
        let text = "引".repeat(31);
        assert_eq!(preview(&text), Some(format!("{}...", "引".repeat(30))));
        assert_eq!(preview(&"引".repeat(30)), Some("引".repeat(30)));
    }

    #[test]
    fn non_matching_tokens_are_left_alone() {
        let refs = [reference("body", None)];
        let content = "((short-id)) and ((2024-abc)) and plain text";
        assert_eq!(rewrite_block_references(content, &refs, BASE, shared), content);
    }

    #[test]
    fn parse_rejects_corrupt_or_empty_lists() {
        assert!(parse_references(None).is_none());
        assert!(parse_references(Some("")).is_none());
        assert!(parse_references(Some("[]")).is_none());
        assert!(parse_references(Some("{not json")).is_none());
        let parsed = parse_references(Some(r#"[{"blockId":"20240101010101-abcdefg","content":"x"}]"#));
        assert_eq!(parsed.map(|r| r.len()), Some(1));
    }
}
