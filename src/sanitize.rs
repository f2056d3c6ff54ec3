//! Cleanup of raw model output
//!
//! Models wrap answers in fences, quotes, list markers and "Result:" style
//! lead-ins despite being told not to. [`sanitize`] removes those artifacts
//! in a fixed order; each step assumes the previous ones already ran.

use std::sync::OnceLock;

use regex::Regex;

struct Rules {
    code_fence: Regex,
    commit_prefix: Regex,
    boilerplate: Regex,
    list_marker: Regex,
    blank_lines: Regex,
    html_tag: Regex,
    word_prefix: Regex,
}

fn rules() -> &'static Rules {
    static RULES: OnceLock<Rules> = OnceLock::new();
    RULES.get_or_init(|| Rules {
        code_fence: Regex::new(r"```[A-Za-z0-9_+\-]*").expect("fence pattern"),
        commit_prefix: Regex::new(
            r"(?i)^(?:feat|fix|docs|style|refactor|perf|test|chore)(?:\([^)]*\))?!?:\s*",
        )
        .expect("commit pattern"),
        boilerplate: Regex::new(concat!(
            r"(?i)^(?:here is the rewritten text|here's the rewritten text|rewritten text|",
            r"converted text|result|output|answer|",
            r"转换结果|改写结果|改写后|改写|结果|输出|",
            r"変換結果|書き換え|結果|出力|",
            r"umgeschriebener text|ergebnis|ausgabe|",
            r"texto reescrito|resultado|salida)\s*[:：]\s*"
        ))
        .expect("boilerplate pattern"),
        list_marker: Regex::new(r"(?m)^[ \t]*(?:(?:\d+[.)]|[-*•])[ \t]+|\d+[、．][ \t]*)")
            .expect("list pattern"),
        blank_lines: Regex::new(r"\n[ \t]*\n(?:[ \t]*\n)*").expect("blank line pattern"),
        html_tag: Regex::new(r"</?[A-Za-z][^>]*>").expect("html pattern"),
        word_prefix: Regex::new(r"^\p{L}{1,20}[ \t]*(?::[ \t]+|：[ \t]*)").expect("prefix pattern"),
    })
}

const QUOTE_PAIRS: &[(char, char)] = &[
    ('"', '"'),
    ('\'', '\''),
    ('“', '”'),
    ('‘', '’'),
    ('「', '」'),
    ('『', '』'),
    ('«', '»'),
    ('„', '“'),
];

/// Strips response artifacts and returns the clean text
///
/// The pipeline is repeated until it no longer changes the text, since the
/// late steps (tags, word prefixes) can expose quotes or markers the early
/// steps handle. Every step only removes characters, so this terminates.
pub fn sanitize(raw: &str) -> String {
    let mut text = raw.replace("\r\n", "\n");
    loop {
        let next = sanitize_pass(&text);
        if next == text {
            return next;
        }
        text = next;
    }
}

fn sanitize_pass(input: &str) -> String {
    let r = rules();
    let mut text = input.trim().to_string();

    text = r.code_fence.replace_all(&text, "").trim().to_string();
    text = r.commit_prefix.replace(&text, "").trim().to_string();
    text = r.boilerplate.replace(&text, "").trim().to_string();
    text = r.list_marker.replace_all(&text, "").trim().to_string();
    text = strip_wrapping_quotes(&text).trim().to_string();
    text = r.blank_lines.replace_all(&text, "\n").trim().to_string();
    text = r.html_tag.replace_all(&text, "").trim().to_string();

    if let Some(m) = r.word_prefix.find(&text) {
        let rest = text[m.end()..].trim();
        if !rest.is_empty() {
            text = rest.to_string();
        }
    }

    text
}

/// Removes one pair of quotes enclosing the whole text
///
/// Text like `"a" and "b"` is left alone because the inner part still
/// contains the quote characters.
fn strip_wrapping_quotes(text: &str) -> &str {
    for &(open, close) in QUOTE_PAIRS {
        if let Some(inner) = text
            .strip_prefix(open)
            .and_then(|rest| rest.strip_suffix(close))
        {
            if !inner.contains(open) && !inner.contains(close) {
                return inner;
            }
        }
    }
    text
}
