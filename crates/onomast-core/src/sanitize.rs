//! Free-text cleanup for model output.
//!
//! One pure function family, no I/O. Applying either function twice gives
//! the same result as applying it once.

use std::sync::LazyLock;

use regex::{NoExpand, Regex};

/// Narrative length cap used when none is configured.
pub const DEFAULT_NARRATIVE_CAP: usize = 500;

const ELLIPSIS: &str = "...";

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("static regex"));

// Ordered: double markers before single ones.
static EMPHASIS: LazyLock<[Regex; 4]> = LazyLock::new(|| {
    [
        Regex::new(r"\*\*(.+?)\*\*").expect("static regex"),
        Regex::new(r"__(.+?)__").expect("static regex"),
        Regex::new(r"\*(.+?)\*").expect("static regex"),
        Regex::new(r"_(.+?)_").expect("static regex"),
    ]
});

static UNSAFE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s.,;:!?()\-']").expect("static regex"));

/// Clean model text that talks about `name`.
///
/// Markdown emphasis is unwrapped, every occurrence of the name's words is
/// title-cased, double quotes become single quotes, characters outside
/// word characters and `. , ; : ! ? ( ) - '` are dropped and whitespace is
/// collapsed.
pub fn clean_text(text: &str, name: &str) -> String {
    let mut out = WHITESPACE.replace_all(text, " ").into_owned();

    loop {
        let before = out.len();
        for re in EMPHASIS.iter() {
            out = re.replace_all(&out, "$1").into_owned();
        }
        if out.len() == before {
            break;
        }
    }

    out = out.replace('"', "'");
    out = UNSAFE.replace_all(&out, "").into_owned();
    out = WHITESPACE.replace_all(&out, " ").into_owned();
    out = title_case_name(&out, name);
    out.trim().to_string()
}

/// [`clean_text`] plus a hard cap of `cap` characters, ending in `...` when cut.
pub fn clean_narrative(text: &str, name: &str, cap: usize) -> String {
    truncate_chars(&clean_text(text, name), cap)
}

fn truncate_chars(text: &str, cap: usize) -> String {
    if text.chars().count() <= cap {
        return text.to_string();
    }
    if cap <= ELLIPSIS.len() {
        return text.chars().take(cap).collect();
    }
    let mut cut: String = text.chars().take(cap - ELLIPSIS.len()).collect();
    cut.push_str(ELLIPSIS);
    cut
}

fn title_case_name(text: &str, name: &str) -> String {
    let mut out = text.to_string();
    for token in name.split_whitespace() {
        let Ok(re) = Regex::new(&format!(r"(?i)\b{}\b", regex::escape(token))) else {
            continue;
        };
        let titled = title_case(token);
        out = re.replace_all(&out, NoExpand(&titled)).into_owned();
    }
    out
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}
