//! Pulling the query out of a model answer wrapped in markdown fences

const FENCE: &str = "```";

/// Strip markdown code fencing from a model answer.
///
/// A ```` ```dax ```` block (tag matched case-insensitively) wins over any
/// other fenced block; without fences the trimmed text is returned.
pub fn extract_dax(text: &str) -> String {
    let fences: Vec<usize> = text.match_indices(FENCE).map(|(i, _)| i).collect();

    let dax_block = fences.iter().enumerate().find_map(|(n, &open)| {
        let body = strip_dax_tag(&text[open + FENCE.len()..])?;
        let start = text.len() - body.len();
        let close = *fences[n + 1..].iter().find(|&&close| close >= start)?;
        Some(&text[start..close])
    });
    if let Some(body) = dax_block {
        return body.trim().to_string();
    }

    match fences.get(..2) {
        Some([open, close]) => strip_language_tag(&text[open + FENCE.len()..*close])
            .trim()
            .to_string(),
        _ => text.trim().to_string(),
    }
}

/// Text following a `dax` info string
fn strip_dax_tag(after_fence: &str) -> Option<&str> {
    let tag = after_fence.get(..3)?;
    if !tag.eq_ignore_ascii_case("dax") {
        return None;
    }
    let rest = &after_fence[3..];
    match rest.chars().next() {
        None => Some(rest),
        Some(c) if c.is_whitespace() => Some(rest),
        Some(_) => None,
    }
}

/// Drop a lowercase info string such as `sql` from the first line
fn strip_language_tag(block: &str) -> &str {
    match block.split_once('\n') {
        Some((first, rest))
            if !first.trim().is_empty()
                && first.trim().chars().all(|c| {
                    c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_'
                }) =>
        {
            rest
        }
        _ => block,
    }
}
