use std::collections::BTreeMap;

pub const MAX_HEADING_LEVEL: usize = 4;

/// Contiguous run of text owned by one heading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section<'a> {
    /// Section text, heading line included
    pub text: &'a str,
    /// Character offset of the section start
    pub start: usize,
    /// Heading path active for this section, keyed `header_1`..`header_4`
    pub headers: BTreeMap<String, String>,
}

/// Split Markdown-ish text at `#`..`####` headings.
///
/// Text before the first heading becomes a section with an empty header
/// path. Headings inside fenced code blocks are ignored. Concatenating the
/// returned sections yields the input unchanged.
pub fn sections(text: &str) -> Vec<Section<'_>> {
    let mut out = Vec::new();
    let mut headers: BTreeMap<String, String> = BTreeMap::new();
    let mut section_byte = 0usize;
    let mut section_char = 0usize;
    let mut byte_pos = 0usize;
    let mut char_pos = 0usize;
    let mut in_fence = false;

    for line in text.split_inclusive('\n') {
        if is_fence(line) {
            in_fence = !in_fence;
        } else if !in_fence {
            if let Some((level, title)) = heading(line) {
                if byte_pos > section_byte {
                    out.push(Section {
                        text: &text[section_byte..byte_pos],
                        start: section_char,
                        headers: headers.clone(),
                    });
                }
                for deeper in level..=MAX_HEADING_LEVEL {
                    headers.remove(&header_key(deeper));
                }
                headers.insert(header_key(level), title.to_string());
                section_byte = byte_pos;
                section_char = char_pos;
            }
        }
        byte_pos += line.len();
        char_pos += line.chars().count();
    }

    if byte_pos > section_byte {
        out.push(Section {
            text: &text[section_byte..],
            start: section_char,
            headers,
        });
    }
    out
}

#[must_use]
pub fn header_key(level: usize) -> String {
    format!("header_{level}")
}

fn is_fence(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with("```") || trimmed.starts_with("~~~")
}

/// Returns the heading level and title when `line` is a level 1-4 heading.
fn heading(line: &str) -> Option<(usize, &str)> {
    let level = line.bytes().take_while(|b| *b == b'#').count();
    if level == 0 || level > MAX_HEADING_LEVEL {
        return None;
    }
    let rest = &line[level..];
    if !rest.starts_with([' ', '\t']) {
        return None;
    }
    let title = rest.trim().trim_end_matches('#').trim_end();
    if title.is_empty() {
        return None;
    }
    Some((level, title))
}
