//! Extended glob matching over slash-delimited paths.
//!
//! Pattern syntax:
//!
//! ```text
//! *           any sequence of non-separator characters
//! **          as a whole component: zero or more whole components
//! ?           any single non-separator character
//! [class]     one character from a class: [abc], [a-z], [^class]
//! {alt1,...}  any one of the alternatives; alternatives may nest
//! \c          the literal character c
//! ```
//!
//! Patterns are checked lazily: a malformed construct is only reported when
//! matching actually reaches it. Use [`validate`] to reject bad patterns up
//! front.

use crate::error::PatternError;

const SEPARATOR: char = '/';

/// Characters that end the literal prefix of a pattern.
const META_CHARS: &[char] = &['*', '?', '[', ']', '{', '}', '\\'];

/// Match a slash-delimited path against a glob pattern.
///
/// The whole path must match, not just a substring.
pub fn matches(pattern: &str, path: &str) -> Result<bool, PatternError> {
    let pattern_components = split_unescaped(pattern, SEPARATOR);
    let path_components: Vec<&str> = path.split(SEPARATOR).collect();
    match_components(pattern, &pattern_components, &path_components)
}

/// Returns true if any of the patterns matches the path.
///
/// The first pattern error short-circuits.
pub fn match_any<S: AsRef<str>>(path: &str, patterns: &[S]) -> Result<bool, PatternError> {
    for pattern in patterns {
        if matches(pattern.as_ref(), path)? {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Split a pattern at its first glob metacharacter.
///
/// The first half is the literal prefix and can be used to find a starting
/// directory without consulting the matcher.
pub fn split_pattern(pattern: &str) -> (&str, &str) {
    match pattern.find(META_CHARS) {
        Some(idx) => pattern.split_at(idx),
        None => (pattern, ""),
    }
}

/// Check a pattern's syntax without matching it against anything.
pub fn validate(pattern: &str) -> Result<(), PatternError> {
    for component in split_unescaped(pattern, SEPARATOR) {
        validate_component(pattern, component)?;
    }
    Ok(())
}

fn validate_component(pattern: &str, component: &str) -> Result<(), PatternError> {
    let mut rest = component;
    while let Some(c) = rest.chars().next() {
        rest = &rest[c.len_utf8()..];
        match c {
            '\\' => match rest.chars().next() {
                Some(escaped) => rest = &rest[escaped.len_utf8()..],
                None => return Err(PatternError::new(pattern, "trailing backslash")),
            },
            '[' => {
                let end = find_unescaped(rest, ']')
                    .ok_or_else(|| PatternError::new(pattern, "unterminated character class"))?;
                CharClass::parse(pattern, &rest[..end])?;
                rest = &rest[end + 1..];
            }
            '{' => {
                let end = find_closing_brace(rest)
                    .ok_or_else(|| PatternError::new(pattern, "unterminated alternative"))?;
                for option in split_alternatives(&rest[..end]) {
                    validate_component(pattern, option)?;
                }
                rest = &rest[end + 1..];
            }
            _ => {}
        }
    }
    Ok(())
}

fn match_components(
    pattern: &str,
    patterns: &[&str],
    names: &[&str],
) -> Result<bool, PatternError> {
    if patterns.is_empty() && names.is_empty() {
        return Ok(true);
    }
    if patterns.is_empty() || names.is_empty() {
        return Ok(false);
    }

    let (mut pat_idx, mut name_idx) = (0, 0);
    while pat_idx < patterns.len() && name_idx < names.len() {
        if patterns[pat_idx] == "**" {
            pat_idx += 1;
            if pat_idx >= patterns.len() {
                return Ok(true);
            }
            for start in name_idx..names.len() {
                if match_components(pattern, &patterns[pat_idx..], &names[start..])? {
                    return Ok(true);
                }
            }
            return Ok(false);
        }
        if !match_component(pattern, patterns[pat_idx], names[name_idx])? {
            return Ok(false);
        }
        pat_idx += 1;
        name_idx += 1;
    }

    Ok(pat_idx >= patterns.len() && name_idx >= names.len())
}

fn match_component(pattern: &str, component: &str, name: &str) -> Result<bool, PatternError> {
    let (mut pat, mut rest) = (component, name);
    while let Some(p) = pat.chars().next() {
        let next = rest.chars().next();
        match p {
            '*' => {
                pat = &pat[1..];
                if pat.is_empty() {
                    return Ok(true);
                }
                let splits = rest.char_indices().map(|(idx, _)| idx);
                for idx in splits.chain(std::iter::once(rest.len())) {
                    if match_component(pattern, pat, &rest[idx..])? {
                        return Ok(true);
                    }
                }
                return Ok(false);
            }
            '{' => {
                let body = &pat[1..];
                let end = find_closing_brace(body)
                    .ok_or_else(|| PatternError::new(pattern, "unterminated alternative"))?;
                let tail = &body[end + 1..];
                for option in split_alternatives(&body[..end]) {
                    let candidate = format!("{option}{tail}");
                    if match_component(pattern, &candidate, rest)? {
                        return Ok(true);
                    }
                }
                return Ok(false);
            }
            _ => {}
        }

        // Everything else consumes exactly one character of the name.
        let Some(n) = next else {
            return Ok(false);
        };
        match p {
            '\\' => {
                pat = &pat[1..];
                let escaped = pat
                    .chars()
                    .next()
                    .ok_or_else(|| PatternError::new(pattern, "trailing backslash"))?;
                if escaped != n {
                    return Ok(false);
                }
                pat = &pat[escaped.len_utf8()..];
            }
            '[' => {
                let body = &pat[1..];
                let end = find_unescaped(body, ']')
                    .ok_or_else(|| PatternError::new(pattern, "unterminated character class"))?;
                let class = CharClass::parse(pattern, &body[..end])?;
                if !class.contains(n) {
                    return Ok(false);
                }
                pat = &body[end + 1..];
            }
            '?' => pat = &pat[1..],
            _ if p == n => pat = &pat[p.len_utf8()..],
            _ => return Ok(false),
        }
        rest = &rest[n.len_utf8()..];
    }

    Ok(rest.is_empty())
}

/// A parsed `[...]` character class.
struct CharClass {
    negated: bool,
    ranges: Vec<(char, char)>,
}

impl CharClass {
    fn parse(pattern: &str, body: &str) -> Result<Self, PatternError> {
        let chars: Vec<char> = body.chars().collect();
        if chars.is_empty() {
            return Err(PatternError::new(pattern, "empty character class"));
        }

        let negated = chars[0] == '^';
        let mut idx = usize::from(negated);
        let mut ranges = Vec::new();
        while idx < chars.len() {
            let (low, next) = class_char(pattern, &chars, idx)?;
            idx = next;
            let mut high = low;
            if idx < chars.len() && chars[idx] == '-' {
                idx += 1;
                if idx >= chars.len() {
                    return Err(PatternError::new(pattern, "unterminated range"));
                }
                let (upper, next) = class_char(pattern, &chars, idx)?;
                idx = next;
                if upper < low {
                    return Err(PatternError::new(pattern, "reversed range"));
                }
                high = upper;
            }
            ranges.push((low, high));
        }

        Ok(Self { negated, ranges })
    }

    fn contains(&self, c: char) -> bool {
        let hit = self
            .ranges
            .iter()
            .any(|&(low, high)| low <= c && c <= high);
        hit != self.negated
    }
}

/// Read one (possibly escaped) class member starting at `idx`.
fn class_char(pattern: &str, chars: &[char], idx: usize) -> Result<(char, usize), PatternError> {
    match chars[idx] {
        '-' => Err(PatternError::new(pattern, "unescaped '-' in character class")),
        '\\' => match chars.get(idx + 1) {
            Some(&escaped) => Ok((escaped, idx + 2)),
            None => Err(PatternError::new(pattern, "trailing backslash")),
        },
        c => Ok((c, idx + 1)),
    }
}

/// Byte offset of the first occurrence of `needle` not preceded by a
/// backslash escape.
fn find_unescaped(s: &str, needle: char) -> Option<usize> {
    let mut escaped = false;
    for (idx, c) in s.char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == needle {
            return Some(idx);
        }
    }
    None
}

/// Byte offset of the `}` that closes an alternative whose opening `{` has
/// already been consumed. Nested alternatives are skipped over.
fn find_closing_brace(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut escaped = false;
    for (idx, c) in s.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '{' => depth += 1,
            '}' if depth == 0 => return Some(idx),
            '}' => depth -= 1,
            _ => {}
        }
    }
    None
}

/// Split an alternative body on its top-level commas.
fn split_alternatives(body: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let (mut depth, mut start) = (0usize, 0);
    let mut escaped = false;
    for (idx, c) in body.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&body[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    parts.push(&body[start..]);
    parts
}

/// Split on `separator`, leaving escaped separators in place.
fn split_unescaped(s: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut rest = s;
    while let Some(idx) = find_unescaped(rest, separator) {
        parts.push(&rest[..idx]);
        rest = &rest[idx + separator.len_utf8()..];
    }
    parts.push(rest);
    parts
}
