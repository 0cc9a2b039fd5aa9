//! Exhaustive backtracking matcher for an email-shaped pattern.
//!
//! The matcher recognises the same language as
//!
//! ```text
//! ^(\w+([-.]\w+)*){min,max}@\w+([-.]\w+)*\.\w+([-.]\w+)*$
//! ```
//!
//! but instead of stopping at the first successful parse it enumerates every
//! way the input can be split into local-part groups. The number of splits
//! grows exponentially with the length of the local part, which is what makes
//! `/slow` expensive. The cost for a fixed input is fixed, so the handler
//! always terminates.

/// Pattern used by `/slow`: three to eighteen local-part groups.
pub const SLOW_PATTERN: EmailPattern = EmailPattern::new(3, 18);

/// Fixed adversarial sample evaluated by `/slow`.
///
/// The 15-byte local part admits 16 369 group splits and the domain has four
/// candidate positions for the mandatory `.`, giving 65 476 parses.
pub const SLOW_SAMPLE: &str = "rosamariachoc70@gmail.comnnbbb.bbNG.bbb.n";

/// Repetition bounds of the local-part group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmailPattern {
    min_groups: usize,
    max_groups: usize,
}

impl EmailPattern {
    /// Create a pattern requiring between `min_groups` and `max_groups`
    /// local-part groups (inclusive).
    pub const fn new(min_groups: usize, max_groups: usize) -> Self {
        Self {
            min_groups,
            max_groups,
        }
    }

    /// Returns `true` if `input` matches the pattern.
    ///
    /// Always explores the full parse space; see [`EmailPattern::parses`].
    pub fn is_match(&self, input: &str) -> bool {
        self.parses(input) > 0
    }

    /// Count every distinct way `input` matches the pattern.
    pub fn parses(&self, input: &str) -> u64 {
        if self.max_groups == 0 || self.min_groups > self.max_groups {
            return 0;
        }
        self.local_groups(input.as_bytes(), 0, 0)
    }

    /// Count parses where a new local-part group starts at `start` and `done`
    /// groups have already been matched.
    fn local_groups(&self, s: &[u8], start: usize, done: usize) -> u64 {
        if start >= s.len() || !is_word(s[start]) {
            return 0;
        }

        let groups = done + 1;
        let mut total = 0;
        let mut end = start;
        while end < s.len() {
            if is_word(s[end]) {
                end += 1;
            } else if is_separator(s[end]) && end + 1 < s.len() && is_word(s[end + 1]) {
                end += 2;
            } else {
                break;
            }

            // s[start..end] is a complete group ending in a word byte.
            if groups >= self.min_groups && s.get(end) == Some(&b'@') {
                total += domain_parses(&s[end + 1..]);
            }
            if groups < self.max_groups {
                total += self.local_groups(s, end, groups);
            }
        }
        total
    }
}

/// Count parses of `\w+([-.]\w+)*\.\w+([-.]\w+)*$`.
///
/// A valid domain is a run of word segments joined by single separators; each
/// `.` separator is a distinct choice for the mandatory dot.
fn domain_parses(d: &[u8]) -> u64 {
    let mut dots = 0;
    let mut after_word = false;
    for &b in d {
        if is_word(b) {
            after_word = true;
        } else if is_separator(b) && after_word {
            if b == b'.' {
                dots += 1;
            }
            after_word = false;
        } else {
            return 0;
        }
    }
    if after_word {
        dots
    } else {
        0
    }
}

fn is_word(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn is_separator(b: u8) -> bool {
    b == b'-' || b == b'.'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_matches_with_known_parse_count() {
        assert!(SLOW_PATTERN.is_match(SLOW_SAMPLE));
        assert_eq!(SLOW_PATTERN.parses(SLOW_SAMPLE), 65_476);
    }

    #[test]
    fn minimal_local_part_has_one_split() {
        assert_eq!(SLOW_PATTERN.parses("abc@x.y"), 1);
    }

    #[test]
    fn splits_are_counted_exhaustively() {
        // "abcd" into 3 groups: 3 ways, into 4 groups: 1 way.
        assert_eq!(SLOW_PATTERN.parses("abcd@x.y"), 4);
        // Two dots in the domain double the count.
        assert_eq!(SLOW_PATTERN.parses("abcd@x.y.z"), 8);
    }

    #[test]
    fn separators_bind_inside_a_group() {
        // "a.b.c" can only ever be a single group, so three groups are impossible.
        assert_eq!(SLOW_PATTERN.parses("a.b.c@x.y"), 0);
        // "ab.cd" + "e" + "f" style splits are fine.
        assert!(SLOW_PATTERN.is_match("ab.cdef@x.y"));
    }

    #[test]
    fn rejects_inputs_outside_the_language() {
        assert!(!SLOW_PATTERN.is_match("abc@localhost"));
        assert!(!SLOW_PATTERN.is_match("ab@x.y"));
        assert!(!SLOW_PATTERN.is_match("abc@x.y."));
        assert!(!SLOW_PATTERN.is_match("abc@x..y"));
        assert!(!SLOW_PATTERN.is_match("abc@x.y?"));
        assert!(!SLOW_PATTERN.is_match(".abc@x.y"));
        assert!(!SLOW_PATTERN.is_match(""));
    }

    #[test]
    fn max_groups_caps_the_split() {
        let narrow = EmailPattern::new(3, 3);
        // "abcd" into exactly 3 groups.
        assert_eq!(narrow.parses("abcd@x.y"), 3);
        assert_eq!(EmailPattern::new(4, 3).parses("abcd@x.y"), 0);
    }
}
