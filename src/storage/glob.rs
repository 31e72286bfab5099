//! Redis-style glob matching
//!
//! Supports `*`, `?`, `[abc]`, `[a-z]`, `[^abc]` and `\` escapes, over raw
//! bytes.

#[derive(Debug, Clone)]
enum GlobToken {
    Literal(u8),
    Any,
    Single,
    /// Inclusive byte ranges, negated when the flag is set
    Class(Vec<(u8, u8)>, bool),
}

/// Compiled once, matched against many keys
#[derive(Debug, Clone)]
pub struct GlobPattern {
    tokens: Vec<GlobToken>,
}

impl GlobPattern {
    pub fn compile(pattern: &str) -> Self {
        let bytes = pattern.as_bytes();
        let mut tokens = Vec::with_capacity(bytes.len());
        let mut i = 0;

        while i < bytes.len() {
            match bytes[i] {
                b'*' => {
                    // Runs of stars match the same as one
                    if !matches!(tokens.last(), Some(GlobToken::Any)) {
                        tokens.push(GlobToken::Any);
                    }
                    i += 1;
                }
                b'?' => {
                    tokens.push(GlobToken::Single);
                    i += 1;
                }
                b'[' => {
                    i += 1;
                    let negated = bytes.get(i) == Some(&b'^');
                    if negated {
                        i += 1;
                    }
                    let mut ranges = Vec::new();
                    while i < bytes.len() && bytes[i] != b']' {
                        let mut start = bytes[i];
                        if start == b'\\' && i + 1 < bytes.len() {
                            i += 1;
                            start = bytes[i];
                        }
                        if bytes.get(i + 1) == Some(&b'-') && i + 2 < bytes.len() && bytes[i + 2] != b']' {
                            let end = bytes[i + 2];
                            ranges.push((start.min(end), start.max(end)));
                            i += 3;
                        } else {
                            ranges.push((start, start));
                            i += 1;
                        }
                    }
                    // Skip the closing bracket; an unclosed class runs to the end
                    i += 1;
                    tokens.push(GlobToken::Class(ranges, negated));
                }
                b'\\' if i + 1 < bytes.len() => {
                    tokens.push(GlobToken::Literal(bytes[i + 1]));
                    i += 2;
                }
                c => {
                    tokens.push(GlobToken::Literal(c));
                    i += 1;
                }
            }
        }

        Self { tokens }
    }

    /// Only the most recent `*` is ever revisited, so the worst case is
    /// key length times pattern length.
    pub fn matches(&self, s: &[u8]) -> bool {
        let tokens = &self.tokens;
        let (mut t, mut i) = (0, 0);
        // Token after the last star, and the input offset it resumes from
        let mut resume: Option<(usize, usize)> = None;

        while i < s.len() {
            match tokens.get(t) {
                Some(GlobToken::Any) => {
                    t += 1;
                    resume = Some((t, i));
                    continue;
                }
                Some(token) if token.accepts(s[i]) => {
                    t += 1;
                    i += 1;
                    continue;
                }
                _ => {}
            }
            // Let the last star swallow one more byte
            let Some((star_t, star_i)) = resume else {
                return false;
            };
            resume = Some((star_t, star_i + 1));
            t = star_t;
            i = star_i + 1;
        }

        tokens[t..].iter().all(|token| matches!(token, GlobToken::Any))
    }
}

impl GlobToken {
    fn accepts(&self, c: u8) -> bool {
        match self {
            GlobToken::Literal(l) => *l == c,
            GlobToken::Any | GlobToken::Single => true,
            GlobToken::Class(ranges, negated) => {
                ranges.iter().any(|&(lo, hi)| c >= lo && c <= hi) != *negated
            }
        }
    }
}
