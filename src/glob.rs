//! Glob-style patterns as used by `KEYS`, `SCAN ... MATCH` and `PSUBSCRIBE`.
//!
//! Supported syntax:
//!
//! * `*` matches any sequence of characters, including the empty one.
//! * `?` matches exactly one character.
//! * `[abc]`, `[a-z]` match one character of the class, `[^abc]` negates the class.
//! * `\x` matches `x` literally.
//!
//! Patterns are anchored: the whole input has to match. Unlike path globs, `*` also matches `/`.

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Literal(char),
    AnyOne,
    AnyMany,
    Class { negated: bool, items: Vec<ClassItem> },
}

#[derive(Debug, Clone, PartialEq)]
enum ClassItem {
    Char(char),
    Range(char, char),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
    source: String,
    tokens: Vec<Token>,
}

impl Pattern {
    pub fn new(pattern: &str) -> Pattern {
        let mut tokens = vec![];
        let mut chars = pattern.chars().peekable();

        while let Some(c) = chars.next() {
            let token = match c {
                '*' => {
                    // Consecutive stars are equivalent to a single one.
                    while chars.peek() == Some(&'*') {
                        chars.next();
                    }
                    Token::AnyMany
                }
                '?' => Token::AnyOne,
                '\\' => Token::Literal(chars.next().unwrap_or('\\')),
                '[' => {
                    let negated = chars.peek() == Some(&'^');
                    if negated {
                        chars.next();
                    }

                    let mut items = vec![];
                    loop {
                        match chars.next() {
                            // An unterminated class consumes the rest of the pattern.
                            None | Some(']') => break,
                            Some('\\') => {
                                if let Some(escaped) = chars.next() {
                                    items.push(ClassItem::Char(escaped));
                                }
                            }
                            Some(start) => {
                                let mut lookahead = chars.clone();
                                match (lookahead.next(), lookahead.next()) {
                                    (Some('-'), Some(end)) if end != ']' => {
                                        chars.next();
                                        chars.next();
                                        let (lo, hi) = if start <= end {
                                            (start, end)
                                        } else {
                                            (end, start)
                                        };
                                        items.push(ClassItem::Range(lo, hi));
                                    }
                                    _ => items.push(ClassItem::Char(start)),
                                }
                            }
                        }
                    }

                    Token::Class { negated, items }
                }
                c => Token::Literal(c),
            };
            tokens.push(token);
        }

        Pattern {
            source: pattern.to_string(),
            tokens,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether the pattern matches the whole `input`.
    pub fn matches(&self, input: &str) -> bool {
        let input: Vec<char> = input.chars().collect();
        matches_tokens(&self.tokens, &input)
    }
}

impl From<&str> for Pattern {
    fn from(pattern: &str) -> Self {
        Pattern::new(pattern)
    }
}

/// One-shot helper for callers that don't keep the compiled pattern around.
pub fn glob_match(pattern: &str, input: &str) -> bool {
    Pattern::new(pattern).matches(input)
}

fn matches_tokens(tokens: &[Token], input: &[char]) -> bool {
    // Iterative matcher with single-star backtracking: on mismatch we resume right after the last
    // `*`, letting it swallow one more character.
    let (mut t, mut i) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while i < input.len() {
        match tokens.get(t) {
            Some(Token::AnyMany) => {
                backtrack = Some((t, i));
                t += 1;
                continue;
            }
            Some(token) if token_matches(token, input[i]) => {
                t += 1;
                i += 1;
                continue;
            }
            _ => {}
        }

        match backtrack {
            Some((star, consumed)) => {
                t = star + 1;
                i = consumed + 1;
                backtrack = Some((star, consumed + 1));
            }
            None => return false,
        }
    }

    tokens[t..].iter().all(|token| *token == Token::AnyMany)
}

fn token_matches(token: &Token, c: char) -> bool {
    match token {
        Token::Literal(l) => *l == c,
        Token::AnyOne => true,
        Token::AnyMany => true,
        Token::Class { negated, items } => {
            let found = items.iter().any(|item| match item {
                ClassItem::Char(x) => *x == c,
                ClassItem::Range(lo, hi) => *lo <= c && c <= *hi,
            });
            found != *negated
        }
    }
}
