#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum State {
    Normal,
    SingleQuoted,
    DoubleQuoted,
    Backticked,
    Bracketed,
    LineComment,
    BlockComment,
}

/// Tracks the keywords that decide whether a `;` ends the statement.
///
/// Inside `CREATE [TEMP|TEMPORARY] TRIGGER ... BEGIN ... END` only the `;` right
/// after the body's `END` terminates; an `END` closing a `CASE` does not count.
#[derive(Debug, Default)]
pub(super) struct KeywordTracker {
    words: usize,
    punctuation: bool,
    leading_create: bool,
    trigger: bool,
    in_body: bool,
    case_depth: usize,
    last_word_is_end: bool,
}

impl KeywordTracker {
    pub(super) fn word(&mut self, word: &str) {
        self.words += 1;
        match self.words {
            1 => self.leading_create = word.eq_ignore_ascii_case("CREATE"),
            2 | 3 if self.leading_create && word.eq_ignore_ascii_case("TRIGGER") => {
                self.trigger = true;
            }
            _ => {}
        }
        if self.trigger && word.eq_ignore_ascii_case("BEGIN") {
            self.in_body = true;
        }
        self.last_word_is_end = false;
        if word.eq_ignore_ascii_case("CASE") {
            self.case_depth += 1;
        } else if word.eq_ignore_ascii_case("END") {
            if self.case_depth > 0 {
                self.case_depth -= 1;
            } else {
                self.last_word_is_end = true;
            }
        }
    }

    /// Any non-word token breaks an `END ;` pair.
    pub(super) fn punctuation(&mut self) {
        self.punctuation = true;
        self.last_word_is_end = false;
    }

    pub(super) fn has_tokens(&self) -> bool {
        self.words > 0 || self.punctuation
    }

    pub(super) fn semicolon_terminates(&self) -> bool {
        !self.in_body || self.last_word_is_end
    }
}

pub(super) fn scan_word(bytes: &[u8], start: usize) -> usize {
    let mut idx = start;
    while idx < bytes.len() && is_word_byte(bytes[idx]) {
        idx += 1;
    }
    idx
}

pub(super) fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b >= 0x80
}
