//! Finds the leading statement of a SQL string and the tail after it.
//!
//! `rusqlite` prepares one statement at a time and keeps the native tail to
//! itself, so the driver walks the string with this lightweight lexer instead.
//! It skips quoted strings and identifiers, comments and trigger bodies; it does
//! not parse SQL.

mod parsers;
mod scanner;

use parsers::{
    is_block_comment_end, is_block_comment_start, is_escaped_quote, is_line_comment_start,
};
use scanner::{KeywordTracker, State, is_word_byte, scan_word};

/// The leading statement of a SQL string and everything after its terminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Split<'a> {
    pub statement: &'a str,
    pub tail: &'a str,
}

/// Split off the first statement of `sql`.
///
/// Fragments holding only whitespace, comments or stray `;` are skipped. Returns
/// `None` when nothing but such fragments remain.
pub(crate) fn split_leading_statement(sql: &str) -> Option<Split<'_>> {
    let mut start = 0;
    loop {
        let (terminator, tracker) = scan(sql, start);
        let (end, next) = match terminator {
            Some(semicolon) => (semicolon, semicolon + 1),
            None => (sql.len(), sql.len()),
        };
        if tracker.has_tokens() {
            return Some(Split {
                statement: sql[start..end].trim(),
                tail: &sql[next..],
            });
        }
        if next >= sql.len() {
            return None;
        }
        start = next;
    }
}

/// Scan from `start` to the terminating `;`, if any, noting the tokens seen on the way.
fn scan(sql: &str, start: usize) -> (Option<usize>, KeywordTracker) {
    let bytes = sql.as_bytes();
    let mut tracker = KeywordTracker::default();
    let mut state = State::Normal;
    let mut idx = start;

    while idx < bytes.len() {
        let b = bytes[idx];
        match state {
            State::Normal => match b {
                b';' if tracker.semicolon_terminates() => return (Some(idx), tracker),
                b'\'' => {
                    tracker.punctuation();
                    state = State::SingleQuoted;
                }
                b'"' => {
                    tracker.punctuation();
                    state = State::DoubleQuoted;
                }
                b'`' => {
                    tracker.punctuation();
                    state = State::Backticked;
                }
                b'[' => {
                    tracker.punctuation();
                    state = State::Bracketed;
                }
                _ if is_line_comment_start(bytes, idx) => {
                    state = State::LineComment;
                    idx += 1;
                }
                _ if is_block_comment_start(bytes, idx) => {
                    state = State::BlockComment;
                    idx += 1;
                }
                _ if is_word_byte(b) => {
                    let end = scan_word(bytes, idx);
                    tracker.word(&sql[idx..end]);
                    idx = end;
                    continue;
                }
                _ if b.is_ascii_whitespace() => {}
                _ => tracker.punctuation(),
            },
            State::SingleQuoted => {
                if b == b'\'' {
                    if is_escaped_quote(bytes, idx, b'\'') {
                        idx += 1;
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::DoubleQuoted => {
                if b == b'"' {
                    if is_escaped_quote(bytes, idx, b'"') {
                        idx += 1;
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::Backticked => {
                if b == b'`' {
                    if is_escaped_quote(bytes, idx, b'`') {
                        idx += 1;
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::Bracketed => {
                if b == b']' {
                    state = State::Normal;
                }
            }
            State::LineComment => {
                if b == b'\n' {
                    state = State::Normal;
                }
            }
            State::BlockComment => {
                if is_block_comment_end(bytes, idx) {
                    state = State::Normal;
                    idx += 1;
                }
            }
        }
        idx += 1;
    }

    (None, tracker)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn statements(sql: &str) -> Vec<&str> {
        let mut out = Vec::new();
        let mut rest = sql;
        while let Some(split) = split_leading_statement(rest) {
            out.push(split.statement);
            rest = split.tail;
        }
        out
    }

    #[test]
    fn splits_on_top_level_semicolons() {
        let split = split_leading_statement("SELECT 1; SELECT 2;").unwrap();
        assert_eq!(split.statement, "SELECT 1");
        assert_eq!(split.tail, " SELECT 2;");
        assert_eq!(statements("SELECT 1; SELECT 2;"), vec!["SELECT 1", "SELECT 2"]);
    }

    #[test]
    fn last_statement_needs_no_terminator() {
        assert_eq!(statements("SELECT 1;SELECT 2"), vec!["SELECT 1", "SELECT 2"]);
    }

    #[test]
    fn empty_and_comment_only_input_has_no_statement() {
        assert!(split_leading_statement("").is_none());
        assert!(split_leading_statement("   \n\t").is_none());
        assert!(split_leading_statement(" ;; -- nothing here\n /* or here; */ ;").is_none());
    }

    #[test]
    fn skips_semicolons_in_literals_identifiers_and_comments() {
        let sql = "INSERT INTO \"a;b\" VALUES ('x;''y', `c;`, [d;]) -- tail; comment\n; SELECT 2 /* ; */";
        assert_eq!(
            statements(sql),
            vec![
                "INSERT INTO \"a;b\" VALUES ('x;''y', `c;`, [d;]) -- tail; comment",
                "SELECT 2 /* ; */"
            ]
        );
    }

    #[test]
    fn skips_leading_empty_fragments() {
        let split = split_leading_statement("; -- lead\n;  SELECT 3; ").unwrap();
        assert_eq!(split.statement, "SELECT 3");
        assert_eq!(split.tail, " ");
        assert!(split_leading_statement(split.tail).is_none());
    }

    #[test]
    fn trigger_bodies_end_at_end_semicolon() {
        let sql = "CREATE TEMP TRIGGER trg AFTER INSERT ON t BEGIN \
                   UPDATE t SET n = n + 1; DELETE FROM u; END; SELECT 1;";
        let parts = statements(sql);
        assert_eq!(parts.len(), 2);
        assert!(parts[0].ends_with("DELETE FROM u; END"));
        assert_eq!(parts[1], "SELECT 1");
    }

    #[test]
    fn case_end_inside_trigger_body_does_not_terminate() {
        let sql = "CREATE TRIGGER trg AFTER INSERT ON t BEGIN \
                   UPDATE t SET n = CASE WHEN new.id > 0 THEN 1 ELSE CASE WHEN n IS NULL THEN 2 END END; \
                   END; SELECT 1;";
        let parts = statements(sql);
        assert_eq!(parts.len(), 2);
        assert!(parts[0].ends_with("END END; END"));
        assert_eq!(parts[1], "SELECT 1");
    }

    #[test]
    fn case_outside_triggers_splits_normally() {
        assert_eq!(
            statements("SELECT CASE WHEN 1 THEN 'a' END; SELECT 2"),
            vec!["SELECT CASE WHEN 1 THEN 'a' END", "SELECT 2"]
        );
    }

    #[test]
    fn begin_outside_triggers_is_an_ordinary_statement() {
        assert_eq!(
            statements("BEGIN TRANSACTION; INSERT INTO t VALUES (1); COMMIT"),
            vec!["BEGIN TRANSACTION", "INSERT INTO t VALUES (1)", "COMMIT"]
        );
    }

    #[test]
    fn multibyte_text_is_kept_intact() {
        assert_eq!(
            statements("SELECT 'héllo;wörld'; SELECT 'ü'"),
            vec!["SELECT 'héllo;wörld'", "SELECT 'ü'"]
        );
    }
}
