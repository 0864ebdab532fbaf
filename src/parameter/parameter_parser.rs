use once_cell::sync::Lazy;
use regex::Regex;

use crate::parameter::ParameterRecognizer;
use crate::parser::{ParseError, ParseErrorKind, SqlCursor};

static CALL_ESCAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*\{\s*\?\s*=\s*call\b").expect("call escape pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Code,
    SingleQuoted,
    DoubleQuoted,
    LineComment,
    BlockComment,
}

/// Characters that end a parameter name or an ordinal label.
pub fn is_separator(c: char) -> bool {
    matches!(
        c,
        ' ' | '\n'
            | '\r'
            | '\u{0C}'
            | '\t'
            | ','
            | ';'
            | '('
            | ')'
            | '='
            | '<'
            | '>'
            | '&'
            | '|'
            | '+'
            | '-'
            | '/'
            | '*'
            | '\''
            | '^'
            | '!'
            | '['
            | ']'
            | '#'
            | '~'
            | '\\'
    )
}

fn is_identifier_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

/// Rejects the `{?=call ...}` escape, which is a stored procedure call rather than a query.
pub fn check_is_not_a_function_call(sql: &str) -> Result<(), ParseError> {
    if CALL_ESCAPE.is_match(sql) {
        return ParseError::for_query(
            ParseErrorKind::UnsupportedCallEscape,
            "Calling database procedures or functions through a native query is not supported",
            sql,
        )
        .err();
    }
    Ok(())
}

/// Scans `sql` once, left to right, reporting parameters and literal text to
/// the recognizer. Quoted strings and comments are passed through untouched.
pub fn parse(
    sql: &str,
    recognizer: &mut impl ParameterRecognizer,
    native_jdbc_parameters_ignored: bool,
) -> Result<(), ParseError> {
    check_is_not_a_function_call(sql)?;

    let mut cursor = SqlCursor::new(sql);
    let mut state = ScanState::Code;

    while !cursor.eof() {
        let c = cursor.current();
        state = match state {
            ScanState::SingleQuoted | ScanState::DoubleQuoted if c == '\\' => {
                recognizer.other(c);
                if !cursor.is_last() {
                    cursor.next();
                    recognizer.other(cursor.current());
                }
                state
            }
            ScanState::SingleQuoted => {
                recognizer.other(c);
                if c == '\'' { ScanState::Code } else { state }
            }
            ScanState::DoubleQuoted => {
                recognizer.other(c);
                if c == '"' { ScanState::Code } else { state }
            }
            ScanState::LineComment => {
                recognizer.other(c);
                if c == '\n' || c == '\r' { ScanState::Code } else { state }
            }
            ScanState::BlockComment => {
                recognizer.other(c);
                if c == '*' && cursor.peek(1) == '/' {
                    recognizer.other('/');
                    cursor.next();
                    ScanState::Code
                } else {
                    state
                }
            }
            ScanState::Code => scan_code(&mut cursor, recognizer, native_jdbc_parameters_ignored)?,
        };
        cursor.next();
    }

    recognizer.complete()
}

fn scan_code(
    cursor: &mut SqlCursor,
    recognizer: &mut impl ParameterRecognizer,
    native_jdbc_parameters_ignored: bool,
) -> Result<ScanState, ParseError> {
    let c = cursor.current();
    match c {
        '/' if cursor.peek(1) == '*' => {
            recognizer.other_str("/*");
            cursor.next();
            Ok(ScanState::BlockComment)
        }
        '-' if cursor.peek(1) == '-' => {
            recognizer.other_str("--");
            cursor.next();
            Ok(ScanState::LineComment)
        }
        '"' => {
            recognizer.other(c);
            Ok(ScanState::DoubleQuoted)
        }
        '\'' => {
            recognizer.other(c);
            Ok(ScanState::SingleQuoted)
        }
        '\\' => {
            if cursor.is_last() {
                return ParseError::new(
                    ParseErrorKind::UnterminatedEscape,
                    "Escape character '\\' at end of query",
                    cursor.position,
                    cursor,
                )
                .err();
            }
            cursor.next();
            recognizer.other(cursor.current());
            Ok(ScanState::Code)
        }
        ':' => {
            scan_colon(cursor, recognizer)?;
            Ok(ScanState::Code)
        }
        '?' => {
            scan_question_mark(cursor, recognizer, native_jdbc_parameters_ignored)?;
            Ok(ScanState::Code)
        }
        _ => {
            recognizer.other(c);
            Ok(ScanState::Code)
        }
    }
}

fn scan_colon(cursor: &mut SqlCursor, recognizer: &mut impl ParameterRecognizer) -> Result<(), ParseError> {
    let pivot = cursor.position;

    if is_identifier_start(cursor.peek(1)) && cursor.previous() != ':' {
        let end = cursor.find_from(pivot + 1, is_separator);
        let name = cursor.text_from_range(pivot + 1, end);
        if name.is_empty() {
            return ParseError::new(
                ParseErrorKind::EmptyParameterName,
                "Space is not allowed after parameter prefix ':'",
                pivot,
                cursor,
            )
            .err();
        }
        recognizer.named_parameter(&name, pivot)?;
        cursor.jump_to(end - 1);
        return Ok(());
    }

    if cursor.peek(1) == ':' && cursor.peek(2) == ':' && cursor.peek(3) == ':' {
        recognizer.other_str("::");
        cursor.jump(3);
    } else if cursor.peek(1) == ':' && cursor.peek(2) == '=' {
        recognizer.other_str(":=");
        cursor.jump(2);
    } else {
        recognizer.other(':');
        while cursor.peek(1) == ':' {
            cursor.next();
            recognizer.other(':');
        }
    }
    Ok(())
}

fn scan_question_mark(
    cursor: &mut SqlCursor,
    recognizer: &mut impl ParameterRecognizer,
    native_jdbc_parameters_ignored: bool,
) -> Result<(), ParseError> {
    let pivot = cursor.position;

    if cursor.peek(1).is_ascii_digit() {
        let end = cursor.find_from(pivot + 1, is_separator);
        let text = cursor.text_from_range(pivot + 1, end);
        cursor.jump_to(end - 1);
        let label = match text.parse::<u32>() {
            Ok(label) if label > 0 => label,
            _ => {
                return ParseError::new(
                    ParseErrorKind::InvalidOrdinalLabel,
                    &format!("Ordinal parameter label [?{}] was not a positive integer", text),
                    pivot,
                    cursor,
                )
                .err();
            }
        };
        return recognizer.jpa_positional_parameter(label, pivot);
    }

    if native_jdbc_parameters_ignored {
        recognizer.other('?');
        Ok(())
    } else {
        recognizer.ordinal_parameter(pivot)
    }
}

#[cfg(test)]
mod tests {
    use crate::parameter::{parse, ParameterRecognizer};
    use crate::parser::{ParseError, ParseErrorKind};

    #[derive(Debug, Default)]
    struct Recording {
        text: String,
        events: Vec<String>,
        completed: bool,
    }

    impl ParameterRecognizer for Recording {
        fn named_parameter(&mut self, name: &str, source_position: usize) -> Result<(), ParseError> {
            self.events.push(format!("named:{}@{}", name, source_position));
            self.text.push('#');
            Ok(())
        }

        fn jpa_positional_parameter(&mut self, label: u32, source_position: usize) -> Result<(), ParseError> {
            self.events.push(format!("ordinal:{}@{}", label, source_position));
            self.text.push('#');
            Ok(())
        }

        fn ordinal_parameter(&mut self, source_position: usize) -> Result<(), ParseError> {
            self.events.push(format!("jdbc@{}", source_position));
            self.text.push('#');
            Ok(())
        }

        fn other(&mut self, c: char) {
            self.text.push(c);
        }

        fn complete(&mut self) -> Result<(), ParseError> {
            self.completed = true;
            Ok(())
        }
    }

    fn scan(sql: &str) -> Recording {
        let mut recording = Recording::default();
        parse(sql, &mut recording, false).unwrap();
        recording
    }

    #[test]
    pub fn test_named_parameters() {
        let r = scan("select * from t where a = :a and b=:b_2");

        assert_eq!(r.events, vec!["named:a@26", "named:b_2@35"]);
        assert_eq!(r.text, "select * from t where a = # and b=#");
        assert!(r.completed);
    }

    #[test]
    pub fn test_ordinal_and_jdbc_parameters() {
        let r = scan("values (?1, ?2)");
        assert_eq!(r.events, vec!["ordinal:1@8", "ordinal:2@12"]);
        assert_eq!(r.text, "values (#, #)");

        let r = scan("values (?, ?)");
        assert_eq!(r.events, vec!["jdbc@8", "jdbc@11"]);
    }

    #[test]
    pub fn test_quotes_and_comments_are_opaque() {
        let sql = "select ':x', \"?\" -- :y ?\n /* :z ? */ from t";
        let r = scan(sql);

        assert!(r.events.is_empty());
        assert_eq!(r.text, sql);
    }

    #[test]
    pub fn test_parameter_after_line_comment() {
        let r = scan("select 1 -- note\nwhere a = :a");

        assert_eq!(r.events, vec!["named:a@27"]);
    }

    #[test]
    pub fn test_backslash_escapes_next_character() {
        let r = scan(r"select \:notparam, \? from t");

        assert!(r.events.is_empty());
        assert_eq!(r.text, "select :notparam, ? from t");
    }

    #[test]
    pub fn test_trailing_backslash_is_an_error() {
        let mut recording = Recording::default();
        let err = parse("select 1 \\", &mut recording, false).unwrap_err();

        assert_eq!(err.kind, ParseErrorKind::UnterminatedEscape);
    }

    #[test]
    pub fn test_colon_escapes() {
        let r = scan("select x::::text, y ::= 1, z::int");

        assert!(r.events.is_empty());
        assert_eq!(r.text, "select x::text, y := 1, z::int");
    }

    #[test]
    pub fn test_colon_followed_by_non_identifier_is_literal() {
        let r = scan("select a : b, :1");

        assert!(r.events.is_empty());
        assert_eq!(r.text, "select a : b, :1");
    }

    #[test]
    pub fn test_jdbc_parameters_ignored() {
        let mut recording = Recording::default();
        parse("select ? from t where a = ?1", &mut recording, true).unwrap();

        assert_eq!(recording.events, vec!["ordinal:1@26"]);
        assert_eq!(recording.text, "select ? from t where a = #");
    }

    #[test]
    pub fn test_invalid_ordinal_label() {
        let mut recording = Recording::default();
        let err = parse("select ?1a from t", &mut recording, false).unwrap_err();

        assert_eq!(err.kind, ParseErrorKind::InvalidOrdinalLabel);
    }

    #[test]
    pub fn test_zero_ordinal_label_is_invalid() {
        let mut recording = Recording::default();
        let err = parse("select * from t where a = ?0", &mut recording, false).unwrap_err();

        assert_eq!(err.kind, ParseErrorKind::InvalidOrdinalLabel);
        assert!(recording.events.is_empty());
    }

    #[test]
    pub fn test_escaped_quotes_stay_inside_literal() {
        let r = scan(r"select 'it\'s' from t where a = :x");
        assert_eq!(r.events, vec!["named:x@32"]);
        assert_eq!(r.text, r"select 'it\'s' from t where a = #");

        let r = scan(r#"select "a\"b" from t where c = ?"#);
        assert_eq!(r.events, vec!["jdbc@31"]);
    }

    #[test]
    pub fn test_call_escape_rejected() {
        let mut recording = Recording::default();

        let err = parse("{?=call my_fn(?)}", &mut recording, false).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnsupportedCallEscape);

        let err = parse("  { ? = CALL my_fn(?) }", &mut recording, false).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnsupportedCallEscape);
    }

    #[test]
    pub fn test_name_stops_at_separator() {
        let r = scan("where a in (:ids)||:suffix");

        assert_eq!(r.events, vec!["named:ids@12", "named:suffix@19"]);
        assert_eq!(r.text, "where a in (#)||#");
    }
}
