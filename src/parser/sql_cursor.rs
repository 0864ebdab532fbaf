/// Character cursor over a SQL string.
///
/// Positions are character indexes into the original text; callers that
/// build output strings track their own byte offsets.
#[derive(Debug, Default)]
pub struct SqlCursor {
    pub position: usize,
    pub length: usize,
    pub text_v: Vec<char>,
}

impl SqlCursor {
    pub fn new(sql: &str) -> Self {
        let text_v: Vec<char> = sql.chars().collect();
        Self {
            position: 0,
            length: text_v.len(),
            text_v,
        }
    }

    pub fn eof(&self) -> bool {
        self.position >= self.length
    }

    pub fn is_last(&self) -> bool {
        self.position + 1 == self.length
    }

    pub fn current(&self) -> char {
        if self.position < self.length {
            return self.text_v[self.position];
        }

        '\0'
    }

    /// Character `ahead` positions after the current one, `'\0'` past the end.
    pub fn peek(&self, ahead: usize) -> char {
        self.char_at(self.position + ahead)
    }

    /// Character before the current one, `'\0'` at the start.
    pub fn previous(&self) -> char {
        if self.position == 0 {
            return '\0';
        }
        self.char_at(self.position - 1)
    }

    pub fn char_at(&self, index: usize) -> char {
        if index < self.length {
            return self.text_v[index];
        }

        '\0'
    }

    pub fn next(&mut self) {
        self.position += 1;
    }

    pub fn jump(&mut self, ahead: usize) {
        self.position = (self.position + ahead).min(self.length);
    }

    pub fn jump_to(&mut self, position: usize) {
        self.position = position.min(self.length);
    }

    /// First index at or after `from` whose character satisfies `stop`, or the length.
    pub fn find_from(&self, from: usize, stop: impl Fn(char) -> bool) -> usize {
        let mut index = from;
        while index < self.length && !stop(self.text_v[index]) {
            index += 1;
        }
        index
    }

    pub fn text_from_range(&self, start: usize, end: usize) -> String {
        let end = end.min(self.length);
        let start = start.min(end);
        self.text_v[start..end].iter().collect()
    }

    pub fn text_from_pivot(&self, pivot: usize) -> String {
        self.text_from_range(pivot, self.position)
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::SqlCursor;

    #[test]
    pub fn test_cursor_peek_past_end() {
        let cursor = SqlCursor::new("?1");

        assert_eq!(cursor.current(), '?');
        assert_eq!(cursor.peek(1), '1');
        assert_eq!(cursor.peek(2), '\0');
        assert_eq!(cursor.previous(), '\0');
    }

    #[test]
    pub fn test_cursor_find_from() {
        let cursor = SqlCursor::new(":name = 1");

        let end = cursor.find_from(1, |c| c == ' ');
        assert_eq!(end, 5);
        assert_eq!(cursor.text_from_range(1, end), "name");

        let end = cursor.find_from(6, |c| c == ';');
        assert_eq!(end, cursor.length);
    }

    #[test]
    pub fn test_cursor_multibyte() {
        let mut cursor = SqlCursor::new("'é' :p");
        cursor.jump(4);

        assert_eq!(cursor.current(), ':');
        assert_eq!(cursor.text_from_pivot(0), "'é' ");
    }
}
