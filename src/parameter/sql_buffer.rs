/// SQL text edited in place by left-to-right replacements addressed in the
/// coordinates of the unedited text.
#[derive(Debug, Clone)]
pub struct SqlBuffer {
    text: String,
    offset: isize,
    last_end: usize,
}

impl SqlBuffer {
    pub fn new(sql: &str) -> Self {
        Self {
            text: sql.to_string(),
            offset: 0,
            last_end: 0,
        }
    }

    fn shifted(&self, original: usize) -> usize {
        (original as isize + self.offset) as usize
    }

    /// Replaces `original_len` bytes at `original_start`. Replacements must not
    /// overlap and must come in increasing order.
    pub fn replace(&mut self, original_start: usize, original_len: usize, replacement: &str) {
        debug_assert!(original_start >= self.last_end, "replacements must move forward");
        let start = self.shifted(original_start);
        let end = start + original_len;
        self.text.replace_range(start..end, replacement);
        self.offset += replacement.len() as isize - original_len as isize;
        self.last_end = original_start + original_len;
    }

    /// Whether the span is immediately wrapped by `(` and `)`, ignoring whitespace.
    pub fn is_enclosed_in_parens(&self, original_start: usize, original_len: usize) -> bool {
        let start = self.shifted(original_start);
        let end = start + original_len;

        let before = self.text[..start].chars().rev().find(|c| !c.is_whitespace());
        let after = self.text[end..].chars().find(|c| !c.is_whitespace());

        before == Some('(') && after == Some(')')
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn into_string(self) -> String {
        self.text
    }
}
