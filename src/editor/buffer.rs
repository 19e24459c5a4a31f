use ropey::Rope;

/// Position in the editor buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Cursor {
    /// Zero-based line index.
    pub line: usize,
    /// Zero-based column (byte offset within the line).
    pub col: usize,
}

impl Cursor {
    pub const fn at(line: usize, col: usize) -> Self {
        Self { line, col }
    }
}

/// The markdown source being edited.
///
/// Backed by a rope so that inserts at the cursor stay cheap on long CVs.
/// The buffer tracks a cursor and an optional selection anchor; inserting
/// an uploaded image replaces the selection (or inserts at the cursor).
pub struct EditorBuffer {
    rope: Rope,
    cursor: Cursor,
    anchor: Option<Cursor>,
    dirty: bool,
}

impl EditorBuffer {
    /// Create a new buffer from a string.
    pub fn from_text(text: &str) -> Self {
        Self {
            rope: Rope::from_str(text),
            cursor: Cursor::default(),
            anchor: None,
            dirty: false,
        }
    }

    pub fn empty() -> Self {
        Self::from_text("")
    }

    pub const fn cursor(&self) -> Cursor {
        self.cursor
    }

    /// Selected range, ordered start to end.
    pub fn selection(&self) -> Option<(Cursor, Cursor)> {
        let anchor = self.anchor?;
        if anchor == self.cursor {
            return None;
        }
        Some((anchor.min(self.cursor), anchor.max(self.cursor)))
    }

    /// Whether the buffer has been modified since creation or last save.
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub const fn mark_clean(&mut self) {
        self.dirty = false;
    }

    pub fn line_count(&self) -> usize {
        self.rope.len_lines()
    }

    /// Get the content of a line (without trailing newline).
    pub fn line_at(&self, line_idx: usize) -> Option<String> {
        if line_idx >= self.rope.len_lines() {
            return None;
        }
        let s = self.rope.line(line_idx).to_string();
        Some(s.trim_end_matches('\n').trim_end_matches('\r').to_string())
    }

    fn line_len(&self, line_idx: usize) -> usize {
        self.line_at(line_idx).map_or(0, |s| s.len())
    }

    /// The full text content of the buffer.
    pub fn text(&self) -> String {
        self.rope.to_string()
    }

    /// Replace the whole content, keeping the cursor where it still fits.
    ///
    /// Returns `false` (and leaves the buffer clean) when nothing changed.
    pub fn set_text(&mut self, text: &str) -> bool {
        if self.rope == text {
            return false;
        }
        self.rope = Rope::from_str(text);
        self.anchor = None;
        let Cursor { line, col } = self.cursor;
        self.move_to(line, col);
        self.dirty = true;
        true
    }

    /// Load content from the server: like `set_text`, but the result is clean.
    pub fn load(&mut self, text: &str) {
        self.rope = Rope::from_str(text);
        self.anchor = None;
        self.cursor = Cursor::default();
        self.dirty = false;
    }

    /// Move cursor to a specific line and column, clearing the selection.
    pub fn move_to(&mut self, line: usize, col: usize) {
        self.cursor = self.clamp(Cursor::at(line, col));
        self.anchor = None;
    }

    /// Put the cursor on an empty last line, appending a line break when the
    /// content does not already end with one. Returns whether the text changed.
    pub fn open_line_at_end(&mut self) -> bool {
        let last = self.line_count().saturating_sub(1);
        let needs_break = self.line_at(last).is_some_and(|line| !line.is_empty());
        if needs_break {
            self.rope.insert(self.rope.len_chars(), "\n");
            self.dirty = true;
        }
        self.move_to(self.line_count().saturating_sub(1), 0);
        needs_break
    }

    /// Select from `anchor` to `head`; the cursor ends up at `head`.
    pub fn select(&mut self, anchor: Cursor, head: Cursor) {
        self.anchor = Some(self.clamp(anchor));
        self.cursor = self.clamp(head);
    }

    /// Replace the selection with `s`, or insert it at the cursor.
    ///
    /// The cursor ends up right after the inserted text.
    pub fn replace_selection(&mut self, s: &str) {
        let (start, end) = self.selection().unwrap_or((self.cursor, self.cursor));
        let start_idx = self.char_idx(start);
        let end_idx = self.char_idx(end);
        if start_idx < end_idx {
            self.rope.remove(start_idx..end_idx);
        }
        self.rope.insert(start_idx, s);

        let inserted_lines = s.split('\n').count();
        self.cursor = if inserted_lines > 1 {
            Cursor::at(
                start.line + inserted_lines - 1,
                s.rsplit('\n').next().map_or(0, str::len),
            )
        } else {
            Cursor::at(start.line, start.col + s.len())
        };
        self.anchor = None;
        self.dirty = true;
    }

    fn clamp(&self, pos: Cursor) -> Cursor {
        let line = pos.line.min(self.line_count().saturating_sub(1));
        let text = self.line_at(line).unwrap_or_default();
        let mut col = pos.col.min(text.len());
        while !text.is_char_boundary(col) {
            col -= 1;
        }
        Cursor::at(line, col)
    }

    /// Convert a position to a ropey char index.
    fn char_idx(&self, pos: Cursor) -> usize {
        let line_start = self.rope.line_to_char(pos.line);
        let line = self.line_at(pos.line).unwrap_or_default();
        let byte_col = pos.col.min(line.len());
        line_start + line[..byte_col].chars().count()
    }
}

impl Default for EditorBuffer {
    fn default() -> Self {
        Self::empty()
    }
}

impl std::fmt::Debug for EditorBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorBuffer")
            .field(
                "rope",
                &format_args!("Rope({} lines)", self.rope.len_lines()),
            )
            .field("cursor", &self.cursor)
            .field("dirty", &self.dirty)
            .finish_non_exhaustive()
    }
}
