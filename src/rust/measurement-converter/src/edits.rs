// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Text edits against the original source and their application.
//!
//! Rewrite passes never mutate the syntax tree. Instead they record edits
//! addressed by byte offsets of the parsed source, and the emitter applies all
//! of them in one go. Text outside of the edited ranges is kept as is.
use std::ops::Range;

use anyhow::anyhow;

use crate::Result;
use crate::source::LineEnding;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEdit {
    range: Range<usize>,
    replacement: String,
}

impl SourceEdit {
    pub fn replace(range: Range<usize>, replacement: impl Into<String>) -> Self {
        SourceEdit {
            range,
            replacement: replacement.into(),
        }
    }

    pub fn insert(offset: usize, text: impl Into<String>) -> Self {
        SourceEdit {
            range: offset..offset,
            replacement: text.into(),
        }
    }

    fn is_insertion(&self) -> bool {
        self.range.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct EditPlan {
    edits: Vec<SourceEdit>,
}

impl EditPlan {
    pub fn new() -> Self {
        EditPlan { edits: vec![] }
    }

    pub fn push(&mut self, edit: SourceEdit) {
        self.edits.push(edit);
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    /// Apply all edits to `source`.
    ///
    /// Insertions at the same offset keep the order in which they were pushed.
    /// Replacements must not overlap each other.
    pub fn apply(&self, source: &str) -> Result<String> {
        let mut ordered = self.edits.iter().collect::<Vec<_>>();
        // Stable sort: equal offsets keep push order, insertions go before a
        // replacement starting at the same offset.
        ordered.sort_by_key(|edit| (edit.range.start, !edit.is_insertion()));

        let mut out = String::with_capacity(source.len());
        let mut cursor = 0;
        for edit in ordered {
            if edit.range.end > source.len() {
                return Err(anyhow!(
                    "Internal error: Edit {:?} is outside of the source (length {})",
                    edit.range,
                    source.len()
                )
                .into());
            }
            if edit.range.start < cursor {
                return Err(anyhow!(
                    "Internal error: Edit {:?} overlaps a previous edit ending at {}",
                    edit.range,
                    cursor
                )
                .into());
            }
            out.push_str(&source[cursor..edit.range.start]);
            out.push_str(&edit.replacement);
            cursor = edit.range.end;
        }
        out.push_str(&source[cursor..]);
        Ok(out)
    }
}

/// Normalize the emitted text.
///
/// Line breaks introduced by edits follow the source's line ending style and
/// the text ends with exactly one line break.
pub fn reformat(text: &str, line_ending: LineEnding) -> String {
    let mut out = match line_ending {
        LineEnding::Lf => text.to_string(),
        LineEnding::CrLf => text.replace("\r\n", "\n").replace('\n', "\r\n"),
    };
    let eol = line_ending.as_str();
    while out.ends_with(eol) {
        out.truncate(out.len() - eol.len());
    }
    out.push_str(eol);
    out
}
