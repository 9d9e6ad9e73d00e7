use platchan_codec::Value;

use crate::error::{ArgumentError, TextEditStateError};

/// Text, selection and composing region of an editable field.
///
/// Offsets count UTF-16 code units, the unit the Dart side uses. `-1`
/// marks an unset selection or composing bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEditState {
    text: String,
    selection_start: i64,
    selection_end: i64,
    composing_start: i64,
    composing_end: i64,
}

impl TextEditState {
    pub fn new(
        text: impl Into<String>,
        selection_start: i64,
        selection_end: i64,
        composing_start: i64,
        composing_end: i64,
    ) -> Result<Self, TextEditStateError> {
        let text = text.into();
        let len = utf16_len(&text);

        if (selection_start != -1 || selection_end != -1)
            && (selection_start < 0 || selection_end < 0)
        {
            return Err(TextEditStateError::InvalidSelection {
                start: selection_start,
                end: selection_end,
            });
        }
        if (composing_start != -1 || composing_end != -1)
            && (composing_start < 0 || composing_start > composing_end)
        {
            return Err(TextEditStateError::InvalidComposingRange {
                start: composing_start,
                end: composing_end,
            });
        }
        if composing_end > len {
            return Err(TextEditStateError::ComposingOutOfBounds {
                end: composing_end,
                len,
            });
        }
        if selection_start > len {
            return Err(TextEditStateError::SelectionStartOutOfBounds {
                start: selection_start,
                len,
            });
        }
        if selection_end > len {
            return Err(TextEditStateError::SelectionEndOutOfBounds {
                end: selection_end,
                len,
            });
        }

        Ok(Self {
            text,
            selection_start,
            selection_end,
            composing_start,
            composing_end,
        })
    }

    /// Decode the `{text, selectionBase, selectionExtent, composingBase,
    /// composingExtent}` object sent by the framework.
    pub fn from_value(value: &Value) -> Result<Self, ArgumentError> {
        let text = value
            .get("text")
            .ok_or(ArgumentError::Missing("text"))?
            .as_str()
            .ok_or(ArgumentError::InvalidType {
                field: "text",
                expected: "a string",
            })?;
        let offset = |field: &'static str| -> Result<i64, ArgumentError> {
            match value.get(field) {
                None | Some(Value::Null) => Ok(-1),
                Some(v) => v.as_i64().ok_or(ArgumentError::InvalidType {
                    field,
                    expected: "an integer",
                }),
            }
        };

        Ok(Self::new(
            text,
            offset("selectionBase")?,
            offset("selectionExtent")?,
            offset("composingBase")?,
            offset("composingExtent")?,
        )?)
    }

    /// The wire object for this state.
    pub fn to_value(&self) -> Value {
        Value::map([
            ("text", Value::from(self.text.as_str())),
            ("selectionBase", Value::I64(self.selection_start)),
            ("selectionExtent", Value::I64(self.selection_end)),
            ("composingBase", Value::I64(self.composing_start)),
            ("composingExtent", Value::I64(self.composing_end)),
        ])
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn selection_start(&self) -> i64 {
        self.selection_start
    }

    pub fn selection_end(&self) -> i64 {
        self.selection_end
    }

    pub fn composing_start(&self) -> i64 {
        self.composing_start
    }

    pub fn composing_end(&self) -> i64 {
        self.composing_end
    }

    /// Both selection bounds are set together, so checking the start suffices.
    pub fn has_selection(&self) -> bool {
        self.selection_start >= 0
    }

    pub fn has_composing(&self) -> bool {
        self.composing_start >= 0 && self.composing_end > self.composing_start
    }
}

fn utf16_len(text: &str) -> i64 {
    // A &str cannot exceed isize::MAX bytes, so the count always fits.
    text.encode_utf16().count() as i64
}
