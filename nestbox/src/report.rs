//! Human-readable and JSON status snapshots of a composite.

use std::fmt;

use nestbox_shared::constants::report::ABSENT;
use serde::{Deserialize, Serialize};

/// One line of demonstration output.
///
/// Renders as `<label>: a0.x <int>, a1->x <int>`; an absent referenced
/// leaf renders as `(null)` and serializes as `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusLine {
    pub label: String,
    pub inline_x: i32,
    pub referenced_x: Option<i32>,
}

impl StatusLine {
    pub fn new(label: impl Into<String>, inline_x: i32, referenced_x: Option<i32>) -> Self {
        Self {
            label: label.into(),
            inline_x,
            referenced_x,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "label": self.label,
            "a0": { "x": self.inline_x },
            "a1": self.referenced_x.map(|x| serde_json::json!({ "x": x })),
        })
    }
}

impl fmt::Display for StatusLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: a0.x {}, a1->x ", self.label, self.inline_x)?;
        match self.referenced_x {
            Some(x) => write!(f, "{}", x),
            None => f.write_str(ABSENT),
        }
    }
}
