//! Character encodings for the SQL script and the bulk files
//!
//! The encoding is fixed when the writer is created. Its lower-cased name is
//! repeated in every `COPY ... WITH ENCODING` directive, so it has to be a
//! name PostgreSQL understands.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use pgbulk_common::{BulkWriteError, Result};
use serde::{Deserialize, Serialize};

/// Supported output encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum BulkEncoding {
    #[default]
    Utf8,
    /// ISO-8859-1
    Latin1,
    /// US-ASCII
    Ascii,
}

impl BulkEncoding {
    /// Canonical charset name
    pub fn name(&self) -> &'static str {
        match self {
            BulkEncoding::Utf8 => "UTF-8",
            BulkEncoding::Latin1 => "ISO-8859-1",
            BulkEncoding::Ascii => "US-ASCII",
        }
    }

    /// Name as written into COPY directives
    pub fn directive_name(&self) -> String {
        self.name().to_lowercase()
    }

    /// Encode text, borrowing when the bytes are identical to UTF-8
    pub fn encode<'a>(&self, text: &'a str) -> Result<Cow<'a, [u8]>> {
        let limit = match self {
            BulkEncoding::Utf8 => return Ok(Cow::Borrowed(text.as_bytes())),
            BulkEncoding::Latin1 => 0xFF,
            BulkEncoding::Ascii => 0x7F,
        };
        if text.is_ascii() {
            return Ok(Cow::Borrowed(text.as_bytes()));
        }

        let mut bytes = Vec::with_capacity(text.len());
        for ch in text.chars() {
            let code = u32::from(ch);
            if code > limit {
                return Err(BulkWriteError::Encoding(format!(
                    "Character {:?} (U+{:04X}) cannot be encoded as {}",
                    ch,
                    code,
                    self.name()
                )));
            }
            bytes.push(code as u8);
        }
        Ok(Cow::Owned(bytes))
    }
}

impl fmt::Display for BulkEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BulkEncoding {
    type Err = BulkWriteError;

    fn from_str(label: &str) -> Result<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Ok(BulkEncoding::Utf8),
            "iso-8859-1" | "iso8859-1" | "latin1" => Ok(BulkEncoding::Latin1),
            "us-ascii" | "ascii" => Ok(BulkEncoding::Ascii),
            other => Err(BulkWriteError::ConfigError(format!(
                "Unsupported encoding: {}",
                other
            ))),
        }
    }
}

impl TryFrom<String> for BulkEncoding {
    type Error = BulkWriteError;

    fn try_from(label: String) -> Result<Self> {
        label.parse()
    }
}

impl From<BulkEncoding> for String {
    fn from(encoding: BulkEncoding) -> Self {
        encoding.name().to_string()
    }
}
