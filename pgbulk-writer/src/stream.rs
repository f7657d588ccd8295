//! The main SQL script that receives plain statements and COPY directives

use std::io::{BufWriter, Write};

use pgbulk_common::Result;

use crate::encoding::BulkEncoding;

/// Append-only statement stream with statement accounting
pub struct SqlStream {
    writer: BufWriter<Box<dyn Write + Send>>,
    encoding: BulkEncoding,
    separator: String,
    statements_count: u64,
}

impl SqlStream {
    pub fn new(
        writer: Box<dyn Write + Send>,
        encoding: BulkEncoding,
        separator: impl Into<String>,
        buffer_capacity: usize,
    ) -> Self {
        Self {
            writer: BufWriter::with_capacity(buffer_capacity, writer),
            encoding,
            separator: separator.into(),
            statements_count: 0,
        }
    }

    /// Number of statements accounted so far
    pub fn statements_count(&self) -> u64 {
        self.statements_count
    }

    /// Write a statement, terminated by the separator unless it already is
    pub fn write_statement(&mut self, sql: &str) -> Result<()> {
        write_encoded(&mut self.writer, self.encoding, sql)?;
        if !sql.ends_with(self.separator.as_str()) {
            write_encoded(&mut self.writer, self.encoding, &self.separator)?;
        }
        self.statements_count += 1;
        Ok(())
    }

    /// Account for a statement that was written somewhere else (a bulk row)
    pub fn count_statement(&mut self) {
        self.statements_count += 1;
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

fn write_encoded(writer: &mut impl Write, encoding: BulkEncoding, text: &str) -> Result<()> {
    let bytes = encoding.encode(text)?;
    writer.write_all(&bytes)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use parking_lot::Mutex;

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_separator_appended_once() {
        let buffer = SharedBuffer::default();
        let mut stream = SqlStream::new(Box::new(buffer.clone()), BulkEncoding::Utf8, ";\n", 64);

        stream.write_statement("DELETE FROM a").unwrap();
        stream.write_statement("DELETE FROM b;\n").unwrap();
        stream.count_statement();
        stream.flush().unwrap();

        let text = String::from_utf8(buffer.0.lock().clone()).unwrap();
        assert_eq!(text, "DELETE FROM a;\nDELETE FROM b;\n");
        assert_eq!(stream.statements_count(), 3);
    }

    #[test]
    fn test_statement_is_encoded() {
        let buffer = SharedBuffer::default();
        let mut stream = SqlStream::new(Box::new(buffer.clone()), BulkEncoding::Latin1, ";\n", 64);

        stream.write_statement("SELECT 'é'").unwrap();
        stream.flush().unwrap();
        assert_eq!(buffer.0.lock().as_slice(), b"SELECT '\xE9';\n");
    }
}
