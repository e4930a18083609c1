//! Streaming mbox splitter.
//!
//! Record boundaries come from [`mail_parser`]'s mbox iterator: every line
//! starting with `From ` opens a new message and `>From ` quoting is undone.
//! [`MboxReader`] numbers the records and skips the empty ones, so the
//! extractor never holds more than one record in memory.

use std::io::{self, BufRead};

use mail_parser::mailbox::mbox::MessageIterator;

/// One undecoded message as found in the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    /// Zero-based position of the record in the archive.
    pub index: usize,

    /// Raw header and body bytes, separator excluded.
    pub content: Vec<u8>,
}

impl RawRecord {
    fn new(index: usize, mut content: Vec<u8>) -> Self {
        while content.last().is_some_and(|b| *b == b'\n' || *b == b'\r') {
            content.pop();
        }
        Self { index, content }
    }

    /// Returns `true` if the record holds nothing but whitespace.
    pub fn is_blank(&self) -> bool {
        self.content.iter().all(u8::is_ascii_whitespace)
    }
}

/// Iterator over the records of an mbox archive.
///
/// Content before the first separator line is not a record and is ignored.
/// Records are kept as bytes so that odd charsets never abort the walk;
/// decoding happens later, per record.
pub struct MboxReader<R: BufRead> {
    messages: MessageIterator<R>,
    next_index: usize,
    failed: bool,
}

impl<R: BufRead> MboxReader<R> {
    /// Wraps a buffered reader positioned at the start of an archive.
    pub fn new(reader: R) -> Self {
        Self {
            messages: MessageIterator::new(reader),
            next_index: 0,
            failed: false,
        }
    }
}

impl<R: BufRead> Iterator for MboxReader<R> {
    type Item = io::Result<RawRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        loop {
            match self.messages.next()? {
                Ok(message) => {
                    let record = RawRecord::new(self.next_index, message.contents().to_vec());
                    if record.is_blank() {
                        continue;
                    }
                    self.next_index += 1;
                    return Some(Ok(record));
                }
                Err(_) => {
                    // the iterator reports read failures without detail
                    self.failed = true;
                    return Some(Err(io::Error::other("failed to read mbox archive")));
                }
            }
        }
    }
}
