//! Streaming assembly of [`Message`]s across arbitrarily segmented
//! input buffers.

use crate::buffer_queue::BufferQueue;
use crate::message::Message;

/// Feeds 16-bit word buffers to a [`Message`] builder across however
/// many calls to [`Reader::add_buffer`] it takes, yielding completed
/// messages and the fully consumed buffers back to the caller.
///
/// `Reader` never copies or owns the underlying word data; it only
/// borrows it for as long as it is queued, for the lifetime `'buf`.
/// This is the sans-I/O design point of the whole crate: the caller
/// decides where buffers come from (a socket, a file, a ring buffer)
/// and when they may be reused, by how long it keeps them borrowed.
pub struct Reader<'buf> {
    pending: BufferQueue<'buf>,
    depleted: BufferQueue<'buf>,
    position: usize,
    current: Message,
}

impl<'buf> Reader<'buf> {
    /// A reader with no buffers queued and no in-flight message.
    pub fn new() -> Self {
        Reader {
            pending: BufferQueue::new(),
            depleted: BufferQueue::new(),
            position: 0,
            current: Message::new(),
        }
    }

    /// Queue `buf` for decoding. A null/empty buffer (`buf.is_empty()`)
    /// is a documented no-op, returning `false`; otherwise returns
    /// `true`.
    pub fn add_buffer(&mut self, buf: &'buf [u16]) -> bool {
        if buf.is_empty() {
            return false;
        }
        self.pending.push(buf);
        true
    }

    /// Advance decoding and return the next completed [`Message`], or
    /// `None` if every queued buffer has been consumed without
    /// completing one.
    ///
    /// Each call resumes exactly where the last one left off, even if
    /// that point falls in the middle of a buffer or at a buffer
    /// boundary; completed buffers move to the depleted queue as they
    /// are exhausted, to be reclaimed via [`Reader::get_depleted`].
    pub fn get_message(&mut self) -> Option<Message> {
        loop {
            let buf = self.pending.peek()?;
            let n = self.current.decode_from(&buf[self.position..]);
            self.position += n;

            if self.position < buf.len() {
                // decode_from stopped on an end-of-message word with
                // input left in this buffer; the message is done but
                // the buffer is not.
                return Some(std::mem::replace(&mut self.current, Message::new()));
            }

            // The head buffer is fully consumed; reclaim it.
            let drained = self.pending.pop().expect("peek just confirmed a head buffer");
            self.depleted.push(drained);
            self.position = 0;

            if self.current.is_complete() {
                return Some(std::mem::replace(&mut self.current, Message::new()));
            }
            // Otherwise the message spans into the next buffer, if any.
        }
    }

    /// Reclaim the next buffer that has been fully consumed and is no
    /// longer referenced by this reader.
    pub fn get_depleted(&mut self) -> Option<&'buf [u16]> {
        self.depleted.pop()
    }

    /// Whether there are no pending buffers left to decode.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drop any in-flight message and move all pending buffers
    /// (including a partially consumed head buffer) to the depleted
    /// queue, as if nothing had been read from them.
    pub fn reset(&mut self) {
        while let Some(buf) = self.pending.pop() {
            self.depleted.push(buf);
        }
        self.position = 0;
        self.current = Message::new();
    }
}

impl<'buf> Default for Reader<'buf> {
    fn default() -> Self {
        Reader::new()
    }
}

impl<'buf> Iterator for Reader<'buf> {
    type Item = Message;

    fn next(&mut self) -> Option<Message> {
        self.get_message()
    }
}
