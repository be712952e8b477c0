//! Multipart messages.
//!
//! A `Message` is an ordered sequence of binary parts. Parts are
//! reference-counted `Bytes`, so moving a message into a Transport never
//! copies payload data.

use bytes::Bytes;

/// An ordered sequence of frames sent or received as one logical unit.
///
/// # Examples
///
/// ```
/// use plexus_core::message::Message;
///
/// let msg = Message::new()
///     .push_str("topic")
///     .push(&b"payload"[..]);
/// assert_eq!(msg.parts(), 2);
/// assert_eq!(msg.get_str(0), Some("topic"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    parts: Vec<Bytes>,
}

impl Message {
    /// Create a new empty message.
    #[must_use]
    pub const fn new() -> Self {
        Self { parts: Vec::new() }
    }

    /// Create a message with room for `capacity` parts.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            parts: Vec::with_capacity(capacity),
        }
    }

    /// Create a message from existing parts.
    #[must_use]
    pub const fn from_parts(parts: Vec<Bytes>) -> Self {
        Self { parts }
    }

    /// Append a part, builder style.
    #[must_use]
    pub fn push(mut self, part: impl Into<Bytes>) -> Self {
        self.parts.push(part.into());
        self
    }

    /// Append a UTF-8 string part, builder style.
    #[must_use]
    pub fn push_str(mut self, s: &str) -> Self {
        self.parts.push(Bytes::copy_from_slice(s.as_bytes()));
        self
    }

    /// Append an empty part, builder style.
    ///
    /// Empty parts delimit routing envelopes.
    #[must_use]
    pub fn push_empty(mut self) -> Self {
        self.parts.push(Bytes::new());
        self
    }

    /// Append a big-endian u32 part, builder style.
    #[must_use]
    pub fn push_u32(mut self, value: u32) -> Self {
        self.parts.push(Bytes::copy_from_slice(&value.to_be_bytes()));
        self
    }

    /// Append a big-endian u64 part, builder style.
    #[must_use]
    pub fn push_u64(mut self, value: u64) -> Self {
        self.parts.push(Bytes::copy_from_slice(&value.to_be_bytes()));
        self
    }

    /// Append a part in place.
    pub fn add(&mut self, part: impl Into<Bytes>) {
        self.parts.push(part.into());
    }

    /// Number of parts.
    #[must_use]
    pub fn parts(&self) -> usize {
        self.parts.len()
    }

    /// Same as [`parts`](Self::parts).
    #[must_use]
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Total payload size across all parts.
    #[must_use]
    pub fn size(&self) -> usize {
        self.parts.iter().map(Bytes::len).sum()
    }

    /// Borrow the part at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Bytes> {
        self.parts.get(index)
    }

    /// Borrow the part at `index` as UTF-8, if it is valid UTF-8.
    #[must_use]
    pub fn get_str(&self, index: usize) -> Option<&str> {
        self.parts
            .get(index)
            .and_then(|p| std::str::from_utf8(p).ok())
    }

    /// Borrow all parts.
    #[must_use]
    pub fn frames(&self) -> &[Bytes] {
        &self.parts
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Bytes> {
        self.parts.iter()
    }

    /// Drop every part.
    pub fn clear(&mut self) {
        self.parts.clear();
    }

    /// Move the contents out, leaving this message empty.
    ///
    /// This is a swap with an empty message; no part is copied.
    #[must_use]
    pub fn take(&mut self) -> Message {
        std::mem::take(self)
    }

    /// Consume the message and return its parts.
    #[must_use]
    pub fn into_parts(self) -> Vec<Bytes> {
        self.parts
    }
}

impl From<Vec<Bytes>> for Message {
    fn from(parts: Vec<Bytes>) -> Self {
        Self::from_parts(parts)
    }
}

impl From<Message> for Vec<Bytes> {
    fn from(msg: Message) -> Self {
        msg.into_parts()
    }
}

impl FromIterator<Bytes> for Message {
    fn from_iter<I: IntoIterator<Item = Bytes>>(iter: I) -> Self {
        Self::from_parts(iter.into_iter().collect())
    }
}

impl IntoIterator for Message {
    type Item = Bytes;
    type IntoIter = std::vec::IntoIter<Bytes>;

    fn into_iter(self) -> Self::IntoIter {
        self.parts.into_iter()
    }
}

impl<'a> IntoIterator for &'a Message {
    type Item = &'a Bytes;
    type IntoIter = std::slice::Iter<'a, Bytes>;

    fn into_iter(self) -> Self::IntoIter {
        self.parts.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_message() {
        let msg = Message::new();
        assert_eq!(msg.parts(), 0);
        assert!(msg.is_empty());
        assert_eq!(msg.size(), 0);
    }

    #[test]
    fn test_build_message() {
        let msg = Message::new()
            .push_str("topic")
            .push_str("Hello")
            .push(Vec::from(&b"World"[..]));

        assert_eq!(msg.parts(), 3);
        assert_eq!(msg.size(), 15);

        let parts = msg.into_parts();
        assert_eq!(parts[0], Bytes::from_static(b"topic"));
        assert_eq!(parts[1], Bytes::from_static(b"Hello"));
        assert_eq!(parts[2], Bytes::from_static(b"World"));
    }

    #[test]
    fn test_push_integers() {
        let msg = Message::new().push_u32(12345).push_u64(67890);

        let val32 = u32::from_be_bytes(msg.get(0).unwrap().as_ref().try_into().unwrap());
        assert_eq!(val32, 12345);

        let val64 = u64::from_be_bytes(msg.get(1).unwrap().as_ref().try_into().unwrap());
        assert_eq!(val64, 67890);
    }

    #[test]
    fn test_take_leaves_empty() {
        let mut msg = Message::new().push_str("a").push_empty();
        let taken = msg.take();
        assert!(msg.is_empty());
        assert_eq!(taken.parts(), 2);
        assert!(taken.get(1).unwrap().is_empty());
    }

    #[test]
    fn test_get_str_rejects_binary() {
        let mut msg = Message::new();
        msg.add(vec![0xff, 0xfe]);
        msg.add("ok");
        assert_eq!(msg.get_str(0), None);
        assert_eq!(msg.get_str(1), Some("ok"));
        assert_eq!(msg.get_str(2), None);
    }
}
