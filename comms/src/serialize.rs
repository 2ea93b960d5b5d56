pub trait Serialize<'a> {
    /// Writes the fixed-size part of the message into `buf` and optionally
    /// returns a borrowed tail to be written after it without copying.
    fn serialize(&'a self, buf: &mut Vec<u8>) -> Option<&'a [u8]>;
}
