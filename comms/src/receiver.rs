use std::io;

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::{Align8, Deserialize, LEN_TYPE_SIZE, LenType};

/// The receiving end handle of the communication.
pub struct SageReceiver<R: AsyncRead + Unpin> {
    rx: R,
    buf: Vec<u64>,
}

impl<R: AsyncRead + Unpin> SageReceiver<R> {
    /// Creates a new `SageReceiver` instance.
    ///
    /// # Arguments
    /// * `rx` - The underlying reader.
    pub(super) fn new(rx: R) -> Self {
        Self {
            rx,
            buf: Vec::new(),
        }
    }

    /// Waits to receive a new message into the internal buffer.
    ///
    /// # Returns
    /// A result object that returns `T` on success, tied to the internal
    /// buffer, or `io::Error` on failure.
    pub async fn recv<'s, T: Deserialize<'s>>(&'s mut self) -> io::Result<T> {
        let Self { rx, buf } = self;
        let slice = read_frame(rx, buf).await?;
        T::deserialize(slice)
    }

    /// Waits to receive a new message from the inner receiver.
    ///
    /// # Arguments
    /// * `buf` - The buffer to use for deserialization, the returned
    ///           `T`'s lifetimes will be tied to this buffer.
    ///
    /// # Returns
    /// A result object that returns `T` on success or `io::Error` on failure.
    pub async fn recv_into<'buf, T, B>(&mut self, buf: &'buf mut Vec<B>) -> io::Result<T>
    where
        T: Deserialize<'buf>,
        B: Align8,
    {
        let slice = read_frame(&mut self.rx, buf).await?;
        T::deserialize(slice)
    }
}

/// Reads one length-prefixed frame into `buf` and returns its byte view.
async fn read_frame<'buf, R, B>(rx: &mut R, buf: &'buf mut Vec<B>) -> io::Result<&'buf mut [u8]>
where
    R: AsyncRead + Unpin,
    B: Align8,
{
    let mut size_buf = [0; LEN_TYPE_SIZE];
    rx.read_exact(&mut size_buf).await?;
    let len = LenType::from_be_bytes(size_buf) as usize;

    let b_size = size_of::<B>();
    let needed_amount = len.div_ceil(b_size);

    if buf.capacity() < needed_amount {
        buf.reserve(needed_amount - buf.len());
    }

    // SAFETY: The buffer has capacity for at least the amount of items. These
    //         will be immediatelly overwritten in the read_exact call.
    unsafe { buf.set_len(needed_amount) };

    let view: &mut [u8] = bytemuck::cast_slice_mut(buf.as_mut_slice());
    let slice = &mut view[..len];
    rx.read_exact(slice).await?;

    Ok(slice)
}
