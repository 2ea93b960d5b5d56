mod align;
mod deserialize;
pub mod msg;
mod receiver;
mod sender;
mod serialize;

use tokio::io::{AsyncRead, AsyncWrite};

pub use align::{Align1, Align8};
pub use deserialize::Deserialize;
pub use receiver::SageReceiver;
pub use sender::SageSender;
pub use serialize::Serialize;

type LenType = u64;
const LEN_TYPE_SIZE: usize = size_of::<LenType>();

/// Creates both `SageReceiver` and `SageSender` network channel parts.
///
/// Given a writer and reader creates and returns both ends of the communication.
///
/// # Arguments
/// * `rx` - An async readable.
/// * `tx` - An async writable.
///
/// # Returns
/// A communication stream in the form of a sage receiver and sender.
pub fn channel<R, W>(rx: R, tx: W) -> (SageReceiver<R>, SageSender<W>)
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    (SageReceiver::new(rx), SageSender::new(tx))
}
