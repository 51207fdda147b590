pub mod msg;
mod receiver;
mod sender;

use tokio::io::{AsyncRead, AsyncWrite};

pub use receiver::MsgReceiver;
pub use sender::MsgSender;

type LenType = u64;
const LEN_TYPE_SIZE: usize = size_of::<LenType>();

/// Upper bound on a single frame, large enough for any realistic
/// parameter snapshot but small enough to reject garbage length prefixes.
const MAX_FRAME_SIZE: usize = 64 * 1024 * 1024;

/// Creates both `MsgReceiver` and `MsgSender` network channel parts.
///
/// Given a reader and writer creates and returns both ends of the communication.
///
/// # Arguments
/// * `rx` - An async readable.
/// * `tx` - An async writable.
///
/// # Returns
/// A communication stream in the form of a receiver and sender pair.
pub fn channel<R, W>(rx: R, tx: W) -> (MsgReceiver<R>, MsgSender<W>)
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    (MsgReceiver::new(rx), MsgSender::new(tx))
}
