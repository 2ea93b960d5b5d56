use comms::{
    SageReceiver, SageSender,
    msg::{Command, Msg, Payload},
};
use log::debug;
use tokio::io::{AsyncRead, AsyncWrite};

use super::{Collective, ReduceOp};
use crate::error::{Result, TrainerErr};

/// A participant's handle into a coordinator-backed collective group.
///
/// Contributions are sequence numbered; the coordinator merges call `seq`
/// from every participant and sends the agreed result back. The sequence
/// counter advances identically on every rank as long as each rank issues
/// its collective calls in the same order.
pub struct RemoteGroup<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    rank: usize,
    world_size: usize,
    seq: u64,
    rx: SageReceiver<R>,
    tx: SageSender<W>,
}

impl<R, W> RemoteGroup<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Performs the join handshake and returns a ready-to-use handle.
    ///
    /// # Arguments
    /// * `rank` - This participant's rank.
    /// * `world_size` - Total number of participants the coordinator expects.
    /// * `rx` - The receiving end of the coordinator channel.
    /// * `tx` - The sending end of the coordinator channel.
    ///
    /// # Returns
    /// A new `RemoteGroup` instance.
    pub async fn join(
        rank: usize,
        world_size: usize,
        rx: SageReceiver<R>,
        tx: SageSender<W>,
    ) -> Result<Self> {
        let mut group = Self {
            rank,
            world_size,
            seq: 0,
            rx,
            tx,
        };

        let msg = Msg::Control(Command::Join { rank });
        group.tx.send(&msg).await?;
        debug!(rank = rank; "joined the collective group");

        Ok(group)
    }

    /// Tells the coordinator this participant is done.
    pub async fn leave(mut self) -> Result<()> {
        let msg = Msg::Control(Command::Disconnect);
        self.tx.send(&msg).await?;
        Ok(())
    }
}

impl<R, W> Collective for RemoteGroup<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    fn rank(&self) -> usize {
        self.rank
    }

    fn world_size(&self) -> usize {
        self.world_size
    }

    async fn all_reduce(&mut self, values: &mut [i64], op: ReduceOp) -> Result<()> {
        let seq = self.seq;
        self.seq += 1;

        {
            let msg = Msg::Data(Payload::Reduce {
                seq,
                op,
                values: &*values,
            });
            self.tx.send(&msg).await?;
        }
        debug!(seq = seq; "sent contribution");

        match self.rx.recv().await? {
            Msg::Data(Payload::Reduced {
                seq: got,
                values: reduced,
            }) if got == seq => {
                if reduced.len() != values.len() {
                    return Err(TrainerErr::ReduceLengthMismatch {
                        seq,
                        got: reduced.len(),
                        expected: values.len(),
                    });
                }

                values.copy_from_slice(reduced);
                Ok(())
            }
            Msg::Err(detail) => Err(TrainerErr::Rejected {
                detail: detail.into_owned(),
            }),
            other => Err(TrainerErr::UnexpectedMessage {
                seq,
                got: msg_kind(&other),
            }),
        }
    }

    async fn barrier(&mut self) -> Result<()> {
        let mut token = [0i64];
        self.all_reduce(&mut token, ReduceOp::Max).await
    }
}

fn msg_kind(msg: &Msg<'_>) -> &'static str {
    match msg {
        Msg::Control(_) => "control",
        Msg::Err(_) => "err",
        Msg::Data(Payload::Reduce { .. }) => "data/reduce",
        Msg::Data(Payload::Reduced { .. }) => "data/reduced",
    }
}
