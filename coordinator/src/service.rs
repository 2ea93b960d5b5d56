use std::{
    borrow::Cow,
    collections::{HashMap, hash_map::Entry},
    io,
    sync::Arc,
};

use comms::{
    SageReceiver, SageSender,
    msg::{Command, Msg, Payload, ReduceOp},
};
use log::{debug, info, warn};
use parking_lot::Mutex;
use tokio::{
    io::{AsyncRead, AsyncWrite},
    sync::oneshot,
    task::JoinSet,
};

/// One in-flight reduction: merged contributions plus the waiters to notify
/// when the last one arrives.
struct Round {
    op: ReduceOp,
    acc: Vec<i64>,
    contributions: usize,
    waiters: Vec<oneshot::Sender<Vec<i64>>>,
}

/// Shared aggregation table, keyed by call sequence number.
struct Table {
    world_size: usize,
    rounds: Mutex<HashMap<u64, Round>>,
}

enum Contribution {
    Wait(oneshot::Receiver<Vec<i64>>),
    Done(Vec<i64>),
}

impl Table {
    /// Merges one worker's contribution into round `seq`.
    ///
    /// The completing contribution retires the round and fans the result out
    /// to every earlier waiter.
    ///
    /// # Errors
    /// Returns an error when workers disagree on the operator or the length
    /// of a round; both are protocol violations and fatal to the run.
    fn contribute(&self, seq: u64, op: ReduceOp, values: &[i64]) -> io::Result<Contribution> {
        let mut rounds = self.rounds.lock();

        let round = match rounds.entry(seq) {
            Entry::Vacant(e) => e.insert(Round {
                op,
                acc: values.to_vec(),
                contributions: 1,
                waiters: Vec::new(),
            }),
            Entry::Occupied(e) => {
                let round = e.into_mut();

                if round.op != op {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("reduce op disagreement at seq {seq}"),
                    ));
                }
                if round.acc.len() != values.len() {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!(
                            "reduce length disagreement at seq {seq}: got {}, expected {}",
                            values.len(),
                            round.acc.len()
                        ),
                    ));
                }

                for (a, v) in round.acc.iter_mut().zip(values) {
                    *a = op.combine(*a, *v);
                }
                round.contributions += 1;
                round
            }
        };

        if round.contributions < self.world_size {
            let (tx, rx) = oneshot::channel();
            round.waiters.push(tx);
            return Ok(Contribution::Wait(rx));
        }

        // The entry was inserted or updated just above.
        let round = rounds.remove(&seq).unwrap();
        for waiter in round.waiters {
            // A dropped receiver means that connection already failed; its
            // own task reports the error.
            let _ = waiter.send(round.acc.clone());
        }

        Ok(Contribution::Done(round.acc))
    }
}

/// The rendezvous service: merges each collective call across every
/// connected trainer and broadcasts the agreed result back.
pub struct Rendezvous {
    tasks: JoinSet<io::Result<()>>,
    table: Arc<Table>,
    joined: Arc<Mutex<Vec<bool>>>,
}

impl Rendezvous {
    /// Creates a new `Rendezvous` for a group of `world_size` trainers.
    ///
    /// # Panics
    /// - if `world_size` is zero
    pub fn new(world_size: usize) -> Self {
        assert!(world_size > 0, "world_size must be > 0");

        Self {
            tasks: JoinSet::new(),
            table: Arc::new(Table {
                world_size,
                rounds: Mutex::new(HashMap::new()),
            }),
            joined: Arc::new(Mutex::new(vec![false; world_size])),
        }
    }

    /// Waits until every connection task finishes.
    ///
    /// # Returns
    /// Returns `Ok(())` once all trainers disconnected gracefully; the first
    /// task error aborts the run instead.
    pub async fn run(&mut self) -> io::Result<()> {
        while let Some(res) = self.tasks.join_next().await {
            res??
        }

        Ok(())
    }

    /// Binds a new trainer connection to this service and spawns its serving
    /// task.
    ///
    /// # Arguments
    /// * `rx` - The receiving end of the communication.
    /// * `tx` - The sending end of the communication.
    pub fn spawn<R, W>(&mut self, mut rx: SageReceiver<R>, mut tx: SageSender<W>)
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let table = Arc::clone(&self.table);
        let joined = Arc::clone(&self.joined);

        let task = async move {
            let rank = handshake(&mut rx, &mut tx, &joined).await?;
            serve(rank, &table, &mut rx, &mut tx).await
        };

        self.tasks.spawn(task);
    }
}

/// Validates the join handshake: first message must claim an unused rank
/// within the group.
async fn handshake<R, W>(
    rx: &mut SageReceiver<R>,
    tx: &mut SageSender<W>,
    joined: &Mutex<Vec<bool>>,
) -> io::Result<usize>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let rank = match rx.recv().await? {
        Msg::Control(Command::Join { rank }) => rank,
        msg => {
            let text = format!("Expected a join handshake, got: {msg:?}");
            return reject(tx, text).await;
        }
    };

    let taken = {
        let mut joined = joined.lock();
        match joined.get_mut(rank) {
            Some(slot) if !*slot => {
                *slot = true;
                None
            }
            Some(_) => Some(format!("rank {rank} already joined")),
            None => Some(format!("rank {rank} out of range")),
        }
    };

    if let Some(text) = taken {
        return reject(tx, text).await;
    }

    info!(rank = rank; "trainer joined");
    Ok(rank)
}

/// Serves one trainer's collective calls until it disconnects.
async fn serve<R, W>(
    rank: usize,
    table: &Table,
    rx: &mut SageReceiver<R>,
    tx: &mut SageSender<W>,
) -> io::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    loop {
        let contribution = match rx.recv().await? {
            Msg::Data(Payload::Reduce { seq, op, values }) => {
                debug!(rank = rank, seq = seq; "contribution received");
                (seq, table.contribute(seq, op, values)?)
            }
            Msg::Control(Command::Disconnect) => {
                info!(rank = rank; "trainer disconnected");
                return Ok(());
            }
            other => {
                warn!("unexpected message from rank {rank}: {other:?}");
                return unexpected_message_kind(other);
            }
        };

        let (seq, reduced) = match contribution {
            (seq, Contribution::Done(values)) => (seq, values),
            (seq, Contribution::Wait(waiter)) => {
                let values = waiter
                    .await
                    .map_err(|_| io::Error::other("reduction abandoned: a peer task failed"))?;
                (seq, values)
            }
        };

        let msg = Msg::Data(Payload::Reduced {
            seq,
            values: &reduced,
        });
        tx.send(&msg).await?;
    }
}

/// Reports `text` to the trainer, then fails the connection task with it.
async fn reject<W, T>(tx: &mut SageSender<W>, text: String) -> io::Result<T>
where
    W: AsyncWrite + Unpin,
{
    {
        let msg = Msg::Err(Cow::Borrowed(text.as_str()));
        tx.send(&msg).await?;
    }

    Err(io::Error::new(io::ErrorKind::InvalidData, text))
}

/// Creates an error for when an unexpected message kind is received.
fn unexpected_message_kind<U>(msg: Msg<'_>) -> io::Result<U> {
    Err(io::Error::new(
        io::ErrorKind::InvalidData,
        format!("Received an unexpected message kind, got: {msg:?}"),
    ))
}
