use std::{borrow::Cow, io};

use crate::{Deserialize, Serialize};

type Header = u64;
const HEADER_SIZE: usize = size_of::<Header>();

const SEQ_SIZE: usize = size_of::<u64>();
const OP_SIZE: usize = size_of::<u64>();

/// Element-wise reduction operator agreed on by every participant of a
/// collective call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReduceOp {
    Max,
    Sum,
    Min,
}

impl ReduceOp {
    /// Combines two elements under this operator.
    #[inline]
    pub fn combine(self, a: i64, b: i64) -> i64 {
        match self {
            ReduceOp::Max => a.max(b),
            ReduceOp::Sum => a + b,
            ReduceOp::Min => a.min(b),
        }
    }

    fn code(self) -> u64 {
        match self {
            ReduceOp::Max => 0,
            ReduceOp::Sum => 1,
            ReduceOp::Min => 2,
        }
    }

    fn from_code(code: u64) -> io::Result<Self> {
        match code {
            0 => Ok(ReduceOp::Max),
            1 => Ok(ReduceOp::Sum),
            2 => Ok(ReduceOp::Min),
            other => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Received an invalid reduce op code {other}"),
            )),
        }
    }
}

/// The payload data for the `Data` variant of the `Msg` enum.
#[derive(Debug)]
pub enum Payload<'a> {
    /// One worker's contribution to collective call `seq`.
    Reduce {
        seq: u64,
        op: ReduceOp,
        values: &'a [i64],
    },
    /// The agreed result of collective call `seq`, identical for every
    /// participant.
    Reduced { seq: u64, values: &'a [i64] },
}

/// The command for the `Control` variant of the `Msg` enum.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    Join { rank: usize },
    Disconnect,
}

/// The application layer message for the coordination plane.
#[derive(Debug)]
pub enum Msg<'a> {
    Control(Command),
    Data(Payload<'a>),
    Err(Cow<'a, str>),
}

impl Msg<'_> {
    fn buf_is_too_small<T>(size: usize, needed: usize) -> io::Result<T> {
        Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("The given buffer is too small {size}, must at least be {needed} bytes"),
        ))
    }

    fn invalid_kind_byte<T>(byte: u64) -> io::Result<T> {
        Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Received an invalid kind byte {byte}"),
        ))
    }

    fn misaligned_values<T>(err: bytemuck::PodCastError) -> io::Result<T> {
        Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("The values tail cannot be viewed as node ids: {err}"),
        ))
    }
}

impl<'a> Serialize<'a> for Msg<'a> {
    fn serialize(&'a self, buf: &mut Vec<u8>) -> Option<&'a [u8]> {
        match self {
            Msg::Err(e) => {
                let header = (0 as Header).to_be_bytes();
                buf.extend_from_slice(&header);
                Some(e.as_bytes())
            }
            Msg::Control(cmd) => {
                let header = (1 as Header).to_be_bytes();
                buf.extend_from_slice(&header);

                // SAFETY: Serialize impl for `Command` is derived and not implemented
                //         by hand. Nor has a non string-key map inside.
                serde_json::to_writer(buf, &cmd).unwrap();
                None
            }
            Msg::Data(Payload::Reduce { seq, op, values }) => {
                let header = (2 as Header).to_be_bytes();
                buf.extend_from_slice(&header);
                buf.extend_from_slice(&seq.to_be_bytes());
                buf.extend_from_slice(&op.code().to_be_bytes());
                Some(bytemuck::cast_slice(*values))
            }
            Msg::Data(Payload::Reduced { seq, values }) => {
                let header = (3 as Header).to_be_bytes();
                buf.extend_from_slice(&header);
                buf.extend_from_slice(&seq.to_be_bytes());
                Some(bytemuck::cast_slice(*values))
            }
        }
    }
}

impl<'a> Deserialize<'a> for Msg<'a> {
    fn deserialize(buf: &'a mut [u8]) -> io::Result<Self> {
        let total = buf.len();
        if total < HEADER_SIZE {
            return Self::buf_is_too_small(total, HEADER_SIZE);
        }

        let (kind_buf, rest) = buf.split_at_mut(HEADER_SIZE);

        // SAFETY: We splitted the buffer to be of size `HEADER_SIZE` just above.
        let kind = Header::from_be_bytes(kind_buf.try_into().unwrap());

        match kind {
            0 => {
                let string = str::from_utf8(rest)
                    .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;

                Ok(Self::Err(Cow::Borrowed(string)))
            }
            1 => {
                let cmd = serde_json::from_slice(rest)?;
                Ok(Self::Control(cmd))
            }
            2 => {
                if rest.len() < SEQ_SIZE + OP_SIZE {
                    return Self::buf_is_too_small(total, HEADER_SIZE + SEQ_SIZE + OP_SIZE);
                }

                let (seq_buf, rest) = rest.split_at_mut(SEQ_SIZE);
                let (op_buf, tail) = rest.split_at_mut(OP_SIZE);

                let seq = u64::from_be_bytes(seq_buf.try_into().unwrap());
                let op = ReduceOp::from_code(u64::from_be_bytes(op_buf.try_into().unwrap()))?;

                // The 8-byte header plus the 16-byte prelude keep the tail
                // aligned as long as the receive buffer itself is.
                let values =
                    bytemuck::try_cast_slice(&*tail).or_else(Self::misaligned_values)?;

                Ok(Self::Data(Payload::Reduce { seq, op, values }))
            }
            3 => {
                if rest.len() < SEQ_SIZE {
                    return Self::buf_is_too_small(total, HEADER_SIZE + SEQ_SIZE);
                }

                let (seq_buf, tail) = rest.split_at_mut(SEQ_SIZE);
                let seq = u64::from_be_bytes(seq_buf.try_into().unwrap());

                let values =
                    bytemuck::try_cast_slice(&*tail).or_else(Self::misaligned_values)?;

                Ok(Self::Data(Payload::Reduced { seq, values }))
            }
            byte => Self::invalid_kind_byte(byte),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reduce_op_combines() {
        assert_eq!(ReduceOp::Max.combine(3, 7), 7);
        assert_eq!(ReduceOp::Sum.combine(3, 7), 10);
        assert_eq!(ReduceOp::Min.combine(3, 7), 3);
    }

    #[test]
    fn reduce_op_codes_round_trip() {
        for op in [ReduceOp::Max, ReduceOp::Sum, ReduceOp::Min] {
            assert_eq!(ReduceOp::from_code(op.code()).unwrap(), op);
        }
        assert!(ReduceOp::from_code(9).is_err());
    }
}
