use crate::codec::{Frame, Message, MSG_SIZE};
use crate::error::Error;
use std::io::{self, Read, Write};

pub trait Transport {
    fn receive<M: Message>(&mut self) -> Result<M, Error>;

    fn send<M: Message>(&mut self, msg: &M) -> Result<(), Error>;

    fn send_receive<In: Message, Out: Message>(&mut self, input: &In) -> Result<Out, Error> {
        self.send(input)?;
        self.receive()
    }
}

/// Carries fixed-size messages over a byte stream.
///
/// A single `read` may return fewer bytes than a message; `receive` keeps
/// reading until the whole frame is in `read_buf`.
pub struct FixedFrame<S> {
    stream: S,
    read_buf: Frame,
    write_buf: Frame,
}

impl<S> FixedFrame<S>
where
    S: Read + Write,
{
    pub fn new(stream: S) -> FixedFrame<S> {
        FixedFrame {
            stream,
            read_buf: [0; MSG_SIZE],
            write_buf: [0; MSG_SIZE],
        }
    }

    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    pub fn into_inner(self) -> S {
        self.stream
    }

    fn fill_read_buf(&mut self) -> Result<(), Error> {
        let mut filled = 0;
        while filled < MSG_SIZE {
            match self.stream.read(&mut self.read_buf[filled..]) {
                Ok(0) if filled == 0 => return Err(Error::PeerClosed),
                Ok(0) => {
                    return Err(Error::TruncatedMsg {
                        received: filled,
                        expected: MSG_SIZE,
                    })
                }
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(Error::CannotReadMsgRawData(e)),
            }
        }
        Ok(())
    }
}

impl<S: Read + Write> Transport for FixedFrame<S> {
    fn receive<M: Message>(&mut self) -> Result<M, Error> {
        self.fill_read_buf()?;
        M::decode(&self.read_buf)
    }

    fn send<M: Message>(&mut self, msg: &M) -> Result<(), Error> {
        self.write_buf = msg.encode()?;
        self.stream
            .write_all(&self.write_buf)
            .and_then(|()| self.stream.flush())
            .map_err(Error::CannotWriteMsgRawData)
    }
}
