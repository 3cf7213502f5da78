//! In-memory duplex byte pipe.
//!
//! Lets sessions and transports run against something other than a socket.
//! Reads return whatever has arrived (at least one byte), so callers see the
//! same short reads a TCP stream produces. Dropping one end reads as EOF on
//! the other.

use std::io::{self, Read, Write};
use std::sync::mpsc::{channel, Receiver, RecvError, SendError, Sender, TryRecvError};

pub struct MpscStream {
    sender: Sender<u8>,
    receiver: Receiver<u8>,
}

impl MpscStream {
    pub fn new_pair() -> (MpscStream, MpscStream) {
        let (send1, recv1) = channel();
        let (send2, recv2) = channel();
        (
            MpscStream {
                sender: send1,
                receiver: recv2,
            },
            MpscStream {
                sender: send2,
                receiver: recv1,
            },
        )
    }
}

impl Read for MpscStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let Some((first, rest)) = buf.split_first_mut() else {
            return Ok(0);
        };

        match self.receiver.recv() {
            Ok(data) => *first = data,
            Err(RecvError) => return Ok(0),
        }

        let mut n = 1;
        for b in rest.iter_mut() {
            match self.receiver.try_recv() {
                Ok(data) => {
                    *b = data;
                    n += 1;
                }
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }

        Ok(n)
    }
}

impl Write for MpscStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        for b in buf.iter() {
            match self.sender.send(*b) {
                Ok(()) => {}
                Err(SendError(_)) => {
                    return Err(io::Error::new(
                        io::ErrorKind::BrokenPipe,
                        "Cannot send data: channel disconnected",
                    ))
                }
            }
        }

        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
