use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("cannot start server")]
    ServerFailedToStart(#[source] io::Error),
    #[error("message serialization failed")]
    MsgSerFailed(#[source] bincode::Error),
    #[error("message deserialization failed")]
    MsgDeserFailed(#[source] bincode::Error),
    #[error("encoded message is {actual} bytes, expected {expected}")]
    MsgSizeMismatch { expected: usize, actual: usize },
    #[error("cannot read message raw data")]
    CannotReadMsgRawData(#[source] io::Error),
    #[error("cannot write message raw data")]
    CannotWriteMsgRawData(#[source] io::Error),
    #[error("message truncated after {received} of {expected} bytes")]
    TruncatedMsg { received: usize, expected: usize },
    #[error("peer closed the connection")]
    PeerClosed,
    #[error("value {0} is outside the accepted range")]
    ValueOutOfRange(i32),
    #[error("incoming connection error")]
    IncomingConnectionError(#[source] io::Error),
    #[error("outgoing connection error")]
    OutgoingConnectionError(#[source] io::Error),
    #[error("snapshot of {0} entries does not fit the count field")]
    SnapshotTooLarge(usize),
    #[error("malformed snapshot: {0}")]
    MalformedSnapshot(String),
    #[error("cannot write snapshot {path}")]
    SnapshotWriteFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot spawn thread")]
    ThreadSpawnFailed(#[source] io::Error),
    #[error("cannot install stop signal handler")]
    SignalHandlerFailed(#[source] ctrlc::Error),
    #[error("cannot open log file {path}")]
    LogFileUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot initialize logging")]
    LoggerInitFailed(#[source] tracing_subscriber::util::TryInitError),
}
