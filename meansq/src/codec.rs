//! Fixed-size wire encoding of the two protocol messages.
//!
//! Every message is exactly [`MSG_SIZE`] bytes with no header: a request is a
//! big-endian two's-complement `i32`, a response is the IEEE-754 bit pattern
//! of an `f32` written as a big-endian `u32`.

use crate::error::Error;
use bincode::Options;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::ops::RangeInclusive;

pub const MSG_SIZE: usize = 4;

/// Raw bytes of one message as they travel on the wire.
pub type Frame = [u8; MSG_SIZE];

/// Values the service accepts; anything else is dropped without a reply.
pub const VALID_RANGE: RangeInclusive<i32> = 0..=1023;

fn wire_options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_big_endian()
        .with_fixint_encoding()
}

pub trait Message: Sized {
    fn encode(&self) -> Result<Frame, Error>;

    fn decode(frame: &Frame) -> Result<Self, Error>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request(pub i32);

impl Request {
    pub fn is_valid(&self) -> bool {
        VALID_RANGE.contains(&self.0)
    }
}

/// Mean of squares sent back for an accepted request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Response(pub f32);

impl From<f64> for Response {
    fn from(mean: f64) -> Response {
        Response(mean as f32)
    }
}

impl Message for Request {
    fn encode(&self) -> Result<Frame, Error> {
        encode_fixed(self)
    }

    fn decode(frame: &Frame) -> Result<Self, Error> {
        decode_fixed(frame)
    }
}

impl Message for Response {
    fn encode(&self) -> Result<Frame, Error> {
        encode_fixed(self)
    }

    fn decode(frame: &Frame) -> Result<Self, Error> {
        decode_fixed(frame)
    }
}

fn encode_fixed<T: Serialize>(value: &T) -> Result<Frame, Error> {
    let bytes = wire_options()
        .serialize(value)
        .map_err(Error::MsgSerFailed)?;
    let actual = bytes.len();
    bytes.try_into().map_err(|_| Error::MsgSizeMismatch {
        expected: MSG_SIZE,
        actual,
    })
}

fn decode_fixed<T: DeserializeOwned>(frame: &Frame) -> Result<T, Error> {
    wire_options()
        .deserialize(frame)
        .map_err(Error::MsgDeserFailed)
}

pub fn encode_request(value: i32) -> Result<Frame, Error> {
    Request(value).encode()
}

pub fn decode_request(frame: &Frame) -> Result<i32, Error> {
    Request::decode(frame).map(|r| r.0)
}

pub fn encode_response(mean: f32) -> Result<Frame, Error> {
    Response(mean).encode()
}

pub fn decode_response(frame: &Frame) -> Result<f32, Error> {
    Response::decode(frame).map(|r| r.0)
}
