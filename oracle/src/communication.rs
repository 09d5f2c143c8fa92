use std::io::{BufRead, BufReader, Write};
use std::net::{TcpStream, ToSocketAddrs};

use failure::Error;

use crate::HIDDEN;

#[derive(Debug, Fail)]
pub enum ProtocolError {
    #[fail(display = "connection closed while waiting for {}", expecting)]
    ConnectionClosed { expecting: &'static str },

    #[fail(display = "unexpected line: {:?}", line)]
    UnexpectedLine { line: String },

    #[fail(display = "index {} is outside of the revealed draws", index)]
    IndexOutOfRange { index: u32 },
}

pub trait Communicate {
    fn send_line(&mut self, line: &str) -> Result<(), Error>;
    fn receive_line(&mut self) -> Result<Option<String>, Error>;

    fn expect_line(&mut self, expecting: &'static str) -> Result<String, Error> {
        self.receive_line()?
            .ok_or_else(|| ProtocolError::ConnectionClosed { expecting }.into())
    }
}

/// A line-oriented channel over a split reader/writer pair.
pub struct LineStream<R: BufRead, W: Write> {
    reader: R,
    writer: W,
}

impl<R: BufRead, W: Write> LineStream<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        LineStream { reader, writer }
    }

    pub fn into_inner(self) -> (R, W) {
        (self.reader, self.writer)
    }
}

impl LineStream<BufReader<TcpStream>, TcpStream> {
    pub fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self, Error> {
        Self::from_tcp(TcpStream::connect(addr)?)
    }

    pub fn from_tcp(stream: TcpStream) -> Result<Self, Error> {
        let reader = BufReader::new(stream.try_clone()?);
        Ok(LineStream::new(reader, stream))
    }
}

impl<R: BufRead, W: Write> Communicate for LineStream<R, W> {
    fn send_line(&mut self, line: &str) -> Result<(), Error> {
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }

    fn receive_line(&mut self) -> Result<Option<String>, Error> {
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let trimmed = line.trim_end_matches(&['\r', '\n'][..]);
        Ok(Some(trimmed.to_string()))
    }
}

/// Parses one line of the reveal phase: a decimal value or the hidden marker.
pub fn parse_reveal_line(line: &str) -> Result<Option<u32>, Error> {
    let line = line.trim();
    if line == HIDDEN {
        return Ok(None);
    }
    line.parse::<u32>().map(Some).map_err(|_| {
        ProtocolError::UnexpectedLine {
            line: line.to_string(),
        }
        .into()
    })
}

pub fn parse_number(line: &str) -> Result<u32, Error> {
    line.trim().parse::<u32>().map_err(|_| {
        ProtocolError::UnexpectedLine {
            line: line.to_string(),
        }
        .into()
    })
}
