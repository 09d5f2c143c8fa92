use failure::Error;

use crate::communication::{parse_reveal_line, Communicate, ProtocolError};
use crate::REVEALED_DRAWS;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Reveal {
    pub index: u32,
    pub value: u32,
}

pub struct GameClient<T: Communicate> {
    stream: T,
    greeting: String,
}

impl<T: Communicate> GameClient<T> {
    pub fn new(mut stream: T) -> Result<GameClient<T>, Error> {
        let greeting = stream.expect_line("greeting")?;
        tracing::debug!(%greeting, "connected to game server");
        Ok(GameClient { stream, greeting })
    }

    pub fn greeting(&self) -> &str {
        &self.greeting
    }

    /// Names two draw indices and collects what the server reveals for them.
    pub fn reveal(&mut self, indices: [u32; 2]) -> Result<Vec<Reveal>, Error> {
        for &index in &indices {
            if index >= REVEALED_DRAWS {
                return Err(ProtocolError::IndexOutOfRange { index }.into());
            }
            self.stream.send_line(&index.to_string())?;
        }

        let mut reveals = Vec::with_capacity(indices.len());
        for index in 0..REVEALED_DRAWS {
            let line = self.stream.expect_line("revealed draw")?;
            if let Some(value) = parse_reveal_line(&line)? {
                tracing::debug!(index, value, "revealed");
                reveals.push(Reveal { index, value });
            }
        }
        ensure!(
            !reveals.is_empty(),
            "server did not reveal any of the requested draws"
        );
        Ok(reveals)
    }

    /// Sends the guess and returns the server's verdict line. Nothing after
    /// it is read, so a server that keeps the connection open cannot stall us.
    pub fn guess(&mut self, value: u32) -> Result<String, Error> {
        self.stream.send_line(&value.to_string())?;
        self.stream.expect_line("verdict")
    }
}
