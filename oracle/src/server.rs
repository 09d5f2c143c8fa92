use std::net::{SocketAddr, TcpListener};
use std::thread;

use failure::Error;
use rand::Rng;

use mersenne::GeneratorState;

use crate::communication::{parse_number, Communicate, LineStream, ProtocolError};
use crate::{HIDDEN, REVEALED_DRAWS};

pub const GREETING: &str = "Pick two indices (0 <= index < 2019) and guess the 2020th number!";
pub const REJECTION: &str = "Wrong! Better luck next year.";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    Accepted,
    Rejected,
}

/// The game server. The seed is the secret the client tries to recover.
pub struct Challenge {
    seed: u32,
    flag: String,
}

impl Challenge {
    pub fn new(seed: u32, flag: &str) -> Challenge {
        Challenge {
            seed,
            flag: flag.to_string(),
        }
    }

    /// A challenge with a hidden seed drawn uniformly from `0..seed_bound`.
    pub fn with_random_seed(seed_bound: u32, flag: &str) -> Result<Challenge, Error> {
        ensure!(seed_bound > 0, "seed bound must be positive");
        let mut rng = rand::thread_rng();
        Ok(Challenge::new(rng.gen_range(0..seed_bound), flag))
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    pub fn handle_client<T: Communicate>(&self, stream: &mut T) -> Result<Verdict, Error> {
        stream.send_line(GREETING)?;
        let first = parse_number(&stream.expect_line("first index")?)?;
        let second = parse_number(&stream.expect_line("second index")?)?;
        for &index in &[first, second] {
            if index >= REVEALED_DRAWS {
                stream.send_line("Invalid index.")?;
                return Err(ProtocolError::IndexOutOfRange { index }.into());
            }
        }

        let mut generator = GeneratorState::new(self.seed);
        for index in 0..REVEALED_DRAWS {
            let value = generator.next_u32();
            if index == first || index == second {
                stream.send_line(&value.to_string())?;
            } else {
                stream.send_line(HIDDEN)?;
            }
        }

        let expected = generator.next_u32();
        let guess = parse_number(&stream.expect_line("guess")?)?;
        if guess == expected {
            tracing::info!("client guessed the target draw");
            stream.send_line(&self.flag)?;
            Ok(Verdict::Accepted)
        } else {
            tracing::info!(guess, expected, "client guessed wrong");
            stream.send_line(REJECTION)?;
            Ok(Verdict::Rejected)
        }
    }
}

/// Serves a single client on a loopback port chosen by the OS.
pub fn spawn_local(
    challenge: Challenge,
) -> Result<(SocketAddr, thread::JoinHandle<Result<Verdict, Error>>), Error> {
    let listener = TcpListener::bind(("127.0.0.1", 0))?;
    let addr = listener.local_addr()?;
    tracing::debug!(%addr, "local game server listening");
    let handle = thread::spawn(move || -> Result<Verdict, Error> {
        let (stream, _) = listener.accept()?;
        let mut stream = LineStream::from_tcp(stream)?;
        challenge.handle_client(&mut stream)
    });
    Ok((addr, handle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn play(challenge: &Challenge, input: &str) -> (Result<Verdict, Error>, Vec<String>) {
        let mut stream = LineStream::new(Cursor::new(input.as_bytes().to_vec()), Vec::new());
        let verdict = challenge.handle_client(&mut stream);
        let (_, written) = stream.into_inner();
        let lines = String::from_utf8(written)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect();
        (verdict, lines)
    }

    #[test]
    fn reveals_only_chosen_indices() {
        let challenge = Challenge::new(12345, "flag{test}");
        let (verdict, lines) = play(&challenge, "0\n5\n0\n");
        assert_eq!(verdict.unwrap(), Verdict::Rejected);
        assert_eq!(lines.len(), 1 + REVEALED_DRAWS as usize + 1);

        let outputs: Vec<u32> = GeneratorState::new(12345).take(6).collect();
        assert_eq!(lines[1], outputs[0].to_string());
        assert_eq!(lines[2], HIDDEN);
        assert_eq!(lines[6], outputs[5].to_string());
        assert_eq!(lines.last().unwrap(), REJECTION);
    }

    #[test]
    fn accepts_the_right_guess() {
        let challenge = Challenge::new(7, "flag{right}");
        let target = GeneratorState::new(7).nth(REVEALED_DRAWS as usize).unwrap();
        let (verdict, lines) = play(&challenge, &format!("0\n1\n{}\n", target));
        assert_eq!(verdict.unwrap(), Verdict::Accepted);
        assert_eq!(lines.last().unwrap(), "flag{right}");
    }

    #[test]
    fn rejects_out_of_range_index() {
        let challenge = Challenge::new(7, "flag");
        let (verdict, _) = play(&challenge, "0\n2019\n");
        assert!(verdict.is_err());
    }

    #[test]
    fn random_seed_respects_bound() {
        for _ in 0..20 {
            assert!(Challenge::with_random_seed(10, "flag").unwrap().seed() < 10);
        }
        assert_eq!(Challenge::with_random_seed(1, "flag").unwrap().seed(), 0);
    }

    #[test]
    fn zero_seed_bound_is_rejected() {
        assert!(Challenge::with_random_seed(0, "flag").is_err());
    }
}
