use std::fmt::Debug;

pub use failure::{err_msg, Error};

#[derive(Debug, Fail)]
pub enum CrackError {
    #[fail(display = "invalid search range [{}, {})", lo, hi)]
    InvalidRange { lo: u64, hi: u64 },

    #[fail(display = "no observations supplied")]
    NoObservations,

    #[fail(display = "no seed satisfies the observations in any searched range")]
    Unsatisfiable,

    #[fail(display = "no matching seed found in the searched ranges")]
    NotFound,

    #[fail(
        display = "seed {} fails verification at index {}: expected {}, found {}",
        seed, index, expected, found
    )]
    VerificationFailed {
        seed: u32,
        index: u32,
        expected: u32,
        found: u32,
    },

    #[fail(display = "search cancelled")]
    Cancelled,

    #[fail(display = "observation index {} lies beyond the modeled twist", index)]
    UnsupportedIndex { index: u32 },

    #[fail(display = "Expected: {}, found: {}", expected, found)]
    ComparisonFailed { expected: String, found: String },
}

pub fn compare_eq<T>(x: T, y: T) -> Result<(), Error>
where
    T: Eq + Debug,
{
    if x == y {
        Ok(())
    } else {
        Err(CrackError::ComparisonFailed {
            expected: format!("{:?}", x),
            found: format!("{:?}", y),
        }
        .into())
    }
}

pub fn run_scenario<F>(scenario: F, scenario_number: u8) -> bool
where
    F: Fn() -> Result<(), Error>,
{
    match scenario() {
        Ok(_) => {
            println!("Scenario {:02}: Success", scenario_number);
            true
        }
        Err(ref e) => {
            match e.downcast_ref::<CrackError>() {
                Some(CrackError::ComparisonFailed { .. }) => {
                    println!("Scenario {:02}: Wrong result: {}", scenario_number, e)
                }
                _ => {
                    println!("Scenario {:02}: An error occured: {}", scenario_number, e);
                    for cause in e.iter_causes() {
                        println!("{: <4}caused by: {}", "", cause);
                    }
                }
            }
            false
        }
    }
}
