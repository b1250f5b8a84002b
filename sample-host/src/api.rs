// Copyright 2022 The Plugbus Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The host's domain logic: the methods plugins may call.

use std::error;
use std::fmt;

use rand::Rng;

#[derive(Debug)]
pub enum ApiError {
    NotPositive(i64),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ApiError::NotPositive(n) => write!(f, "n must be positive, got {}", n),
        }
    }
}

impl error::Error for ApiError {}

/// A batch of samples, boiled down.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub count: i64,
    pub sum: i64,
    pub min: i64,
    pub max: i64,
}

#[derive(Default)]
pub struct App {
    hello_count: u64,
}

impl App {
    pub fn new() -> App {
        App::default()
    }

    /// Returns a non-negative pseudo-random number in `[0, n)`.
    //plugbus:generate
    pub fn get_random_int(&self, n: i64) -> Result<i64, ApiError> {
        if n <= 0 {
            return Err(ApiError::NotPositive(n));
        }
        Ok(rand::thread_rng().gen_range(0, n))
    }

    /// Prints a greeting on the host's standard output, counting how
    /// often it was asked to.
    //plugbus:generate
    pub fn print_hello(&mut self) -> Result<(), ApiError> {
        println!("Hellooooooo {}", self.hello_count);
        self.hello_count += 1;
        Ok(())
    }

    /// Boils a batch of samples down to its summary.
    //plugbus:generate
    pub fn summarize(&self, values: Vec<i64>) -> Result<Summary, ApiError> {
        let mut summary =
            Summary { count: 0, sum: 0, min: i64::max_value(), max: i64::min_value() };
        for value in values {
            summary.count += 1;
            summary.sum += value;
            summary.min = summary.min.min(value);
            summary.max = summary.max.max(value);
        }
        if summary.count == 0 {
            summary.min = 0;
            summary.max = 0;
        }
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_int_stays_in_range() {
        let app = App::new();
        for _ in 0..100 {
            let k = app.get_random_int(10).unwrap();
            assert!(k >= 0 && k < 10);
        }
    }

    #[test]
    fn random_int_rejects_non_positive() {
        let app = App::new();
        assert!(app.get_random_int(0).is_err());
        assert!(app.get_random_int(-3).is_err());
    }

    #[test]
    fn summarize_batches() {
        let app = App::new();
        let summary = app.summarize(vec![3, -1, 4, 1, 5]).unwrap();
        assert_eq!(summary, Summary { count: 5, sum: 12, min: -1, max: 5 });
        let empty = app.summarize(Vec::new()).unwrap();
        assert_eq!(empty.count, 0);
        assert_eq!(empty.min, 0);
    }
}
