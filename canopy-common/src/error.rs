// Copyright 2025 canopy Project Authors
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

use std::fmt::Display;

use crate::fqn::Fqn;

/// Eviction engine error.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Invalid or missing policy configuration.
    #[error("config error: {0}")]
    Config(String),
    /// A list was structurally modified while a cursor was walking it.
    #[error("concurrent modification: cursor expected modification count {expected}, found {found}")]
    ConcurrentModification {
        /// Modification count recorded by the cursor.
        expected: u64,
        /// Modification count of the list when the cursor stepped.
        found: u64,
    },
    /// The collection is empty.
    #[error("no such element")]
    NoSuchElement,
    /// An operation was called in a state that does not allow it.
    #[error("illegal state: {0}")]
    IllegalState(&'static str),
    /// The path is already present in the eviction queue.
    #[error("duplicate entry: {0}")]
    DuplicateEntry(Fqn),
    /// I/O error, e.g. failed to spawn the eviction timer thread.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Multiple error list.
    #[error(transparent)]
    Multiple(MultipleError),
}

impl Error {
    /// Combine multiple errors into one error.
    ///
    /// A list with a single error is unwrapped.
    pub fn multiple(mut errs: Vec<Error>) -> Self {
        if errs.len() == 1 {
            if let Some(err) = errs.pop() {
                return err;
            }
        }
        Self::Multiple(MultipleError(errs))
    }

    /// Returns `true` if the error is a configuration error.
    pub fn is_config(&self) -> bool {
        matches!(self, Error::Config(_))
    }
}

/// A list of errors collected from independent operations.
#[derive(thiserror::Error, Debug)]
pub struct MultipleError(Vec<Error>);

impl MultipleError {
    /// The collected errors.
    pub fn errors(&self) -> &[Error] {
        &self.0
    }
}

impl Display for MultipleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "multiple errors: [")?;
        if let Some((last, errs)) = self.0.as_slice().split_last() {
            for err in errs {
                write!(f, "{}, ", err)?;
            }
            write!(f, "{}", last)?;
        }
        write!(f, "]")?;
        Ok(())
    }
}

/// Eviction engine result.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multiple_error_display() {
        let err = Error::multiple(vec![Error::Config("a".into()), Error::NoSuchElement]);
        assert_eq!(err.to_string(), "multiple errors: [config error: a, no such element]");
    }

    #[test]
    fn test_multiple_error_single() {
        let err = Error::multiple(vec![Error::Config("only".into())]);
        assert!(err.is_config());
    }
}
