// Non-decreasing multiset of i64 with linear-scan insertion.
use crate::core::error::{Error, ErrorKind};

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SortedList {
    values: Vec<i64>,
}

impl SortedList {
    pub fn new() -> Self {
        Self { values: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn as_slice(&self) -> &[i64] {
        &self.values
    }

    /// Inserts `value` before the first element that is `>= value`.
    ///
    /// Room is reserved up front, so a failed allocation leaves the list
    /// untouched.
    pub fn insert(&mut self, value: i64) -> Result<usize, Error> {
        self.values.try_reserve(1).map_err(|err| {
            Error::new(ErrorKind::AllocationFailure)
                .with_message("cannot grow sorted list")
                .with_source(err)
        })?;
        let index = insertion_point(&self.values, value);
        self.values.insert(index, value);
        Ok(index)
    }

    pub fn snapshot(&self) -> Vec<i64> {
        self.values.clone()
    }

    /// Drops every element and its backing storage, returning the count.
    pub fn release(&mut self) -> usize {
        let released = self.values.len();
        self.values = Vec::new();
        released
    }
}

fn insertion_point(values: &[i64], value: i64) -> usize {
    values
        .iter()
        .position(|existing| *existing >= value)
        .unwrap_or(values.len())
}
