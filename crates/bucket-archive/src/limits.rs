//! Amplification guards for recursive extraction.
//!
//! A small compressed input may expand without bound; the budget caps
//! nesting depth, entry count, and aggregate decompressed bytes across one
//! upload, including nested archives. Exceeding any bound aborts the
//! offending unit, not the whole upload.

use std::io::{self, Read};

use crate::error::{Error, LimitKind, Result};

#[derive(Clone, Copy, Debug)]
pub struct ExtractLimits {
    pub max_depth: usize,
    pub max_entries: u64,
    pub max_total_bytes: u64,
}

impl Default for ExtractLimits {
    fn default() -> Self {
        Self {
            max_depth: 6,
            max_entries: 10_000,
            max_total_bytes: 1 << 30,
        }
    }
}

impl ExtractLimits {
    pub fn max_depth(mut self, n: usize) -> Self {
        self.max_depth = n;
        self
    }

    pub fn max_entries(mut self, n: u64) -> Self {
        self.max_entries = n;
        self
    }

    pub fn max_total_bytes(mut self, n: u64) -> Self {
        self.max_total_bytes = n;
        self
    }
}

/// Running consumption against [`ExtractLimits`], shared by every nested
/// container of a single upload.
#[derive(Debug)]
pub struct Budget {
    limits: ExtractLimits,
    entries: u64,
    bytes: u64,
    exhausted: Option<LimitKind>,
}

impl Budget {
    pub fn new(limits: ExtractLimits) -> Self {
        Self {
            limits,
            entries: 0,
            bytes: 0,
            exhausted: None,
        }
    }

    /// The limit that tripped, if any. Sticky once set.
    pub fn exhausted(&self) -> Option<LimitKind> {
        self.exhausted
    }

    pub fn entries(&self) -> u64 {
        self.entries
    }

    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    pub fn check_depth(&mut self, depth: usize) -> Result<()> {
        if depth > self.limits.max_depth {
            let kind = LimitKind::Depth {
                limit: self.limits.max_depth,
            };
            self.exhausted = Some(kind);
            return Err(Error::LimitExceeded(kind));
        }
        Ok(())
    }

    pub fn charge_entry(&mut self) -> Result<()> {
        self.entries += 1;
        if self.entries > self.limits.max_entries {
            let kind = LimitKind::Entries {
                limit: self.limits.max_entries,
            };
            self.exhausted = Some(kind);
            return Err(Error::LimitExceeded(kind));
        }
        Ok(())
    }

    pub fn charge_bytes(&mut self, n: u64) -> Result<()> {
        self.bytes += n;
        if self.bytes > self.limits.max_total_bytes {
            let kind = LimitKind::Bytes {
                limit: self.limits.max_total_bytes,
            };
            self.exhausted = Some(kind);
            return Err(Error::LimitExceeded(kind));
        }
        Ok(())
    }
}

/// Reader that charges every decompressed byte against the budget.
///
/// Crossing the byte limit surfaces as an `io::Error`, which unwinds any
/// `io::copy` in progress; the walk then reports the authoritative
/// [`Error::LimitExceeded`] from the budget's sticky state.
pub struct LimitedReader<'a, R> {
    inner: R,
    budget: &'a mut Budget,
}

impl<'a, R: Read> LimitedReader<'a, R> {
    pub fn new(inner: R, budget: &'a mut Budget) -> Self {
        Self { inner, budget }
    }
}

impl<R: Read> Read for LimitedReader<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        if n > 0 {
            self.budget
                .charge_bytes(n as u64)
                .map_err(|e| io::Error::new(io::ErrorKind::FileTooLarge, e))?;
        }
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_limit() {
        let mut budget = Budget::new(ExtractLimits::default().max_depth(2));
        assert!(budget.check_depth(0).is_ok());
        assert!(budget.check_depth(2).is_ok());
        assert!(budget.check_depth(3).is_err());
        assert!(matches!(budget.exhausted(), Some(LimitKind::Depth { .. })));
    }

    #[test]
    fn entry_limit() {
        let mut budget = Budget::new(ExtractLimits::default().max_entries(2));
        assert!(budget.charge_entry().is_ok());
        assert!(budget.charge_entry().is_ok());
        assert!(budget.charge_entry().is_err());
    }

    #[test]
    fn byte_limit_trips_reader() {
        let mut budget = Budget::new(ExtractLimits::default().max_total_bytes(10));
        let data = vec![0u8; 64];
        let mut reader = LimitedReader::new(&data[..], &mut budget);

        let mut sink = Vec::new();
        assert!(std::io::copy(&mut reader, &mut sink).is_err());
        assert!(matches!(budget.exhausted(), Some(LimitKind::Bytes { limit: 10 })));
    }

    #[test]
    fn byte_accounting_accumulates_across_readers() {
        let mut budget = Budget::new(ExtractLimits::default().max_total_bytes(100));
        for _ in 0..3 {
            let data = vec![0u8; 20];
            let mut reader = LimitedReader::new(&data[..], &mut budget);
            std::io::copy(&mut reader, &mut std::io::sink()).unwrap();
        }
        assert_eq!(budget.bytes(), 60);
        assert!(budget.exhausted().is_none());
    }
}
