//! Working-buffer provisioning.
//!
//! The detector never allocates directly. It asks a [`BufferProvider`] to
//! admit each buffer, so the same algorithm runs on a desktop heap or inside
//! a fixed memory budget on small boards.

use crate::error::{Error, Result};
use tracing::debug;

/// Strategy that decides whether a working buffer may be allocated.
pub trait BufferProvider {
    /// Admit a request for `bytes` bytes, or refuse it with
    /// [`Error::BufferAllocation`].
    fn admit(&mut self, purpose: &'static str, bytes: usize) -> Result<()>;

    /// Return bytes previously admitted.
    fn reclaim(&mut self, bytes: usize);
}

/// Unbounded heap; only a failing allocator can refuse.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeapBuffers;

impl BufferProvider for HeapBuffers {
    fn admit(&mut self, _purpose: &'static str, _bytes: usize) -> Result<()> {
        Ok(())
    }

    fn reclaim(&mut self, _bytes: usize) {}
}

/// Fixed byte budget, modelling a microcontroller heap.
#[derive(Debug, Clone, Copy)]
pub struct BudgetedBuffers {
    budget: usize,
    used: usize,
}

impl BudgetedBuffers {
    /// Create a provider with a total budget in bytes.
    #[must_use]
    pub const fn new(budget: usize) -> Self {
        Self { budget, used: 0 }
    }

    /// Bytes currently admitted.
    #[must_use]
    pub const fn used(&self) -> usize {
        self.used
    }

    /// Bytes still available.
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.budget.saturating_sub(self.used)
    }
}

impl BufferProvider for BudgetedBuffers {
    fn admit(&mut self, purpose: &'static str, bytes: usize) -> Result<()> {
        if bytes > self.remaining() {
            return Err(Error::BufferAllocation { purpose, bytes });
        }
        self.used += bytes;
        Ok(())
    }

    fn reclaim(&mut self, bytes: usize) {
        self.used = self.used.saturating_sub(bytes);
    }
}

/// Allocate a zeroed buffer of `len` elements through `provider`.
///
/// Uses fallible reservation so an exhausted allocator surfaces as an
/// error instead of an abort.
pub fn provision<T: Copy + Default>(
    provider: &mut dyn BufferProvider,
    purpose: &'static str,
    len: usize,
) -> Result<Vec<T>> {
    let bytes = len
        .checked_mul(size_of::<T>())
        .ok_or(Error::BufferAllocation {
            purpose,
            bytes: usize::MAX,
        })?;

    provider.admit(purpose, bytes)?;

    let mut buffer = Vec::new();
    if buffer.try_reserve_exact(len).is_err() {
        provider.reclaim(bytes);
        return Err(Error::BufferAllocation { purpose, bytes });
    }
    buffer.resize(len, T::default());

    debug!("Provisioned {bytes} bytes for {purpose}");
    Ok(buffer)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_heap_provision_is_zeroed() {
        let buffer: Vec<f32> = provision(&mut HeapBuffers, "test", 16).unwrap();
        assert_eq!(buffer.len(), 16);
        assert!(buffer.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_budget_accounts_element_size() {
        let mut provider = BudgetedBuffers::new(100);
        let _floats: Vec<f32> = provision(&mut provider, "floats", 10).unwrap();
        assert_eq!(provider.used(), 40);
        assert_eq!(provider.remaining(), 60);
    }

    #[test]
    fn test_budget_refuses_over_limit() {
        let mut provider = BudgetedBuffers::new(64);
        let result: Result<Vec<u8>> = provision(&mut provider, "mask", 65);
        assert!(matches!(
            result,
            Err(Error::BufferAllocation {
                purpose: "mask",
                bytes: 65
            })
        ));
        assert_eq!(provider.used(), 0);
    }

    #[test]
    fn test_reclaim_frees_budget() {
        let mut provider = BudgetedBuffers::new(32);
        provider.admit("a", 32).unwrap();
        assert!(provider.admit("b", 1).is_err());
        provider.reclaim(32);
        assert!(provider.admit("b", 1).is_ok());
    }
}
