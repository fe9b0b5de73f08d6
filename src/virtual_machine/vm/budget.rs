use crate::virtual_machine::errors::VMError;

/// Counts executed instructions against an optional limit.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct StepBudget {
    used: u64,
    limit: Option<u64>,
}

impl StepBudget {
    /// Creates a budget; `None` means unlimited.
    pub fn new(limit: Option<u64>) -> Self {
        Self { used: 0, limit }
    }

    /// Records one executed instruction.
    ///
    /// Fails once the count would pass the limit.
    #[inline(always)]
    pub fn charge(&mut self) -> Result<(), VMError> {
        if let Some(limit) = self.limit
            && self.used >= limit
        {
            return Err(VMError::StepLimitExceeded { limit });
        }
        self.used = self.used.saturating_add(1);
        Ok(())
    }

    /// Instructions executed so far.
    pub fn used(&self) -> u64 {
        self.used
    }

    /// Forgets past usage, keeping the limit.
    pub fn reset(&mut self) {
        self.used = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unlimited_never_fails() {
        let mut budget = StepBudget::new(None);
        for _ in 0..10_000 {
            budget.charge().unwrap();
        }
        assert_eq!(budget.used(), 10_000);
    }

    #[test]
    fn limit_allows_exactly_limit_steps() {
        let mut budget = StepBudget::new(Some(3));
        for _ in 0..3 {
            budget.charge().unwrap();
        }
        assert!(matches!(
            budget.charge(),
            Err(VMError::StepLimitExceeded { limit: 3 })
        ));
        assert_eq!(budget.used(), 3);

        budget.reset();
        assert_eq!(budget.used(), 0);
        for _ in 0..3 {
            budget.charge().unwrap();
        }
        assert!(budget.charge().is_err());
    }
}
