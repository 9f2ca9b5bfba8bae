/// Remaining-gas meter. Charging reports underflow as a boolean instead of
/// an error; the interpreter maps it to the `OutOfGas` status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasCounter {
    initial: u64,
    remaining: u64,
}

impl GasCounter {
    pub fn new(initial: u64) -> Self {
        GasCounter {
            initial,
            remaining: initial,
        }
    }

    pub fn get(&self) -> u64 {
        self.remaining
    }

    pub fn used(&self) -> u64 {
        self.initial.saturating_sub(self.remaining)
    }

    /// Charges `cost` and reports whether the allowance ran out. On
    /// underflow the remainder drains to zero, so a run that dies of
    /// exhaustion reports the whole allowance as used.
    pub fn sub(&mut self, cost: u64) -> bool {
        match self.remaining.checked_sub(cost) {
            Some(left) => {
                self.remaining = left;
                false
            }
            None => {
                self.remaining = 0;
                true
            }
        }
    }

    /// Overwrites the remainder. Host-call handlers report the gas they
    /// leave behind through this.
    pub fn set(&mut self, remaining: u64) {
        self.remaining = remaining;
    }

    pub fn reset(&mut self, initial: u64) {
        self.initial = initial;
        self.remaining = initial;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn charges_and_reports_usage() {
        let mut gas = GasCounter::new(100);
        assert!(!gas.sub(30));
        assert_eq!(gas.get(), 70);
        assert_eq!(gas.used(), 30);
    }

    #[test]
    fn underflow_drains_to_zero() {
        let mut gas = GasCounter::new(10);
        assert!(!gas.sub(10));
        assert!(gas.sub(1));
        assert_eq!(gas.get(), 0);
        assert_eq!(gas.used(), 10);
    }

    #[test]
    fn exact_spend_is_not_underflow() {
        let mut gas = GasCounter::new(5);
        assert!(!gas.sub(5));
        assert_eq!(gas.used(), 5);
    }
}
