//! CPU-bound workloads
//!
//! Each workload returns a checksum of its result so the optimizer cannot
//! discard the work. None of them touch the disk or the network.

use super::{BenchmarkCase, ThroughputUnit};
use crate::config::BenchmarkConfig;
use crate::error::WorkloadError;
use std::hint::black_box;

/// Largest `n` whose Fibonacci number fits in a `u64`
const MAX_FIBONACCI_N: u32 = 93;

/// Wrapping sum of `0..iterations`
pub fn arithmetic(iterations: u64) -> Result<u64, WorkloadError> {
    let mut total: u64 = 0;
    for i in 0..black_box(iterations) {
        total = total.wrapping_add(black_box(i));
    }
    Ok(total)
}

/// Naive recursive Fibonacci
pub fn fibonacci(n: u32) -> Result<u64, WorkloadError> {
    if n > MAX_FIBONACCI_N {
        return Err(WorkloadError::InvalidInput(format!(
            "fibonacci({}) overflows u64 (max n is {})",
            n, MAX_FIBONACCI_N
        )));
    }

    fn fib(n: u32) -> u64 {
        if n <= 1 {
            n as u64
        } else {
            fib(n - 1) + fib(n - 2)
        }
    }

    Ok(fib(black_box(n)))
}

/// Count primes below `limit` with a sieve of Eratosthenes
pub fn primes(limit: usize) -> Result<u64, WorkloadError> {
    let limit = black_box(limit);
    if limit < 3 {
        return Ok(0);
    }

    let mut composite: Vec<bool> = Vec::new();
    composite
        .try_reserve_exact(limit)
        .map_err(|_| WorkloadError::Allocation { bytes: limit })?;
    composite.resize(limit, false);

    let mut count = 0u64;
    for n in 2..limit {
        if composite[n] {
            continue;
        }
        count += 1;
        let mut multiple = n.saturating_mul(n);
        while multiple < limit {
            composite[multiple] = true;
            multiple += n;
        }
    }
    Ok(count)
}

/// Sort a reverse-ordered vector of `size` integers
pub fn sort(size: usize) -> Result<u64, WorkloadError> {
    let size = black_box(size);
    let bytes = size.saturating_mul(std::mem::size_of::<u64>());

    let mut values: Vec<u64> = Vec::new();
    values
        .try_reserve_exact(size)
        .map_err(|_| WorkloadError::Allocation { bytes })?;
    values.extend((1..=size as u64).rev());

    values.sort();

    let values = black_box(values);
    let first = values.first().copied().unwrap_or(0);
    let last = values.last().copied().unwrap_or(0);
    Ok(first.wrapping_mul(31).wrapping_add(last))
}

/// The standard battery: arithmetic, fibonacci, primes, sort
pub fn default_battery(config: &BenchmarkConfig) -> Vec<BenchmarkCase> {
    let BenchmarkConfig {
        arithmetic_iterations,
        fibonacci_n,
        prime_limit,
        sort_size,
    } = *config;

    vec![
        BenchmarkCase::new("arithmetic", ThroughputUnit::OpsPerSec, arithmetic_iterations, move || {
            arithmetic(arithmetic_iterations)
        }),
        BenchmarkCase::new("fibonacci", ThroughputUnit::Milliseconds, 1, move || fibonacci(fibonacci_n)),
        BenchmarkCase::new("primes", ThroughputUnit::ItemsPerSec, prime_limit as u64, move || primes(prime_limit)),
        BenchmarkCase::new("sort", ThroughputUnit::ItemsPerSec, sort_size as u64, move || sort(sort_size)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arithmetic_sum() {
        assert_eq!(arithmetic(0), Ok(0));
        assert_eq!(arithmetic(10), Ok(45));
        assert_eq!(arithmetic(1_000_000), Ok(999_999 * 1_000_000 / 2));
    }

    #[test]
    fn test_fibonacci() {
        assert_eq!(fibonacci(0), Ok(0));
        assert_eq!(fibonacci(1), Ok(1));
        assert_eq!(fibonacci(20), Ok(6765));
        assert!(matches!(fibonacci(94), Err(WorkloadError::InvalidInput(_))));
    }

    #[test]
    fn test_prime_counts() {
        assert_eq!(primes(2), Ok(0));
        assert_eq!(primes(3), Ok(1));
        assert_eq!(primes(10), Ok(4));
        assert_eq!(primes(10_000), Ok(1229));
        assert_eq!(primes(100_000), Ok(9592));
    }

    #[test]
    fn test_sort_checksum() {
        assert_eq!(sort(0), Ok(0));
        assert_eq!(sort(5), Ok(31 + 5));
    }

    #[test]
    fn test_sort_allocation_failure() {
        let err = sort(usize::MAX).unwrap_err();
        assert_eq!(err, WorkloadError::Allocation { bytes: usize::MAX });
    }

    #[test]
    fn test_default_battery_order() {
        let battery = default_battery(&BenchmarkConfig::quick());
        let names: Vec<&str> = battery.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["arithmetic", "fibonacci", "primes", "sort"]);
        assert_eq!(battery[0].unit, ThroughputUnit::OpsPerSec);
        assert_eq!(battery[1].unit, ThroughputUnit::Milliseconds);
        assert_eq!(battery[3].work_units, BenchmarkConfig::quick().sort_size as u64);
    }
}
