//! Fuzz target: resource limit validator.
//!
//! Any selection the gate accepts keeps `ram + tmpfs` inside the pool's RAM
//! budget and above the global floor, and non-empty tmpfs bounds never allow
//! more than the budget leaves.

#![no_main]

use fuzzctl_core::limits::RAM_MIN;
use fuzzctl_core::{LimitValidator, PoolResources, ResourceLimits, ResourceSelection};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|input: (u32, Option<u32>, u32, u32, u32, bool)| {
    let (ram_total, fuzzer_max_ram, cpu, ram, tmpfs, loaded) = input;
    let limits = ResourceLimits::from_pool(&PoolResources {
        ram_total,
        fuzzer_max_ram,
        ..PoolResources::default()
    });
    let validator = LimitValidator::new(loaded.then_some(&limits));
    let total = i64::from(validator.effective_ram_total());

    if validator.check(&ResourceSelection::new(cpu, ram, tmpfs)).is_ok() {
        let used = i64::from(ram) + i64::from(tmpfs);
        assert!(used <= total);
        assert!(used >= i64::from(RAM_MIN));
    }

    let bounds = validator.tmpfs_bounds(ram);
    if !bounds.is_empty() {
        assert!(bounds.max + i64::from(ram) <= total);
        assert_eq!(bounds, validator.tmpfs_bounds(ram));
    }
});
