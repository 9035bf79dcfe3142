//! Resource limits for fuzzer revisions and the validator that keeps a
//! revision's CPU, RAM and tmpfs selection inside its pool's allowance.
//!
//! RAM and tmpfs share one budget: a revision's `ram_usage + tmpfs_size` must
//! not exceed the pool's effective RAM total, and must not fall below the
//! global RAM floor [`RAM_MIN`]. The tmpfs slider is therefore dependent on
//! the currently selected RAM value.

use std::cmp::{max, min};

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Lowest CPU usage a revision may request, in mcpu.
pub const CPU_MIN: u32 = 500;
/// CPU slider maximum used while pool limits are unknown, in mcpu.
pub const CPU_MAX_DEFAULT: u32 = 2000;
/// Global RAM floor, in MiB. Also the lower bound of `ram + tmpfs`.
pub const RAM_MIN: u32 = 500;
/// RAM slider maximum used while pool limits are unknown, in MiB.
pub const RAM_MAX_DEFAULT: u32 = 5000;
/// Smallest tmpfs a revision may mount, in MiB.
pub const TMPFS_MIN: u32 = 100;
/// Largest tmpfs a revision may mount, in MiB.
pub const TMPFS_MAX: u32 = 2000;
/// Granularity of every resource slider.
pub const SLIDER_STEP: u32 = 50;

/// Resolves a per-fuzzer maximum against the pool-wide total.
///
/// The per-fuzzer maximum takes precedence when present and non-zero;
/// otherwise the pool total applies.
#[must_use]
pub fn effective_limit(per_fuzzer_max: Option<u32>, total: u32) -> u32 {
    match per_fuzzer_max {
        Some(limit) if limit > 0 => limit,
        _ => total,
    }
}

/// Resources of a pool as reported by the platform API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolResources {
    /// Total CPU of the pool, in mcpu.
    #[serde(default)]
    pub cpu_total: u32,
    /// Total RAM of the pool, in MiB.
    #[serde(default)]
    pub ram_total: u32,
    /// Largest CPU a single fuzzer may use, in mcpu.
    #[serde(default)]
    pub fuzzer_max_cpu: Option<u32>,
    /// Largest RAM a single fuzzer may use, in MiB.
    #[serde(default)]
    pub fuzzer_max_ram: Option<u32>,
    /// Number of nodes in the pool.
    #[serde(default)]
    pub nodes_total: u32,
    /// Number of nodes currently available.
    #[serde(default)]
    pub nodes_avail: u32,
}

/// Inclusive `[min, max]` range for a resource, as shown on a slider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitRange {
    #[serde(rename = "min_value")]
    pub min: u32,
    #[serde(rename = "max_value")]
    pub max: u32,
}

impl LimitRange {
    #[must_use]
    pub const fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }
}

/// Snapshot of the limits that apply to revisions in the current project.
///
/// Fetched once per form session and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLimits {
    pub cpu: LimitRange,
    pub ram: LimitRange,
    pub cpu_total: u32,
    pub ram_total: u32,
    pub fuzzer_max_cpu: Option<u32>,
    pub fuzzer_max_ram: Option<u32>,
    pub nodes_avail: u32,
    pub nodes_total: u32,
}

impl ResourceLimits {
    /// Derive revision limits from a pool's resources.
    #[must_use]
    pub fn from_pool(resources: &PoolResources) -> Self {
        Self {
            cpu: LimitRange::new(
                CPU_MIN,
                effective_limit(resources.fuzzer_max_cpu, resources.cpu_total),
            ),
            ram: LimitRange::new(
                RAM_MIN,
                effective_limit(resources.fuzzer_max_ram, resources.ram_total),
            ),
            cpu_total: resources.cpu_total,
            ram_total: resources.ram_total,
            fuzzer_max_cpu: resources.fuzzer_max_cpu,
            fuzzer_max_ram: resources.fuzzer_max_ram,
            nodes_avail: resources.nodes_avail,
            nodes_total: resources.nodes_total,
        }
    }

    /// CPU a single fuzzer may use, in mcpu.
    #[must_use]
    pub fn effective_cpu_total(&self) -> u32 {
        effective_limit(self.fuzzer_max_cpu, self.cpu_total)
    }

    /// RAM a single fuzzer may use for `ram + tmpfs`, in MiB.
    #[must_use]
    pub fn effective_ram_total(&self) -> u32 {
        effective_limit(self.fuzzer_max_ram, self.ram_total)
    }
}

/// CPU, RAM and tmpfs values chosen for a revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSelection {
    /// CPU usage, in mcpu.
    pub cpu_usage: u32,
    /// RAM usage, in MiB.
    pub ram_usage: u32,
    /// Size of the revision's tmpfs mount, in MiB.
    pub tmpfs_size: u32,
}

impl ResourceSelection {
    #[must_use]
    pub const fn new(cpu_usage: u32, ram_usage: u32, tmpfs_size: u32) -> Self {
        Self { cpu_usage, ram_usage, tmpfs_size }
    }
}

impl Default for ResourceSelection {
    fn default() -> Self {
        Self::new(1000, 1000, 200)
    }
}

/// Live bounds of a resource slider.
///
/// Bounds are signed: the tmpfs floor `RAM_MIN - ram` goes negative once the
/// selected RAM alone covers the floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliderBounds {
    pub min: i64,
    pub max: i64,
    pub step: u32,
}

impl SliderBounds {
    /// Create bounds with the given step.
    ///
    /// # Errors
    /// Returns [`CoreError::ZeroStep`] if `step` is zero.
    pub fn new(min: i64, max: i64, step: u32) -> Result<Self, CoreError> {
        if step == 0 {
            return Err(CoreError::ZeroStep);
        }
        Ok(Self { min, max, step })
    }

    const fn with_default_step(min: i64, max: i64) -> Self {
        Self { min, max, step: SLIDER_STEP }
    }

    /// `true` when no value satisfies both bounds.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.min > self.max
    }

    #[must_use]
    pub fn contains(&self, value: i64) -> bool {
        (self.min..=self.max).contains(&value)
    }

    /// Move `value` into the bounds and onto the step grid anchored at `min`.
    ///
    /// Returns `None` when the bounds are empty.
    #[must_use]
    pub fn clamp(&self, value: i64) -> Option<i64> {
        if self.is_empty() {
            return None;
        }
        let step = i64::from(self.step);
        let inside = value.clamp(self.min, self.max);
        Some(self.min + (inside - self.min) / step * step)
    }
}

/// Computes slider bounds and gates submissions against a limits snapshot.
///
/// `limits` is `None` until the pool has been fetched; the static defaults
/// apply in the meantime. Every method is a pure function of the snapshot
/// and its arguments.
#[derive(Debug, Clone, Copy, Default)]
pub struct LimitValidator<'a> {
    limits: Option<&'a ResourceLimits>,
}

impl<'a> LimitValidator<'a> {
    #[must_use]
    pub fn new(limits: Option<&'a ResourceLimits>) -> Self {
        Self { limits }
    }

    /// Returns `true` once a limits snapshot is available.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.limits.is_some()
    }

    /// Bounds of the CPU slider, defaulting to `[500, 2000]`.
    #[must_use]
    pub fn cpu_bounds(&self) -> SliderBounds {
        let range = self.limits.map(|l| l.cpu);
        static_bounds(range, CPU_MIN, CPU_MAX_DEFAULT)
    }

    /// Bounds of the RAM slider, defaulting to `[500, 5000]`.
    #[must_use]
    pub fn ram_bounds(&self) -> SliderBounds {
        let range = self.limits.map(|l| l.ram);
        static_bounds(range, RAM_MIN, RAM_MAX_DEFAULT)
    }

    /// RAM budget shared by `ram + tmpfs`, in MiB.
    ///
    /// `RAM_MAX_DEFAULT` stands in only while no snapshot is loaded. A loaded
    /// pool reporting no RAM has a budget of zero, and the gate rejects every
    /// selection against it.
    #[must_use]
    pub fn effective_ram_total(&self) -> u32 {
        self.limits.map_or(RAM_MAX_DEFAULT, ResourceLimits::effective_ram_total)
    }

    /// Bounds of the tmpfs slider for the given RAM selection.
    ///
    /// `max = min(TMPFS_MAX, effective_ram_total - ram)` and
    /// `min = max(TMPFS_MIN, RAM_MIN - ram)`. The result is empty when the
    /// selected RAM leaves no room for the smallest tmpfs.
    #[must_use]
    pub fn tmpfs_bounds(&self, ram: u32) -> SliderBounds {
        let ram = i64::from(ram);
        let total = i64::from(self.effective_ram_total());
        SliderBounds::with_default_step(
            max(i64::from(TMPFS_MIN), i64::from(RAM_MIN) - ram),
            min(i64::from(TMPFS_MAX), total - ram),
        )
    }

    /// Gate a selection before it is submitted.
    ///
    /// # Errors
    /// Returns [`CoreError::RamTotalLimitsViolated`] unless
    /// `tmpfs <= effective_ram_total - ram` and `tmpfs >= RAM_MIN - ram`.
    pub fn check(&self, selection: &ResourceSelection) -> Result<(), CoreError> {
        let ram = i64::from(selection.ram_usage);
        let tmpfs = i64::from(selection.tmpfs_size);
        let total = self.effective_ram_total();

        if tmpfs <= i64::from(total) - ram && tmpfs >= i64::from(RAM_MIN) - ram {
            Ok(())
        } else {
            Err(CoreError::RamTotalLimitsViolated { ram_min: RAM_MIN, ram_max: total })
        }
    }
}

/// Bounds for a slider whose range does not depend on other inputs.
///
/// A zero `min` or `max` counts as unset and falls back to the default.
fn static_bounds(range: Option<LimitRange>, default_min: u32, default_max: u32) -> SliderBounds {
    let (lo, hi) = range.map_or((0, 0), |r| (r.min, r.max));
    let lo = if lo == 0 { default_min } else { lo };
    let hi = if hi == 0 { default_max } else { hi };
    SliderBounds::with_default_step(i64::from(lo), i64::from(hi))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(ram_total: u32, fuzzer_max_ram: Option<u32>) -> ResourceLimits {
        ResourceLimits::from_pool(&PoolResources {
            cpu_total: 8000,
            ram_total,
            fuzzer_max_cpu: None,
            fuzzer_max_ram,
            nodes_total: 2,
            nodes_avail: 1,
        })
    }

    #[test]
    fn effective_limit_prefers_per_fuzzer_max() {
        assert_eq!(effective_limit(Some(3000), 8000), 3000);
    }

    #[test]
    fn effective_limit_falls_back_to_total() {
        assert_eq!(effective_limit(None, 8000), 8000);
        assert_eq!(effective_limit(Some(0), 8000), 8000, "zero per-fuzzer max counts as unset");
    }

    #[test]
    fn from_pool_uses_effective_limits_for_slider_ranges() {
        let limits = ResourceLimits::from_pool(&PoolResources {
            cpu_total: 16_000,
            ram_total: 32_000,
            fuzzer_max_cpu: Some(4000),
            fuzzer_max_ram: None,
            nodes_total: 4,
            nodes_avail: 3,
        });
        assert_eq!(limits.cpu, LimitRange::new(CPU_MIN, 4000));
        assert_eq!(limits.ram, LimitRange::new(RAM_MIN, 32_000));
        assert_eq!(limits.nodes_avail, 3);
    }

    #[test]
    fn unloaded_limits_use_static_defaults() {
        let v = LimitValidator::new(None);
        assert!(!v.is_loaded());
        assert_eq!((v.cpu_bounds().min, v.cpu_bounds().max), (500, 2000));
        assert_eq!((v.ram_bounds().min, v.ram_bounds().max), (500, 5000));
        assert_eq!(v.effective_ram_total(), RAM_MAX_DEFAULT);
    }

    #[test]
    fn pool_without_ram_admits_nothing() {
        let limits = pool(0, None);
        let v = LimitValidator::new(Some(&limits));
        assert_eq!(v.effective_ram_total(), 0);
        assert!(v.tmpfs_bounds(1000).is_empty());
        assert!(matches!(
            v.check(&ResourceSelection::default()),
            Err(CoreError::RamTotalLimitsViolated { ram_max: 0, .. })
        ));
    }

    #[test]
    fn tmpfs_bounds_follow_selected_ram() {
        let limits = pool(5000, None);
        let v = LimitValidator::new(Some(&limits));

        let b = v.tmpfs_bounds(1000);
        assert_eq!((b.min, b.max), (100, 2000));

        let b = v.tmpfs_bounds(4000);
        assert_eq!((b.min, b.max), (100, 1000));

        let b = v.tmpfs_bounds(4950);
        assert!(b.is_empty(), "no room left for the smallest tmpfs: {b:?}");
    }

    #[test]
    fn tmpfs_bounds_use_fuzzer_max_ram_over_pool_total() {
        let limits = pool(64_000, Some(3000));
        let b = LimitValidator::new(Some(&limits)).tmpfs_bounds(2500);
        assert_eq!(b.max, 500);
    }

    #[test]
    fn check_accepts_selection_within_budget() {
        let limits = pool(5000, None);
        let v = LimitValidator::new(Some(&limits));
        assert_eq!(v.check(&ResourceSelection::new(1000, 1000, 200)), Ok(()));
    }

    #[test]
    fn check_rejects_selection_over_budget_with_interpolated_bounds() {
        let limits = pool(5000, None);
        let v = LimitValidator::new(Some(&limits));
        let err = match v.check(&ResourceSelection::new(1000, 4900, 200)) {
            Err(e) => e,
            Ok(()) => panic!("4900 + 200 exceeds a 5000 MiB budget"),
        };
        assert_eq!(err, CoreError::RamTotalLimitsViolated { ram_min: 500, ram_max: 5000 });
        let msg = err.to_string();
        assert!(
            msg.contains("500") && msg.contains("5000"),
            "message must carry both bounds: {msg}"
        );
        assert_eq!(err.message_key(), Some("form.hint.version.ram_total_limits_violated"));
    }

    #[test]
    fn check_rejects_selection_under_ram_floor() {
        let limits = pool(5000, None);
        let v = LimitValidator::new(Some(&limits));
        assert!(v.check(&ResourceSelection::new(1000, 100, 100)).is_err());
    }

    #[test]
    fn check_with_unloaded_limits_gates_against_defaults() {
        let v = LimitValidator::new(None);
        assert!(
            v.check(&ResourceSelection::default()).is_ok(),
            "unloaded limits alone must not block"
        );
        assert!(v.check(&ResourceSelection::new(1000, 4900, 200)).is_err());
    }

    #[test]
    fn slider_clamp_snaps_to_step_grid() {
        let b = match SliderBounds::new(100, 1000, 50) {
            Ok(b) => b,
            Err(e) => panic!("unexpected error: {e}"),
        };
        assert_eq!(b.clamp(1240), Some(1000));
        assert_eq!(b.clamp(-30), Some(100));
        assert_eq!(b.clamp(333), Some(300));
        assert!(SliderBounds::new(0, 10, 0).is_err());
    }

    #[test]
    fn slider_clamp_on_empty_bounds_returns_none() {
        let limits = pool(5000, None);
        let b = LimitValidator::new(Some(&limits)).tmpfs_bounds(4990);
        assert_eq!(b.clamp(200), None);
    }

    #[test]
    fn resource_limits_deserialize_slider_ranges() {
        let json = r#"{
            "cpu": {"min_value": 500, "max_value": 4000},
            "ram": {"min_value": 500, "max_value": 6000},
            "cpu_total": 8000, "ram_total": 12000,
            "fuzzer_max_cpu": 4000, "fuzzer_max_ram": 6000,
            "nodes_avail": 1, "nodes_total": 2
        }"#;
        let limits: ResourceLimits = match serde_json::from_str(json) {
            Ok(l) => l,
            Err(e) => panic!("invalid JSON: {e}"),
        };
        assert_eq!(limits.effective_ram_total(), 6000);
        assert_eq!(limits.effective_cpu_total(), 4000);
    }

    proptest::proptest! {
        #[test]
        fn proptest_tmpfs_bounds_respect_shared_budget(
            ram_total in 1000u32..64_000,
            fuzzer_max in proptest::option::of(1000u32..16_000),
            ram_offset in 0u32..64_000,
        ) {
            let limits = pool(ram_total, fuzzer_max);
            let v = LimitValidator::new(Some(&limits));
            let total = limits.effective_ram_total();
            let ram = RAM_MIN + ram_offset % (total - RAM_MIN + 1);

            let b = v.tmpfs_bounds(ram);
            proptest::prop_assert!(b.max + i64::from(ram) <= i64::from(total));
            proptest::prop_assert!(b.min + i64::from(ram) >= i64::from(RAM_MIN));
        }

        #[test]
        fn proptest_validator_is_idempotent(
            ram_total in 1000u32..64_000,
            ram in 0u32..64_000,
            tmpfs in 0u32..4000,
        ) {
            let limits = pool(ram_total, None);
            let v = LimitValidator::new(Some(&limits));
            let selection = ResourceSelection::new(1000, ram, tmpfs);
            proptest::prop_assert_eq!(v.tmpfs_bounds(ram), v.tmpfs_bounds(ram));
            proptest::prop_assert_eq!(v.check(&selection), v.check(&selection));
        }

        #[test]
        fn proptest_in_bounds_tmpfs_passes_gate(
            ram_offset in 0u32..4500,
            tmpfs_offset in 0u32..2000,
        ) {
            let limits = pool(5000, None);
            let v = LimitValidator::new(Some(&limits));
            let ram = RAM_MIN + ram_offset;
            let b = v.tmpfs_bounds(ram);
            proptest::prop_assume!(!b.is_empty());
            let span = u32::try_from(b.max - b.min).unwrap_or(0);
            let tmpfs = u32::try_from(b.min).unwrap_or(0) + tmpfs_offset % (span + 1);
            proptest::prop_assert!(v.check(&ResourceSelection::new(1000, ram, tmpfs)).is_ok());
        }
    }
}
