//! Cost estimation for metered (GPU) resources.

use crate::derive;
use bwizard_catalog::ClusterCatalog;
use bwizard_config::JobConfiguration;
use bwizard_parsers::runtime_hours;

/// Estimated cost of a job, in the catalog's currency.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostEstimate {
    /// GPU hourly rate times the GPU count
    pub hourly_rate: f64,

    /// Hours billed per array element
    pub hours: f64,

    /// No runtime limit was set; `hours` is the policy default
    pub runtime_assumed: bool,

    pub array_elements: u32,

    /// A throttle caps concurrent elements, so wall-clock spend may be lower
    pub throttled: bool,

    /// Upper bound: rate x hours x elements
    pub total: f64,
}

/// Estimate a job's cost.
///
/// Only GPU time is metered, so anything without a resolvable GPU request
/// yields None. Queue compatibility does not matter here.
pub fn estimate(config: &JobConfiguration, catalog: &ClusterCatalog) -> Option<CostEstimate> {
    let gpu = config.gpu()?;
    let gpu_type = catalog.gpu_type(&gpu.gpu_type)?;

    let hourly_rate = gpu_type.hourly_rate * f64::from(gpu.count);
    let (hours, runtime_assumed) = match derive::runtime_limit(config) {
        Some(limit) => (runtime_hours(limit), false),
        None => (runtime_hours(catalog.policy().default_estimate), true),
    };
    let array_elements = derive::array_elements(config);
    let throttled = config
        .array
        .and_then(|a| a.throttle)
        .is_some_and(|t| t < array_elements);

    Some(CostEstimate {
        hourly_rate,
        hours,
        runtime_assumed,
        array_elements,
        throttled,
        total: hourly_rate * hours * f64::from(array_elements),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bwizard_catalog::JobKind;
    use bwizard_config::{ArraySpec, GpuConfiguration};

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn gpu_job(gpu: &str, count: u32) -> JobConfiguration {
        let mut config = JobConfiguration::new(JobKind::Gpu);
        config.set_gpu(Some(GpuConfiguration::new(gpu, count))).unwrap();
        config
    }

    #[test]
    fn test_cpu_job_has_no_cost() {
        let catalog = ClusterCatalog::reference();
        let mut config = JobConfiguration::new(JobKind::Cpu);
        config.runtime_limit = Some("4:00".to_string());
        assert_eq!(estimate(&config, &catalog), None);
    }

    #[test]
    fn test_gpu_cost_uses_limit() {
        let catalog = ClusterCatalog::reference();
        let mut config = gpu_job("h100", 2);
        config.runtime_limit = Some("4:00".to_string());
        let cost = estimate(&config, &catalog).unwrap();
        assert!(close(cost.hourly_rate, 1.0));
        assert!(close(cost.total, 4.0));
        assert!(!cost.runtime_assumed);
        assert!(!cost.throttled);
    }

    #[test]
    fn test_gpu_cost_falls_back_to_default_estimate() {
        let catalog = ClusterCatalog::reference();
        let cost = estimate(&gpu_job("a100", 1), &catalog).unwrap();
        assert!(cost.runtime_assumed);
        assert!(close(cost.hours, 1.0));
        assert!(close(cost.total, 0.2));
    }

    #[test]
    fn test_array_cost_is_naive_upper_bound() {
        let catalog = ClusterCatalog::reference();
        let mut config = gpu_job("t4", 1);
        config.runtime_limit = Some("30".to_string());
        config.array = Some(ArraySpec::new(1, 100).with_throttle(10));
        let cost = estimate(&config, &catalog).unwrap();
        assert_eq!(cost.array_elements, 100);
        assert!(cost.throttled);
        assert!(close(cost.total, 0.1 * 0.5 * 100.0));
    }

    #[test]
    fn test_unknown_gpu_type_has_no_cost() {
        let catalog = ClusterCatalog::reference();
        assert_eq!(estimate(&gpu_job("v100", 1), &catalog), None);
    }
}
