/// Seeded sampling of scenario outcomes.
///
/// Runs one scenario many times, each on a fresh driver whose tie-break is
/// `Seeded` with a different seed, and tallies the trace lines produced.
/// Every seed is derived from a base seed, so a whole sample replays
/// exactly.

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::config::SchedulerConfig;
use crate::driver::Driver;
use crate::error::TurnstileResult;
use crate::rng::DeterministicRng;
use crate::scenario::{Scenario, ScenarioRegistry};

// ── Distribution ──────────────────────────────────────────────────────

/// Trace lines observed for one scenario, with how often each occurred.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Distribution {
    pub scenario: String,
    pub runs: usize,
    pub outcomes: BTreeMap<String, usize>,
}

impl Distribution {
    /// Number of distinct lines observed.
    pub fn distinct(&self) -> usize {
        self.outcomes.len()
    }

    pub fn count(&self, line: &str) -> usize {
        self.outcomes.get(line).copied().unwrap_or(0)
    }

    /// The most frequent line. Ties go to the lexicographically smallest.
    pub fn most_common(&self) -> Option<&str> {
        self.outcomes
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
            .map(|(line, _)| line.as_str())
    }

    /// Observed lines that `scenario` does not document.
    pub fn unexpected<'a>(&'a self, scenario: &Scenario) -> Vec<&'a str> {
        self.outcomes
            .keys()
            .filter(|line| !scenario.is_documented(line))
            .map(String::as_str)
            .collect()
    }
}

impl std::fmt::Display for Distribution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{} ({} runs)", self.scenario, self.runs)?;
        for (line, count) in &self.outcomes {
            writeln!(f, "  {:>5}  {}", count, line)?;
        }
        Ok(())
    }
}

// ── Sampler ───────────────────────────────────────────────────────────

/// Samples scenario outcomes under seeded tie-breaking.
#[derive(Debug, Clone)]
pub struct Sampler {
    config: SchedulerConfig,
    registry: ScenarioRegistry,
}

impl Sampler {
    /// `config` supplies everything except the tie-break policy, which each
    /// run replaces with its own seed.
    pub fn new(config: SchedulerConfig, registry: ScenarioRegistry) -> Self {
        Sampler { config, registry }
    }

    pub fn registry(&self) -> &ScenarioRegistry {
        &self.registry
    }

    /// Run `name` `runs` times with seeds drawn from `seed`.
    pub fn sample(&self, name: &str, runs: usize, seed: u64) -> TurnstileResult<Distribution> {
        // Fail fast on a bad name before building any driver.
        self.registry.get(name)?;

        let mut seeds = DeterministicRng::new(seed);
        let mut outcomes = BTreeMap::new();
        for run in 0..runs {
            let run_seed = seeds.next_u64();
            let line = self.run_once(name, run_seed)?;
            debug!(scenario = name, run, seed = run_seed, %line, "sampled");
            *outcomes.entry(line).or_insert(0) += 1;
        }

        info!(scenario = name, runs, distinct = outcomes.len(), "sample complete");
        Ok(Distribution {
            scenario: name.to_string(),
            runs,
            outcomes,
        })
    }

    /// One run with the ticker in the background and the given seed.
    pub fn run_once(&self, name: &str, seed: u64) -> TurnstileResult<String> {
        let config = self.config.clone().seeded(seed);
        let mut driver = Driver::new(config, self.registry.clone());
        driver.start()?;
        let run = driver.run_scenario(name)?;
        driver.finish()?;
        Ok(run.line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ZeroDelay;
    use crate::error::TurnstileError;
    use proptest::prelude::*;

    fn sampler() -> Sampler {
        Sampler::new(SchedulerConfig::default(), ScenarioRegistry::builtin())
    }

    #[test]
    fn test_demo3_reaches_both_orders() {
        let sampler = sampler();
        let dist = sampler.sample("demo3", 200, 42).unwrap();

        assert_eq!(dist.runs, 200);
        assert_eq!(dist.outcomes.values().sum::<usize>(), 200);
        assert_eq!(dist.distinct(), 2);
        assert!(dist.count("a b in! c d") > 0);
        assert!(dist.count("a b c d") > 0);

        let demo3 = sampler.registry().get("demo3").unwrap();
        assert!(dist.unexpected(demo3).is_empty());
    }

    #[test]
    fn test_sleep_scenarios_are_seed_independent() {
        let sampler = sampler();
        for name in ["demo1", "demo2", "task-stall", "task-yield", "task-noeager"] {
            let dist = sampler.sample(name, 50, 7).unwrap();
            let scenario = sampler.registry().get(name).unwrap();
            assert_eq!(dist.distinct(), 1, "{}", name);
            assert_eq!(dist.most_common(), Some(scenario.documented[0].as_str()));
        }
    }

    #[test]
    fn test_immediate_channel_has_no_ties() {
        let config = SchedulerConfig::new().zero_delay(ZeroDelay::Immediate);
        let sampler = Sampler::new(config, ScenarioRegistry::builtin());
        let dist = sampler.sample("demo4", 30, 3).unwrap();
        assert_eq!(dist.distinct(), 1);
        assert_eq!(dist.count("a b in! c in! d in!"), 30);
    }

    #[test]
    fn test_sample_is_reproducible() {
        let sampler = sampler();
        assert_eq!(
            sampler.sample("demo4", 64, 9).unwrap(),
            sampler.sample("demo4", 64, 9).unwrap()
        );
    }

    #[test]
    fn test_unknown_scenario() {
        assert_eq!(
            sampler().sample("nope", 10, 1).unwrap_err(),
            TurnstileError::UnknownScenario("nope".into())
        );
    }

    #[test]
    fn test_unexpected_lines_reported() {
        let mut outcomes = BTreeMap::new();
        outcomes.insert("a b in! c d".to_string(), 3);
        outcomes.insert("c d a b".to_string(), 1);
        let dist = Distribution {
            scenario: "demo3".into(),
            runs: 4,
            outcomes,
        };
        let demo3 = crate::scenario::builtin::demo3();
        assert_eq!(dist.unexpected(&demo3), vec!["c d a b"]);
        assert_eq!(dist.most_common(), Some("a b in! c d"));
        assert_eq!(dist.to_string(), "demo3 (4 runs)\n      3  a b in! c d\n      1  c d a b\n");
    }

    proptest! {
        #[test]
        fn seeded_lines_stay_documented(seed in any::<u64>()) {
            let sampler = sampler();
            for name in ["demo3", "demo4"] {
                let line = sampler.run_once(name, seed).unwrap();
                let scenario = sampler.registry().get(name).unwrap();
                prop_assert!(scenario.is_documented(&line), "{} produced {}", name, line);
            }
        }
    }
}
