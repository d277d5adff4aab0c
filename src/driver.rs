/// Scenario driver.
///
/// Starts the background ticker, runs registered scenarios one after another
/// on a single engine, and finally signals `done` and drains the queues so
/// the ticker finishes. The ticker keeps running across scenarios, so a
/// tick left pending by one scenario can show up at the start of the next.

use tracing::{info, warn};

use crate::config::SchedulerConfig;
use crate::engine::Engine;
use crate::error::{TurnstileError, TurnstileResult};
use crate::scenario::ScenarioRegistry;
use crate::task::{Body, TaskHandle, Ticker};
use crate::time::VirtualTime;

/// Trace line produced by one scenario.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct ScenarioRun {
    pub label: String,
    pub line: String,
    pub started: VirtualTime,
    pub finished: VirtualTime,
}

impl std::fmt::Display for ScenarioRun {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.label, self.line)
    }
}

/// Owns an engine and a registry and runs scenarios against them.
#[derive(Debug)]
pub struct Driver {
    engine: Engine,
    registry: ScenarioRegistry,
    background: Option<TaskHandle>,
}

impl Driver {
    pub fn new(config: SchedulerConfig, registry: ScenarioRegistry) -> Self {
        Driver {
            engine: Engine::new(config),
            registry,
            background: None,
        }
    }

    /// Driver over the built-in scenarios.
    pub fn with_builtin(config: SchedulerConfig) -> Self {
        Self::new(config, ScenarioRegistry::builtin())
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn registry(&self) -> &ScenarioRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ScenarioRegistry {
        &mut self.registry
    }

    /// Handle of the background task, once started.
    pub fn background(&self) -> Option<TaskHandle> {
        self.background
    }

    /// The ticker started by [`start`](Self::start), if any.
    pub fn ticker(&self) -> Option<&Ticker> {
        self.engine.body::<Ticker>(self.background?)
    }

    /// Start the standard [`Ticker`] in the background.
    pub fn start(&mut self) -> TurnstileResult<TaskHandle> {
        self.start_background(Box::new(Ticker::new()))
    }

    /// Start `body` as the background task, before the first scenario.
    ///
    /// A driver has at most one background task; a second call fails with
    /// `BackgroundAlreadyStarted` and leaves the running one in place.
    pub fn start_background(&mut self, body: Box<dyn Body>) -> TurnstileResult<TaskHandle> {
        if let Some(running) = self.background {
            warn!(task = %running, "background task already started");
            return Err(TurnstileError::BackgroundAlreadyStarted(running.id()));
        }
        let handle = self.engine.run(body)?;
        info!(task = %handle, "background task started");
        self.background = Some(handle);
        Ok(handle)
    }

    /// Run one scenario to completion and return its trace line.
    ///
    /// Sets the shared flag to the scenario's `primed` value, starts the
    /// program, and pumps until its completion reaches the driver.
    pub fn run_scenario(&mut self, name: &str) -> TurnstileResult<ScenarioRun> {
        let scenario = self.registry.get(name)?;
        let started = self.engine.now();
        info!(scenario = %scenario.name, primed = scenario.primed, %started, "scenario start");

        self.engine.context_mut().set_flag(scenario.primed);
        let mark = self.engine.trace().mark();
        let handle = self.engine.run_program(scenario.program.clone())?;
        self.engine.join(handle)?;

        let run = ScenarioRun {
            label: scenario.name.clone(),
            line: self.engine.trace().line_since(mark),
            started,
            finished: self.engine.now(),
        };
        info!(scenario = %run.label, line = %run.line, finished = %run.finished, "scenario done");
        Ok(run)
    }

    /// Run the named scenarios in order, or every registered scenario when
    /// `names` is empty. Stops at the first error.
    pub fn run_all<S: AsRef<str>>(&mut self, names: &[S]) -> TurnstileResult<Vec<ScenarioRun>> {
        let names: Vec<String> = if names.is_empty() {
            self.registry.names().into_iter().map(String::from).collect()
        } else {
            names.iter().map(|n| n.as_ref().to_string()).collect()
        };
        names.iter().map(|name| self.run_scenario(name)).collect()
    }

    /// Signal `done` and drain the queues. Returns the number of entries
    /// dispatched while draining.
    pub fn finish(&mut self) -> TurnstileResult<u64> {
        self.engine.signal_done();
        let steps = self.engine.pump()?;
        info!(steps, now = %self.engine.now(), "driver finished");
        Ok(steps)
    }

    /// Give the engine back, e.g. to inspect its full trace.
    pub fn into_engine(self) -> Engine {
        self.engine
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskState;

    #[test]
    fn test_run_scenario_labels_line() {
        let mut driver = Driver::with_builtin(SchedulerConfig::default());
        driver.start().unwrap();
        let run = driver.run_scenario("demo1").unwrap();
        assert_eq!(run.label, "demo1");
        assert_eq!(run.line, "a b in! c d");
        assert_eq!(run.started, VirtualTime::ZERO);
        assert_eq!(run.finished, VirtualTime::new(100));
        assert_eq!(run.to_string(), "demo1: a b in! c d");
    }

    #[test]
    fn test_second_start_rejected() {
        let mut driver = Driver::with_builtin(SchedulerConfig::default());
        let first = driver.start().unwrap();
        assert_eq!(
            driver.start().unwrap_err(),
            TurnstileError::BackgroundAlreadyStarted(first.id())
        );
        assert_eq!(driver.background(), Some(first));
        assert_eq!(driver.engine().tasks().len(), 1);

        driver.run_scenario("demo1").unwrap();
        driver.finish().unwrap();
        // One tick during the sleep, one for `c d` while draining.
        assert_eq!(driver.ticker().unwrap().hits, 2);
    }

    #[test]
    fn test_unknown_scenario() {
        let mut driver = Driver::with_builtin(SchedulerConfig::default());
        assert_eq!(
            driver.run_scenario("demo9").unwrap_err(),
            TurnstileError::UnknownScenario("demo9".into())
        );
    }

    #[test]
    fn test_finish_terminates_ticker() {
        let mut driver = Driver::with_builtin(SchedulerConfig::default());
        let ticker = driver.start().unwrap();
        driver.run_scenario("demo3").unwrap();
        driver.finish().unwrap();

        let engine = driver.engine();
        assert_eq!(engine.task_state(ticker).unwrap(), TaskState::Complete);
        assert!(engine.is_idle());
        assert!(driver.ticker().unwrap().checks > 0);
    }

    #[test]
    fn test_run_all_defaults_to_registry_order() {
        let mut driver = Driver::with_builtin(SchedulerConfig::default());
        driver.start().unwrap();
        let runs = driver.run_all::<&str>(&[]).unwrap();
        let labels: Vec<_> = runs.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, driver.registry().names());
    }

    #[test]
    fn test_run_all_stops_at_first_error() {
        let mut driver = Driver::with_builtin(SchedulerConfig::default());
        driver.start().unwrap();
        let err = driver.run_all(&["demo1", "nope", "demo2"]).unwrap_err();
        assert_eq!(err, TurnstileError::UnknownScenario("nope".into()));
    }
}
