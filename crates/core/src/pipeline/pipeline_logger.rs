use std::collections::HashMap;
use std::time::Instant;

/// Observer for detection-loop events.
///
/// Keeps the loop free of output concerns: the CLI collects statistics,
/// tests and embedders can discard everything.
pub trait PipelineLogger: Send {
    /// One completed detection cycle that published `faces` faces.
    fn cycle(&mut self, faces: usize);

    /// How long a named stage of one cycle took.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// End-of-session report. Default: no-op.
    fn summary(&self) {}
}

pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn cycle(&mut self, _faces: usize) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
}

/// Running aggregate of one stage's durations.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StageStats {
    pub count: usize,
    pub total_ms: f64,
    pub max_ms: f64,
}

impl StageStats {
    fn record(&mut self, duration_ms: f64) {
        self.count += 1;
        self.total_ms += duration_ms;
        self.max_ms = self.max_ms.max(duration_ms);
    }

    pub fn avg_ms(&self) -> f64 {
        self.total_ms / self.count.max(1) as f64
    }
}

/// Accumulates per-stage timings and face counts, logging each sample at
/// `debug`/`trace` and a summary at `info` when asked.
///
/// Only aggregates are kept, so memory stays flat however long the session
/// streams.
pub struct StatsPipelineLogger {
    stages: HashMap<String, StageStats>,
    cycles: usize,
    total_faces: usize,
    start_time: Instant,
}

impl StatsPipelineLogger {
    pub fn new() -> Self {
        Self {
            stages: HashMap::new(),
            cycles: 0,
            total_faces: 0,
            start_time: Instant::now(),
        }
    }

    pub fn cycles(&self) -> usize {
        self.cycles
    }

    pub fn stage(&self, stage: &str) -> Option<StageStats> {
        self.stages.get(stage).copied()
    }

    /// `None` until at least one cycle or timing was recorded.
    pub fn summary_string(&self) -> Option<String> {
        if self.stages.is_empty() && self.cycles == 0 {
            return None;
        }

        let elapsed_s = self.start_time.elapsed().as_secs_f64();
        let cycles = self.cycles;
        let mut lines = vec![format!(
            "Session summary ({cycles} detection cycles, {elapsed_s:.1}s):"
        )];

        let mut stages: Vec<_> = self.stages.iter().collect();
        stages.sort_by(|a, b| a.0.cmp(b.0));
        for (stage, stats) in stages {
            lines.push(format!(
                "  {stage:8}: avg {:6.1}ms  max {:6.1}ms",
                stats.avg_ms(),
                stats.max_ms
            ));
        }

        if cycles > 0 {
            lines.push(format!(
                "  faces/cycle: avg {:.1}",
                self.total_faces as f64 / cycles as f64
            ));
            if elapsed_s > 0.0 {
                lines.push(format!("  Throughput: {:.1} cycles/s", cycles as f64 / elapsed_s));
            }
        }

        Some(lines.join("\n"))
    }
}

impl Default for StatsPipelineLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineLogger for StatsPipelineLogger {
    fn cycle(&mut self, faces: usize) {
        self.cycles += 1;
        self.total_faces += faces;
        log::trace!("cycle {}: {faces} face(s)", self.cycles);
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        log::debug!("{stage}: {duration_ms:.1}ms");
        match self.stages.get_mut(stage) {
            Some(stats) => stats.record(duration_ms),
            None => {
                let mut stats = StageStats::default();
                stats.record(duration_ms);
                self.stages.insert(stage.to_string(), stats);
            }
        }
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_null_logger_accepts_everything() {
        let mut logger = NullPipelineLogger;
        logger.cycle(2);
        logger.timing("detect", 5.0);
        logger.summary();
    }

    #[test]
    fn test_timing_aggregates_per_stage() {
        let mut logger = StatsPipelineLogger::new();
        logger.timing("detect", 20.0);
        logger.timing("detect", 30.0);
        logger.timing("render", 5.0);

        let detect = logger.stage("detect").unwrap();
        assert_eq!(detect.count, 2);
        assert_relative_eq!(detect.total_ms, 50.0);
        assert_relative_eq!(detect.max_ms, 30.0);
        assert_relative_eq!(detect.avg_ms(), 25.0);
        assert_eq!(logger.stage("render").unwrap().count, 1);
        assert!(logger.stage("other").is_none());
    }

    #[test]
    fn test_long_session_keeps_summary_exact() {
        let mut logger = StatsPipelineLogger::new();
        for i in 0..100_000 {
            logger.timing("detect", if i == 500 { 90.0 } else { 10.0 });
            logger.timing("render", 2.0);
            logger.cycle(i % 3);
        }

        assert_eq!(logger.cycles(), 100_000);
        let detect = logger.stage("detect").unwrap();
        assert_eq!(detect.count, 100_000);
        assert_relative_eq!(detect.max_ms, 90.0);
        assert_relative_eq!(detect.avg_ms(), 10.0008, epsilon = 1e-6);

        let summary = logger.summary_string().unwrap();
        assert!(summary.contains("100000 detection cycles"));
        assert!(summary.contains("max   90.0ms"));
        assert!(summary.contains("faces/cycle: avg 1.0"));
    }

    #[test]
    fn test_summary_reports_stages_and_faces() {
        let mut logger = StatsPipelineLogger::new();
        logger.timing("detect", 20.0);
        logger.timing("detect", 40.0);
        logger.cycle(1);
        logger.cycle(2);

        let summary = logger.summary_string().unwrap();
        assert!(summary.contains("2 detection cycles"));
        assert!(summary.contains("detect"));
        assert!(summary.contains("avg   30.0ms"));
        assert!(summary.contains("faces/cycle: avg 1.5"));
    }

    #[test]
    fn test_empty_summary_returns_none() {
        assert!(StatsPipelineLogger::new().summary_string().is_none());
    }
}
