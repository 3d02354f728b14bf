//! Diagnostic sinks for likelihood traces and topic snapshots.
//!
//! Engines report every ranked candidate they keep after a step, and the
//! greedy engine can additionally report the word distribution of every topic
//! in its best candidate. Sinks are purely observational.

use crate::error::Result;
use log::info;
use std::io::Write;

/// One ranked candidate at one position of a segmentation run.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceStep {
    /// Sentence position the step ended at.
    pub position: usize,
    /// Rank of the candidate (0 is best).
    pub rank: usize,
    /// Total log-likelihood of the candidate.
    pub log_likelihood: f64,
    /// Boundary vector per document, over the sentences seen so far.
    pub boundaries: Vec<Vec<u8>>,
}

/// Receiver of per-step diagnostics.
pub trait TraceSink {
    /// Records one ranked candidate.
    fn record_step(&mut self, step: &TraceStep) -> Result<()>;

    /// Records the word distribution of `topic` at `position`.
    fn record_topics(&mut self, _position: usize, _topic: usize, _probabilities: &[f64]) -> Result<()> {
        Ok(())
    }

    /// Called once when a position has been fully reported.
    fn end_position(&mut self, _position: usize) -> Result<()> {
        Ok(())
    }
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl TraceSink for NullSink {
    fn record_step(&mut self, _step: &TraceStep) -> Result<()> {
        Ok(())
    }
}

/// Forwards steps to the `log` facade at info level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl TraceSink for LogSink {
    fn record_step(&mut self, step: &TraceStep) -> Result<()> {
        info!(
            "({}) rank {} ll {:.3} {:?}",
            step.position, step.rank, step.log_likelihood, step.boundaries
        );
        Ok(())
    }
}

/// A topic snapshot kept by [`MemorySink`].
#[derive(Debug, Clone, PartialEq)]
pub struct TopicSnapshot {
    /// Sentence position.
    pub position: usize,
    /// Topic (cluster) index within the best candidate.
    pub topic: usize,
    /// Word probabilities.
    pub probabilities: Vec<f64>,
}

/// Keeps every record in memory, for plotting collaborators and tests.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    /// Recorded steps, in order.
    pub steps: Vec<TraceStep>,
    /// Recorded topic snapshots, in order.
    pub topics: Vec<TopicSnapshot>,
}

impl MemorySink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Steps recorded for `position`.
    pub fn steps_at(&self, position: usize) -> impl Iterator<Item = &TraceStep> {
        self.steps.iter().filter(move |s| s.position == position)
    }
}

impl TraceSink for MemorySink {
    fn record_step(&mut self, step: &TraceStep) -> Result<()> {
        self.steps.push(step.clone());
        Ok(())
    }

    fn record_topics(&mut self, position: usize, topic: usize, probabilities: &[f64]) -> Result<()> {
        self.topics.push(TopicSnapshot {
            position,
            topic,
            probabilities: probabilities.to_vec(),
        });
        Ok(())
    }
}

/// Writes a plain-text tracker: one block per ranked candidate, one boundary
/// vector per document line, positions separated by a rule.
pub struct WriterSink<W: Write> {
    writer: W,
}

impl<W: Write> WriterSink<W> {
    /// Wraps a writer.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Returns the wrapped writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> TraceSink for WriterSink<W> {
    fn record_step(&mut self, step: &TraceStep) -> Result<()> {
        writeln!(self.writer, "({})\t{}\tll: {:.3}", step.position, step.rank, step.log_likelihood)?;
        for rho in &step.boundaries {
            writeln!(self.writer, "{:?}", rho)?;
        }
        writeln!(self.writer)?;
        Ok(())
    }

    fn end_position(&mut self, _position: usize) -> Result<()> {
        writeln!(self.writer, "===============")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(position: usize, rank: usize) -> TraceStep {
        TraceStep {
            position,
            rank,
            log_likelihood: -1.5,
            boundaries: vec![vec![1, 0], vec![0]],
        }
    }

    #[test]
    fn test_memory_sink() {
        let mut sink = MemorySink::new();
        sink.record_step(&step(0, 0)).unwrap();
        sink.record_step(&step(1, 0)).unwrap();
        sink.record_step(&step(1, 1)).unwrap();
        sink.record_topics(1, 0, &[0.25, 0.75]).unwrap();
        assert_eq!(sink.steps_at(1).count(), 2);
        assert_eq!(sink.topics[0].probabilities, vec![0.25, 0.75]);
    }

    #[test]
    fn test_log_sink_accepts_every_record() {
        let mut sink = LogSink;
        sink.record_step(&step(0, 0)).unwrap();
        sink.record_topics(0, 1, &[0.5, 0.5]).unwrap();
        sink.end_position(0).unwrap();
    }

    #[test]
    fn test_writer_sink_format() {
        let mut sink = WriterSink::new(Vec::new());
        sink.record_step(&step(3, 1)).unwrap();
        sink.end_position(3).unwrap();
        let text = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(text, "(3)\t1\tll: -1.500\n[1, 0]\n[0]\n\n===============\n");
    }
}
