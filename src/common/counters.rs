use std::collections::BTreeMap;

use super::{DiscardReason, Stage, Verdict};
use crate::runtime::Error;

///////////////////////////////
/// Read accounting for one stage
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageCount {
    pub input: u64,
    pub passed: u64,
    pub discarded: u64,
    pub deduplicated: u64,
    pub reasons: BTreeMap<DiscardReason, u64>,
}

impl StageCount {
    pub fn record<T>(&mut self, verdict: &Verdict<T>) {
        self.input += 1;
        match verdict {
            Verdict::Pass(_) => self.passed += 1,
            Verdict::Discarded(reason) => {
                self.discarded += 1;
                *self.reasons.entry(*reason).or_insert(0) += 1;
            }
            Verdict::Deduplicated(_) => self.deduplicated += 1,
        }
    }

    pub fn num_discarded_for(&self, reason: DiscardReason) -> u64 {
        self.reasons.get(&reason).copied().unwrap_or(0)
    }

    /// Every input read got exactly one verdict
    pub fn is_balanced(&self) -> bool {
        self.input == self.passed + self.discarded + self.deduplicated
    }
}

impl std::fmt::Display for StageCount {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "input={} passed={} discarded={} deduplicated={}",
            self.input, self.passed, self.discarded, self.deduplicated
        )?;
        for (reason, cnt) in self.reasons.iter() {
            write!(f, " {}={}", reason, cnt)?;
        }
        Ok(())
    }
}

///////////////////////////////
/// Per-stage accounting for a whole run. Single writer: the orchestrator
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageCounters {
    stages: BTreeMap<Stage, StageCount>,
}

impl StageCounters {
    pub fn new() -> StageCounters {
        StageCounters::default()
    }

    pub fn record<T>(&mut self, stage: Stage, verdict: &Verdict<T>) {
        self.stages.entry(stage).or_default().record(verdict);
    }

    /// Register a stage that saw no reads, so that it still shows in reports
    pub fn touch(&mut self, stage: Stage) {
        self.stages.entry(stage).or_default();
    }

    pub fn get(&self, stage: Stage) -> Option<&StageCount> {
        self.stages.get(&stage)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Stage, &StageCount)> {
        self.stages.iter()
    }

    pub fn log_stage(&self, stage: Stage) {
        if let Some(cnt) = self.get(stage) {
            log::info!("Stage {}: {}", stage, cnt);
        }
    }

    pub fn log_snapshot(&self, level: log::Level) {
        for (stage, cnt) in self.iter() {
            log::log!(level, "  {:<20} {}", stage.as_str(), cnt);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    ///////////////////////////////
    /// Check that every stage accounted for all its input, and that each stage received
    /// exactly what the previous stage passed
    pub fn check_integrity(&self) -> Result<(), Error> {
        for (stage, cnt) in self.stages.iter() {
            if !cnt.is_balanced() {
                return Err(Error::integrity_violation(
                    *stage,
                    format!(
                        "input {} != passed {} + discarded {} + deduplicated {}",
                        cnt.input, cnt.passed, cnt.discarded, cnt.deduplicated
                    ),
                ));
            }
            if let Some(next) = stage.next() {
                if let Some(next_cnt) = self.stages.get(&next) {
                    if cnt.passed != next_cnt.input {
                        return Err(Error::integrity_violation(
                            next,
                            format!(
                                "received {} reads but {} passed {}",
                                next_cnt.input, stage, cnt.passed
                            ),
                        ));
                    }
                }
            }
        }
        Ok(())
    }
}
