use crate::common::Stage;

///////////////////////////////
/// Where a run is. Stages only move forward; Failed is terminal and reachable from anywhere
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Init,
    Running(Stage),
    Aggregate,
    Done,
    Failed(Option<Stage>),
}

impl PipelineState {
    ///////////////////////////////
    /// The state after this one on success
    pub fn next(&self) -> Option<PipelineState> {
        match self {
            PipelineState::Init => Some(PipelineState::Running(Stage::Trimming)),
            PipelineState::Running(stage) => Some(match stage.next() {
                Some(next) => PipelineState::Running(next),
                None => PipelineState::Aggregate,
            }),
            PipelineState::Aggregate => Some(PipelineState::Done),
            PipelineState::Done | PipelineState::Failed(_) => None,
        }
    }

    pub fn stage(&self) -> Option<Stage> {
        match self {
            PipelineState::Running(stage) => Some(*stage),
            PipelineState::Failed(stage) => *stage,
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Failed(_))
    }

    /// Move to the failed state, remembering the stage that was running. Terminal states stay put
    pub fn fail(&self) -> PipelineState {
        if self.is_terminal() {
            *self
        } else {
            PipelineState::Failed(self.stage())
        }
    }
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            PipelineState::Init => write!(f, "init"),
            PipelineState::Running(stage) => write!(f, "{}", stage),
            PipelineState::Aggregate => write!(f, "aggregate"),
            PipelineState::Done => write!(f, "done"),
            PipelineState::Failed(Some(stage)) => write!(f, "failed ({})", stage),
            PipelineState::Failed(None) => write!(f, "failed"),
        }
    }
}
