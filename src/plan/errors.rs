use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("Operation size cost {cost} exceeds maxOperationsPerBatch {limit}")]
    OversizedOperation { cost: usize, limit: usize },

    #[error("An initialization operation must be the first operation of a plan, found at index {0}")]
    InitializeNotFirst(usize),
}
