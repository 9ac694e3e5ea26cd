pub mod dispatch;
pub mod machine;

pub use dispatch::WorkerDispatch;
pub use machine::{
    TickOutcome, TriggerOutcome, TriggerRequest, TriggerSkip, error, force_unlock, is_stoppable, next,
    rack_trigger,
};
