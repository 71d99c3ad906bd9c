pub mod session;
pub mod step;

pub use session::SessionSelection;
pub use step::{NavigationBlock, StepContext, WorkflowStep};
