pub mod event_bus;

pub use event_bus::{DispatchReport, EmittedRecord, EventBus, Handler, SubscriptionId};
