mod event_bus;
mod supervisor;

pub use event_bus::InProcJobEventBus;
pub use supervisor::WordCountRuntime;
