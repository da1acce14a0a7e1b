pub mod scheduler;
pub mod specs;

pub use scheduler::{ FilterScheduler, FilterTransport, RpcTransport, SchedulerConfig, SchedulerStats };
pub use specs::{ address_topic, filter_specs, FilterSpec, MonitorMode };
