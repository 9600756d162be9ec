pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod presentation;

pub use application::engine::{Scheduler, SchedulerConfig};
pub use application::use_cases;
pub use domain::entities;
pub use domain::error::{SchedulerError, SchedulerResult};
pub use domain::job_execution::{ExecutableJob, JobExecutionContext, JobFactory};
pub use domain::repositories::job_store::JobStore;
pub use domain::value_objects;
pub use infrastructure::parsers;
pub use infrastructure::repositories::InMemoryJobStore;
