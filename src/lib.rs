pub mod config;
pub mod core;
pub mod events;
pub mod scheduler;
pub mod service;
pub mod sink;
pub mod storage;
pub mod testing;

pub use config::{ConfigError, NudgeConfig, SeedTask, SinkConfig, UserConfig, YamlLoader};
pub use crate::core::clock::{Clock, SystemClock};
pub use crate::core::plan::FirePlan;
pub use crate::core::request::{DEFAULT_LEAD_TIME, ReminderRequest, RequestProblem};
pub use crate::core::task::{NewTask, Priority, Task, TaskUpdate, User};
pub use crate::core::types::{ReminderId, TaskId, UserId};
pub use events::{Event, EventBus, EventHandler};
pub use scheduler::{ReminderHandle, ReminderInfo, ReminderScheduler, ReminderState, SchedulerError};
pub use service::{TaskService, TaskServiceError};
pub use sink::{DeliveryError, LogSink, NotificationSink, WebhookSink};
pub use storage::{InMemoryTaskStore, StorageError, TaskStore};
