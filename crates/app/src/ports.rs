//! Port definitions: traits that adapters implement.
//!
//! Ports are the boundaries between the application core and the outside world.
//! They are defined here (in `app`) so that both the use-case layer and the
//! adapter layer can depend on them without creating circular dependencies.

pub mod automation_repo;
pub mod event_bus;
pub mod execution_recorder;
pub mod http_client;
pub mod webhook_repo;

pub use automation_repo::AutomationRepository;
pub use event_bus::EventPublisher;
pub use execution_recorder::ExecutionRecorder;
pub use http_client::HttpClient;
pub use webhook_repo::WebhookRepository;
