/// Check-execution pipeline
///
/// - `checker`: probes a single monitor with a hard deadline
/// - `scheduler`: splits monitors into bounded concurrent batches
/// - `persister`: writes one batch of outcomes in a single transaction
/// - `coordinator`: drives a whole cycle and builds the summary
pub mod checker;
pub mod coordinator;
pub mod persister;
pub mod scheduler;
pub mod types;


pub use checker::{HttpProber, Prober};
pub use coordinator::{RunCoordinator, RunError};
pub use persister::ResultPersister;
pub use scheduler::BatchScheduler;
pub use types::{BatchOutcome, MonitorRunResult, ProbeResult, RunSummary};
