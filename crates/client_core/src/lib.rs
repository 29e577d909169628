//! Live-state reconciliation engine for the mission dashboard.
//!
//! Authoritative pod positions and formation changes arrive over a pushed
//! event stream; local drags override the stream for the dragged pod until
//! release; formation commands run through a single in-flight dispatcher;
//! and a signal-strength metric is simulated on a fixed tick.

pub mod config;
pub mod dashboard;
pub mod dispatcher;
pub mod drag;
pub mod event_log;
pub mod ingress;
pub mod mesh;
pub mod registry;
pub mod runtime;
pub mod signal;
pub mod transport;

pub use config::{load_config, DashboardConfig};
pub use dashboard::{Dashboard, DashboardEvent, DashboardOptions, DashboardSnapshot};
pub use dispatcher::{CommandOutcome, CommandTicket, DispatchError};
pub use drag::{ContainerOrigin, DragError, PointerPosition};
pub use event_log::{LogEntry, EVENT_LOG_CAPACITY};
pub use ingress::StreamEvent;
pub use mesh::PodLink;
pub use runtime::{spawn_dashboard, DashboardError, DashboardHandle, RuntimeOptions};
pub use transport::{HttpMissionLink, MissionLink, OfflineMissionLink};
