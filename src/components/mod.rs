//! UI components.

pub mod brief_upload;
pub mod context_job;
pub mod force_graph;
pub mod view_tabs;

pub use brief_upload::BriefUpload;
pub use context_job::ContextJobForm;
pub use force_graph::{ForceGraphCanvas, SignalRenderer};
pub use view_tabs::ViewTabs;
