//! Revision signals used for change detection.

use std::fmt;

use super::graph::GraphData;

/// Opaque value that changes whenever a view's backend resource changes.
///
/// Only equality is meaningful.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Revision {
	/// Nothing observed yet.
	#[default]
	Unset,
	/// File modification time reported by the backend.
	Mtime(f64),
	/// Tag built from an artifact's identity and size.
	Tag(String),
}

impl fmt::Display for Revision {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Revision::Unset => f.write_str("unset"),
			Revision::Mtime(t) => write!(f, "mtime {t}"),
			Revision::Tag(tag) => write!(f, "tag {tag}"),
		}
	}
}

/// Result of querying a view's revision signal.
///
/// Sources that must fetch the whole artifact to learn its revision hand the
/// graph back too, so a change does not cost a second download.
#[derive(Clone, Debug, PartialEq)]
pub struct Observation {
	/// Current revision.
	pub revision: Revision,
	/// The graph at that revision, when it came for free.
	pub graph: Option<GraphData>,
}

impl Observation {
	/// An observation carrying only the revision.
	pub fn revision(revision: Revision) -> Self {
		Self {
			revision,
			graph: None,
		}
	}
}
