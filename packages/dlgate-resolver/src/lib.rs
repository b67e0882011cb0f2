pub mod os;
pub mod plan;

pub use os::{detect_os, ClientOs};
pub use plan::{
    is_placeholder, resolve_plan, substitute_version, DisabledReason, DownloadAction,
    DownloadOption, DownloadPlan, DownloadSource, PLACEHOLDER_MARKER, VERSION_TOKEN,
};
