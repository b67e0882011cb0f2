pub use dlgate_api as api;
pub use dlgate_cache as cache;
pub use dlgate_geo as geo;
pub use dlgate_release as release;
pub use dlgate_resolver as resolver;
pub use dlgate_store as store;
pub use dlgate_utils as utils;
