//! Crate-wide constants.
//!
//! Centralizes tunable defaults so settings, tests and the runtime agree on
//! the same values.

// ============================================================================
// Gesture
// ============================================================================

/// Distance in host pixels a pressed pointer must travel before a drag starts
pub const DEFAULT_DRAG_THRESHOLD_PX: f32 = 5.0;

// ============================================================================
// Cross-boundary dispatch
// ============================================================================

/// How long the input thread waits for content to acknowledge an event
pub const DEFAULT_ACK_TIMEOUT_MS: u64 = 250;

/// Maximum number of events queued towards content before the input thread blocks
pub const DEFAULT_DISPATCH_QUEUE_DEPTH: usize = 8;

/// Name of the thread that stands in for the content execution context
pub const CONTENT_THREAD_NAME: &str = "apz-dnd-content";

// ============================================================================
// Pan / zoom transform
// ============================================================================

/// Number of transform snapshots retained for generation lookups
pub const DEFAULT_TRANSFORM_HISTORY: usize = 16;

/// How many times a mapping is recomputed when the transform keeps moving under it
pub const DEFAULT_MAX_REMAP_ATTEMPTS: u32 = 3;

/// Smallest scale accepted for a published transform
pub const MIN_SCALE: f32 = 0.01;

// ============================================================================
// Payload formats
// ============================================================================

pub const FORMAT_TEXT_PLAIN: &str = "text/plain";
pub const FORMAT_TEXT_HTML: &str = "text/html";
pub const FORMAT_URI_LIST: &str = "text/uri-list";

// ============================================================================
// Logging & profiling
// ============================================================================

/// Default tracing filter when neither RUST_LOG nor settings provide one
pub const DEFAULT_LOG_FILTER: &str = "apz_dnd=info";

/// Hit tests slower than this are logged
pub const HIT_TEST_WARN_MS: f64 = 2.0;

/// Content acknowledgements slower than this are logged
pub const DISPATCH_WARN_MS: f64 = 50.0;
