pub mod atlas;
pub mod batch;
pub mod camera;
pub mod churn;
pub mod frame;
pub mod input;
pub mod store;
pub mod time;
pub mod viewport;

pub use atlas::{AtlasIndex, PixelRect, SpriteStyleRect, StyleFilter};
pub use batch::{BatchGeometry, IndexData, SpriteVertex};
pub use camera::CameraTransform;
pub use churn::{ChurnConfig, ChurnDriver, ChurnTick};
pub use frame::{DrawCommand, FrameDecision, FrameGate, FrameOutcome, FrameStats};
pub use store::{SpriteEntity, SpriteStore};
pub use viewport::{ViewportController, ViewportState};
