// vidmark services
// Services hold the cross-cutting logic: availability guard, lifecycle, data portability, playback policy.

pub mod clock;
pub mod data_transfer;
pub mod maintenance;
pub mod notifier;
pub mod playback_monitor;
pub mod runtime_context;
pub mod video_url;
