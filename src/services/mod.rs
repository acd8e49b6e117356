//! Service layer: all game semantics live here, behind the HTTP routes.

pub mod card_service;
pub mod documentation;
pub mod event_service;
pub mod host_service;
pub mod presence_service;
pub mod round_service;
pub mod snapshot_service;
pub mod sse_service;
pub mod storage_supervisor;
pub mod timer_service;
pub mod wheel_service;
