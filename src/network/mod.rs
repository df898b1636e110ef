//! Network output sinks
//!
//! Provides frame output to other applications via:
//! - Virtual camera device (v4l2loopback or a FIFO read by another process)

pub mod virtual_cam;

pub use virtual_cam::{VirtualCamera, VirtualCameraConfig, VirtualCameraError};
