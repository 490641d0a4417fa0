//! Live camera analysis.

pub mod frame;
pub mod session;
pub mod webview;

pub use frame::{CapturedFrame, FramePixels, FrameSubmission};
pub use session::{FrameSource, LiveObserver, LiveSession, LiveSnapshot, LiveUpdate};
pub use webview::{TauriLiveObserver, WebviewFrameSource};
