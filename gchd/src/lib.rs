//! Userspace driver for the Elgato Game Capture HD.
//!
//! The device has no kernel driver. This crate finds it, claims its
//! interface, replays the vendor initialization script for the requested
//! output standard and relays the transport stream into a named pipe, then
//! resets the device and releases everything on the way out.

pub mod capture;
pub mod config;
pub mod error;
pub mod resolution;
pub mod run_flag;
pub mod session;
pub mod shutdown;
pub mod sink;

pub use capture::gchd::script::{Script, ScriptDir, ScriptLibrary};
pub use capture::gchd::stream::StreamStats;
pub use capture::gchd::{DeviceIdentity, IDENTITIES};
pub use capture::{CaptureDevice, UsbStack};
pub use config::Config;
pub use error::Error;
pub use resolution::ResolutionKey;
pub use run_flag::RunFlag;
pub use session::{run, Session, State};
pub use sink::Sink;
