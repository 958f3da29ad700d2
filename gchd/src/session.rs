//! Device lifecycle.
//!
//! A [`Session`] owns every resource acquired on the way to streaming and
//! gives them back in reverse order in [`Session::cleanup`], whatever stage
//! was reached. Dropping a session runs the cleanup if nobody did.

use log::{debug, error, info, warn};

use crate::capture::gchd::script::{Script, ScriptLibrary};
use crate::capture::gchd::stream::{self, StreamStats};
use crate::capture::gchd::{self as device, DeviceIdentity, INTERFACE_NUM};
use crate::capture::{CaptureDevice, UsbStack};
use crate::error::{DiscoveryError, Error, SinkError};
use crate::{Config, ResolutionKey, RunFlag, Sink};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Start,
    Locating,
    Located,
    InterfaceClaimed,
    Configured,
    Streaming,
    Stopping,
    CleanedUp,
}

pub struct Session<S: UsbStack> {
    config: Config,
    state: State,
    stack: Option<S>,
    handle: Option<S::Device>,
    claimed: bool,
    initialized: bool,
    reset_script: Option<Script>,
    sink: Option<Sink>,
}

impl<S: UsbStack> Session<S> {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            state: State::Start,
            stack: None,
            handle: None,
            claimed: false,
            initialized: false,
            reset_script: None,
            sink: None,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn is_claimed(&self) -> bool {
        self.claimed
    }

    pub fn has_usb_context(&self) -> bool {
        self.stack.is_some()
    }

    pub fn has_device(&self) -> bool {
        self.handle.is_some()
    }

    pub fn has_sink(&self) -> bool {
        self.sink.is_some()
    }

    /// Bring up the USB context with `bring_up` and open the first known
    /// device. The context is kept even if no device is found.
    pub fn locate<F>(&mut self, bring_up: F, identities: &[DeviceIdentity]) -> Result<(), Error>
    where
        F: FnOnce() -> rusb::Result<S>,
    {
        self.state = State::Locating;
        let stack = self
            .stack
            .insert(bring_up().map_err(DiscoveryError::UsbInit)?);

        self.handle = Some(device::locate(stack, identities)?);
        self.state = State::Located;
        Ok(())
    }

    pub fn acquire(&mut self) -> Result<(), Error> {
        let handle = self.handle.as_mut().ok_or(DiscoveryError::NotFound)?;
        device::acquire(handle)?;
        self.claimed = true;
        self.state = State::InterfaceClaimed;
        Ok(())
    }

    /// Create the FIFO and wait for a reader. `Ok(false)` means the run flag
    /// stopped while waiting.
    pub fn open_sink(&mut self, run_flag: &RunFlag) -> Result<bool, Error> {
        let sink = self.sink.insert(Sink::create(
            &self.config.sink_path,
            self.config.sink_mode,
        )?);
        Ok(sink.wait_for_reader(run_flag)?)
    }

    /// Replay the initialization script for `key`. The reset script is
    /// loaded first so that cleanup never has to read a file.
    pub fn configure<L>(&mut self, key: ResolutionKey, scripts: &L) -> Result<(), Error>
    where
        L: ScriptLibrary + ?Sized,
    {
        if !self.claimed {
            return Err(DiscoveryError::NotFound.into());
        }
        let handle = self.handle.as_mut().ok_or(DiscoveryError::NotFound)?;

        let reset = scripts.reset_script()?;
        let init = scripts.init_script(key)?;

        info!("Running. Initializing device for {}.", key);
        init.replay(handle, &self.config.firmware_dir)?;

        self.reset_script = Some(reset);
        self.initialized = true;
        self.state = State::Configured;
        Ok(())
    }

    /// Relay the payload stream into the sink until `run_flag` stops.
    pub fn stream(&mut self, run_flag: &RunFlag) -> Result<StreamStats, Error> {
        let handle = self.handle.as_mut().ok_or(DiscoveryError::NotFound)?;
        let sink = self.sink.as_mut().ok_or_else(|| SinkError::Open {
            path: self.config.sink_path.clone(),
            source: std::io::ErrorKind::NotConnected.into(),
        })?;

        self.state = State::Streaming;
        info!("Streaming data from device now.");
        let result = stream::run(handle, sink, run_flag);
        self.state = State::Stopping;

        Ok(result?)
    }

    /// Give everything back, newest first. Runs its steps at most once and
    /// never fails; problems are logged.
    pub fn cleanup(&mut self) {
        if self.state == State::CleanedUp {
            return;
        }
        self.state = State::Stopping;

        if self.initialized {
            self.initialized = false;
            if let (Some(handle), Some(reset)) = (self.handle.as_mut(), self.reset_script.take()) {
                match reset.replay(handle, &self.config.firmware_dir) {
                    Ok(()) => info!("Device has been reset."),
                    Err(err) => error!("could not reset device: {}", err),
                }
            }
        }

        if self.claimed {
            self.claimed = false;
            if let Some(handle) = self.handle.as_mut() {
                if let Err(err) = handle.release_interface(INTERFACE_NUM) {
                    warn!("could not release interface: {}", err);
                }
            }
        }

        if let Some(handle) = self.handle.take() {
            drop(handle);
            debug!("device handle closed");
        }

        if let Some(stack) = self.stack.take() {
            drop(stack);
            debug!("usb context closed");
        }

        if let Some(sink) = self.sink.take() {
            sink.close();
        }

        self.state = State::CleanedUp;
        info!("Terminating.");
    }
}

impl<S: UsbStack> Drop for Session<S> {
    fn drop(&mut self) {
        self.cleanup();
    }
}

/// Full run: precondition check, locate, claim, sink, configure, stream.
/// Cleanup always runs before returning, after the failing stage (if any)
/// has been reported.
pub fn run<S, F, L>(
    config: Config,
    key: ResolutionKey,
    run_flag: &RunFlag,
    bring_up: F,
    scripts: &L,
) -> Result<StreamStats, Error>
where
    S: UsbStack,
    F: FnOnce() -> rusb::Result<S>,
    L: ScriptLibrary + ?Sized,
{
    let mut session = Session::new(config);
    let result = drive(&mut session, key, run_flag, bring_up, scripts);

    if let Err(err) = &result {
        error!("{}", err);
    }
    session.cleanup();
    result
}

fn drive<S, F, L>(
    session: &mut Session<S>,
    key: ResolutionKey,
    run_flag: &RunFlag,
    bring_up: F,
    scripts: &L,
) -> Result<StreamStats, Error>
where
    S: UsbStack,
    F: FnOnce() -> rusb::Result<S>,
    L: ScriptLibrary + ?Sized,
{
    session.config().check_firmware()?;
    session.locate(bring_up, &device::IDENTITIES)?;
    session.acquire()?;

    if !session.open_sink(run_flag)? || !run_flag.is_running() {
        return Ok(StreamStats::default());
    }

    session.configure(key, scripts)?;
    session.stream(run_flag)
}
