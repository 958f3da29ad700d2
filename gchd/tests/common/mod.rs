#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::thread;
use std::time::Duration;

use gchd::config::{FIRMWARE_ENC, FIRMWARE_IDLE};
use gchd::error::ConfigurationError;
use gchd::{CaptureDevice, Config, ResolutionKey, RunFlag, Script, ScriptLibrary, UsbStack};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Open(u16),
    KernelDriverActive,
    DetachKernelDriver,
    SetConfiguration(u8),
    Claim(u8),
    Release(u8),
    ControlOut(u8, u16, u16, Vec<u8>),
    ControlIn(u8, u16, u16, usize),
    BulkOut(Vec<u8>),
    BulkIn,
    ClearHalt(u8),
    CloseDevice,
    ExitContext,
}

#[derive(Default)]
pub struct MockState {
    pub ops: Vec<Op>,
    pub present: Vec<u16>,
    pub kernel_driver: bool,
    pub fail_set_configuration: bool,
    pub fail_claim: bool,
    pub fail_control: bool,
    pub reads: VecDeque<rusb::Result<Vec<u8>>>,
    /// Served on every read once `reads` is drained.
    pub repeat: Option<Vec<u8>>,
    pub stop_when_drained: Option<RunFlag>,
}

/// Fake USB bus. Every device operation lands in `ops`, in call order.
#[derive(Clone, Default)]
pub struct Harness {
    state: Rc<RefCell<MockState>>,
}

impl Harness {
    pub fn with_devices(present: &[u16]) -> Self {
        let harness = Self::default();
        harness.state.borrow_mut().present = present.to_vec();
        harness
    }

    pub fn set(&self, f: impl FnOnce(&mut MockState)) {
        f(&mut self.state.borrow_mut());
    }

    pub fn ops(&self) -> Vec<Op> {
        self.state.borrow().ops.clone()
    }

    pub fn stack(&self) -> MockStack {
        MockStack {
            state: self.state.clone(),
        }
    }

    pub fn device(&self) -> MockDevice {
        MockDevice {
            state: self.state.clone(),
        }
    }

    fn record(&self, op: Op) {
        self.state.borrow_mut().ops.push(op);
    }
}

pub struct MockStack {
    state: Rc<RefCell<MockState>>,
}

impl UsbStack for MockStack {
    type Device = MockDevice;

    fn open_device(&mut self, vid: u16, pid: u16) -> rusb::Result<Option<MockDevice>> {
        assert_eq!(vid, 0x0fd9);
        let mut state = self.state.borrow_mut();
        state.ops.push(Op::Open(pid));
        if state.present.contains(&pid) {
            Ok(Some(MockDevice {
                state: self.state.clone(),
            }))
        } else {
            Ok(None)
        }
    }
}

impl Drop for MockStack {
    fn drop(&mut self) {
        self.state.borrow_mut().ops.push(Op::ExitContext);
    }
}

pub struct MockDevice {
    state: Rc<RefCell<MockState>>,
}

impl MockDevice {
    fn record(&self, op: Op) {
        self.state.borrow_mut().ops.push(op);
    }
}

impl Drop for MockDevice {
    fn drop(&mut self) {
        self.record(Op::CloseDevice);
    }
}

impl CaptureDevice for MockDevice {
    fn kernel_driver_active(&mut self, _iface: u8) -> rusb::Result<bool> {
        self.record(Op::KernelDriverActive);
        Ok(self.state.borrow().kernel_driver)
    }

    fn detach_kernel_driver(&mut self, _iface: u8) -> rusb::Result<()> {
        self.record(Op::DetachKernelDriver);
        self.state.borrow_mut().kernel_driver = false;
        Ok(())
    }

    fn set_active_configuration(&mut self, config: u8) -> rusb::Result<()> {
        self.record(Op::SetConfiguration(config));
        if self.state.borrow().fail_set_configuration {
            return Err(rusb::Error::Io);
        }
        Ok(())
    }

    fn claim_interface(&mut self, iface: u8) -> rusb::Result<()> {
        self.record(Op::Claim(iface));
        if self.state.borrow().fail_claim {
            return Err(rusb::Error::Busy);
        }
        Ok(())
    }

    fn release_interface(&mut self, iface: u8) -> rusb::Result<()> {
        self.record(Op::Release(iface));
        Ok(())
    }

    fn clear_halt(&mut self, endpoint: u8) -> rusb::Result<()> {
        self.record(Op::ClearHalt(endpoint));
        Ok(())
    }

    fn write_control(
        &mut self,
        _request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        buf: &[u8],
        _timeout: Duration,
    ) -> rusb::Result<usize> {
        self.record(Op::ControlOut(request, value, index, buf.to_vec()));
        if self.state.borrow().fail_control {
            return Err(rusb::Error::Pipe);
        }
        Ok(buf.len())
    }

    fn read_control(
        &mut self,
        _request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        buf: &mut [u8],
        _timeout: Duration,
    ) -> rusb::Result<usize> {
        self.record(Op::ControlIn(request, value, index, buf.len()));
        Ok(buf.len())
    }

    fn write_bulk(&mut self, _endpoint: u8, buf: &[u8], _timeout: Duration) -> rusb::Result<usize> {
        self.record(Op::BulkOut(buf.to_vec()));
        Ok(buf.len())
    }

    fn read_bulk(
        &mut self,
        endpoint: u8,
        buf: &mut [u8],
        _timeout: Duration,
    ) -> rusb::Result<usize> {
        assert_eq!(endpoint, 0x81);
        self.record(Op::BulkIn);

        let mut state = self.state.borrow_mut();
        match state.reads.pop_front() {
            Some(Ok(data)) => {
                buf[..data.len()].copy_from_slice(&data);
                Ok(data.len())
            }
            Some(Err(err)) => Err(err),
            None if state.repeat.is_some() => {
                let data = state.repeat.as_deref().unwrap_or_default();
                buf[..data.len()].copy_from_slice(data);
                Ok(data.len())
            }
            None => {
                // the stream is over: behave like a termination signal
                if let Some(flag) = state.stop_when_drained.as_ref() {
                    flag.stop();
                }
                Err(rusb::Error::Timeout)
            }
        }
    }
}

/// In-memory script library remembering which scripts were asked for.
#[derive(Default)]
pub struct MemoryScripts {
    texts: HashMap<String, String>,
    pub requested: RefCell<Vec<String>>,
}

impl MemoryScripts {
    pub fn new() -> Self {
        let mut scripts = Self::default();
        for key in ResolutionKey::ALL {
            scripts.insert(
                key.script_name(),
                &format!("out 0xbc 0x{:04x} 0x0000 01\nbulk 5b5903\n", key as u16),
            );
        }
        scripts.insert("remove", "out 0xbc 0x0000 0x0900 00\n");
        scripts
    }

    pub fn insert(&mut self, name: &str, text: &str) {
        self.texts.insert(name.to_string(), text.to_string());
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.borrow().clone()
    }

    fn load(&self, name: &str) -> Result<Script, ConfigurationError> {
        self.requested.borrow_mut().push(name.to_string());
        match self.texts.get(name) {
            Some(text) => Script::parse(name, text),
            None => Err(ConfigurationError::Read {
                path: PathBuf::from(name),
                source: std::io::ErrorKind::NotFound.into(),
            }),
        }
    }
}

impl ScriptLibrary for MemoryScripts {
    fn init_script(&self, key: ResolutionKey) -> Result<Script, ConfigurationError> {
        self.load(key.script_name())
    }

    fn reset_script(&self) -> Result<Script, ConfigurationError> {
        self.load("remove")
    }
}

pub fn reset_op() -> Op {
    Op::ControlOut(0xbc, 0x0000, 0x0900, vec![0x00])
}

/// Config rooted in `dir`, with both firmware files present.
pub fn config_in(dir: &Path) -> Config {
    let firmware_dir = dir.join("firmware");
    fs::create_dir_all(&firmware_dir).unwrap();
    fs::write(firmware_dir.join(FIRMWARE_IDLE), b"idle").unwrap();
    fs::write(firmware_dir.join(FIRMWARE_ENC), b"enc").unwrap();

    Config {
        firmware_dir,
        script_dir: dir.join("scripts"),
        sink_path: dir.join("gchd.ts"),
        sink_mode: 0o644,
    }
}

/// Wait for the FIFO to appear, then read it until the writer goes away.
pub fn spawn_reader(path: PathBuf) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        while !path.exists() {
            thread::sleep(Duration::from_millis(5));
        }
        let mut file = File::open(&path).unwrap();
        let mut received = Vec::new();
        file.read_to_end(&mut received).unwrap();
        received
    })
}
