//! Vendor command scripts.
//!
//! A script is a list of commands replayed verbatim; nothing here knows
//! what the commands do to the device. Text format, one command per line:
//!
//! ```text
//! # comment
//! out 0xbc 0x0000 0x0900 0102ff      vendor control write
//! in  0xbc 0x0000 0x0800 4           vendor control read, result dropped
//! bulk 5b5903                        bulk write to the OUT endpoint
//! firmware mb86h57_h58_idle.bin      stream a firmware file to the OUT endpoint
//! sleep 100                          milliseconds
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use log::{debug, trace};
use rusb::{Direction, Recipient, RequestType};
use simple_error::SimpleError;

use super::{EP_OUT, TIMEOUT};
use crate::capture::CaptureDevice;
use crate::error::ConfigurationError;
use crate::ResolutionKey;

pub const SCRIPT_EXTENSION: &str = "gchd";
pub const RESET_SCRIPT: &str = "remove";

const FIRMWARE_CHUNK: usize = 0x4000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    ControlOut {
        request: u8,
        value: u16,
        index: u16,
        data: Vec<u8>,
    },
    ControlIn {
        request: u8,
        value: u16,
        index: u16,
        length: u16,
    },
    Bulk(Vec<u8>),
    Firmware(PathBuf),
    Sleep(Duration),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    name: String,
    commands: Vec<Command>,
}

impl Script {
    pub fn parse(name: &str, text: &str) -> Result<Self, ConfigurationError> {
        let mut commands = Vec::new();

        for (number, line) in text.lines().enumerate() {
            let line = match line.find('#') {
                Some(pos) => &line[..pos],
                None => line,
            };
            let words: Vec<&str> = line.split_whitespace().collect();
            if words.is_empty() {
                continue;
            }

            let command = parse_command(&words).map_err(|err| ConfigurationError::Script {
                name: name.to_string(),
                source: SimpleError::new(format!("line {}: {}", number + 1, err)),
            })?;
            commands.push(command);
        }

        Ok(Self {
            name: name.to_string(),
            commands,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Send every command in order, stopping at the first failure.
    pub fn replay<D: CaptureDevice + ?Sized>(
        &self,
        handle: &mut D,
        firmware_dir: &Path,
    ) -> Result<(), ConfigurationError> {
        debug!("replaying {} ({} commands)", self.name, self.commands.len());

        let out_type = rusb::request_type(Direction::Out, RequestType::Vendor, Recipient::Device);
        let in_type = rusb::request_type(Direction::In, RequestType::Vendor, Recipient::Device);

        for command in &self.commands {
            trace!("{:02X?}", command);
            match command {
                Command::ControlOut {
                    request,
                    value,
                    index,
                    data,
                } => {
                    handle
                        .write_control(out_type, *request, *value, *index, data, TIMEOUT)
                        .map_err(ConfigurationError::DeviceCommandFailed)?;
                }
                Command::ControlIn {
                    request,
                    value,
                    index,
                    length,
                } => {
                    let mut buf = vec![0; *length as usize];
                    handle
                        .read_control(in_type, *request, *value, *index, &mut buf, TIMEOUT)
                        .map_err(ConfigurationError::DeviceCommandFailed)?;
                }
                Command::Bulk(data) => {
                    handle
                        .write_bulk(EP_OUT, data, TIMEOUT)
                        .map_err(ConfigurationError::DeviceCommandFailed)?;
                }
                Command::Firmware(file) => {
                    let path = firmware_dir.join(file);
                    let firmware = fs::read(&path)
                        .map_err(|source| ConfigurationError::Read { path, source })?;
                    for chunk in firmware.chunks(FIRMWARE_CHUNK) {
                        handle
                            .write_bulk(EP_OUT, chunk, TIMEOUT)
                            .map_err(ConfigurationError::DeviceCommandFailed)?;
                    }
                }
                Command::Sleep(duration) => thread::sleep(*duration),
            }
        }

        Ok(())
    }
}

fn parse_command(words: &[&str]) -> Result<Command, String> {
    match words {
        ["out", request, value, index, data] => Ok(Command::ControlOut {
            request: parse_hex_u8(request)?,
            value: parse_hex_u16(value)?,
            index: parse_hex_u16(index)?,
            data: parse_data(data)?,
        }),
        ["in", request, value, index, length] => Ok(Command::ControlIn {
            request: parse_hex_u8(request)?,
            value: parse_hex_u16(value)?,
            index: parse_hex_u16(index)?,
            length: length
                .parse()
                .map_err(|_| format!("bad length `{}`", length))?,
        }),
        ["bulk", data] => Ok(Command::Bulk(parse_data(data)?)),
        ["firmware", file] => Ok(Command::Firmware(PathBuf::from(file))),
        ["sleep", millis] => millis
            .parse()
            .map(|ms| Command::Sleep(Duration::from_millis(ms)))
            .map_err(|_| format!("bad delay `{}`", millis)),
        [op, ..] => Err(format!("unknown or malformed command `{}`", op)),
        [] => Err("empty command".to_string()),
    }
}

fn parse_hex_u16(word: &str) -> Result<u16, String> {
    let digits = word.trim_start_matches("0x");
    u16::from_str_radix(digits, 16).map_err(|_| format!("bad number `{}`", word))
}

fn parse_hex_u8(word: &str) -> Result<u8, String> {
    let digits = word.trim_start_matches("0x");
    u8::from_str_radix(digits, 16).map_err(|_| format!("bad number `{}`", word))
}

fn parse_data(word: &str) -> Result<Vec<u8>, String> {
    hex::decode(word).map_err(|err| format!("bad hex data `{}`: {}", word, err))
}

/// Where initialization and reset scripts come from.
pub trait ScriptLibrary {
    fn init_script(&self, key: ResolutionKey) -> Result<Script, ConfigurationError>;

    fn reset_script(&self) -> Result<Script, ConfigurationError>;
}

/// Scripts stored as `<name>.gchd` files in one directory.
#[derive(Debug, Clone)]
pub struct ScriptDir {
    root: PathBuf,
}

impl ScriptDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn load(&self, name: &str) -> Result<Script, ConfigurationError> {
        let path = self.root.join(name).with_extension(SCRIPT_EXTENSION);
        let text = fs::read_to_string(&path)
            .map_err(|source| ConfigurationError::Read { path, source })?;
        Script::parse(name, &text)
    }
}

impl ScriptLibrary for ScriptDir {
    fn init_script(&self, key: ResolutionKey) -> Result<Script, ConfigurationError> {
        self.load(key.script_name())
    }

    fn reset_script(&self) -> Result<Script, ConfigurationError> {
        self.load(RESET_SCRIPT)
    }
}
