use std::ffi::CString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::{FileTypeExt, OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use log::{info, warn};

use crate::error::SinkError;
use crate::RunFlag;

const READER_POLL: Duration = Duration::from_millis(100);

/// Named pipe the transport stream is written to.
#[derive(Debug)]
pub struct Sink {
    path: PathBuf,
    file: Option<File>,
}

impl Sink {
    /// Create a fresh FIFO at `path`. A FIFO left behind by an earlier run is
    /// replaced; anything else at that path is an error.
    pub fn create(path: &Path, mode: u32) -> Result<Self, SinkError> {
        let create_err = |source| SinkError::Create {
            path: path.to_path_buf(),
            source,
        };

        if let Ok(meta) = fs::symlink_metadata(path) {
            if !meta.file_type().is_fifo() {
                return Err(create_err(io::ErrorKind::AlreadyExists.into()));
            }
            fs::remove_file(path).map_err(create_err)?;
        }

        let c_path = CString::new(path.as_os_str().as_bytes())
            .map_err(|err| create_err(io::Error::new(io::ErrorKind::InvalidInput, err)))?;
        if unsafe { libc::mkfifo(c_path.as_ptr(), mode as libc::mode_t) } != 0 {
            return Err(create_err(io::Error::last_os_error()));
        }
        // mkfifo is subject to the umask
        fs::set_permissions(path, fs::Permissions::from_mode(mode)).map_err(create_err)?;

        info!("{} has been created. Waiting for user to open it.", path.display());

        Ok(Self {
            path: path.to_path_buf(),
            file: None,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }

    /// Block until a reader opens the FIFO. Returns `false` if `run_flag`
    /// stopped first. The descriptor stays non-blocking: a reader that stops
    /// reading makes writes fail with `WouldBlock` instead of hanging.
    pub fn wait_for_reader(&mut self, run_flag: &RunFlag) -> Result<bool, SinkError> {
        let path = self.path.clone();
        let open_err = |source| SinkError::Open {
            path: path.clone(),
            source,
        };

        while run_flag.is_running() {
            match OpenOptions::new()
                .write(true)
                .custom_flags(libc::O_NONBLOCK)
                .open(&path)
            {
                Ok(file) => {
                    self.file = Some(file);
                    return Ok(true);
                }
                Err(err) if err.raw_os_error() == Some(libc::ENXIO) => thread::sleep(READER_POLL),
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(err) => return Err(open_err(err)),
            }
        }

        Ok(false)
    }

    /// Close the descriptor and remove the FIFO. Failures are logged.
    pub fn close(mut self) {
        self.file.take();
        if let Err(err) = fs::remove_file(&self.path) {
            if err.kind() != io::ErrorKind::NotFound {
                warn!("could not remove {}: {}", self.path.display(), err);
            }
        }
    }
}

impl Write for Sink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.file.as_mut() {
            Some(file) => file.write(buf),
            None => Err(io::ErrorKind::NotConnected.into()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.file.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}
