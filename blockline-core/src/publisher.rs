//! Output surfaces for the composed status line.
//!
//! A publisher only writes. Deciding *whether* to publish is the engine's
//! job, and retry policy belongs to whoever drives the engine.

use async_trait::async_trait;
use std::io;
use std::process::ExitStatus;
use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt};

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("failed to write status: {0}")]
    Io(#[from] io::Error),

    #[error("`{program}` exited with {status}")]
    Setter { program: String, status: ExitStatus },

    #[cfg(feature = "x11")]
    #[error("X11 error: {0}")]
    Display(#[from] xcb::Error),

    #[cfg(feature = "x11")]
    #[error("X11 screen {0} not found")]
    NoScreen(i32),
}

/// Something that accepts a status line and replaces whatever it showed
/// before.
#[async_trait]
pub trait Publisher: Send {
    async fn publish(&mut self, status: &str) -> Result<(), PublishError>;
}

/// Writes each status as one line to an async writer, flushing every time.
#[derive(Debug)]
pub struct WriterPublisher<W> {
    out: W,
}

pub type StdoutPublisher = WriterPublisher<tokio::io::Stdout>;

impl WriterPublisher<tokio::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(tokio::io::stdout())
    }
}

impl<W> WriterPublisher<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> Publisher for WriterPublisher<W> {
    async fn publish(&mut self, status: &str) -> Result<(), PublishError> {
        self.out.write_all(status.as_bytes()).await?;
        self.out.write_all(b"\n").await?;
        self.out.flush().await?;
        Ok(())
    }
}

// ----------------------------------------------------------------
// X root window name
// ----------------------------------------------------------------

/// Sets the root window name, which dwm-style window managers draw as their
/// status text.
#[cfg(feature = "x11")]
pub struct RootNamePublisher {
    conn: xcb::Connection,
    root: xcb::x::Window,
}

#[cfg(feature = "x11")]
impl std::fmt::Debug for RootNamePublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RootNamePublisher")
            .field("conn", &"xcb::Connection")
            .field("root", &self.root)
            .finish()
    }
}

#[cfg(feature = "x11")]
impl RootNamePublisher {
    /// Connects to the display named by `$DISPLAY`.
    pub fn connect() -> Result<Self, PublishError> {
        let (conn, screen_num) = xcb::Connection::connect(None).map_err(xcb::Error::from)?;
        let root = conn
            .get_setup()
            .roots()
            .nth(usize::try_from(screen_num).unwrap_or(0))
            .map(|screen| screen.root())
            .ok_or(PublishError::NoScreen(screen_num))?;
        tracing::info!("connected to X display, screen {}", screen_num);
        Ok(Self { conn, root })
    }
}

#[cfg(feature = "x11")]
#[async_trait]
impl Publisher for RootNamePublisher {
    async fn publish(&mut self, status: &str) -> Result<(), PublishError> {
        use xcb::x;

        self.conn
            .send_and_check_request(&x::ChangeProperty {
                mode: x::PropMode::Replace,
                window: self.root,
                property: x::ATOM_WM_NAME,
                r#type: x::ATOM_STRING,
                data: status.as_bytes(),
            })
            .map_err(xcb::Error::from)?;
        self.conn.flush().map_err(xcb::Error::from)?;
        Ok(())
    }
}

/// Sets the root window name by running `xsetroot -name`.
#[cfg(not(feature = "x11"))]
#[derive(Debug, Clone)]
pub struct RootNamePublisher {
    program: String,
}

#[cfg(not(feature = "x11"))]
impl RootNamePublisher {
    pub fn connect() -> Result<Self, PublishError> {
        Ok(Self::with_program("xsetroot"))
    }

    /// Uses `program` instead of `xsetroot`. It is invoked as
    /// `program -name <status>`.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[cfg(not(feature = "x11"))]
#[async_trait]
impl Publisher for RootNamePublisher {
    async fn publish(&mut self, status: &str) -> Result<(), PublishError> {
        let result = tokio::process::Command::new(&self.program)
            .arg("-name")
            .arg(status)
            .stdin(std::process::Stdio::null())
            .kill_on_drop(true)
            .status()
            .await?;

        if !result.success() {
            return Err(PublishError::Setter {
                program: self.program.clone(),
                status: result,
            });
        }
        Ok(())
    }
}
