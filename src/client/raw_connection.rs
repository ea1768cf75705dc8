//! Raw TCP connection for the discovery protocol
//!
//! One connection carries exactly one ASCII command. The reply is read line
//! by line until a line containing `END`.

use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::debug;

use crate::utils::{ConnectionError, DiscoveryError};

/// Terminator token of every discovery reply
const END_MARKER: &str = "END";

/// Blocking connection to a configuration endpoint
pub struct DiscoveryConnection {
    writer: BufWriter<TcpStream>,
    reader: BufReader<TcpStream>,
    io_timeout: Option<Duration>,
}

impl DiscoveryConnection {
    /// Create new TCP connection
    ///
    /// Without `connect_timeout` the platform default applies.
    pub fn connect_tcp(
        host: &str,
        port: u16,
        connect_timeout: Option<Duration>,
    ) -> Result<Self, ConnectionError> {
        let connect_failed = |source: io::Error| ConnectionError::ConnectFailed {
            host: host.to_string(),
            port,
            source,
        };

        let stream = match connect_timeout {
            Some(timeout) => {
                let addr = (host, port)
                    .to_socket_addrs()
                    .map_err(connect_failed)?
                    .next()
                    .ok_or_else(|| {
                        connect_failed(io::Error::new(
                            io::ErrorKind::NotFound,
                            "No addresses found",
                        ))
                    })?;
                TcpStream::connect_timeout(&addr, timeout).map_err(connect_failed)?
            }
            None => TcpStream::connect((host, port)).map_err(connect_failed)?,
        };

        stream.set_nodelay(true).ok();

        let writer = BufWriter::new(stream.try_clone().map_err(connect_failed)?);
        let reader = BufReader::new(stream);

        Ok(Self {
            writer,
            reader,
            io_timeout: None,
        })
    }

    /// Set read and write timeout (`None` blocks indefinitely)
    pub fn set_io_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()> {
        self.reader.get_ref().set_read_timeout(timeout)?;
        self.writer.get_ref().set_write_timeout(timeout)?;
        self.io_timeout = timeout;
        Ok(())
    }

    /// Send an ASCII command and return every reply line before `END`
    ///
    /// An expired I/O deadline is reported as `ConnectionError::Timeout`.
    pub fn execute(&mut self, command: &str) -> Result<String, DiscoveryError> {
        let io_timeout = self.io_timeout;
        let result = self
            .writer
            .write_all(command.as_bytes())
            .and_then(|_| self.writer.flush())
            .map_err(DiscoveryError::from)
            .and_then(|_| read_until_end(&mut self.reader));

        let data = result.map_err(|e| map_timeout(e, io_timeout))?;
        debug!(command = command.trim_end(), bytes = data.len(), "discovery reply");
        Ok(data)
    }
}

/// Turn a socket deadline expiry into `ConnectionError::Timeout`
fn map_timeout(err: DiscoveryError, io_timeout: Option<Duration>) -> DiscoveryError {
    match (err, io_timeout) {
        (DiscoveryError::Io(e), Some(timeout))
            if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) =>
        {
            ConnectionError::Timeout(timeout.as_millis() as u64).into()
        }
        (err, _) => err,
    }
}

/// Read lines until one contains `END`; the terminator line is discarded
fn read_until_end<R: BufRead>(reader: &mut R) -> Result<String, DiscoveryError> {
    let mut data = String::new();
    let mut line = String::new();

    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            return Err(ConnectionError::Closed.into());
        }
        if line.contains(END_MARKER) {
            return Ok(data);
        }
        data.push_str(&line);
    }
}
