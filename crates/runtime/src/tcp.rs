//! TCP socket tables
//!
//! The VM owns two id-keyed tables, one for listeners and one for accepted
//! connections, plus a monotonic id counter shared by both. `tcp_close`
//! removes the entry; closing an absent id is a no-op, which is how a
//! double close surfaces as none rather than an error.
//!
//! All operations are synchronous host calls. Failures come back as
//! message strings that the builtin layer wraps into language `Error`
//! values, so programs recover them with `or { ... }`.

use rill_core::SocketHandle;
use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};

/// Bound on simultaneously open sockets of either kind.
const MAX_SOCKETS: usize = 10_000;

/// Largest single read, to bound memory per `tcp_read` call.
const MAX_READ_SIZE: usize = 65_536;

#[derive(Default)]
pub struct SocketTables {
    listeners: HashMap<i64, TcpListener>,
    connections: HashMap<i64, TcpStream>,
    next_id: i64,
}

impl SocketTables {
    pub fn new() -> SocketTables {
        SocketTables::default()
    }

    fn allocate_id(&mut self) -> Result<i64, String> {
        if self.listeners.len() + self.connections.len() >= MAX_SOCKETS {
            return Err("socket limit reached".to_string());
        }
        let id = self.next_id;
        self.next_id += 1;
        Ok(id)
    }

    /// Bind a listener on localhost.
    pub fn listen(&mut self, port: i64) -> Result<SocketHandle, String> {
        let port = u16::try_from(port).map_err(|_| format!("invalid port {}", port))?;
        let listener = TcpListener::bind(("127.0.0.1", port))
            .map_err(|e| format!("tcp_listen: {}", e))?;
        let id = self.allocate_id()?;
        self.listeners.insert(id, listener);
        Ok(SocketHandle {
            id,
            is_listener: true,
        })
    }

    /// Block until a connection arrives on the listener.
    pub fn accept(&mut self, handle: SocketHandle) -> Result<SocketHandle, String> {
        if !handle.is_listener {
            return Err("tcp_accept: not a listener".to_string());
        }
        let listener = self
            .listeners
            .get(&handle.id)
            .ok_or_else(|| format!("tcp_accept: closed socket {}", handle.id))?;
        let (stream, _addr) = listener.accept().map_err(|e| format!("tcp_accept: {}", e))?;
        let id = self.allocate_id()?;
        self.connections.insert(id, stream);
        Ok(SocketHandle {
            id,
            is_listener: false,
        })
    }

    /// Read once from the connection. `Ok(None)` is end of stream.
    pub fn read(&mut self, handle: SocketHandle) -> Result<Option<String>, String> {
        if handle.is_listener {
            return Err("tcp_read: cannot read from a listener".to_string());
        }
        let stream = self
            .connections
            .get_mut(&handle.id)
            .ok_or_else(|| format!("tcp_read: closed socket {}", handle.id))?;
        let mut buf = vec![0u8; MAX_READ_SIZE];
        let n = stream.read(&mut buf).map_err(|e| format!("tcp_read: {}", e))?;
        if n == 0 {
            return Ok(None);
        }
        buf.truncate(n);
        Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
    }

    /// Write the whole string; returns bytes written.
    pub fn write(&mut self, handle: SocketHandle, data: &str) -> Result<i64, String> {
        if handle.is_listener {
            return Err("tcp_write: cannot write to a listener".to_string());
        }
        let stream = self
            .connections
            .get_mut(&handle.id)
            .ok_or_else(|| format!("tcp_write: closed socket {}", handle.id))?;
        stream
            .write_all(data.as_bytes())
            .map_err(|e| format!("tcp_write: {}", e))?;
        Ok(data.len() as i64)
    }

    /// Drop the entry for the handle. Absent ids are a no-op.
    pub fn close(&mut self, handle: SocketHandle) {
        if handle.is_listener {
            self.listeners.remove(&handle.id);
        } else {
            self.connections.remove(&handle.id);
        }
    }

    pub fn open_count(&self) -> usize {
        self.listeners.len() + self.connections.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_close_is_idempotent() {
        let mut tables = SocketTables::new();
        let handle = SocketHandle {
            id: 42,
            is_listener: false,
        };
        tables.close(handle);
        tables.close(handle);
        assert_eq!(tables.open_count(), 0);
    }

    #[test]
    fn test_read_after_close_reports_closed() {
        let mut tables = SocketTables::new();
        let handle = SocketHandle {
            id: 7,
            is_listener: false,
        };
        let err = tables.read(handle).unwrap_err();
        assert!(err.contains("closed socket"));
    }

    #[test]
    fn test_ids_are_monotonic() {
        let mut tables = SocketTables::new();
        let a = tables.listen(0).unwrap();
        let b = tables.listen(0).unwrap();
        assert!(b.id > a.id);
    }
}
