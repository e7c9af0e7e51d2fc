//! Builtin dispatch
//!
//! `call_builtin` decodes the operand the compiler encoded, enforces the
//! host's capability gates, and executes. I/O failures do not kill the VM:
//! they are pushed as first-class `Error` values for the program to recover
//! with `or { ... }`. A closed gate, by contrast, is a VM error: the
//! program should never have been allowed near the operation.

use crate::error::VmError;
use crate::file;
use crate::vm::Vm;
use rill_core::program::Op;
use rill_core::{inspect_pretty, Builtin, SocketHandle, Value};
use std::io::Write as _;
use tracing::debug;

impl Vm<'_> {
    pub(crate) fn call_builtin(&mut self, op: Op, builtin: Builtin) -> Result<(), VmError> {
        self.check_gate(op, builtin)?;
        match builtin {
            Builtin::Println => {
                let value = self.pop(op)?;
                writeln!(self.out, "{}", inspect_pretty(&value, 0))
                    .map_err(|e| VmError::at(op, format!("println: {}", e)))?;
            }
            Builtin::Inspect => {
                let value = self.pop(op)?;
                self.stack.push(Value::string(inspect_pretty(&value, 0)));
            }
            Builtin::ReadFile => {
                let path = self.pop_string(op)?;
                let result = match file::read_file(path.as_ref()) {
                    Ok(contents) => Value::string(contents),
                    Err(message) => Value::error(Value::string(message)),
                };
                self.stack.push(result);
            }
            Builtin::WriteFile => {
                let contents = self.pop_string(op)?;
                let path = self.pop_string(op)?;
                let result = match file::write_file(path.as_ref(), contents.as_ref()) {
                    Ok(()) => Value::None,
                    Err(message) => Value::error(Value::string(message)),
                };
                self.stack.push(result);
            }
            Builtin::TcpListen => {
                let port = self.pop_int(op)?;
                let result = match self.sockets.listen(port) {
                    Ok(handle) => {
                        debug!(id = handle.id, port, "listener opened");
                        Value::Socket(handle)
                    }
                    Err(message) => Value::error(Value::string(message)),
                };
                self.stack.push(result);
            }
            Builtin::TcpAccept => {
                let handle = self.pop_socket(op)?;
                let result = match self.sockets.accept(handle) {
                    Ok(conn) => Value::Socket(conn),
                    Err(message) => Value::error(Value::string(message)),
                };
                self.stack.push(result);
            }
            Builtin::TcpRead => {
                let handle = self.pop_socket(op)?;
                let result = match self.sockets.read(handle) {
                    Ok(Some(data)) => Value::string(data),
                    // End of stream is none, not an error
                    Ok(None) => Value::None,
                    Err(message) => Value::error(Value::string(message)),
                };
                self.stack.push(result);
            }
            Builtin::TcpWrite => {
                let data = self.pop_string(op)?;
                let handle = self.pop_socket(op)?;
                let result = match self.sockets.write(handle, data.as_ref()) {
                    Ok(written) => Value::Int(written),
                    Err(message) => Value::error(Value::string(message)),
                };
                self.stack.push(result);
            }
            Builtin::TcpClose => {
                let handle = self.pop_socket(op)?;
                self.sockets.close(handle);
                // The compiler pushes the none this builtin returns.
            }
            Builtin::StrSplit => {
                let delimiter = self.pop_string(op)?;
                let subject = self.pop_string(op)?;
                let parts: Vec<Value> = if delimiter.is_empty() {
                    subject
                        .chars()
                        .map(|c| Value::string(c.to_string()))
                        .collect()
                } else {
                    subject
                        .split(delimiter.as_ref())
                        .map(Value::string)
                        .collect()
                };
                self.stack.push(Value::array(parts));
            }
            Builtin::StackDepth => {
                let depth = self.frame_depth() as i64;
                self.stack.push(Value::Int(depth));
            }
        }
        Ok(())
    }

    fn check_gate(&self, op: Op, builtin: Builtin) -> Result<(), VmError> {
        let allowed = match builtin {
            Builtin::ReadFile
            | Builtin::WriteFile
            | Builtin::TcpListen
            | Builtin::TcpAccept
            | Builtin::TcpRead
            | Builtin::TcpWrite
            | Builtin::TcpClose => self.flags.io_enabled,
            Builtin::StrSplit => self.flags.std_lib_enabled,
            Builtin::StackDepth => self.flags.expose_debug_builtins,
            Builtin::Println | Builtin::Inspect => true,
        };
        if allowed {
            Ok(())
        } else {
            Err(VmError::at(
                op,
                format!("builtin '{}' is disabled by host flags", builtin.name()),
            ))
        }
    }

    fn pop_socket(&mut self, op: Op) -> Result<SocketHandle, VmError> {
        match self.pop(op)? {
            Value::Socket(handle) => Ok(handle),
            other => Err(VmError::at(
                op,
                format!("expected Socket, got {}", other.tag_name()),
            )),
        }
    }
}
