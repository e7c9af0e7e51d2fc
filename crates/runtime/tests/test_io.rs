//! I/O builtins end to end: files, TCP, and capability gating.

mod common;

use common::*;
use rill_compiler::TypeEnv;
use rill_core::Flags;
use serial_test::serial;
use std::io::{Read, Write};
use std::net::TcpStream;
use std::thread;
use std::time::Duration;

#[test]
fn test_file_round_trip() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("note.txt");
    let path = path.to_string_lossy().to_string();

    // write_file(path, "hello rill"); println(read_file(path))
    let program = block(vec![
        expr(call("write_file", vec![string(&path), string("hello rill")])),
        println_of(call("read_file", vec![string(&path)])),
    ]);
    let out = run_stdout(&program, &TypeEnv::new(), Flags::new().with_io());
    assert_eq!(out, "hello rill\n");
}

#[test]
fn test_missing_file_recovers_through_or() {
    // read_file("/no/such") or { "fallback" }
    let program = block(vec![println_of(or_receiver(
        call("read_file", vec![string("/no/such/rill/file")]),
        "e",
        vec![expr(string("fallback"))],
    ))]);
    let out = run_stdout(&program, &TypeEnv::new(), Flags::new().with_io());
    assert_eq!(out, "fallback\n");
}

#[test]
fn test_io_builtins_gated() {
    let program = block(vec![println_of(call(
        "read_file",
        vec![string("/etc/hostname")],
    ))]);
    let err = run_err(&program, &TypeEnv::new(), Flags::new());
    assert!(err.message.contains("disabled by host flags"));
}

#[test]
fn test_str_split() {
    let program = block(vec![println_of(call(
        "str_split",
        vec![string("a,b,c"), string(",")],
    ))]);
    let out = run_stdout(&program, &TypeEnv::new(), Flags::new().with_std_lib());
    assert_eq!(out, "[\"a\", \"b\", \"c\"]\n");
}

#[test]
fn test_str_split_gated() {
    let program = block(vec![println_of(call(
        "str_split",
        vec![string("a,b"), string(",")],
    ))]);
    let err = run_err(&program, &TypeEnv::new(), Flags::new());
    assert!(err.message.contains("str_split"));
}

const ECHO_PORT: u16 = 47913;

#[test]
#[serial]
fn test_tcp_echo_round_trip() {
    // listener = tcp_listen(PORT); conn = tcp_accept(listener);
    // msg = tcp_read(conn); tcp_write(conn, msg);
    // tcp_close(conn); tcp_close(listener); println(msg)
    let program = block(vec![
        let_("listener", call("tcp_listen", vec![num(ECHO_PORT as i64)])),
        let_("conn", call("tcp_accept", vec![ident("listener")])),
        let_("msg", call("tcp_read", vec![ident("conn")])),
        expr(call("tcp_write", vec![ident("conn"), ident("msg")])),
        expr(call("tcp_close", vec![ident("conn")])),
        expr(call("tcp_close", vec![ident("listener")])),
        println_of(ident("msg")),
    ]);

    let client = thread::spawn(|| {
        // The VM binds on its own schedule; retry until the listener is up.
        let mut stream = connect_with_retry(ECHO_PORT);
        stream.write_all(b"ping").expect("client write");
        stream.shutdown(std::net::Shutdown::Write).expect("shutdown");
        let mut echoed = String::new();
        stream.read_to_string(&mut echoed).expect("client read");
        echoed
    });

    let out = run_stdout(&program, &TypeEnv::new(), Flags::new().with_io());
    assert_eq!(out, "ping\n");
    assert_eq!(client.join().expect("client thread"), "ping");
}

#[test]
#[serial]
fn test_tcp_double_close_is_none() {
    // Closing twice must not error; the second close sees an absent id.
    let program = block(vec![
        let_("listener", call("tcp_listen", vec![num(ECHO_PORT as i64)])),
        expr(call("tcp_close", vec![ident("listener")])),
        println_of(call("tcp_close", vec![ident("listener")])),
    ]);
    let out = run_stdout(&program, &TypeEnv::new(), Flags::new().with_io());
    assert_eq!(out, "none\n");
}

#[test]
#[serial]
fn test_tcp_listen_failure_is_error_value() {
    // Two listeners on one port: the second bind fails and is recovered.
    let program = block(vec![
        let_("a", call("tcp_listen", vec![num(ECHO_PORT as i64)])),
        let_(
            "b",
            or_receiver(
                call("tcp_listen", vec![num(ECHO_PORT as i64)]),
                "e",
                vec![expr(string("bind failed"))],
            ),
        ),
        expr(call("tcp_close", vec![ident("a")])),
        println_of(ident("b")),
    ]);
    let out = run_stdout(&program, &TypeEnv::new(), Flags::new().with_io());
    assert_eq!(out, "bind failed\n");
}

fn connect_with_retry(port: u16) -> TcpStream {
    for _ in 0..100 {
        if let Ok(stream) = TcpStream::connect(("127.0.0.1", port)) {
            return stream;
        }
        thread::sleep(Duration::from_millis(20));
    }
    panic!("listener never came up on port {}", port);
}
