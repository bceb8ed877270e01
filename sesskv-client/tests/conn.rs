use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread;
use std::time::Duration;

use sesskv_client::{ClientError, RedisConnection};

fn spawn_server(
    expected_commands: usize,
    handler: fn(usize, Vec<Vec<u8>>, &mut TcpStream),
) -> (String, u16) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");

    thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("accept");
        let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
        let mut reader = BufReader::new(stream.try_clone().expect("clone"));
        for idx in 0..expected_commands {
            let args = read_command(&mut reader).expect("read command");
            handler(idx, args, &mut stream);
        }
    });

    (addr.ip().to_string(), addr.port())
}

fn read_command(reader: &mut BufReader<TcpStream>) -> std::io::Result<Vec<Vec<u8>>> {
    let mut line = Vec::new();
    read_line(reader, &mut line)?
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "eof"))?;
    if line.first() != Some(&b'*') {
        return Err(std::io::Error::new(std::io::ErrorKind::InvalidData, "expected array"));
    }
    let count = parse_usize(&line[1..])?;
    let mut args = Vec::with_capacity(count);
    for _ in 0..count {
        read_line(reader, &mut line)?
            .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "eof"))?;
        if line.first() != Some(&b'$') {
            return Err(std::io::Error::new(std::io::ErrorKind::InvalidData, "expected bulk"));
        }
        let len = parse_usize(&line[1..])?;
        let mut data = vec![0u8; len];
        reader.read_exact(&mut data)?;
        let mut crlf = [0u8; 2];
        reader.read_exact(&mut crlf)?;
        if crlf != [b'\r', b'\n'] {
            return Err(std::io::Error::new(std::io::ErrorKind::InvalidData, "missing crlf"));
        }
        args.push(data);
    }
    Ok(args)
}

fn read_line(reader: &mut BufReader<TcpStream>, buf: &mut Vec<u8>) -> std::io::Result<Option<()>> {
    buf.clear();
    let bytes = reader.read_until(b'\n', buf)?;
    if bytes == 0 {
        return Ok(None);
    }
    if buf.len() < 2 || buf[buf.len() - 2] != b'\r' {
        return Err(std::io::Error::new(std::io::ErrorKind::InvalidData, "invalid line"));
    }
    buf.truncate(buf.len() - 2);
    Ok(Some(()))
}

fn parse_usize(data: &[u8]) -> std::io::Result<usize> {
    if data.is_empty() {
        return Err(std::io::Error::new(std::io::ErrorKind::InvalidData, "empty"));
    }
    let mut value = 0usize;
    for &b in data {
        if !b.is_ascii_digit() {
            return Err(std::io::Error::new(std::io::ErrorKind::InvalidData, "digit"));
        }
        value = value.saturating_mul(10).saturating_add((b - b'0') as usize);
    }
    Ok(value)
}

fn write_simple(stream: &mut TcpStream, msg: &str) {
    let _ = stream.write_all(b"+");
    let _ = stream.write_all(msg.as_bytes());
    let _ = stream.write_all(b"\r\n");
    let _ = stream.flush();
}

fn write_error(stream: &mut TcpStream, msg: &str) {
    let _ = stream.write_all(b"-");
    let _ = stream.write_all(msg.as_bytes());
    let _ = stream.write_all(b"\r\n");
    let _ = stream.flush();
}

fn write_bulk(stream: &mut TcpStream, data: &[u8]) {
    let _ = stream.write_all(b"$");
    let _ = stream.write_all(data.len().to_string().as_bytes());
    let _ = stream.write_all(b"\r\n");
    let _ = stream.write_all(data);
    let _ = stream.write_all(b"\r\n");
    let _ = stream.flush();
}

fn write_null(stream: &mut TcpStream) {
    let _ = stream.write_all(b"$-1\r\n");
    let _ = stream.flush();
}

fn write_integer(stream: &mut TcpStream, value: i64) {
    let _ = stream.write_all(b":");
    let _ = stream.write_all(value.to_string().as_bytes());
    let _ = stream.write_all(b"\r\n");
    let _ = stream.flush();
}

#[tokio::test]
async fn set_ex_get_roundtrip() {
    let (host, port) = spawn_server(2, |idx, args, stream| {
        if idx == 0 {
            assert_eq!(args[0], b"SET");
            assert_eq!(args[1], b"key");
            assert_eq!(args[2], b"value");
            assert_eq!(args[3], b"EX");
            assert_eq!(args[4], b"60");
            write_simple(stream, "OK");
        } else {
            assert_eq!(args[0], b"GET");
            assert_eq!(args[1], b"key");
            write_bulk(stream, b"value");
        }
    });

    let mut conn = RedisConnection::connect(&host, port).await.expect("connect");
    conn.set_ex(b"key", b"value", 60).await.expect("set");
    let value = conn.get(b"key").await.expect("get");
    assert_eq!(value, Some(b"value".to_vec()));
}

#[tokio::test]
async fn auth_then_select() {
    let (host, port) = spawn_server(2, |idx, args, stream| {
        if idx == 0 {
            assert_eq!(args[0], b"AUTH");
            assert_eq!(args[1], b"secret");
        } else {
            assert_eq!(args[0], b"SELECT");
            assert_eq!(args[1], b"5");
        }
        write_simple(stream, "OK");
    });

    let mut conn = RedisConnection::connect(&host, port).await.expect("connect");
    conn.auth("secret").await.expect("auth");
    conn.select(5).await.expect("select");
    assert!(conn.connected());
}

#[tokio::test]
async fn get_missing_returns_none() {
    let (host, port) = spawn_server(1, |_, args, stream| {
        assert_eq!(args[0], b"GET");
        write_null(stream);
    });

    let mut conn = RedisConnection::connect(&host, port).await.expect("connect");
    let value = conn.get(b"missing").await.expect("get");
    assert_eq!(value, None);
}

#[tokio::test]
async fn expire_and_del_report_key_presence() {
    let (host, port) = spawn_server(2, |idx, args, stream| {
        if idx == 0 {
            assert_eq!(args[0], b"EXPIRE");
            assert_eq!(args[1], b"key");
            assert_eq!(args[2], b"30");
            write_integer(stream, 1);
        } else {
            assert_eq!(args[0], b"DEL");
            write_integer(stream, 0);
        }
    });

    let mut conn = RedisConnection::connect(&host, port).await.expect("connect");
    assert!(conn.expire(b"key", 30).await.expect("expire"));
    assert!(!conn.del(b"key").await.expect("del"));
}

#[tokio::test]
async fn error_reply_keeps_connection_usable() {
    let (host, port) = spawn_server(2, |idx, args, stream| {
        if idx == 0 {
            write_error(stream, "ERR wrong number of arguments");
        } else {
            assert_eq!(args[0], b"PING");
            write_simple(stream, "PONG");
        }
    });

    let mut conn = RedisConnection::connect(&host, port).await.expect("connect");
    let err = conn.get(b"key").await.unwrap_err();
    assert!(matches!(err, ClientError::Server { .. }));
    assert!(conn.connected());

    let pong = conn.ping(None).await.expect("ping");
    assert_eq!(pong, b"PONG".to_vec());
}

#[tokio::test]
async fn closed_socket_marks_disconnected() {
    // The handler reads the command and returns without replying; the server
    // thread then exits and the socket closes.
    let (host, port) = spawn_server(1, |_, args, _| {
        assert_eq!(args[0], b"GET");
    });

    let mut conn = RedisConnection::connect(&host, port).await.expect("connect");
    let err = conn.get(b"key").await.unwrap_err();
    assert!(matches!(err, ClientError::Io(_) | ClientError::Protocol));
    assert!(!conn.connected());
}
