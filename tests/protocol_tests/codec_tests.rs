//! Codec Tests
//!
//! Tests for incremental request decoding and reply encoding.

use std::io::Cursor;

use bytes::Bytes;
use tidekv::config::ProtocolLimits;
use tidekv::error::{CommandError, TideError};
use tidekv::protocol::{
    encode_command, encode_reply, read_reply, read_reply_with_limit, write_command, Command,
    Decoder, Reply,
};

// =============================================================================
// Helper Functions
// =============================================================================

fn decode_one(input: &[u8]) -> Command {
    let mut decoder = Decoder::new();
    decoder.feed(input);
    let request = decoder.decode_next().unwrap().expect("complete frame");
    assert_eq!(decoder.buffered(), 0);
    request.unwrap()
}

fn set(key: &'static [u8], value: &'static [u8], expiry_ms: Option<u64>) -> Command {
    Command::Set {
        key: Bytes::from_static(key),
        value: Bytes::from_static(value),
        expiry_ms,
    }
}

// =============================================================================
// Request Decoding Tests
// =============================================================================

#[test]
fn test_decode_ping() {
    assert_eq!(decode_one(b"*1\r\n$4\r\nPING\r\n"), Command::Ping);
}

#[test]
fn test_decode_echo() {
    assert_eq!(
        decode_one(b"*2\r\n$4\r\nECHO\r\n$3\r\nhey\r\n"),
        Command::Echo {
            payload: Bytes::from_static(b"hey")
        }
    );
}

#[test]
fn test_decode_set_and_get() {
    assert_eq!(
        decode_one(b"*3\r\n$3\r\nSET\r\n$3\r\nfoo\r\n$3\r\nbar\r\n"),
        set(b"foo", b"bar", None)
    );
    assert_eq!(
        decode_one(b"*2\r\n$3\r\nGET\r\n$3\r\nfoo\r\n"),
        Command::Get {
            key: Bytes::from_static(b"foo")
        }
    );
}

#[test]
fn test_decode_set_with_px() {
    assert_eq!(
        decode_one(b"*5\r\n$3\r\nSET\r\n$3\r\nfoo\r\n$3\r\nbar\r\n$2\r\npx\r\n$3\r\n100\r\n"),
        set(b"foo", b"bar", Some(100))
    );
}

#[test]
fn test_decode_empty_echo_payload() {
    assert_eq!(
        decode_one(b"*2\r\n$4\r\nECHO\r\n$0\r\n\r\n"),
        Command::Echo {
            payload: Bytes::new()
        }
    );
}

#[test]
fn test_decode_binary_payload_with_crlf() {
    assert_eq!(
        decode_one(b"*2\r\n$4\r\nECHO\r\n$4\r\na\r\nb\r\n"),
        Command::Echo {
            payload: Bytes::from_static(b"a\r\nb")
        }
    );
}

#[test]
fn test_decode_frame_split_at_every_boundary() {
    let input: &[u8] = b"*3\r\n$3\r\nSET\r\n$5\r\nmykey\r\n$7\r\nmyvalue\r\n";

    for split in 0..=input.len() {
        let mut decoder = Decoder::new();
        decoder.feed(&input[..split]);

        let first = decoder.decode_next().unwrap();
        if split < input.len() {
            assert!(first.is_none(), "decoded early at split {}", split);
            assert_eq!(decoder.buffered(), split);
            decoder.feed(&input[split..]);
        }

        let request = match first {
            Some(request) => request,
            None => decoder.decode_next().unwrap().expect("complete after feed"),
        };
        assert_eq!(request.unwrap(), set(b"mykey", b"myvalue", None));
        assert_eq!(decoder.buffered(), 0);
    }
}

#[test]
fn test_decode_byte_at_a_time() {
    let input: &[u8] = b"*2\r\n$4\r\nECHO\r\n$5\r\nhello\r\n";
    let mut decoder = Decoder::new();

    for (i, byte) in input.iter().enumerate() {
        decoder.feed(std::slice::from_ref(byte));
        let request = decoder.decode_next().unwrap();
        if i + 1 < input.len() {
            assert!(request.is_none());
        } else {
            assert_eq!(
                request.unwrap().unwrap(),
                Command::Echo {
                    payload: Bytes::from_static(b"hello")
                }
            );
        }
    }
}

#[test]
fn test_decode_large_array_in_small_chunks() {
    const ELEMENTS: usize = 100_000;

    let mut input = format!("*{}\r\n$4\r\nECHO\r\n", ELEMENTS + 1).into_bytes();
    for _ in 0..ELEMENTS {
        input.extend_from_slice(b"$1\r\na\r\n");
    }
    input.extend_from_slice(b"*1\r\n$4\r\nPING\r\n");

    let mut decoder = Decoder::new();
    let mut requests = Vec::new();
    for chunk in input.chunks(1024) {
        decoder.feed(chunk);
        requests.extend(decoder.decode_all().unwrap().requests);
    }

    assert_eq!(
        requests,
        vec![
            Err(CommandError::WrongArity("echo".to_string())),
            Ok(Command::Ping),
        ]
    );
    assert_eq!(decoder.buffered(), 0);
}

#[test]
fn test_decode_pipelined_requests_in_order() {
    let mut decoder = Decoder::new();
    decoder.feed(b"*1\r\n$4\r\nPING\r\n*3\r\n$3\r\nSET\r\n$1\r\na\r\n$1\r\n1\r\n*2\r\n$3\r\nGET\r\n$1\r\na\r\n*1\r\n$4\r\nPI");

    let decoded = decoder.decode_all().unwrap();
    let commands: Vec<Command> = decoded.requests.into_iter().map(Result::unwrap).collect();

    assert_eq!(
        commands,
        vec![
            Command::Ping,
            set(b"a", b"1", None),
            Command::Get {
                key: Bytes::from_static(b"a")
            },
        ]
    );
    // The trailing partial frame stays buffered
    assert_eq!(decoder.buffered(), b"*1\r\n$4\r\nPI".len());

    decoder.feed(b"NG\r\n");
    assert_eq!(decoder.decode_next().unwrap().unwrap().unwrap(), Command::Ping);
}

#[test]
fn test_decode_all_reports_consumed_bytes() {
    let mut decoder = Decoder::new();
    let frame: &[u8] = b"*1\r\n$4\r\nPING\r\n";
    decoder.feed(frame);
    decoder.feed(b"*1\r\n");

    let decoded = decoder.decode_all().unwrap();
    assert_eq!(decoded.requests.len(), 1);
    assert_eq!(decoded.consumed, frame.len());
}

#[test]
fn test_decode_skips_empty_and_null_arrays() {
    let mut decoder = Decoder::new();
    decoder.feed(b"*0\r\n*-1\r\n*1\r\n$4\r\nPING\r\n");

    let decoded = decoder.decode_all().unwrap();
    assert_eq!(decoded.requests.len(), 1);
    assert_eq!(decoded.requests[0], Ok(Command::Ping));
}

// =============================================================================
// Command Error Tests (frame is valid, connection survives)
// =============================================================================

#[test]
fn test_unknown_command_is_a_command_error() {
    let mut decoder = Decoder::new();
    decoder.feed(b"*1\r\n$5\r\nHELLO\r\n*1\r\n$4\r\nPING\r\n");

    let decoded = decoder.decode_all().unwrap();
    assert_eq!(
        decoded.requests,
        vec![
            Err(CommandError::UnknownCommand("HELLO".to_string())),
            Ok(Command::Ping),
        ]
    );
}

#[test]
fn test_wrong_arity_is_a_command_error() {
    let mut decoder = Decoder::new();
    decoder.feed(b"*1\r\n$3\r\nGET\r\n");

    let request = decoder.decode_next().unwrap().unwrap();
    assert_eq!(request, Err(CommandError::WrongArity("get".to_string())));
}

// =============================================================================
// Protocol Error Tests
// =============================================================================

fn assert_protocol_error(input: &[u8]) {
    let mut decoder = Decoder::new();
    decoder.feed(input);
    match decoder.decode_all() {
        Err(TideError::Protocol(_)) => {}
        other => panic!("expected protocol error for {:?}, got {:?}", input, other),
    }
}

#[test]
fn test_inline_command_is_rejected() {
    assert_protocol_error(b"PING\r\n");
}

#[test]
fn test_non_bulk_element_is_rejected() {
    assert_protocol_error(b"*1\r\n+PING\r\n");
    assert_protocol_error(b"*1\r\n:1\r\n");
}

#[test]
fn test_bad_lengths_are_rejected() {
    assert_protocol_error(b"*x\r\n");
    assert_protocol_error(b"*1\r\n$-1\r\n");
    assert_protocol_error(b"*1\r\n$abc\r\n");
    assert_protocol_error(b"*\r\n");
}

#[test]
fn test_bare_newline_is_rejected() {
    assert_protocol_error(b"*1\n$4\r\nPING\r\n");
}

#[test]
fn test_bulk_without_crlf_is_rejected() {
    assert_protocol_error(b"*1\r\n$4\r\nPINGxx");
}

#[test]
fn test_limits_are_enforced() {
    let limits = ProtocolLimits {
        max_array_len: 2,
        max_bulk_len: 4,
        max_line_len: 16,
    };

    let mut decoder = Decoder::with_limits(limits);
    decoder.feed(b"*3\r\n");
    assert!(matches!(decoder.decode_next(), Err(TideError::Protocol(_))));

    let mut decoder = Decoder::with_limits(limits);
    decoder.feed(b"*2\r\n$4\r\nECHO\r\n$5\r\n");
    assert!(matches!(decoder.decode_next(), Err(TideError::Protocol(_))));

    let mut decoder = Decoder::with_limits(limits);
    decoder.feed(&[b'*'; 32]);
    assert!(matches!(decoder.decode_next(), Err(TideError::Protocol(_))));
}

#[test]
fn test_clear_drops_partial_frame() {
    let mut decoder = Decoder::new();
    decoder.feed(b"*2\r\n$4\r\nECHO\r\n$10\r\nabc");
    assert!(decoder.decode_next().unwrap().is_none());

    decoder.clear();
    assert_eq!(decoder.buffered(), 0);
    decoder.feed(b"*1\r\n$4\r\nPING\r\n");
    assert_eq!(decoder.decode_next().unwrap().unwrap(), Ok(Command::Ping));
}

// =============================================================================
// Reply Encoding Tests
// =============================================================================

#[test]
fn test_encode_replies() {
    assert_eq!(encode_reply(&Reply::pong()), b"+PONG\r\n");
    assert_eq!(encode_reply(&Reply::ok()), b"+OK\r\n");
    assert_eq!(encode_reply(&Reply::bulk("hey")), b"$3\r\nhey\r\n");
    assert_eq!(encode_reply(&Reply::bulk(Bytes::new())), b"$0\r\n\r\n");
    assert_eq!(encode_reply(&Reply::nil()), b"$-1\r\n");
    assert_eq!(
        encode_reply(&Reply::from(CommandError::UnknownCommand("foo".to_string()))),
        b"-ERR unknown command 'foo'\r\n"
    );
}

#[test]
fn test_encode_command_matches_wire_format() {
    assert_eq!(
        encode_command(&set(b"foo", b"bar", Some(100))),
        b"*5\r\n$3\r\nSET\r\n$3\r\nfoo\r\n$3\r\nbar\r\n$2\r\nPX\r\n$3\r\n100\r\n"
    );
}

// =============================================================================
// Client-side Stream Tests
// =============================================================================

#[test]
fn test_written_command_decodes() {
    let mut out = Vec::new();
    let cmd = Command::Echo {
        payload: Bytes::from_static(b"\x00binary\xff"),
    };
    write_command(&mut out, &cmd).unwrap();

    assert_eq!(decode_one(&out), cmd);
}

#[test]
fn test_read_reply_sequence() {
    let mut stream = Cursor::new(b"+PONG\r\n$5\r\nhe\r\no\r\n$-1\r\n-ERR syntax error\r\n".to_vec());

    assert_eq!(read_reply(&mut stream).unwrap(), Reply::pong());
    assert_eq!(read_reply(&mut stream).unwrap(), Reply::bulk("he\r\no"));
    assert_eq!(read_reply(&mut stream).unwrap(), Reply::nil());
    assert_eq!(
        read_reply(&mut stream).unwrap(),
        Reply::error("ERR syntax error")
    );
    assert!(read_reply(&mut stream).unwrap_err().is_disconnect());
}

#[test]
fn test_read_reply_rejects_oversized_bulk_length() {
    let mut stream = Cursor::new(b"$9223372036854775807\r\n".to_vec());
    assert!(matches!(read_reply(&mut stream), Err(TideError::Protocol(_))));

    let mut stream = Cursor::new(b"$6\r\nsecret\r\n".to_vec());
    assert!(matches!(
        read_reply_with_limit(&mut stream, 5),
        Err(TideError::Protocol(_))
    ));
}

#[test]
fn test_read_reply_truncated_bulk_is_disconnect() {
    let mut stream = Cursor::new(b"$10\r\nabc".to_vec());
    assert!(read_reply(&mut stream).unwrap_err().is_disconnect());
}
