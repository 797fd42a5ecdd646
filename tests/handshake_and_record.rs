//! End-to-end scenarios over a real duplex transport: the handshake
//! followed by application data flowing both ways.

use std::io::{Read, Write};
use std::net::{Ipv4Addr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;

use darkstar::{
    client_connect, generate_darkstar_keypair, server_accept, InMemoryReplayFilter, ReplayFilter,
    ServerSession,
};

#[test]
fn scenario_s1_round_trip_yields_correct_bytes() {
    let (server_sk, server_pk) = generate_darkstar_keypair();
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let filter = Arc::new(InMemoryReplayFilter::new());

    let server_thread = thread::spawn(move || {
        let (sock, _) = listener.accept().unwrap();
        let mut session =
            server_accept(sock, &server_sk, Ipv4Addr::new(127, 0, 0, 1), addr.port(), filter.as_ref()).unwrap();
        let mut buf = [0u8; 4];
        session.read_exact(&mut buf).unwrap();
        buf
    });

    let client_sock = TcpStream::connect(addr).unwrap();
    let mut client = client_connect(client_sock, &server_pk, Ipv4Addr::new(127, 0, 0, 1), addr.port()).unwrap();
    client.write_all(b"test").unwrap();

    let received = server_thread.join().unwrap();
    assert_eq!(&received, b"test");
}

#[test]
fn handshake_is_interoperable_and_data_flows_both_directions() {
    let (server_sk, server_pk) = generate_darkstar_keypair();
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let filter = Arc::new(InMemoryReplayFilter::new());

    let server_thread = thread::spawn(move || {
        let (sock, _) = listener.accept().unwrap();
        let mut session =
            server_accept(sock, &server_sk, Ipv4Addr::new(127, 0, 0, 1), addr.port(), filter.as_ref()).unwrap();
        let mut buf = [0u8; 5];
        session.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"hello");
        session.write_all(b"world").unwrap();
    });

    let client_sock = TcpStream::connect(addr).unwrap();
    let mut client_stream =
        client_connect(client_sock, &server_pk, Ipv4Addr::new(127, 0, 0, 1), addr.port()).unwrap();
    client_stream.write_all(b"hello").unwrap();
    let mut reply = [0u8; 5];
    client_stream.read_exact(&mut reply).unwrap();
    assert_eq!(&reply, b"world");

    server_thread.join().unwrap();
}

#[test]
fn mismatched_persistent_key_is_rejected_without_a_wire_tell() {
    let (server_sk, _server_pk) = generate_darkstar_keypair();
    let (_wrong_sk, wrong_pk) = generate_darkstar_keypair();
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let filter = Arc::new(InMemoryReplayFilter::new());

    let server_thread = thread::spawn(move || {
        let (sock, _) = listener.accept().unwrap();
        let session =
            server_accept(sock, &server_sk, Ipv4Addr::new(127, 0, 0, 1), addr.port(), filter.as_ref()).unwrap();
        matches!(session, ServerSession::BlackHole(_))
    });

    let client_sock = TcpStream::connect(addr).unwrap();
    // Client authenticates against `wrong_pk`; the server holds the real
    // persistent key, so its ccc check fails and it must black-hole rather
    // than error.
    let result = client_connect(client_sock, &wrong_pk, Ipv4Addr::new(127, 0, 0, 1), addr.port());
    assert!(result.is_err());

    assert!(server_thread.join().unwrap());
}

#[test]
fn scenario_s4_replayed_client_ephemeral_key_is_flagged() {
    let filter = InMemoryReplayFilter::new();
    let (_eph_sk, eph_pk) = generate_darkstar_keypair();
    let wire = darkstar::darkstar_encode(&eph_pk);

    assert!(!filter.check_and_add(&wire), "first sighting must not be a replay");
    assert!(filter.check_and_add(&wire), "second sighting of the same key must be flagged");
}

#[test]
fn replaying_a_client_ephemeral_key_black_holes_the_second_connection() {
    // Drives the wire protocol by hand so both connections can present the
    // exact same client ephemeral key, rather than relying on
    // `client_connect`'s internal (and necessarily fresh) key generation.
    let (server_sk, server_pk) = generate_darkstar_keypair();
    let (client_eph_sk, client_eph_pk) = generate_darkstar_keypair();
    let filter = InMemoryReplayFilter::new();

    let send_handshake = |port: u16| -> TcpStream {
        let sid = darkstar::server_identifier(Ipv4Addr::new(127, 0, 0, 1), port);
        let z_p = darkstar::handshake::ecdh(&client_eph_sk, &server_pk);
        let ccc = darkstar::handshake::client_confirmation_code(&z_p, &sid, &server_pk, &client_eph_pk);
        let mut sock = TcpStream::connect(("127.0.0.1", port)).unwrap();
        sock.write_all(&darkstar::darkstar_encode(&client_eph_pk)).unwrap();
        sock.write_all(&ccc).unwrap();
        sock
    };

    let listener_1 = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr_1 = listener_1.local_addr().unwrap();
    let server_sk_1 = server_sk.clone();
    let server_thread_1 = thread::spawn(move || {
        let (sock, _) = listener_1.accept().unwrap();
        let session = server_accept(sock, &server_sk_1, Ipv4Addr::new(127, 0, 0, 1), addr_1.port(), &filter).unwrap();
        (matches!(session, ServerSession::Secure(_)), filter)
    });
    let _first_sock = send_handshake(addr_1.port());
    let (first_was_secure, filter) = server_thread_1.join().unwrap();
    assert!(first_was_secure);

    let listener_2 = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr_2 = listener_2.local_addr().unwrap();
    let server_thread_2 = thread::spawn(move || {
        let (sock, _) = listener_2.accept().unwrap();
        let session = server_accept(sock, &server_sk, Ipv4Addr::new(127, 0, 0, 1), addr_2.port(), &filter).unwrap();
        matches!(session, ServerSession::BlackHole(_))
    });
    let _second_sock = send_handshake(addr_2.port());
    assert!(server_thread_2.join().unwrap());
}

#[test]
fn scenario_s5_large_payload_splits_into_multiple_records() {
    let (server_sk, server_pk) = generate_darkstar_keypair();
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let filter = Arc::new(InMemoryReplayFilter::new());

    let payload = vec![0xABu8; 40_000];
    let expected = payload.clone();

    let server_thread = thread::spawn(move || {
        let (sock, _) = listener.accept().unwrap();
        let mut session =
            server_accept(sock, &server_sk, Ipv4Addr::new(127, 0, 0, 1), addr.port(), filter.as_ref()).unwrap();
        let mut buf = vec![0u8; expected.len()];
        session.read_exact(&mut buf).unwrap();
        assert_eq!(buf, expected);
    });

    let client_sock = TcpStream::connect(addr).unwrap();
    let mut client_stream =
        client_connect(client_sock, &server_pk, Ipv4Addr::new(127, 0, 0, 1), addr.port()).unwrap();
    client_stream.write_all(&payload).unwrap();

    server_thread.join().unwrap();
}

#[test]
fn scenario_s6_fragmented_reads_split_a_single_write() {
    let (server_sk, server_pk) = generate_darkstar_keypair();
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let filter = Arc::new(InMemoryReplayFilter::new());

    let server_thread = thread::spawn(move || {
        let (sock, _) = listener.accept().unwrap();
        let mut session =
            server_accept(sock, &server_sk, Ipv4Addr::new(127, 0, 0, 1), addr.port(), filter.as_ref()).unwrap();

        let mut first = [0u8; 4];
        session.read_exact(&mut first).unwrap();
        let mut second = [0u8; 4];
        session.read_exact(&mut second).unwrap();
        (first, second)
    });

    let client_sock = TcpStream::connect(addr).unwrap();
    let mut client_stream =
        client_connect(client_sock, &server_pk, Ipv4Addr::new(127, 0, 0, 1), addr.port()).unwrap();
    client_stream.write_all(b"abcdefgh").unwrap();

    let (first, second) = server_thread.join().unwrap();
    assert_eq!(&first, b"abcd");
    assert_eq!(&second, b"efgh");
}
