//! Engine-level framing and dispatch behavior over a scripted server.

mod common;

use std::cell::RefCell;
use std::rc::Rc;

use common::*;

use zero_mysqlx::constant::ServerMessageId;
use zero_mysqlx::context::new_shared_context;
use zero_mysqlx::context::IpMode;
use zero_mysqlx::error::code;
use zero_mysqlx::proto;
use zero_mysqlx::protocol::handler::{
    HandlerPosition, HandlerResult, PRIORITY_HIGH, PRIORITY_LOW,
};
use zero_mysqlx::protocol::{Protocol, ServerMessage};

fn connected_protocol(port: u16) -> Protocol {
    let context = new_shared_context();
    let mut protocol = Protocol::new(context);
    protocol
        .connection_mut()
        .connect_tcp("127.0.0.1", port, IpMode::V4)
        .expect("connect");
    protocol
}

#[test]
fn corrupted_frame_is_skipped_without_losing_alignment() {
    let server = MockServer::start(|conn| {
        // A frame whose payload is not a valid ColumnMetaData message,
        // followed by a well-formed Ok frame.
        conn.write_frame(S_COLUMN_META_DATA, &[0xFF, 0xFF, 0xFF]);
        conn.write_msg(S_OK, &proto::Ok { msg: None });
    });

    let mut protocol = connected_protocol(server.port());

    let err = protocol.recv_single_message().expect_err("malformed frame");
    assert_eq!(err.code, code::MALFORMED_PACKET);

    // The next frame decodes cleanly: the bad frame's bytes were fully
    // consumed.
    protocol.recv_ok().expect("aligned on the next frame");

    server.join();
}

#[test]
fn unknown_message_id_is_malformed_and_skipped() {
    let server = MockServer::start(|conn| {
        conn.write_frame(99, b"whatever");
        conn.write_msg(S_OK, &proto::Ok { msg: None });
    });

    let mut protocol = connected_protocol(server.port());

    let err = protocol.recv_single_message().expect_err("unknown id");
    assert_eq!(err.code, code::MALFORMED_PACKET);
    protocol.recv_ok().expect("aligned on the next frame");

    server.join();
}

#[test]
fn recv_id_maps_error_frames_to_server_errors() {
    let server = MockServer::start(|conn| {
        conn.write_error(1064, "You have an error in your SQL syntax", false);
    });

    let mut protocol = connected_protocol(server.port());
    let err = protocol.recv_ok().expect_err("server error");
    assert_eq!(err.code, 1064);
    assert_eq!(err.sql_state, "HY000");
    assert!(!err.is_fatal());

    server.join();
}

#[test]
fn handler_ordering_begin_stacks_end_queues() {
    let server = MockServer::start(|conn| {
        conn.write_notice(5, true, Vec::new()); // ServerHello
        conn.write_msg(S_OK, &proto::Ok { msg: None });
    });

    let mut protocol = connected_protocol(server.port());

    let order: Rc<RefCell<Vec<&'static str>>> = Rc::default();
    for (name, position, priority) in [
        ("first-begin-high", HandlerPosition::Begin, PRIORITY_HIGH),
        ("second-begin-high", HandlerPosition::Begin, PRIORITY_HIGH),
        ("end-high", HandlerPosition::End, PRIORITY_HIGH),
        ("low", HandlerPosition::Begin, PRIORITY_LOW),
    ] {
        let order = Rc::clone(&order);
        protocol.add_notice_handler(
            Box::new(move |_is_global, _notice, _payload| {
                order.borrow_mut().push(name);
                HandlerResult::Continue
            }),
            position,
            priority,
        );
    }

    // The notice is not consumed by anyone, so it surfaces.
    let msg = protocol.recv_single_message().expect("notice");
    assert_eq!(msg.id(), ServerMessageId::Notice);
    assert_eq!(
        *order.borrow(),
        ["second-begin-high", "first-begin-high", "end-high", "low"]
    );

    server.join();
}

#[test]
fn consumed_messages_stop_the_chain_and_the_receive_loops() {
    let server = MockServer::start(|conn| {
        conn.write_notice(5, true, Vec::new());
        conn.write_msg(S_OK, &proto::Ok { msg: None });
    });

    let mut protocol = connected_protocol(server.port());

    let later_fired = Rc::new(RefCell::new(false));

    protocol.add_notice_handler(
        Box::new(|_, _, _| HandlerResult::Consumed),
        HandlerPosition::Begin,
        PRIORITY_HIGH,
    );
    let flag = Rc::clone(&later_fired);
    protocol.add_notice_handler(
        Box::new(move |_, _, _| {
            *flag.borrow_mut() = true;
            HandlerResult::Continue
        }),
        HandlerPosition::Begin,
        PRIORITY_LOW,
    );

    // The notice is consumed; the loop reads on and returns the Ok.
    let msg = protocol.recv_single_message().expect("message after notice");
    assert_eq!(msg.id(), ServerMessageId::Ok);
    assert!(!*later_fired.borrow());

    server.join();
}

#[test]
fn handler_error_aborts_the_receive() {
    let server = MockServer::start(|conn| {
        conn.write_msg(S_OK, &proto::Ok { msg: None });
    });

    let mut protocol = connected_protocol(server.port());
    protocol.add_received_message_handler(
        Box::new(|_, _| HandlerResult::Error),
        HandlerPosition::Begin,
        PRIORITY_HIGH,
    );

    let err = protocol.recv_single_message().expect_err("aborted");
    assert_eq!(err.code, code::INTERNAL_ABORTED);

    server.join();
}

#[test]
fn removed_handlers_no_longer_fire() {
    let server = MockServer::start(|conn| {
        conn.write_msg(S_OK, &proto::Ok { msg: None });
        conn.write_msg(S_OK, &proto::Ok { msg: None });
    });

    let mut protocol = connected_protocol(server.port());

    let count: Rc<RefCell<u32>> = Rc::default();
    let counter = Rc::clone(&count);
    let id = protocol.add_received_message_handler(
        Box::new(move |_, _| {
            *counter.borrow_mut() += 1;
            HandlerResult::Continue
        }),
        HandlerPosition::Begin,
        PRIORITY_HIGH,
    );

    protocol.recv_ok().expect("first ok");
    protocol.remove_received_message_handler(id);
    protocol.recv_ok().expect("second ok");

    assert_eq!(*count.borrow(), 1);

    server.join();
}

#[test]
fn raw_recv_reports_undersized_caller_buffers() {
    let server = MockServer::start(|conn| {
        conn.write_frame(S_OK, &[0x0A, 0x03, b'y', b'e', b's']);
    });

    let mut protocol = connected_protocol(server.port());
    let mut tiny = [0_u8; 2];
    let err = protocol
        .recv_raw_into(&mut tiny)
        .expect_err("buffer too small");
    assert_eq!(err.code, code::RECEIVE_BUFFER_TOO_SMALL);
    assert!(err.is_fatal());

    server.join();
}

#[test]
fn raw_send_and_recv_round_trip() {
    let server = MockServer::start(|conn| {
        let (mid, payload) = conn.read_frame();
        assert_eq!(mid, C_CAPABILITIES_GET);
        assert!(payload.is_empty());
        conn.write_frame(S_OK, &[0x0A, 0x02, b'h', b'i']);
    });

    let mut protocol = connected_protocol(server.port());
    protocol
        .send_raw(C_CAPABILITIES_GET, &[])
        .expect("raw send");

    let (mid, payload) = protocol.recv_raw().expect("raw recv");
    assert_eq!(mid, S_OK);
    let ok = protocol
        .deserialize_received_message(mid, &payload)
        .expect("decode");
    let ServerMessage::Ok(ok) = ok else {
        panic!("wrong variant");
    };
    assert_eq!(ok.msg.as_deref(), Some("hi"));

    server.join();
}
