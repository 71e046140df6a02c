//! End-to-end session scenarios against a scripted server.

mod common;

use common::*;
use prost::Message;

use zero_mysqlx::argument::ArgumentValue;
use zero_mysqlx::error::code;
use zero_mysqlx::proto;
use zero_mysqlx::proto::notice::session_state_changed::Parameter;
use zero_mysqlx::proto::resultset::column_meta_data::FieldType;
use zero_mysqlx::row::Value;
use zero_mysqlx::{Session, SessionOption};

fn plain_tcp_session() -> Session {
    let mut session = Session::new();
    session
        .set_mysql_option(SessionOption::SslMode, ArgumentValue::from("DISABLED"))
        .expect("ssl mode");
    session
        .set_mysql_option(SessionOption::ReadTimeout, ArgumentValue::SignedInt(10_000))
        .expect("read timeout");
    session
}

#[test]
fn tcp_connect_and_select_one() {
    let server = MockServer::start(|conn| {
        conn.serve_auth_ok();
        conn.write_session_state_notice(Parameter::ClientIdAssigned, uint_scalar(77), true);

        let payload = conn.expect(C_STMT_EXECUTE);
        let stmt = proto::sql::StmtExecute::decode(&payload[..]).expect("stmt");
        assert_eq!(stmt.stmt, b"SELECT 1");

        conn.write_column("1", FieldType::Sint as i32);
        conn.write_row(&[&[0x02]]); // sint 1
        conn.write_frame(S_FETCH_DONE, &[]);
        conn.write_session_state_notice(Parameter::RowsAffected, uint_scalar(0), false);
        conn.write_frame(S_STMT_EXECUTE_OK, &[]);

        // Session close.
        conn.expect(C_SESS_CLOSE);
        conn.write_ok();
    });

    let mut session = plain_tcp_session();
    session
        .connect("127.0.0.1", server.port(), "u", "p", "")
        .expect("connect");

    {
        let mut result = session.execute_sql("SELECT 1").expect("execute");
        let metadata = result.get_metadata().expect("metadata").to_vec();
        assert_eq!(metadata.len(), 1);
        assert_eq!(metadata[0].name, "1");

        let row = result.get_next_row().expect("row").expect("one row");
        let value = Value::parse(&metadata[0], &row.field[0], 10).expect("decode");
        assert_eq!(value, Value::SignedInt(1));

        assert!(result.get_next_row().expect("end of rows").is_none());
        assert_eq!(result.try_get_affected_rows(), Some(0));
        assert!(result.get_warnings().is_empty());
    }

    assert_eq!(session.client_id(), 77);
    session.close().expect("close");
    server.join();
}

#[test]
fn unix_connect_prefers_plain_and_runs_admin_stmt() {
    let server = UnixMockServer::start("plain", |conn| {
        let payload = conn.expect(C_AUTH_START);
        let start = proto::session::AuthenticateStart::decode(&payload[..]).expect("auth");
        // The socket is a secure channel, so FALLBACK starts with PLAIN.
        assert_eq!(start.mech_name, "PLAIN");
        assert_eq!(start.auth_data.as_deref(), Some(&b"db\0u\0secret"[..]));
        conn.write_msg(S_AUTH_OK, &proto::session::AuthenticateOk { auth_data: None });

        let payload = conn.expect(C_STMT_EXECUTE);
        let stmt = proto::sql::StmtExecute::decode(&payload[..]).expect("stmt");
        assert_eq!(stmt.namespace.as_deref(), Some("mysqlx"));
        assert_eq!(stmt.stmt, b"list_objects");
        assert_eq!(stmt.args.len(), 1);

        conn.write_column("name", FieldType::Bytes as i32);
        conn.write_row(&[b"things\0"]);
        conn.write_frame(S_FETCH_DONE, &[]);
        conn.write_frame(S_STMT_EXECUTE_OK, &[]);
    });

    let mut session = Session::new();
    session
        .set_mysql_option(SessionOption::AuthenticationMethod, ArgumentValue::from("FALLBACK"))
        .expect("auth option");
    session
        .connect_unix(server.path(), "u", "secret", "db")
        .expect("connect");

    let mut object = zero_mysqlx::argument::ArgumentObject::new();
    object.insert("schema".to_string(), ArgumentValue::from("db"));
    let args = vec![ArgumentValue::Object(object)];

    let mut result = session
        .execute_stmt("mysqlx", "list_objects", &args)
        .expect("admin stmt");
    assert!(result.has_resultset().expect("has resultset"));
    let row = result.get_next_row().expect("row").expect("one row");
    assert_eq!(row.field[0], b"things\0");
    assert!(result.get_next_row().expect("end").is_none());

    drop(result);
    drop(session);
    server.join();
}

#[test]
fn partial_resultset_drop_resynchronizes_the_stream() {
    let server = MockServer::start(|conn| {
        conn.serve_auth_ok();

        conn.expect(C_STMT_EXECUTE);
        conn.write_column("n", FieldType::Uint as i32);
        for i in 0..100_u64 {
            let mut cell = Vec::new();
            prost::encoding::encode_varint(i, &mut cell);
            conn.write_row(&[&cell]);
        }
        conn.write_frame(S_FETCH_DONE, &[]);
        conn.write_frame(S_STMT_EXECUTE_OK, &[]);

        let payload = conn.expect(C_STMT_EXECUTE);
        let stmt = proto::sql::StmtExecute::decode(&payload[..]).expect("stmt");
        assert_eq!(stmt.stmt, b"SELECT 2");
        conn.write_column("2", FieldType::Sint as i32);
        conn.write_row(&[&[0x04]]); // sint 2
        conn.write_frame(S_FETCH_DONE, &[]);
        conn.write_frame(S_STMT_EXECUTE_OK, &[]);
    });

    let mut session = plain_tcp_session();
    session
        .connect("127.0.0.1", server.port(), "u", "p", "")
        .expect("connect");

    {
        let mut result = session.execute_sql("SELECT n FROM t").expect("first query");
        for _ in 0..10 {
            assert!(result.get_next_row().expect("row").is_some());
        }
        // Dropped with 90 rows pending; the destructor drains them.
    }

    let mut result = session.execute_sql("SELECT 2").expect("second query");
    let metadata = result.get_metadata().expect("metadata").to_vec();
    assert_eq!(metadata[0].name, "2");
    let row = result.get_next_row().expect("row").expect("one row");
    assert_eq!(
        Value::parse(&metadata[0], &row.field[0], 10).expect("decode"),
        Value::SignedInt(2)
    );

    drop(result);
    drop(session);
    server.join();
}

#[test]
fn multiple_resultsets_and_warnings() {
    let server = MockServer::start(|conn| {
        conn.serve_auth_ok();

        conn.expect(C_STMT_EXECUTE);
        conn.write_column("a", FieldType::Sint as i32);
        conn.write_row(&[&[0x02]]);
        conn.write_warning_notice(1366, "Incorrect value");
        conn.write_frame(S_FETCH_DONE_MORE_RESULTSETS, &[]);
        conn.write_column("b", FieldType::Sint as i32);
        conn.write_column("c", FieldType::Sint as i32);
        conn.write_row(&[&[0x04], &[0x06]]);
        conn.write_frame(S_FETCH_DONE, &[]);
        conn.write_frame(S_STMT_EXECUTE_OK, &[]);
    });

    let mut session = plain_tcp_session();
    session
        .connect("127.0.0.1", server.port(), "u", "p", "")
        .expect("connect");

    let mut result = session.execute_sql("CALL p()").expect("execute");
    assert_eq!(result.get_metadata().expect("metadata").len(), 1);
    assert!(result.get_next_row().expect("row").is_some());
    assert!(result.get_next_row().expect("end").is_none());

    assert!(result.next_resultset().expect("next resultset"));
    let metadata = result.get_metadata().expect("metadata 2").to_vec();
    assert_eq!(metadata.len(), 2);
    assert_eq!(metadata[0].name, "b");
    assert_eq!(metadata[1].name, "c");

    let row = result.get_next_row().expect("row").expect("second set row");
    assert_eq!(row.field.len(), 2);
    assert!(result.get_next_row().expect("end").is_none());
    assert!(!result.next_resultset().expect("no more resultsets"));

    let warnings = result.get_warnings();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].code, 1366);

    drop(result);
    drop(session);
    server.join();
}

#[test]
fn preferred_tls_falls_back_to_plaintext_when_server_refuses() {
    let server = MockServer::start(|conn| {
        // ssl-mode stays Preferred, so the client asks for tls first.
        let payload = conn.expect(C_CAPABILITIES_SET);
        let set = proto::connection::CapabilitiesSet::decode(&payload[..]).expect("caps");
        let capabilities = set.capabilities.expect("capabilities").capabilities;
        assert_eq!(capabilities[0].name, "tls");
        conn.write_error(
            code::ER_X_CAPABILITIES_PREPARE_FAILED as u32,
            "Capability prepare failed for 'tls'",
            false,
        );

        conn.serve_auth_ok();
    });

    let mut session = Session::new();
    session
        .set_mysql_option(
            SessionOption::AuthenticationMethod,
            ArgumentValue::from("MYSQL41"),
        )
        .expect("auth option");
    session
        .connect("127.0.0.1", server.port(), "u", "p", "")
        .expect("connect continues unencrypted");

    drop(session);
    server.join();
}

#[test]
fn notice_consumption_toggle() {
    use std::cell::Cell;
    use std::rc::Rc;
    use zero_mysqlx::protocol::handler::{HandlerPosition, HandlerResult, PRIORITY_MEDIUM};

    let server = MockServer::start(|conn| {
        conn.serve_auth_ok();

        // An unsolicited notice followed by the reply to a statement.
        conn.expect(C_STMT_EXECUTE);
        conn.write_session_state_notice(Parameter::TrxCommitted, uint_scalar(1), true);
        conn.write_frame(S_STMT_EXECUTE_OK, &[]);
    });

    let mut session = plain_tcp_session();
    // Let user handlers observe notices.
    session
        .set_mysql_option(SessionOption::ConsumeAllNotices, ArgumentValue::Bool(false))
        .expect("consume option");
    session
        .connect("127.0.0.1", server.port(), "u", "p", "")
        .expect("connect");

    let seen = Rc::new(Cell::new(0_u32));
    let seen_by_handler = Rc::clone(&seen);
    session
        .protocol()
        .expect("protocol")
        .add_notice_handler(
            Box::new(move |_is_global, _notice, _payload| {
                seen_by_handler.set(seen_by_handler.get() + 1);
                HandlerResult::Continue
            }),
            HandlerPosition::Begin,
            PRIORITY_MEDIUM,
        );

    let result = session.execute_sql("COMMIT").expect("execute");
    drop(result);

    // The TRX_COMMITTED notice reached the user handler.
    assert_eq!(seen.get(), 1);

    drop(session);
    server.join();
}
