//! Compression negotiation and the compressed transport end to end.

mod common;

use common::*;
use prost::Message;

use zero_mysqlx::argument::ArgumentValue;
use zero_mysqlx::error::code;
use zero_mysqlx::proto;
use zero_mysqlx::{Session, SessionOption};

fn compression_capability(algorithms: &[&str]) -> proto::connection::Capabilities {
    proto::connection::Capabilities {
        capabilities: vec![proto::connection::Capability {
            name: "compression".to_string(),
            value: Some(proto::datatypes::Any::from_object(proto::datatypes::Object {
                fld: vec![proto::datatypes::object::ObjectField {
                    key: "algorithm".to_string(),
                    value: Some(string_array_any(algorithms)),
                }],
            })),
        }],
    }
}

fn session_with_required_deflate() -> Session {
    let mut session = Session::new();
    session
        .set_mysql_option(SessionOption::SslMode, ArgumentValue::from("DISABLED"))
        .expect("ssl mode");
    session
        .set_mysql_option(
            SessionOption::CompressionNegotiationMode,
            ArgumentValue::from("REQUIRED"),
        )
        .expect("compression mode");
    session
        .set_mysql_option(
            SessionOption::CompressionAlgorithms,
            ArgumentValue::from("deflate"),
        )
        .expect("compression algorithms");
    session
}

#[test]
fn required_deflate_is_negotiated_and_messages_travel_compressed() {
    let server = MockServer::start(|conn| {
        conn.expect(C_CAPABILITIES_GET);
        conn.write_msg(
            S_CAPABILITIES,
            &compression_capability(&["DEFLATE_STREAM", "LZ4_MESSAGE"]),
        );

        let payload = conn.expect(C_CAPABILITIES_SET);
        let set = proto::connection::CapabilitiesSet::decode(&payload[..]).expect("caps set");
        let capability = &set.capabilities.expect("capabilities").capabilities[0];
        assert_eq!(capability.name, "compression");
        let object = capability.value.as_ref().expect("value").obj.as_ref().expect("object");
        let algorithm = object
            .fld
            .iter()
            .find(|f| f.key == "algorithm")
            .expect("algorithm field");
        let scalar = algorithm.value.as_ref().expect("any").scalar.as_ref().expect("scalar");
        assert_eq!(
            scalar.v_string.as_ref().expect("string").value,
            b"DEFLATE_STREAM"
        );
        conn.write_ok();

        // Everything from here on arrives in COMPRESSION envelopes.
        conn.expect_deflate_from_now_on();
        conn.serve_auth_ok();

        let payload = conn.expect(C_STMT_EXECUTE);
        let stmt = proto::sql::StmtExecute::decode(&payload[..]).expect("stmt");
        assert_eq!(stmt.stmt, b"SELECT 1");
        conn.write_frame(S_STMT_EXECUTE_OK, &[]);
    });

    let mut session = session_with_required_deflate();
    session
        .connect("127.0.0.1", server.port(), "u", "p", "")
        .expect("connect");

    let result = session.execute_sql("SELECT 1").expect("compressed execute");
    drop(result);

    drop(session);
    server.join();
}

#[test]
fn required_compression_without_server_support_fails() {
    let server = MockServer::start(|conn| {
        conn.expect(C_CAPABILITIES_GET);
        conn.write_msg(S_CAPABILITIES, &compression_capability(&[]));
    });

    let mut session = session_with_required_deflate();
    let err = session
        .connect("127.0.0.1", server.port(), "u", "p", "")
        .expect_err("no compression offered");
    assert_eq!(err.code, code::REQUIRED_COMPRESSION_NOT_SUPPORTED);

    drop(session);
    server.join();
}

#[test]
fn preferred_compression_without_intersection_connects_uncompressed() {
    let server = MockServer::start(|conn| {
        conn.expect(C_CAPABILITIES_GET);
        conn.write_msg(S_CAPABILITIES, &compression_capability(&["ZSTD_STREAM"]));

        // No compression capability is sent; authentication proceeds in
        // plaintext.
        conn.serve_auth_ok();
    });

    let mut session = Session::new();
    session
        .set_mysql_option(SessionOption::SslMode, ArgumentValue::from("DISABLED"))
        .expect("ssl mode");
    session
        .set_mysql_option(
            SessionOption::CompressionNegotiationMode,
            ArgumentValue::from("PREFERRED"),
        )
        .expect("compression mode");

    session
        .connect("127.0.0.1", server.port(), "u", "p", "")
        .expect("connect uncompressed");

    drop(session);
    server.join();
}

#[test]
fn level_is_retried_without_when_the_server_rejects_it() {
    let server = MockServer::start(|conn| {
        conn.expect(C_CAPABILITIES_GET);
        conn.write_msg(S_CAPABILITIES, &compression_capability(&["DEFLATE_STREAM"]));

        // First set carries the level field; reject it.
        let payload = conn.expect(C_CAPABILITIES_SET);
        let set = proto::connection::CapabilitiesSet::decode(&payload[..]).expect("caps set");
        let capability = &set.capabilities.expect("capabilities").capabilities[0];
        let object = capability.value.as_ref().expect("value").obj.as_ref().expect("object");
        assert!(object.fld.iter().any(|f| f.key == "level"));
        conn.write_error(5175, "Capability 'level' not supported", false);

        // The retry omits the level.
        let payload = conn.expect(C_CAPABILITIES_SET);
        let set = proto::connection::CapabilitiesSet::decode(&payload[..]).expect("caps set");
        let capability = &set.capabilities.expect("capabilities").capabilities[0];
        let object = capability.value.as_ref().expect("value").obj.as_ref().expect("object");
        assert!(object.fld.iter().all(|f| f.key != "level"));
        conn.write_ok();

        conn.expect_deflate_from_now_on();
        conn.serve_auth_ok();
    });

    let mut session = session_with_required_deflate();
    session
        .set_mysql_option(
            SessionOption::CompressionLevelServer,
            ArgumentValue::SignedInt(7),
        )
        .expect("level option");

    session
        .connect("127.0.0.1", server.port(), "u", "p", "")
        .expect("connect with level retry");

    drop(session);
    server.join();
}
