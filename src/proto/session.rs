//! `Mysqlx.Session`: authentication hand-shake, session reset and close.

/// `Mysqlx.Session.AuthenticateStart`
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AuthenticateStart {
    #[prost(string, required, tag = "1")]
    pub mech_name: String,
    #[prost(bytes = "vec", optional, tag = "2")]
    pub auth_data: Option<Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "3")]
    pub initial_response: Option<Vec<u8>>,
}

/// `Mysqlx.Session.AuthenticateContinue`
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AuthenticateContinue {
    #[prost(bytes = "vec", required, tag = "1")]
    pub auth_data: Vec<u8>,
}

/// `Mysqlx.Session.AuthenticateOk`
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AuthenticateOk {
    #[prost(bytes = "vec", optional, tag = "1")]
    pub auth_data: Option<Vec<u8>>,
}

/// `Mysqlx.Session.Reset`
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Reset {
    #[prost(bool, optional, tag = "1", default = "false")]
    pub keep_open: Option<bool>,
}

/// `Mysqlx.Session.Close`
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Close {}
