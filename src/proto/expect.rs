//! `Mysqlx.Expect`: expectation blocks guarding pipelined commands.

/// `Mysqlx.Expect.Open`
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Open {
    #[prost(enumeration = "open::CtxOperation", optional, tag = "1", default = "ExpectCtxCopyPrev")]
    pub op: Option<i32>,
    #[prost(message, repeated, tag = "2")]
    pub cond: Vec<open::Condition>,
}

pub mod open {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum CtxOperation {
        ExpectCtxCopyPrev = 0,
        ExpectCtxEmpty = 1,
    }

    /// `Mysqlx.Expect.Open.Condition`
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Condition {
        #[prost(uint32, required, tag = "1")]
        pub condition_key: u32,
        #[prost(bytes = "vec", optional, tag = "2")]
        pub condition_value: Option<Vec<u8>>,
        #[prost(enumeration = "condition::ConditionOperation", optional, tag = "3", default = "ExpectOpSet")]
        pub op: Option<i32>,
    }

    pub mod condition {
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
        #[repr(i32)]
        pub enum ConditionOperation {
            ExpectOpSet = 0,
            ExpectOpUnset = 1,
        }
    }
}

/// `Mysqlx.Expect.Close`
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Close {}
