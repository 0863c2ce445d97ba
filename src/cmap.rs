//! The transport between the executor and a server.

pub(crate) mod conn;

pub use self::conn::{
    interpret,
    Channel,
    Command,
    Connection,
    ConnectionInfo,
    ConnectionOptions,
    Reply,
};
pub(crate) use self::conn::wire;
