//! Contains all of the types needed to specify options to the executor, the connection and the
//! provided operations.
//!
//! The options structs in this module use the
//! [`typed-builder`](https://crates.io/crates/typed-builder) crate to derive a type-safe builder
//! API on them. For example, to create an instance of
//! [`CreateCollectionOptions`] with only `capped` and `size` set, the builder API can be used as
//! follows:
//!
//! ```rust
//! # use mongodb_command::options::CreateCollectionOptions;
//! #
//! # let options = CreateCollectionOptions::builder()
//! #                   .capped(true)
//! #                   .size(1024 * 1024)
//! #                   .build();
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use typed_builder::TypedBuilder;

pub use crate::{
    cmap::ConnectionOptions,
    concern::{Acknowledgment, WriteConcern},
};
use crate::{
    bson::Document,
    event::{command::CommandEvent, EventHandler},
    serde_util,
};

/// Options governing how an [`Executor`](crate::Executor) runs commands.
#[derive(Clone, Debug, Default, Deserialize, TypedBuilder)]
#[builder(field_defaults(default, setter(into)))]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct ExecutorOptions {
    /// The longest the executor waits for a reply before failing with
    /// [`Timeout`](crate::error::ErrorKind::Timeout). Unbounded if unset.
    #[serde(
        rename = "timeoutMS",
        default,
        deserialize_with = "serde_util::deserialize_duration_option_from_u64_millis"
    )]
    pub timeout: Option<Duration>,

    /// The maximum number of bytes of a command or reply to include in tracing events. Longer
    /// documents are truncated. Defaults to 1000.
    pub max_document_length: Option<usize>,

    /// The handler that should process all command-related events.
    ///
    /// Note that monitoring command events may incur a performance penalty.
    #[serde(skip)]
    #[builder(setter(strip_option))]
    pub command_event_handler: Option<EventHandler<CommandEvent>>,
}

/// Specifies the options to a [`DropDatabase`](crate::operation::DropDatabase) operation.
#[skip_serializing_none]
#[derive(Clone, Debug, Default, TypedBuilder, Serialize)]
#[serde(rename_all = "camelCase")]
#[builder(field_defaults(default, setter(into)))]
#[non_exhaustive]
pub struct DropDatabaseOptions {
    /// The write concern for the operation.
    pub write_concern: Option<WriteConcern>,
}

/// Specifies the options to a [`DropCollection`](crate::operation::DropCollection) operation.
#[skip_serializing_none]
#[derive(Clone, Debug, Default, TypedBuilder, Serialize)]
#[serde(rename_all = "camelCase")]
#[builder(field_defaults(default, setter(strip_option)))]
#[non_exhaustive]
pub struct DropCollectionOptions {
    /// The write concern for the operation.
    pub write_concern: Option<WriteConcern>,
}

/// These are the valid options for creating a collection with
/// [`CreateCollection`](crate::operation::CreateCollection).
#[skip_serializing_none]
#[derive(Clone, Debug, Default, Deserialize, TypedBuilder, Serialize)]
#[serde(rename_all = "camelCase")]
#[builder(field_defaults(default, setter(into)))]
#[non_exhaustive]
pub struct CreateCollectionOptions {
    /// Whether the collection should be capped. If true, `size` must also be set.
    pub capped: Option<bool>,

    /// The maximum size (in bytes) for a capped collection. This option is ignored if `capped` is
    /// not set to true.
    #[serde(serialize_with = "serde_util::serialize_u64_option_as_i64")]
    pub size: Option<u64>,

    /// The maximum number of documents in a capped collection. The `size` limit takes precedence
    /// over this option.
    #[serde(serialize_with = "serde_util::serialize_u64_option_as_i64")]
    pub max: Option<u64>,

    /// Specifies a validator to restrict the schema of documents which can exist in the
    /// collection.
    pub validator: Option<Document>,

    /// The write concern for the operation.
    pub write_concern: Option<WriteConcern>,
}
