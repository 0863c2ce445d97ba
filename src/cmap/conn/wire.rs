mod header;
pub(crate) mod message;
mod util;

pub(crate) use self::{
    message::Message,
    util::next_request_id,
};
