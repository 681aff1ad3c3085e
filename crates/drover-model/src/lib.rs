mod domain;
pub use domain::{Fields, JobParams, KeyValue, MessageId};
pub use domain::{FIELD_ACTION, FIELD_PARAMETERS, PARAM_CHANNEL};

mod error;
pub use error::ModelError;

mod message;
pub use message::Message;

mod intent;
pub use intent::{IgnoreReason, Intent, interpret};
