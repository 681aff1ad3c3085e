mod kv;
pub use kv::KeyValue;

mod fields;
pub use fields::Fields;

mod id;
pub use id::MessageId;

mod params;
pub use params::JobParams;

mod constants;
pub use constants::{FIELD_ACTION, FIELD_PARAMETERS, PARAM_CHANNEL};
