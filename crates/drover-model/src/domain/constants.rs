/// Field carrying the message action (`"launch"`, `"close"`, ...).
pub const FIELD_ACTION: &str = "action";

/// Field carrying the JSON-encoded job parameter mapping.
pub const FIELD_PARAMETERS: &str = "parameters";

/// Required routing key inside the parameter mapping.
pub const PARAM_CHANNEL: &str = "channel";
