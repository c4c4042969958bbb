//! Process exit codes. Scripts and health checks depend on these values.

pub const SUCCESS: i32 = 0;
pub const FORBIDDEN: i32 = 1; // Authorization denied
pub const CONFIG_ERROR: i32 = 2; // Bad input, configuration or missing resource
pub const UNHEALTHY: i32 = 3; // At least one heartbeat probe failed
