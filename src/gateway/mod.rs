// =============================================================================
// Gateway — cloud-function deployment behind an API gateway
// =============================================================================
//
// When the binary is started by the function runtime (AWS_LAMBDA_RUNTIME_API
// is set) it polls the runtime API for invocations instead of serving HTTP.
// Each invocation carries an API-gateway proxy event that is routed onto the
// same pipeline the HTTP server uses.
// =============================================================================

pub mod event;
pub mod runtime;

pub use event::{handle_event, GatewayEvent, GatewayResponse};
pub use runtime::{run, RUNTIME_API_ENV};
