//! Settings RPC router, hook registrations and the Unix-socket RPC server.

mod error;
pub mod extension;
pub mod hooks;
pub mod paths;
pub mod protocol;
pub mod router;
mod runtime;

pub use error::{ErrorCode, RouterError, ServerError};
pub use extension::{registrations, BuildEvent, Extension, FunctionBundle, FunctionKind};
pub use hooks::{HookContext, HookOutcome, SiteFlags};
pub use protocol::{
    request_status, request_stop, send_request, InProcessTransport, RpcRequest, RpcResponse,
    RpcTransport, SocketTransport,
};
pub use router::{Acknowledgement, AppRouter, Procedure, StatusOutput};
pub use runtime::{init_tracing, run, start_blocking};
