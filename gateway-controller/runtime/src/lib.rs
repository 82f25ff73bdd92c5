pub use ngx_gateway_controller_core as core;
pub use ngx_gateway_controller_k8s_api as k8s;
pub use ngx_gateway_controller_k8s_index as index;
pub use ngx_gateway_controller_nginx as nginx;

mod args;
mod manifest;

pub use self::args::{Args, LogFormat};
