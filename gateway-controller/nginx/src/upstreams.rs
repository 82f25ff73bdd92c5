use crate::{format::Formatter, INVALID_BACKEND_REF, NGINX_500_SERVER, NGINX_502_SERVER};
use ngx_gateway_controller_core::Upstream;

const ZONE_SIZE: &str = "512k";

/// Writes an upstream per resolved upstream, followed by the upstream that
/// invalid backend references are routed to.
///
/// An upstream without endpoints forwards to the 502 server.
pub(crate) fn write(fmt: &mut Formatter<'_>, upstreams: &[Upstream]) {
    for upstream in upstreams {
        let servers = if upstream.endpoints.is_empty() {
            vec![NGINX_502_SERVER.to_string()]
        } else {
            upstream
                .endpoints
                .iter()
                .map(|ep| format!("{}:{}", ep.address, ep.port))
                .collect()
        };
        write_upstream(fmt, &upstream.name, &servers);
    }
    write_upstream(fmt, INVALID_BACKEND_REF, &[NGINX_500_SERVER.to_string()]);
}

fn write_upstream(fmt: &mut Formatter<'_>, name: &str, servers: &[String]) {
    fmt.block(&format!("upstream {name}"), |fmt| {
        fmt.directive("random", ["two", "least_conn"]);
        fmt.directive("zone", [name, ZONE_SIZE]);
        for server in servers {
            fmt.directive("server", [server]);
        }
    });
    fmt.blank();
}
