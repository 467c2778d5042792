use std::net::{Ipv4Addr, TcpListener};

use crate::error::{HarnessError, Result};

/// Ask the OS for a currently unused local TCP port.
///
/// The listener is dropped before returning, so the port is only known to be
/// free at the moment of the check. Another process can still grab it before
/// the host binds; that race is accepted and not retried here.
pub fn allocate() -> Result<u16> {
    let listener =
        TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).map_err(HarnessError::PortAllocation)?;
    let port = listener
        .local_addr()
        .map_err(HarnessError::PortAllocation)?
        .port();
    drop(listener);
    tracing::debug!(port, "allocated ephemeral port");
    Ok(port)
}

/// Base URI the host answers on once it listens on `port`.
pub fn base_uri_for(port: u16) -> String {
    format!("http://localhost:{}/", port)
}
