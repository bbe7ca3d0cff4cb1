//! Reachability gate for computers.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use log::{debug, trace};
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::collectors::traits::{AvailabilityProbe, FacetRequest};
use crate::constants::{
    PASSWORD_AGE_THRESHOLD_DAYS, PROBE_PORT, STATUS_CANCELLED, STATUS_NON_WINDOWS_OS,
    STATUS_OLD_PASSWORD, STATUS_PORT_NOT_OPEN,
};
use crate::models::output::ComputerStatus;
use crate::utils::time::filetime_to_unix;

/// Availability probe checking the OS, machine password age and an open port
#[derive(Debug, Clone)]
pub struct PortProbe {
    port: u16,
}

impl Default for PortProbe {
    fn default() -> Self {
        Self { port: PROBE_PORT }
    }
}

impl PortProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_port(port: u16) -> Self {
        Self { port }
    }

    async fn port_open(&self, host: &str, wait: Duration) -> bool {
        match timeout(wait, TcpStream::connect((host, self.port))).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                trace!("Connect to {}:{} failed: {}", host, self.port, e);
                false
            }
            Err(_) => {
                trace!("Connect to {}:{} timed out", host, self.port);
                false
            }
        }
    }
}

/// The newest of `pwdlastset` and `lastlogontimestamp` lies within the
/// threshold
fn recently_active(req: &FacetRequest<'_>) -> bool {
    let newest = ["pwdlastset", "lastlogontimestamp"]
        .iter()
        .filter_map(|name| req.entry.get_i64(name))
        .map(filetime_to_unix)
        .max()
        .unwrap_or(0);
    let threshold = Utc::now().timestamp() - PASSWORD_AGE_THRESHOLD_DAYS * 24 * 60 * 60;
    newest >= threshold
}

#[async_trait]
impl AvailabilityProbe for PortProbe {
    async fn availability(&self, req: &FacetRequest<'_>) -> ComputerStatus {
        let config = &req.ctx.config;

        if let Some(os) = req.entry.get_str("operatingsystem") {
            if !os.to_lowercase().contains("windows") {
                return ComputerStatus::unreachable(STATUS_NON_WINDOWS_OS);
            }
        }

        if !config.flags.skip_password_check && !recently_active(req) {
            return ComputerStatus::unreachable(STATUS_OLD_PASSWORD);
        }

        if config.flags.skip_port_scan {
            return ComputerStatus::connectable();
        }

        let host = req.api_name();
        let wait = Duration::from_millis(config.port_scan_timeout_ms);
        tokio::select! {
            biased;
            _ = req.ctx.cancel.cancelled() => {
                debug!("Availability check for {} cancelled", host);
                ComputerStatus::unreachable(STATUS_CANCELLED)
            }
            open = self.port_open(&host, wait) => {
                if open {
                    ComputerStatus::connectable()
                } else {
                    ComputerStatus::unreachable(STATUS_PORT_NOT_OPEN)
                }
            }
        }
    }
}
