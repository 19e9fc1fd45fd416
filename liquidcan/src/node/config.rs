use liquidcan_driver::time::Duration;

/// Node engine configuration
///
/// The hashes are opaque to the engine. `protocol_hash` should digest the field table the
/// firmware was built against; both ends announce it and a mismatch is reported, since
/// fields are addressed by shared ids that only line up when the tables match.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct NodeConfig {
    /// Name announced in node info; must fit the info body.
    pub device_name: &'static str,
    pub firmware_hash: u32,
    pub protocol_hash: u32,
    /// How long a confirmed request waits for its response.
    pub response_timeout: Duration,
    /// How long a settled process may sit unharvested before its slot is reclaimed.
    pub reclaim_timeout: Duration,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            device_name: "",
            firmware_hash: 0,
            protocol_hash: 0,
            response_timeout: Duration::from_millis(250),
            reclaim_timeout: Duration::from_secs(5),
        }
    }
}
