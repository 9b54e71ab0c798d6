// ncibal/src/tag/mod.rs

//! Reader/writer side: the tag session driving the controller and the
//! per-tag endpoints handed to the listener.

pub mod endpoint;
pub mod extras;
pub mod session;
pub mod timeouts;

pub use endpoint::TagEndpoint;
pub use extras::TechExtras;
pub use session::{NdefCheck, TagSession};
pub use timeouts::TimeoutTable;

use crate::hal::RfActivation;
use crate::protocol::activation;
use crate::types::Technology;

/// One technology a tag exposed during a single activation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredTechnology {
    pub technology: Technology,
    /// Controller-assigned discovery id.
    pub handle: u8,
    pub protocol: u8,
    pub poll: Vec<u8>,
    pub act: Vec<u8>,
}

impl DiscoveredTechnology {
    /// Slots produced by one activation, in listing order.
    pub fn from_activation(act: &RfActivation) -> Vec<Self> {
        let poll = activation::poll_bytes(act);
        activation::technologies(act)
            .into_iter()
            .map(|technology| DiscoveredTechnology {
                technology,
                handle: act.disc_id,
                protocol: act.protocol,
                poll: poll.clone(),
                act: activation::act_bytes(act, technology),
            })
            .collect()
    }

    /// Synthetic slot sharing this slot's hardware identity.
    pub(crate) fn derived(&self, technology: Technology) -> Self {
        DiscoveredTechnology {
            technology,
            handle: self.handle,
            protocol: self.protocol,
            poll: Vec::new(),
            act: Vec::new(),
        }
    }
}
