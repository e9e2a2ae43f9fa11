//! Record which identities hold which management privileges.

use mgmt_dispatcher::Privileges;
use mgmt_packet::Name;
use mgmt_security::{Certificate, PublicKey};
use std::{
    cell::RefCell,
    collections::{BTreeMap, BTreeSet},
    rc::Rc,
};
use tracing::debug;

#[derive(Default)]
struct State {
    granted: BTreeSet<(Name, String)>,
    certificates: BTreeMap<Name, Certificate>,
}

/// Append-only record of granted privileges.
///
/// Clones share the same record, so a recorder handed to an authenticator observes grants made
/// afterwards. Nothing is enforced here.
#[derive(Clone, Default)]
pub struct PrivilegeRecorder {
    state: Rc<RefCell<State>>,
}

impl PrivilegeRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that the owner of `certificate` may use the commands of `privilege`.
    pub fn grant(&self, certificate: &Certificate, privilege: &str) {
        let identity = certificate.identity();
        debug!(%identity, privilege, "granted privilege");
        let mut state = self.state.borrow_mut();
        state
            .certificates
            .insert(certificate.key_name().clone(), certificate.clone());
        state.granted.insert((identity, privilege.to_string()));
    }

    /// Privileges granted to `identity`, in order.
    pub fn privileges(&self, identity: &Name) -> Vec<String> {
        self.state
            .borrow()
            .granted
            .iter()
            .filter(|(granted, _)| granted == identity)
            .map(|(_, privilege)| privilege.clone())
            .collect()
    }

    /// Number of (identity, privilege) grants.
    pub fn len(&self) -> usize {
        self.state.borrow().granted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Privileges for PrivilegeRecorder {
    fn is_granted(&self, identity: &Name, privilege: &str) -> bool {
        self.state
            .borrow()
            .granted
            .iter()
            .any(|(granted, p)| granted == identity && p == privilege)
    }

    fn verification_key(&self, key_name: &Name) -> Option<PublicKey> {
        self.state
            .borrow()
            .certificates
            .get(key_name)
            .map(|certificate| *certificate.public_key())
    }
}
