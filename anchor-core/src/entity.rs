//! Entities that own ledger chains: drivers and vehicles.

use crate::crypto::Signer;
use crate::identity::{ChainName, IdentityError, DRIVER_NAMESPACE, VEHICLE_NAMESPACE};
use crate::types::{ChainId, PublicKeyBytes};
use std::fmt;
use std::str::FromStr;

/// Anything that can be identified by and registered as a ledger chain.
pub trait Entity: Send + Sync {
    /// Human-readable kind, used in logs.
    fn kind(&self) -> &'static str;

    /// The ordered chain name used for both derivation and chain creation.
    fn chain_name(&self) -> &ChainName;

    /// The derived chain identifier.
    fn chain_id(&self) -> ChainId {
        self.chain_name().chain_id()
    }
}

/// A driver, identified by the public half of their key pair.
#[derive(Debug, Clone)]
pub struct Person {
    signer: Signer,
    chain_name: ChainName,
}

impl Person {
    pub fn new(signer: Signer) -> Self {
        let chain_name = driver_chain_name(&signer.public_key_bytes());
        Self { signer, chain_name }
    }

    pub fn signer(&self) -> &Signer {
        &self.signer
    }

    pub fn public_key(&self) -> PublicKeyBytes {
        self.signer.public_key_bytes()
    }
}

impl Entity for Person {
    fn kind(&self) -> &'static str {
        "person"
    }

    fn chain_name(&self) -> &ChainName {
        &self.chain_name
    }
}

/// Chain name of the driver owning `public_key`.
pub fn driver_chain_name(public_key: &PublicKeyBytes) -> ChainName {
    ChainName::from_parts(DRIVER_NAMESPACE, public_key)
}

/// A 17-character vehicle identification number.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Vin(String);

impl Vin {
    pub const LEN: usize = 17;

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Vin {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let len = s.chars().count();
        if len != Self::LEN {
            return Err(IdentityError::InvalidVinLength(len));
        }
        if let Some(c) = s.chars().find(|c| !c.is_ascii_alphanumeric()) {
            return Err(IdentityError::InvalidVinCharacter(c));
        }
        Ok(Vin(s.to_string()))
    }
}

impl fmt::Display for Vin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A vehicle, identified by its VIN. Its chain holds anchored telemetry and video.
///
/// Ownership is an association by public key, so the owner's chain can be
/// re-derived without holding the owner's [`Person`].
#[derive(Debug, Clone)]
pub struct Vehicle {
    vin: Vin,
    chain_name: ChainName,
    owner: Option<PublicKeyBytes>,
    previous_owners: Vec<PublicKeyBytes>,
}

impl Vehicle {
    pub fn new(vin: Vin) -> Self {
        let chain_name = ChainName::from_parts(VEHICLE_NAMESPACE, vin.as_str().as_bytes());
        Self {
            vin,
            chain_name,
            owner: None,
            previous_owners: Vec::new(),
        }
    }

    /// Parse the VIN and build the vehicle.
    pub fn from_vin(vin: &str) -> Result<Self, IdentityError> {
        Ok(Self::new(vin.parse()?))
    }

    pub fn vin(&self) -> &Vin {
        &self.vin
    }

    /// Record `owner` as the current owner; any different prior owner moves to the history.
    pub fn set_owner(&mut self, owner: &Person) {
        let key = owner.public_key();
        match self.owner.replace(key) {
            Some(previous) if previous != key => self.previous_owners.push(previous),
            _ => {}
        }
    }

    pub fn owner(&self) -> Option<&PublicKeyBytes> {
        self.owner.as_ref()
    }

    /// Chain ID of the current owner's identity chain.
    pub fn owner_chain_id(&self) -> Option<ChainId> {
        self.owner.map(|key| driver_chain_name(&key).chain_id())
    }

    pub fn previous_owners(&self) -> &[PublicKeyBytes] {
        &self.previous_owners
    }
}

impl Entity for Vehicle {
    fn kind(&self) -> &'static str {
        "vehicle"
    }

    fn chain_name(&self) -> &ChainName {
        &self.chain_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::derive_chain_id;

    const VIN: &str = "1234567890ABCDEFH";

    #[test]
    fn test_vehicle_chain_id() {
        let vehicle = Vehicle::from_vin(VIN).unwrap();
        let expected =
            derive_chain_id(&[VEHICLE_NAMESPACE.as_bytes(), VIN.as_bytes()]).unwrap();
        assert_eq!(vehicle.chain_id(), expected);
        assert_eq!(vehicle.chain_id(), vehicle.chain_id());
    }

    #[test]
    fn test_person_chain_id() {
        let person = Person::new(Signer::from_secret_bytes(&[3u8; 32]));
        let key = person.public_key();
        let expected = derive_chain_id(&[DRIVER_NAMESPACE.as_bytes(), key.as_slice()]).unwrap();
        assert_eq!(person.chain_id(), expected);
    }

    #[test]
    fn test_vin_validation() {
        assert_eq!(
            "123".parse::<Vin>(),
            Err(IdentityError::InvalidVinLength(3))
        );
        assert_eq!(
            "1234567890ABCDEF-".parse::<Vin>(),
            Err(IdentityError::InvalidVinCharacter('-'))
        );
        assert_eq!(VIN.parse::<Vin>().unwrap().to_string(), VIN);
    }

    #[test]
    fn test_owner_history() {
        let mut vehicle = Vehicle::from_vin(VIN).unwrap();
        let alice = Person::new(Signer::generate());
        let bob = Person::new(Signer::generate());

        assert!(vehicle.owner_chain_id().is_none());

        vehicle.set_owner(&alice);
        vehicle.set_owner(&alice);
        assert!(vehicle.previous_owners().is_empty());

        vehicle.set_owner(&bob);
        assert_eq!(vehicle.owner(), Some(&bob.public_key()));
        assert_eq!(vehicle.previous_owners(), &[alice.public_key()]);
        assert_eq!(vehicle.owner_chain_id(), Some(bob.chain_id()));
    }
}
