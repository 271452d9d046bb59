//! Client records.

use std::{fmt::Display, str::FromStr};

use derive_builder::Builder;
use rand::Rng;
use serde::{Deserialize, Serialize};

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const ID_LEN: usize = 9;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientStatus {
    #[default]
    Active,
    Inactive,
}

impl ClientStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClientStatus::Active => "active",
            ClientStatus::Inactive => "inactive",
        }
    }
}

impl Display for ClientStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ClientStatus {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(ClientStatus::Active),
            "inactive" => Ok(ClientStatus::Inactive),
            other => Err(crate::Error::from(format!("unknown client status '{other}'"))),
        }
    }
}

/// A party invoices are billed to
#[derive(Debug, Clone, PartialEq, Eq, Builder, Serialize, Deserialize)]
#[builder(setter(into), pattern = "owned")]
pub struct Client {
    /// Opaque identifier. Left empty, the workspace generates one with [`generate_client_id`].
    #[builder(default)]
    id: String,
    name: String,
    #[builder(default)]
    email: String,
    #[builder(default)]
    address: String,
    #[builder(default)]
    status: ClientStatus,
}

impl Client {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    /// Postal address, possibly spanning several lines.
    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn status(&self) -> ClientStatus {
        self.status
    }

    /// Case-insensitive match on name or email.
    pub fn matches(&self, term: &str) -> bool {
        let term = term.to_lowercase();
        self.name.to_lowercase().contains(&term) || self.email.to_lowercase().contains(&term)
    }

    pub fn to_builder(&self) -> ClientBuilder {
        ClientBuilder::default()
            .id(self.id.clone())
            .name(self.name.clone())
            .email(self.email.clone())
            .address(self.address.clone())
            .status(self.status)
    }

    pub(crate) fn set_id(&mut self, id: String) {
        self.id = id;
    }
}

/// Random nine character lowercase base36 token.
pub fn generate_client_id() -> String {
    let mut rng = rand::thread_rng();
    (0..ID_LEN)
        .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
        .collect()
}
