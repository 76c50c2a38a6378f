//! Postal-code (CEP) address lookup.
//!
//! The HTTP request itself belongs to the host. This module decides whether
//! a lookup should happen, which URL to fetch, how to read the response, and
//! which address fields the result may fill in.

use serde::Deserialize;
use thiserror::Error;

use crate::models::Address;

/// Lookup errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("CEP não encontrado")]
    NotFound,

    #[error("Erro ao buscar CEP: {0}")]
    Malformed(String),

    #[error("Erro ao buscar CEP: {0}")]
    Transport(String),
}

/// An 8-digit Brazilian postal code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostalCode(String);

impl PostalCode {
    /// Keep only digits; anything but exactly eight is not a postal code.
    pub fn parse(input: &str) -> Option<Self> {
        let digits: String = input.chars().filter(char::is_ascii_digit).collect();
        (digits.len() == 8).then_some(Self(digits))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Fill a URL template's `{cep}` placeholder.
pub fn lookup_url(template: &str, code: &PostalCode) -> String {
    template.replace("{cep}", code.as_str())
}

/// Address fields a successful lookup provides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressPrefill {
    pub street: String,
    pub neighborhood: String,
    pub city: String,
    pub state: String,
}

#[derive(Deserialize)]
struct LookupResponse {
    #[serde(default)]
    erro: Option<serde_json::Value>,
    #[serde(default)]
    logradouro: Option<String>,
    #[serde(default)]
    bairro: Option<String>,
    #[serde(default)]
    localidade: Option<String>,
    #[serde(default)]
    uf: Option<String>,
}

/// Interpret a lookup response body.
pub fn parse_lookup_response(body: &str) -> Result<AddressPrefill, LookupError> {
    let response: LookupResponse =
        serde_json::from_str(body).map_err(|e| LookupError::Malformed(e.to_string()))?;

    // The service has sent both `true` and `"true"`.
    let not_found = match &response.erro {
        Some(serde_json::Value::Bool(flag)) => *flag,
        Some(serde_json::Value::String(flag)) => flag.eq_ignore_ascii_case("true"),
        _ => false,
    };
    if not_found {
        return Err(LookupError::NotFound);
    }

    Ok(AddressPrefill {
        street: response.logradouro.unwrap_or_default(),
        neighborhood: response.bairro.unwrap_or_default(),
        city: response.localidade.unwrap_or_default(),
        state: response.uf.unwrap_or_default(),
    })
}

impl Address {
    /// Fill street, neighborhood, city and state from a lookup. Postal code
    /// and number stay as typed.
    pub fn apply_prefill(&mut self, prefill: AddressPrefill) {
        self.street = prefill.street;
        self.neighborhood = prefill.neighborhood;
        self.city = prefill.city;
        self.state = prefill.state;
    }
}

/// Performs the network request for a postal code. Implemented by the host.
pub trait AddressLookup {
    fn fetch(&self, url: &str) -> Result<String, LookupError>;

    /// Look up and apply an address. On any failure the address is left
    /// unchanged.
    fn fill_address(
        &self,
        template: &str,
        address: &mut Address,
    ) -> Result<Option<AddressPrefill>, LookupError> {
        let Some(code) = PostalCode::parse(&address.postal_code) else {
            return Ok(None);
        };
        let body = self.fetch(&lookup_url(template, &code))?;
        let prefill = parse_lookup_response(&body)?;
        address.apply_prefill(prefill.clone());
        Ok(Some(prefill))
    }
}
